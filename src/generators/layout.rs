//! Page geometry for both templates.
//!
//! Offsets are millimetres measured from the page edge named in the field.
//! These tables are the only place positions are defined; renderers convert
//! them with [`y_from_top`] / [`y_from_bottom`] and never hard-code points.

/// Points per millimetre.
pub const MM: f32 = 72.0 / 25.4;

pub const A4_WIDTH: f32 = 210.0 * MM;
pub const A4_HEIGHT: f32 = 297.0 * MM;

/// Baseline for an offset measured down from the top edge.
pub fn y_from_top(page_height: f32, offset_mm: f32) -> f32 {
    page_height - offset_mm * MM
}

/// Baseline for an offset measured up from the bottom edge.
pub fn y_from_bottom(offset_mm: f32) -> f32 {
    offset_mm * MM
}

/// Fixed positions of the enrollment certificate.
#[derive(Debug, Clone, Copy)]
pub struct CertificateLayout {
    pub margin_x_mm: f32,
    pub logo_x_mm: f32,
    pub logo_y_from_top_mm: f32,
    pub logo_w_mm: f32,
    pub logo_h_mm: f32,
    pub right_block_x_from_right_mm: f32,
    pub right_block_y_from_top_mm: f32,
    pub right_block_line_gap_mm: f32,
    pub right_block_font: f32,
    /// Baselines of the centered header: municipality, secretariat, school,
    /// address line 1, address line 2.
    pub header_lines_from_top_mm: [f32; 5],
    pub header_title_font: f32,
    pub header_font: f32,
    pub emitido_y_from_top_mm: f32,
    pub separator_y_from_top_mm: f32,
    pub title_y_from_top_mm: f32,
    pub title_font: f32,
    pub body_frame_top_from_top_mm: f32,
    pub body_frame_h_mm: f32,
    /// Inner padding of the body frame, in points.
    pub body_frame_padding: f32,
    pub body_font: f32,
    pub body_leading: f32,
    pub fields_y_from_top_mm: f32,
    pub fields_line_gap_mm: f32,
    pub fields_gap_factor: f32,
    pub fields_font: f32,
    pub valid_msg_y_from_top_mm: f32,
    pub city_date_y_from_bottom_mm: f32,
    pub sign_line_y_from_bottom_mm: f32,
    pub sign_line_half_width_mm: f32,
    pub sign_text_y_from_bottom_mm: f32,
    pub closing_font: f32,
    pub rule_width: f32,
}

pub const CERTIFICATE: CertificateLayout = CertificateLayout {
    margin_x_mm: 18.0,
    logo_x_mm: 18.0,
    logo_y_from_top_mm: 1.5,
    logo_w_mm: 40.0,
    logo_h_mm: 40.0,
    right_block_x_from_right_mm: 18.0,
    right_block_y_from_top_mm: 14.0,
    right_block_line_gap_mm: 5.0,
    right_block_font: 10.0,
    header_lines_from_top_mm: [18.0, 23.0, 29.0, 35.0, 40.0],
    header_title_font: 11.0,
    header_font: 10.0,
    emitido_y_from_top_mm: 52.0,
    separator_y_from_top_mm: 58.0,
    title_y_from_top_mm: 74.0,
    title_font: 20.0,
    body_frame_top_from_top_mm: 92.0,
    body_frame_h_mm: 62.0,
    body_frame_padding: 6.0,
    body_font: 12.0,
    body_leading: 16.0,
    fields_y_from_top_mm: 130.0,
    fields_line_gap_mm: 6.0,
    fields_gap_factor: 1.2,
    fields_font: 12.0,
    valid_msg_y_from_top_mm: 200.0,
    city_date_y_from_bottom_mm: 70.0,
    sign_line_y_from_bottom_mm: 28.0,
    sign_line_half_width_mm: 55.0,
    sign_text_y_from_bottom_mm: 22.0,
    closing_font: 12.0,
    rule_width: 1.0,
};

/// Flowing layout of the class roster.
#[derive(Debug, Clone, Copy)]
pub struct RosterLayout {
    pub margin_left_mm: f32,
    pub margin_right_mm: f32,
    pub margin_top_mm: f32,
    pub margin_bottom_mm: f32,
    pub logo_size_mm: f32,
    pub logo_gap_mm: f32,
    pub title_font: f32,
    pub title_leading: f32,
    pub title_space_after: f32,
    pub header_font: f32,
    pub header_leading: f32,
    pub header_space_after: f32,
    pub header_gap_mm: f32,
    pub table_header_font: f32,
    pub table_font: f32,
    pub table_name_font: f32,
    pub table_leading: f32,
    pub cell_padding: f32,
    pub grid_width: f32,
    pub header_gray: f32,
    pub stripe_gray: f32,
    /// Column widths of the `{ID, INEP, Aluno, Livre}` table.
    pub basic_columns_mm: [f32; 4],
    /// Column widths of the `{ID, INEP, Aluno, Gênero, Nascimento}` table.
    pub extended_columns_mm: [f32; 5],
    pub total_font: f32,
    pub total_leading: f32,
    pub total_space_before: f32,
    pub section_gap_mm: f32,
}

pub const ROSTER: RosterLayout = RosterLayout {
    margin_left_mm: 20.0,
    margin_right_mm: 20.0,
    margin_top_mm: 15.0,
    margin_bottom_mm: 15.0,
    logo_size_mm: 18.0,
    logo_gap_mm: 2.0,
    title_font: 13.0,
    title_leading: 16.0,
    title_space_after: 6.0,
    header_font: 10.5,
    header_leading: 13.0,
    header_space_after: 2.0,
    header_gap_mm: 4.0,
    table_header_font: 10.0,
    table_font: 10.0,
    table_name_font: 9.5,
    table_leading: 12.0,
    cell_padding: 4.0,
    grid_width: 0.6,
    header_gray: 0.96,
    stripe_gray: 0.83,
    basic_columns_mm: [15.0, 28.0, 50.0, 49.0],
    extended_columns_mm: [15.0, 26.0, 58.0, 17.0, 26.0],
    total_font: 10.5,
    total_leading: 13.0,
    total_space_before: 6.0,
    section_gap_mm: 6.0,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mm_conversion() {
        assert!((A4_WIDTH - 595.2756).abs() < 0.01);
        assert!((A4_HEIGHT - 841.8898).abs() < 0.01);
        assert!((y_from_top(A4_HEIGHT, 0.0) - A4_HEIGHT).abs() < f32::EPSILON);
        assert!((y_from_bottom(25.4) - 72.0).abs() < 1e-4);
    }

    #[test]
    fn test_roster_tables_fit_between_margins() {
        let usable = 210.0 - ROSTER.margin_left_mm - ROSTER.margin_right_mm;
        assert!(ROSTER.basic_columns_mm.iter().sum::<f32>() <= usable);
        assert!(ROSTER.extended_columns_mm.iter().sum::<f32>() <= usable);
    }
}
