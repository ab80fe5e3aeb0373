//! Generator for the Atestado de Matrícula (enrollment certificate).
//!
//! One A4 page, every element placed at a fixed offset taken from
//! [`CERTIFICATE`](super::layout::CERTIFICATE).

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common::{
    format_date_in_words, format_issued_at, format_issued_date_for_filename, safe_filename_name,
};
use super::engine::{Align, LoadedImage, PdfDocument, TextFrame};
use super::fonts::Font;
use super::layout::{y_from_bottom, y_from_top, A4_HEIGHT, A4_WIDTH, CERTIFICATE, MM};
use super::traits::Generator;
use super::{GeneratedDocument, GeneratorError};
use crate::matricula::aggregate::StudentAggregate;
use crate::matricula::normalize::{format_date_display, normalize_identifier};

pub const MUNICIPALITY_TITLE: &str = "PREFEITURA MUNICIPAL DE CRICIÚMA";
pub const SECRETARIAT_TITLE: &str = "SECRETARIA MUNICIPAL DE EDUCAÇÃO";
pub const DOCUMENT_TITLE: &str = "ATESTADO DE MATRÍCULA";
pub const VALIDITY_NOTE: &str = "Essa informação é verdadeira na data de emissão.";
pub const SIGNATURE_LABEL: &str = "ASSINATURA";
pub const DEFAULT_CITY_LABEL: &str = "Criciúma / SC";

/// Contact and address data printed in the certificate header. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SchoolMeta {
    #[serde(default)]
    pub fone: String,
    #[serde(default)]
    pub inep: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub endereco_linha1: String,
    #[serde(default)]
    pub endereco_linha2: String,
}

/// Body paragraph with the student's data substituted in.
pub fn certificate_body(data: &StudentAggregate) -> String {
    format!(
        "Atestamos para os devidos fins que, o(a) aluno(a) {}, filho(a) de {}, \
         está regularmente matriculado no ano de {} na(s) turma(s) {} da(s) série(s) {} \
         do(s) curso(s) {} no(s) período(s) {}.",
        data.nome.trim().to_uppercase(),
        data.nome_mae.trim().to_uppercase(),
        data.ano.trim(),
        data.turma.trim(),
        data.serie.trim(),
        data.curso.trim(),
        data.turno.trim(),
    )
}

/// Render the certificate without school contact data.
pub fn render_certificate(
    data: &StudentAggregate,
    issued_at: &DateTime<FixedOffset>,
    city_label: &str,
    logo_path: Option<&Path>,
) -> Vec<u8> {
    render_certificate_with_meta(data, issued_at, city_label, logo_path, &SchoolMeta::default())
}

/// Render the certificate as a single-page PDF.
pub fn render_certificate_with_meta(
    data: &StudentAggregate,
    issued_at: &DateTime<FixedOffset>,
    city_label: &str,
    logo_path: Option<&Path>,
    school: &SchoolMeta,
) -> Vec<u8> {
    let layout = &CERTIFICATE;
    let mut doc = PdfDocument::new(A4_WIDTH, A4_HEIGHT);
    let logo = LoadedImage::load(logo_path).map(|img| doc.register_image(img));

    let page = doc.add_page();
    let (w, h) = (page.width(), page.height());
    let margin_x = layout.margin_x_mm * MM;

    if let Some(logo) = &logo {
        let box_w = layout.logo_w_mm * MM;
        let box_h = layout.logo_h_mm * MM;
        let (img_w, img_h) = logo.fit_within(box_w, box_h);
        let x = layout.logo_x_mm * MM + (box_w - img_w) / 2.0;
        let y = h - layout.logo_y_from_top_mm * MM - box_h + (box_h - img_h) / 2.0;
        page.image(logo, x, y, img_w, img_h);
    }

    // Right-hand metadata block: only present values take a line.
    let right_x = w - layout.right_block_x_from_right_mm * MM;
    let mut right_y = y_from_top(h, layout.right_block_y_from_top_mm);
    let gap = layout.right_block_line_gap_mm * MM;
    let meta_lines = [
        ("Fone", school.fone.trim()),
        ("Ano Letivo", data.ano.trim()),
        ("INEP", school.inep.trim()),
        ("E-mail", school.email.trim()),
    ];
    for (label, value) in meta_lines {
        if value.is_empty() {
            continue;
        }
        page.text(
            Font::Helvetica,
            layout.right_block_font,
            right_x,
            right_y,
            Align::Right,
            &format!("{label}: {value}"),
        );
        right_y -= gap;
    }

    let center_x = w / 2.0;
    let header = [
        (Font::HelveticaBold, layout.header_title_font, MUNICIPALITY_TITLE),
        (Font::HelveticaBold, layout.header_font, SECRETARIAT_TITLE),
        (Font::HelveticaBold, layout.header_font, data.escola.trim()),
        (Font::HelveticaBold, layout.header_font, school.endereco_linha1.trim()),
        (Font::HelveticaBold, layout.header_font, school.endereco_linha2.trim()),
    ];
    for ((font, size, text), offset) in header.into_iter().zip(layout.header_lines_from_top_mm) {
        page.text(font, size, center_x, y_from_top(h, offset), Align::Center, text);
    }

    page.text(
        Font::Helvetica,
        layout.right_block_font,
        right_x,
        y_from_top(h, layout.emitido_y_from_top_mm),
        Align::Right,
        &format!("Emitido em: {}", format_issued_at(issued_at)),
    );

    let sep_y = y_from_top(h, layout.separator_y_from_top_mm);
    page.line(margin_x, sep_y, w - margin_x, sep_y, layout.rule_width);

    page.text(
        Font::HelveticaBold,
        layout.title_font,
        center_x,
        y_from_top(h, layout.title_y_from_top_mm),
        Align::Center,
        DOCUMENT_TITLE,
    );

    let frame = TextFrame {
        x: margin_x,
        top: y_from_top(h, layout.body_frame_top_from_top_mm),
        width: w - 2.0 * margin_x,
        height: layout.body_frame_h_mm * MM,
        padding: layout.body_frame_padding,
    };
    page.paragraph_justified(
        frame,
        Font::Helvetica,
        layout.body_font,
        layout.body_leading,
        &certificate_body(data),
    );

    let mut field_y = y_from_top(h, layout.fields_y_from_top_mm);
    let field_gap = layout.fields_line_gap_mm * MM * layout.fields_gap_factor;
    let fields = [
        format!("Data da matrícula: {}", format_date_display(&data.data_matricula)),
        format!("Código do aluno: {}", normalize_identifier(&data.id_aluno)),
        format!("Código nacional (INEP): {}", normalize_identifier(&data.inep_aluno)),
    ];
    for field in &fields {
        page.text(Font::Helvetica, layout.fields_font, margin_x, field_y, Align::Left, field);
        field_y -= field_gap;
    }

    page.text(
        Font::Helvetica,
        layout.closing_font,
        center_x,
        y_from_top(h, layout.valid_msg_y_from_top_mm),
        Align::Center,
        VALIDITY_NOTE,
    );

    page.text(
        Font::Helvetica,
        layout.closing_font,
        w - margin_x,
        y_from_bottom(layout.city_date_y_from_bottom_mm),
        Align::Right,
        &format!("{}, {}.", city_label.trim(), format_date_in_words(issued_at)),
    );

    let sign_y = y_from_bottom(layout.sign_line_y_from_bottom_mm);
    let half = layout.sign_line_half_width_mm * MM;
    page.line(center_x - half, sign_y, center_x + half, sign_y, layout.rule_width);
    page.text(
        Font::Helvetica,
        layout.closing_font,
        center_x,
        y_from_bottom(layout.sign_text_y_from_bottom_mm),
        Align::Center,
        SIGNATURE_LABEL,
    );

    doc.finish()
}

/// Download name of a certificate: `matricula_{nome}_{dd-mm-YYYY}.pdf`.
pub fn certificate_filename(data: &StudentAggregate, issued_at: &DateTime<FixedOffset>) -> String {
    format!(
        "matricula_{}_{}.pdf",
        safe_filename_name(&data.nome, "aluno"),
        format_issued_date_for_filename(issued_at)
    )
}

/// Request for one certificate.
#[derive(Debug, Clone)]
pub struct AtestadoRequest {
    pub aluno: StudentAggregate,
    pub issued_at: DateTime<FixedOffset>,
}

/// Certificate generator bound to the deployment's city, logo and school data.
#[derive(Debug, Clone, Default)]
pub struct AtestadoGenerator {
    pub city_label: String,
    pub logo_path: Option<PathBuf>,
    pub school: SchoolMeta,
}

impl AtestadoGenerator {
    pub fn new(city_label: impl Into<String>, logo_path: Option<PathBuf>, school: SchoolMeta) -> Self {
        Self {
            city_label: city_label.into(),
            logo_path,
            school,
        }
    }
}

impl Generator<AtestadoRequest> for AtestadoGenerator {
    const KIND: &'static str = "atestado";

    fn generate(&self, request: AtestadoRequest) -> Result<GeneratedDocument, GeneratorError> {
        let pdf = render_certificate_with_meta(
            &request.aluno,
            &request.issued_at,
            &self.city_label,
            self.logo_path.as_deref(),
            &self.school,
        );
        log::info!(
            "Generated {} for student {} ({} bytes)",
            Self::KIND,
            request.aluno.id_aluno,
            pdf.len()
        );

        Ok(GeneratedDocument {
            filename: certificate_filename(&request.aluno, &request.issued_at),
            pdf,
            emitido_em: format_issued_at(&request.issued_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> StudentAggregate {
        StudentAggregate {
            ano: "2024".to_string(),
            escola: "EMEF Centro".to_string(),
            nome: "Ana Souza".to_string(),
            nome_mae: "Clara Souza".to_string(),
            turma: "5A".to_string(),
            serie: "5º Ano".to_string(),
            curso: "Ensino Fundamental".to_string(),
            turno: "Matutino".to_string(),
            data_matricula: "45292".to_string(),
            id_aluno: "1001".to_string(),
            inep_aluno: "123456789012".to_string(),
        }
    }

    #[test]
    fn test_certificate_body_uppercases_names() {
        let body = certificate_body(&sample());
        assert!(body.contains("aluno(a) ANA SOUZA, filho(a) de CLARA SOUZA"));
        assert!(body.contains("na(s) turma(s) 5A"));
        assert!(body.ends_with("no(s) período(s) Matutino."));
    }

    #[test]
    fn test_certificate_filename() {
        let issued = FixedOffset::west_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 2, 1, 9, 30, 0)
            .unwrap();
        assert_eq!(
            certificate_filename(&sample(), &issued),
            "matricula_Ana_Souza_01-02-2024.pdf"
        );
    }

    #[test]
    fn test_generator_produces_pdf() {
        let issued = FixedOffset::west_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 2, 1, 9, 30, 0)
            .unwrap();
        let generator = AtestadoGenerator::new(DEFAULT_CITY_LABEL, None, SchoolMeta::default());
        let doc = generator
            .generate(AtestadoRequest {
                aluno: sample(),
                issued_at: issued,
            })
            .unwrap();
        assert!(doc.pdf.starts_with(b"%PDF-"));
        assert_eq!(doc.emitido_em, "01/02/2024 09:30");
    }
}
