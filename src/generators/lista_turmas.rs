//! Generator for the class roster ("Lista de alunos por turma").
//!
//! Rows of one school are partitioned by class and each class becomes a
//! section that starts on its own page: logo, title, header lines, a table
//! that paginates with a repeated header row, and a bold total line.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};

use super::common::{format_issued_at, format_issued_date_for_filename, safe_filename_name};
use super::engine::{Align, ImageHandle, LoadedImage, PdfDocument, CAP_HEIGHT};
use super::fonts::{wrap_text, Font};
use super::layout::{A4_HEIGHT, A4_WIDTH, MM, ROSTER};
use super::traits::Generator;
use super::{GeneratedDocument, GeneratorError};
use crate::matricula::model::{EnrollmentRow, RowSet};
use crate::matricula::normalize::{clean, format_date_display};
use crate::matricula::search::rows_for_school;

pub const ROSTER_TITLE: &str = "LISTA DE ALUNOS POR TURMA";

/// Optional per-student fields the extended table can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalField {
    Gender,
    BirthDate,
}

/// Accepted header spellings per optional field, in lookup order.
pub const OPTIONAL_FIELD_HEADERS: [(OptionalField, &[&str]); 2] = [
    (
        OptionalField::Gender,
        &["Gênero", "Genero", "Sexo", "Gênero do Aluno", "Sexo do Aluno"],
    ),
    (
        OptionalField::BirthDate,
        &[
            "Data de Nascimento",
            "Data Nascimento",
            "Nascimento",
            "Data de nascimento",
            "Dt. Nascimento",
        ],
    ),
];

/// Header names of the optional columns present in one row set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionalColumns {
    pub gender: Option<String>,
    pub birth_date: Option<String>,
}

impl OptionalColumns {
    pub fn resolve(rows: &RowSet) -> Self {
        let mut resolved = Self::default();
        for (field, spellings) in OPTIONAL_FIELD_HEADERS {
            let found = spellings
                .iter()
                .find(|name| rows.has_column(name))
                .map(|name| name.to_string());
            match field {
                OptionalField::Gender => resolved.gender = found,
                OptionalField::BirthDate => resolved.birth_date = found,
            }
        }
        resolved
    }

    pub fn variant(&self) -> TableVariant {
        if self.gender.is_some() || self.birth_date.is_some() {
            TableVariant::Extended
        } else {
            TableVariant::Basic
        }
    }

    fn value(row: &EnrollmentRow, column: Option<&String>) -> String {
        column
            .and_then(|name| row.column(name))
            .map(|raw| clean(raw).to_string())
            .unwrap_or_default()
    }
}

/// Table shape of every section in one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableVariant {
    /// `ID, INEP, Aluno, Livre` with a blank last column.
    Basic,
    /// `ID, INEP, Aluno, Gênero, Nascimento`.
    Extended,
}

impl TableVariant {
    pub fn headers(self) -> &'static [&'static str] {
        match self {
            TableVariant::Basic => &["ID", "INEP", "Aluno", "Livre"],
            TableVariant::Extended => &["ID", "INEP", "Aluno", "Gênero", "Nascimento"],
        }
    }

    fn column_widths(self) -> Vec<f32> {
        match self {
            TableVariant::Basic => ROSTER.basic_columns_mm.iter().map(|w| w * MM).collect(),
            TableVariant::Extended => ROSTER.extended_columns_mm.iter().map(|w| w * MM).collect(),
        }
    }
}

/// Class identity: (curso, série, turma, turno), ordered lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassGroupKey {
    pub curso: String,
    pub serie: String,
    pub turma: String,
    pub turno: String,
}

impl ClassGroupKey {
    fn of(row: &EnrollmentRow) -> Self {
        Self {
            curso: clean(&row.curso).to_string(),
            serie: clean(&row.serie).to_string(),
            turma: clean(&row.turma).to_string(),
            turno: clean(&row.turno).to_string(),
        }
    }
}

/// One table line of a roster section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub id: String,
    pub inep: String,
    pub nome: String,
    pub genero: String,
    pub nascimento: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassGroup {
    pub key: ClassGroupKey,
    pub entries: Vec<RosterEntry>,
}

/// Partition `rows` into classes in key order.
///
/// A student appears once per class even when the source repeats them;
/// rows without an identifier are always kept. Entries are sorted by name,
/// then identifier.
pub fn group_by_class(rows: &RowSet, optional: &OptionalColumns) -> Vec<ClassGroup> {
    let mut groups: BTreeMap<ClassGroupKey, (HashSet<String>, Vec<RosterEntry>)> = BTreeMap::new();

    for row in rows.rows() {
        let (seen, entries) = groups.entry(ClassGroupKey::of(row)).or_default();
        let id = row.id_norm();
        if !id.is_empty() && !seen.insert(id.clone()) {
            continue;
        }
        entries.push(RosterEntry {
            id,
            inep: row.inep_norm(),
            nome: clean(&row.nome).to_string(),
            genero: OptionalColumns::value(row, optional.gender.as_ref()),
            nascimento: format_date_display(&OptionalColumns::value(
                row,
                optional.birth_date.as_ref(),
            )),
        });
    }

    groups
        .into_iter()
        .map(|(key, (_, mut entries))| {
            entries.sort_by(|a, b| a.nome.cmp(&b.nome).then_with(|| a.id.cmp(&b.id)));
            ClassGroup { key, entries }
        })
        .collect()
}

/// Flowing writer: tracks the top of the free space on the current page.
struct RosterWriter {
    doc: PdfDocument,
    logo: Option<ImageHandle>,
    cursor: f32,
}

impl RosterWriter {
    fn new(logo_path: Option<&Path>) -> Self {
        let mut doc = PdfDocument::new(A4_WIDTH, A4_HEIGHT);
        let logo = LoadedImage::load(logo_path).map(|img| doc.register_image(img));
        Self {
            doc,
            logo,
            cursor: Self::top(),
        }
    }

    fn top() -> f32 {
        A4_HEIGHT - ROSTER.margin_top_mm * MM
    }

    fn bottom() -> f32 {
        ROSTER.margin_bottom_mm * MM
    }

    fn left() -> f32 {
        ROSTER.margin_left_mm * MM
    }

    fn new_page(&mut self) {
        self.doc.add_page();
        self.cursor = Self::top();
    }

    fn ensure_room(&mut self, height: f32) {
        if self.cursor - height < Self::bottom() {
            self.new_page();
        }
    }

    fn line(&mut self, font: Font, size: f32, leading: f32, text: &str) {
        self.ensure_room(leading);
        let baseline = self.cursor - size;
        self.doc
            .current_page()
            .text(font, size, Self::left(), baseline, Align::Left, text);
        self.cursor -= leading;
    }

    fn space(&mut self, points: f32) {
        self.cursor -= points;
    }

    fn logo(&mut self) {
        let Some(logo) = self.logo.clone() else {
            return;
        };
        let size = ROSTER.logo_size_mm * MM;
        self.ensure_room(size);
        let (w, h) = logo.fit_within(size, size);
        let x = (A4_WIDTH - w) / 2.0;
        let y = self.cursor - size + (size - h) / 2.0;
        self.doc.current_page().image(&logo, x, y, w, h);
        self.cursor -= size + ROSTER.logo_gap_mm * MM;
    }

    fn section(&mut self, escola: &str, issued: &str, group: &ClassGroup, variant: TableVariant) {
        self.logo();
        self.line(Font::HelveticaBold, ROSTER.title_font, ROSTER.title_leading, ROSTER_TITLE);
        self.space(ROSTER.title_space_after);

        let key = &group.key;
        let mut header = vec![format!("Escola: {escola}")];
        for (label, value) in [
            ("Curso", &key.curso),
            ("Série", &key.serie),
            ("Turma", &key.turma),
            ("Turno", &key.turno),
        ] {
            if !value.is_empty() {
                header.push(format!("{label}: {value}"));
            }
        }
        header.push(format!("Emitido em: {issued}"));
        for text in &header {
            self.line(Font::Helvetica, ROSTER.header_font, ROSTER.header_leading, text);
            self.space(ROSTER.header_space_after);
        }
        self.space(ROSTER.header_gap_mm * MM);

        self.table(group, variant);

        self.space(ROSTER.total_space_before);
        self.line(
            Font::HelveticaBold,
            ROSTER.total_font,
            ROSTER.total_leading,
            &format!("Total de alunos na turma: {}", group.entries.len()),
        );
        self.space(ROSTER.section_gap_mm * MM);
    }

    fn table(&mut self, group: &ClassGroup, variant: TableVariant) {
        let widths = variant.column_widths();
        let table_x = (A4_WIDTH - widths.iter().sum::<f32>()) / 2.0;
        let pad = ROSTER.cell_padding;
        let header_height = ROSTER.table_leading + 2.0 * pad;

        // The header row never sits alone at the bottom of a page.
        let first_row = group
            .entries
            .first()
            .map(|entry| Self::row_height(&Self::cells(entry, variant, &widths)))
            .unwrap_or(0.0);
        self.ensure_room(header_height + first_row);
        self.header_row(table_x, &widths, variant);

        for (index, entry) in group.entries.iter().enumerate() {
            let cells = Self::cells(entry, variant, &widths);
            let height = Self::row_height(&cells);

            if self.cursor - height < Self::bottom() {
                self.new_page();
                self.header_row(table_x, &widths, variant);
            }

            let top = self.cursor;
            let page = self.doc.current_page();
            let row_width: f32 = widths.iter().sum();
            if index % 2 == 1 {
                page.fill_rect(table_x, top - height, row_width, height, ROSTER.stripe_gray);
            }

            let mut x = table_x;
            for ((font, size, cell_lines), width) in cells.iter().zip(&widths) {
                let block = cell_lines.len() as f32 * ROSTER.table_leading;
                let block_top = top - (height - block) / 2.0;
                for (k, text) in cell_lines.iter().enumerate() {
                    let middle = block_top - (k as f32 + 0.5) * ROSTER.table_leading;
                    let baseline = middle - CAP_HEIGHT * size / 2.0;
                    page.text(*font, *size, x + pad, baseline, Align::Left, text);
                }
                page.stroke_rect(x, top - height, *width, height, ROSTER.grid_width);
                x += width;
            }
            self.cursor -= height;
        }
    }

    fn header_row(&mut self, table_x: f32, widths: &[f32], variant: TableVariant) {
        let height = ROSTER.table_leading + 2.0 * ROSTER.cell_padding;
        let top = self.cursor;
        let size = ROSTER.table_header_font;
        let page = self.doc.current_page();
        let row_width: f32 = widths.iter().sum();
        page.fill_rect(table_x, top - height, row_width, height, ROSTER.header_gray);

        let baseline = top - height / 2.0 - CAP_HEIGHT * size / 2.0;
        let mut x = table_x;
        for (label, width) in variant.headers().iter().zip(widths) {
            page.text(Font::HelveticaBold, size, x + width / 2.0, baseline, Align::Center, label);
            page.stroke_rect(x, top - height, *width, height, ROSTER.grid_width);
            x += width;
        }
        self.cursor -= height;
    }

    fn row_height(cells: &[(Font, f32, Vec<String>)]) -> f32 {
        let lines = cells.iter().map(|(_, _, l)| l.len().max(1)).max().unwrap_or(1);
        lines as f32 * ROSTER.table_leading + 2.0 * ROSTER.cell_padding
    }

    /// Cell contents of one entry: font, size and wrapped lines per column.
    fn cells(entry: &RosterEntry, variant: TableVariant, widths: &[f32]) -> Vec<(Font, f32, Vec<String>)> {
        let pad = ROSTER.cell_padding;
        let plain = |text: &str| (Font::Helvetica, ROSTER.table_font, vec![text.to_string()]);
        let name_lines = wrap_text(Font::Helvetica, ROSTER.table_name_font, &entry.nome, widths[2] - 2.0 * pad);

        let mut cells = vec![
            plain(&entry.id),
            plain(&entry.inep),
            (Font::Helvetica, ROSTER.table_name_font, name_lines),
        ];
        match variant {
            TableVariant::Basic => cells.push(plain("")),
            TableVariant::Extended => {
                cells.push(plain(&entry.genero));
                cells.push(plain(&entry.nascimento));
            }
        }
        cells
    }

    fn finish(self) -> Vec<u8> {
        self.doc.finish()
    }
}

/// Render the roster of `escola` from `rows`.
///
/// Returns an empty vector when no row belongs to the school.
pub fn render_roster(
    rows: &RowSet,
    escola: &str,
    issued_at: &DateTime<FixedOffset>,
    logo_path: Option<&Path>,
) -> Vec<u8> {
    let school_rows = rows_for_school(rows, escola);
    if school_rows.is_empty() {
        return Vec::new();
    }

    let optional = OptionalColumns::resolve(&school_rows);
    let variant = optional.variant();
    let groups = group_by_class(&school_rows, &optional);
    let escola_up = escola.trim().to_uppercase();
    let issued = format_issued_at(issued_at);

    log::debug!(
        "Rendering roster for {}: {} rows in {} classes ({:?} table)",
        escola_up,
        school_rows.len(),
        groups.len(),
        variant
    );

    let mut writer = RosterWriter::new(logo_path);
    for group in &groups {
        writer.new_page();
        writer.section(&escola_up, &issued, group, variant);
    }
    writer.finish()
}

/// Download name of a roster: `lista_turmas_{escola}_{dd-mm-YYYY}.pdf`.
pub fn roster_filename(escola: &str, issued_at: &DateTime<FixedOffset>) -> String {
    format!(
        "lista_turmas_{}_{}.pdf",
        safe_filename_name(escola, "escola"),
        format_issued_date_for_filename(issued_at)
    )
}

#[derive(Debug, Clone)]
pub struct ListaTurmasRequest {
    pub rows: RowSet,
    pub escola: String,
    pub issued_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Default)]
pub struct ListaTurmasGenerator {
    pub logo_path: Option<PathBuf>,
}

impl ListaTurmasGenerator {
    pub fn new(logo_path: Option<PathBuf>) -> Self {
        Self { logo_path }
    }
}

impl Generator<ListaTurmasRequest> for ListaTurmasGenerator {
    const KIND: &'static str = "lista_turmas";

    fn generate(&self, request: ListaTurmasRequest) -> Result<GeneratedDocument, GeneratorError> {
        let pdf = render_roster(
            &request.rows,
            &request.escola,
            &request.issued_at,
            self.logo_path.as_deref(),
        );
        if pdf.is_empty() {
            return Err(GeneratorError::NothingToRender(request.escola));
        }
        log::info!(
            "Generated {} for {} ({} bytes)",
            Self::KIND,
            request.escola.trim(),
            pdf.len()
        );

        Ok(GeneratedDocument {
            filename: roster_filename(&request.escola, &request.issued_at),
            pdf,
            emitido_em: format_issued_at(&request.issued_at),
        })
    }
}
