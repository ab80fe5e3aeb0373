use std::path::Path;

use async_trait::async_trait;

use super::{decode_gz_b64, EnrollmentSource, SourceError, SourceResult};
use crate::matricula::model::RowSet;
use crate::matricula::search::{self, StudentQuery};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parse an enrollment CSV export (UTF-8, optional BOM) into a shape-checked row set.
pub fn parse_enrollment_csv(bytes: &[u8], origin: &str) -> SourceResult<RowSet> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record?.iter().map(str::to_string).collect::<Vec<_>>());
    }

    Ok(RowSet::from_records(columns, records, origin)?)
}

/// Enrollment rows held in memory, loaded once from a CSV export.
#[derive(Debug, Clone)]
pub struct CsvSource {
    rows: RowSet,
}

impl CsvSource {
    pub fn new(rows: RowSet) -> Self {
        Self { rows }
    }

    pub fn from_path(path: &Path) -> SourceResult<Self> {
        let bytes = std::fs::read(path).map_err(|source| SourceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let rows = parse_enrollment_csv(&bytes, &path.display().to_string())?;
        log::info!("Loaded {} enrollment rows from {}", rows.len(), path.display());
        Ok(Self { rows })
    }

    pub fn from_gz_b64(raw: &str) -> SourceResult<Self> {
        let bytes = decode_gz_b64(raw)?;
        let rows = parse_enrollment_csv(&bytes, "MATRICULAS_CSV_GZ_B64")?;
        log::info!("Loaded {} enrollment rows from embedded CSV", rows.len());
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &RowSet {
        &self.rows
    }
}

#[async_trait]
impl EnrollmentSource for CsvSource {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn list_schools(&self) -> SourceResult<Vec<String>> {
        Ok(search::schools(&self.rows))
    }

    async fn list_years(&self, escola: &str) -> SourceResult<Vec<String>> {
        Ok(search::years(&self.rows, escola))
    }

    async fn search(&self, query: &StudentQuery) -> SourceResult<RowSet> {
        Ok(search::search_rows(&self.rows, query))
    }

    async fn student_rows(
        &self,
        escola: &str,
        ano: &str,
        id_norm: &str,
        situacao: &str,
    ) -> SourceResult<RowSet> {
        Ok(search::student_rows(&self.rows, escola, ano, id_norm, situacao))
    }

    async fn roster_rows(&self, escola: &str, ano: &str, situacao: &str) -> SourceResult<RowSet> {
        Ok(search::rows_for_class_listing(&self.rows, escola, ano, situacao))
    }
}
