//! Enrollment data sources.
//!
//! Two interchangeable collaborators deliver the same [`RowSet`] shape:
//! - `csv_file` - a CSV export read once at startup (file or gzip+base64 blob)
//! - `remote` - the lookup API, queried per request behind a TTL cache

mod csv_file;
mod remote;

pub use csv_file::{parse_enrollment_csv, CsvSource};
pub use remote::{RemoteSource, ROSTER_FETCH_LIMIT};

use std::io::Read;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use flate2::read::GzDecoder;
use thiserror::Error;

use crate::matricula::model::{RowSet, ShapeError};
use crate::matricula::search::StudentQuery;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to decode embedded data: {0}")]
    Decode(String),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error("lookup API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("lookup API returned an error: {0}")]
    Api(String),
    #[error("invalid lookup API payload: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Decode a gzip-compressed, base64-encoded blob. Whitespace inside the
/// base64 text (line breaks from secret stores) is ignored.
pub fn decode_gz_b64(raw: &str) -> SourceResult<Vec<u8>> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let compressed = BASE64
        .decode(compact.as_bytes())
        .map_err(|e| SourceError::Decode(format!("base64: {e}")))?;

    let mut data = Vec::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_end(&mut data)
        .map_err(|e| SourceError::Decode(format!("gzip: {e}")))?;
    Ok(data)
}

/// Where enrollment rows come from.
///
/// School and year arguments are compared trimmed; schools case-insensitively.
#[async_trait]
pub trait EnrollmentSource: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    /// Every school with at least one enrollment, sorted.
    async fn list_schools(&self) -> SourceResult<Vec<String>>;

    /// Academic years of one school, sorted.
    async fn list_years(&self, escola: &str) -> SourceResult<Vec<String>>;

    /// Rows matching a student search.
    async fn search(&self, query: &StudentQuery) -> SourceResult<RowSet>;

    /// Rows of one student (normalized id) in one school and year with the given status.
    async fn student_rows(
        &self,
        escola: &str,
        ano: &str,
        id_norm: &str,
        situacao: &str,
    ) -> SourceResult<RowSet>;

    /// Rows of one school and year for the class roster.
    async fn roster_rows(&self, escola: &str, ano: &str, situacao: &str) -> SourceResult<RowSet>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gz_b64(text: &str) -> String {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        BASE64.encode(encoder.finish().unwrap())
    }

    #[test]
    fn test_decode_gz_b64_ignores_whitespace() {
        let encoded = gz_b64("Escola,Usuario,Senha\n");
        let (head, tail) = encoded.split_at(encoded.len() / 2);
        let wrapped = format!("{head}\n  {tail}\n");
        assert_eq!(decode_gz_b64(&wrapped).unwrap(), b"Escola,Usuario,Senha\n");
    }

    #[test]
    fn test_decode_gz_b64_rejects_garbage() {
        assert!(matches!(decode_gz_b64("not base64!"), Err(SourceError::Decode(_))));
        let plain = BASE64.encode("not gzip");
        assert!(matches!(decode_gz_b64(&plain), Err(SourceError::Decode(_))));
    }
}
