//! Common utilities for document generation.
//!
//! Shared helpers for date formatting and download file names.

use chrono::{DateTime, Datelike, FixedOffset};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const MONTHS: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

/// Date written out in Portuguese (e.g., "5 de março de 2025").
pub fn format_date_in_words(dt: &DateTime<FixedOffset>) -> String {
    let month = MONTHS[(dt.month0() as usize).min(MONTHS.len() - 1)];
    format!("{} de {} de {}", dt.day(), month, dt.year())
}

/// Issue timestamp as printed on documents ("05/03/2025 14:07").
pub fn format_issued_at(dt: &DateTime<FixedOffset>) -> String {
    dt.format("%d/%m/%Y %H:%M").to_string()
}

/// Issue date as used in file names ("05-03-2025").
pub fn format_issued_date_for_filename(dt: &DateTime<FixedOffset>) -> String {
    dt.format("%d-%m-%Y").to_string()
}

/// Reduce a person or school name to `[A-Za-z0-9_-]` for use in file names.
///
/// Accents are stripped, slashes become dashes and whitespace runs become a
/// single underscore.
pub fn safe_filename_name(name: &str, fallback: &str) -> String {
    let mut result = String::new();
    let mut last_underscore = false;

    for ch in name.trim().nfkd().filter(|c| !is_combining_mark(*c)) {
        let mapped = match ch {
            '/' | '\\' => Some('-'),
            c if c.is_whitespace() || c == '_' => Some('_'),
            c if c.is_ascii_alphanumeric() || c == '-' => Some(c),
            _ => None,
        };

        match mapped {
            Some('_') => {
                if !last_underscore {
                    result.push('_');
                    last_underscore = true;
                }
            }
            Some(c) => {
                result.push(c);
                last_underscore = false;
            }
            None => {}
        }
    }

    let trimmed = result.trim_matches('_');
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_dt() -> DateTime<FixedOffset> {
        FixedOffset::west_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 3, 5, 14, 7, 0)
            .unwrap()
    }

    #[test]
    fn test_format_date_in_words() {
        assert_eq!(format_date_in_words(&sample_dt()), "5 de março de 2025");
    }

    #[test]
    fn test_format_issued_at() {
        assert_eq!(format_issued_at(&sample_dt()), "05/03/2025 14:07");
        assert_eq!(format_issued_date_for_filename(&sample_dt()), "05-03-2025");
    }

    #[test]
    fn test_safe_filename_name() {
        assert_eq!(safe_filename_name("João  da Silva", "aluno"), "Joao_da_Silva");
        assert_eq!(safe_filename_name("Ana/Maria (2)", "aluno"), "Ana-Maria_2");
        assert_eq!(safe_filename_name("  ***  ", "aluno"), "aluno");
    }
}
