//! Coercion of spreadsheet-exported identifiers and dates into canonical strings.
//!
//! Exports serialize integer ids as `"123.0"`, occasionally in scientific
//! notation, and dates either as ISO text or as Excel day serials. None of
//! these functions fail: anything that cannot be interpreted is passed
//! through trimmed.

use chrono::{Days, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;

/// Serials below this are not plausible enrollment dates (20000 is 1954-10-03).
pub const EXCEL_SERIAL_FLOOR: f64 = 20000.0;

/// Longest integer a scientific-notation id may expand to.
const MAX_SCIENTIFIC_DIGITS: i64 = 40;

lazy_static! {
    static ref INT_WITH_ZERO_FRACTION: Regex = Regex::new(r"^\d+\.0$").expect("valid regex");
    static ref NUMERIC_SERIAL: Regex = Regex::new(r"^\d+(\.\d+)?$").expect("valid regex");
    static ref ISO_DATE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex");
}

/// Trimmed value, or `""` for the placeholders spreadsheets leave in empty cells.
pub fn clean(raw: &str) -> &str {
    let value = raw.trim();
    if value.eq_ignore_ascii_case("nan") || value.eq_ignore_ascii_case("none") {
        ""
    } else {
        value
    }
}

/// Excel day 0, which absorbs the 1900 leap-year bug for every date after February 1900.
fn excel_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

/// Canonical digit-only form of a student or INEP identifier.
///
/// Wholly non-numeric values are returned trimmed instead of being erased.
pub fn normalize_identifier(raw: &str) -> String {
    let value = clean(raw);
    if value.is_empty() {
        return String::new();
    }

    if INT_WITH_ZERO_FRACTION.is_match(value) {
        return value[..value.len() - 2].to_string();
    }

    if value.contains(['e', 'E']) {
        if let Some(integer) = scientific_to_integer(value) {
            return integer;
        }
    }

    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        value.to_string()
    } else {
        digits
    }
}

/// Exact expansion of `1.2345e4`-style text to its integer part.
fn scientific_to_integer(value: &str) -> Option<String> {
    let (mantissa, exponent) = value.split_once(['e', 'E'])?;
    let exponent: i64 = exponent.parse().ok()?;
    let mantissa = mantissa.strip_prefix(['+', '-']).unwrap_or(mantissa);
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let digits = format!("{int_part}{frac_part}");
    let point = int_part.len() as i64 + exponent;
    if point > MAX_SCIENTIFIC_DIGITS {
        return None;
    }

    let integer = if point <= 0 {
        String::new()
    } else if point as usize >= digits.len() {
        format!("{digits}{}", "0".repeat(point as usize - digits.len()))
    } else {
        digits[..point as usize].to_string()
    };

    let trimmed = integer.trim_start_matches('0');
    Some(if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() })
}

/// ISO `YYYY-MM-DD` form of an enrollment date.
///
/// Numeric values at or above [`EXCEL_SERIAL_FLOOR`] are read as Excel day
/// serials; everything else is returned verbatim (trimmed).
pub fn to_canonical_date(raw: &str) -> String {
    let value = clean(raw);
    if value.is_empty() {
        return String::new();
    }

    if NUMERIC_SERIAL.is_match(value) {
        if let Ok(serial) = value.parse::<f64>() {
            if serial >= EXCEL_SERIAL_FLOOR {
                match excel_serial_to_date(serial) {
                    Some(date) => return date.format("%Y-%m-%d").to_string(),
                    None => log::warn!(
                        "Excel serial '{}' is outside the supported calendar, keeping raw value",
                        value
                    ),
                }
            }
        }
    }

    value.to_string()
}

fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    let days = serial.trunc();
    if !days.is_finite() || days > u32::MAX as f64 {
        return None;
    }
    excel_epoch().checked_add_days(Days::new(days as u64))
}

/// True when `value` is a real calendar date in `YYYY-MM-DD` form.
pub fn is_iso_date(value: &str) -> bool {
    ISO_DATE.is_match(value) && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

/// Date as printed on documents: `DD/MM/YYYY` when it canonicalizes to ISO.
pub fn format_date_display(raw: &str) -> String {
    let canonical = to_canonical_date(raw);
    if ISO_DATE.is_match(&canonical) {
        let (year, rest) = canonical.split_at(4);
        let month = &rest[1..3];
        let day = &rest[4..6];
        return format!("{day}/{month}/{year}");
    }
    canonical
}
