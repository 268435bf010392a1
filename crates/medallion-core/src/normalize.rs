//! Value-level normalization rules
//!
//! Every function here maps unparseable input to `None` rather than failing.

use crate::table::Cell;
use chrono::NaiveDate;

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Trim surrounding whitespace; empty becomes null.
pub fn clean_text(value: Option<&str>) -> Cell {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Integer identifier. Accepts `"42"`, `" 42 "` and `"42.0"`.
pub fn parse_int(value: &str) -> Option<i64> {
    let v = value.trim();
    if let Ok(i) = v.parse::<i64>() {
        return Some(i);
    }
    let f = v.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
        Some(f as i64)
    } else {
        None
    }
}

pub fn normalize_int(value: Option<&str>) -> Cell {
    parse_int(value?).map(|i| i.to_string())
}

/// Finite decimal number; thousands separators are dropped.
pub fn parse_decimal(value: &str) -> Option<f64> {
    let v = value.trim().replace(',', "");
    if v.is_empty() {
        return None;
    }
    v.parse::<f64>().ok().filter(|f| f.is_finite())
}

pub fn normalize_decimal(value: Option<&str>) -> Cell {
    parse_decimal(value?).map(|f| format_decimal(f, 6))
}

/// Round to `places` and drop trailing zeros: `2.50 -> "2.5"`, `3.0 -> "3"`.
pub fn format_decimal(value: f64, places: usize) -> String {
    let rendered = format!("{:.*}", places, value);
    let trimmed = if rendered.contains('.') {
        rendered.trim_end_matches('0').trim_end_matches('.')
    } else {
        rendered.as_str()
    };
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Calendar date from the usual extract encodings.
///
/// Compact `YYYYMMDD` integers are common in transactional extracts, where
/// `0` or a negative value stands for "no date".
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }
    if v.chars().all(|c| c.is_ascii_digit() || c == '-') && !v[1..].contains('-') {
        let n = v.parse::<i64>().ok()?;
        if n <= 0 || v.len() != 8 {
            return None;
        }
        return NaiveDate::parse_from_str(v, "%Y%m%d").ok();
    }
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(v, fmt).ok())
    {
        return Some(date);
    }
    // ISO datetime: keep the date part
    let head = v.get(..10)?;
    match v.as_bytes().get(10) {
        Some(b'T') | Some(b' ') => NaiveDate::parse_from_str(head, "%Y-%m-%d").ok(),
        _ => None,
    }
}

pub fn normalize_date(value: Option<&str>) -> Cell {
    parse_date(value?).map(|d| d.format("%Y-%m-%d").to_string())
}

/// `YYYY-MM` bucket for a date cell
pub fn period_of(value: Option<&str>) -> Option<String> {
    parse_date(value?).map(|d| d.format("%Y-%m").to_string())
}

/// Gender code: `M` or `F`.
pub fn normalize_gender(value: Option<&str>) -> Cell {
    match value?.trim().to_ascii_uppercase().as_str() {
        "M" | "MALE" => Some("M".to_string()),
        "F" | "FEMALE" => Some("F".to_string()),
        _ => None,
    }
}

/// Marital status code: `M` or `S`.
pub fn normalize_marital(value: Option<&str>) -> Cell {
    match value?.trim().to_ascii_uppercase().as_str() {
        "M" | "MARRIED" => Some("M".to_string()),
        "S" | "SINGLE" => Some("S".to_string()),
        _ => None,
    }
}

/// Boolean-ish flag rendered as `Yes` / `No`.
pub fn normalize_flag(value: Option<&str>) -> Cell {
    match value?.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Some("Yes".to_string()),
        "no" | "n" | "false" | "0" => Some("No".to_string()),
        _ => None,
    }
}

/// Join key with separator characters removed, upper-cased.
pub fn join_key(value: Option<&str>) -> Option<String> {
    let key: String = value?
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .collect::<String>()
        .to_ascii_uppercase();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text(Some("  Alice  ")), Some("Alice".to_string()));
        assert_eq!(clean_text(Some("")), None);
        assert_eq!(clean_text(Some("   ")), None);
        assert_eq!(clean_text(None), None);
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int(" 42 "), Some(42));
        assert_eq!(parse_int("42.0"), Some(42));
        assert_eq!(parse_int("42.5"), None);
        assert_eq!(parse_int("abc"), None);
    }

    #[test]
    fn test_format_decimal_trims() {
        assert_eq!(format_decimal(2.5, 2), "2.5");
        assert_eq!(format_decimal(3.0, 2), "3");
        assert_eq!(format_decimal(1.0 / 3.0, 2), "0.33");
        assert_eq!(format_decimal(-0.001, 2), "0");
        assert_eq!(format_decimal(1200.0, 2), "1200");
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9);
        assert_eq!(parse_date("2024-03-09"), expected);
        assert_eq!(parse_date("20240309"), expected);
        assert_eq!(parse_date("2024/03/09"), expected);
        assert_eq!(parse_date("03/09/2024"), expected);
        assert_eq!(parse_date("2024-03-09T10:11:12"), expected);
        assert_eq!(parse_date("2024-03-09 10:11:12"), expected);
    }

    #[test]
    fn test_parse_date_rejects_placeholders() {
        assert_eq!(parse_date("0"), None);
        assert_eq!(parse_date("-5"), None);
        assert_eq!(parse_date("5489"), None);
        assert_eq!(parse_date("20241399"), None);
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn test_vocabularies() {
        assert_eq!(normalize_gender(Some("female")), Some("F".to_string()));
        assert_eq!(normalize_gender(Some(" Male ")), Some("M".to_string()));
        assert_eq!(normalize_gender(Some("n/a")), None);
        assert_eq!(normalize_marital(Some("Single")), Some("S".to_string()));
        assert_eq!(normalize_flag(Some("YES")), Some("Yes".to_string()));
        assert_eq!(normalize_flag(Some("false")), Some("No".to_string()));
        assert_eq!(normalize_flag(Some("maybe")), None);
    }

    #[test]
    fn test_join_key_strips_separators() {
        assert_eq!(join_key(Some("AW-000_11 000")), Some("AW00011000".to_string()));
        assert_eq!(join_key(Some("--")), None);
        assert_eq!(period_of(Some("20240309")), Some("2024-03".to_string()));
    }
}
