use crate::table::CellValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '₹', '¥'];
const CURRENCY_CODES: &[&str] = &["rs.", "rs", "inr", "usd", "eur", "gbp"];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M"];

/// Broad shape of a cell, used by the consistency score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Number,
    Date,
    Text,
}

/// Parses a monetary string after stripping currency markers and thousands separators.
/// Accounting-style parentheses denote a negative amount.
pub fn parse_amount_str(raw: &str) -> Option<f64> {
    let mut text = raw.trim().to_lowercase();

    for code in CURRENCY_CODES {
        if let Some(rest) = text.strip_prefix(code) {
            text = rest.trim_start().to_string();
            break;
        }
    }

    let cleaned: String = text
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != ',' && *c != '_' && !c.is_whitespace())
        .collect();

    let (negative, digits) = match cleaned
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, cleaned.as_str()),
    };

    if digits.is_empty() {
        return None;
    }

    let value: f64 = digits.parse().ok()?;
    if !value.is_finite() {
        return None;
    }

    Some(if negative { -value } else { value })
}

pub fn parse_amount(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Text(s) => parse_amount_str(s),
        _ => None,
    }
}

/// Best-effort date parsing over the formats commonly found in exported ledgers.
pub fn parse_date_str(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }

    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.date_naive())
}

pub fn parse_date(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Date(d) => Some(*d),
        CellValue::Text(s) => parse_date_str(s),
        _ => None,
    }
}

/// Returns `None` for empty cells.
pub fn infer_kind(cell: &CellValue) -> Option<CellKind> {
    if cell.is_empty() {
        return None;
    }

    match cell {
        CellValue::Number(_) => Some(CellKind::Number),
        CellValue::Date(_) => Some(CellKind::Date),
        CellValue::Text(s) => {
            if parse_amount_str(s).is_some() {
                Some(CellKind::Number)
            } else if parse_date_str(s).is_some() {
                Some(CellKind::Date)
            } else {
                Some(CellKind::Text)
            }
        }
        CellValue::Empty => None,
    }
}

pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
