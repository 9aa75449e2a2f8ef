//! Value normalisation for comparing model-reported values with OCR text.
//!
//! The model reports `"¥10,000"` where OCR reads `"10,000"`, or
//! `"2023年12月25日"` where OCR reads `"2023/12/25"`. Both sides are pushed
//! through the same canonical form before comparison.
//!
//! # Forms
//!
//! - Text: whitespace runs (including U+3000) collapse to one ASCII space, trimmed
//! - Number: currency marks, thousands separators and whitespace removed;
//!   integral floats render without a fraction ("100.0" → "100")
//! - Date: `YYYY-MM-DD`, from year-first or year-last input

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::diagnostics::Diagnostics;

/// Semantic type used to pick a normalisation and a match rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldType {
    #[default]
    Text,
    Number,
    Date,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
        }
    }

    /// Guess the type of a string value.
    ///
    /// Currency/digit strings are numbers, strings shaped like a date with a
    /// four-digit year are dates, everything else is text. No reconciliation
    /// happens if the guess is wrong.
    pub fn classify(value: &str) -> Self {
        let value = value.trim();
        if number_pattern().is_match(value) {
            Self::Number
        } else if date_pattern().is_match(value) {
            Self::Date
        } else {
            Self::Text
        }
    }
}

fn number_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[¥￥]?\s*-?[0-9][0-9,，]*(\.[0-9]+)?\s*円?$").expect("valid number regex")
    })
}

fn date_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(\d{4}\s*[年/.\-]\s*\d{1,2}\s*[月/.\-]\s*\d{1,2}\s*日?|\d{1,2}\s*[/.\-]\s*\d{1,2}\s*[/.\-]\s*\d{4})$",
        )
        .expect("valid date regex")
    })
}

/// Normalise `value` for `field_type`. `None` is always the empty string.
///
/// Never fails: unparseable numbers and dates fall back to a trimmed form.
pub fn normalize(value: Option<&str>, field_type: FieldType) -> String {
    let Some(value) = value else {
        return String::new();
    };
    match field_type {
        FieldType::Text => normalize_text(value),
        FieldType::Number => normalize_number(value),
        FieldType::Date => normalize_date(value),
    }
}

fn normalize_text(value: &str) -> String {
    // `split_whitespace` treats the ideographic space as whitespace.
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_number(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, '¥' | '￥' | ',' | '，') && !c.is_whitespace())
        .collect();

    match cleaned.parse::<f64>() {
        Ok(n) if n.is_finite() => {
            if n.fract() == 0.0 {
                format!("{n:.0}")
            } else {
                n.to_string()
            }
        }
        _ => value.trim().to_string(),
    }
}

fn normalize_date(value: &str) -> String {
    let replaced: String = value
        .trim()
        .chars()
        .map(|c| match c {
            '年' | '月' | '日' | '/' | '.' => '-',
            other => other,
        })
        .collect();
    let partial = replaced.trim_matches('-');

    let parts: Vec<&str> = partial.split('-').map(str::trim).collect();
    if parts.len() != 3
        || parts
            .iter()
            .any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
    {
        return partial.to_string();
    }

    let (year, month, day) = if parts[0].len() == 4 {
        (parts[0], parts[1], parts[2])
    } else if parts[2].len() == 4 {
        (parts[2], parts[1], parts[0])
    } else {
        return partial.to_string();
    };

    match (year.parse::<u32>(), month.parse::<u32>(), day.parse::<u32>()) {
        (Ok(y), Ok(m), Ok(d)) => format!("{y:04}-{m:02}-{d:02}"),
        _ => partial.to_string(),
    }
}

/// Formats tried by [`parse_date`], in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y年%m月%d日",
    "%Y.%m.%d",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%m/%d/%Y",
];

/// Parse a date string in any of the common invoice formats.
///
/// Returns `None` for empty or unrecognised input; the latter is reported
/// as a warning.
pub fn parse_date(value: &str, diagnostics: &dyn Diagnostics) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let parsed = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok());
    if parsed.is_none() {
        diagnostics.warn(&format!("could not parse date: {value}"));
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CapturingDiagnostics, Level, NullDiagnostics};

    #[test]
    fn none_is_empty_for_every_type() {
        for t in [FieldType::Text, FieldType::Number, FieldType::Date] {
            assert_eq!(normalize(None, t), "", "type {}", t.as_str());
        }
    }

    #[test]
    fn text_collapses_whitespace() {
        assert_eq!(normalize(Some("テスト　会社"), FieldType::Text), "テスト 会社");
        assert_eq!(normalize(Some("テスト   会社"), FieldType::Text), "テスト 会社");
        assert_eq!(normalize(Some("  テスト会社  "), FieldType::Text), "テスト会社");
        assert_eq!(normalize(Some("a \u{3000} \t b"), FieldType::Text), "a b");
    }

    #[test]
    fn number_strips_currency_and_separators() {
        assert_eq!(normalize(Some("¥10,000"), FieldType::Number), "10000");
        assert_eq!(normalize(Some("￥5,500"), FieldType::Number), "5500");
        assert_eq!(normalize(Some("1 0 0 0"), FieldType::Number), "1000");
    }

    #[test]
    fn number_drops_integral_fraction() {
        assert_eq!(normalize(Some("100.0"), FieldType::Number), "100");
        assert_eq!(normalize(Some("100"), FieldType::Number), "100");
        assert_eq!(normalize(Some("12.50"), FieldType::Number), "12.5");
    }

    #[test]
    fn number_parse_failure_returns_trimmed_original() {
        assert_eq!(normalize(Some(" 10,000円 "), FieldType::Number), "10,000円");
        assert_eq!(normalize(Some("inf"), FieldType::Number), "inf");
    }

    #[test]
    fn date_year_first() {
        assert_eq!(normalize(Some("2023年12月25日"), FieldType::Date), "2023-12-25");
        assert_eq!(normalize(Some("2023/12/25"), FieldType::Date), "2023-12-25");
        assert_eq!(normalize(Some("2023.12.25"), FieldType::Date), "2023-12-25");
        assert_eq!(normalize(Some("2024/1/5"), FieldType::Date), "2024-01-05");
    }

    #[test]
    fn date_year_last() {
        assert_eq!(normalize(Some("25/12/2023"), FieldType::Date), "2023-12-25");
        assert_eq!(normalize(Some("5.1.2024"), FieldType::Date), "2024-01-05");
    }

    #[test]
    fn date_without_four_digit_year_is_partial() {
        assert_eq!(normalize(Some("12/25/23"), FieldType::Date), "12-25-23");
        assert_eq!(normalize(Some("令和5年12月"), FieldType::Date), "令和5-12");
    }

    #[test]
    fn classify_numbers() {
        assert_eq!(FieldType::classify("10000"), FieldType::Number);
        assert_eq!(FieldType::classify("¥10,000"), FieldType::Number);
        assert_eq!(FieldType::classify("1,100円"), FieldType::Number);
        assert_eq!(FieldType::classify("-500"), FieldType::Number);
    }

    #[test]
    fn classify_dates() {
        assert_eq!(FieldType::classify("2023年12月25日"), FieldType::Date);
        assert_eq!(FieldType::classify("2023/12/25"), FieldType::Date);
        assert_eq!(FieldType::classify("25-12-2023"), FieldType::Date);
    }

    #[test]
    fn classify_text() {
        assert_eq!(FieldType::classify("テスト株式会社"), FieldType::Text);
        assert_eq!(FieldType::classify("03-1234-5678"), FieldType::Text);
        assert_eq!(FieldType::classify("T1234567890123"), FieldType::Text);
    }

    #[test]
    fn parse_date_known_formats() {
        let sink = NullDiagnostics;
        let expected = NaiveDate::from_ymd_opt(2023, 12, 25);
        assert_eq!(parse_date("2023-12-25", &sink), expected);
        assert_eq!(parse_date("2023/12/25", &sink), expected);
        assert_eq!(parse_date("2023年12月25日", &sink), expected);
        assert_eq!(parse_date("2023.12.25", &sink), expected);
        assert_eq!(parse_date(" 25/12/2023 ", &sink), expected);
    }

    #[test]
    fn parse_date_invalid_warns() {
        let sink = CapturingDiagnostics::new();
        assert_eq!(parse_date("invalid date", &sink), None);
        assert_eq!(sink.count(Level::Warn), 1);
    }

    #[test]
    fn parse_date_empty_is_silent() {
        let sink = CapturingDiagnostics::new();
        assert_eq!(parse_date("", &sink), None);
        assert!(sink.events().is_empty());
    }
}
