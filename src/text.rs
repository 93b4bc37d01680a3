use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use maintenance_scraping_utils::regex;
use thiserror::Error;

/// Replaces full-width ASCII variants (U+FF01..=U+FF5E) and the ideographic
/// space with their half-width counterparts.
pub fn fold_width(text: &str) -> String {
    text.chars().map(fold_char).collect()
}

fn fold_char(c: char) -> char {
    match c {
        '\u{3000}' => ' ',
        '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
        _ => c,
    }
}

/// Joins the text nodes of a cell the way a browser's `innerText` roughly does.
pub fn collapse_whitespace(text: &str) -> String {
    regex!(r"\s+").replace_all(text.trim(), " ").into_owned()
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CanonicalFormat {
    /// `YYYY/MM/DD`
    Date,
    /// `YYYY-MM-DD HH:MM:SS`
    DateTime,
}
impl CanonicalFormat {
    pub fn pattern(self) -> &'static str {
        match self {
            Self::Date => "%Y/%m/%d",
            Self::DateTime => "%Y-%m-%d %H:%M:%S",
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Error)]
#[error("{text:?} does not match the date pattern {pattern:?}: {source}")]
pub struct DateFormatError {
    pub text: String,
    pub pattern: String,
    #[source]
    pub source: chrono::ParseError,
}

pub fn parse_localized_date(
    text: &str,
    input_pattern: &str,
    canonical: CanonicalFormat,
) -> Result<String, DateFormatError> {
    let text = text.trim();
    // Date-only patterns are rejected by the date-time parser, so fall back to midnight.
    let parsed = NaiveDateTime::parse_from_str(text, input_pattern).or_else(|e| {
        NaiveDate::parse_from_str(text, input_pattern)
            .map(|date| date.and_time(NaiveTime::MIN))
            .map_err(|_| e)
    });
    match parsed {
        Ok(time) => Ok(time.format(canonical.pattern()).to_string()),
        Err(source) => Err(DateFormatError {
            text: text.to_owned(),
            pattern: input_pattern.to_owned(),
            source,
        }),
    }
}
