//! Multi-format date parsing.
//!
//! A date column is parsed with exactly one named strategy. Strategies are
//! tried in a fixed order on a sample of the column, and the first one that
//! parses enough of the sample is adopted for every cell.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::data_value::CellValue;

/// Named date-format strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateStrategy {
    /// `2020-01-31`, `2020/01/31`, `2020.01.31`, RFC 3339 timestamps
    Iso8601,
    /// `31.01.2020`, `31/01/2020`, `31-01-2020`
    DayFirst,
    /// `01/31/2020`, `01-31-2020`, `01.31.2020`
    MonthFirst,
    /// `31 January 2020`, `Jan 31, 2020`, `15 января 2020`, `March 2020`
    MonthName,
}

const ISO_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];
const DAY_FIRST_FORMATS: [&str; 3] = ["%d.%m.%Y", "%d/%m/%Y", "%d-%m-%Y"];
const MONTH_FIRST_FORMATS: [&str; 3] = ["%m/%d/%Y", "%m-%d-%Y", "%m.%d.%Y"];

const ENGLISH_MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

// Stems cover nominative and genitive forms ("январь", "января").
const RUSSIAN_MONTH_STEMS: [(&str, u32); 13] = [
    ("янв", 1),
    ("фев", 2),
    ("мар", 3),
    ("апр", 4),
    ("май", 5),
    ("мая", 5),
    ("июн", 6),
    ("июл", 7),
    ("авг", 8),
    ("сен", 9),
    ("окт", 10),
    ("ноя", 11),
    ("дек", 12),
];

// Filler words allowed next to a textual month
const FILLER_WORDS: [&str; 4] = ["г", "года", "of", "the"];

impl DateStrategy {
    /// All strategies in the order they are tried
    pub const ALL: [DateStrategy; 4] = [
        DateStrategy::Iso8601,
        DateStrategy::DayFirst,
        DateStrategy::MonthFirst,
        DateStrategy::MonthName,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DateStrategy::Iso8601 => "iso8601",
            DateStrategy::DayFirst => "day_first",
            DateStrategy::MonthFirst => "month_first",
            DateStrategy::MonthName => "month_name",
        }
    }

    /// Parse one string with this strategy. A trailing time of day is
    /// accepted and dropped.
    pub fn parse(&self, text: &str) -> Option<NaiveDate> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let date = match self {
            DateStrategy::Iso8601 => parse_iso(text),
            DateStrategy::DayFirst => parse_with_formats(text, &DAY_FIRST_FORMATS),
            DateStrategy::MonthFirst => parse_with_formats(text, &MONTH_FIRST_FORMATS),
            DateStrategy::MonthName => parse_month_name(text),
        }?;
        plausible_year(date)
    }

    /// Parse a cell. Only text cells can hold dates; spreadsheet date cells
    /// reach this point already converted to ISO text.
    pub fn parse_cell(&self, cell: &CellValue) -> Option<NaiveDate> {
        match cell {
            CellValue::Text(text) => self.parse(text),
            CellValue::Blank | CellValue::Number(_) => None,
        }
    }
}

impl fmt::Display for DateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Outcome of scoring a strategy against a column sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrategyScore {
    pub strategy: DateStrategy,
    /// Fraction of sampled non-blank cells the strategy parsed
    pub ratio: f64,
    pub sampled: usize,
}

/// Score every strategy on the first `sample_size` non-blank cells.
/// Returns an empty vector when the column has no non-blank cells.
pub fn score_strategies<'a, I>(cells: I, sample_size: usize) -> Vec<StrategyScore>
where
    I: IntoIterator<Item = &'a CellValue>,
{
    let sample: Vec<&CellValue> = cells
        .into_iter()
        .filter(|c| !c.is_blank())
        .take(sample_size.max(1))
        .collect();
    if sample.is_empty() {
        return Vec::new();
    }

    DateStrategy::ALL
        .iter()
        .map(|strategy| {
            let parsed = sample
                .iter()
                .filter(|cell| strategy.parse_cell(cell).is_some())
                .count();
            StrategyScore {
                strategy: *strategy,
                ratio: parsed as f64 / sample.len() as f64,
                sampled: sample.len(),
            }
        })
        .collect()
}

/// First strategy, in priority order, reaching `threshold`
pub fn detect_strategy<'a, I>(cells: I, sample_size: usize, threshold: f64) -> Option<StrategyScore>
where
    I: IntoIterator<Item = &'a CellValue>,
{
    score_strategies(cells, sample_size)
        .into_iter()
        .find(|score| score.ratio >= threshold)
}

/// Strategy with the highest non-zero ratio; earlier strategies win ties
pub fn best_strategy<'a, I>(cells: I, sample_size: usize) -> Option<StrategyScore>
where
    I: IntoIterator<Item = &'a CellValue>,
{
    score_strategies(cells, sample_size)
        .into_iter()
        .filter(|score| score.ratio > 0.0)
        .fold(None, |best: Option<StrategyScore>, score| match best {
            Some(b) if b.ratio >= score.ratio => Some(b),
            _ => Some(score),
        })
}

fn plausible_year(date: NaiveDate) -> Option<NaiveDate> {
    (1000..=9999).contains(&date.year()).then_some(date)
}

fn parse_iso(text: &str) -> Option<NaiveDate> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    // Year must lead with four digits, otherwise "01.02.2020" would be read as year 1
    if !text.chars().take(4).all(|c| c.is_ascii_digit()) {
        return None;
    }
    parse_with_formats(text, &ISO_FORMATS)
}

fn parse_with_formats(text: &str, formats: &[&str]) -> Option<NaiveDate> {
    formats.iter().find_map(|fmt| {
        NaiveDate::parse_and_remainder(text, fmt)
            .ok()
            .filter(|(_, rest)| is_time_suffix(rest))
            .map(|(date, _)| date)
    })
}

/// `""`, `" 10:30"`, `"T10:30:00"`, `" 10:30:00.000+03:00"`
fn is_time_suffix(rest: &str) -> bool {
    let Some(first) = rest.chars().next() else {
        return true;
    };
    if first != ' ' && first != 'T' {
        return false;
    }
    let time = rest[1..].trim();
    time.contains(':')
        && time
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ':' | '.' | '+' | '-' | 'Z' | ' '))
}

fn month_from_word(word: &str) -> Option<u32> {
    if word.chars().count() < 3 {
        return None;
    }
    if word.is_ascii() {
        if word == "sept" {
            return Some(9);
        }
        return ENGLISH_MONTHS
            .iter()
            .position(|name| name.starts_with(word))
            .map(|i| i as u32 + 1);
    }
    RUSSIAN_MONTH_STEMS
        .iter()
        .find(|(stem, _)| word.starts_with(stem))
        .map(|(_, month)| *month)
}

fn parse_month_name(text: &str) -> Option<NaiveDate> {
    let lowered = text.to_lowercase();
    let mut month = None;
    let mut numbers: Vec<&str> = Vec::new();

    for token in lowered
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | '-' | '.' | '/'))
        .filter(|t| !t.is_empty())
    {
        // time of day
        if token.contains(':') {
            continue;
        }
        if token.chars().all(|c| c.is_ascii_digit()) {
            numbers.push(token);
            continue;
        }
        let ordinal = ["st", "nd", "rd", "th"]
            .iter()
            .find_map(|suffix| token.strip_suffix(suffix))
            .filter(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()));
        if let Some(digits) = ordinal {
            numbers.push(digits);
            continue;
        }
        if FILLER_WORDS.contains(&token) {
            continue;
        }
        match month_from_word(token) {
            Some(m) if month.is_none() => month = Some(m),
            _ => return None,
        }
    }

    let month = month?;
    let (year, day) = match numbers.as_slice() {
        [year] if year.len() == 4 => (year.parse().ok()?, 1),
        [first, second] if first.len() == 4 => (first.parse().ok()?, second.parse().ok()?),
        [first, second] if second.len() == 4 => (second.parse().ok()?, first.parse().ok()?),
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_iso() {
        let s = DateStrategy::Iso8601;
        assert_eq!(s.parse("2020-01-31"), ymd(2020, 1, 31));
        assert_eq!(s.parse("2020/01/31 10:30:00"), ymd(2020, 1, 31));
        assert_eq!(s.parse("2020-01-31T10:30:00"), ymd(2020, 1, 31));
        assert_eq!(s.parse("2020-01-31T10:30:00+03:00"), ymd(2020, 1, 31));
        assert_eq!(s.parse("31.01.2020"), None);
        assert_eq!(s.parse("2020-01-31 total"), None);
    }

    #[test]
    fn test_day_first_and_month_first() {
        assert_eq!(DateStrategy::DayFirst.parse("31.01.2020"), ymd(2020, 1, 31));
        assert_eq!(DateStrategy::DayFirst.parse("1/2/2020"), ymd(2020, 2, 1));
        assert_eq!(DateStrategy::MonthFirst.parse("1/2/2020"), ymd(2020, 1, 2));
        assert_eq!(DateStrategy::MonthFirst.parse("31.01.2020"), None);
        // two-digit years are not guessed
        assert_eq!(DateStrategy::DayFirst.parse("31.01.20"), None);
    }

    #[test]
    fn test_month_name() {
        let s = DateStrategy::MonthName;
        assert_eq!(s.parse("15 января 2020"), ymd(2020, 1, 15));
        assert_eq!(s.parse("Май 2021"), ymd(2021, 5, 1));
        assert_eq!(s.parse("January 15, 2020"), ymd(2020, 1, 15));
        assert_eq!(s.parse("15-Jan-2020"), ymd(2020, 1, 15));
        assert_eq!(s.parse("Sept 3rd 2020"), ymd(2020, 9, 3));
        assert_eq!(s.parse("March 2020"), ymd(2020, 3, 1));
        assert_eq!(s.parse("Product 2020"), None);
        assert_eq!(s.parse("January"), None);
    }

    #[test]
    fn test_detect_strategy_order() {
        let cells: Vec<CellValue> = ["01.02.2020", "02.02.2020", "", "03.02.2020"]
            .iter()
            .map(|s| CellValue::from_text(s))
            .collect();
        // both DayFirst and MonthFirst parse this sample; DayFirst is tried first
        let score = detect_strategy(&cells, 100, 0.8).unwrap();
        assert_eq!(score.strategy, DateStrategy::DayFirst);
        assert_eq!(score.sampled, 3);
    }

    #[test]
    fn test_detect_strategy_threshold() {
        let cells: Vec<CellValue> = ["2020-01-01", "x", "y", "z"]
            .iter()
            .map(|s| CellValue::from_text(s))
            .collect();
        assert!(detect_strategy(&cells, 100, 0.8).is_none());
        let best = best_strategy(&cells, 100).unwrap();
        assert_eq!(best.strategy, DateStrategy::Iso8601);
        assert!((best.ratio - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_blank_column_has_no_score() {
        let cells = vec![CellValue::Blank, CellValue::Blank];
        assert!(score_strategies(&cells, 100).is_empty());
    }
}
