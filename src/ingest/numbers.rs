use crate::core::data_value::CellValue;
use crate::na::NA;

/// Characters used as thousands separators that carry no other meaning
const GROUPING_CHARS: [char; 4] = [' ', '\u{a0}', '\u{202f}', '\''];

/// A metric cell after numeric coercion
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricCell {
    /// Blank in the source: an explicit missing value
    Missing,
    Value(f64),
    /// Present but not a number
    NonNumeric,
}

impl MetricCell {
    pub fn to_na(self) -> NA<f64> {
        match self {
            MetricCell::Value(v) => NA::Value(v),
            MetricCell::Missing | MetricCell::NonNumeric => NA::NA,
        }
    }
}

/// Coerce a raw cell for use as a metric value
pub fn coerce_cell(cell: &CellValue) -> MetricCell {
    match cell {
        CellValue::Blank => MetricCell::Missing,
        CellValue::Number(n) if n.is_finite() => MetricCell::Value(*n),
        CellValue::Number(_) => MetricCell::NonNumeric,
        CellValue::Text(text) => match parse_number(text) {
            Some(v) => MetricCell::Value(v),
            None => MetricCell::NonNumeric,
        },
    }
}

/// Parse a human-formatted number.
///
/// Accepts `1234.5`, `1 234,5`, `1,234.5`, `1.234,5`, `1'234`, `+12`, `-0,5`.
/// When both `,` and `.` occur the last one is the decimal separator. A lone
/// `,` followed by exactly three digits after a non-zero integer part of at
/// most three digits is a thousands separator (`1,234` is 1234, `0,125` is
/// 0.125); a lone `.` is always a decimal point.
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !GROUPING_CHARS.contains(c))
        .collect();

    let (negative, body) = match cleaned.as_bytes().first() {
        Some(b'-') => (true, &cleaned[1..]),
        Some(b'+') => (false, &cleaned[1..]),
        _ => (false, cleaned.as_str()),
    };
    if body.is_empty() || !body.starts_with(|c: char| c.is_ascii_digit() || c == '.' || c == ',') {
        return None;
    }

    let normalized = normalize_separators(body)?;
    let value: f64 = normalized.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

fn normalize_separators(body: &str) -> Option<String> {
    let commas = body.matches(',').count();
    let dots = body.matches('.').count();

    match (commas, dots) {
        (0, 0) | (0, 1) => Some(body.to_string()),
        (c, d) if c > 0 && d > 0 => {
            let last_comma = body.rfind(',')?;
            let last_dot = body.rfind('.')?;
            let (decimal, grouping) = if last_comma > last_dot {
                (',', '.')
            } else {
                ('.', ',')
            };
            if body.matches(decimal).count() != 1 {
                return None;
            }
            let (int_part, frac_part) = body.split_at(body.rfind(decimal)?);
            if frac_part.contains(grouping) || !valid_groups(int_part, grouping) {
                return None;
            }
            Some(format!("{}.{}", int_part.replace(grouping, ""), &frac_part[1..]))
        }
        (1, 0) => {
            let (int_part, frac_part) = body.split_once(',')?;
            let thousands = frac_part.len() == 3
                && frac_part.chars().all(|c| c.is_ascii_digit())
                && !int_part.is_empty()
                && int_part.len() <= 3
                && int_part.chars().any(|c| c != '0');
            if thousands {
                Some(format!("{}{}", int_part, frac_part))
            } else {
                Some(format!("{}.{}", int_part, frac_part))
            }
        }
        (c, 0) if c > 1 => valid_groups(body, ',').then(|| body.replace(',', "")),
        (0, d) if d > 1 => valid_groups(body, '.').then(|| body.replace('.', "")),
        _ => None,
    }
}

/// `1,234,567`: a leading group of 1-3 digits followed by groups of exactly 3
fn valid_groups(int_part: &str, separator: char) -> bool {
    let mut groups = int_part.split(separator);
    let first_ok = groups
        .next()
        .map(|g| !g.is_empty() && g.len() <= 3 || !int_part.contains(separator))
        .unwrap_or(false);
    first_ok && groups.all(|g| g.len() == 3 && g.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_numbers() {
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number(" +12.5 "), Some(12.5));
        assert_eq!(parse_number("-0,5"), Some(-0.5));
        assert_eq!(parse_number("1.234"), Some(1.234));
        assert_eq!(parse_number("1e3"), Some(1000.0));
    }

    #[test]
    fn test_thousands_separators() {
        assert_eq!(parse_number("1 234 567"), Some(1_234_567.0));
        assert_eq!(parse_number("1\u{a0}234,5"), Some(1234.5));
        assert_eq!(parse_number("1'234"), Some(1234.0));
        assert_eq!(parse_number("1,234"), Some(1234.0));
        assert_eq!(parse_number("1,234,567"), Some(1_234_567.0));
        assert_eq!(parse_number("1.234.567"), Some(1_234_567.0));
    }

    #[test]
    fn test_decimal_comma() {
        assert_eq!(parse_number("0,125"), Some(0.125));
        assert_eq!(parse_number("1234,567"), Some(1234.567));
        assert_eq!(parse_number("12,5"), Some(12.5));
    }

    #[test]
    fn test_mixed_separators() {
        assert_eq!(parse_number("1,234.56"), Some(1234.56));
        assert_eq!(parse_number("1.234,56"), Some(1234.56));
        assert_eq!(parse_number("1.234,567.8"), None);
    }

    #[test]
    fn test_rejects() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("1,23,4"), None);
        assert_eq!(parse_number("-"), None);
    }

    #[test]
    fn test_coerce_cell() {
        assert_eq!(coerce_cell(&CellValue::Blank), MetricCell::Missing);
        assert_eq!(coerce_cell(&CellValue::Number(2.0)), MetricCell::Value(2.0));
        assert_eq!(
            coerce_cell(&CellValue::Text("n/a".into())),
            MetricCell::NonNumeric
        );
        assert_eq!(coerce_cell(&CellValue::Number(f64::NAN)).to_na(), NA::NA);
    }
}
