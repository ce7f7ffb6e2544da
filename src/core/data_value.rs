use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// An untyped spreadsheet/CSV cell before schema inference.
///
/// Readers only ever produce these three shapes; inference and validation
/// match on them exhaustively instead of probing strings ad hoc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    Blank,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Build a cell from raw text, treating whitespace-only input as blank
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            CellValue::Blank
        } else {
            CellValue::Text(trimmed.to_string())
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, CellValue::Blank)
    }

    /// Textual view of the cell; numbers use their shortest round-trip form
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Blank => Cow::Borrowed(""),
            CellValue::Number(n) => Cow::Owned(n.to_string()),
            CellValue::Text(s) => Cow::Borrowed(s.as_str()),
        }
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Blank
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text())
    }
}
