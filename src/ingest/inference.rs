//! Schema inference: which column is the date axis, which are metrics.

use log::{debug, warn};
use serde::Serialize;

use crate::config::IngestConfig;
use crate::core::error::InferenceFailure;
use crate::ingest::dates::{best_strategy, detect_strategy, DateStrategy, StrategyScore};
use crate::ingest::numbers::{coerce_cell, MetricCell};
use crate::io::raw::RawTable;

/// How the date column was identified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateDetection {
    /// The header matched a known date token
    Header,
    /// No header matched; the column content parsed as dates
    Content,
}

/// A non-date column rejected as a metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedColumn {
    pub column: String,
    /// Fraction of non-blank cells that parsed as numbers
    pub numeric_ratio: f64,
}

/// Inferred layout of a raw table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub date_column: String,
    pub date_strategy: DateStrategy,
    pub date_detection: DateDetection,
    /// Share of sampled date cells the adopted strategy parsed
    pub date_parse_ratio: f64,
    /// Metric columns in source order
    pub metric_columns: Vec<String>,
    pub dropped_columns: Vec<DroppedColumn>,
}

/// Whether a header label names a date column.
///
/// Single-word tokens match any word of the label (`"Дата продажи"` matches
/// `дата`); tokens with punctuation or spaces must match the whole label.
pub fn is_date_header(label: &str, tokens: &[String]) -> bool {
    let label = label.trim().to_lowercase();
    let words: Vec<&str> = label
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    tokens.iter().any(|token| {
        let token = token.trim().to_lowercase();
        if token.is_empty() {
            return false;
        }
        if token.chars().all(char::is_alphanumeric) {
            words.iter().any(|w| *w == token)
        } else {
            label == token
        }
    })
}

/// Infer the schema of a raw table
pub fn infer_schema(table: &RawTable, config: &IngestConfig) -> Result<Schema, InferenceFailure> {
    if table.is_empty() {
        return Err(InferenceFailure::EmptyTable);
    }

    let (date_index, score, detection) =
        find_date_column(table, config).ok_or_else(|| InferenceFailure::NoDateColumn {
            checked: table.column_count(),
            columns: table.columns().join(", "),
        })?;
    let date_column = table.columns()[date_index].clone();
    debug!(
        "date column '{}' detected by {:?} using {} ({:.0}% of sample)",
        date_column,
        detection,
        score.strategy,
        score.ratio * 100.0
    );

    let mut metric_columns = Vec::new();
    let mut dropped_columns = Vec::new();

    for (index, label) in table.columns().iter().enumerate() {
        if index == date_index {
            continue;
        }

        let mut non_blank = 0usize;
        let mut numeric = 0usize;
        for cell in table.column(index) {
            match coerce_cell(cell) {
                MetricCell::Missing => {}
                MetricCell::Value(_) => {
                    non_blank += 1;
                    numeric += 1;
                }
                MetricCell::NonNumeric => non_blank += 1,
            }
        }

        // An entirely blank column is an all-missing metric, not a text column
        if non_blank == 0 {
            metric_columns.push(label.clone());
            continue;
        }

        let ratio = numeric as f64 / non_blank as f64;
        if ratio >= config.numeric_threshold {
            metric_columns.push(label.clone());
        } else {
            warn!(
                "dropping column '{}': only {:.0}% of values are numeric",
                label,
                ratio * 100.0
            );
            dropped_columns.push(DroppedColumn {
                column: label.clone(),
                numeric_ratio: ratio,
            });
        }
    }

    if metric_columns.is_empty() {
        let dropped = if dropped_columns.is_empty() {
            "none".to_string()
        } else {
            dropped_columns
                .iter()
                .map(|d| d.column.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        return Err(InferenceFailure::NoMetricColumns {
            date_column,
            dropped,
        });
    }

    Ok(Schema {
        date_column,
        date_strategy: score.strategy,
        date_detection: detection,
        date_parse_ratio: score.ratio,
        metric_columns,
        dropped_columns,
    })
}

fn find_date_column(
    table: &RawTable,
    config: &IngestConfig,
) -> Option<(usize, StrategyScore, DateDetection)> {
    // A matching header wins even below the threshold, as long as something parses
    for (index, label) in table.columns().iter().enumerate() {
        if !is_date_header(label, &config.date_tokens) {
            continue;
        }
        let score = detect_strategy(
            table.column(index),
            config.date_sample_size,
            config.date_threshold,
        )
        .or_else(|| best_strategy(table.column(index), config.date_sample_size));
        if let Some(score) = score {
            return Some((index, score, DateDetection::Header));
        }
        debug!("header '{}' looks like a date but no value parses", label);
    }

    (0..table.column_count()).find_map(|index| {
        detect_strategy(
            table.column(index),
            config.date_sample_size,
            config.date_threshold,
        )
        .map(|score| (index, score, DateDetection::Content))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data_value::CellValue;

    fn table(labels: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            labels.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|s| CellValue::from_text(s)).collect())
                .collect(),
        )
    }

    #[test]
    fn test_header_tokens() {
        let tokens = IngestConfig::default().date_tokens;
        assert!(is_date_header("Дата", &tokens));
        assert!(is_date_header("Дата продажи", &tokens));
        assert!(is_date_header("Order DATE", &tokens));
        assert!(is_date_header("Unnamed: 0", &tokens));
        assert!(!is_date_header("Update", &tokens));
        assert!(!is_date_header("Product_1", &tokens));
    }

    #[test]
    fn test_russian_header_day_first() {
        let t = table(
            &["Дата", "Товар 1"],
            &[&["01.02.2020", "10"], &["02.02.2020", "12,5"]],
        );
        let schema = infer_schema(&t, &IngestConfig::default()).unwrap();
        assert_eq!(schema.date_column, "Дата");
        assert_eq!(schema.date_strategy, DateStrategy::DayFirst);
        assert_eq!(schema.date_detection, DateDetection::Header);
        assert_eq!(schema.metric_columns, vec!["Товар 1"]);
    }

    #[test]
    fn test_content_fallback() {
        let t = table(
            &["when", "sales"],
            &[&["2020-01-01", "1"], &["2020-01-02", "2"]],
        );
        let schema = infer_schema(&t, &IngestConfig::default()).unwrap();
        assert_eq!(schema.date_column, "when");
        assert_eq!(schema.date_detection, DateDetection::Content);
    }

    #[test]
    fn test_text_column_dropped_blank_column_kept() {
        let t = table(
            &["Date", "A", "Comment", "Empty"],
            &[&["2020-01-01", "1", "ok", ""], &["2020-01-02", "x", "fine", ""]],
        );
        let schema = infer_schema(&t, &IngestConfig::default()).unwrap();
        // "A" is 50% numeric: exactly at the threshold
        assert_eq!(schema.metric_columns, vec!["A", "Empty"]);
        assert_eq!(schema.dropped_columns.len(), 1);
        assert_eq!(schema.dropped_columns[0].column, "Comment");
    }

    #[test]
    fn test_no_date_column() {
        let t = table(&["a", "b"], &[&["x", "1"], &["y", "2"]]);
        let err = infer_schema(&t, &IngestConfig::default()).unwrap_err();
        assert!(err.to_string().contains("no date column found"));
    }

    #[test]
    fn test_no_metric_columns() {
        let t = table(&["Date", "Note"], &[&["2020-01-01", "hello"]]);
        let err = infer_schema(&t, &IngestConfig::default()).unwrap_err();
        assert_eq!(err.kind(), "no_metric_columns");
    }

    #[test]
    fn test_empty_table() {
        let t = table(&["Date", "A"], &[]);
        assert_eq!(
            infer_schema(&t, &IngestConfig::default()),
            Err(InferenceFailure::EmptyTable)
        );
    }
}
