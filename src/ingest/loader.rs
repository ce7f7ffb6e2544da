//! Load pipeline: bytes -> raw table -> schema -> validation -> normalized series.

use log::{debug, info};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::config::IngestConfig;
use crate::core::error::{Error, LoadFailure, Result, ValidationFailure};
use crate::ingest::inference::{infer_schema, Schema};
use crate::ingest::validation::{parse_rows, validate, IssueKind, ValidationReport};
use crate::io::csv::{decode_utf8, read_csv_bytes};
use crate::io::excel::read_excel_bytes;
use crate::io::raw::RawTable;
use crate::time_series::core::NormalizedSeries;

/// Input format of the raw bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatHint {
    Csv,
    /// xlsx, xlsm, xls, xlsb or ods; the exact format is detected from content
    Spreadsheet,
}

impl FormatHint {
    /// Choose the format from a file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(FormatHint::Csv),
            Some("xlsx") | Some("xlsm") | Some("xls") | Some("xlsb") | Some("ods") => {
                Ok(FormatHint::Spreadsheet)
            }
            _ => Err(Error::UnsupportedFormat(format!(
                "cannot load {}: expected .csv, .xlsx, .xlsm, .xls, .xlsb or .ods",
                path.display()
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FormatHint::Csv => "csv",
            FormatHint::Spreadsheet => "spreadsheet",
        }
    }
}

/// Result of a successful load
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Loaded {
    pub series: NormalizedSeries,
    /// Warnings collected on the way; always usable here
    pub report: ValidationReport,
    pub schema: Schema,
}

/// Turns raw user files into normalized series
#[derive(Debug, Clone, Default)]
pub struct Loader {
    config: IngestConfig,
}

impl Loader {
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Parse bytes into a raw table with the reader for `hint`
    pub fn read_raw(&self, bytes: &[u8], hint: FormatHint) -> std::result::Result<RawTable, LoadFailure> {
        let read_failure = |message: String| LoadFailure::Read {
            format: hint.name().to_string(),
            message,
        };

        match hint {
            FormatHint::Csv => {
                if let Err(offset) = decode_utf8(bytes) {
                    let report = ValidationReport::structural(
                        IssueKind::InvalidEncoding,
                        format!(
                            "input is not valid UTF-8 (first invalid byte at offset {}); re-save the file as UTF-8",
                            offset
                        ),
                    );
                    return Err(ValidationFailure { report }.into());
                }
                let delimiter = self
                    .config
                    .delimiter_byte()
                    .map_err(|e| read_failure(e.to_string()))?;
                read_csv_bytes(bytes, delimiter).map_err(|e| read_failure(e.to_string()))
            }
            FormatHint::Spreadsheet => read_excel_bytes(bytes, self.config.sheet_name.as_deref())
                .map_err(|e| read_failure(e.to_string())),
        }
    }

    /// Load raw bytes into a normalized series.
    ///
    /// Fails when no schema can be inferred or the validator finds a
    /// structural error; the failure carries the full report.
    pub fn load(&self, bytes: &[u8], hint: FormatHint) -> std::result::Result<Loaded, LoadFailure> {
        let table = self.read_raw(bytes, hint)?;
        debug!(
            "read {} row(s) x {} column(s) from {} input",
            table.row_count(),
            table.column_count(),
            hint.name()
        );
        self.load_table(&table)
    }

    /// Run inference, validation and normalization on an already-read table
    pub fn load_table(&self, table: &RawTable) -> std::result::Result<Loaded, LoadFailure> {
        let schema = infer_schema(table, &self.config)?;
        let report = validate(table, &schema, &self.config);
        if !report.is_usable {
            return Err(ValidationFailure { report }.into());
        }

        let series = normalize(table, &schema).ok_or_else(|| {
            let report = ValidationReport::structural(
                IssueKind::MissingDateColumn,
                format!("column '{}' vanished during normalization", schema.date_column),
            );
            LoadFailure::from(ValidationFailure { report })
        })?;

        info!(
            "loaded {} record(s) for {} metric(s); {} warning(s)",
            series.len(),
            series.metric_names().len(),
            report.warnings().count()
        );
        Ok(Loaded {
            series,
            report,
            schema,
        })
    }

    /// Read a file and load it, choosing the format from its extension
    pub fn load_path<P: AsRef<Path>>(&self, path: P) -> Result<Loaded> {
        let hint = FormatHint::from_path(path.as_ref())?;
        let bytes = fs::read(path.as_ref())?;
        Ok(self.load(&bytes, hint)?)
    }
}

/// Sort by date (stable), drop repeated rows, build typed columns
fn normalize(table: &RawTable, schema: &Schema) -> Option<NormalizedSeries> {
    let mut rows = parse_rows(table, schema)?.rows;
    rows.sort_by_key(|row| row.date);

    // Validation has already rejected same-date rows that differ
    let before = rows.len();
    rows.dedup_by(|later, earlier| later.date == earlier.date);
    if rows.len() < before {
        debug!("removed {} duplicate row(s)", before - rows.len());
    }

    let dates = rows.iter().map(|row| row.date).collect();
    let metrics = schema
        .metric_columns
        .iter()
        .enumerate()
        .map(|(m, name)| {
            let column = rows.iter().map(|row| row.values[m].to_na()).collect();
            (name.clone(), column)
        })
        .collect();

    NormalizedSeries::new(schema.date_column.clone(), dates, metrics).ok()
}
