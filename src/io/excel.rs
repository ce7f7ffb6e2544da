use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Duration, NaiveDate};
use log::debug;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use crate::core::data_value::CellValue;
use crate::core::error::{Error, Result};
use crate::io::raw::RawTable;

/// Read a spreadsheet (xlsx/xls/xlsb/ods, auto-detected) from memory.
///
/// # Arguments
///
/// * `bytes` - Raw workbook contents
/// * `sheet_name` - Sheet to read. If None, reads the first sheet
///
/// The first row of the sheet is the header. Spreadsheet date cells are
/// returned as ISO `YYYY-MM-DD` text so they go through the same date
/// inference as CSV input.
pub fn read_excel_bytes(bytes: &[u8], sheet_name: Option<&str>) -> Result<RawTable> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| Error::Spreadsheet(format!("Could not open workbook: {}", e)))?;

    // Get sheet name (first sheet if not specified)
    let sheet_name = match sheet_name {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| Error::Spreadsheet("Workbook has no sheets".to_string()))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| Error::Spreadsheet(format!("Could not read sheet '{}': {}", sheet_name, e)))?;
    debug!(
        "read sheet '{}' with {} row(s)",
        sheet_name,
        range.height()
    );

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .map(|cell| cell_to_value(cell).as_text().into_owned())
            .collect(),
        None => return Ok(RawTable::new(Vec::new(), Vec::new())),
    };

    let body = rows
        .map(|row| row.iter().map(cell_to_value).collect())
        .collect();

    Ok(RawTable::new(headers, body))
}

/// Read a spreadsheet file into a raw table
pub fn read_excel<P: AsRef<Path>>(path: P, sheet_name: Option<&str>) -> Result<RawTable> {
    let bytes = fs::read(path.as_ref())?;
    read_excel_bytes(&bytes, sheet_name)
}

/// Map a calamine cell onto the three-state cell model
fn cell_to_value(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::from_text(s),
        Data::DateTime(dt) => match serial_to_date(dt.as_f64()) {
            Some(date) => CellValue::Text(date.format("%Y-%m-%d").to_string()),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => CellValue::from_text(s),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::Error(_) | Data::Empty => CellValue::Blank,
        other => CellValue::from_text(&other.to_string()),
    }
}

/// Convert a spreadsheet serial day number (1900 system) to a date
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::try_days(serial.floor() as i64)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_to_date() {
        assert_eq!(
            serial_to_date(43831.0),
            NaiveDate::from_ymd_opt(2020, 1, 1)
        );
        // time of day is dropped
        assert_eq!(
            serial_to_date(43831.75),
            NaiveDate::from_ymd_opt(2020, 1, 1)
        );
        assert_eq!(serial_to_date(f64::NAN), None);
    }

    #[test]
    fn test_out_of_range_serial_is_not_a_date() {
        assert_eq!(serial_to_date(1e17), None);
        assert_eq!(serial_to_date(1e9), None);
    }

    #[test]
    fn test_cell_mapping() {
        assert_eq!(cell_to_value(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(cell_to_value(&Data::String("  ".into())), CellValue::Blank);
        assert_eq!(cell_to_value(&Data::Empty), CellValue::Blank);
        assert_eq!(
            cell_to_value(&Data::Bool(true)),
            CellValue::Text("true".to_string())
        );
    }

    #[test]
    fn test_garbage_bytes_fail() {
        assert!(read_excel_bytes(b"not a workbook", None).is_err());
    }
}
