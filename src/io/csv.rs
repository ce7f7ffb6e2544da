use csv::{ReaderBuilder, WriterBuilder};
use log::debug;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::core::data_value::CellValue;
use crate::core::error::{Error, Result};
use crate::io::raw::RawTable;
use crate::time_series::core::NormalizedSeries;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Delimiters considered when none is configured, in tie-break order
pub const CANDIDATE_DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

/// Decode CSV bytes as UTF-8, dropping a leading byte-order mark.
///
/// On failure returns the byte offset (in the original input) of the first
/// invalid sequence.
pub fn decode_utf8(bytes: &[u8]) -> std::result::Result<&str, usize> {
    let (body, skipped) = match bytes.strip_prefix(UTF8_BOM) {
        Some(rest) => (rest, UTF8_BOM.len()),
        None => (bytes, 0),
    };
    std::str::from_utf8(body).map_err(|e| e.valid_up_to() + skipped)
}

/// Pick the delimiter that occurs most often in the header line, ignoring
/// quoted sections. Ties and a header with none of them resolve to `,`.
pub fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    let mut counts = [0usize; CANDIDATE_DELIMITERS.len()];
    let mut in_quotes = false;

    for byte in header.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(pos) = CANDIDATE_DELIMITERS.iter().position(|d| *d == byte) {
            counts[pos] += 1;
        }
    }

    let mut best = 0;
    for (i, count) in counts.iter().enumerate() {
        if *count > counts[best] {
            best = i;
        }
    }
    CANDIDATE_DELIMITERS[best]
}

/// Parse CSV bytes into a raw table. The first record is the header.
pub fn read_csv_bytes(bytes: &[u8], delimiter: Option<u8>) -> Result<RawTable> {
    let text = decode_utf8(bytes).map_err(|offset| {
        Error::InvalidInput(format!("input is not valid UTF-8 (byte offset {})", offset))
    })?;
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(text));
    debug!("reading CSV with delimiter {:?}", delimiter as char);

    // Set up the CSV reader
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(CellValue::from_text).collect());
    }

    Ok(RawTable::new(headers, rows))
}

/// Read a CSV file into a raw table
pub fn read_csv<P: AsRef<Path>>(path: P, delimiter: Option<u8>) -> Result<RawTable> {
    let bytes = fs::read(path.as_ref())?;
    read_csv_bytes(&bytes, delimiter)
}

/// Write a normalized series as CSV.
///
/// The header is the date label followed by the metric names. Dates are
/// ISO `YYYY-MM-DD`; missing values are empty fields.
pub fn write_csv<W: Write>(series: &NormalizedSeries, writer: W) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(writer);

    // Write the header row
    let mut header = Vec::with_capacity(series.metric_names().len() + 1);
    header.push(series.date_label().to_string());
    header.extend(series.metric_names().iter().cloned());
    wtr.write_record(&header)?;

    for record in series.records() {
        let mut row = Vec::with_capacity(header.len());
        row.push(record.date().format("%Y-%m-%d").to_string());
        for (_, value) in record.values() {
            row.push(match value.get() {
                Some(v) => v.to_string(),
                None => String::new(),
            });
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Serialize a normalized series to a CSV string
pub fn to_csv_string(series: &NormalizedSeries) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(series, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| Error::SerializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::na::NA;
    use chrono::NaiveDate;

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("Дата;Товар 1;Товар 2\n01.01.2020;1,5;2"), b';');
        assert_eq!(sniff_delimiter("a\tb\tc"), b'\t');
        assert_eq!(sniff_delimiter("\"a;b\",c"), b',');
        assert_eq!(sniff_delimiter("single"), b',');
    }

    #[test]
    fn test_decode_utf8_bom_and_offset() {
        assert_eq!(decode_utf8(b"\xEF\xBB\xBFDate,A"), Ok("Date,A"));
        assert_eq!(decode_utf8(b"Date,\xFFA"), Err(5));
        assert_eq!(decode_utf8(b"\xEF\xBB\xBFab\xFF"), Err(5));
    }

    #[test]
    fn test_read_csv_bytes() {
        let table = read_csv_bytes(b"Date;A;B\n2020-01-01; 1 ;\n2020-01-02;2\n", None).unwrap();
        assert_eq!(table.columns(), &["Date", "A", "B"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[0][1], CellValue::Text("1".to_string()));
        assert_eq!(table.rows()[0][2], CellValue::Blank);
        // short row padded
        assert_eq!(table.rows()[1][2], CellValue::Blank);
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        assert!(read_csv_bytes(b"Date,A\n\xFF,1", None).is_err());
    }

    #[test]
    fn test_to_csv_string() {
        let series = NormalizedSeries::new(
            "Date",
            vec![
                NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
            ],
            vec![("A".to_string(), vec![NA::Value(1.5), NA::NA])],
        )
        .unwrap();

        let csv = to_csv_string(&series).unwrap();
        assert_eq!(csv, "Date,A\n2020-01-01,1.5\n2020-01-02,\n");
    }
}
