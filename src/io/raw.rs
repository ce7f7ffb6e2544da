use crate::core::data_value::CellValue;
use serde::Serialize;
use std::collections::HashSet;

/// Untyped table as produced by a format reader, before schema inference.
///
/// Every row has exactly `columns.len()` cells: short rows are padded with
/// `CellValue::Blank`, cells beyond the header are dropped and the row is
/// listed in `overflow_rows`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
    overflow_rows: Vec<usize>,
}

impl RawTable {
    /// Build a table from header labels and rows.
    ///
    /// Labels are made unique (`name`, `name.1`, `name.2`, ...) and empty labels
    /// become `column_<i>`. Rows are padded or cut to the header width; only
    /// non-blank cells past the header count as overflow.
    pub fn new(labels: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let columns = unique_labels(labels);
        let width = columns.len();
        let mut overflow_rows = Vec::new();
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(index, mut row)| {
                if row.len() > width && row[width..].iter().any(|cell| !cell.is_blank()) {
                    overflow_rows.push(index);
                }
                row.resize(width, CellValue::Blank);
                row
            })
            .collect();
        Self {
            columns,
            rows,
            overflow_rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// 0-based indices of rows that had non-blank cells beyond the header
    pub fn overflow_rows(&self) -> &[usize] {
        &self.overflow_rows
    }

    /// True when there are no rows, or every cell is blank
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.rows.iter().all(|row| row.iter().all(CellValue::is_blank))
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    /// Cells of one column, top to bottom
    pub fn column(&self, index: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows.iter().map(move |row| &row[index])
    }

    /// Cells of a column looked up by label
    pub fn column_by_label(&self, label: &str) -> Option<impl Iterator<Item = &CellValue> + '_> {
        self.column_index(label).map(|index| self.column(index))
    }
}

fn unique_labels(labels: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut result = Vec::with_capacity(labels.len());

    for (i, label) in labels.into_iter().enumerate() {
        let base = match label.trim() {
            "" => format!("column_{}", i),
            trimmed => trimmed.to_string(),
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        seen.insert(candidate.clone());
        result.push(candidate);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_made_unique() {
        let table = RawTable::new(
            vec!["a".into(), "a".into(), "".into(), "a".into()],
            vec![],
        );
        assert_eq!(table.columns(), &["a", "a.1", "column_2", "a.2"]);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let table = RawTable::new(
            vec!["a".into(), "b".into()],
            vec![vec![CellValue::Number(1.0)]],
        );
        assert_eq!(table.rows()[0], vec![CellValue::Number(1.0), CellValue::Blank]);
        let b: Vec<_> = table.column_by_label("b").unwrap().collect();
        assert_eq!(b, vec![&CellValue::Blank]);
    }

    #[test]
    fn test_long_rows_are_cut_and_recorded() {
        let table = RawTable::new(
            vec!["a".into()],
            vec![
                vec![CellValue::Number(1.0), CellValue::Number(9.0)],
                vec![CellValue::Number(2.0), CellValue::Blank],
                vec![CellValue::Number(3.0)],
            ],
        );
        assert_eq!(table.rows()[0], vec![CellValue::Number(1.0)]);
        // a trailing empty field is not lost data
        assert_eq!(table.overflow_rows(), &[0]);
    }

    #[test]
    fn test_all_blank_is_empty() {
        let table = RawTable::new(vec!["a".into()], vec![vec![CellValue::Blank]]);
        assert!(table.is_empty());
    }
}
