//! In-memory tabular input handed over by the file readers.
//!
//! Cells are kept as display strings (empty = missing), the same way the
//! spreadsheet importer stores calamine values.

use crate::error::PanelError;
use crate::model::SourceKind;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Like `column_index`, but a missing column is a schema error for `source`.
    pub fn require_column(&self, source: SourceKind, name: &str) -> Result<usize, PanelError> {
        self.column_index(name).ok_or_else(|| PanelError::MissingColumn {
            source_kind: source,
            column: name.into(),
        })
    }

    /// Cell text, trimmed. Ragged rows read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.trim())
            .unwrap_or("")
    }

    /// Stack tables with matching column names. Columns present in only some
    /// tables are kept, read as empty where absent. Header order follows
    /// first appearance.
    pub fn concat(tables: &[RawTable]) -> RawTable {
        let mut headers: Vec<String> = Vec::new();
        for t in tables {
            for h in &t.headers {
                if !headers.contains(h) {
                    headers.push(h.clone());
                }
            }
        }

        let mut rows = Vec::new();
        for t in tables {
            let mapping: Vec<Option<usize>> =
                headers.iter().map(|h| t.column_index(h)).collect();
            for r in &t.rows {
                rows.push(
                    mapping
                        .iter()
                        .map(|m| m.and_then(|i| r.get(i).cloned()).unwrap_or_default())
                        .collect(),
                );
            }
        }

        RawTable { headers, rows }
    }
}

/// Parse a numeric cell. Empty and non-numeric text (`..`, `n/a`) is missing.
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.replace(',', "").parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a year cell written either as `2019` or as a float `2019.0`.
pub fn parse_year(s: &str) -> Option<i32> {
    let s = s.trim();
    if let Ok(y) = s.parse::<i32>() {
        return Some(y);
    }
    let f = s.parse::<f64>().ok()?;
    if f.fract() == 0.0 && f.abs() < 1e6 {
        Some(f as i32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn concat_aligns_by_name() {
        let a = t(&["Year", "Value"], &[&["2019", "1"]]);
        let b = t(&["Value", "Year", "Extra"], &[&["2", "2020", "x"]]);
        let c = RawTable::concat(&[a, b]);
        assert_eq!(c.headers, vec!["Year", "Value", "Extra"]);
        assert_eq!(c.rows[0], vec!["2019", "1", ""]);
        assert_eq!(c.rows[1], vec!["2020", "2", "x"]);
    }

    #[test]
    fn ragged_rows_read_empty() {
        let table = t(&["a", "b"], &[&["1"]]);
        assert_eq!(table.cell(0, 1), "");
        assert_eq!(table.cell(5, 0), "");
    }

    #[test]
    fn numbers_and_years() {
        assert_eq!(parse_number("12.5"), Some(12.5));
        assert_eq!(parse_number("1,250"), Some(1250.0));
        assert_eq!(parse_number(".."), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_year("2019"), Some(2019));
        assert_eq!(parse_year("2019.0"), Some(2019));
        assert_eq!(parse_year("2019.5"), None);
        assert_eq!(parse_year("abc"), None);
    }
}
