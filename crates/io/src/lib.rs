// File adapters for the panel pipeline: raw source tables in, artifacts out.

pub mod country_codes;
pub mod csv;
pub mod records;
pub mod xlsx;

use std::path::Path;

use crisis_panel_engine::config::InputSpec;
use crisis_panel_engine::RawTable;

/// Read one source file into a `RawTable`, dispatching on extension.
/// `header_row` is the zero-based row holding the column names.
pub fn load_table(path: &Path, sheet: Option<&str>, header_row: usize) -> Result<RawTable, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => xlsx::read_sheet(path, sheet, header_row),
        "tsv" | "tab" => csv::read_table_with_delimiter(path, b'\t', header_row),
        _ => csv::read_table(path, header_row),
    }
    .map_err(|e| format!("{}: {e}", path.display()))
}

/// Read every file of a source, resolving paths against `base_dir`.
pub fn load_source(spec: &InputSpec, base_dir: &Path) -> Result<Vec<RawTable>, String> {
    spec.files
        .iter()
        .map(|f| load_table(&base_dir.join(f), spec.sheet.as_deref(), spec.header_row))
        .collect()
}

/// Split raw grid rows into headers + data at `header_row`. Blank rows are
/// skipped. Header names are made unique the way spreadsheet readers usually
/// do it: blanks become `Unnamed: N`, repeats get a `.1`, `.2` suffix.
pub(crate) fn build_table(grid: Vec<Vec<String>>, header_row: usize) -> Result<RawTable, String> {
    if header_row >= grid.len() {
        return Err(format!(
            "header row {header_row} is past the end of the data ({} rows)",
            grid.len()
        ));
    }
    let mut grid = grid.into_iter().skip(header_row);
    let raw_headers = grid.next().unwrap_or_default();
    let rows: Vec<Vec<String>> = grid
        .filter(|r| r.iter().any(|c| !c.trim().is_empty()))
        .collect();

    let width = rows
        .iter()
        .map(|r| r.len())
        .max()
        .unwrap_or(0)
        .max(raw_headers.len());
    let mut headers: Vec<String> = Vec::with_capacity(width);
    for i in 0..width {
        let name = raw_headers.get(i).map(|h| h.trim()).unwrap_or("");
        let base = if name.is_empty() {
            format!("Unnamed: {i}")
        } else {
            name.to_string()
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while headers.contains(&candidate) {
            candidate = format!("{base}.{n}");
            n += 1;
        }
        headers.push(candidate);
    }

    Ok(RawTable::new(headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn header_row_offset_and_dedupe() {
        let g = grid(&[
            &["ITU key indicators"],
            &[""],
            &["", "2019", "2020", "2020"],
            &["World", "1", "2", "3"],
            &["", "", "", ""],
            &["Africa", "4", "5", "6", "extra"],
        ]);
        let t = build_table(g, 2).unwrap();
        assert_eq!(t.headers, vec!["Unnamed: 0", "2019", "2020", "2020.1", "Unnamed: 4"]);
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.rows[1][0], "Africa");
    }

    #[test]
    fn header_row_past_end() {
        assert!(build_table(grid(&[&["a"]]), 3).is_err());
    }
}
