// Excel source import (xlsx, xls, xlsb, ods)
//
// One-way: a single worksheet becomes a RawTable of display strings.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use crisis_panel_engine::RawTable;

use crate::build_table;

/// Maximum number of cells to read (prevents runaway memory on huge sheets)
const MAX_CELLS: usize = 5_000_000;

/// List worksheet names in workbook order.
pub fn sheet_names(path: &Path) -> Result<Vec<String>, String> {
    let workbook = open_workbook_auto(path).map_err(|e| format!("Failed to open Excel file: {}", e))?;
    Ok(workbook.sheet_names().to_vec())
}

/// Read `sheet` (or the first sheet) with headers at `header_row`.
pub fn read_sheet(path: &Path, sheet: Option<&str>, header_row: usize) -> Result<RawTable, String> {
    let mut workbook = open_workbook_auto(path).map_err(|e| format!("Failed to open Excel file: {}", e))?;

    let names = workbook.sheet_names().to_vec();
    let name = match sheet {
        Some(s) if names.iter().any(|n| n == s) => s.to_string(),
        Some(s) => {
            return Err(format!(
                "sheet '{}' not found (available: {})",
                s,
                names.join(", ")
            ))
        }
        None => names
            .first()
            .cloned()
            .ok_or_else(|| "Excel file contains no sheets".to_string())?,
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", name, e))?;

    // Range start offset (data may not begin at A1). Pad so row/column
    // positions match what the user sees in the spreadsheet.
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut grid: Vec<Vec<String>> = vec![Vec::new(); start_row as usize];
    let mut total_cells = 0usize;

    for row in range.rows() {
        let mut out = vec![String::new(); start_col as usize];
        out.extend(row.iter().map(format_cell));
        total_cells += out.len();
        grid.push(out);
        if total_cells >= MAX_CELLS {
            log::warn!("sheet '{}': stopped reading at {} cells", name, MAX_CELLS);
            break;
        }
    }

    build_table(grid, header_row)
}

/// Display string for one cell. Empty string means missing.
fn format_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            // Format nicely: integers without decimals (years, codes)
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => format!("{}", n),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        // Spreadsheet errors (#N/A, #DIV/0!) read as missing values
        Data::Error(_) => String::new(),
        Data::DateTime(dt) => format!("{}", dt.as_f64()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}
