//! `crisis-panel inspect`: survey a raw source before writing its config.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crisis_panel_engine::RawTable;

use crate::CliError;

/// Widest a cell is printed before truncation.
const MAX_CELL_WIDTH: usize = 24;

fn is_spreadsheet(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("xlsx" | "xlsm" | "xls" | "xlsb" | "ods")
    )
}

pub fn cmd_inspect(
    file: PathBuf,
    sheet: Option<String>,
    header_row: usize,
    rows: usize,
) -> Result<(), CliError> {
    if !file.exists() {
        return Err(CliError::args(format!("file not found: {}", file.display())));
    }

    let sheets = if is_spreadsheet(&file) {
        crisis_panel_io::xlsx::sheet_names(&file).map_err(CliError::runtime)?
    } else {
        Vec::new()
    };

    let table = crisis_panel_io::load_table(&file, sheet.as_deref(), header_row)
        .map_err(|e| CliError::runtime(e).with_hint("try --header-row N to skip title rows"))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    render(&mut out, &file, &sheets, &table, rows)
        .map_err(|e| CliError::runtime(e.to_string()))
}

fn clip(cell: &str) -> String {
    if cell.chars().count() <= MAX_CELL_WIDTH {
        cell.to_string()
    } else {
        let head: String = cell.chars().take(MAX_CELL_WIDTH - 1).collect();
        format!("{head}…")
    }
}

fn render(
    out: &mut impl Write,
    file: &Path,
    sheets: &[String],
    table: &RawTable,
    rows: usize,
) -> io::Result<()> {
    writeln!(out, "file:    {}", file.display())?;
    if !sheets.is_empty() {
        writeln!(out, "sheets:  {}", sheets.join(", "))?;
    }
    writeln!(out, "shape:   {} rows x {} columns", table.rows.len(), table.headers.len())?;
    writeln!(out)?;

    writeln!(out, "columns:")?;
    for (i, h) in table.headers.iter().enumerate() {
        writeln!(out, "  {i:>3}  {h}")?;
    }

    let shown = rows.min(table.rows.len());
    if shown == 0 {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "first {shown} row(s):")?;

    let widths: Vec<usize> = (0..table.headers.len())
        .map(|c| {
            let header = clip(&table.headers[c]).chars().count();
            (0..shown)
                .map(|r| clip(table.cell(r, c)).chars().count())
                .fold(header, usize::max)
        })
        .collect();

    let line = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, &w)| format!("{c:<w$}"))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    writeln!(out, "  {}", line(table.headers.iter().map(|h| clip(h)).collect()).trim_end())?;
    for r in 0..shown {
        let cells = (0..table.headers.len()).map(|c| clip(table.cell(r, c))).collect();
        writeln!(out, "  {}", line(cells).trim_end())?;
    }
    Ok(())
}
