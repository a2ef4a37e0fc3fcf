// Country code reference table: `country_codes.csv` and the HTML page it
// is scraped from.

use std::path::Path;

use crisis_panel_engine::identity::CountryCode;
use scraper::{ElementRef, Html, Selector};

pub const DEFAULT_URL: &str =
    "https://wits.worldbank.org/wits/wits/witshelp/content/codes/country_codes.htm";

pub fn read_country_codes(path: &Path) -> Result<Vec<CountryCode>, String> {
    let mut reader = ::csv::Reader::from_path(path).map_err(|e| format!("{}: {e}", path.display()))?;
    reader
        .deserialize()
        .map(|r| r.map_err(|e| format!("{}: {e}", path.display())))
        .collect()
}

pub fn write_country_codes(path: &Path, codes: &[CountryCode]) -> Result<(), String> {
    let mut writer = ::csv::Writer::from_path(path).map_err(|e| format!("{}: {e}", path.display()))?;
    for c in codes {
        writer.serialize(c).map_err(|e| e.to_string())?;
    }
    writer.flush().map_err(|e| e.to_string())
}

fn cell_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract `(country, iso3, code)` from the first `<table>` of `html`.
/// The first row is the header; rows with fewer than three cells or a
/// non-numeric code are skipped.
pub fn parse_code_table(html: &str) -> Result<Vec<CountryCode>, String> {
    let document = Html::parse_document(html);
    let table_sel = Selector::parse("table").map_err(|e| e.to_string())?;
    let row_sel = Selector::parse("tr").map_err(|e| e.to_string())?;
    let cell_sel = Selector::parse("td").map_err(|e| e.to_string())?;

    let table = document
        .select(&table_sel)
        .next()
        .ok_or_else(|| "no <table> element in page".to_string())?;

    let mut codes = Vec::new();
    let mut skipped = 0usize;
    for row in table.select(&row_sel).skip(1) {
        let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();
        if cells.len() < 3 {
            skipped += 1;
            continue;
        }
        match cells[2].parse::<i64>() {
            Ok(code) => codes.push(CountryCode {
                country: cells[0].clone(),
                iso3: cells[1].clone(),
                code,
            }),
            Err(_) => skipped += 1,
        }
    }

    if skipped > 0 {
        log::debug!("code table: skipped {skipped} malformed rows");
    }
    if codes.is_empty() {
        return Err("code table has no data rows".into());
    }
    Ok(codes)
}
