// CSV/TSV source import

use std::io::Read;
use std::path::Path;

use crisis_panel_engine::RawTable;

use crate::build_table;

pub fn read_table(path: &Path, header_row: usize) -> Result<RawTable, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content, header_row);
    parse_table(&content, delimiter, header_row)
}

pub fn read_table_with_delimiter(
    path: &Path,
    delimiter: u8,
    header_row: usize,
) -> Result<RawTable, String> {
    let content = read_file_as_utf8(path)?;
    parse_table(&content, delimiter, header_row)
}

/// Delimiters tried, in the order preferred when two split equally well.
const DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

/// Non-blank lines sampled from the header row down.
const SAMPLE_LINES: usize = 20;

/// Guess the field delimiter from the header row and the lines below it.
/// Title lines above `header_row` are ignored, since UNCTAD and ITU exports
/// put free text there. A delimiter that gives every sampled line the same
/// width beats one that does not; after that the wider split wins.
fn sniff_delimiter(content: &str, header_row: usize) -> u8 {
    let sample = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .skip(header_row)
        .take(SAMPLE_LINES)
        .collect::<Vec<_>>()
        .join("\n");

    let mut best = (b',', false, 1);
    for delim in DELIMITERS {
        let widths: Vec<usize> = csv::ReaderBuilder::new()
            .delimiter(delim)
            .has_headers(false)
            .flexible(true)
            .from_reader(sample.as_bytes())
            .records()
            .map_while(Result::ok)
            .map(|r| r.len())
            .collect();
        let Some(&header) = widths.first() else {
            continue;
        };
        let uniform = widths.iter().all(|&w| w == header);
        if header > 1 && (uniform, header) > (best.1, best.2) {
            best = (delim, uniform, header);
        }
    }
    best.0
}

/// Read file and convert to UTF-8 if needed (UCDP and UNCTAD exports are
/// sometimes Windows-1252).
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;

    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };
    Ok(text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text))
}

pub fn parse_table(content: &str, delimiter: u8, header_row: usize) -> Result<RawTable, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        grid.push(record.iter().map(|f| f.to_string()).collect());
    }
    build_table(grid, header_row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "Name;Age;City\nAlice;30;Paris\nBob;25;London\n";
        assert_eq!(sniff_delimiter(content, 0), b';');
    }

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "country,year,best\nChad,2020,3\nMali,2021,4\n";
        assert_eq!(sniff_delimiter(content, 0), b',');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "Name\tAge\tCity\nAlice\t30\tParis\nBob\t25\tLondon\n";
        assert_eq!(sniff_delimiter(content, 0), b'\t');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        let content = "Economy;Region;Code\n\"Korea, Rep.\";\"East Asia & Pacific\";KOR\nChad;\"Sub-Saharan Africa\";TCD\n";
        assert_eq!(sniff_delimiter(content, 0), b';');
    }

    #[test]
    fn test_sniff_skips_title_lines() {
        // semicolon export with decimal commas under a comma-laden title
        let content = "UNCTADstat, e-commerce sales, 2024 release\n\nYear;Economy Label;Value\n2019;Kenya;10,5\n2020;Kenya;20,25\n";
        assert_eq!(sniff_delimiter(content, 1), b';');

        let dir = tempdir().unwrap();
        let path = dir.path().join("unctad.csv");
        fs::write(&path, content).unwrap();
        let t = read_table(&path, 1).unwrap();
        assert_eq!(t.headers, vec!["Year", "Economy Label", "Value"]);
        assert_eq!(t.cell(1, 2), "20,25");
    }

    #[test]
    fn test_sniff_empty_defaults_to_comma() {
        assert_eq!(sniff_delimiter("", 0), b',');
        assert_eq!(sniff_delimiter("title only\n", 3), b',');
    }

    #[test]
    fn test_read_table_quoted_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("class.csv");
        fs::write(
            &path,
            "Economy,Code,Region\n\"Korea, Rep.\",KOR,East Asia & Pacific\n",
        )
        .unwrap();

        let t = read_table(&path, 0).unwrap();
        assert_eq!(t.headers, vec!["Economy", "Code", "Region"]);
        assert_eq!(t.cell(0, 0), "Korea, Rep.");
    }

    #[test]
    fn test_windows_1252_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ged.csv");
        // "Côte d'Ivoire" with 0xF4 for ô
        let mut bytes = b"country,year,best\nC".to_vec();
        bytes.push(0xF4);
        bytes.extend_from_slice(b"te d'Ivoire,2011,5\n");
        fs::write(&path, bytes).unwrap();

        let t = read_table(&path, 0).unwrap();
        assert_eq!(t.cell(0, 0), "Côte d'Ivoire");
    }

    #[test]
    fn test_bom_stripped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bom.csv");
        fs::write(&path, "\u{feff}Year,Economy\n2019,404\n").unwrap();
        let t = read_table(&path, 0).unwrap();
        assert_eq!(t.headers[0], "Year");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        assert!(read_table(&dir.path().join("nope.csv"), 0).is_err());
    }
}
