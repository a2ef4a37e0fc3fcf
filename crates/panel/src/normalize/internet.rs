use log::{debug, warn};

use super::{NormalizedSource, SourceNormalizer};
use crate::config::InternetSource;
use crate::error::PanelError;
use crate::identity::{IdentityResolver, Resolution, SourceContext};
use crate::model::{CountryYearRecord, Metric, Metrics, SourceKind};
use crate::table::{parse_number, RawTable};

// ---------------------------------------------------------------------------
// ITU regional aggregates
// ---------------------------------------------------------------------------

/// Wide ITU sheet: the first column names the row, indicator blocks are
/// introduced by a label row, years run across the columns.
#[derive(Debug, Clone)]
pub struct ItuInternetNormalizer {
    pub label: String,
    pub strip: String,
}

impl ItuInternetNormalizer {
    pub fn from_config(c: &InternetSource) -> Self {
        Self {
            label: c.label.clone(),
            strip: c.strip.clone(),
        }
    }
}

impl Default for ItuInternetNormalizer {
    fn default() -> Self {
        Self {
            label: "Percentage of individuals using the Internet".into(),
            strip: "Percentage of individuals using the Internet, total".into(),
        }
    }
}

/// `2019` or a deduplicated header such as `2019.1`.
fn itu_year_header(header: &str) -> Option<i32> {
    let header = header.trim();
    let (year, suffix) = match header.split_once('.') {
        Some((y, s)) => (y, Some(s)),
        None => (header, None),
    };
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if let Some(s) = suffix {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }
    year.parse().ok()
}

impl SourceNormalizer for ItuInternetNormalizer {
    fn kind(&self) -> SourceKind {
        SourceKind::Internet
    }

    fn normalize(
        &self,
        table: &RawTable,
        resolver: &IdentityResolver,
    ) -> Result<NormalizedSource, PanelError> {
        let kind = self.kind();
        if table.headers.is_empty() {
            return Err(PanelError::MissingColumn {
                source_kind: kind,
                column: "country".into(),
            });
        }

        let has_label = |i: usize| table.cell(i, 0).contains(self.label.as_str());
        let start = (0..table.rows.len())
            .find(|&i| has_label(i))
            .ok_or_else(|| PanelError::LabelBlockNotFound {
                source_kind: kind,
                label: self.label.clone(),
            })?;
        let end = (start + 1..table.rows.len())
            .find(|&i| has_label(i))
            .unwrap_or(table.rows.len());

        let year_cols: Vec<(usize, i32)> = table
            .headers
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(i, h)| itu_year_header(h).map(|y| (i, y)))
            .collect();
        if year_cols.is_empty() {
            warn!("internet: no year columns in ITU table");
        }

        let ctx = SourceContext::names(kind);
        let mut out = NormalizedSource::default();
        for i in start + 1..end {
            let raw = table.cell(i, 0).replace(self.strip.as_str(), "");
            let raw = raw.trim();
            let country = match resolver.resolve(raw, ctx) {
                Resolution::Resolved(c) => Some(c),
                Resolution::Unresolved => None,
            };
            for &(col, year) in &year_cols {
                let Some(value) = parse_number(table.cell(i, col)) else {
                    out.dropped_rows += 1;
                    continue;
                };
                match &country {
                    Some(c) => out.dataset.records.push(CountryYearRecord::new(
                        c.clone(),
                        year,
                        Metrics::only(Metric::InternetUsage, value),
                    )),
                    None => out.unresolved.record(raw),
                }
            }
        }

        debug!(
            "internet: ITU block rows {}..{} x {} year columns -> {} records",
            start + 1,
            end,
            year_cols.len(),
            out.dataset.records.len()
        );
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// World Bank WDI
// ---------------------------------------------------------------------------

/// WDI export: one row per (country, series), year columns `2019 [YR2019]`.
#[derive(Debug, Clone)]
pub struct WdiInternetNormalizer {
    pub series_column: String,
    pub series_code: String,
    pub country_column: String,
}

impl WdiInternetNormalizer {
    pub fn from_config(c: &InternetSource) -> Self {
        Self {
            series_column: c.series_column.clone(),
            series_code: c.series_code.clone(),
            country_column: c.country_column.clone(),
        }
    }
}

impl Default for WdiInternetNormalizer {
    fn default() -> Self {
        Self {
            series_column: "Series Code".into(),
            series_code: "IT.NET.USER.ZS".into(),
            country_column: "Country Name".into(),
        }
    }
}

/// First run of exactly four digits in a `YR` header.
fn wdi_year_header(header: &str) -> Option<i32> {
    if !header.contains("YR") {
        return None;
    }
    let bytes = header.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i - start == 4 {
                return header[start..i].parse().ok();
            }
        } else {
            i += 1;
        }
    }
    None
}

impl SourceNormalizer for WdiInternetNormalizer {
    fn kind(&self) -> SourceKind {
        SourceKind::Internet
    }

    fn normalize(
        &self,
        table: &RawTable,
        resolver: &IdentityResolver,
    ) -> Result<NormalizedSource, PanelError> {
        let kind = self.kind();
        let series_col = table.require_column(kind, &self.series_column)?;
        let country_col = table.require_column(kind, &self.country_column)?;
        let year_cols: Vec<(usize, i32)> = table
            .headers
            .iter()
            .enumerate()
            .filter_map(|(i, h)| wdi_year_header(h).map(|y| (i, y)))
            .collect();

        let ctx = SourceContext::names(kind);
        let mut out = NormalizedSource::default();
        for i in 0..table.rows.len() {
            if table.cell(i, series_col) != self.series_code {
                continue;
            }
            let raw = table.cell(i, country_col);
            let country = match resolver.resolve(raw, ctx) {
                Resolution::Resolved(c) => c,
                Resolution::Unresolved => {
                    out.unresolved.record(raw);
                    continue;
                }
            };
            for &(col, year) in &year_cols {
                match parse_number(table.cell(i, col)) {
                    Some(v) => out.dataset.records.push(CountryYearRecord::new(
                        country.clone(),
                        year,
                        Metrics::only(Metric::InternetUsage, v),
                    )),
                    None => out.dropped_rows += 1,
                }
            }
        }

        debug!(
            "internet: WDI series {} -> {} records",
            self.series_code,
            out.dataset.records.len()
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::test_support::{resolver, table};

    #[test]
    fn year_headers() {
        assert_eq!(itu_year_header("2019"), Some(2019));
        assert_eq!(itu_year_header("2019.1"), Some(2019));
        assert_eq!(itu_year_header("2019."), None);
        assert_eq!(itu_year_header("Note"), None);
        assert_eq!(itu_year_header("201"), None);
        assert_eq!(wdi_year_header("2019 [YR2019]"), Some(2019));
        assert_eq!(wdi_year_header("2019"), None);
        assert_eq!(wdi_year_header("Series Code"), None);
    }

    fn itu_table() -> RawTable {
        table(
            &["", "2019", "2020", "2020.1", "Note"],
            &[
                &["Fixed-broadband subscriptions", "", "", "", ""],
                &["World", "10", "11", "", ""],
                &["Percentage of individuals using the Internet, total", "", "", "", ""],
                &["Africa", "28.5", "..", "", "x"],
                &["  Europe ", "82.0", "84.1", "1", ""],
                &["", "1", "2", "", ""],
                &["Percentage of individuals using the Internet, female", "", "", "", ""],
                &["Africa", "20", "21", "", ""],
            ],
        )
    }

    #[test]
    fn itu_block_melts_until_next_label() {
        let out = ItuInternetNormalizer::default()
            .normalize(&itu_table(), &resolver())
            .unwrap();
        let recs: Vec<(String, i32, f64)> = out
            .dataset
            .records
            .iter()
            .map(|r| (r.country.clone(), r.year, r.metrics.internet_usage.unwrap()))
            .collect();
        assert_eq!(
            recs,
            vec![
                ("Africa".to_string(), 2019, 28.5),
                ("Europe".to_string(), 2019, 82.0),
                ("Europe".to_string(), 2020, 84.1),
                ("Europe".to_string(), 2020, 1.0),
            ]
        );
        // blank identifier row had two values
        assert_eq!(out.unresolved.rows(), 2);
    }

    #[test]
    fn itu_missing_label_is_schema_error() {
        let t = table(&["", "2019"], &[&["World", "1"]]);
        let err = ItuInternetNormalizer::default()
            .normalize(&t, &resolver())
            .unwrap_err();
        assert!(matches!(err, PanelError::LabelBlockNotFound { .. }));
    }

    #[test]
    fn wdi_filters_series_and_skips_dots() {
        let t = table(
            &["Country Name", "Country Code", "Series Name", "Series Code", "2019 [YR2019]", "2020 [YR2020]"],
            &[
                &["Kenya", "KEN", "Internet users", "IT.NET.USER.ZS", "22.6", ".."],
                &["Kenya", "KEN", "Mobile subs", "IT.CEL.SETS.P2", "100", "101"],
                &["United States of America", "USA", "Internet users", "IT.NET.USER.ZS", "89.4", "90.9"],
            ],
        );
        let out = WdiInternetNormalizer::default()
            .normalize(&t, &resolver())
            .unwrap();
        let recs = &out.dataset.records;
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0].country, "Kenya");
        assert_eq!(recs[0].year, 2019);
        assert_eq!(recs[1].country, "United States");
        assert_eq!(out.dropped_rows, 1);
    }
}
