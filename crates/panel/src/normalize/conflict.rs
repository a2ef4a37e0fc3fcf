use log::debug;

use super::{year_cell, NormalizedSource, SourceNormalizer};
use crate::config::ConflictSource;
use crate::error::PanelError;
use crate::identity::{IdentityResolver, Resolution, SourceContext};
use crate::model::{CountryYearRecord, Metric, Metrics, SourceKind};
use crate::table::{parse_number, RawTable};

/// UCDP GED event table: one row per event, fatalities in `best`.
#[derive(Debug, Clone)]
pub struct ConflictNormalizer {
    pub country_column: String,
    pub year_column: String,
    pub value_column: String,
}

impl ConflictNormalizer {
    pub fn from_config(c: &ConflictSource) -> Self {
        Self {
            country_column: c.country_column.clone(),
            year_column: c.year_column.clone(),
            value_column: c.value_column.clone(),
        }
    }
}

impl Default for ConflictNormalizer {
    fn default() -> Self {
        Self {
            country_column: "country".into(),
            year_column: "year".into(),
            value_column: "best".into(),
        }
    }
}

impl SourceNormalizer for ConflictNormalizer {
    fn kind(&self) -> SourceKind {
        SourceKind::Conflict
    }

    fn normalize(
        &self,
        table: &RawTable,
        resolver: &IdentityResolver,
    ) -> Result<NormalizedSource, PanelError> {
        let kind = self.kind();
        let country_col = table.require_column(kind, &self.country_column)?;
        let year_col = table.require_column(kind, &self.year_column)?;
        let value_col = table.require_column(kind, &self.value_column)?;
        let ctx = SourceContext::names(kind);

        let mut out = NormalizedSource::default();
        for i in 0..table.rows.len() {
            let Some(year) = year_cell(kind, i, table.cell(i, year_col))? else {
                out.dropped_rows += 1;
                continue;
            };
            let raw = table.cell(i, country_col);
            let country = match resolver.resolve(raw, ctx) {
                Resolution::Resolved(c) => c,
                Resolution::Unresolved => {
                    out.unresolved.record(raw);
                    continue;
                }
            };
            // A blank estimate adds nothing, but the country-year still exists.
            let metrics = match parse_number(table.cell(i, value_col)) {
                Some(v) => Metrics::only(Metric::Deaths, v),
                None => Metrics::only(Metric::Deaths, 0.0),
            };
            out.dataset
                .records
                .push(CountryYearRecord::new(country, year, metrics));
        }

        debug!(
            "conflict: {} event rows -> {} records",
            table.rows.len(),
            out.dataset.records.len()
        );
        Ok(out)
    }
}
