use std::collections::BTreeSet;

use log::{debug, warn};

use super::{NormalizedSource, SourceNormalizer};
use crate::config::ClassificationSource;
use crate::error::PanelError;
use crate::identity::{IdentityResolver, Resolution, SourceContext};
use crate::model::{CountryAttributes, SourceKind};
use crate::table::RawTable;

/// World Bank CLASS sheet: economy, ISO3 code, region and income group.
#[derive(Debug, Clone)]
pub struct ClassificationNormalizer {
    pub country_column: String,
    pub code_column: String,
    pub region_column: String,
    pub income_column: String,
    pub high_income: String,
}

impl ClassificationNormalizer {
    pub fn from_config(c: &ClassificationSource) -> Self {
        Self {
            country_column: c.country_column.clone(),
            code_column: c.code_column.clone(),
            region_column: c.region_column.clone(),
            income_column: c.income_column.clone(),
            high_income: c.high_income.clone(),
        }
    }
}

impl Default for ClassificationNormalizer {
    fn default() -> Self {
        Self {
            country_column: "Economy".into(),
            code_column: "Code".into(),
            region_column: "Region".into(),
            income_column: "Income group".into(),
            high_income: "High income".into(),
        }
    }
}

impl SourceNormalizer for ClassificationNormalizer {
    fn kind(&self) -> SourceKind {
        SourceKind::Classification
    }

    fn normalize(
        &self,
        table: &RawTable,
        resolver: &IdentityResolver,
    ) -> Result<NormalizedSource, PanelError> {
        let kind = self.kind();
        let country_col = table.require_column(kind, &self.country_column)?;
        let code_col = table.require_column(kind, &self.code_column)?;
        let region_col = table.require_column(kind, &self.region_column)?;
        let income_col = table.require_column(kind, &self.income_column)?;

        let ctx = SourceContext::names(kind);
        let mut seen = BTreeSet::new();
        let mut out = NormalizedSource::default();

        for i in 0..table.rows.len() {
            // Aggregates (World, regions, income groups) carry no region.
            let region = table.cell(i, region_col);
            if region.is_empty() {
                out.dropped_rows += 1;
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
            if !seen.insert(country.clone()) {
                out.duplicates += 1;
                continue;
            }
            let income_group = table.cell(i, income_col).to_string();
            let dev_status = u8::from(income_group == self.high_income);
            out.dataset.attributes.push(CountryAttributes {
                country,
                country_code: table.cell(i, code_col).to_string(),
                region: region.to_string(),
                income_group,
                dev_status,
            });
        }

        if out.duplicates > 0 {
            warn!(
                "classification: {} duplicate economies, first row kept",
                out.duplicates
            );
        }
        debug!(
            "classification: {} economies, {} aggregate rows dropped",
            out.dataset.attributes.len(),
            out.dropped_rows
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::test_support::{resolver, table};

    #[test]
    fn drops_aggregates_and_flags_high_income() {
        let t = table(
            &["Economy", "Code", "Region", "Income group", "Lending category"],
            &[
                &["Kenya", "KEN", "Sub-Saharan Africa", "Lower middle income", "IDA"],
                &["United States", "USA", "North America", "High income", ""],
                &["World", "WLD", "", "", ""],
                &["Kenya", "KEN", "Sub-Saharan Africa", "Low income", ""],
            ],
        );
        let out = ClassificationNormalizer::default()
            .normalize(&t, &resolver())
            .unwrap();
        let attrs = &out.dataset.attributes;
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].income_group, "Lower middle income");
        assert_eq!(attrs[0].dev_status, 0);
        assert_eq!(attrs[1].dev_status, 1);
        assert_eq!(out.dropped_rows, 1);
        assert_eq!(out.duplicates, 1);
    }

    #[test]
    fn missing_income_column() {
        let t = table(&["Economy", "Code", "Region"], &[]);
        assert!(ClassificationNormalizer::default()
            .normalize(&t, &resolver())
            .is_err());
    }
}
