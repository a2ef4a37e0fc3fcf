use log::debug;

use super::{year_cell, NormalizedSource, SourceNormalizer};
use crate::config::{EcommerceIdentity, EcommerceMeasure, EcommerceSource, FilterRule};
use crate::error::PanelError;
use crate::identity::{IdentityResolver, Resolution, SourceContext};
use crate::model::{CountryYearRecord, Metric, Metrics, SourceKind};
use crate::table::{parse_number, RawTable};

/// UNCTAD e-commerce tables (total, international or share-of-turnover).
#[derive(Debug, Clone)]
pub struct EcommerceNormalizer {
    pub measure: EcommerceMeasure,
    pub identity: EcommerceIdentity,
    pub identity_column: String,
    pub year_column: String,
    pub value_column: String,
    pub filters: Vec<FilterRule>,
}

impl EcommerceNormalizer {
    pub fn from_config(c: &EcommerceSource) -> Self {
        Self {
            measure: c.measure,
            identity: c.identity,
            identity_column: c.identity_column().to_string(),
            year_column: c.year_column.clone(),
            value_column: c.value_column().to_string(),
            filters: c.filters.clone(),
        }
    }

    /// Sales by economy label, no filters.
    pub fn sales() -> Self {
        Self {
            measure: EcommerceMeasure::Sales,
            identity: EcommerceIdentity::Label,
            identity_column: "Economy Label".into(),
            year_column: "Year".into(),
            value_column: EcommerceMeasure::Sales.default_column().into(),
            filters: Vec::new(),
        }
    }

    fn metric(&self) -> Metric {
        match self.measure {
            EcommerceMeasure::Sales => Metric::EcommerceSales,
            EcommerceMeasure::Share => Metric::EcommerceShare,
        }
    }
}

impl SourceNormalizer for EcommerceNormalizer {
    fn kind(&self) -> SourceKind {
        SourceKind::Ecommerce
    }

    fn normalize(
        &self,
        table: &RawTable,
        resolver: &IdentityResolver,
    ) -> Result<NormalizedSource, PanelError> {
        let kind = self.kind();
        let id_col = table.require_column(kind, &self.identity_column)?;
        let year_col = table.require_column(kind, &self.year_column)?;
        let value_col = table.require_column(kind, &self.value_column)?;
        let filters = self
            .filters
            .iter()
            .map(|f| table.require_column(kind, &f.column).map(|c| (c, f)))
            .collect::<Result<Vec<_>, _>>()?;

        let ctx = SourceContext {
            source: kind,
            scheme: self.identity.scheme(),
        };
        let metric = self.metric();
        let mut out = NormalizedSource::default();
        let mut filtered = 0usize;

        for i in 0..table.rows.len() {
            if !filters.iter().all(|(c, f)| f.matches(table.cell(i, *c))) {
                filtered += 1;
                continue;
            }
            let Some(value) = parse_number(table.cell(i, value_col)) else {
                out.dropped_rows += 1;
                continue;
            };
            let Some(year) = year_cell(kind, i, table.cell(i, year_col))? else {
                out.dropped_rows += 1;
                continue;
            };
            let raw = table.cell(i, id_col);
            match resolver.resolve(raw, ctx) {
                Resolution::Resolved(country) => out.dataset.records.push(
                    CountryYearRecord::new(country, year, Metrics::only(metric, value)),
                ),
                Resolution::Unresolved => out.unresolved.record(raw),
            }
        }

        debug!(
            "ecommerce: {} rows, {} filtered out, {} records",
            table.rows.len(),
            filtered,
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
    fn sales_by_label() {
        let t = table(
            &["Year", "Economy", "Economy Label", "US$ at current prices in millions"],
            &[
                &["2019", "404", "Kenya", "12.5"],
                &["2019", "404", "Kenya", ""],
                &["2020.0", "842", "United States of America", "1,200"],
            ],
        );
        let out = EcommerceNormalizer::sales()
            .normalize(&t, &resolver())
            .unwrap();
        let recs = &out.dataset.records;
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].metrics.ecommerce_sales, Some(12.5));
        assert_eq!(recs[1].country, "United States");
        assert_eq!(recs[1].year, 2020);
        assert_eq!(out.dropped_rows, 1);
    }

    #[test]
    fn share_with_filters_and_numeric_codes() {
        let t = table(
            &["Year", "Economy", "Market", "EnterpriseSize", "Percentage in total turnover"],
            &[
                &["2019", "404", "C00001", "0", "4.2"],
                &["2019", "404", "C00002", "0", "9.9"],
                &["2019", "404", "C00001", "10", "7.7"],
                &["2019", "999", "C00001", "0", "1.0"],
            ],
        );
        let norm = EcommerceNormalizer {
            measure: EcommerceMeasure::Share,
            identity: EcommerceIdentity::NumericCode,
            identity_column: "Economy".into(),
            year_column: "Year".into(),
            value_column: "Percentage in total turnover".into(),
            filters: vec![
                FilterRule {
                    column: "Market".into(),
                    value: "C00001".into(),
                },
                FilterRule {
                    column: "EnterpriseSize".into(),
                    value: "0".into(),
                },
            ],
        };
        let out = norm.normalize(&t, &resolver()).unwrap();
        assert_eq!(out.dataset.records.len(), 1);
        assert_eq!(out.dataset.records[0].country, "Kenya");
        assert_eq!(out.dataset.records[0].metrics.ecommerce_share, Some(4.2));
        assert_eq!(out.unresolved.identifiers(), vec!["999".to_string()]);
    }

    #[test]
    fn missing_filter_column_is_schema_error() {
        let t = table(
            &["Year", "Economy Label", "US$ at current prices in millions"],
            &[&["2019", "Kenya", "1"]],
        );
        let mut norm = EcommerceNormalizer::sales();
        norm.filters.push(FilterRule {
            column: "Market".into(),
            value: "C00001".into(),
        });
        let err = norm.normalize(&t, &resolver()).unwrap_err();
        assert!(matches!(err, PanelError::MissingColumn { ref column, .. } if column == "Market"));
    }
}
