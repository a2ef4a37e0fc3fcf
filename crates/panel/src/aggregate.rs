use std::collections::BTreeMap;

use crate::model::{CountryYear, CountryYearRecord, Metrics};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateOutput {
    /// One record per (country, year), sorted by key.
    pub records: Vec<CountryYearRecord>,
    /// Input rows folded into an earlier row of the same key.
    pub collapsed: usize,
}

/// Group records by (country, year) and sum every metric field.
pub fn aggregate(records: &[CountryYearRecord]) -> AggregateOutput {
    let mut groups: BTreeMap<CountryYear, Metrics> = BTreeMap::new();
    let mut collapsed = 0;

    for rec in records {
        match groups.get_mut(&rec.key()) {
            Some(acc) => {
                *acc = acc.sum(&rec.metrics);
                collapsed += 1;
            }
            None => {
                groups.insert(rec.key(), rec.metrics);
            }
        }
    }

    AggregateOutput {
        records: groups
            .into_iter()
            .map(|(key, metrics)| CountryYearRecord::new(key.country, key.year, metrics))
            .collect(),
        collapsed,
    }
}
