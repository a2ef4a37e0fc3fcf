// Property-based tests for aggregation, merging and fills.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::BTreeSet;

use proptest::prelude::*;
use crisis_panel_engine::aggregate::aggregate;
use crisis_panel_engine::features::fill_missing;
use crisis_panel_engine::merge::{attach_attributes, merge_records};
use crisis_panel_engine::model::{
    CountryAttributes, CountryYearRecord, JoinKind, Metric, Metrics, PanelRow,
};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

fn arb_country() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Chad".to_string()),
        Just("Kenya".to_string()),
        Just("Mali".to_string()),
        Just("Peru".to_string()),
    ]
}

/// Integer-valued metrics keep float sums exact under reordering.
fn arb_value() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        1 => Just(None),
        3 => (0i32..1000).prop_map(|v| Some(v as f64)),
    ]
}

fn arb_record() -> impl Strategy<Value = CountryYearRecord> {
    (arb_country(), 2015i32..2023, arb_value(), arb_value()).prop_map(|(c, y, d, e)| {
        CountryYearRecord::new(
            c,
            y,
            Metrics {
                deaths: d,
                ecommerce_sales: e,
                ..Default::default()
            },
        )
    })
}

fn arb_records() -> impl Strategy<Value = Vec<CountryYearRecord>> {
    proptest::collection::vec(arb_record(), 0..40)
}

fn key_set(rs: &[CountryYearRecord]) -> BTreeSet<(String, i32)> {
    rs.iter().map(|r| (r.country.clone(), r.year)).collect()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn aggregation_is_key_unique(records in arb_records()) {
        let out = aggregate(&records);
        prop_assert_eq!(key_set(&out.records).len(), out.records.len());
        prop_assert_eq!(out.records.len() + out.collapsed, records.len());
    }

    #[test]
    fn aggregation_ignores_input_order(
        records in arb_records(),
        seed in any::<u64>(),
    ) {
        let mut shuffled = records.clone();
        // deterministic Fisher-Yates driven by the seed
        let mut state = seed | 1;
        for i in (1..shuffled.len()).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let j = (state % (i as u64 + 1)) as usize;
            shuffled.swap(i, j);
        }
        prop_assert_eq!(aggregate(&records), aggregate(&shuffled));
    }

    #[test]
    fn outer_join_is_superset(left in arb_records(), right in arb_records()) {
        let l = aggregate(&left).records;
        let r = aggregate(&right).records;
        let merged = merge_records(&l, &r, JoinKind::Outer).unwrap();
        let keys = key_set(&merged);
        prop_assert!(key_set(&l).is_subset(&keys));
        prop_assert!(key_set(&r).is_subset(&keys));
        prop_assert_eq!(keys.len(), merged.len());

        let inner = merge_records(&l, &r, JoinKind::Inner).unwrap();
        let left_join = merge_records(&l, &r, JoinKind::Left).unwrap();
        prop_assert!(inner.len() <= left_join.len());
        prop_assert_eq!(key_set(&left_join), key_set(&l));
    }

    #[test]
    fn left_attach_never_adds_rows(
        records in arb_records(),
        with_attrs in proptest::collection::btree_set(arb_country(), 0..4),
    ) {
        let recs = aggregate(&records).records;
        let attrs: Vec<CountryAttributes> = with_attrs
            .into_iter()
            .map(|c| CountryAttributes {
                country_code: c[..3].to_uppercase(),
                country: c,
                region: "R".into(),
                income_group: "Low income".into(),
                dev_status: 0,
            })
            .collect();
        let rows = attach_attributes(&recs, &attrs, JoinKind::Left).unwrap();
        prop_assert_eq!(rows.len(), recs.len());
    }

    #[test]
    fn fill_is_idempotent(
        records in arb_records(),
        internet in proptest::collection::vec(arb_value(), 40),
    ) {
        let rows: Vec<PanelRow> = aggregate(&records)
            .records
            .into_iter()
            .zip(internet)
            .map(|(mut r, i)| {
                *r.metrics.slot_mut(Metric::InternetUsage) = i;
                PanelRow::from(r)
            })
            .collect();
        let once = fill_missing(rows);
        let twice = fill_missing(once.clone());
        prop_assert_eq!(once, twice);
    }
}
