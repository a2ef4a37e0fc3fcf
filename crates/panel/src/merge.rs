use std::collections::{BTreeMap, HashMap};

use crate::error::PanelError;
use crate::model::{CountryAttributes, CountryYear, CountryYearRecord, JoinKind, Metrics, PanelRow};

fn index_unique(
    side: &str,
    records: &[CountryYearRecord],
) -> Result<BTreeMap<CountryYear, Metrics>, PanelError> {
    let mut map = BTreeMap::new();
    for r in records {
        if map.insert(r.key(), r.metrics).is_some() {
            return Err(PanelError::DuplicateKey(format!("{side} input: {}", r.key())));
        }
    }
    Ok(map)
}

/// Join two key-unique record sets on (country, year). Metrics combine
/// field-wise, the left value winning where both are present. Output is
/// sorted by key.
pub fn merge_records(
    left: &[CountryYearRecord],
    right: &[CountryYearRecord],
    join: JoinKind,
) -> Result<Vec<CountryYearRecord>, PanelError> {
    let left = index_unique("left", left)?;
    let mut right = index_unique("right", right)?;

    let mut out: BTreeMap<CountryYear, Metrics> = BTreeMap::new();
    for (key, lm) in left {
        match right.remove(&key) {
            Some(rm) => {
                out.insert(key, lm.combine(&rm));
            }
            None if join != JoinKind::Inner => {
                out.insert(key, lm);
            }
            None => {}
        }
    }
    if join == JoinKind::Outer {
        out.extend(right);
    }

    Ok(out
        .into_iter()
        .map(|(k, m)| CountryYearRecord::new(k.country, k.year, m))
        .collect())
}

/// Attach per-country attributes. `Left` keeps every record, `Inner` keeps
/// only countries with attributes. `Outer` has no meaning here: it would
/// create rows without a year.
pub fn attach_attributes(
    records: &[CountryYearRecord],
    attributes: &[CountryAttributes],
    join: JoinKind,
) -> Result<Vec<PanelRow>, PanelError> {
    if join == JoinKind::Outer {
        return Err(PanelError::InvalidJoin(
            "attributes attach with 'left' or 'inner' only".into(),
        ));
    }

    let mut by_country: HashMap<&str, &CountryAttributes> = HashMap::new();
    for a in attributes {
        if by_country.insert(a.country.as_str(), a).is_some() {
            return Err(PanelError::DuplicateKey(format!("attributes: {}", a.country)));
        }
    }

    Ok(records
        .iter()
        .filter_map(|r| {
            let attrs = by_country.get(r.country.as_str()).map(|a| (*a).clone());
            if join == JoinKind::Inner && attrs.is_none() {
                return None;
            }
            Some(PanelRow {
                attributes: attrs,
                ..PanelRow::from(r.clone())
            })
        })
        .collect())
}

/// Intersection of the year ranges of non-empty record sets. `None` when
/// every set is empty or the ranges do not overlap.
pub fn common_year_range(sets: &[&[CountryYearRecord]]) -> Option<(i32, i32)> {
    let mut range: Option<(i32, i32)> = None;
    for set in sets.iter().filter(|s| !s.is_empty()) {
        let lo = set.iter().map(|r| r.year).min()?;
        let hi = set.iter().map(|r| r.year).max()?;
        let (a, b) = match range {
            None => (lo, hi),
            Some((a, b)) => (a.max(lo), b.min(hi)),
        };
        if a > b {
            return None;
        }
        range = Some((a, b));
    }
    range
}

pub fn restrict_years(records: Vec<CountryYearRecord>, (lo, hi): (i32, i32)) -> Vec<CountryYearRecord> {
    records
        .into_iter()
        .filter(|r| r.year >= lo && r.year <= hi)
        .collect()
}
