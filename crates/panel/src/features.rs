//! Feature derivation over the merged panel: fills, flags, growth, and the
//! row filters applied before the terminal datasets are written.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{
    CrisisPanelRow, FeaturedRow, FinalRow, Metric, PanelDatasetRow, PanelRow,
};

// ---------------------------------------------------------------------------
// Crisis calendar
// ---------------------------------------------------------------------------

/// Inclusive year ranges counted as global crises.
pub const CRISIS_WINDOWS: [(i32, i32); 3] = [(2000, 2001), (2008, 2009), (2020, 2022)];

pub fn is_major_crisis(year: i32) -> bool {
    CRISIS_WINDOWS
        .iter()
        .any(|&(lo, hi)| year >= lo && year <= hi)
}

/// `(crisis_2008_09, crisis_2020_21)` dummies used by the analysis export.
pub fn crisis_dummies(year: i32) -> (u8, u8) {
    (
        u8::from((2008..=2009).contains(&year)),
        u8::from((2020..=2021).contains(&year)),
    )
}

// ---------------------------------------------------------------------------
// Ordering + fills
// ---------------------------------------------------------------------------

pub fn sort_rows(rows: &mut [PanelRow]) {
    rows.sort_by(|a, b| (a.country.as_str(), a.year).cmp(&(b.country.as_str(), b.year)));
}

/// Contiguous index ranges of each country in a sorted slice.
fn country_spans(rows: &[PanelRow]) -> Vec<std::ops::Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;
    for i in 1..=rows.len() {
        if i == rows.len() || rows[i].country != rows[start].country {
            if start < i {
                spans.push(start..i);
            }
            start = i;
        }
    }
    spans
}

/// Deaths and e-commerce sales default to zero; internet usage is carried
/// forward, then backward, within each country's series. A country with no
/// internet observation at all stays missing.
pub fn fill_missing(mut rows: Vec<PanelRow>) -> Vec<PanelRow> {
    sort_rows(&mut rows);
    for r in rows.iter_mut() {
        r.metrics.deaths.get_or_insert(0.0);
        r.metrics.ecommerce_sales.get_or_insert(0.0);
    }
    for span in country_spans(&rows) {
        let series = &mut rows[span];
        let mut last = None;
        for r in series.iter_mut() {
            match r.metrics.internet_usage {
                Some(v) => last = Some(v),
                None => r.metrics.internet_usage = last,
            }
        }
        let mut next = None;
        for r in series.iter_mut().rev() {
            match r.metrics.internet_usage {
                Some(v) => next = Some(v),
                None => r.metrics.internet_usage = next,
            }
        }
    }
    rows
}

// ---------------------------------------------------------------------------
// Growth + flags
// ---------------------------------------------------------------------------

/// Percent change of `metric` between consecutive rows of each country.
/// `rows` must be sorted by (country, year).
pub fn growth(rows: &[PanelRow], metric: Metric) -> Vec<Option<f64>> {
    let mut out = vec![None; rows.len()];
    for span in country_spans(rows) {
        for i in span.start + 1..span.end {
            let prev = rows[i - 1].metrics.get(metric);
            let cur = rows[i].metrics.get(metric);
            out[i] = match (prev, cur) {
                (Some(p), Some(c)) if p != 0.0 => Some((c - p) / p),
                _ => None,
            };
        }
    }
    out
}

/// Sort, then attach conflict and crisis flags and the growth of `metric`.
pub fn derive_features(mut rows: Vec<PanelRow>, metric: Metric) -> Vec<FeaturedRow> {
    sort_rows(&mut rows);
    let g = growth(&rows, metric);
    rows.into_iter()
        .zip(g)
        .map(|(row, growth)| FeaturedRow {
            is_conflict: row.metrics.deaths.is_some_and(|d| d > 0.0),
            major_crisis: is_major_crisis(row.year),
            growth,
            row,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Row filters
// ---------------------------------------------------------------------------

/// Drop countries whose e-commerce sales over the whole series sum to zero.
/// Returns the kept rows and the removed countries.
pub fn remove_zero_activity(rows: Vec<FeaturedRow>) -> (Vec<FeaturedRow>, Vec<String>) {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for r in &rows {
        *totals.entry(r.row.country.as_str()).or_default() +=
            r.row.metrics.ecommerce_sales.unwrap_or(0.0);
    }
    let removed: BTreeSet<String> = totals
        .into_iter()
        .filter(|(_, total)| *total == 0.0)
        .map(|(c, _)| c.to_string())
        .collect();

    let kept = rows
        .into_iter()
        .filter(|r| !removed.contains(&r.row.country))
        .collect();
    (kept, removed.into_iter().collect())
}

/// Quantile with linear interpolation at position `p * (n - 1)` of the
/// sorted values.
pub fn quantile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Q3 + 1.5 * IQR. `None` for no values.
pub fn iqr_upper_bound(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);
    let q1 = quantile(&sorted, 0.25)?;
    let q3 = quantile(&sorted, 0.75)?;
    Some(q3 + 1.5 * (q3 - q1))
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutlierFilter {
    pub kept: Vec<FeaturedRow>,
    pub removed: usize,
    pub bound: Option<f64>,
}

/// Drop rows whose `metric` is strictly above the IQR upper bound. Rows
/// without a value are kept.
pub fn remove_outliers(rows: Vec<FeaturedRow>, metric: Metric) -> OutlierFilter {
    let values: Vec<f64> = rows.iter().filter_map(|r| r.row.metrics.get(metric)).collect();
    let Some(bound) = iqr_upper_bound(&values) else {
        return OutlierFilter {
            kept: rows,
            removed: 0,
            bound: None,
        };
    };
    let before = rows.len();
    let kept: Vec<FeaturedRow> = rows
        .into_iter()
        .filter(|r| r.row.metrics.get(metric).map_or(true, |v| v <= bound))
        .collect();
    OutlierFilter {
        removed: before - kept.len(),
        kept,
        bound: Some(bound),
    }
}

/// Keep rows with e-commerce share, internet usage and classification.
pub fn complete_cases(rows: Vec<PanelRow>) -> Vec<PanelRow> {
    rows.into_iter()
        .filter(|r| {
            r.metrics.ecommerce_share.is_some()
                && r.metrics.internet_usage.is_some()
                && r.attributes
                    .as_ref()
                    .is_some_and(|a| !a.country_code.is_empty())
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Terminal rows
// ---------------------------------------------------------------------------

pub fn to_final_rows(rows: &[FeaturedRow]) -> Vec<FinalRow> {
    rows.iter()
        .map(|f| FinalRow {
            country: f.row.country.clone(),
            year: f.row.year,
            ecommerce_sales_usd_millions: f.row.metrics.ecommerce_sales.unwrap_or(0.0),
            internet_usage_percent: f.row.metrics.internet_usage.unwrap_or(0.0),
            conflict_deaths_total: f.row.metrics.deaths.unwrap_or(0.0).round() as i64,
            is_conflict_year: u8::from(f.is_conflict),
            is_global_crisis_year: u8::from(f.major_crisis),
        })
        .collect()
}

/// Rows without attributes or metrics are skipped; callers pass complete cases.
pub fn to_panel_rows(rows: &[FeaturedRow]) -> Vec<PanelDatasetRow> {
    rows.iter()
        .filter_map(|f| {
            let a = f.row.attributes.as_ref()?;
            Some(PanelDatasetRow {
                country_code: a.country_code.clone(),
                country_name: f.row.country.clone(),
                year: f.row.year,
                region: a.region.clone(),
                income_group: a.income_group.clone(),
                dev_status: a.dev_status,
                ecom_share: f.row.metrics.ecommerce_share?,
                internet_users: f.row.metrics.internet_usage?,
                ecom_growth: f.growth,
            })
        })
        .collect()
}

pub fn with_crisis_dummies(rows: &[PanelDatasetRow]) -> Vec<CrisisPanelRow> {
    rows.iter()
        .map(|r| {
            let (c0809, c2021) = crisis_dummies(r.year);
            CrisisPanelRow {
                country_code: r.country_code.clone(),
                country_name: r.country_name.clone(),
                year: r.year,
                region: r.region.clone(),
                income_group: r.income_group.clone(),
                dev_status: r.dev_status,
                ecom_share: r.ecom_share,
                internet_users: r.internet_users,
                ecom_growth: r.ecom_growth,
                crisis_2008_09: c0809,
                crisis_2020_21: c2021,
            }
        })
        .collect()
}
