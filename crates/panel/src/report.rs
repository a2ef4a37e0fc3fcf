use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::{Variant, YearWindow};
use crate::model::{FeaturedRow, SourceKind, SourceRole};

/// Outcome of loading and normalizing one source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Loaded { rows: usize, collapsed: usize },
    Failed { reason: String },
    NotConfigured,
}

impl SourceStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceReport {
    pub source: SourceKind,
    pub role: SourceRole,
    #[serde(flatten)]
    pub status: SourceStatus,
    /// Distinct raw identifiers that did not resolve; their rows were excluded.
    pub unresolved: Vec<String>,
    pub dropped_rows: usize,
    pub duplicates: usize,
}

impl SourceReport {
    pub fn new(source: SourceKind, status: SourceStatus) -> Self {
        Self {
            source,
            role: source.role(),
            status,
            unresolved: Vec::new(),
            dropped_rows: 0,
            duplicates: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub variant: Variant,
    pub engine_version: String,
    pub run_at: String,
    pub alias_table_version: u32,
    pub year_window: YearWindow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub meta: RunMeta,
    pub sources: Vec<SourceReport>,
    pub compiled_rows: usize,
    pub featured_rows: usize,
    pub zero_activity_removed: Vec<String>,
    pub outliers_removed: usize,
    pub outlier_bound: Option<f64>,
    /// Years kept by `year_window = "common"`; `None` when not applied.
    pub common_years: Option<(i32, i32)>,
    pub year_range: Option<(i32, i32)>,
    pub countries: usize,
    pub rows: usize,
}

impl PipelineReport {
    /// Any configured source failed to load or normalize.
    pub fn is_degraded(&self) -> bool {
        self.sources.iter().any(|s| s.status.is_failed())
    }

    pub fn source(&self, kind: SourceKind) -> Option<&SourceReport> {
        self.sources.iter().find(|s| s.source == kind)
    }

    /// Human-readable warnings: failed sources, unresolved identifiers and
    /// a common year window that could not be applied.
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.meta.year_window == YearWindow::Common && self.common_years.is_none() {
            out.push("year window: primary sources share no years, all years kept".into());
        }
        for s in &self.sources {
            if let SourceStatus::Failed { reason } = &s.status {
                out.push(format!("{}: failed: {reason}", s.source));
            }
            if !s.unresolved.is_empty() {
                out.push(format!(
                    "{}: {} unresolved identifier(s): {}",
                    s.source,
                    s.unresolved.len(),
                    s.unresolved.join(", ")
                ));
            }
        }
        out
    }
}

/// (distinct countries, year range) over the terminal rows.
pub(crate) fn coverage(rows: &[FeaturedRow]) -> (usize, Option<(i32, i32)>) {
    let countries: BTreeSet<&str> = rows.iter().map(|r| r.row.country.as_str()).collect();
    let lo = rows.iter().map(|r| r.row.year).min();
    let hi = rows.iter().map(|r| r.row.year).max();
    (countries.len(), lo.zip(hi))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> RunMeta {
        RunMeta {
            config_name: "t".into(),
            variant: Variant::Crisis,
            engine_version: "0".into(),
            run_at: "now".into(),
            alias_table_version: 1,
            year_window: YearWindow::All,
        }
    }

    fn report(sources: Vec<SourceReport>) -> PipelineReport {
        PipelineReport {
            meta: meta(),
            sources,
            compiled_rows: 0,
            featured_rows: 0,
            zero_activity_removed: vec![],
            outliers_removed: 0,
            outlier_bound: None,
            common_years: None,
            year_range: None,
            countries: 0,
            rows: 0,
        }
    }

    #[test]
    fn degraded_when_any_source_failed() {
        let ok = report(vec![SourceReport::new(
            SourceKind::Conflict,
            SourceStatus::Loaded { rows: 3, collapsed: 0 },
        )]);
        assert!(!ok.is_degraded());

        let mut failed = SourceReport::new(
            SourceKind::Internet,
            SourceStatus::Failed {
                reason: "missing column".into(),
            },
        );
        failed.unresolved = vec!["Atlantis".into()];
        let bad = report(vec![failed]);
        assert!(bad.is_degraded());
        let w = bad.warnings();
        assert_eq!(w.len(), 2);
        assert!(w[0].starts_with("internet: failed"));
        assert!(w[1].contains("Atlantis"));
    }

    #[test]
    fn status_serializes_flat() {
        let s = SourceReport::new(
            SourceKind::Ecommerce,
            SourceStatus::Loaded { rows: 5, collapsed: 2 },
        );
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["source"], "ecommerce");
        assert_eq!(v["role"], "primary");
        assert_eq!(v["status"], "loaded");
        assert_eq!(v["rows"], 5);
        assert_eq!(v["collapsed"], 2);
    }

    #[test]
    fn skipped_common_window_is_a_warning() {
        let mut r = report(vec![]);
        assert!(r.warnings().is_empty());
        r.meta.year_window = YearWindow::Common;
        assert_eq!(r.warnings().len(), 1);
        r.common_years = Some((2010, 2020));
        assert!(r.warnings().is_empty());
    }
}
