use std::collections::BTreeMap;

use log::{error, info, warn};

use crate::aggregate::aggregate;
use crate::config::{PanelConfig, Variant, YearWindow};
use crate::error::PanelError;
use crate::features::{
    complete_cases, derive_features, fill_missing, remove_outliers, remove_zero_activity,
    to_final_rows, to_panel_rows,
};
use crate::identity::IdentityResolver;
use crate::merge::{attach_attributes, common_year_range, merge_records, restrict_years};
use crate::model::{
    CountryYearRecord, FeaturedRow, JoinKind, Metric, PanelRow, SourceDataset, SourceKind,
    SourceRole, TerminalRows,
};
use crate::normalize::normalizer_for;
use crate::report::{coverage, PipelineReport, RunMeta, SourceReport, SourceStatus};
use crate::table::RawTable;

/// Raw tables per source as produced by the readers. A reader failure is
/// carried as its message so the pipeline can report it and continue.
#[derive(Debug, Clone, Default)]
pub struct PanelInput {
    pub tables: BTreeMap<SourceKind, Result<Vec<RawTable>, String>>,
}

impl PanelInput {
    pub fn insert(&mut self, kind: SourceKind, tables: Result<Vec<RawTable>, String>) {
        self.tables.insert(kind, tables);
    }
}

/// Every stage's product, plus the audit report.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Normalized and aggregated datasets of the sources that loaded.
    pub sources: BTreeMap<SourceKind, SourceDataset>,
    pub compiled: Vec<PanelRow>,
    pub featured: Vec<FeaturedRow>,
    pub terminal: TerminalRows,
    pub report: PipelineReport,
}

/// Order in which primary sources are merged into the panel.
const MERGE_ORDER: [SourceKind; 3] = [
    SourceKind::Ecommerce,
    SourceKind::Internet,
    SourceKind::Conflict,
];

/// Run the pipeline for `config`. Source failures degrade the run (see the
/// report); only merge invariant violations are returned as errors.
pub fn run(
    config: &PanelConfig,
    input: &PanelInput,
    resolver: &IdentityResolver,
) -> Result<PipelineOutput, PanelError> {
    let (mut datasets, source_reports) = load_sources(config, input, resolver);

    let mut common_years = None;
    if config.output.year_window == YearWindow::Common {
        let primaries: Vec<&[CountryYearRecord]> = MERGE_ORDER
            .iter()
            .filter_map(|k| datasets.get(k))
            .map(|d| d.records.as_slice())
            .collect();
        common_years = common_year_range(&primaries);
        match common_years {
            Some(range) => {
                info!("year window: common {}..={}", range.0, range.1);
                for kind in MERGE_ORDER {
                    if let Some(d) = datasets.get_mut(&kind) {
                        d.records = restrict_years(std::mem::take(&mut d.records), range);
                    }
                }
            }
            None => warn!("year window: primary sources share no years, keeping all years"),
        }
    }

    let compiled = compile_panel(config, &datasets)?;
    info!("compiled panel: {} rows", compiled.len());

    let mut zero_activity_removed = Vec::new();
    let mut outliers_removed = 0;
    let mut outlier_bound = None;

    let (featured, terminal, terminal_rows) = match config.variant {
        Variant::Crisis => {
            let featured = derive_features(fill_missing(compiled.clone()), Metric::EcommerceSales);
            let (active, removed) = remove_zero_activity(featured.clone());
            if !removed.is_empty() {
                info!("removed {} countries with zero e-commerce sales", removed.len());
            }
            zero_activity_removed = removed;
            let filtered = remove_outliers(active, Metric::EcommerceSales);
            if let Some(bound) = filtered.bound {
                info!(
                    "outlier bound {bound:.2}: removed {} rows",
                    filtered.removed
                );
            }
            outliers_removed = filtered.removed;
            outlier_bound = filtered.bound;
            let terminal = TerminalRows::Crisis(to_final_rows(&filtered.kept));
            (featured, terminal, filtered.kept)
        }
        Variant::Panel => {
            let complete = complete_cases(compiled.clone());
            info!(
                "complete cases: {} of {} rows",
                complete.len(),
                compiled.len()
            );
            let featured = derive_features(complete, Metric::EcommerceShare);
            let terminal = TerminalRows::Panel(to_panel_rows(&featured));
            (featured.clone(), terminal, featured)
        }
    };

    let (countries, year_range) = coverage(&terminal_rows);
    let report = PipelineReport {
        meta: RunMeta {
            config_name: config.name.clone(),
            variant: config.variant,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            alias_table_version: resolver.aliases().version,
            year_window: config.output.year_window,
        },
        sources: source_reports,
        compiled_rows: compiled.len(),
        featured_rows: featured.len(),
        zero_activity_removed,
        outliers_removed,
        outlier_bound,
        common_years,
        year_range,
        countries,
        rows: terminal.len(),
    };

    Ok(PipelineOutput {
        sources: datasets,
        compiled,
        featured,
        terminal,
        report,
    })
}

/// Normalize and aggregate every configured source independently.
fn load_sources(
    config: &PanelConfig,
    input: &PanelInput,
    resolver: &IdentityResolver,
) -> (BTreeMap<SourceKind, SourceDataset>, Vec<SourceReport>) {
    let mut datasets = BTreeMap::new();
    let mut reports = Vec::new();

    for kind in SourceKind::ALL {
        let Some(normalizer) = normalizer_for(kind, &config.sources) else {
            reports.push(SourceReport::new(kind, SourceStatus::NotConfigured));
            continue;
        };

        let tables = match input.tables.get(&kind) {
            Some(Ok(tables)) => tables,
            Some(Err(message)) => {
                let err = PanelError::SourceRead {
                    source_kind: kind,
                    message: message.clone(),
                };
                error!("{err}");
                reports.push(SourceReport::new(
                    kind,
                    SourceStatus::Failed {
                        reason: err.to_string(),
                    },
                ));
                continue;
            }
            None => {
                error!("{kind}: no input tables supplied");
                reports.push(SourceReport::new(
                    kind,
                    SourceStatus::Failed {
                        reason: "no input tables supplied".into(),
                    },
                ));
                continue;
            }
        };

        let table = RawTable::concat(tables);
        let normalized = match normalizer.normalize(&table, resolver) {
            Ok(n) => n,
            Err(e) => {
                error!("{kind}: normalization failed: {e}");
                reports.push(SourceReport::new(
                    kind,
                    SourceStatus::Failed {
                        reason: e.to_string(),
                    },
                ));
                continue;
            }
        };

        let aggregated = aggregate(&normalized.dataset.records);
        if aggregated.collapsed > 0 {
            warn!(
                "{kind}: {} rows collapsed into existing country-years",
                aggregated.collapsed
            );
        }
        if !normalized.unresolved.is_empty() {
            warn!(
                "{kind}: {} rows with unresolved identifiers excluded ({} distinct)",
                normalized.unresolved.rows(),
                normalized.unresolved.identifiers().len()
            );
        }

        let dataset = SourceDataset {
            records: aggregated.records,
            attributes: normalized.dataset.attributes,
        };
        let rows = match kind.role() {
            SourceRole::Primary => dataset.records.len(),
            SourceRole::Auxiliary => dataset.attributes.len(),
        };
        info!("{kind}: loaded {rows} rows");

        let mut report = SourceReport::new(
            kind,
            SourceStatus::Loaded {
                rows,
                collapsed: aggregated.collapsed,
            },
        );
        report.unresolved = normalized.unresolved.identifiers();
        report.dropped_rows = normalized.dropped_rows;
        report.duplicates = normalized.duplicates;
        reports.push(report);
        datasets.insert(kind, dataset);
    }

    (datasets, reports)
}

/// Merge primary sources in fixed order, then attach classification.
fn compile_panel(
    config: &PanelConfig,
    datasets: &BTreeMap<SourceKind, SourceDataset>,
) -> Result<Vec<PanelRow>, PanelError> {
    let mut panel: Option<Vec<CountryYearRecord>> = None;
    for kind in MERGE_ORDER {
        let Some(dataset) = datasets.get(&kind) else {
            continue;
        };
        panel = Some(match panel {
            None => dataset.records.clone(),
            Some(acc) => {
                let join = config
                    .sources
                    .input(kind)
                    .map(|i| i.join_or(JoinKind::Outer))
                    .unwrap_or_default();
                merge_records(&acc, &dataset.records, join)?
            }
        });
    }

    let records: Vec<CountryYearRecord> = panel
        .unwrap_or_default()
        .into_iter()
        .filter(|r| !r.country.trim().is_empty())
        .collect();

    let attributes = datasets
        .get(&SourceKind::Classification)
        .map(|d| d.attributes.as_slice())
        .unwrap_or(&[]);
    let join = config
        .sources
        .input(SourceKind::Classification)
        .map(|i| i.join_or(JoinKind::Left))
        .unwrap_or(JoinKind::Left);
    // A failed classification source must not empty an inner-joined panel.
    let join = if datasets.contains_key(&SourceKind::Classification) {
        join
    } else {
        JoinKind::Left
    };

    attach_attributes(&records, attributes, join)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::AliasTable;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    fn resolver() -> IdentityResolver {
        IdentityResolver::new(AliasTable::builtin().unwrap(), None)
    }

    const CONFIG: &str = r#"
name = "unit"
variant = "crisis"

[sources.conflict]
files = ["ged.csv"]

[sources.ecommerce]
files = ["ecom.csv"]
"#;

    fn ecom() -> RawTable {
        table(
            &["Year", "Economy Label", "US$ at current prices in millions"],
            &[
                &["2019", "Kenya", "10"],
                &["2020", "Kenya", "20"],
                &["2019", "Chad", "0"],
            ],
        )
    }

    #[test]
    fn failed_source_degrades_run() {
        let config = PanelConfig::from_toml(CONFIG).unwrap();
        let mut input = PanelInput::default();
        input.insert(SourceKind::Ecommerce, Ok(vec![ecom()]));
        input.insert(SourceKind::Conflict, Err("file not found".into()));

        let out = run(&config, &input, &resolver()).unwrap();
        assert!(out.report.is_degraded());
        assert!(matches!(
            out.report.source(SourceKind::Conflict).unwrap().status,
            SourceStatus::Failed { .. }
        ));
        assert_eq!(
            out.report.source(SourceKind::Internet).unwrap().status,
            SourceStatus::NotConfigured
        );
        // Chad has zero sales overall and is removed
        assert_eq!(out.report.zero_activity_removed, vec!["Chad".to_string()]);
        assert_eq!(out.terminal.len(), 2);
    }

    #[test]
    fn conflict_only_countries_enter_outer_panel() {
        let config = PanelConfig::from_toml(CONFIG).unwrap();
        let mut input = PanelInput::default();
        input.insert(SourceKind::Ecommerce, Ok(vec![ecom()]));
        input.insert(
            SourceKind::Conflict,
            Ok(vec![table(
                &["country", "year", "best"],
                &[&["Mali", "2020", "5"], &["Kenya", "2020", "2"], &["Kenya", "2020", "1"]],
            )]),
        );

        let out = run(&config, &input, &resolver()).unwrap();
        let keys: Vec<String> = out
            .compiled
            .iter()
            .map(|r| format!("{}/{}", r.country, r.year))
            .collect();
        assert_eq!(keys, vec!["Chad/2019", "Kenya/2019", "Kenya/2020", "Mali/2020"]);
        assert_eq!(out.compiled[2].metrics.deaths, Some(3.0));
        let conflict = out.report.source(SourceKind::Conflict).unwrap();
        assert_eq!(
            conflict.status,
            SourceStatus::Loaded { rows: 2, collapsed: 1 }
        );
    }

    const COMMON_CONFIG: &str = r#"
name = "unit"
variant = "crisis"

[sources.conflict]
files = ["ged.csv"]

[sources.ecommerce]
files = ["ecom.csv"]

[output]
year_window = "common"
"#;

    #[test]
    fn common_window_restricts_to_shared_years() {
        let config = PanelConfig::from_toml(COMMON_CONFIG).unwrap();
        let mut input = PanelInput::default();
        input.insert(SourceKind::Ecommerce, Ok(vec![ecom()]));
        input.insert(
            SourceKind::Conflict,
            Ok(vec![table(
                &["country", "year", "best"],
                &[&["Kenya", "2020", "2"], &["Kenya", "2021", "4"]],
            )]),
        );

        let out = run(&config, &input, &resolver()).unwrap();
        assert_eq!(out.report.common_years, Some((2020, 2020)));
        assert!(out.compiled.iter().all(|r| r.year == 2020));
        assert!(!out.compiled.is_empty());
    }

    #[test]
    fn disjoint_common_window_keeps_all_years() {
        let config = PanelConfig::from_toml(COMMON_CONFIG).unwrap();
        let mut input = PanelInput::default();
        input.insert(SourceKind::Ecommerce, Ok(vec![ecom()]));
        input.insert(
            SourceKind::Conflict,
            Ok(vec![table(&["country", "year", "best"], &[&["Kenya", "2001", "7"]])]),
        );

        let out = run(&config, &input, &resolver()).unwrap();
        assert_eq!(out.report.common_years, None);
        let years: Vec<i32> = out.compiled.iter().map(|r| r.year).collect();
        assert!(years.contains(&2001));
        assert!(years.contains(&2020));
        assert!(out
            .report
            .warnings()
            .iter()
            .any(|w| w.starts_with("year window:")));
    }
}
