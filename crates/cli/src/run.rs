//! `crisis-panel run` / `crisis-panel validate`: config-driven panel build.

use std::path::{Path, PathBuf};

use crisis_panel_engine::config::EcommerceMeasure;
use crisis_panel_engine::features::with_crisis_dummies;
use crisis_panel_engine::model::Metric;
use crisis_panel_engine::{
    AliasTable, CountryCodeTable, IdentityResolver, PanelConfig, PanelInput, PipelineOutput,
    SourceKind, TerminalRows,
};
use crisis_panel_io::records;

use crate::exit_codes::EXIT_DEGRADED;
use crate::CliError;

/// Parse and validate the config. Returns it with the directory that
/// relative paths inside it resolve against.
fn load_config(config_path: &Path) -> Result<(PanelConfig, PathBuf), CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        CliError::runtime(format!("cannot read config {}: {e}", config_path.display()))
    })?;
    let config = PanelConfig::from_toml(&config_str)?;
    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((config, base_dir))
}

fn load_aliases(config: &PanelConfig, base_dir: &Path) -> Result<AliasTable, CliError> {
    match &config.aliases {
        Some(file) => {
            let path = base_dir.join(file);
            let content = std::fs::read_to_string(&path).map_err(|e| {
                CliError::runtime(format!("cannot read alias table {}: {e}", path.display()))
            })?;
            Ok(AliasTable::from_toml(&content)?)
        }
        None => Ok(AliasTable::builtin()?),
    }
}

fn build_resolver(config: &PanelConfig, base_dir: &Path) -> Result<IdentityResolver, CliError> {
    let aliases = load_aliases(config, base_dir)?;
    log::info!("alias table v{}: {} aliases", aliases.version, aliases.len());

    let codes = match &config.country_codes {
        Some(file) => {
            let path = base_dir.join(file);
            let entries = crisis_panel_io::country_codes::read_country_codes(&path).map_err(|e| {
                CliError::runtime(format!("cannot read country codes: {e}"))
                    .with_hint("run `crisis-panel fetch-codes` to download the table")
            })?;
            let table = CountryCodeTable::new(&entries);
            log::info!("country code table: {} entries", table.len());
            Some(table)
        }
        None => None,
    };

    Ok(IdentityResolver::new(aliases, codes))
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&config_path)?;
    let aliases = load_aliases(&config, &base_dir)?;

    let sources = config.sources.configured();
    let mut missing = Vec::new();
    for kind in &sources {
        if let Some(input) = config.sources.input(*kind) {
            for file in &input.files {
                if !base_dir.join(file).exists() {
                    missing.push(format!("{kind}: {file}"));
                }
            }
        }
    }
    for m in &missing {
        log::warn!("input not found: {m}");
    }

    let names: Vec<String> = sources.iter().map(|k| k.to_string()).collect();
    eprintln!(
        "valid: {} '{}' with {} source(s) ({}), alias table v{}",
        config.variant,
        config.name,
        sources.len(),
        names.join(", "),
        aliases.version,
    );
    Ok(())
}

pub fn cmd_run(
    config_path: PathBuf,
    out_dir: Option<PathBuf>,
    json_output: bool,
    strict: bool,
) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&config_path)?;
    let resolver = build_resolver(&config, &base_dir)?;

    // A reader failure is handed to the engine, which reports the source
    // as failed and carries on with the rest.
    let mut input = PanelInput::default();
    for kind in config.sources.configured() {
        if let Some(spec) = config.sources.input(kind) {
            input.insert(kind, crisis_panel_io::load_source(spec, &base_dir));
        }
    }

    let output = crisis_panel_engine::run(&config, &input, &resolver)?;

    let out_dir = out_dir.unwrap_or_else(|| base_dir.join(&config.output.dir));
    std::fs::create_dir_all(&out_dir)
        .map_err(|e| CliError::runtime(format!("cannot create {}: {e}", out_dir.display())))?;

    let written = write_artifacts(&config, &output, &out_dir)?;

    if json_output {
        let json_str = serde_json::to_string_pretty(&output.report)
            .map_err(|e| CliError::general(format!("cannot serialize report: {e}")))?;
        println!("{json_str}");
    }

    // Human summary to stderr
    let r = &output.report;
    let years = r
        .year_range
        .map(|(lo, hi)| format!("{lo}-{hi}"))
        .unwrap_or_else(|| "-".into());
    eprintln!(
        "{} panel '{}': {} rows, {} countries, years {}",
        r.meta.variant, r.meta.config_name, r.rows, r.countries, years,
    );
    for s in &r.sources {
        eprintln!("  {:<15} {}", s.source, status_line(&s.status));
    }
    for w in r.warnings() {
        eprintln!("  warning: {w}");
    }
    eprintln!("  wrote {} file(s) to {}", written.len(), out_dir.display());

    if strict && r.is_degraded() {
        let failed: Vec<String> = r
            .sources
            .iter()
            .filter(|s| s.status.is_failed())
            .map(|s| s.source.to_string())
            .collect();
        return Err(CliError {
            code: EXIT_DEGRADED,
            message: format!("degraded run: source(s) failed: {}", failed.join(", ")),
            hint: Some("artifacts were written without the failed sources".into()),
        });
    }

    Ok(())
}

fn status_line(status: &crisis_panel_engine::SourceStatus) -> String {
    use crisis_panel_engine::SourceStatus;
    match status {
        SourceStatus::Loaded { rows, collapsed: 0 } => format!("{rows} rows"),
        SourceStatus::Loaded { rows, collapsed } => {
            format!("{rows} rows ({collapsed} duplicate keys summed)")
        }
        SourceStatus::Failed { reason } => format!("FAILED: {reason}"),
        SourceStatus::NotConfigured => "not configured".into(),
    }
}

/// Write intermediate, compiled and terminal artifacts plus `report.json`.
/// Returns the file names written, in order.
fn write_artifacts(
    config: &PanelConfig,
    output: &PipelineOutput,
    out_dir: &Path,
) -> Result<Vec<String>, CliError> {
    let mut written = Vec::new();
    let mut emit = |name: &str, result: Result<usize, String>| -> Result<(), CliError> {
        let rows = result.map_err(|e| CliError::runtime(format!("cannot write {name}: {e}")))?;
        log::info!("wrote {name} ({rows} rows)");
        written.push(name.to_string());
        Ok(())
    };

    for (kind, dataset) in &output.sources {
        let (name, metric) = match kind {
            SourceKind::Conflict => ("conflicts.csv", Metric::Deaths),
            SourceKind::Internet => ("internet_usage.csv", Metric::InternetUsage),
            SourceKind::Ecommerce => match config.sources.ecommerce.as_ref().map(|e| e.measure) {
                Some(EcommerceMeasure::Share) => ("ecommerce_share.csv", Metric::EcommerceShare),
                _ => ("ecommerce_sales.csv", Metric::EcommerceSales),
            },
            SourceKind::Classification => {
                emit(
                    "class_clean.csv",
                    records::write_class(&out_dir.join("class_clean.csv"), &dataset.attributes),
                )?;
                continue;
            }
        };
        emit(
            name,
            records::write_metric_records(&out_dir.join(name), &dataset.records, metric),
        )?;
    }

    emit(
        "compiled_data.csv",
        records::write_compiled(&out_dir.join("compiled_data.csv"), &output.compiled),
    )?;
    emit(
        "featured_data.csv",
        records::write_featured(&out_dir.join("featured_data.csv"), &output.featured),
    )?;

    match &output.terminal {
        TerminalRows::Crisis(rows) => {
            emit(
                "final_dataset.csv",
                records::write_final(&out_dir.join("final_dataset.csv"), rows),
            )?;
        }
        TerminalRows::Panel(rows) => {
            emit(
                "panel_dataset.csv",
                records::write_panel(&out_dir.join("panel_dataset.csv"), rows),
            )?;
            emit(
                "panel_dataset_with_crises.csv",
                records::write_crisis_panel(
                    &out_dir.join("panel_dataset_with_crises.csv"),
                    &with_crisis_dummies(rows),
                ),
            )?;
        }
    }

    emit(
        "report.json",
        records::write_json(&out_dir.join("report.json"), &output.report).map(|()| 1),
    )?;

    Ok(written)
}
