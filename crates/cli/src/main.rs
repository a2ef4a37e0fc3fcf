// crisis-panel CLI - country-year panel harmonization

mod exit_codes;
mod fetch;
mod inspect;
mod logging;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crisis_panel_engine::PanelError;
use exit_codes::{
    EXIT_ERROR, EXIT_FETCH, EXIT_INVALID_CONFIG, EXIT_RUNTIME, EXIT_SUCCESS, EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "crisis-panel")]
#[command(about = "Harmonize conflict, internet and e-commerce sources into a country-year panel")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Only log warnings and errors
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline from a TOML config and write all artifacts
    #[command(after_help = "\
Examples:
  crisis-panel run config/crisis.panel.toml
  crisis-panel run config/panel.panel.toml --out-dir build/panel
  crisis-panel run config/crisis.panel.toml --json > report.json
  crisis-panel run config/crisis.panel.toml --strict")]
    Run {
        /// Path to the .panel.toml config file
        config: PathBuf,

        /// Output directory (default: [output] dir, relative to the config)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Print the run report as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Exit 5 if any configured source failed to load
        #[arg(long)]
        strict: bool,
    },

    /// Validate a config without running
    #[command(after_help = "\
Examples:
  crisis-panel validate config/crisis.panel.toml")]
    Validate {
        /// Path to the .panel.toml config file
        config: PathBuf,
    },

    /// Show the columns and first rows of a raw source file
    #[command(after_help = "\
Examples:
  crisis-panel inspect data/GEDEvent_v24_1.csv
  crisis-panel inspect data/ITU_regional_global_Key_ICT_indicator_aggregates.xlsx --sheet 'By BDT region' --header-row 4
  crisis-panel inspect data/CLASS.xlsx --rows 20")]
    Inspect {
        /// CSV, TSV or spreadsheet file
        file: PathBuf,

        /// Worksheet name (spreadsheets; default: first sheet)
        #[arg(long)]
        sheet: Option<String>,

        /// Zero-based row holding the column names
        #[arg(long, default_value_t = 0)]
        header_row: usize,

        /// Number of data rows to show
        #[arg(long, default_value_t = 5)]
        rows: usize,
    },

    /// Download the country code reference table into country_codes.csv
    #[command(after_help = "\
Examples:
  crisis-panel fetch-codes
  crisis-panel fetch-codes --output data/country_codes.csv
  crisis-panel fetch-codes --url https://example.org/codes.htm")]
    FetchCodes {
        /// Page holding the code table
        #[arg(long, default_value = crisis_panel_io::country_codes::DEFAULT_URL)]
        url: String,

        /// Output CSV path
        #[arg(long, default_value = "country_codes.csv")]
        output: PathBuf,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  crisis-panel-engine ", env!("CARGO_PKG_VERSION"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.quiet);

    let result = match cli.command {
        Commands::Run { config, out_dir, json, strict } => run::cmd_run(config, out_dir, json, strict),
        Commands::Validate { config } => run::cmd_validate(config),
        Commands::Inspect { file, sheet, header_row, rows } => {
            inspect::cmd_inspect(file, sheet, header_row, rows)
        }
        Commands::FetchCodes { url, output } => fetch::cmd_fetch_codes(&url, output),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INVALID_CONFIG, message: msg.into(), hint: None }
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self { code: EXIT_RUNTIME, message: msg.into(), hint: None }
    }

    pub fn fetch(msg: impl Into<String>) -> Self {
        Self { code: EXIT_FETCH, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<PanelError> for CliError {
    fn from(err: PanelError) -> Self {
        match err {
            PanelError::ConfigParse(_) => CliError::config(err.to_string())
                .with_hint("check the TOML syntax and field names"),
            PanelError::ConfigValidation(_) | PanelError::AliasChain { .. } => {
                CliError::config(err.to_string())
            }
            _ => CliError::runtime(err.to_string()),
        }
    }
}
