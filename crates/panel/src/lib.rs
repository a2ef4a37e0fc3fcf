//! `crisis-panel-engine`: country-year panel harmonization engine.
//!
//! Pure engine crate: receives raw tables, returns the compiled panel, the
//! derived features and the terminal dataset with an audit report.
//! No CLI or IO dependencies.

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod identity;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod report;
pub mod table;

pub use config::{PanelConfig, Variant};
pub use engine::{run, PanelInput, PipelineOutput};
pub use error::PanelError;
pub use identity::{AliasTable, CountryCode, CountryCodeTable, IdentityResolver};
pub use model::{CountryYearRecord, SourceKind, TerminalRows};
pub use report::{PipelineReport, SourceStatus};
pub use table::RawTable;
