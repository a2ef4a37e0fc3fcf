use thiserror::Error;

use crate::model::SourceKind;

#[derive(Debug, Error)]
pub enum PanelError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (missing source, bad join for a source, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// The reader could not produce a table for this source.
    #[error("source '{source_kind}': cannot read input: {message}")]
    SourceRead { source_kind: SourceKind, message: String },

    /// Required column absent from the raw table.
    #[error("source '{source_kind}': missing column '{column}'")]
    MissingColumn { source_kind: SourceKind, column: String },

    /// The labelled row block of a wide table was not found.
    #[error("source '{source_kind}': no row containing label '{label}'")]
    LabelBlockNotFound { source_kind: SourceKind, label: String },

    /// A key cell (year, code) could not be parsed.
    #[error("source '{source_kind}', row {row}: cannot parse {field} '{value}'")]
    InvalidValue {
        source_kind: SourceKind,
        row: usize,
        field: &'static str,
        value: String,
    },

    /// A merge input carried the same key twice.
    #[error("duplicate key in merge input: {0}")]
    DuplicateKey(String),

    /// Join kind not allowed for this merge.
    #[error("invalid join: {0}")]
    InvalidJoin(String),

    /// Alias table maps onto another alias key.
    #[error("alias table: '{alias}' -> '{target}' points at another alias")]
    AliasChain { alias: String, target: String },
}

pub type Result<T> = std::result::Result<T, PanelError>;
