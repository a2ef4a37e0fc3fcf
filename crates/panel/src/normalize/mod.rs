//! Per-source adapters turning raw tables into canonical country-year records.
//!
//! Each normalizer resolves identities through the shared resolver before
//! anything is merged, so downstream stages only ever see canonical keys.

mod classification;
mod conflict;
mod ecommerce;
mod internet;

pub use classification::ClassificationNormalizer;
pub use conflict::ConflictNormalizer;
pub use ecommerce::EcommerceNormalizer;
pub use internet::{ItuInternetNormalizer, WdiInternetNormalizer};

use crate::config::{InternetFormat, SourcesConfig};
use crate::error::PanelError;
use crate::identity::{IdentityResolver, UnresolvedLog};
use crate::model::{SourceDataset, SourceKind};
use crate::table::RawTable;

/// Result of normalizing one source.
#[derive(Debug, Clone, Default)]
pub struct NormalizedSource {
    pub dataset: SourceDataset,
    pub unresolved: UnresolvedLog,
    /// Rows dropped for a missing value, year or identifier.
    pub dropped_rows: usize,
    /// Rows dropped because their key was already seen (classification only).
    pub duplicates: usize,
}

pub trait SourceNormalizer {
    fn kind(&self) -> SourceKind;

    fn normalize(
        &self,
        table: &RawTable,
        resolver: &IdentityResolver,
    ) -> Result<NormalizedSource, PanelError>;
}

/// Build the normalizer for `kind` from its config section, if configured.
pub fn normalizer_for(
    kind: SourceKind,
    sources: &SourcesConfig,
) -> Option<Box<dyn SourceNormalizer>> {
    match kind {
        SourceKind::Conflict => sources
            .conflict
            .as_ref()
            .map(|c| Box::new(ConflictNormalizer::from_config(c)) as Box<dyn SourceNormalizer>),
        SourceKind::Internet => sources.internet.as_ref().map(|c| match c.format {
            InternetFormat::ItuRegional => {
                Box::new(ItuInternetNormalizer::from_config(c)) as Box<dyn SourceNormalizer>
            }
            InternetFormat::Wdi => Box::new(WdiInternetNormalizer::from_config(c)),
        }),
        SourceKind::Ecommerce => sources
            .ecommerce
            .as_ref()
            .map(|c| Box::new(EcommerceNormalizer::from_config(c)) as Box<dyn SourceNormalizer>),
        SourceKind::Classification => sources.classification.as_ref().map(|c| {
            Box::new(ClassificationNormalizer::from_config(c)) as Box<dyn SourceNormalizer>
        }),
    }
}

/// Read a year cell. Blank is `Ok(None)` (row dropped); unparseable text
/// is an error for the whole source.
pub(crate) fn year_cell(
    kind: SourceKind,
    row: usize,
    raw: &str,
) -> Result<Option<i32>, PanelError> {
    if raw.is_empty() {
        return Ok(None);
    }
    crate::table::parse_year(raw)
        .map(Some)
        .ok_or_else(|| PanelError::InvalidValue {
            source_kind: kind,
            row,
            field: "year",
            value: raw.to_string(),
        })
}
