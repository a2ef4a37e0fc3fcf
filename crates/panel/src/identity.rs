//! Country identity resolution.
//!
//! Every source spells countries its own way: UCDP uses historical
//! parentheticals ("Myanmar (Burma)"), UNCTAD uses M49 numeric codes or
//! long-form labels, the World Bank uses ISO3 and short names. The resolver
//! turns any of them into one canonical key. It holds only immutable tables,
//! so `resolve` is a pure function of its arguments.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Deserialize;

use crate::error::PanelError;
use crate::model::SourceKind;

const DEFAULT_ALIASES: &str = include_str!("../data/country_aliases.toml");

// ---------------------------------------------------------------------------
// Alias table
// ---------------------------------------------------------------------------

/// Versioned alias → canonical-name mapping, with optional per-source scopes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AliasTable {
    pub version: u32,
    #[serde(default)]
    pub global: BTreeMap<String, String>,
    #[serde(default)]
    pub sources: BTreeMap<SourceKind, BTreeMap<String, String>>,
}

impl AliasTable {
    pub fn from_toml(input: &str) -> Result<Self, PanelError> {
        let table: AliasTable =
            toml::from_str(input).map_err(|e| PanelError::ConfigParse(e.to_string()))?;
        table.validate()?;
        Ok(table)
    }

    /// The table shipped with the engine.
    pub fn builtin() -> Result<Self, PanelError> {
        Self::from_toml(DEFAULT_ALIASES)
    }

    /// Reject chains (`a -> b`, `b -> c`): a target must not itself be a key
    /// in any scope it can be looked up from. A global target is visible to
    /// every source scope.
    pub fn validate(&self) -> Result<(), PanelError> {
        for (alias, target) in &self.global {
            if self.global.contains_key(target)
                || self.sources.values().any(|scope| scope.contains_key(target))
            {
                return Err(PanelError::AliasChain {
                    alias: alias.clone(),
                    target: target.clone(),
                });
            }
        }
        for scope in self.sources.values() {
            for (alias, target) in scope {
                if scope.contains_key(target) || self.global.contains_key(target) {
                    return Err(PanelError::AliasChain {
                        alias: alias.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn lookup(&self, source: SourceKind, name: &str) -> Option<&str> {
        self.sources
            .get(&source)
            .and_then(|scope| scope.get(name))
            .or_else(|| self.global.get(name))
            .map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.global.len() + self.sources.values().map(|s| s.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Code reference table
// ---------------------------------------------------------------------------

/// One row of `country_codes.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, serde::Serialize)]
pub struct CountryCode {
    pub country: String,
    pub iso3: String,
    pub code: i64,
}

#[derive(Debug, Clone, Default)]
pub struct CountryCodeTable {
    by_code: HashMap<i64, String>,
    by_iso3: HashMap<String, String>,
}

impl CountryCodeTable {
    /// Build lookup maps. When a code appears twice the first entry wins.
    pub fn new(entries: &[CountryCode]) -> Self {
        let mut by_code = HashMap::new();
        let mut by_iso3 = HashMap::new();
        for e in entries {
            by_code.entry(e.code).or_insert_with(|| e.country.clone());
            if !e.iso3.is_empty() {
                by_iso3
                    .entry(e.iso3.to_uppercase())
                    .or_insert_with(|| e.country.clone());
            }
        }
        Self { by_code, by_iso3 }
    }

    pub fn name_for_code(&self, code: i64) -> Option<&str> {
        self.by_code.get(&code).map(|s| s.as_str())
    }

    pub fn name_for_iso3(&self, iso3: &str) -> Option<&str> {
        self.by_iso3.get(&iso3.to_uppercase()).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// How a source identifies countries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdScheme {
    #[default]
    Name,
    NumericCode,
    Iso3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceContext {
    pub source: SourceKind,
    pub scheme: IdScheme,
}

impl SourceContext {
    pub fn names(source: SourceKind) -> Self {
        Self {
            source,
            scheme: IdScheme::Name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(String),
    Unresolved,
}

#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    aliases: AliasTable,
    codes: Option<CountryCodeTable>,
}

impl IdentityResolver {
    pub fn new(aliases: AliasTable, codes: Option<CountryCodeTable>) -> Self {
        Self { aliases, codes }
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn has_code_table(&self) -> bool {
        self.codes.is_some()
    }

    /// Map a raw identifier to its canonical name. Names and alias keys match
    /// exactly, without trimming or case folding; callers pass cleaned cells.
    pub fn resolve(&self, raw: &str, ctx: SourceContext) -> Resolution {
        if raw.trim().is_empty() {
            return Resolution::Unresolved;
        }

        let name = match ctx.scheme {
            IdScheme::Name => raw,
            IdScheme::NumericCode => {
                let found = parse_code(raw)
                    .and_then(|code| self.codes.as_ref()?.name_for_code(code));
                match found {
                    Some(name) => name,
                    None => return Resolution::Unresolved,
                }
            }
            IdScheme::Iso3 => match self.codes.as_ref().and_then(|c| c.name_for_iso3(raw)) {
                Some(name) => name,
                None => return Resolution::Unresolved,
            },
        };

        let canonical = self.aliases.lookup(ctx.source, name).unwrap_or(name);
        Resolution::Resolved(canonical.to_string())
    }
}

fn parse_code(raw: &str) -> Option<i64> {
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    let f = raw.parse::<f64>().ok()?;
    (f.fract() == 0.0).then_some(f as i64)
}

/// Distinct raw identifiers a normalizer had to drop, kept for the audit report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnresolvedLog {
    raw: BTreeSet<String>,
    rows: usize,
}

impl UnresolvedLog {
    pub fn record(&mut self, raw: &str) {
        self.raw.insert(raw.trim().to_string());
        self.rows += 1;
    }

    pub fn identifiers(&self) -> Vec<String> {
        self.raw.iter().cloned().collect()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}
