use serde::Deserialize;

use crate::error::PanelError;
use crate::identity::IdScheme;
use crate::model::{JoinKind, SourceKind};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PanelConfig {
    pub name: String,
    pub variant: Variant,
    /// Alias table TOML. The built-in table is used when absent.
    #[serde(default)]
    pub aliases: Option<String>,
    /// `country_codes.csv` (country, iso3, code). Needed for code-based identity.
    #[serde(default)]
    pub country_codes: Option<String>,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Which terminal dataset the run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Zero-activity removal and IQR bound, `final_dataset.csv`.
    Crisis,
    /// Complete-case panel with classification, `panel_dataset.csv`.
    Panel,
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Crisis => write!(f, "crisis"),
            Self::Panel => write!(f, "panel"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub conflict: Option<ConflictSource>,
    #[serde(default)]
    pub internet: Option<InternetSource>,
    #[serde(default)]
    pub ecommerce: Option<EcommerceSource>,
    #[serde(default)]
    pub classification: Option<ClassificationSource>,
}

impl SourcesConfig {
    pub fn input(&self, kind: SourceKind) -> Option<&InputSpec> {
        match kind {
            SourceKind::Conflict => self.conflict.as_ref().map(|s| &s.input),
            SourceKind::Internet => self.internet.as_ref().map(|s| &s.input),
            SourceKind::Ecommerce => self.ecommerce.as_ref().map(|s| &s.input),
            SourceKind::Classification => self.classification.as_ref().map(|s| &s.input),
        }
    }

    pub fn configured(&self) -> Vec<SourceKind> {
        SourceKind::ALL
            .into_iter()
            .filter(|k| self.input(*k).is_some())
            .collect()
    }
}

/// Where a source's raw table comes from, and how it joins the panel.
#[derive(Debug, Clone, Deserialize)]
pub struct InputSpec {
    /// One or more files with the same schema, stacked by column name.
    pub files: Vec<String>,
    #[serde(default)]
    pub sheet: Option<String>,
    /// Zero-based row holding the column headers.
    #[serde(default)]
    pub header_row: usize,
    #[serde(default)]
    pub join: Option<JoinKind>,
}

impl InputSpec {
    pub fn join_or(&self, default: JoinKind) -> JoinKind {
        self.join.unwrap_or(default)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConflictSource {
    #[serde(flatten)]
    pub input: InputSpec,
    #[serde(default = "default_conflict_country")]
    pub country_column: String,
    #[serde(default = "default_conflict_year")]
    pub year_column: String,
    #[serde(default = "default_conflict_value")]
    pub value_column: String,
}

fn default_conflict_country() -> String {
    "country".into()
}

fn default_conflict_year() -> String {
    "year".into()
}

fn default_conflict_value() -> String {
    "best".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct InternetSource {
    #[serde(flatten)]
    pub input: InputSpec,
    #[serde(default)]
    pub format: InternetFormat,
    /// ITU: substring marking the first row of the indicator block.
    #[serde(default = "default_itu_label")]
    pub label: String,
    /// ITU: text removed from the row identifiers.
    #[serde(default = "default_itu_strip")]
    pub strip: String,
    /// WDI: series filter.
    #[serde(default = "default_wdi_series")]
    pub series_code: String,
    #[serde(default = "default_wdi_series_column")]
    pub series_column: String,
    #[serde(default = "default_wdi_country")]
    pub country_column: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternetFormat {
    /// Wide ITU regional aggregates sheet with labelled row blocks.
    #[default]
    ItuRegional,
    /// World Bank WDI export with `YYYY [YRYYYY]` columns.
    Wdi,
}

fn default_itu_label() -> String {
    "Percentage of individuals using the Internet".into()
}

fn default_itu_strip() -> String {
    "Percentage of individuals using the Internet, total".into()
}

fn default_wdi_series() -> String {
    "IT.NET.USER.ZS".into()
}

fn default_wdi_series_column() -> String {
    "Series Code".into()
}

fn default_wdi_country() -> String {
    "Country Name".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct EcommerceSource {
    #[serde(flatten)]
    pub input: InputSpec,
    #[serde(default)]
    pub measure: EcommerceMeasure,
    #[serde(default)]
    pub identity: EcommerceIdentity,
    /// Overrides the measure's default value column.
    #[serde(default)]
    pub value_column: Option<String>,
    #[serde(default = "default_ecommerce_year")]
    pub year_column: String,
    #[serde(default = "default_ecommerce_label")]
    pub label_column: String,
    #[serde(default = "default_ecommerce_code")]
    pub code_column: String,
    #[serde(default)]
    pub filters: Vec<FilterRule>,
}

impl EcommerceSource {
    pub fn value_column(&self) -> &str {
        self.value_column
            .as_deref()
            .unwrap_or_else(|| self.measure.default_column())
    }

    pub fn identity_column(&self) -> &str {
        match self.identity {
            EcommerceIdentity::Label => &self.label_column,
            EcommerceIdentity::NumericCode => &self.code_column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EcommerceMeasure {
    #[default]
    Sales,
    Share,
}

impl EcommerceMeasure {
    pub fn default_column(&self) -> &'static str {
        match self {
            Self::Sales => "US$ at current prices in millions",
            Self::Share => "Percentage in total turnover",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EcommerceIdentity {
    #[default]
    Label,
    NumericCode,
}

impl EcommerceIdentity {
    pub fn scheme(&self) -> IdScheme {
        match self {
            Self::Label => IdScheme::Name,
            Self::NumericCode => IdScheme::NumericCode,
        }
    }
}

fn default_ecommerce_year() -> String {
    "Year".into()
}

fn default_ecommerce_label() -> String {
    "Economy Label".into()
}

fn default_ecommerce_code() -> String {
    "Economy".into()
}

/// Keep rows where `column` equals `value`, as trimmed text or as a number.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterRule {
    pub column: String,
    pub value: String,
}

impl FilterRule {
    pub fn matches(&self, cell: &str) -> bool {
        let cell = cell.trim();
        let want = self.value.trim();
        if cell == want {
            return true;
        }
        match (cell.parse::<f64>(), want.parse::<f64>()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassificationSource {
    #[serde(flatten)]
    pub input: InputSpec,
    #[serde(default = "default_class_country")]
    pub country_column: String,
    #[serde(default = "default_class_code")]
    pub code_column: String,
    #[serde(default = "default_class_region")]
    pub region_column: String,
    #[serde(default = "default_class_income")]
    pub income_column: String,
    #[serde(default = "default_high_income")]
    pub high_income: String,
}

fn default_class_country() -> String {
    "Economy".into()
}

fn default_class_code() -> String {
    "Code".into()
}

fn default_class_region() -> String {
    "Region".into()
}

fn default_class_income() -> String {
    "Income group".into()
}

fn default_high_income() -> String {
    "High income".into()
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,
    #[serde(default)]
    pub year_window: YearWindow,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            year_window: YearWindow::default(),
        }
    }
}

fn default_output_dir() -> String {
    "output".into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum YearWindow {
    /// Union of the primary sources' years.
    #[default]
    All,
    /// Intersection of the primary sources' year ranges.
    Common,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl PanelConfig {
    pub fn from_toml(input: &str) -> Result<Self, PanelError> {
        let config: PanelConfig =
            toml::from_str(input).map_err(|e| PanelError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PanelError> {
        let configured = self.sources.configured();
        if !configured.iter().any(|k| k.role() == crate::model::SourceRole::Primary) {
            return Err(PanelError::ConfigValidation(
                "at least one of conflict, internet or ecommerce must be configured".into(),
            ));
        }

        for kind in &configured {
            if let Some(input) = self.sources.input(*kind) {
                if input.files.is_empty() {
                    return Err(PanelError::ConfigValidation(format!(
                        "source '{kind}': files must not be empty"
                    )));
                }
            }
        }

        if let Some(class) = &self.sources.classification {
            if class.input.join == Some(JoinKind::Outer) {
                return Err(PanelError::ConfigValidation(
                    "source 'classification': join must be 'left' or 'inner'".into(),
                ));
            }
        }

        if let Some(ecom) = &self.sources.ecommerce {
            if ecom.identity == EcommerceIdentity::NumericCode && self.country_codes.is_none() {
                return Err(PanelError::ConfigValidation(
                    "source 'ecommerce': identity = \"numeric_code\" requires country_codes".into(),
                ));
            }
        }

        match self.variant {
            Variant::Crisis => match &self.sources.ecommerce {
                Some(e) if e.measure == EcommerceMeasure::Sales => {}
                _ => {
                    return Err(PanelError::ConfigValidation(
                        "variant 'crisis' needs an ecommerce source with measure = \"sales\"".into(),
                    ))
                }
            },
            Variant::Panel => {
                match &self.sources.ecommerce {
                    Some(e) if e.measure == EcommerceMeasure::Share => {}
                    _ => {
                        return Err(PanelError::ConfigValidation(
                            "variant 'panel' needs an ecommerce source with measure = \"share\""
                                .into(),
                        ))
                    }
                }
                if self.sources.internet.is_none() || self.sources.classification.is_none() {
                    return Err(PanelError::ConfigValidation(
                        "variant 'panel' needs internet and classification sources".into(),
                    ));
                }
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
