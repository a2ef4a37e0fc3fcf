use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Conflict,
    Internet,
    Ecommerce,
    Classification,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Conflict,
        SourceKind::Internet,
        SourceKind::Ecommerce,
        SourceKind::Classification,
    ];

    /// Primary sources may introduce country-year rows; auxiliary ones only attach.
    pub fn role(&self) -> SourceRole {
        match self {
            Self::Conflict | Self::Internet | Self::Ecommerce => SourceRole::Primary,
            Self::Classification => SourceRole::Auxiliary,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conflict => write!(f, "conflict"),
            Self::Internet => write!(f, "internet"),
            Self::Ecommerce => write!(f, "ecommerce"),
            Self::Classification => write!(f, "classification"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceRole {
    Primary,
    Auxiliary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    Inner,
    Left,
    #[default]
    Outer,
}

impl std::fmt::Display for JoinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inner => write!(f, "inner"),
            Self::Left => write!(f, "left"),
            Self::Outer => write!(f, "outer"),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Deaths,
    InternetUsage,
    EcommerceSales,
    EcommerceShare,
}

/// Metric values for one country-year. `None` is unknown, not zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Metrics {
    pub deaths: Option<f64>,
    pub internet_usage: Option<f64>,
    pub ecommerce_sales: Option<f64>,
    pub ecommerce_share: Option<f64>,
}

impl Metrics {
    pub fn only(metric: Metric, value: f64) -> Self {
        let mut m = Self::default();
        *m.slot_mut(metric) = Some(value);
        m
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Deaths => self.deaths,
            Metric::InternetUsage => self.internet_usage,
            Metric::EcommerceSales => self.ecommerce_sales,
            Metric::EcommerceShare => self.ecommerce_share,
        }
    }

    pub fn slot_mut(&mut self, metric: Metric) -> &mut Option<f64> {
        match metric {
            Metric::Deaths => &mut self.deaths,
            Metric::InternetUsage => &mut self.internet_usage,
            Metric::EcommerceSales => &mut self.ecommerce_sales,
            Metric::EcommerceShare => &mut self.ecommerce_share,
        }
    }

    /// Add `other` field-wise. Absent + absent stays absent.
    pub fn sum(&self, other: &Metrics) -> Metrics {
        fn add(a: Option<f64>, b: Option<f64>) -> Option<f64> {
            match (a, b) {
                (Some(x), Some(y)) => Some(x + y),
                (x, None) => x,
                (None, y) => y,
            }
        }
        Metrics {
            deaths: add(self.deaths, other.deaths),
            internet_usage: add(self.internet_usage, other.internet_usage),
            ecommerce_sales: add(self.ecommerce_sales, other.ecommerce_sales),
            ecommerce_share: add(self.ecommerce_share, other.ecommerce_share),
        }
    }

    /// Combine columns from two sources; `self` wins where both are present.
    pub fn combine(&self, other: &Metrics) -> Metrics {
        Metrics {
            deaths: self.deaths.or(other.deaths),
            internet_usage: self.internet_usage.or(other.internet_usage),
            ecommerce_sales: self.ecommerce_sales.or(other.ecommerce_sales),
            ecommerce_share: self.ecommerce_share.or(other.ecommerce_share),
        }
    }
}

/// Key = (country, year). Ordered so BTreeMap iteration yields panel order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CountryYear {
    pub country: String,
    pub year: i32,
}

impl std::fmt::Display for CountryYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.country, self.year)
    }
}

/// The atomic unit flowing through normalize → aggregate → merge.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryYearRecord {
    pub country: String,
    pub year: i32,
    pub metrics: Metrics,
}

impl CountryYearRecord {
    pub fn new(country: impl Into<String>, year: i32, metrics: Metrics) -> Self {
        Self {
            country: country.into(),
            year,
            metrics,
        }
    }

    pub fn key(&self) -> CountryYear {
        CountryYear {
            country: self.country.clone(),
            year: self.year,
        }
    }
}

/// Static per-country attributes from the classification source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryAttributes {
    #[serde(rename = "country_name")]
    pub country: String,
    pub country_code: String,
    pub region: String,
    pub income_group: String,
    pub dev_status: u8,
}

/// Normalized output of one source.
#[derive(Debug, Clone, Default)]
pub struct SourceDataset {
    pub records: Vec<CountryYearRecord>,
    pub attributes: Vec<CountryAttributes>,
}

impl SourceDataset {
    pub fn len(&self) -> usize {
        self.records.len() + self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Panel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PanelRow {
    pub country: String,
    pub year: i32,
    pub metrics: Metrics,
    pub attributes: Option<CountryAttributes>,
}

impl From<CountryYearRecord> for PanelRow {
    fn from(r: CountryYearRecord) -> Self {
        Self {
            country: r.country,
            year: r.year,
            metrics: r.metrics,
            attributes: None,
        }
    }
}

/// A panel row after feature derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturedRow {
    pub row: PanelRow,
    pub is_conflict: bool,
    pub major_crisis: bool,
    pub growth: Option<f64>,
}

// ---------------------------------------------------------------------------
// Terminal rows
// ---------------------------------------------------------------------------

/// `final_dataset.csv` row. Field order is the file's column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalRow {
    pub country: String,
    pub year: i32,
    pub ecommerce_sales_usd_millions: f64,
    pub internet_usage_percent: f64,
    pub conflict_deaths_total: i64,
    pub is_conflict_year: u8,
    pub is_global_crisis_year: u8,
}

/// `panel_dataset.csv` row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelDatasetRow {
    pub country_code: String,
    pub country_name: String,
    pub year: i32,
    pub region: String,
    pub income_group: String,
    pub dev_status: u8,
    pub ecom_share: f64,
    pub internet_users: f64,
    pub ecom_growth: Option<f64>,
}

/// `panel_dataset_with_crises.csv` row. Spelled out field by field because
/// the csv serializer rejects `#[serde(flatten)]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrisisPanelRow {
    pub country_code: String,
    pub country_name: String,
    pub year: i32,
    pub region: String,
    pub income_group: String,
    pub dev_status: u8,
    pub ecom_share: f64,
    pub internet_users: f64,
    pub ecom_growth: Option<f64>,
    pub crisis_2008_09: u8,
    pub crisis_2020_21: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TerminalRows {
    Crisis(Vec<FinalRow>),
    Panel(Vec<PanelDatasetRow>),
}

impl TerminalRows {
    pub fn len(&self) -> usize {
        match self {
            Self::Crisis(rows) => rows.len(),
            Self::Panel(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_keeps_absent_fields_absent() {
        let a = Metrics::only(Metric::Deaths, 3.0);
        let b = Metrics::only(Metric::Deaths, 4.0);
        let s = a.sum(&b);
        assert_eq!(s.deaths, Some(7.0));
        assert_eq!(s.internet_usage, None);
        assert_eq!(s.ecommerce_sales, None);
    }

    #[test]
    fn combine_prefers_left() {
        let a = Metrics {
            deaths: Some(1.0),
            ..Default::default()
        };
        let b = Metrics {
            deaths: Some(9.0),
            internet_usage: Some(50.0),
            ..Default::default()
        };
        let c = a.combine(&b);
        assert_eq!(c.deaths, Some(1.0));
        assert_eq!(c.internet_usage, Some(50.0));
    }

    #[test]
    fn classification_is_auxiliary() {
        assert_eq!(SourceKind::Classification.role(), SourceRole::Auxiliary);
        assert_eq!(SourceKind::Conflict.role(), SourceRole::Primary);
    }
}
