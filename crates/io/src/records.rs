// Intermediate and final artifact CSVs.
//
// Column names here are the file contract; rows are written in the order
// given (the engine hands them over sorted by country, year).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crisis_panel_engine::model::{
    CountryAttributes, CountryYearRecord, CrisisPanelRow, FeaturedRow, FinalRow, Metric, Metrics,
    PanelDatasetRow, PanelRow,
};

// ---------------------------------------------------------------------------
// Row shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct ConflictCsvRow {
    country: String,
    year: i32,
    deaths_total: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct InternetCsvRow {
    country: String,
    year: i32,
    internet_usage_percent: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct EcommerceSalesCsvRow {
    country: String,
    year: i32,
    ecommerce_sales_usd_millions: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct EcommerceShareCsvRow {
    country: String,
    year: i32,
    ecom_share: f64,
}

#[derive(Debug, Serialize)]
struct ClassCsvRow<'a> {
    country_code: &'a str,
    country_name: &'a str,
    region: &'a str,
    income_group: &'a str,
    dev_status: u8,
}

#[derive(Debug, Serialize)]
struct CompiledCsvRow<'a> {
    country: &'a str,
    year: i32,
    deaths_total: Option<f64>,
    ecommerce_sales_usd_millions: Option<f64>,
    ecom_share: Option<f64>,
    internet_usage_percent: Option<f64>,
    country_code: Option<&'a str>,
    region: Option<&'a str>,
    income_group: Option<&'a str>,
    dev_status: Option<u8>,
}

impl<'a> CompiledCsvRow<'a> {
    fn from_row(r: &'a PanelRow) -> Self {
        let a = r.attributes.as_ref();
        Self {
            country: &r.country,
            year: r.year,
            deaths_total: r.metrics.deaths,
            ecommerce_sales_usd_millions: r.metrics.ecommerce_sales,
            ecom_share: r.metrics.ecommerce_share,
            internet_usage_percent: r.metrics.internet_usage,
            country_code: a.map(|a| a.country_code.as_str()),
            region: a.map(|a| a.region.as_str()),
            income_group: a.map(|a| a.income_group.as_str()),
            dev_status: a.map(|a| a.dev_status),
        }
    }
}

#[derive(Debug, Serialize)]
struct FeaturedCsvRow<'a> {
    country: &'a str,
    year: i32,
    deaths_total: Option<f64>,
    ecommerce_sales_usd_millions: Option<f64>,
    ecom_share: Option<f64>,
    internet_usage_percent: Option<f64>,
    country_code: Option<&'a str>,
    region: Option<&'a str>,
    income_group: Option<&'a str>,
    dev_status: Option<u8>,
    is_conflict: u8,
    major_crisis_flag: u8,
    ecommerce_growth: Option<f64>,
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

fn write_rows<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<usize, String> {
    let mut writer = ::csv::Writer::from_path(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let mut n = 0;
    for row in rows {
        writer.serialize(row).map_err(|e| e.to_string())?;
        n += 1;
    }
    writer.flush().map_err(|e| e.to_string())?;
    Ok(n)
}

/// Write one metric of `records` as its intermediate file. Records without
/// that metric are skipped.
pub fn write_metric_records(
    path: &Path,
    records: &[CountryYearRecord],
    metric: Metric,
) -> Result<usize, String> {
    let present = records
        .iter()
        .filter_map(|r| r.metrics.get(metric).map(|v| (r, v)));
    match metric {
        Metric::Deaths => write_rows(
            path,
            present.map(|(r, v)| ConflictCsvRow {
                country: r.country.clone(),
                year: r.year,
                deaths_total: v.round() as i64,
            }),
        ),
        Metric::InternetUsage => write_rows(
            path,
            present.map(|(r, v)| InternetCsvRow {
                country: r.country.clone(),
                year: r.year,
                internet_usage_percent: v,
            }),
        ),
        Metric::EcommerceSales => write_rows(
            path,
            present.map(|(r, v)| EcommerceSalesCsvRow {
                country: r.country.clone(),
                year: r.year,
                ecommerce_sales_usd_millions: v,
            }),
        ),
        Metric::EcommerceShare => write_rows(
            path,
            present.map(|(r, v)| EcommerceShareCsvRow {
                country: r.country.clone(),
                year: r.year,
                ecom_share: v,
            }),
        ),
    }
}

pub fn write_class(path: &Path, attributes: &[CountryAttributes]) -> Result<usize, String> {
    write_rows(
        path,
        attributes.iter().map(|a| ClassCsvRow {
            country_code: &a.country_code,
            country_name: &a.country,
            region: &a.region,
            income_group: &a.income_group,
            dev_status: a.dev_status,
        }),
    )
}

pub fn write_compiled(path: &Path, rows: &[PanelRow]) -> Result<usize, String> {
    write_rows(path, rows.iter().map(CompiledCsvRow::from_row))
}

pub fn write_featured(path: &Path, rows: &[FeaturedRow]) -> Result<usize, String> {
    write_rows(
        path,
        rows.iter().map(|f| {
            let c = CompiledCsvRow::from_row(&f.row);
            FeaturedCsvRow {
                country: c.country,
                year: c.year,
                deaths_total: c.deaths_total,
                ecommerce_sales_usd_millions: c.ecommerce_sales_usd_millions,
                ecom_share: c.ecom_share,
                internet_usage_percent: c.internet_usage_percent,
                country_code: c.country_code,
                region: c.region,
                income_group: c.income_group,
                dev_status: c.dev_status,
                is_conflict: u8::from(f.is_conflict),
                major_crisis_flag: u8::from(f.major_crisis),
                ecommerce_growth: f.growth,
            }
        }),
    )
}

pub fn write_final(path: &Path, rows: &[FinalRow]) -> Result<usize, String> {
    write_rows(path, rows)
}

pub fn write_panel(path: &Path, rows: &[PanelDatasetRow]) -> Result<usize, String> {
    write_rows(path, rows)
}

pub fn write_crisis_panel(path: &Path, rows: &[CrisisPanelRow]) -> Result<usize, String> {
    write_rows(path, rows)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    std::fs::write(path, json + "\n").map_err(|e| format!("{}: {e}", path.display()))
}

// ---------------------------------------------------------------------------
// Readers
// ---------------------------------------------------------------------------

/// Read an intermediate metric file back into records.
pub fn read_metric_records(path: &Path, metric: Metric) -> Result<Vec<CountryYearRecord>, String> {
    let mut reader = ::csv::Reader::from_path(path).map_err(|e| format!("{}: {e}", path.display()))?;

    fn collect<T: for<'de> Deserialize<'de>>(
        reader: &mut ::csv::Reader<std::fs::File>,
        to_record: impl Fn(T) -> CountryYearRecord,
    ) -> Result<Vec<CountryYearRecord>, String> {
        reader
            .deserialize::<T>()
            .map(|r| r.map(&to_record).map_err(|e| e.to_string()))
            .collect()
    }

    match metric {
        Metric::Deaths => collect(&mut reader, |r: ConflictCsvRow| {
            CountryYearRecord::new(r.country, r.year, Metrics::only(metric, r.deaths_total as f64))
        }),
        Metric::InternetUsage => collect(&mut reader, |r: InternetCsvRow| {
            CountryYearRecord::new(r.country, r.year, Metrics::only(metric, r.internet_usage_percent))
        }),
        Metric::EcommerceSales => collect(&mut reader, |r: EcommerceSalesCsvRow| {
            CountryYearRecord::new(
                r.country,
                r.year,
                Metrics::only(metric, r.ecommerce_sales_usd_millions),
            )
        }),
        Metric::EcommerceShare => collect(&mut reader, |r: EcommerceShareCsvRow| {
            CountryYearRecord::new(r.country, r.year, Metrics::only(metric, r.ecom_share))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn rec(country: &str, year: i32, metric: Metric, v: f64) -> CountryYearRecord {
        CountryYearRecord::new(country, year, Metrics::only(metric, v))
    }

    #[test]
    fn metric_files_round_trip() {
        let dir = tempdir().unwrap();
        for (metric, v) in [
            (Metric::Deaths, 12.0),
            (Metric::InternetUsage, 45.25),
            (Metric::EcommerceSales, 1234.5),
            (Metric::EcommerceShare, 3.75),
        ] {
            let path = dir.path().join("m.csv");
            let records = vec![rec("Côte d'Ivoire", 2019, metric, v), rec("Korea, Rep.", 2020, metric, v)];
            assert_eq!(write_metric_records(&path, &records, metric).unwrap(), 2);
            assert_eq!(read_metric_records(&path, metric).unwrap(), records);
        }
    }

    #[test]
    fn conflict_header_and_integer_deaths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conflicts.csv");
        write_metric_records(&path, &[rec("Chad", 2020, Metric::Deaths, 7.0)], Metric::Deaths)
            .unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "country,year,deaths_total\nChad,2020,7\n");
    }

    #[test]
    fn metric_absent_rows_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("internet_usage.csv");
        let records = vec![
            rec("Chad", 2020, Metric::Deaths, 1.0),
            rec("Mali", 2020, Metric::InternetUsage, 5.0),
        ];
        assert_eq!(write_metric_records(&path, &records, Metric::InternetUsage).unwrap(), 1);
    }

    #[test]
    fn compiled_missing_cells_are_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("compiled_data.csv");
        let row = PanelRow::from(rec("Chad", 2020, Metric::Deaths, 3.0));
        write_compiled(&path, &[row]).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "country,year,deaths_total,ecommerce_sales_usd_millions,ecom_share,internet_usage_percent,country_code,region,income_group,dev_status"
        );
        assert_eq!(lines.next().unwrap(), "Chad,2020,3.0,,,,,,,");
    }

    #[test]
    fn final_dataset_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("final_dataset.csv");
        write_final(
            &path,
            &[FinalRow {
                country: "Kenya".into(),
                year: 2020,
                ecommerce_sales_usd_millions: 12.0,
                internet_usage_percent: 25.0,
                conflict_deaths_total: 3,
                is_conflict_year: 1,
                is_global_crisis_year: 1,
            }],
        )
        .unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(
            "country,year,ecommerce_sales_usd_millions,internet_usage_percent,conflict_deaths_total,is_conflict_year,is_global_crisis_year\n"
        ));
        assert!(content.contains("Kenya,2020,12.0,25.0,3,1,1"));
    }
}
