use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use polars::prelude::*;
use serde::Serialize;

use crate::normalize::{DATETIME_FORMAT, METRIC_COLUMNS};

pub const NO_DATA_ERROR: &str = "No data available for analysis";

const TOP_EVENT_LIMIT: usize = 5;

/// An empty table is reported as a descriptive error object instead of
/// statistics, so the JSON artifact always says something useful.
#[derive(Serialize, Debug, Clone)]
#[serde(untagged)]
pub enum AnalysisOutcome {
    Report(AnalysisReport),
    NoData { error: String },
}

#[derive(Serialize, Debug, Clone)]
pub struct AnalysisReport {
    pub total_records: usize,
    pub date_range: DateRange,
    pub summary_stats: BTreeMap<String, SummaryStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_inflow_events: Option<Vec<TopEvent>>,
}

#[derive(Serialize, Debug, Clone)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

/// Per-metric descriptive statistics. Quantiles use linear interpolation
/// and the standard deviation is the sample one (ddof = 1), null when
/// there are not enough observations.
#[derive(Serialize, Debug, Clone)]
pub struct SummaryStats {
    pub count: f64,
    pub mean: f64,
    pub std: Option<f64>,
    pub min: f64,
    #[serde(rename = "25%")]
    pub p25: f64,
    #[serde(rename = "50%")]
    pub p50: f64,
    #[serde(rename = "75%")]
    pub p75: f64,
    pub max: f64,
}

#[derive(Serialize, Debug, Clone)]
pub struct TopEvent {
    pub datetime: String,
    pub inflow_total: f64,
}

pub fn analyze(df: &DataFrame) -> PolarsResult<AnalysisOutcome> {
    if df.height() == 0 {
        return Ok(AnalysisOutcome::NoData {
            error: NO_DATA_ERROR.to_string(),
        });
    }

    let datetimes = datetime_strings(df)?;
    let date_range = date_range(&datetimes);

    let mut summary_stats = BTreeMap::new();
    for name in METRIC_COLUMNS {
        let Ok(column) = df.column(name) else {
            continue;
        };
        if let Some(stats) = describe(column.f64()?)? {
            summary_stats.insert(name.to_string(), stats);
        }
    }

    let top_inflow_events = match df.column("inflow_total") {
        Ok(column) => Some(top_events(column.f64()?, &datetimes)),
        Err(_) => None,
    };

    Ok(AnalysisOutcome::Report(AnalysisReport {
        total_records: df.height(),
        date_range,
        summary_stats,
        top_inflow_events,
    }))
}

fn datetime_strings(df: &DataFrame) -> PolarsResult<Vec<Option<String>>> {
    let column = df.column("datetime")?;

    Ok(column
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

/// Min/max over parsed datetimes, not over the raw strings.
fn date_range(datetimes: &[Option<String>]) -> DateRange {
    let parsed: Vec<NaiveDateTime> = datetimes
        .iter()
        .flatten()
        .filter_map(|text| NaiveDateTime::parse_from_str(text, DATETIME_FORMAT).ok())
        .collect();

    match (parsed.iter().min(), parsed.iter().max()) {
        (Some(start), Some(end)) => DateRange {
            start: start.format(DATETIME_FORMAT).to_string(),
            end: end.format(DATETIME_FORMAT).to_string(),
        },
        _ => {
            // unparseable datetimes, fall back to text ordering
            let present: Vec<&String> = datetimes.iter().flatten().collect();
            DateRange {
                start: present.iter().min().map_or_else(String::new, |s| (*s).clone()),
                end: present.iter().max().map_or_else(String::new, |s| (*s).clone()),
            }
        }
    }
}

fn describe(values: &Float64Chunked) -> PolarsResult<Option<SummaryStats>> {
    let count = (values.len() - values.null_count()) as f64;
    if count == 0.0 {
        return Ok(None);
    }

    let quantile = |q: f64| -> PolarsResult<f64> {
        Ok(values
            .quantile(q, QuantileMethod::Linear)?
            .unwrap_or(f64::NAN))
    };

    Ok(Some(SummaryStats {
        count,
        mean: values.mean().unwrap_or(f64::NAN),
        std: values.std(1),
        min: values.min().unwrap_or(f64::NAN),
        p25: quantile(0.25)?,
        p50: quantile(0.5)?,
        p75: quantile(0.75)?,
        max: values.max().unwrap_or(f64::NAN),
    }))
}

fn top_events(values: &Float64Chunked, datetimes: &[Option<String>]) -> Vec<TopEvent> {
    let mut ranked: Vec<(usize, f64)> = values
        .into_iter()
        .enumerate()
        .filter_map(|(idx, value)| value.map(|v| (idx, v)))
        .collect();

    // stable sort keeps the original row order between equal totals
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(TOP_EVENT_LIMIT);

    ranked
        .into_iter()
        .map(|(idx, inflow_total)| TopEvent {
            datetime: datetimes
                .get(idx)
                .cloned()
                .flatten()
                .unwrap_or_default(),
            inflow_total,
        })
        .collect()
}
