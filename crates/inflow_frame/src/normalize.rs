use chrono::DateTime;
use polars::prelude::*;
use serde_json::Value;

use crate::payload::InflowPayload;

/// Metric columns the feed may supply, in output order.
pub const METRIC_COLUMNS: [&str; 4] = [
    "inflow_mean",
    "inflow_mean_ma7",
    "inflow_top10",
    "inflow_total",
];

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Turn the raw fetch result into a typed table. A failed fetch (`None`)
/// or an empty row source yields a zero-row frame; columns missing from
/// every row are omitted rather than null-filled.
pub fn normalize(raw: Option<Value>) -> PolarsResult<DataFrame> {
    let rows = match raw.and_then(InflowPayload::classify) {
        Some(payload) => payload.into_rows(),
        None => {
            println!("No data to parse");
            Vec::new()
        }
    };

    if rows.is_empty() {
        return Ok(DataFrame::empty());
    }

    frame_from_rows(&rows)
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn format_utc(ms: i64) -> Option<String> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.format(DATETIME_FORMAT).to_string())
}

/// Column order: datetime, start_time, then whichever metric columns the
/// rows actually carry.
fn frame_from_rows(rows: &[Value]) -> PolarsResult<DataFrame> {
    let has = |key: &str| rows.iter().any(|row| row.get(key).is_some());

    let start_times: Option<Vec<Option<i64>>> = has("start_time").then(|| {
        rows.iter()
            .map(|row| row.get("start_time").and_then(Value::as_i64))
            .collect()
    });

    let mut columns: Vec<Column> = Vec::new();

    if has("datetime") {
        let datetimes: Vec<Option<String>> = rows
            .iter()
            .map(|row| row.get("datetime").and_then(Value::as_str).map(str::to_string))
            .collect();
        columns.push(Column::new("datetime".into(), datetimes));
    } else if let Some(ts) = &start_times {
        let datetimes: Vec<Option<String>> =
            ts.iter().map(|ms| ms.and_then(format_utc)).collect();
        columns.push(Column::new("datetime".into(), datetimes));
    }

    if let Some(ts) = start_times {
        let start_time = Column::new("start_time".into(), ts)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
        columns.push(start_time);
    }

    for name in METRIC_COLUMNS {
        if has(name) {
            let values: Vec<Option<f64>> = rows
                .iter()
                .map(|row| row.get(name).and_then(Value::as_f64).map(round4))
                .collect();
            columns.push(Column::new(name.into(), values));
        }
    }

    DataFrame::new(columns)
}
