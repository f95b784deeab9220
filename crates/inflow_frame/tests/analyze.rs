use inflow_frame::analyze::{AnalysisOutcome, analyze};
use inflow_frame::normalize::normalize;
use polars::prelude::*;
use serde_json::{Value, json};

fn hourly_rows(totals: &[f64]) -> Value {
    let rows: Vec<Value> = totals
        .iter()
        .enumerate()
        .map(|(i, total)| {
            json!({
                "start_time": 1_609_459_200_000i64 + i as i64 * 3_600_000,
                "inflow_mean": total / 10.0,
                "inflow_mean_ma7": total / 7.0,
                "inflow_top10": total / 2.0,
                "inflow_total": total,
            })
        })
        .collect();

    json!({ "data": rows })
}

#[test]
fn empty_table_reports_a_single_error_key() {
    let outcome = analyze(&DataFrame::empty()).expect("Failed to analyze");

    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value, json!({"error": "No data available for analysis"}));
}

#[test]
fn summary_stats_cover_exactly_the_present_metrics() {
    let df = normalize(Some(hourly_rows(&[1.0, 2.0, 3.0]))).unwrap();
    let outcome = analyze(&df).expect("Failed to analyze");

    let AnalysisOutcome::Report(report) = outcome else {
        panic!("Expected a report for a non-empty table");
    };

    let keys: Vec<&str> = report.summary_stats.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        ["inflow_mean", "inflow_mean_ma7", "inflow_top10", "inflow_total"]
    );

    let body = json!({"data": [
        {"start_time": 1_609_459_200_000i64, "inflow_total": 2.0},
        {"start_time": 1_609_462_800_000i64, "inflow_total": 4.0},
    ]});
    let df = normalize(Some(body)).unwrap();
    let AnalysisOutcome::Report(report) = analyze(&df).unwrap() else {
        panic!("Expected a report");
    };

    let keys: Vec<&str> = report.summary_stats.keys().map(String::as_str).collect();
    assert_eq!(keys, ["inflow_total"]);
}

#[test]
fn descriptive_statistics_match_the_sample_definition() {
    let body = json!({"data": [
        {"start_time": 1_609_459_200_000i64, "inflow_total": 1.0},
        {"start_time": 1_609_462_800_000i64, "inflow_total": 2.0},
        {"start_time": 1_609_466_400_000i64, "inflow_total": 3.0},
        {"start_time": 1_609_470_000_000i64, "inflow_total": 4.0},
    ]});
    let df = normalize(Some(body)).unwrap();

    let AnalysisOutcome::Report(report) = analyze(&df).unwrap() else {
        panic!("Expected a report");
    };
    let stats = &report.summary_stats["inflow_total"];

    assert_eq!(stats.count, 4.0);
    assert_eq!(stats.mean, 2.5);
    assert_eq!(stats.min, 1.0);
    assert_eq!(stats.max, 4.0);
    // linear interpolation between the middle observations
    assert_eq!(stats.p25, 1.75);
    assert_eq!(stats.p50, 2.5);
    assert_eq!(stats.p75, 3.25);

    let std = stats.std.expect("Sample std is defined for 4 observations");
    assert!((std - 1.2909944487358056).abs() < 1e-12);
}

#[test]
fn top_events_are_capped_at_five_and_non_increasing() {
    let df = normalize(Some(hourly_rows(&[3.0, 9.0, 1.0, 7.0, 5.0, 8.0, 2.0]))).unwrap();

    let AnalysisOutcome::Report(report) = analyze(&df).unwrap() else {
        panic!("Expected a report");
    };
    let events = report.top_inflow_events.expect("inflow_total is present");

    assert_eq!(events.len(), 5);
    for pair in events.windows(2) {
        assert!(pair[1].inflow_total <= pair[0].inflow_total);
    }
    assert_eq!(events[0].inflow_total, 9.0);
    assert_eq!(events[0].datetime, "2021-01-01 01:00:00");
}

#[test]
fn equal_totals_keep_the_original_row_order() {
    let df = normalize(Some(hourly_rows(&[5.0, 5.0, 5.0]))).unwrap();

    let AnalysisOutcome::Report(report) = analyze(&df).unwrap() else {
        panic!("Expected a report");
    };
    let events = report.top_inflow_events.unwrap();

    let datetimes: Vec<&str> = events.iter().map(|e| e.datetime.as_str()).collect();
    assert_eq!(
        datetimes,
        [
            "2021-01-01 00:00:00",
            "2021-01-01 01:00:00",
            "2021-01-01 02:00:00",
        ]
    );
}

#[test]
fn date_range_spans_the_observed_datetimes() {
    let df = normalize(Some(hourly_rows(&[1.0, 2.0, 3.0]))).unwrap();

    let AnalysisOutcome::Report(report) = analyze(&df).unwrap() else {
        panic!("Expected a report");
    };

    assert_eq!(report.total_records, 3);
    assert_eq!(report.date_range.start, "2021-01-01 00:00:00");
    assert_eq!(report.date_range.end, "2021-01-01 02:00:00");
}

#[test]
fn report_omits_top_events_when_inflow_total_is_absent() {
    let body = json!({"data": [
        {"start_time": 1_609_459_200_000i64, "inflow_mean": 1.0},
    ]});
    let df = normalize(Some(body)).unwrap();

    let AnalysisOutcome::Report(report) = analyze(&df).unwrap() else {
        panic!("Expected a report");
    };

    assert!(report.top_inflow_events.is_none());
    let value = serde_json::to_value(&report).unwrap();
    assert!(value.get("top_inflow_events").is_none());
}
