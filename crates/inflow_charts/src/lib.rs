use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime};
use plotters::prelude::*;
use polars::prelude::*;
use thiserror::Error;

const CHART_SIZE: (u32, u32) = (1200, 600);
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Dataframe error: {0}")]
    Polars(#[from] PolarsError),
    #[error("Failed to prepare output directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to render chart: {0}")]
    Render(String),
    #[error("No datetime or start_time column to plot against")]
    MissingTimeAxis,
}

fn render_err<E: fmt::Display>(err: E) -> ChartError {
    ChartError::Render(err.to_string())
}

/// Which charts a table supports. Everything is keyed off inflow_total:
/// without it no chart is produced, whatever else is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    TotalInflow,
    SevenDayMovingAverage,
    MeanVsTop10,
}

impl ChartKind {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::TotalInflow => "total_inflow_over_time.png",
            Self::SevenDayMovingAverage => "inflow_7day_ma.png",
            Self::MeanVsTop10 => "mean_vs_top10_inflow.png",
        }
    }
}

pub fn plan(df: &DataFrame) -> Vec<ChartKind> {
    let has = |name: &str| df.column(name).is_ok();

    if df.height() == 0 || !has("inflow_total") {
        return Vec::new();
    }

    let mut kinds = vec![ChartKind::TotalInflow];
    if has("inflow_mean_ma7") {
        kinds.push(ChartKind::SevenDayMovingAverage);
    }
    if has("inflow_mean") && has("inflow_top10") {
        kinds.push(ChartKind::MeanVsTop10);
    }

    kinds
}

/// Render every supported chart into `output_dir`, creating it if absent.
/// Returns the written file paths; an empty table writes nothing.
pub fn render_all(df: &DataFrame, output_dir: &Path) -> Result<Vec<PathBuf>, ChartError> {
    let kinds = plan(df);
    if kinds.is_empty() {
        println!("No data available for visualization");
        return Ok(Vec::new());
    }

    fs::create_dir_all(output_dir)?;
    let times = time_axis(df)?;

    let mut written = Vec::new();
    for kind in kinds {
        let path = output_dir.join(kind.file_name());
        match kind {
            ChartKind::TotalInflow => draw_line(
                &path,
                "Bitcoin Total Inflow Over Time",
                "Total Inflow (BTC)",
                &metric_series(df, "inflow_total", &times)?,
            )?,
            ChartKind::SevenDayMovingAverage => draw_line(
                &path,
                "Bitcoin Inflow 7-Day Moving Average",
                "7-Day MA Inflow (BTC)",
                &metric_series(df, "inflow_mean_ma7", &times)?,
            )?,
            ChartKind::MeanVsTop10 => draw_overlay(
                &path,
                "Mean vs Top 10 Inflow Comparison",
                "Inflow (BTC)",
                &[
                    ("Mean Inflow", metric_series(df, "inflow_mean", &times)?),
                    ("Top 10 Inflow", metric_series(df, "inflow_top10", &times)?),
                ],
            )?,
        }
        written.push(path);
    }

    Ok(written)
}

/// Time values for the x axis, from the typed start_time column when it
/// exists, otherwise parsed out of the datetime strings.
fn time_axis(df: &DataFrame) -> Result<Vec<Option<NaiveDateTime>>, ChartError> {
    if let Ok(column) = df.column("start_time") {
        let ms = column.cast(&DataType::Int64)?;
        return Ok(ms
            .i64()?
            .into_iter()
            .map(|value| {
                value
                    .and_then(DateTime::from_timestamp_millis)
                    .map(|dt| dt.naive_utc())
            })
            .collect());
    }

    let column = df
        .column("datetime")
        .map_err(|_| ChartError::MissingTimeAxis)?;

    Ok(column
        .str()?
        .into_iter()
        .map(|value| {
            value.and_then(|text| NaiveDateTime::parse_from_str(text, DATETIME_FORMAT).ok())
        })
        .collect())
}

fn metric_series(
    df: &DataFrame,
    name: &str,
    times: &[Option<NaiveDateTime>],
) -> Result<Vec<(NaiveDateTime, f64)>, ChartError> {
    let values = df.column(name)?.f64()?;

    Ok(values
        .into_iter()
        .zip(times)
        .filter_map(|(value, time)| match (time, value) {
            (Some(time), Some(value)) => Some((*time, value)),
            _ => None,
        })
        .collect())
}

fn bounds(series: &[&[(NaiveDateTime, f64)]]) -> Option<(std::ops::Range<NaiveDateTime>, std::ops::Range<f64>)> {
    let points = series.iter().flat_map(|s| s.iter());

    let mut x_min = None::<NaiveDateTime>;
    let mut x_max = None::<NaiveDateTime>;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;

    for (time, value) in points {
        x_min = Some(x_min.map_or(*time, |m| m.min(*time)));
        x_max = Some(x_max.map_or(*time, |m| m.max(*time)));
        y_min = y_min.min(*value);
        y_max = y_max.max(*value);
    }

    let (x_min, mut x_max) = (x_min?, x_max?);
    if x_min == x_max {
        x_max += chrono::Duration::seconds(1);
    }
    if y_min == y_max {
        y_min -= 1.0;
        y_max += 1.0;
    }
    let pad = (y_max - y_min) * 0.05;

    Some((x_min..x_max, (y_min - pad)..(y_max + pad)))
}

fn draw_line(
    path: &Path,
    title: &str,
    y_desc: &str,
    series: &[(NaiveDateTime, f64)],
) -> Result<(), ChartError> {
    let Some((x_range, y_range)) = bounds(&[series]) else {
        println!("Skipping '{title}': no plottable points");
        return Ok(());
    };

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(12)
        .x_label_area_size(42)
        .y_label_area_size(70)
        .build_cartesian_2d(RangedDateTime::from(x_range), y_range)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .y_desc(y_desc)
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(LineSeries::new(series.iter().copied(), &BLUE))
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    Ok(())
}

fn draw_overlay(
    path: &Path,
    title: &str,
    y_desc: &str,
    series: &[(&str, Vec<(NaiveDateTime, f64)>)],
) -> Result<(), ChartError> {
    let all: Vec<&[(NaiveDateTime, f64)]> = series.iter().map(|(_, s)| s.as_slice()).collect();
    let Some((x_range, y_range)) = bounds(&all) else {
        println!("Skipping '{title}': no plottable points");
        return Ok(());
    };

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(12)
        .x_label_area_size(42)
        .y_label_area_size(70)
        .build_cartesian_2d(RangedDateTime::from(x_range), y_range)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .y_desc(y_desc)
        .draw()
        .map_err(render_err)?;

    let palette = [&BLUE, &RED];
    for ((label, points), color) in series.iter().zip(palette) {
        chart
            .draw_series(LineSeries::new(points.iter().copied(), color))
            .map_err(render_err)?
            .label(*label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK)
        .draw()
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    Ok(())
}
