use anyhow::Context;
use clap::Parser;
use dotenv::dotenv;
use inflow_cybotrade::CybotradeClient;
use inflow_cybotrade::inflow::{ExchangeInflow, InflowParams, date_to_epoch_ms};
use inflow_frame::analyze::{AnalysisOutcome, AnalysisReport, analyze};
use inflow_frame::normalize::normalize;
use polars::prelude::*;
use std::fs::File;

mod config;
use config::{ConfigInput, ReportConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CryptoQuant API key (falls back to $CYBOTRADE_API_KEY, then a prompt)
    #[arg(long)]
    api_key: Option<String>,

    /// Exchange to report on (e.g. okx, binance)
    #[arg(long)]
    exchange: Option<String>,

    /// Start date, YYYY-MM-DD
    #[arg(long)]
    start_date: Option<String>,

    /// End date, YYYY-MM-DD
    #[arg(long)]
    end_date: Option<String>,

    /// Directory for chart images
    #[arg(long, default_value = "output")]
    output_dir: String,

    /// Skip prompts and take the documented defaults
    #[arg(long)]
    non_interactive: bool,
}

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args = Args::parse();
    let cfg = config::resolve(ConfigInput {
        api_key: args.api_key,
        exchange: args.exchange,
        start_date: args.start_date,
        end_date: args.end_date,
        output_dir: args.output_dir,
        non_interactive: args.non_interactive,
    })?;

    let rt = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
    rt.block_on(run(cfg))
}

async fn run(cfg: ReportConfig) -> anyhow::Result<()> {
    println!(
        "Fetching data for {} from {} to {}...",
        cfg.exchange, cfg.start_date, cfg.end_date
    );

    let client = CybotradeClient::new(&cfg.api_key);
    let params = InflowParams::builder()
        .exchange(cfg.exchange.clone())
        .window(cfg.window.clone())
        .start_time(date_to_epoch_ms(cfg.start_date))
        .end_time(date_to_epoch_ms(cfg.end_date))
        .build();

    // A failed request is not fatal: the pipeline degrades to its empty
    // "no data" branch.
    let raw = match client.call::<ExchangeInflow>(params).await {
        Ok(body) => {
            println!("Successfully received a response");
            Some(body)
        }
        Err(e) => {
            eprintln!("Request failed: {e}");
            None
        }
    };

    let mut df = normalize(raw)?;
    if df.height() == 0 {
        println!("No data to analyze.");
        return Ok(());
    }
    println!(
        "Created table with {} rows and {} columns",
        df.height(),
        df.width()
    );

    let csv_path = cfg.csv_path();
    let file = File::create(&csv_path)
        .with_context(|| format!("Failed to create {}", csv_path.display()))?;
    CsvWriter::new(file).include_header(true).finish(&mut df)?;
    println!("Data saved to {}", csv_path.display());

    let analysis = analyze(&df)?;
    let analysis_path = cfg.analysis_path();
    std::fs::write(&analysis_path, serde_json::to_string_pretty(&analysis)?)
        .with_context(|| format!("Failed to write {}", analysis_path.display()))?;
    println!("Analysis saved to {}", analysis_path.display());

    match inflow_charts::render_all(&df, &cfg.output_dir) {
        Ok(written) if !written.is_empty() => {
            println!("Visualizations saved to {}", cfg.output_dir.display());
        }
        Ok(_) => {}
        Err(e) => eprintln!("Failed to render charts: {e}"),
    }

    if let AnalysisOutcome::Report(report) = &analysis {
        print_summary(report);
    }

    Ok(())
}

fn print_summary(report: &AnalysisReport) {
    println!("\n===== Summary =====");
    println!("Total records: {}", report.total_records);
    println!(
        "Date range: {} to {}",
        report.date_range.start, report.date_range.end
    );

    if let Some(stats) = report.summary_stats.get("inflow_total") {
        println!("\nTotal Inflow Statistics:");
        println!("  Mean: {:.2} BTC", stats.mean);
        println!("  Min: {:.2} BTC", stats.min);
        println!("  Max: {:.2} BTC", stats.max);
        println!("  25%: {:.2} BTC", stats.p25);
        println!("  50%: {:.2} BTC", stats.p50);
        println!("  75%: {:.2} BTC", stats.p75);
    }

    if let Some(events) = &report.top_inflow_events {
        println!("\nTop 5 Inflow Events:");
        for (i, event) in events.iter().enumerate() {
            println!("  {}. {}: {:.2} BTC", i + 1, event.datetime, event.inflow_total);
        }
    }
}
