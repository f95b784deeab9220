use anyhow::{Context, bail};
use chrono::NaiveDate;
use inflow_cybotrade::inflow::{
    DEFAULT_END_DATE, DEFAULT_EXCHANGE, DEFAULT_START_DATE, DEFAULT_WINDOW,
};
use std::io::{Write, stdin, stdout};
use std::path::PathBuf;

/// Everything a single report run needs, resolved once up front and passed
/// into each stage.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub api_key: String,
    pub exchange: String,
    pub window: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub output_dir: PathBuf,
}

impl ReportConfig {
    pub fn csv_path(&self) -> PathBuf {
        PathBuf::from(format!(
            "btc_{}_inflow_{}_to_{}.csv",
            self.exchange, self.start_date, self.end_date
        ))
    }

    pub fn analysis_path(&self) -> PathBuf {
        PathBuf::from(format!(
            "btc_{}_analysis_{}_to_{}.json",
            self.exchange, self.start_date, self.end_date
        ))
    }
}

/// CLI values take precedence, then the environment (`CYBOTRADE_API_KEY`),
/// then interactive prompts. With `non_interactive` the prompts are skipped
/// and the documented defaults apply.
pub struct ConfigInput {
    pub api_key: Option<String>,
    pub exchange: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub output_dir: String,
    pub non_interactive: bool,
}

pub fn resolve(input: ConfigInput) -> anyhow::Result<ReportConfig> {
    let api_key = match input.api_key {
        Some(key) => key,
        None => match std::env::var("CYBOTRADE_API_KEY") {
            Ok(key) => key,
            Err(_) if input.non_interactive => String::new(),
            Err(_) => prompt("Enter your CryptoQuant API key: ")?,
        },
    };
    if api_key.trim().is_empty() {
        bail!("An API key is required (flag, $CYBOTRADE_API_KEY or prompt)");
    }

    let exchange = resolve_value(input.exchange, "Enter exchange name", DEFAULT_EXCHANGE, input.non_interactive)?;
    let start_text = resolve_value(
        input.start_date,
        "Enter start date (YYYY-MM-DD)",
        DEFAULT_START_DATE,
        input.non_interactive,
    )?;
    let end_text = resolve_value(
        input.end_date,
        "Enter end date (YYYY-MM-DD)",
        DEFAULT_END_DATE,
        input.non_interactive,
    )?;

    let start_date = parse_date(&start_text)?;
    let end_date = parse_date(&end_text)?;
    if end_date < start_date {
        bail!("End date {end_date} is before start date {start_date}");
    }

    Ok(ReportConfig {
        api_key: api_key.trim().to_string(),
        exchange,
        window: DEFAULT_WINDOW.to_string(),
        start_date,
        end_date,
        output_dir: PathBuf::from(input.output_dir),
    })
}

pub fn parse_date(text: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{text}', expected YYYY-MM-DD"))
}

fn resolve_value(
    flag: Option<String>,
    label: &str,
    default: &str,
    non_interactive: bool,
) -> anyhow::Result<String> {
    if let Some(value) = flag {
        return Ok(value);
    }
    if non_interactive {
        return Ok(default.to_string());
    }

    let value = prompt(&format!("{label} (default: {default}): "))?;
    Ok(if value.is_empty() {
        default.to_string()
    } else {
        value
    })
}

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{label}");
    stdout().flush()?;

    let mut line = String::new();
    stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(api_key: &str) -> ConfigInput {
        ConfigInput {
            api_key: Some(api_key.to_string()),
            exchange: None,
            start_date: None,
            end_date: None,
            output_dir: "output".to_string(),
            non_interactive: true,
        }
    }

    #[test]
    fn defaults_apply_without_prompts() {
        let cfg = resolve(input("test-key")).expect("Failed to resolve config");

        assert_eq!(cfg.exchange, "okx");
        assert_eq!(cfg.window, "hour");
        assert_eq!(cfg.start_date.to_string(), "2020-04-01");
        assert_eq!(cfg.end_date.to_string(), "2024-01-01");
        assert_eq!(
            cfg.csv_path().to_str().unwrap(),
            "btc_okx_inflow_2020-04-01_to_2024-01-01.csv"
        );
        assert_eq!(
            cfg.analysis_path().to_str().unwrap(),
            "btc_okx_analysis_2020-04-01_to_2024-01-01.json"
        );
    }

    #[test]
    fn blank_api_key_is_rejected() {
        assert!(resolve(input("   ")).is_err());
    }

    #[test]
    fn reversed_date_range_is_rejected() {
        let mut bad = input("test-key");
        bad.start_date = Some("2024-01-01".to_string());
        bad.end_date = Some("2020-04-01".to_string());

        assert!(resolve(bad).is_err());
    }

    #[test]
    fn malformed_dates_are_fatal() {
        let mut bad = input("test-key");
        bad.start_date = Some("01-04-2020".to_string());

        assert!(resolve(bad).is_err());
        assert!(parse_date("not-a-date").is_err());
        assert!(parse_date("2021-01-01").is_ok());
    }
}
