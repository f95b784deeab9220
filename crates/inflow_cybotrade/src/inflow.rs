use bon::Builder;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::method::Method;

pub const DEFAULT_EXCHANGE: &str = "okx";
pub const DEFAULT_WINDOW: &str = "hour";
pub const DEFAULT_START_DATE: &str = "2020-04-01";
pub const DEFAULT_END_DATE: &str = "2024-01-01";

/// Query parameters for the exchange-inflow endpoint. Timestamps are
/// epoch milliseconds, see [`date_to_epoch_ms`].
#[derive(Serialize, Deserialize, Debug, Builder)]
#[builder(on(String, into))]
pub struct InflowParams {
    pub exchange: String,
    pub window: String,
    pub start_time: i64,
    pub end_time: i64,
}

impl Default for InflowParams {
    fn default() -> Self {
        Self {
            exchange: DEFAULT_EXCHANGE.to_string(),
            window: DEFAULT_WINDOW.to_string(),
            start_time: 1_585_699_200_000, // 2020-04-01 UTC
            end_time: 1_704_067_200_000,   // 2024-01-01 UTC
        }
    }
}

pub struct ExchangeInflow;

impl Method for ExchangeInflow {
    const PATH: &'static str =
        "https://api.datasource.cybotrade.rs/cryptoquant/btc/exchange-flows/inflow";

    /* The datasource gives no schema guarantee: the body has been observed
     * as an object with a "data" list, a bare list, and a string with
     * embedded objects. Shape resolution happens downstream. */
    type Response = Value;
    type Params = InflowParams;
}

/// Midnight of `date` in UTC, as epoch milliseconds.
pub fn date_to_epoch_ms(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}
