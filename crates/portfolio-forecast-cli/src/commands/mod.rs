pub mod forecast;
pub mod plans;
pub mod simulate;
pub mod stats;

use clap::Args;
use tracing::{info, warn};

use portfolio_forecast_core::config::ForecastConfig;
use portfolio_forecast_core::forecast::ForecastRequest;
use portfolio_forecast_core::history::{align_histories, clean_prices, parse_rows};
use portfolio_forecast_core::ReturnFrequency;

use crate::input;

/// Where asset histories come from, shared by every data-driven command
#[derive(Args)]
pub struct HistoryArgs {
    /// Path to JSON file with {frequency, assets: [{id, returns}]}
    #[arg(long, conflicts_with = "prices")]
    pub input: Option<String>,

    /// Path to a daily price CSV (Date, Close, Adj_Close, Ticker, ...)
    #[arg(long)]
    pub prices: Option<String>,

    /// Sampling frequency: daily, weekly, monthly, quarterly, annual
    #[arg(long)]
    pub frequency: Option<ReturnFrequency>,

    /// Path to a JSON or YAML forecast config
    #[arg(long)]
    pub config: Option<String>,
}

impl HistoryArgs {
    /// Build a request from `--prices`, `--input`, or piped JSON, in that order.
    pub fn load_request(&self) -> Result<ForecastRequest, Box<dyn std::error::Error>> {
        if let Some(ref path) = self.prices {
            let frequency = self.frequency.unwrap_or_default();
            let rows = input::file::read_price_csv(path)?;
            let (observations, dropped) = parse_rows(rows);
            if dropped > 0 {
                warn!(dropped, "skipped unparseable price rows");
            }
            let series = clean_prices(observations);
            let assets = align_histories(&series, frequency)?;
            info!(
                tickers = assets.len(),
                periods = assets.first().map(|a| a.returns.len()).unwrap_or(0),
                "loaded price history"
            );
            return Ok(ForecastRequest {
                assets,
                frequency,
                initial_amount: None,
            });
        }

        let mut request: ForecastRequest = if let Some(ref path) = self.input {
            input::file::read_json(path)?
        } else if let Some(request) = input::stdin::read_stdin()? {
            request
        } else {
            return Err("--input <file.json>, --prices <file.csv> or stdin required".into());
        };
        if let Some(frequency) = self.frequency {
            request.frequency = frequency;
        }
        Ok(request)
    }

    pub fn load_config(&self) -> Result<ForecastConfig, Box<dyn std::error::Error>> {
        match self.config {
            Some(ref path) => input::file::read_config(path),
            None => Ok(ForecastConfig::default()),
        }
    }
}
