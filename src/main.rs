use chrono::{Duration, Local, NaiveDate};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use bakery_forecast::config::Config;
use bakery_forecast::dashboard::format_units;
use bakery_forecast::dataset::{parse_date, Dataset};
use bakery_forecast::error::{AppError, Result};
use bakery_forecast::gateway::ForecastClient;
use bakery_forecast::pipeline::run_prediction;

const USAGE: &str = "usage: forecast <product> [YYYY-MM-DD]";

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        if e.is_session_fatal() {
            error!("Fatal error: {e}");
        } else {
            error!("Prediction failed: {e}");
        }
        std::process::exit(exit_code(&e));
    }
}

/// 2 when the session could not start (config, dataset), 1 when only the
/// prediction failed.
fn exit_code(e: &AppError) -> i32 {
    if e.is_session_fatal() {
        2
    } else {
        1
    }
}

async fn run(cfg: Config) -> Result<()> {
    let mut args = std::env::args().skip(1);
    let product = args.next().ok_or_else(|| AppError::Config(USAGE.to_string()))?;
    let target_date = match args.next() {
        Some(raw) => parse_target_date(&raw)?,
        None => Local::now().date_naive() + Duration::days(1),
    };

    let dataset = Dataset::load(&cfg.dataset_path)?;
    let client = ForecastClient::new(cfg.api_url.as_str());

    let run = run_prediction(&dataset, &client, &product, target_date).await;
    if let Some(w) = run.build.warning {
        warn!("{w}");
    }
    let result = run.result?;

    info!(
        product = %product,
        target_date = %target_date,
        history_len = run.build.window.actual_count,
        "Suggested production for {target_date}: {}",
        format_units(result.predicted_value()),
    );
    println!("{}", serde_json::to_string_pretty(&result.raw_response)?);
    Ok(())
}

fn parse_target_date(raw: &str) -> Result<NaiveDate> {
    parse_date(raw).ok_or_else(|| AppError::Config(format!("invalid date {raw:?}. {USAGE}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_failures_exit_differently_from_prediction_failures() {
        let e = AppError::DatasetUnavailable { path: "ventas.csv".to_string() };
        assert_eq!(exit_code(&e), 2);
        assert_eq!(exit_code(&AppError::Config(USAGE.to_string())), 2);
        let e = AppError::ServiceError { status: 503, body: String::new() };
        assert_eq!(exit_code(&e), 1);
        let e = AppError::MissingQuantity { product: "PAN".to_string(), dates: Vec::new() };
        assert_eq!(exit_code(&e), 1);
    }

    #[test]
    fn bad_target_date_is_a_config_error() {
        let err = parse_target_date("mañana").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert_eq!(exit_code(&err), 2);
    }
}
