use crate::error::{AppError, Result};

pub const FORECAST_API_URL: &str =
    "https://panaderia-api-service-81011197894.us-central1.run.app/predict";

/// Historical sales CSV, expected next to the binary.
pub const DATASET_PATH: &str = "ventas_reales_poblacion_final.csv";

/// The dashboard owns stdout, so its logs go here.
pub const LOG_FILE: &str = "dashboard.log";

/// Number of days of history sent to the forecasting service.
pub const HISTORY_WINDOW_LEN: usize = 14;

/// Number of days of history drawn on the chart.
pub const CHART_WINDOW_LEN: usize = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub dataset_path: String,
    pub log_level: String,
    pub log_file: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let api_url =
            std::env::var("FORECAST_API_URL").unwrap_or_else(|_| FORECAST_API_URL.to_string());
        validate_url(&api_url)?;

        Ok(Self {
            api_url,
            dataset_path: std::env::var("DATASET_PATH")
                .unwrap_or_else(|_| DATASET_PATH.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_file: std::env::var("LOG_FILE").unwrap_or_else(|_| LOG_FILE.to_string()),
        })
    }
}

/// Endpoint URLs must be absolute http(s) URLs; anything else fails at
/// request time with a much less helpful message.
pub fn validate_url(url: &str) -> Result<()> {
    let trimmed = url.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "endpoint must start with http:// or https://, got {trimmed:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!(validate_url("http://localhost:8080/predict").is_ok());
        assert!(validate_url("  https://example.com/predict ").is_ok());
    }

    #[test]
    fn rejects_bare_host() {
        let err = validate_url("localhost:8080").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
