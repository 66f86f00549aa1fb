use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Dataset not found: {path}")]
    DatasetUnavailable { path: String },

    #[error("Could not detect date, product and quantity columns. Columns found: {available:?}")]
    SchemaResolution { available: Vec<String> },

    #[error("Invalid value {value:?} in column {column} at row {row}")]
    DataFormat {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Unreadable sales quantity for {product} on {dates:?}")]
    MissingQuantity {
        product: String,
        dates: Vec<chrono::NaiveDate>,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Connection failure: {0}")]
    ConnectionFailure(#[from] reqwest::Error),

    #[error("Forecasting service error ({status}): {body}")]
    ServiceError { status: u16, body: String },

    #[error("Forecasting service returned an unreadable body: {body}")]
    MalformedResponse { body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Errors raised while loading the dataset. Once one of these occurs the
    /// session has no prediction capability.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            AppError::DatasetUnavailable { .. }
                | AppError::SchemaResolution { .. }
                | AppError::DataFormat { .. }
                | AppError::Csv(_)
                | AppError::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_errors_are_session_fatal() {
        let e = AppError::DatasetUnavailable { path: "x.csv".to_string() };
        assert!(e.is_session_fatal());
        let e = AppError::SchemaResolution { available: vec!["A".to_string()] };
        assert!(e.is_session_fatal());
        let e = AppError::DataFormat {
            row: 2,
            column: "FECHA".to_string(),
            value: "ayer".to_string(),
        };
        assert!(e.is_session_fatal());
    }

    #[test]
    fn prediction_errors_are_recoverable() {
        let e = AppError::ServiceError { status: 500, body: "boom".to_string() };
        assert!(!e.is_session_fatal());
        let e = AppError::MalformedResponse { body: "<html>".to_string() };
        assert!(!e.is_session_fatal());
        let e = AppError::MissingQuantity {
            product: "CHURRO".to_string(),
            dates: vec![chrono::NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()],
        };
        assert!(!e.is_session_fatal());
        assert!(e.to_string().contains("2024-01-03"), "{e}");
    }

    #[test]
    fn schema_error_names_columns() {
        let e = AppError::SchemaResolution {
            available: vec!["FECHA".to_string(), "TIENDA".to_string()],
        };
        let msg = e.to_string();
        assert!(msg.contains("FECHA"), "{msg}");
        assert!(msg.contains("TIENDA"), "{msg}");
    }
}
