use reqwest::header::CONTENT_TYPE;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::types::{HistoryWindow, PredictedValue, PredictionRequest, PredictionResult};

/// Client for the remote forecasting service. One POST per prediction, no
/// retries.
#[derive(Debug, Clone)]
pub struct ForecastClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ForecastClient {
    /// Uses the transport's default timeouts.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into().trim().to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Refuses windows with unreadable quantities without contacting the
    /// service; the request would silently drop days otherwise.
    pub async fn predict(&self, window: &HistoryWindow) -> Result<PredictionResult> {
        if !window.missing.is_empty() {
            warn!(
                product = %window.product_id,
                missing = window.missing.len(),
                "window has unreadable quantities"
            );
            return Err(AppError::MissingQuantity {
                product: window.product_id.clone(),
                dates: window.missing.clone(),
            });
        }
        let payload = PredictionRequest::from(window);
        self.send(&payload).await
    }

    pub async fn send(&self, payload: &PredictionRequest) -> Result<PredictionResult> {
        debug!(
            endpoint = %self.endpoint,
            product = %payload.product_name,
            prediction_date = %payload.prediction_date,
            history_len = payload.sales_history.len(),
            "sending prediction request"
        );

        let resp = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .json(payload)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "forecasting service returned an error");
            return Err(AppError::ServiceError {
                status: status.as_u16(),
                body,
            });
        }

        let result = decode(&body)?;
        info!(
            product = %payload.product_name,
            prediction_date = %payload.prediction_date,
            predicted = ?result.predicted,
            "prediction received"
        );
        Ok(result)
    }
}

/// Decode a success body. The body must be a JSON object; the predicted value
/// is read from `prediction`, falling back to `prediction_d_plus_2`.
pub fn decode(body: &str) -> Result<PredictionResult> {
    let raw_response = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map,
        _ => {
            return Err(AppError::MalformedResponse {
                body: body.to_string(),
            })
        }
    };
    let predicted = extract_prediction(&raw_response);
    if predicted == PredictedValue::Missing {
        warn!("response has no numeric prediction field");
    }
    Ok(PredictionResult {
        predicted,
        raw_response,
    })
}

/// A field counts as present only when it holds a number.
fn extract_prediction(map: &Map<String, Value>) -> PredictedValue {
    let number = |key: &str| map.get(key).and_then(Value::as_f64);
    if let Some(v) = number("prediction") {
        PredictedValue::Prediction(v)
    } else if let Some(v) = number("prediction_d_plus_2") {
        PredictedValue::PredictionDPlus2(v)
    } else {
        PredictedValue::Missing
    }
}
