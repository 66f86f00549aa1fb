use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Dataset rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub date: NaiveDate,
    /// Raw cell text. Numeric and textual product ids compare as strings.
    pub product_id: String,
    /// `None` when the cell is empty, `NaN` or not a number. Only a
    /// prediction whose window includes this row is affected.
    pub quantity: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    Date,
    Product,
    Quantity,
}

// ---------------------------------------------------------------------------
// History window
// ---------------------------------------------------------------------------

/// Lookback window sent to the forecasting service. Quantities are in
/// chronological order and every one of them predates `target_date`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryWindow {
    pub product_id: String,
    pub target_date: NaiveDate,
    pub quantities: Vec<f64>,
    /// Rows selected for the window, including those in `missing`.
    pub actual_count: usize,
    /// Dates inside the window whose quantity could not be read.
    pub missing: Vec<NaiveDate>,
}

/// One point of the history line on the chart. Never sent to the service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub quantity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowWarning {
    /// Fewer rows than the window length were available. The service pads
    /// the rest.
    InsufficientHistory { actual: usize, wanted: usize },
}

impl std::fmt::Display for WindowWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowWarning::InsufficientHistory { actual, wanted } => write!(
                f,
                "Incomplete history ({actual} of {wanted} days). The service will fill the gap with averages."
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Forecasting service contract
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub product_name: String,
    /// ISO-8601 calendar date, `YYYY-MM-DD`.
    pub prediction_date: String,
    pub sales_history: Vec<f64>,
}

impl From<&HistoryWindow> for PredictionRequest {
    fn from(w: &HistoryWindow) -> Self {
        Self {
            product_name: w.product_id.clone(),
            prediction_date: w.target_date.format("%Y-%m-%d").to_string(),
            sales_history: w.quantities.clone(),
        }
    }
}

/// Where the predicted value was found in the response body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PredictedValue {
    /// `prediction` field.
    Prediction(f64),
    /// `prediction_d_plus_2` field, used when `prediction` is absent.
    PredictionDPlus2(f64),
    /// Neither field held a number.
    Missing,
}

impl PredictedValue {
    pub fn value(&self) -> Option<f64> {
        match self {
            PredictedValue::Prediction(v) | PredictedValue::PredictionDPlus2(v) => Some(*v),
            PredictedValue::Missing => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub predicted: PredictedValue,
    /// Full response body, including diagnostic fields we don't interpret.
    pub raw_response: serde_json::Map<String, serde_json::Value>,
}

impl PredictionResult {
    pub fn predicted_value(&self) -> Option<f64> {
        self.predicted.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(quantities: Vec<f64>) -> HistoryWindow {
        HistoryWindow {
            product_id: "CROISSANT".to_string(),
            target_date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            actual_count: quantities.len(),
            quantities,
            missing: Vec::new(),
        }
    }

    #[test]
    fn request_preserves_history_order() {
        let w = window(vec![5.0, 6.0, 7.0, 3.0]);
        let req = PredictionRequest::from(&w);
        assert_eq!(req.sales_history, w.quantities);
        assert_eq!(req.product_name, "CROISSANT");
        assert_eq!(req.prediction_date, "2024-03-05");
    }

    #[test]
    fn request_json_shape() {
        let req = PredictionRequest::from(&window(vec![]));
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "product_name": "CROISSANT",
                "prediction_date": "2024-03-05",
                "sales_history": []
            })
        );
    }

    #[test]
    fn missing_prediction_has_no_value() {
        assert_eq!(PredictedValue::Missing.value(), None);
        assert_eq!(PredictedValue::PredictionDPlus2(30.0).value(), Some(30.0));
    }

    #[test]
    fn warning_mentions_counts() {
        let w = WindowWarning::InsufficientHistory { actual: 10, wanted: 14 };
        let msg = w.to_string();
        assert!(msg.contains("10 of 14"), "{msg}");
    }
}
