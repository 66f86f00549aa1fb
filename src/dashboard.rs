//! Dashboard state and formatting. Rendering lives in `src/bin/dashboard.rs`.

use chrono::{Datelike, Duration, NaiveDate};
use tracing::{error, info};

use crate::config::validate_url;
use crate::dataset::Dataset;
use crate::error::AppError;
use crate::gateway::ForecastClient;
use crate::pipeline::{self, PredictionRun};
use crate::types::ChartPoint;

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

/// Dataset load result. A failed load leaves the dashboard informational only.
#[derive(Debug)]
pub enum DatasetStatus {
    Loaded(Dataset),
    Failed(AppError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    EditingEndpoint,
}

#[derive(Debug)]
pub enum PredictionStatus {
    Idle,
    Running,
    Done(PredictionRun),
}

pub struct AppState {
    pub dataset: DatasetStatus,
    pub products: Vec<String>,
    pub selected: Option<usize>,
    pub target_date: NaiveDate,
    pub default_date: NaiveDate,
    pub client: ForecastClient,
    pub mode: InputMode,
    pub endpoint_input: String,
    /// Config problems with the edited endpoint. Cleared on the next commit.
    pub endpoint_error: Option<String>,
    pub prediction: PredictionStatus,
    pub show_details: bool,
}

impl AppState {
    pub fn new(dataset: DatasetStatus, endpoint: &str, today: NaiveDate) -> Self {
        let products = match &dataset {
            DatasetStatus::Loaded(ds) => ds.products(),
            DatasetStatus::Failed(_) => Vec::new(),
        };
        let selected = if products.is_empty() { None } else { Some(0) };
        let default_date = today + Duration::days(1);
        Self {
            dataset,
            products,
            selected,
            target_date: default_date,
            default_date,
            client: ForecastClient::new(endpoint),
            mode: InputMode::Normal,
            endpoint_input: endpoint.to_string(),
            endpoint_error: None,
            prediction: PredictionStatus::Idle,
            show_details: false,
        }
    }

    pub fn selected_product(&self) -> Option<&str> {
        self.selected
            .and_then(|i| self.products.get(i))
            .map(String::as_str)
    }

    pub fn select_next(&mut self) {
        if self.products.is_empty() {
            return;
        }
        let max = self.products.len() - 1;
        self.selected = Some(self.selected.map_or(0, |i| (i + 1).min(max)));
    }

    pub fn select_prev(&mut self) {
        if self.products.is_empty() {
            return;
        }
        self.selected = Some(self.selected.map_or(0, |i| i.saturating_sub(1)));
    }

    pub fn shift_date(&mut self, days: i64) {
        if let Some(d) = self.target_date.checked_add_signed(Duration::days(days)) {
            self.target_date = d;
        }
    }

    pub fn reset_date(&mut self) {
        self.target_date = self.default_date;
    }

    pub fn begin_edit_endpoint(&mut self) {
        self.mode = InputMode::EditingEndpoint;
        self.endpoint_input = self.client.endpoint().to_string();
    }

    pub fn cancel_edit(&mut self) {
        self.mode = InputMode::Normal;
        self.endpoint_input = self.client.endpoint().to_string();
    }

    /// Apply the edited endpoint. An invalid URL keeps the previous client.
    pub fn commit_endpoint(&mut self) {
        self.mode = InputMode::Normal;
        match validate_url(&self.endpoint_input) {
            Ok(()) => {
                self.client = ForecastClient::new(self.endpoint_input.as_str());
                self.endpoint_error = None;
                info!(endpoint = %self.client.endpoint(), "endpoint updated");
            }
            Err(e) => {
                self.endpoint_error = Some(e.to_string());
                self.endpoint_input = self.client.endpoint().to_string();
            }
        }
    }

    pub fn loaded_dataset(&self) -> Option<&Dataset> {
        match &self.dataset {
            DatasetStatus::Loaded(ds) => Some(ds),
            DatasetStatus::Failed(_) => None,
        }
    }

    pub fn can_predict(&self) -> bool {
        self.loaded_dataset().is_some()
            && self.selected_product().is_some()
            && !matches!(self.prediction, PredictionStatus::Running)
    }

    /// Mark the prediction as running so the next frame shows it. Returns
    /// false when there is nothing to predict.
    pub fn begin_predict(&mut self) -> bool {
        if !self.can_predict() {
            return false;
        }
        self.prediction = PredictionStatus::Running;
        true
    }

    /// Run one prediction for the current selection. Blocks until the
    /// service answers or the transport gives up.
    pub async fn predict(&mut self) {
        let (dataset, product) = match (&self.dataset, self.selected_product()) {
            (DatasetStatus::Loaded(ds), Some(p)) => (ds, p),
            _ => {
                self.prediction = PredictionStatus::Idle;
                return;
            }
        };
        let run = pipeline::run_prediction(dataset, &self.client, product, self.target_date).await;
        if let Err(e) = &run.result {
            error!(product = %product, target_date = %self.target_date, "prediction failed: {e}");
        }
        self.prediction = PredictionStatus::Done(run);
    }

    pub fn toggle_details(&mut self) {
        self.show_details = !self.show_details;
    }

    /// Pretty-printed raw response for the details pane.
    pub fn details_json(&self) -> Option<String> {
        match &self.prediction {
            PredictionStatus::Done(PredictionRun { result: Ok(r), .. }) => {
                serde_json::to_string_pretty(&r.raw_response).ok()
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Chart data
// ---------------------------------------------------------------------------

/// Chart series in plot coordinates. x is days since the common era.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub history: Vec<(f64, f64)>,
    pub prediction: Option<(f64, f64)>,
    /// Last history point to the prediction.
    pub connector: Vec<(f64, f64)>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
}

pub fn date_to_x(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

pub fn chart_data(history: &[ChartPoint], target_date: NaiveDate, predicted: Option<f64>) -> ChartData {
    let points: Vec<(f64, f64)> = history
        .iter()
        .map(|p| (date_to_x(p.date), p.quantity))
        .collect();
    let prediction = predicted.map(|v| (date_to_x(target_date), v));
    let connector = match (points.last(), prediction) {
        (Some(&last), Some(pred)) => vec![last, pred],
        _ => Vec::new(),
    };

    let xs = points.iter().chain(prediction.iter()).map(|p| p.0);
    let x_min = xs.clone().fold(f64::INFINITY, f64::min);
    let x_max = xs.fold(f64::NEG_INFINITY, f64::max);
    let target_x = date_to_x(target_date);
    let (x_min, x_max) = if x_min.is_finite() {
        (x_min, x_max.max(target_x))
    } else {
        (target_x - 1.0, target_x)
    };

    let y_max = points
        .iter()
        .chain(prediction.iter())
        .map(|p| p.1)
        .fold(0.0_f64, f64::max);
    let y_min = points
        .iter()
        .chain(prediction.iter())
        .map(|p| p.1)
        .fold(0.0_f64, f64::min);

    ChartData {
        history: points,
        prediction,
        connector,
        x_bounds: [x_min, x_max.max(x_min + 1.0)],
        y_bounds: [y_min, (y_max * 1.1).max(1.0)],
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

pub fn format_units(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{v:.1} units"),
        None => "—".to_string(),
    }
}

pub fn format_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

pub fn error_label(e: &AppError) -> &'static str {
    match e {
        AppError::ConnectionFailure(_) => "Connection failure",
        AppError::ServiceError { .. } => "API error",
        AppError::MalformedResponse { .. } => "Unreadable response",
        AppError::MissingQuantity { .. } => "Incomplete sales data",
        AppError::DatasetUnavailable { .. } => "Dataset not found",
        AppError::SchemaResolution { .. } => "Unrecognized columns",
        AppError::DataFormat { .. } | AppError::Csv(_) => "Error reading the local CSV",
        _ => "Error",
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn loaded() -> DatasetStatus {
        let csv = "fecha,producto,unidades\n\
                   2024-01-01,PAN,3\n\
                   2024-01-01,CROISSANT,5\n\
                   2024-01-02,BAGUETTE,2\n";
        DatasetStatus::Loaded(Dataset::from_reader(csv.as_bytes(), "mem").unwrap())
    }

    fn app() -> AppState {
        AppState::new(loaded(), "http://localhost:8080/predict", ymd(2024, 1, 10))
    }

    #[test]
    fn defaults_to_tomorrow_and_first_product() {
        let a = app();
        assert_eq!(a.target_date, ymd(2024, 1, 11));
        assert_eq!(a.selected_product(), Some("BAGUETTE"));
        assert!(a.can_predict());
    }

    #[test]
    fn selection_clamps_at_edges() {
        let mut a = app();
        a.select_prev();
        assert_eq!(a.selected_product(), Some("BAGUETTE"));
        a.select_next();
        a.select_next();
        a.select_next();
        assert_eq!(a.selected_product(), Some("PAN"));
    }

    #[test]
    fn date_shift_and_reset() {
        let mut a = app();
        a.shift_date(7);
        assert_eq!(a.target_date, ymd(2024, 1, 18));
        a.shift_date(-20);
        assert_eq!(a.target_date, ymd(2023, 12, 29));
        a.reset_date();
        assert_eq!(a.target_date, ymd(2024, 1, 11));
    }

    #[test]
    fn failed_dataset_disables_prediction() {
        let status = DatasetStatus::Failed(AppError::DatasetUnavailable {
            path: "ventas.csv".to_string(),
        });
        let mut a = AppState::new(status, "http://localhost:8080/predict", ymd(2024, 1, 10));
        assert!(a.products.is_empty());
        assert!(!a.can_predict());
        assert!(!a.begin_predict());
    }

    #[test]
    fn commit_valid_endpoint_rebuilds_client() {
        let mut a = app();
        a.begin_edit_endpoint();
        assert_eq!(a.mode, InputMode::EditingEndpoint);
        a.endpoint_input = "https://forecast.example.com/predict".to_string();
        a.commit_endpoint();
        assert_eq!(a.mode, InputMode::Normal);
        assert_eq!(a.client.endpoint(), "https://forecast.example.com/predict");
        assert!(a.endpoint_error.is_none());
    }

    #[test]
    fn commit_invalid_endpoint_keeps_previous() {
        let mut a = app();
        a.begin_edit_endpoint();
        a.endpoint_input = "forecast.example.com".to_string();
        a.commit_endpoint();
        assert_eq!(a.client.endpoint(), "http://localhost:8080/predict");
        assert!(a.endpoint_error.is_some());
    }

    #[test]
    fn cancel_edit_restores_input() {
        let mut a = app();
        a.begin_edit_endpoint();
        a.endpoint_input.push_str("garbage");
        a.cancel_edit();
        assert_eq!(a.endpoint_input, "http://localhost:8080/predict");
    }

    #[test]
    fn chart_connects_last_point_to_prediction() {
        let history = vec![
            ChartPoint { date: ymd(2024, 1, 1), quantity: 4.0 },
            ChartPoint { date: ymd(2024, 1, 2), quantity: 10.0 },
        ];
        let c = chart_data(&history, ymd(2024, 1, 4), Some(7.0));
        assert_eq!(c.history.len(), 2);
        assert_eq!(c.connector, vec![(date_to_x(ymd(2024, 1, 2)), 10.0), (date_to_x(ymd(2024, 1, 4)), 7.0)]);
        assert_eq!(c.x_bounds, [date_to_x(ymd(2024, 1, 1)), date_to_x(ymd(2024, 1, 4))]);
        assert!((c.y_bounds[1] - 11.0).abs() < 1e-9);
    }

    #[test]
    fn chart_tolerates_missing_prediction_and_history() {
        let c = chart_data(&[], ymd(2024, 1, 4), None);
        assert!(c.history.is_empty());
        assert!(c.prediction.is_none());
        assert!(c.connector.is_empty());
        assert!(c.x_bounds[0] < c.x_bounds[1]);
        assert!(c.y_bounds[0] < c.y_bounds[1]);
    }

    #[test]
    fn formats_units() {
        assert_eq!(format_units(Some(42.5)), "42.5 units");
        assert_eq!(format_units(Some(30.0)), "30.0 units");
        assert_eq!(format_units(None), "—");
    }

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate("PAN", 10), "PAN");
        assert_eq!(truncate("ENSAIMADA", 5), "ENSA…");
        assert_eq!(truncate("ñññññ", 3), "ññ…");
    }

    #[test]
    fn error_labels_distinguish_connection_and_service() {
        let e = AppError::ServiceError { status: 500, body: "x".to_string() };
        assert_eq!(error_label(&e), "API error");
        let e = AppError::MalformedResponse { body: "x".to_string() };
        assert_eq!(error_label(&e), "Unreadable response");
        let e = AppError::MissingQuantity { product: "PAN".to_string(), dates: Vec::new() };
        assert_eq!(error_label(&e), "Incomplete sales data");
    }
}
