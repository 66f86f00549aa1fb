use chrono::NaiveDate;

use crate::dataset::Dataset;
use crate::error::Result;
use crate::gateway::ForecastClient;
use crate::types::PredictionResult;
use crate::window::{self, WindowBuild};

/// Outcome of one predict action. The window is kept even when the request
/// fails so the caller can still show the history and its warning.
#[derive(Debug)]
pub struct PredictionRun {
    pub build: WindowBuild,
    pub result: Result<PredictionResult>,
}

/// Build the window for `product_id` and send it once. Runs to completion;
/// the caller decides how to report a failed request.
pub async fn run_prediction(
    dataset: &Dataset,
    client: &ForecastClient,
    product_id: &str,
    target_date: NaiveDate,
) -> PredictionRun {
    let build = window::build(dataset, product_id, target_date);
    let result = client.predict(&build.window).await;
    PredictionRun { build, result }
}
