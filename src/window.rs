use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::config::{CHART_WINDOW_LEN, HISTORY_WINDOW_LEN};
use crate::dataset::Dataset;
use crate::types::{ChartPoint, HistoryWindow, SalesRecord, WindowWarning};

/// Everything one prediction needs from the dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowBuild {
    pub window: HistoryWindow,
    /// Up to `CHART_WINDOW_LEN` points for display only.
    pub chart: Vec<ChartPoint>,
    pub warning: Option<WindowWarning>,
}

/// Rows for `product_id` dated strictly before `target_date`, oldest first.
/// Ties on date keep dataset order.
fn history_before<'a>(
    dataset: &'a Dataset,
    product_id: &str,
    target_date: NaiveDate,
) -> Vec<&'a SalesRecord> {
    let mut rows: Vec<&SalesRecord> = dataset
        .records()
        .iter()
        .filter(|r| r.product_id == product_id)
        .collect();
    rows.sort_by_key(|r| r.date);
    rows.retain(|r| r.date < target_date);
    rows
}

fn tail<T>(rows: &[T], n: usize) -> &[T] {
    &rows[rows.len().saturating_sub(n)..]
}

/// Build the lookback window and chart slice for one prediction.
///
/// The target date itself is never part of the window. A short window is
/// still returned, with an `InsufficientHistory` warning; no padding is
/// done here. Rows with an unreadable quantity count towards the window and
/// are listed in `missing`.
pub fn build(dataset: &Dataset, product_id: &str, target_date: NaiveDate) -> WindowBuild {
    let rows = history_before(dataset, product_id, target_date);

    let selected = tail(&rows, HISTORY_WINDOW_LEN);
    let actual_count = selected.len();
    let quantities: Vec<f64> = selected.iter().filter_map(|r| r.quantity).collect();
    let missing: Vec<NaiveDate> = selected
        .iter()
        .filter(|r| r.quantity.is_none())
        .map(|r| r.date)
        .collect();

    let chart = tail(&rows, CHART_WINDOW_LEN)
        .iter()
        .filter_map(|r| {
            r.quantity.map(|quantity| ChartPoint {
                date: r.date,
                quantity,
            })
        })
        .collect();

    let warning = if actual_count < HISTORY_WINDOW_LEN {
        warn!(
            product = %product_id,
            target_date = %target_date,
            actual_count,
            "insufficient history for prediction window"
        );
        Some(WindowWarning::InsufficientHistory {
            actual: actual_count,
            wanted: HISTORY_WINDOW_LEN,
        })
    } else {
        None
    };

    debug!(product = %product_id, target_date = %target_date, actual_count, "window built");

    WindowBuild {
        window: HistoryWindow {
            product_id: product_id.to_string(),
            target_date,
            quantities,
            actual_count,
            missing,
        },
        chart,
        warning,
    }
}
