//! Historical sales dataset, loaded once per session.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::schema::{self, ColumnMapping};
use crate::types::SalesRecord;

/// Day-first wins for ambiguous slash dates; month-first is tried only when
/// the day-first reading is not a valid date.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Immutable sales history plus the column mapping resolved at load time.
/// Passed by reference to everything that reads it.
#[derive(Debug, Clone)]
pub struct Dataset {
    source: String,
    mapping: ColumnMapping,
    records: Vec<SalesRecord>,
}

impl Dataset {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = path.display().to_string();
        if !path.is_file() {
            return Err(AppError::DatasetUnavailable { path: source });
        }
        let file = std::fs::File::open(path)?;
        let dataset = Self::from_reader(file, source)?;
        info!(
            source = %dataset.source,
            records = dataset.records.len(),
            products = dataset.products().len(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    /// Parse CSV text. An unparsable date fails the whole load; an unreadable
    /// quantity is kept as `None` and only fails predictions that use it.
    pub fn from_reader<R: Read>(reader: R, source: impl Into<String>) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let mapping = schema::resolve(csv_reader.headers()?.iter())?;

        let mut records = Vec::new();
        let mut unreadable = 0usize;
        for (idx, result) in csv_reader.records().enumerate() {
            let record = result?;
            // Line where the record starts; quoted fields may span lines
            let row = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(idx + 2);
            let field = |index: usize| record.get(index).unwrap_or("");

            let raw_date = field(mapping.date.index);
            let date = parse_date(raw_date).ok_or_else(|| AppError::DataFormat {
                row,
                column: mapping.date.name.clone(),
                value: raw_date.to_string(),
            })?;

            let quantity = parse_quantity(field(mapping.quantity.index));
            if quantity.is_none() {
                unreadable += 1;
                debug!(row, column = %mapping.quantity.name, "unreadable quantity");
            }

            records.push(SalesRecord {
                date,
                product_id: field(mapping.product.index).to_string(),
                quantity,
            });
        }
        if unreadable > 0 {
            warn!(
                unreadable,
                column = %mapping.quantity.name,
                "rows with unreadable quantities; predictions that need them will fail"
            );
        }

        Ok(Self {
            source: source.into(),
            mapping,
            records,
        })
    }

    pub fn from_records(
        source: impl Into<String>,
        mapping: ColumnMapping,
        records: Vec<SalesRecord>,
    ) -> Self {
        Self {
            source: source.into(),
            mapping,
            records,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct product ids, sorted.
    pub fn products(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.product_id.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

/// Empty, `NaN`, infinite and non-numeric cells have no quantity.
pub fn parse_quantity(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|q| q.is_finite())
}

/// Parse a calendar date, discarding any time of day.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}
