//! Raw record -> clean record normalization.
//!
//! Rows stay keyed by the site's own labels while the steps run, since
//! several steps look fields up by those labels. Renaming to the English
//! schema is always the last step, after which the row is promoted to a
//! [`CleanRecord`].

pub mod schema;
pub mod steps;

use crate::models::{CleanRecord, GeoPoint, RawRecord};
use crate::storage::GeocodeCache;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

/// Working value of one field while the pipeline runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    /// Present on the page but not parseable
    Missing,
}

pub type Row = BTreeMap<String, Value>;

/// Why a field value fell back to missing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("no digits in {0:?}")]
    NoDigits(String),
    #[error("not a number: {0:?}")]
    NotANumber(String),
    #[error("no date in {0:?}")]
    NoDate(String),
    #[error("not a calendar date: {0:?}")]
    InvalidDate(String),
    #[error("unrecognised value {0:?}")]
    Unrecognised(String),
}

/// Per-field fallback counts for a pipeline run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Report {
    pub rows: usize,
    pub missing: BTreeMap<String, usize>,
}

impl Report {
    pub fn fallback(&mut self, field: &str, error: &FieldError) {
        debug!(field, error = %error, "Value fell back to missing");
        *self.missing.entry(field.to_string()).or_default() += 1;
    }

    pub fn log(&self) {
        info!(rows = self.rows, "Normalized rows");
        for (field, count) in &self.missing {
            info!(field = %field, count, "Unparseable values set to missing");
        }
    }
}

/// One field-level step of the pipeline. Steps never fail a row: a bad
/// value becomes [`Value::Missing`] and is counted in the report.
pub trait Transform: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, row: &mut Row, report: &mut Report);
}

pub struct Pipeline {
    steps: Vec<Box<dyn Transform>>,
}

impl Pipeline {
    pub fn new(steps: Vec<Box<dyn Transform>>) -> Self {
        Self { steps }
    }

    /// The fixed step order used for the sold-listings dataset.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(steps::NumericCleanup::new(steps::STANDARD_NUMERIC_FIELDS)),
            Box::new(steps::AreaCleanup::new(steps::AREA_FIELDS)),
            Box::new(steps::AnnualCostCleanup::new(steps::ANNUAL_COST_FIELDS)),
            Box::new(steps::DateDecomposition::new(steps::SALE_DATE_FIELD)),
            Box::new(steps::FloorElevator::new(steps::FLOOR_FIELD)),
            Box::new(steps::BinaryRecode::new(steps::BINARY_FIELDS)),
            Box::new(schema::RenameColumns::standard()),
        ])
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn run(&self, mut row: Row, report: &mut Report) -> CleanRecord {
        for step in &self.steps {
            step.apply(&mut row, report);
        }
        report.rows += 1;
        schema::clean_record(&row)
    }

    /// Normalize every cached record, joining known coordinates by title.
    /// Pure in its inputs, so reruns over the same cache give the same rows.
    pub fn run_all(
        &self,
        records: &[RawRecord],
        geocodes: Option<&GeocodeCache>,
    ) -> (Vec<CleanRecord>, Report) {
        debug!(steps = ?self.step_names(), records = records.len(), "Running pipeline");
        let mut report = Report::default();
        let clean = records
            .iter()
            .map(|record| {
                let mut row = row_from_raw(record);
                let point = geocodes.and_then(|g| record.title().and_then(|t| g.point(t)));
                if let Some(point) = point {
                    attach_coordinates(&mut row, point);
                }
                self.run(row, &mut report)
            })
            .collect();
        (clean, report)
    }
}

/// Seed a working row from a raw record, every value still text.
pub fn row_from_raw(record: &RawRecord) -> Row {
    let mut row: Row = record
        .fields
        .iter()
        .map(|(label, value)| (label.clone(), Value::Text(value.clone())))
        .collect();
    row.insert("url".to_string(), Value::Text(record.url.clone()));
    row
}

pub fn attach_coordinates(row: &mut Row, point: GeoPoint) {
    row.insert("Lat".to_string(), Value::Float(point.lat));
    row.insert("Long".to_string(), Value::Float(point.lon));
}
