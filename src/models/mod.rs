use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One listing page as scraped: the source URL plus every label/value pair
/// the page exposed. The label set differs between property types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub url: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl RawRecord {
    #[cfg(test)]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields.get(label).map(String::as_str)
    }

    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(label.into(), value.into());
    }

    /// Street address shown as the page heading, used as the geocoding key.
    pub fn title(&self) -> Option<&str> {
        self.get("Title")
    }
}

/// Latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Elevator availability parsed from the floor description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elevator {
    Present,
    Absent,
    Unknown,
}

impl Elevator {
    /// 1/0 indicator for the dataset, `None` when unknown.
    pub fn indicator(self) -> Option<i64> {
        match self {
            Elevator::Present => Some(1),
            Elevator::Absent => Some(0),
            Elevator::Unknown => None,
        }
    }
}

/// Cleaned, typed listing with the fixed English schema.
///
/// Every column is optional: a missing label on the page and a value that
/// failed to parse both end up as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanRecord {
    pub url: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub property_type: Option<String>,
    pub type_2: Option<String>,
    pub location: Option<String>,
    pub ownership_form: Option<String>,
    pub housing_association: Option<String>,
    pub agent_name: Option<String>,
    pub agent_link: Option<String>,

    pub final_price: Option<i64>,
    pub starting_price: Option<i64>,
    pub price_per_square_meter: Option<i64>,
    pub price_development: Option<String>,
    pub fee: Option<i64>,
    pub operational_cost: Option<i64>,
    pub leasehold_fee: Option<f64>,
    pub land_right_fee: Option<f64>,

    pub number_of_rooms: Option<i64>,
    pub living_area: Option<f64>,
    pub supplementary_area: Option<f64>,
    pub lot_area: Option<f64>,
    pub year_of_construction: Option<i64>,

    pub sale_date: Option<NaiveDate>,
    pub sale_year: Option<i64>,
    pub sale_month: Option<i64>,
    pub sale_day: Option<i64>,

    pub floor: Option<String>,
    pub floor_number: Option<i64>,
    pub top_floor_number: Option<i64>,
    pub elevator_presence: Option<i64>,
    pub balcony: Option<i64>,
    pub outdoor_space: Option<i64>,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}
