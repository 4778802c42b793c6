use super::{Report, Row, Transform, Value};
use crate::models::CleanRecord;
use chrono::NaiveDate;

/// Site label -> dataset column. Labels not listed here are dropped.
pub const TRANSLATION: &[(&str, &str)] = &[
    ("url", "url"),
    ("Slutpris", "final_price"),
    ("Title", "title"),
    ("Type", "type"),
    ("Location", "location"),
    ("Sale Date", "sale_date"),
    ("Agent Name", "agent_name"),
    ("Agent Link", "agent_link"),
    ("Pris per kvadratmeter", "price_per_square_meter"),
    ("Utgångspris", "starting_price"),
    ("Prisutveckling", "price_development"),
    ("Antal rum", "number_of_rooms"),
    ("Boarea", "living_area"),
    ("Avgift", "fee"),
    ("Driftskostnad", "operational_cost"),
    ("Biarea", "supplementary_area"),
    ("Tomtarea", "lot_area"),
    ("Uteplats", "outdoor_space"),
    ("Arrende", "leasehold_fee"),
    ("Förening", "housing_association"),
    ("Sale Year", "sale_year"),
    ("Sale Month", "sale_month"),
    ("Sale Day", "sale_day"),
    ("Balkong", "balcony"),
    ("Våning", "floor"),
    ("Floor Number", "floor_number"),
    ("Top Floor Number", "top_floor_number"),
    ("Elevator Presence", "elevator_presence"),
    ("Lat", "latitude"),
    ("Long", "longitude"),
    ("Tomträttsavgäld", "land_right_fee"),
    ("Byggår", "year_of_construction"),
    ("Bostadstyp", "type_2"),
    ("Upplåtelseform", "ownership_form"),
];

pub struct RenameColumns {
    table: &'static [(&'static str, &'static str)],
}

impl RenameColumns {
    pub fn standard() -> Self {
        Self { table: TRANSLATION }
    }
}

impl Transform for RenameColumns {
    fn name(&self) -> &'static str {
        "rename_columns"
    }

    fn apply(&self, row: &mut Row, _report: &mut Report) {
        let mut renamed = Row::new();
        for (label, column) in self.table {
            if let Some(value) = row.remove(*label) {
                renamed.insert(column.to_string(), value);
            }
        }
        *row = renamed;
    }
}

fn text(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::Text(s) => Some(s.clone()),
        _ => None,
    }
}

fn int(row: &Row, column: &str) -> Option<i64> {
    match row.get(column)? {
        Value::Int(n) => Some(*n),
        _ => None,
    }
}

fn float(row: &Row, column: &str) -> Option<f64> {
    match row.get(column)? {
        Value::Float(v) => Some(*v),
        Value::Int(n) => Some(*n as f64),
        _ => None,
    }
}

fn date(row: &Row, column: &str) -> Option<NaiveDate> {
    match row.get(column)? {
        Value::Date(d) => Some(*d),
        _ => None,
    }
}

/// Promote a renamed row to the typed schema. A value of the wrong kind for
/// its column is treated as missing.
pub fn clean_record(row: &Row) -> CleanRecord {
    CleanRecord {
        url: text(row, "url"),
        title: text(row, "title"),
        property_type: text(row, "type"),
        type_2: text(row, "type_2"),
        location: text(row, "location"),
        ownership_form: text(row, "ownership_form"),
        housing_association: text(row, "housing_association"),
        agent_name: text(row, "agent_name"),
        agent_link: text(row, "agent_link"),
        final_price: int(row, "final_price"),
        starting_price: int(row, "starting_price"),
        price_per_square_meter: int(row, "price_per_square_meter"),
        price_development: text(row, "price_development"),
        fee: int(row, "fee"),
        operational_cost: int(row, "operational_cost"),
        leasehold_fee: float(row, "leasehold_fee"),
        land_right_fee: float(row, "land_right_fee"),
        number_of_rooms: int(row, "number_of_rooms"),
        living_area: float(row, "living_area"),
        supplementary_area: float(row, "supplementary_area"),
        lot_area: float(row, "lot_area"),
        year_of_construction: int(row, "year_of_construction"),
        sale_date: date(row, "sale_date"),
        sale_year: int(row, "sale_year"),
        sale_month: int(row, "sale_month"),
        sale_day: int(row, "sale_day"),
        floor: text(row, "floor"),
        floor_number: int(row, "floor_number"),
        top_floor_number: int(row, "top_floor_number"),
        elevator_presence: int(row, "elevator_presence"),
        balcony: int(row, "balcony"),
        outdoor_space: int(row, "outdoor_space"),
        latitude: float(row, "latitude"),
        longitude: float(row, "longitude"),
    }
}
