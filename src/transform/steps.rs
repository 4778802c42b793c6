use super::{FieldError, Report, Row, Transform, Value};
use crate::models::Elevator;
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

pub const STANDARD_NUMERIC_FIELDS: &[&str] = &[
    "Slutpris",
    "Utgångspris",
    "Pris per kvadratmeter",
    "Avgift",
    "Driftskostnad",
    "Byggår",
    "Antal rum",
];
pub const AREA_FIELDS: &[&str] = &["Biarea", "Tomtarea", "Boarea"];
pub const ANNUAL_COST_FIELDS: &[&str] = &["Arrende", "Tomträttsavgäld"];
pub const SALE_DATE_FIELD: &str = "Sale Date";
pub const FLOOR_FIELD: &str = "Våning";
pub const BINARY_FIELDS: &[&str] = &["Uteplats", "Balkong"];

pub const SALE_YEAR: &str = "Sale Year";
pub const SALE_MONTH: &str = "Sale Month";
pub const SALE_DAY: &str = "Sale Day";
pub const FLOOR_NUMBER: &str = "Floor Number";
pub const TOP_FLOOR_NUMBER: &str = "Top Floor Number";
pub const ELEVATOR_PRESENCE: &str = "Elevator Presence";

const MONTHS: [(&str, &str); 12] = [
    ("januari", "January"),
    ("februari", "February"),
    ("mars", "March"),
    ("april", "April"),
    ("maj", "May"),
    ("juni", "June"),
    ("juli", "July"),
    ("augusti", "August"),
    ("september", "September"),
    ("oktober", "October"),
    ("november", "November"),
    ("december", "December"),
];

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());
static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2}) (\w+) (\d{4})").unwrap());
static TOP_FLOOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"av (\d+)").unwrap());

/// Replace the text value of `field` with the parse result, or with
/// `Missing` when it does not parse. Fields that are absent or already
/// converted are left alone.
fn coerce<F>(row: &mut Row, field: &str, report: &mut Report, parse: F)
where
    F: Fn(&str) -> Result<Value, FieldError>,
{
    let Some(Value::Text(raw)) = row.get(field) else {
        return;
    };
    let value = match parse(raw) {
        Ok(value) => value,
        Err(e) => {
            report.fallback(field, &e);
            Value::Missing
        }
    };
    row.insert(field.to_string(), value);
}

fn text<'a>(row: &'a Row, field: &str) -> Option<&'a str> {
    match row.get(field) {
        Some(Value::Text(s)) => Some(s),
        _ => None,
    }
}

/// `"4 500 000 kr"` -> 4500000. Units, spaces and plus signs are dropped,
/// then the first run of digits is taken.
pub fn parse_standard_number(raw: &str) -> Result<i64, FieldError> {
    let stripped: String = raw
        .replace(" kr/m²", "")
        .replace(" kr", "")
        .replace(" rum", "")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '+')
        .collect();

    let digits = DIGITS
        .find(&stripped)
        .ok_or_else(|| FieldError::NoDigits(raw.to_string()))?;
    digits
        .as_str()
        .parse()
        .map_err(|_| FieldError::NotANumber(raw.to_string()))
}

fn parse_finite(cleaned: &str, raw: &str) -> Result<f64, FieldError> {
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| FieldError::NotANumber(raw.to_string()))
}

/// `"65,5 m²"` -> 65.5
pub fn parse_area(raw: &str) -> Result<f64, FieldError> {
    let cleaned = raw.replace(" m²", "").replace(',', ".");
    parse_finite(cleaned.trim(), raw)
}

/// `"12 000 kr/år"` -> 12000.0
pub fn parse_annual_cost(raw: &str) -> Result<f64, FieldError> {
    let cleaned: String = raw
        .replace(" kr/år", "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    parse_finite(&cleaned, raw)
}

/// Swap every Swedish month name for its English one.
pub fn translate_months(raw: &str) -> String {
    MONTHS
        .iter()
        .fold(raw.to_string(), |acc, (sv, en)| acc.replace(sv, en))
}

/// `"Såld 14 mars 2023"` -> 2023-03-14
pub fn parse_sale_date(raw: &str) -> Result<NaiveDate, FieldError> {
    let translated = translate_months(raw);
    let found = DATE
        .find(&translated)
        .ok_or_else(|| FieldError::NoDate(raw.to_string()))?;
    NaiveDate::parse_from_str(found.as_str(), "%d %B %Y")
        .map_err(|_| FieldError::InvalidDate(raw.to_string()))
}

/// Negative phrase first: "hiss finns" is a prefix of "hiss finns ej".
pub fn classify_elevator(raw: &str) -> Elevator {
    if raw.contains("hiss finns ej") {
        Elevator::Absent
    } else if raw.contains("hiss finns") {
        Elevator::Present
    } else {
        Elevator::Unknown
    }
}

pub fn parse_floor_number(raw: &str) -> Result<i64, FieldError> {
    DIGITS
        .find(raw)
        .ok_or_else(|| FieldError::NoDigits(raw.to_string()))?
        .as_str()
        .parse()
        .map_err(|_| FieldError::NotANumber(raw.to_string()))
}

pub fn parse_top_floor(raw: &str) -> Option<i64> {
    TOP_FLOOR.captures(raw)?.get(1)?.as_str().parse().ok()
}

pub fn recode_binary(raw: &str) -> Result<i64, FieldError> {
    match raw.trim() {
        "Ja" => Ok(1),
        "Nej" => Ok(0),
        other => Err(FieldError::Unrecognised(other.to_string())),
    }
}

pub struct NumericCleanup {
    fields: &'static [&'static str],
}

impl NumericCleanup {
    pub fn new(fields: &'static [&'static str]) -> Self {
        Self { fields }
    }
}

impl Transform for NumericCleanup {
    fn name(&self) -> &'static str {
        "numeric_cleanup"
    }

    fn apply(&self, row: &mut Row, report: &mut Report) {
        for field in self.fields {
            coerce(row, field, report, |raw| parse_standard_number(raw).map(Value::Int));
        }
    }
}

pub struct AreaCleanup {
    fields: &'static [&'static str],
}

impl AreaCleanup {
    pub fn new(fields: &'static [&'static str]) -> Self {
        Self { fields }
    }
}

impl Transform for AreaCleanup {
    fn name(&self) -> &'static str {
        "area_cleanup"
    }

    fn apply(&self, row: &mut Row, report: &mut Report) {
        for field in self.fields {
            coerce(row, field, report, |raw| parse_area(raw).map(Value::Float));
        }
    }
}

pub struct AnnualCostCleanup {
    fields: &'static [&'static str],
}

impl AnnualCostCleanup {
    pub fn new(fields: &'static [&'static str]) -> Self {
        Self { fields }
    }
}

impl Transform for AnnualCostCleanup {
    fn name(&self) -> &'static str {
        "annual_cost_cleanup"
    }

    fn apply(&self, row: &mut Row, report: &mut Report) {
        for field in self.fields {
            coerce(row, field, report, |raw| parse_annual_cost(raw).map(Value::Float));
        }
    }
}

/// Sale date to a calendar date plus separate year/month/day columns.
pub struct DateDecomposition {
    field: &'static str,
}

impl DateDecomposition {
    pub fn new(field: &'static str) -> Self {
        Self { field }
    }
}

impl Transform for DateDecomposition {
    fn name(&self) -> &'static str {
        "date_decomposition"
    }

    fn apply(&self, row: &mut Row, report: &mut Report) {
        let Some(raw) = text(row, self.field) else {
            return;
        };

        let parts = match parse_sale_date(raw) {
            Ok(date) => [
                Value::Date(date),
                Value::Int(i64::from(date.year())),
                Value::Int(i64::from(date.month())),
                Value::Int(i64::from(date.day())),
            ],
            Err(e) => {
                report.fallback(self.field, &e);
                [Value::Missing, Value::Missing, Value::Missing, Value::Missing]
            }
        };

        let [date, year, month, day] = parts;
        row.insert(self.field.to_string(), date);
        row.insert(SALE_YEAR.to_string(), year);
        row.insert(SALE_MONTH.to_string(), month);
        row.insert(SALE_DAY.to_string(), day);
    }
}

/// `"4 av 6, hiss finns"` -> floor 4, top floor 6, elevator present. The
/// original text is kept.
pub struct FloorElevator {
    field: &'static str,
}

impl FloorElevator {
    pub fn new(field: &'static str) -> Self {
        Self { field }
    }
}

impl Transform for FloorElevator {
    fn name(&self) -> &'static str {
        "floor_elevator"
    }

    fn apply(&self, row: &mut Row, report: &mut Report) {
        let Some(raw) = text(row, self.field).map(str::to_string) else {
            return;
        };

        let floor = match parse_floor_number(&raw) {
            Ok(n) => Value::Int(n),
            Err(e) => {
                report.fallback(FLOOR_NUMBER, &e);
                Value::Missing
            }
        };
        let top = parse_top_floor(&raw).map_or(Value::Missing, Value::Int);
        let elevator = classify_elevator(&raw)
            .indicator()
            .map_or(Value::Missing, Value::Int);

        row.insert(FLOOR_NUMBER.to_string(), floor);
        row.insert(TOP_FLOOR_NUMBER.to_string(), top);
        row.insert(ELEVATOR_PRESENCE.to_string(), elevator);
    }
}

/// "Ja"/"Nej" columns to 1/0
pub struct BinaryRecode {
    fields: &'static [&'static str],
}

impl BinaryRecode {
    pub fn new(fields: &'static [&'static str]) -> Self {
        Self { fields }
    }
}

impl Transform for BinaryRecode {
    fn name(&self) -> &'static str {
        "binary_recode"
    }

    fn apply(&self, row: &mut Row, report: &mut Report) {
        for field in self.fields {
            coerce(row, field, report, |raw| recode_binary(raw).map(Value::Int));
        }
    }
}
