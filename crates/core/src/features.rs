//! Flight records and their categorical features.
//!
//! Every flight contributes at most one item per domain: its airline, the
//! season and time-of-day band of the planned departure, the weekday of the
//! actual departure and the bucket of its arrival delay. Flights that arrive
//! early carry no delay item.

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::InputError;
use crate::table::{ItemUniverse, TransactionTable};

pub const ID_COLUMN: &str = "flight_id";

const TIME_FORMATS: [&str; 4] =
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const TIME_OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRecord {
    /// Empty when the record carries no id; per-flight files take it from
    /// the file name.
    #[serde(default, deserialize_with = "string_or_number")]
    pub flight_id: String,
    pub airline_iata_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight: Option<String>,
    #[serde(default, alias = "departure_airport", skip_serializing_if = "Option::is_none")]
    pub departure_airport_code: Option<String>,
    #[serde(default, alias = "arrival_airport", skip_serializing_if = "Option::is_none")]
    pub arrival_airport_code: Option<String>,
    #[serde(with = "flight_time")]
    pub plan_departure: NaiveDateTime,
    #[serde(with = "flight_time")]
    pub plan_arrival: NaiveDateTime,
    #[serde(with = "flight_time")]
    pub fact_departure: NaiveDateTime,
    #[serde(with = "flight_time")]
    pub fact_arrival: NaiveDateTime,
}

impl FlightRecord {
    /// Arrival delay in minutes; negative when the flight landed early.
    pub fn delay_minutes(&self) -> f64 {
        (self.fact_arrival - self.plan_arrival).num_seconds() as f64 / 60.0
    }
}

pub fn parse_flight_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|value| value.naive_local()))
}

mod flight_time {
    use chrono::NaiveDateTime;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(super::TIME_OUTPUT_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_flight_time(&raw)
            .ok_or_else(|| D::Error::custom(format!("unrecognized timestamp `{raw}`")))
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(value) => value,
        Raw::Number(value) => value.to_string(),
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DelayBucket {
    Minor,
    Moderate,
    Long,
    Extreme,
}

impl DelayBucket {
    pub const ALL: [DelayBucket; 4] = [Self::Minor, Self::Moderate, Self::Long, Self::Extreme];

    /// Buckets are closed on the right: 15.0 minutes is still `0-15min`.
    pub fn from_minutes(minutes: f64) -> Option<Self> {
        if minutes < 0.0 || minutes.is_nan() {
            None
        } else if minutes <= 15.0 {
            Some(Self::Minor)
        } else if minutes <= 60.0 {
            Some(Self::Moderate)
        } else if minutes <= 180.0 {
            Some(Self::Long)
        } else {
            Some(Self::Extreme)
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Minor => "0-15min",
            Self::Moderate => "15-60min",
            Self::Long => "60-180min",
            Self::Extreme => ">180min",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub const ALL: [Season; 4] = [Self::Winter, Self::Spring, Self::Summer, Self::Autumn];

    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Self::Spring,
            6..=8 => Self::Summer,
            9..=11 => Self::Autumn,
            _ => Self::Winter,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Winter => "winter",
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Autumn => "autumn",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DayPart {
    Night,
    Morning,
    Afternoon,
    Evening,
}

impl DayPart {
    pub const ALL: [DayPart; 4] = [Self::Night, Self::Morning, Self::Afternoon, Self::Evening];

    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=5 => Self::Night,
            6..=11 => Self::Morning,
            12..=17 => Self::Afternoon,
            _ => Self::Evening,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Night => "00:00-05:59",
            Self::Morning => "06:00-11:59",
            Self::Afternoon => "12:00-17:59",
            Self::Evening => "18:00-23:59",
        }
    }
}

pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_label(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// The categorical view of one flight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlightFeatures {
    pub airline: String,
    pub season: Season,
    pub day_part: DayPart,
    pub delay: Option<DelayBucket>,
    pub weekday: Weekday,
}

impl FlightFeatures {
    pub fn from_record(record: &FlightRecord) -> Self {
        Self {
            airline: record.airline_iata_code.trim().to_owned(),
            season: Season::from_month(record.plan_departure.month()),
            day_part: DayPart::from_hour(record.plan_departure.hour()),
            delay: DelayBucket::from_minutes(record.delay_minutes()),
            weekday: record.fact_departure.weekday(),
        }
    }

    /// Item labels of this flight, one per domain that applies.
    pub fn items(&self) -> Vec<&str> {
        let mut items = vec![self.airline.as_str(), self.season.label(), self.day_part.label()];
        if let Some(delay) = self.delay {
            items.push(delay.label());
        }
        items.push(weekday_label(self.weekday));
        items
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorRow {
    #[serde(rename = "flight_id")]
    pub id: String,
    pub values: Vec<bool>,
}

/// One-hot flight x item matrix. `columns` lists item columns only; the
/// flight id travels with each row.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorTable {
    pub columns: Vec<String>,
    pub rows: Vec<IndicatorRow>,
}

impl IndicatorTable {
    pub fn to_transaction_table(&self) -> Result<TransactionTable, InputError> {
        let matrix: Vec<Vec<bool>> = self.rows.iter().map(|row| row.values.clone()).collect();
        TransactionTable::from_indicator_matrix(&self.columns, &matrix, Some(ID_COLUMN))
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Item columns in emission order: airlines (first seen), seasons, time
    /// bands, delay buckets, weekdays.
    pub fn columns(&self, records: &[FlightRecord]) -> Result<Vec<String>, InputError> {
        let mut columns: Vec<String> = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let airline = record.airline_iata_code.trim();
            if airline.is_empty() {
                return Err(InputError::MalformedRecord {
                    index,
                    message: "airline_iata_code is empty".to_owned(),
                });
            }
            if !columns.iter().any(|column| column == airline) {
                columns.push(airline.to_owned());
            }
        }

        let fixed = Season::ALL
            .iter()
            .map(|season| season.label())
            .chain(DayPart::ALL.iter().map(|part| part.label()))
            .chain(DelayBucket::ALL.iter().map(|bucket| bucket.label()))
            .chain(WEEKDAYS.iter().map(|weekday| weekday_label(*weekday)));
        for label in fixed {
            if columns.iter().any(|column| column == label) {
                return Err(InputError::DuplicateColumn(label.to_owned()));
            }
            columns.push(label.to_owned());
        }
        Ok(columns)
    }

    pub fn indicator_table(&self, records: &[FlightRecord]) -> Result<IndicatorTable, InputError> {
        let columns = self.columns(records)?;
        let universe = ItemUniverse::from_labels(columns.iter().cloned())?;

        let rows = records
            .iter()
            .map(|record| {
                let mut values = vec![false; columns.len()];
                for item in FlightFeatures::from_record(record).items() {
                    if let Some(id) = universe.id_of(item) {
                        values[id.index()] = true;
                    }
                }
                IndicatorRow { id: record.flight_id.clone(), values }
            })
            .collect();

        Ok(IndicatorTable { columns, rows })
    }

    /// Builds the transaction table directly, one item set per flight.
    pub fn transactions(&self, records: &[FlightRecord]) -> Result<TransactionTable, InputError> {
        let universe = ItemUniverse::from_labels(self.columns(records)?)?;
        let features: Vec<FlightFeatures> = records.iter().map(FlightFeatures::from_record).collect();
        TransactionTable::with_universe(universe, features.iter().map(FlightFeatures::items))
    }
}
