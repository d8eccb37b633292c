//! Reading flight records and indicator tables, writing ranked rules.
//!
//! Rules are written as JSON Lines, one rule object per line.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::errors::{ApplicationError, InputError};
use crate::features::{FlightRecord, IndicatorTable};
use crate::rules::{DisplayLabels, RuleRecord};

/// Parses a JSON array of flight records, a single (possibly pretty-printed)
/// record, or JSON Lines with one record per non-blank line.
pub fn parse_flights(raw: &str) -> Result<Vec<FlightRecord>, InputError> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(raw)
            .map_err(|error| InputError::MalformedRecord { index: 0, message: error.to_string() });
    }
    if trimmed.starts_with('{') {
        if let Ok(record) = serde_json::from_str::<FlightRecord>(raw) {
            return Ok(vec![record]);
        }
    }

    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(index, line)| {
            serde_json::from_str(line)
                .map_err(|error| InputError::MalformedRecord { index, message: error.to_string() })
        })
        .collect()
}

/// Reads flight records from a file, or from every `*.json` file of a
/// directory in file-name order.
pub fn read_flights(path: &Path) -> Result<Vec<FlightRecord>, ApplicationError> {
    let flights = if path.is_dir() {
        read_flight_dir(path)?
    } else {
        parse_flights(&read_to_string(path)?)?
    };
    info!(
        event_name = "io.flights.loaded",
        path = %path.display(),
        flights = flights.len(),
        "flight records loaded"
    );
    Ok(flights)
}

/// One record per file, as exported by the flight tracker. A record without a
/// `flight_id` is named after its file stem.
fn read_flight_dir(dir: &Path) -> Result<Vec<FlightRecord>, ApplicationError> {
    let dir_error = |source| ApplicationError::io(dir.display().to_string(), source);
    let entries = fs::read_dir(dir).map_err(dir_error)?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(dir_error)?.path();
        if path.is_file() && path.extension().is_some_and(|extension| extension == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut flights = Vec::with_capacity(paths.len());
    for path in &paths {
        let stem =
            path.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default();
        let records = parse_flights(&read_to_string(path)?).map_err(|error| match error {
            InputError::MalformedRecord { message, .. } => InputError::MalformedRecord {
                index: flights.len(),
                message: format!("{}: {message}", path.display()),
            },
            other => other,
        })?;
        for mut record in records {
            if record.flight_id.is_empty() {
                record.flight_id = stem.clone();
            }
            flights.push(record);
        }
    }
    Ok(flights)
}

pub fn read_indicator_table(path: &Path) -> Result<IndicatorTable, ApplicationError> {
    let raw = read_to_string(path)?;
    let table: IndicatorTable = serde_json::from_str(&raw)
        .map_err(|error| InputError::MalformedTable(error.to_string()))?;
    info!(
        event_name = "io.indicator_table.loaded",
        path = %path.display(),
        rows = table.rows.len(),
        columns = table.column_count(),
        "indicator table loaded"
    );
    Ok(table)
}

pub fn write_indicator_table(path: &Path, table: &IndicatorTable) -> Result<(), ApplicationError> {
    let json = serde_json::to_string(table)
        .map_err(|error| ApplicationError::Serialization(error.to_string()))?;
    fs::write(path, json).map_err(|source| ApplicationError::io(path.display().to_string(), source))
}

/// Writes records with their own field names.
pub fn write_rules<W: Write>(writer: W, records: &[RuleRecord]) -> Result<(), ApplicationError> {
    write_lines(writer, records.iter())
}

/// Writes records under display labels.
pub fn write_display_rules<W: Write>(
    writer: W,
    records: &[RuleRecord],
    labels: &DisplayLabels,
) -> Result<(), ApplicationError> {
    write_lines(writer, records.iter().map(|record| labels.relabel(record)))
}

pub fn write_rules_file(
    path: &Path,
    records: &[RuleRecord],
    labels: Option<&DisplayLabels>,
) -> Result<(), ApplicationError> {
    let file = fs::File::create(path)
        .map_err(|source| ApplicationError::io(path.display().to_string(), source))?;
    let writer = BufWriter::new(file);
    match labels {
        Some(labels) => write_display_rules(writer, records, labels),
        None => write_rules(writer, records),
    }
    .map_err(|error| match error {
        ApplicationError::Io { source, .. } => {
            ApplicationError::io(path.display().to_string(), source)
        }
        other => other,
    })?;

    info!(
        event_name = "io.rules.written",
        path = %path.display(),
        rules = records.len(),
        display = labels.is_some(),
        "rules written"
    );
    Ok(())
}

fn write_lines<W, I, T>(mut writer: W, lines: I) -> Result<(), ApplicationError>
where
    W: Write,
    I: Iterator<Item = T>,
    T: Serialize,
{
    for line in lines {
        serde_json::to_writer(&mut writer, &line)
            .map_err(|error| ApplicationError::Serialization(error.to_string()))?;
        writer.write_all(b"\n").map_err(|source| ApplicationError::io("<rules>", source))?;
    }
    writer.flush().map_err(|source| ApplicationError::io("<rules>", source))
}

fn read_to_string(path: &Path) -> Result<String, ApplicationError> {
    fs::read_to_string(path).map_err(|source| ApplicationError::io(path.display().to_string(), source))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::Value;
    use tempfile::TempDir;

    use super::{parse_flights, read_indicator_table, write_display_rules, write_rules};
    use crate::errors::{ApplicationError, InputError, MiningError};
    use crate::rules::{DisplayLabels, RuleMetrics, RuleRecord};

    const FLIGHT_JSON: &str = r#"{"flight_id": "1", "airline_iata_code": "SU", "plan_departure": "2023-07-14 18:30:00", "plan_arrival": "2023-07-14 20:30:00", "fact_departure": "2023-07-14 18:45:00", "fact_arrival": "2023-07-14 20:50:00"}"#;

    fn record(conviction: f64) -> RuleRecord {
        RuleRecord {
            antecedents: vec!["SU".to_owned()],
            consequents: vec!["0-15min".to_owned()],
            metrics: RuleMetrics {
                antecedent_support: 0.5,
                consequent_support: 0.5,
                support: 0.5,
                confidence: 1.0,
                lift: 2.0,
                leverage: 0.25,
                conviction,
            },
        }
    }

    #[test]
    fn parses_json_array_and_json_lines() {
        let array = format!("[{FLIGHT_JSON}, {FLIGHT_JSON}]");
        assert_eq!(parse_flights(&array).expect("array").len(), 2);

        let lines = format!("{FLIGHT_JSON}\n\n{FLIGHT_JSON}\n");
        assert_eq!(parse_flights(&lines).expect("lines").len(), 2);
    }

    #[test]
    fn parses_a_single_pretty_printed_record() {
        let pretty = r#"{
    "flight_id": 7,
    "airline_iata_code": "SU",
    "plan_departure": "2023-07-14 18:30:00",
    "plan_arrival": "2023-07-14 20:30:00",
    "fact_departure": "2023-07-14 18:45:00",
    "fact_arrival": "2023-07-14 20:50:00"
}
"#;
        let flights = parse_flights(pretty).expect("single object");

        assert_eq!(flights.len(), 1);
        assert_eq!(flights[0].flight_id, "7");
    }

    #[test]
    fn tracker_field_names_are_accepted() {
        let raw = r#"{"airline_iata_code": "SU", "flight": "SU1402", "departure_airport": "SVO", "arrival_airport": "LED", "plan_departure": "2023-07-14 18:30:00", "plan_arrival": "2023-07-14 20:30:00", "fact_departure": "2023-07-14 18:45:00", "fact_arrival": "2023-07-14 20:50:00"}"#;
        let flights = parse_flights(raw).expect("tracker record");

        assert_eq!(flights[0].flight_id, "");
        assert_eq!(flights[0].departure_airport_code.as_deref(), Some("SVO"));
        assert_eq!(flights[0].arrival_airport_code.as_deref(), Some("LED"));
    }

    #[test]
    fn directory_input_names_flights_after_their_files() {
        let dir = TempDir::new().expect("tempdir");
        let tracker = r#"{
  "airline_iata_code": "S7",
  "flight": "S7 2001",
  "departure_airport": "OVB",
  "arrival_airport": "DME",
  "plan_departure": "2023-01-10 07:00:00",
  "plan_arrival": "2023-01-10 09:00:00",
  "fact_departure": "2023-01-10 09:30:00",
  "fact_arrival": "2023-01-10 11:30:00"
}"#;
        fs::write(dir.path().join("b-204.json"), tracker).expect("write fixture");
        fs::write(dir.path().join("a-101.json"), FLIGHT_JSON).expect("write fixture");
        fs::write(dir.path().join("notes.txt"), "not a flight").expect("write fixture");

        let flights = super::read_flights(dir.path()).expect("directory");

        assert_eq!(flights.len(), 2);
        assert_eq!(flights[0].flight_id, "1", "an explicit id wins over the file name");
        assert_eq!(flights[1].flight_id, "b-204");
        assert_eq!(flights[1].airline_iata_code, "S7");
        assert_eq!(flights[1].arrival_airport_code.as_deref(), Some("DME"));
    }

    #[test]
    fn malformed_file_in_directory_names_the_file() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("a.json"), FLIGHT_JSON).expect("write fixture");
        fs::write(dir.path().join("b.json"), r#"{"airline_iata_code": "SU"}"#)
            .expect("write fixture");

        let error = super::read_flights(dir.path()).expect_err("b.json lacks timestamps");
        match error {
            ApplicationError::Mining(MiningError::Input(InputError::MalformedRecord {
                index,
                message,
            })) => {
                assert_eq!(index, 1);
                assert!(message.contains("b.json"), "{message}");
            }
            other => panic!("expected a malformed record, got {other:?}"),
        }
    }

    #[test]
    fn malformed_line_reports_its_index() {
        let lines = format!("{FLIGHT_JSON}\n{{\"flight_id\": \"2\"}}\n");
        let error = parse_flights(&lines).expect_err("second line is incomplete");

        assert!(matches!(error, InputError::MalformedRecord { index: 1, .. }));
    }

    #[test]
    fn rules_are_written_one_per_line() {
        let mut buffer = Vec::new();
        write_rules(&mut buffer, &[record(f64::INFINITY), record(3.0)]).expect("write");

        let text = String::from_utf8(buffer).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: Value = serde_json::from_str(lines[0]).expect("json line");
        assert_eq!(first["antecedents"][0], "SU");
        assert_eq!(first["conviction"], "inf");
        let second: Value = serde_json::from_str(lines[1]).expect("json line");
        assert_eq!(second["conviction"], 3.0);
    }

    #[test]
    fn display_rules_use_display_labels() {
        let mut buffer = Vec::new();
        write_display_rules(&mut buffer, &[record(3.0)], &DisplayLabels::business())
            .expect("write");

        let line: Value = serde_json::from_slice(&buffer).expect("json");
        assert_eq!(line["Reliability of the rule"], 1.0);
        assert!(line.get("confidence").is_none());
    }

    #[test]
    fn malformed_indicator_table_is_an_input_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("table.json");
        fs::write(&path, "{\"columns\": 3}").expect("write fixture");

        let error = read_indicator_table(&path).expect_err("malformed");
        assert!(matches!(
            error,
            ApplicationError::Mining(MiningError::Input(InputError::MalformedTable(_)))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = TempDir::new().expect("tempdir");
        let error = super::read_flights(&dir.path().join("absent.json")).expect_err("missing");

        assert_eq!(error.error_class(), "io_error");
    }
}
