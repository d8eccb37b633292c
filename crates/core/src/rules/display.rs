use rustc_hash::FxHashMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::metrics::serialize_metric;
use super::ranker::RuleRecord;

/// Field names of a [`RuleRecord`] in emission order.
pub const RULE_FIELDS: [&str; 9] = [
    "antecedents",
    "consequents",
    "antecedent_support",
    "consequent_support",
    "support",
    "confidence",
    "lift",
    "leverage",
    "conviction",
];

const BUSINESS_LABELS: [(&str, &str); 9] = [
    ("antecedents", "If the flight has"),
    ("consequents", "Then it also has"),
    ("antecedent_support", "Share of flights matching the condition"),
    ("consequent_support", "Share of flights matching the outcome"),
    ("support", "Share of flights matching both"),
    ("confidence", "Reliability of the rule"),
    ("lift", "Lift over chance"),
    ("leverage", "Excess co-occurrence"),
    ("conviction", "Conviction"),
];

/// Presentation names for rule fields. Fields without a mapping keep their
/// own name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplayLabels {
    labels: FxHashMap<String, String>,
}

impl DisplayLabels {
    pub fn business() -> Self {
        Self::from_pairs(BUSINESS_LABELS)
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self { labels: pairs.into_iter().map(|(key, value)| (key.into(), value.into())).collect() }
    }

    pub fn label<'a>(&'a self, field: &'a str) -> &'a str {
        self.labels.get(field).map(String::as_str).unwrap_or(field)
    }

    pub fn relabel<'a>(&'a self, record: &'a RuleRecord) -> DisplayRecord<'a> {
        DisplayRecord { record, labels: self }
    }
}

/// A rule record serialized under display labels. Values are untouched.
#[derive(Clone, Copy, Debug)]
pub struct DisplayRecord<'a> {
    record: &'a RuleRecord,
    labels: &'a DisplayLabels,
}

struct Metric(f64);

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_metric(&self.0, serializer)
    }
}

impl Serialize for DisplayRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let metrics = &self.record.metrics;
        let mut map = serializer.serialize_map(Some(RULE_FIELDS.len()))?;
        map.serialize_entry(self.labels.label("antecedents"), &self.record.antecedents)?;
        map.serialize_entry(self.labels.label("consequents"), &self.record.consequents)?;
        for (field, value) in [
            ("antecedent_support", metrics.antecedent_support),
            ("consequent_support", metrics.consequent_support),
            ("support", metrics.support),
            ("confidence", metrics.confidence),
            ("lift", metrics.lift),
            ("leverage", metrics.leverage),
            ("conviction", metrics.conviction),
        ] {
            map.serialize_entry(self.labels.label(field), &Metric(value))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::{DisplayLabels, RULE_FIELDS};
    use crate::rules::{RuleMetrics, RuleRecord};

    fn record() -> RuleRecord {
        RuleRecord {
            antecedents: vec!["SU".to_owned(), "18:00-23:59".to_owned()],
            consequents: vec![">180min".to_owned()],
            metrics: RuleMetrics {
                antecedent_support: 0.2,
                consequent_support: 0.1,
                support: 0.05,
                confidence: 0.25,
                lift: 2.5,
                leverage: 0.03,
                conviction: f64::INFINITY,
            },
        }
    }

    #[test]
    fn relabelling_changes_keys_not_values() {
        let record = record();
        let labels = DisplayLabels::business();

        let raw: Value = serde_json::to_value(&record).expect("raw");
        let display: Value = serde_json::to_value(labels.relabel(&record)).expect("display");

        for field in RULE_FIELDS {
            assert_eq!(raw[field], display[labels.label(field)], "value of {field} changed");
        }
        assert_eq!(display["Conviction"], "inf");
        assert!(display.get("support").is_none());
    }

    #[test]
    fn unmapped_fields_keep_their_names() {
        let labels = DisplayLabels::from_pairs([("lift", "Lift")]);
        let display: Value = serde_json::to_value(labels.relabel(&record())).expect("display");

        assert_eq!(display["Lift"], 2.5);
        assert_eq!(display["support"], 0.05);
        assert_eq!(display["antecedents"][1], "18:00-23:59");
    }
}
