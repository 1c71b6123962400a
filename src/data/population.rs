//! Population tables
//!
//! A population file is an array of records. Each record names its region in
//! one of a list of key fields (the first present one wins) and carries its
//! count in a value field. Counts may be numbers or numeric strings.

use crate::data::region::property_string;
use crate::data::DecodeError;
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Inclusive value range of a population table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub min: f64,
    pub max: f64,
}

impl Domain {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// A single-valued domain cannot be interpolated over
    pub fn is_degenerate(&self) -> bool {
        self.max <= self.min
    }

    /// Position of `value` within the domain, clamped to `0.0..=1.0`
    pub fn normalize(&self, value: f64) -> f64 {
        if self.is_degenerate() {
            return 0.0;
        }
        ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }

    fn include(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
}

/// Region key to population count, with the observed value range
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopulationDataset {
    population: FxHashMap<String, f64>,
    domain: Option<Domain>,
}

impl PopulationDataset {
    /// Builds a table; a repeated key keeps its last value
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        let mut dataset = Self::default();
        for (key, value) in entries {
            dataset.insert(key.into(), value);
        }
        dataset
    }

    fn insert(&mut self, key: String, value: f64) {
        match &mut self.domain {
            Some(domain) => domain.include(value),
            None => self.domain = Some(Domain::new(value, value)),
        }
        self.population.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.population.get(key).copied()
    }

    /// `None` when the table is empty
    pub fn domain(&self) -> Option<Domain> {
        self.domain
    }

    pub fn len(&self) -> usize {
        self.population.len()
    }

    pub fn is_empty(&self) -> bool {
        self.population.is_empty()
    }
}

/// Field layout of one population file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationDecoder {
    /// Candidate key fields, tried in order
    pub key_fields: Vec<String>,
    pub value_field: String,
}

impl PopulationDecoder {
    pub fn new<I, S>(key_fields: I, value_field: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key_fields: key_fields.into_iter().map(Into::into).collect(),
            value_field: value_field.into(),
        }
    }

    /// `{"country": .., "population": ..}`
    pub fn country() -> Self {
        Self::new(["country"], "population")
    }

    /// `{"STATE": .., "POPESTIMATE2019": ..}`
    pub fn state_estimate() -> Self {
        Self::new(["STATE"], "POPESTIMATE2019")
    }

    /// `{"subregion": .., "region": .., "population": ..}`; subregion wins when present
    pub fn subregion() -> Self {
        Self::new(["subregion", "region"], "population")
    }

    /// Decodes a raw population document.
    ///
    /// Records without a key or a numeric value are skipped with a warning.
    pub fn decode(&self, raw: serde_json::Value) -> Result<PopulationDataset, DecodeError> {
        let records = match raw {
            serde_json::Value::Array(records) => records,
            other => {
                return Err(DecodeError::UnexpectedType {
                    expected: "population array",
                    found: json_type(&other).to_string(),
                })
            }
        };

        let mut dataset = PopulationDataset::default();
        let mut skipped = 0usize;

        for record in &records {
            let key = self
                .key_fields
                .iter()
                .find_map(|field| record.get(field).and_then(property_string));
            let value = record.get(&self.value_field).and_then(numeric);

            match (key, value) {
                (Some(key), Some(value)) => dataset.insert(key, value),
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            log::warn!(
                "skipped {} of {} population records without '{}' or a {} key",
                skipped,
                records.len(),
                self.value_field,
                self.key_fields.join("/")
            );
        }
        log::debug!("decoded {} population entries", dataset.len());

        Ok(dataset)
    }
}

fn numeric(value: &serde_json::Value) -> Option<f64> {
    let n = match value {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
