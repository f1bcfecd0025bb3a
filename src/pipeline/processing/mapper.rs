//! Field mapping: operator labels to canonical fields, with numeric coercion
//! and categorical (fuel) tagging.

use super::extract::{normalize_label, RawRow};
use super::time::{DstHint, TimestampSpec};
use crate::types::{DataType, Fuel};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Canonical fields an operator label dictionary can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Timestamp,
    DeliveryDate,
    HourEnding,
    HourBeginning,
    DstFlag,
    Load,
    TotalGeneration,
    WindGeneration,
    FuelCategory,
    FuelGeneration,
    Frequency,
    TieFlow,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Timestamp => "timestamp",
            Field::DeliveryDate => "delivery_date",
            Field::HourEnding => "hour_ending",
            Field::HourBeginning => "hour_beginning",
            Field::DstFlag => "dst_flag",
            Field::Load => "load",
            Field::TotalGeneration => "total_generation",
            Field::WindGeneration => "wind_generation",
            Field::FuelCategory => "fuel_category",
            Field::FuelGeneration => "fuel_generation",
            Field::Frequency => "frequency",
            Field::TieFlow => "tie_flow",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a dictionary entry matches a row label.
///
/// Written as plain text (exact, whitespace and case insensitive), `text*`
/// (prefix) or `/regex/`.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "String")]
pub enum LabelPattern {
    Exact(String),
    Prefix(String),
    Regex(Regex),
}

impl LabelPattern {
    pub fn exact(label: &str) -> Self {
        LabelPattern::Exact(normalize_label(label).to_lowercase())
    }

    pub fn prefix(prefix: &str) -> Self {
        LabelPattern::Prefix(normalize_label(prefix).to_lowercase())
    }

    pub fn matches(&self, label: &str) -> bool {
        match self {
            LabelPattern::Exact(want) => normalize_label(label).to_lowercase() == *want,
            LabelPattern::Prefix(want) => normalize_label(label).to_lowercase().starts_with(want.as_str()),
            LabelPattern::Regex(re) => re.is_match(label),
        }
    }
}

impl FromStr for LabelPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() >= 2 && s.starts_with('/') && s.ends_with('/') {
            return Regex::new(&s[1..s.len() - 1])
                .map(LabelPattern::Regex)
                .map_err(|e| format!("invalid label regex {}: {}", s, e));
        }
        if let Some(prefix) = s.strip_suffix('*') {
            return Ok(LabelPattern::prefix(prefix));
        }
        if s.is_empty() {
            return Err("empty label pattern".to_string());
        }
        Ok(LabelPattern::exact(s))
    }
}

impl TryFrom<String> for LabelPattern {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Per-operator mapping from canonical field to the labels its documents use.
/// Pattern order is significant: earlier patterns win.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct LabelDictionary {
    entries: BTreeMap<Field, Vec<LabelPattern>>,
}

impl LabelDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, patterns: impl IntoIterator<Item = LabelPattern>) -> Self {
        self.entries.insert(field, patterns.into_iter().collect());
        self
    }

    pub fn patterns(&self, field: Field) -> &[LabelPattern] {
        self.entries.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.entries.keys().copied()
    }

    /// Entries in `overrides` replace the patterns for their field.
    pub fn merge(&mut self, overrides: LabelDictionary) {
        self.entries.extend(overrides.entries);
    }

    /// First `(label, value)` in `row` matched by the field's patterns.
    pub fn find<'r>(&self, row: &'r RawRow, field: Field) -> Option<(&'r str, &'r str)> {
        self.patterns(field)
            .iter()
            .find_map(|pattern| row.iter().find(|(label, _)| pattern.matches(label)))
    }

    /// Every `(label, value)` in `row` matched by any of the field's patterns, in row order.
    pub fn find_all<'r>(&self, row: &'r RawRow, field: Field) -> Vec<(&'r str, &'r str)> {
        let patterns = self.patterns(field);
        row.iter()
            .filter(|(label, _)| patterns.iter().any(|p| p.matches(label)))
            .collect()
    }
}

/// Operator category strings (upper-cased) to fuel tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct FuelTags {
    tags: BTreeMap<String, Fuel>,
}

impl FuelTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, category: &str, fuel: Fuel) -> Self {
        self.tags.insert(category.trim().to_uppercase(), fuel);
        self
    }

    pub fn tag(&self, category: &str) -> Option<Fuel> {
        self.tags.get(&category.trim().to_uppercase()).copied()
    }

    pub fn merge(&mut self, overrides: FuelTags) {
        self.tags
            .extend(overrides.tags.into_iter().map(|(k, v)| (k.trim().to_uppercase(), v)));
    }
}

/// What a `Y`/`N` DST flag column means for an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DstConvention {
    /// `Y` marks the second, standard-time pass through a repeated hour.
    RepeatedHour,
    /// `Y` means daylight saving time is in effect.
    Daylight,
}

impl DstConvention {
    pub fn hint(&self, raw: &str) -> Option<DstHint> {
        let flag = match raw.trim().to_ascii_uppercase().as_str() {
            "Y" | "YES" | "TRUE" | "1" => true,
            "N" | "NO" | "FALSE" | "0" => false,
            _ => return None,
        };
        Some(match (self, flag) {
            (DstConvention::RepeatedHour, true) => DstHint::Standard,
            (DstConvention::RepeatedHour, false) => DstHint::Daylight,
            (DstConvention::Daylight, true) => DstHint::Daylight,
            (DstConvention::Daylight, false) => DstHint::Standard,
        })
    }
}

/// Where a row's timestamp lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampRule {
    Text {
        field: Field,
        dst_field: Option<Field>,
    },
    HourEnding {
        date: Field,
        hour: Field,
        dst_field: Option<Field>,
    },
    IntervalStart {
        date: Field,
        time: Field,
        dst_field: Option<Field>,
    },
}

/// Mapped values for one output record, before timestamp and metadata are merged in.
/// `None` means the field is not available in the row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialRecord {
    pub load_mw: Option<f64>,
    pub gen_mw: Option<f64>,
    pub fuel: Option<Fuel>,
    pub tie_name: Option<String>,
    pub flow_mw: Option<f64>,
    pub frequency_hz: Option<f64>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    #[error("required field '{0}' has no matching label")]
    UnrecognizedLabel(Field),
}

/// Strip thousands separators and whitespace, then parse. Blank or
/// non-numeric text is "not available", never zero.
pub fn coerce_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != '\u{a0}')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub struct FieldMapper<'p> {
    labels: &'p LabelDictionary,
    fuel_tags: &'p FuelTags,
    dst: DstConvention,
}

impl<'p> FieldMapper<'p> {
    pub fn new(labels: &'p LabelDictionary, fuel_tags: &'p FuelTags, dst: DstConvention) -> Self {
        Self {
            labels,
            fuel_tags,
            dst,
        }
    }

    fn number(&self, row: &RawRow, field: Field) -> Option<f64> {
        let (label, raw) = self.labels.find(row, field)?;
        let value = coerce_number(raw);
        if value.is_none() {
            debug!(%field, label, raw, "skipping non-numeric value");
        }
        value
    }

    fn text<'r>(&self, row: &'r RawRow, field: Field) -> Option<&'r str> {
        self.labels
            .find(row, field)
            .map(|(_, v)| v)
            .filter(|v| !v.is_empty())
    }

    /// Map one row to zero or more partial records for `data_type`.
    ///
    /// Fails only when a field listed in `required` has no matching label.
    pub fn map_row(
        &self,
        row: &RawRow,
        data_type: DataType,
        required: &[Field],
    ) -> Result<Vec<PartialRecord>, MapError> {
        if let Some(missing) = required.iter().find(|f| self.labels.find(row, **f).is_none()) {
            return Err(MapError::UnrecognizedLabel(*missing));
        }

        let frequency_hz = self.number(row, Field::Frequency);
        let partials = match data_type {
            DataType::Load => self
                .number(row, Field::Load)
                .map(|load| PartialRecord {
                    load_mw: Some(load),
                    frequency_hz,
                    ..Default::default()
                })
                .into_iter()
                .collect(),
            DataType::Gen => self.map_generation(row, frequency_hz),
            DataType::Trade => self
                .labels
                .find_all(row, Field::TieFlow)
                .into_iter()
                .filter_map(|(label, raw)| {
                    let flow = coerce_number(raw)?;
                    let tie = label.split_whitespace().next()?.to_string();
                    Some(PartialRecord {
                        tie_name: Some(tie),
                        flow_mw: Some(flow),
                        frequency_hz,
                        ..Default::default()
                    })
                })
                .collect(),
            DataType::Frequency => frequency_hz
                .map(|hz| PartialRecord {
                    frequency_hz: Some(hz),
                    ..Default::default()
                })
                .into_iter()
                .collect(),
        };
        Ok(partials)
    }

    fn map_generation(&self, row: &RawRow, frequency_hz: Option<f64>) -> Vec<PartialRecord> {
        let fuel_record = |fuel: Fuel, mw: f64| PartialRecord {
            gen_mw: Some(mw),
            fuel: Some(fuel),
            frequency_hz,
            ..Default::default()
        };

        // Categorical rows: one fuel per row, named by a category column.
        if let Some(category) = self.text(row, Field::FuelCategory) {
            let Some(fuel) = self.fuel_tags.tag(category) else {
                debug!(category, "skipping unknown fuel category");
                return Vec::new();
            };
            return self
                .number(row, Field::FuelGeneration)
                .map(|mw| fuel_record(fuel, mw))
                .into_iter()
                .collect();
        }

        // Columnar rows: wind directly, non-wind as total minus wind. Tie
        // flows in the same row are imports, so generation is total net of them.
        let wind = self.number(row, Field::WindGeneration);
        let total = self.number(row, Field::TotalGeneration);
        let mut out = Vec::new();
        if let Some(wind) = wind {
            out.push(fuel_record(Fuel::Wind, wind));
            if let Some(total) = total {
                let generated = total - self.net_interchange(row);
                out.push(fuel_record(Fuel::Nonwind, generated - wind));
            }
        } else if total.is_some() {
            debug!("total generation without a wind split; no fuel records");
        }
        out
    }

    /// Sum of the row's tie flows; positive means net import.
    fn net_interchange(&self, row: &RawRow) -> f64 {
        self.labels
            .find_all(row, Field::TieFlow)
            .into_iter()
            .filter_map(|(_, raw)| coerce_number(raw))
            .sum()
    }

    /// Build the row's [`TimestampSpec`] according to `rule`.
    pub fn timestamp(&self, row: &RawRow, rule: &TimestampRule) -> Result<TimestampSpec, MapError> {
        let required = |field: Field| {
            self.text(row, field)
                .map(str::to_string)
                .ok_or(MapError::UnrecognizedLabel(field))
        };
        let hint = |dst_field: &Option<Field>| {
            dst_field
                .and_then(|f| self.text(row, f))
                .and_then(|raw| self.dst.hint(raw))
        };
        Ok(match rule {
            TimestampRule::Text { field, dst_field } => TimestampSpec::Text {
                text: required(*field)?,
                dst: hint(dst_field),
            },
            TimestampRule::HourEnding {
                date,
                hour,
                dst_field,
            } => TimestampSpec::HourEnding {
                date: required(*date)?,
                hour_ending: required(*hour)?,
                dst: hint(dst_field),
            },
            TimestampRule::IntervalStart {
                date,
                time,
                dst_field,
            } => TimestampSpec::IntervalStart {
                date: required(*date)?,
                time: required(*time)?,
                dst: hint(dst_field),
            },
        })
    }
}
