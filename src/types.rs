use crate::error::{GridError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which kind of measurement a query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Load,
    Gen,
    Trade,
    Frequency,
}

impl DataType {
    pub const ALL: [DataType; 4] = [
        DataType::Load,
        DataType::Gen,
        DataType::Trade,
        DataType::Frequency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Load => "load",
            DataType::Gen => "gen",
            DataType::Trade => "trade",
            DataType::Frequency => "frequency",
        }
    }

    /// The closed key set every record of this type serializes to.
    pub fn record_keys(&self) -> &'static [&'static str] {
        match self {
            DataType::Load => &["timestamp", "ba_name", "load_MW", "freq", "market"],
            DataType::Gen => &["timestamp", "ba_name", "gen_MW", "fuel_name", "freq", "market"],
            DataType::Trade => &["timestamp", "ba_name", "tie_name", "flow_MW", "freq", "market"],
            DataType::Frequency => &["timestamp", "ba_name", "freq", "market"],
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "load" => Ok(DataType::Load),
            "gen" | "generation" | "genmix" => Ok(DataType::Gen),
            "trade" => Ok(DataType::Trade),
            "frequency" | "freq" => Ok(DataType::Frequency),
            other => Err(format!(
                "unknown data type '{}' (expected load, gen, trade or frequency)",
                other
            )),
        }
    }
}

/// Market a measurement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Market {
    #[serde(rename = "RT5M")]
    RealTime5Min,
    #[serde(rename = "RTPD")]
    RealTime15Min,
    #[serde(rename = "RTHR")]
    RealTimeHourly,
    #[serde(rename = "DAHR")]
    DayAheadHourly,
}

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::RealTime5Min => "RT5M",
            Market::RealTime15Min => "RTPD",
            Market::RealTimeHourly => "RTHR",
            Market::DayAheadHourly => "DAHR",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nominal sampling interval of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "5m")]
    FiveMin,
    #[serde(rename = "15m")]
    FifteenMin,
    #[serde(rename = "1hr")]
    Hourly,
}

/// The `freq` field of a record.
///
/// Snapshot documents that publish the measured system frequency carry it
/// here in Hz; everything else carries the document's nominal interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Freq {
    Measured(f64),
    Nominal(Interval),
}

impl Freq {
    pub fn hz(&self) -> Option<f64> {
        match self {
            Freq::Measured(hz) => Some(*hz),
            Freq::Nominal(_) => None,
        }
    }
}

/// Fixed set of fuel categories a generation record may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fuel {
    Wind,
    Nonwind,
    Coal,
    Natgas,
    Nuclear,
    Hydro,
    Solar,
    Other,
}

impl Fuel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Fuel::Wind => "wind",
            Fuel::Nonwind => "nonwind",
            Fuel::Coal => "coal",
            Fuel::Natgas => "natgas",
            Fuel::Nuclear => "nuclear",
            Fuel::Hydro => "hydro",
            Fuel::Solar => "solar",
            Fuel::Other => "other",
        }
    }
}

impl fmt::Display for Fuel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options a caller hands to a source adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub data: DataType,
    pub latest: bool,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

/// Validated form of [`QueryOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Latest,
    Range {
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    },
}

impl QueryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::Latest => "latest",
            QueryMode::Range { .. } => "range",
        }
    }

    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        match self {
            QueryMode::Latest => true,
            QueryMode::Range { start_at, end_at } => start_at <= ts && ts <= end_at,
        }
    }
}

impl QueryOptions {
    pub fn latest(data: DataType) -> Self {
        Self {
            data,
            latest: true,
            start_at: None,
            end_at: None,
        }
    }

    pub fn range(data: DataType, start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> Self {
        Self {
            data,
            latest: false,
            start_at: Some(start_at),
            end_at: Some(end_at),
        }
    }

    pub fn mode(&self) -> Result<QueryMode> {
        match (self.latest, self.start_at, self.end_at) {
            (true, None, None) => Ok(QueryMode::Latest),
            (true, _, _) => Err(GridError::InvalidOptions(
                "latest cannot be combined with start_at/end_at".into(),
            )),
            (false, Some(start_at), Some(end_at)) => {
                if start_at > end_at {
                    return Err(GridError::InvalidOptions(format!(
                        "start_at {} is after end_at {}",
                        start_at, end_at
                    )));
                }
                Ok(QueryMode::Range { start_at, end_at })
            }
            (false, None, None) => Err(GridError::InvalidOptions(
                "either latest or a start_at/end_at range is required".into(),
            )),
            (false, _, _) => Err(GridError::InvalidOptions(
                "start_at and end_at must be given together".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadRecord {
    pub timestamp: DateTime<Utc>,
    pub ba_name: String,
    #[serde(rename = "load_MW")]
    pub load_mw: f64,
    pub freq: Freq,
    pub market: Market,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenRecord {
    pub timestamp: DateTime<Utc>,
    pub ba_name: String,
    #[serde(rename = "gen_MW")]
    pub gen_mw: f64,
    pub fuel_name: Fuel,
    pub freq: Freq,
    pub market: Market,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub ba_name: String,
    pub tie_name: String,
    #[serde(rename = "flow_MW")]
    pub flow_mw: f64,
    pub freq: Freq,
    pub market: Market,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyRecord {
    pub timestamp: DateTime<Utc>,
    pub ba_name: String,
    pub freq: Freq,
    pub market: Market,
}

/// One normalized output record. Serializes flat, with exactly the key set
/// of its data type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Load(LoadRecord),
    Gen(GenRecord),
    Trade(TradeRecord),
    Frequency(FrequencyRecord),
}

impl Record {
    pub fn data_type(&self) -> DataType {
        match self {
            Record::Load(_) => DataType::Load,
            Record::Gen(_) => DataType::Gen,
            Record::Trade(_) => DataType::Trade,
            Record::Frequency(_) => DataType::Frequency,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Record::Load(r) => r.timestamp,
            Record::Gen(r) => r.timestamp,
            Record::Trade(r) => r.timestamp,
            Record::Frequency(r) => r.timestamp,
        }
    }

    pub fn ba_name(&self) -> &str {
        match self {
            Record::Load(r) => &r.ba_name,
            Record::Gen(r) => &r.ba_name,
            Record::Trade(r) => &r.ba_name,
            Record::Frequency(r) => &r.ba_name,
        }
    }

    pub fn keys(&self) -> &'static [&'static str] {
        self.data_type().record_keys()
    }

    pub fn as_load(&self) -> Option<&LoadRecord> {
        match self {
            Record::Load(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_gen(&self) -> Option<&GenRecord> {
        match self {
            Record::Gen(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_trade(&self) -> Option<&TradeRecord> {
        match self {
            Record::Trade(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_frequency(&self) -> Option<&FrequencyRecord> {
        match self {
            Record::Frequency(r) => Some(r),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_data_type_parses_aliases() {
        assert_eq!("gen".parse::<DataType>().unwrap(), DataType::Gen);
        assert_eq!("Generation".parse::<DataType>().unwrap(), DataType::Gen);
        assert_eq!("freq".parse::<DataType>().unwrap(), DataType::Frequency);
        assert!("price".parse::<DataType>().is_err());
    }

    #[test]
    fn test_freq_serializes_as_number_or_interval() {
        assert_eq!(serde_json::to_value(Freq::Measured(59.998)).unwrap(), serde_json::json!(59.998));
        assert_eq!(serde_json::to_value(Freq::Nominal(Interval::Hourly)).unwrap(), serde_json::json!("1hr"));
    }

    #[test]
    fn test_options_require_latest_or_range() {
        let start = Utc.with_ymd_and_hms(2014, 9, 15, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2014, 9, 16, 0, 0, 0).unwrap();

        assert_eq!(QueryOptions::latest(DataType::Load).mode().unwrap(), QueryMode::Latest);
        assert!(matches!(
            QueryOptions::range(DataType::Load, start, end).mode().unwrap(),
            QueryMode::Range { .. }
        ));

        let mut neither = QueryOptions::latest(DataType::Load);
        neither.latest = false;
        assert!(matches!(neither.mode(), Err(GridError::InvalidOptions(_))));

        let backwards = QueryOptions::range(DataType::Load, end, start);
        assert!(matches!(backwards.mode(), Err(GridError::InvalidOptions(_))));

        let mut both = QueryOptions::range(DataType::Load, start, end);
        both.latest = true;
        assert!(matches!(both.mode(), Err(GridError::InvalidOptions(_))));
    }

    #[test]
    fn test_range_is_inclusive() {
        let start = Utc.with_ymd_and_hms(2014, 9, 15, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2014, 9, 16, 0, 0, 0).unwrap();
        let mode = QueryMode::Range { start_at: start, end_at: end };
        assert!(mode.contains(&start));
        assert!(mode.contains(&end));
        assert!(!mode.contains(&(end + chrono::Duration::seconds(1))));
    }
}
