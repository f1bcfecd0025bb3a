use super::mapper::PartialRecord;
use crate::types::{
    DataType, Freq, FrequencyRecord, GenRecord, Interval, LoadRecord, Market, Record, TradeRecord,
};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Fixed per-document metadata merged into every record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMeta {
    pub ba_name: String,
    pub market: Market,
    pub interval: Interval,
}

impl RecordMeta {
    pub fn new(ba_name: impl Into<String>, market: Market, interval: Interval) -> Self {
        Self {
            ba_name: ba_name.into(),
            market,
            interval,
        }
    }

    /// Measured frequency when the row published one, nominal interval otherwise.
    fn freq(&self, partial: &PartialRecord) -> Freq {
        partial
            .frequency_hz
            .map(Freq::Measured)
            .unwrap_or(Freq::Nominal(self.interval))
    }
}

/// Merge `timestamp` and `meta` into each partial. A partial missing a field
/// its data type needs is dropped whole. Input order is preserved.
pub fn assemble(
    timestamp: DateTime<Utc>,
    partials: Vec<PartialRecord>,
    meta: &RecordMeta,
    data_type: DataType,
) -> Vec<Record> {
    partials
        .into_iter()
        .filter_map(|partial| {
            let record = build(timestamp, &partial, meta, data_type);
            if record.is_none() {
                debug!(data = %data_type, ?partial, "dropping incomplete record");
            }
            record
        })
        .collect()
}

fn build(
    timestamp: DateTime<Utc>,
    partial: &PartialRecord,
    meta: &RecordMeta,
    data_type: DataType,
) -> Option<Record> {
    let ba_name = meta.ba_name.clone();
    let market = meta.market;
    let freq = meta.freq(partial);
    Some(match data_type {
        DataType::Load => Record::Load(LoadRecord {
            timestamp,
            ba_name,
            load_mw: partial.load_mw?,
            freq,
            market,
        }),
        DataType::Gen => Record::Gen(GenRecord {
            timestamp,
            ba_name,
            gen_mw: partial.gen_mw?,
            fuel_name: partial.fuel?,
            freq,
            market,
        }),
        DataType::Trade => Record::Trade(TradeRecord {
            timestamp,
            ba_name,
            tie_name: partial.tie_name.clone()?,
            flow_mw: partial.flow_mw?,
            freq,
            market,
        }),
        DataType::Frequency => Record::Frequency(FrequencyRecord {
            timestamp,
            ba_name,
            freq: Freq::Measured(partial.frequency_hz?),
            market,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Fuel;
    use chrono::TimeZone;

    fn meta() -> RecordMeta {
        RecordMeta::new("ERCOT", Market::RealTime5Min, Interval::FiveMin)
    }

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2014, 9, 15, 18, 50, 20).unwrap()
    }

    #[test]
    fn test_generation_records_share_timestamp_and_keep_order() {
        let partials = vec![
            PartialRecord {
                gen_mw: Some(885.0),
                fuel: Some(Fuel::Wind),
                ..Default::default()
            },
            PartialRecord {
                gen_mw: Some(47796.0),
                fuel: Some(Fuel::Nonwind),
                ..Default::default()
            },
        ];
        let records = assemble(ts(), partials, &meta(), DataType::Gen);
        assert_eq!(records.len(), 2);
        let fuels: Vec<_> = records.iter().map(|r| r.as_gen().unwrap().fuel_name).collect();
        assert_eq!(fuels, vec![Fuel::Wind, Fuel::Nonwind]);
        assert!(records.iter().all(|r| r.timestamp() == ts()));
        assert!(records.iter().all(|r| r.ba_name() == "ERCOT"));
    }

    #[test]
    fn test_freq_prefers_measured_value() {
        let measured = PartialRecord {
            load_mw: Some(48681.0),
            frequency_hz: Some(59.998),
            ..Default::default()
        };
        let nominal = PartialRecord {
            load_mw: Some(31000.0),
            ..Default::default()
        };
        let records = assemble(ts(), vec![measured, nominal], &meta(), DataType::Load);
        assert_eq!(records[0].as_load().unwrap().freq, Freq::Measured(59.998));
        assert_eq!(records[1].as_load().unwrap().freq, Freq::Nominal(Interval::FiveMin));
    }

    #[test]
    fn test_incomplete_partials_are_dropped() {
        let partials = vec![
            PartialRecord {
                gen_mw: Some(10.0),
                ..Default::default()
            },
            PartialRecord {
                tie_name: Some("DC_E".into()),
                ..Default::default()
            },
        ];
        assert!(assemble(ts(), partials.clone(), &meta(), DataType::Gen).is_empty());
        assert!(assemble(ts(), partials.clone(), &meta(), DataType::Trade).is_empty());
        assert!(assemble(ts(), partials, &meta(), DataType::Frequency).is_empty());
    }

    #[test]
    fn test_serialized_keys_match_closed_set() {
        let partial = PartialRecord {
            tie_name: Some("DC_N".into()),
            flow_mw: Some(-29.0),
            ..Default::default()
        };
        let record = assemble(ts(), vec![partial], &meta(), DataType::Trade).remove(0);
        let json = serde_json::to_value(&record).unwrap();
        let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        let mut expected: Vec<_> = DataType::Trade.record_keys().iter().map(|k| k.to_string()).collect();
        expected.sort();
        assert_eq!(keys, expected);
        assert_eq!(json["freq"], "5m");
        assert_eq!(json["market"], "RT5M");
    }
}
