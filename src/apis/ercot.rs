use super::SourceAdapter;
use crate::constants::{
    ERCOT_BA_NAME, ERCOT_GEN_HRLY_DOC, ERCOT_ID, ERCOT_LOAD_7DAY_DOC, ERCOT_RTM_DOC,
    ERCOT_WIND_HRLY_DOC,
};
use crate::error::Result;
use crate::pipeline::processing::assemble::RecordMeta;
use crate::pipeline::processing::extract::{DelimitedReport, LabelValueTable, RawRow, Shape};
use crate::pipeline::processing::mapper::{
    DstConvention, Field, FuelTags, LabelDictionary, LabelPattern, TimestampRule,
};
use crate::pipeline::schema::{DocumentSchema, Retrieval, SourceProfile};
use crate::types::{DataType, Interval, Market};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

static ERCOT_LABELS: Lazy<LabelDictionary> = Lazy::new(|| {
    use LabelPattern as P;
    LabelDictionary::new()
        .with(Field::Timestamp, [P::exact("Last Updated")])
        .with(Field::DeliveryDate, [P::exact("DeliveryDate"), P::exact("DELIVERY_DATE")])
        .with(Field::HourEnding, [P::exact("HourEnding"), P::exact("HOUR_ENDING")])
        .with(Field::HourBeginning, [P::exact("HOUR_BEGINNING")])
        .with(Field::DstFlag, [P::exact("DSTFlag")])
        .with(Field::Load, [P::exact("Actual System Demand"), P::exact("SystemTotal")])
        .with(Field::TotalGeneration, [P::exact("Actual System Demand")])
        .with(
            Field::WindGeneration,
            [
                P::exact("Total Wind Output"),
                P::exact("Total Wind Generation"),
                P::exact("ACTUAL_SYSTEM_WIDE"),
            ],
        )
        .with(Field::Frequency, [P::exact("Current Frequency")])
        .with(Field::TieFlow, [P::prefix("DC_")])
});

/// Built-in ERCOT profile: Central time, `Y` DST flags mark the repeated hour.
pub fn profile() -> SourceProfile {
    SourceProfile {
        id: ERCOT_ID.to_string(),
        ba_name: ERCOT_BA_NAME.to_string(),
        tz: chrono_tz::America::Chicago,
        dst: DstConvention::RepeatedHour,
        labels: ERCOT_LABELS.clone(),
        fuel_tags: FuelTags::new(),
    }
}

/// Historical reports ERCOT publishes as CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErcotReport {
    /// Seven-day actual load, hour-ending rows.
    Load7Day,
    /// Hourly wind production, 15-minute interval rows.
    WindHourly,
    /// State-estimator generation snapshot, one row.
    GenHourly,
}

impl ErcotReport {
    pub const ALL: [ErcotReport; 3] = [ErcotReport::Load7Day, ErcotReport::WindHourly, ErcotReport::GenHourly];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErcotReport::Load7Day => "load_7day",
            ErcotReport::WindHourly => "wind_hrly",
            ErcotReport::GenHourly => "gen_hrly",
        }
    }

    pub fn document_id(&self) -> &'static str {
        match self {
            ErcotReport::Load7Day => ERCOT_LOAD_7DAY_DOC,
            ErcotReport::WindHourly => ERCOT_WIND_HRLY_DOC,
            ErcotReport::GenHourly => ERCOT_GEN_HRLY_DOC,
        }
    }
}

impl fmt::Display for ErcotReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErcotReport {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ErcotReport::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()) || r.document_id() == s.trim())
            .ok_or_else(|| format!("unknown ERCOT report '{}'", s))
    }
}

fn documents() -> Vec<DocumentSchema> {
    vec![
        DocumentSchema {
            id: ERCOT_RTM_DOC.to_string(),
            file_name: "real_time_system_conditions.html".to_string(),
            retrieval: Retrieval::Snapshot,
            shape: Shape::HtmlLabelValue(LabelValueTable {
                header_marker: Some("Real-Time System Conditions".to_string()),
                label_cell: 0,
                value_offset: 1,
                prefix_markers: vec!["Last Updated".to_string()],
            }),
            timestamp: TimestampRule::Text {
                field: Field::Timestamp,
                dst_field: None,
            },
            required: HashMap::from([
                (DataType::Load, vec![Field::Load]),
                (DataType::Gen, vec![Field::WindGeneration, Field::TotalGeneration]),
                (DataType::Trade, vec![Field::TieFlow]),
                (DataType::Frequency, vec![Field::Frequency]),
            ]),
            meta: RecordMeta::new(ERCOT_BA_NAME, Market::RealTime5Min, Interval::FiveMin),
        },
        DocumentSchema {
            id: ERCOT_LOAD_7DAY_DOC.to_string(),
            file_name: "load_7day.csv".to_string(),
            retrieval: Retrieval::Report,
            shape: Shape::Delimited(DelimitedReport::default()),
            timestamp: TimestampRule::HourEnding {
                date: Field::DeliveryDate,
                hour: Field::HourEnding,
                dst_field: Some(Field::DstFlag),
            },
            required: HashMap::from([(DataType::Load, vec![Field::Load])]),
            meta: RecordMeta::new(ERCOT_BA_NAME, Market::RealTimeHourly, Interval::Hourly),
        },
        DocumentSchema {
            id: ERCOT_WIND_HRLY_DOC.to_string(),
            file_name: "wind_hrly.csv".to_string(),
            retrieval: Retrieval::Report,
            shape: Shape::Delimited(DelimitedReport::default()),
            timestamp: TimestampRule::IntervalStart {
                date: Field::DeliveryDate,
                time: Field::HourBeginning,
                dst_field: Some(Field::DstFlag),
            },
            required: HashMap::from([(DataType::Gen, vec![Field::WindGeneration])]),
            meta: RecordMeta::new(ERCOT_BA_NAME, Market::RealTime15Min, Interval::FifteenMin),
        },
        // Raw rows only, through `extract_report`. No query selects it, so the
        // timestamp rule and metadata just describe the report.
        DocumentSchema {
            id: ERCOT_GEN_HRLY_DOC.to_string(),
            file_name: "gen_hrly.csv".to_string(),
            retrieval: Retrieval::RawOnly,
            shape: Shape::Delimited(DelimitedReport::default()),
            timestamp: TimestampRule::Text {
                field: Field::Timestamp,
                dst_field: Some(Field::DstFlag),
            },
            required: HashMap::new(),
            meta: RecordMeta::new(ERCOT_BA_NAME, Market::RealTimeHourly, Interval::Hourly),
        },
    ]
}

/// ERCOT: the real-time system conditions page for `latest` queries, CSV
/// reports for time ranges.
pub struct ErcotAdapter {
    profile: SourceProfile,
    documents: Vec<DocumentSchema>,
}

impl Default for ErcotAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ErcotAdapter {
    pub fn new() -> Self {
        Self::with_profile(profile())
    }

    pub fn with_profile(profile: SourceProfile) -> Self {
        Self {
            profile,
            documents: documents(),
        }
    }

    /// Rows of a historical report exactly as published, labels untouched.
    pub fn extract_report(&self, kind: ErcotReport, document: &[u8]) -> Result<Vec<RawRow>> {
        self.extract(kind.document_id(), document)
    }
}

impl SourceAdapter for ErcotAdapter {
    fn profile(&self) -> &SourceProfile {
        &self.profile
    }

    fn documents(&self) -> &[DocumentSchema] {
        &self.documents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GridError;
    use crate::types::QueryOptions;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_latest_queries_use_snapshot_page() {
        let adapter = ErcotAdapter::new();
        for data in DataType::ALL {
            let request = adapter.configure(&QueryOptions::latest(data)).unwrap();
            assert_eq!(request.document, ERCOT_RTM_DOC);
            assert_eq!(request.file_name, "real_time_system_conditions.html");
        }
    }

    #[test]
    fn test_range_queries_use_reports() {
        let adapter = ErcotAdapter::new();
        let start = Utc.with_ymd_and_hms(2014, 9, 8, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2014, 9, 15, 0, 0, 0).unwrap();

        let load = adapter.configure(&QueryOptions::range(DataType::Load, start, end)).unwrap();
        assert_eq!(load.document, ERCOT_LOAD_7DAY_DOC);
        let generation = adapter.configure(&QueryOptions::range(DataType::Gen, start, end)).unwrap();
        assert_eq!(generation.document, ERCOT_WIND_HRLY_DOC);

        let err = adapter
            .configure(&QueryOptions::range(DataType::Trade, start, end))
            .unwrap_err();
        assert!(matches!(err, GridError::Unsupported { .. }));
    }

    #[test]
    fn test_report_names_parse() {
        assert_eq!("load_7day".parse::<ErcotReport>(), Ok(ErcotReport::Load7Day));
        assert_eq!("ercot:report:wind_hrly".parse::<ErcotReport>(), Ok(ErcotReport::WindHourly));
        assert!("wind_5min".parse::<ErcotReport>().is_err());
    }

    #[test]
    fn test_extract_report_keeps_published_labels() {
        let adapter = ErcotAdapter::new();
        let rows = adapter
            .extract_report(
                ErcotReport::GenHourly,
                b"SE_EXE_TIME_DST,SE_EXE_TIME,SE_MW\nN,09/15/2014 13:50:20,50123.4\n",
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        let labels: Vec<_> = rows[0].labels().collect();
        assert_eq!(labels, vec!["SE_EXE_TIME_DST", "SE_EXE_TIME", "SE_MW"]);
    }

    #[test]
    fn test_generation_report_is_never_planned() {
        let adapter = ErcotAdapter::new();
        let start = Utc.with_ymd_and_hms(2014, 9, 8, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2014, 9, 15, 0, 0, 0).unwrap();
        for data in DataType::ALL {
            for options in [QueryOptions::latest(data), QueryOptions::range(data, start, end)] {
                if let Ok(request) = adapter.configure(&options) {
                    assert_ne!(request.document, ERCOT_GEN_HRLY_DOC);
                }
            }
        }
        let gen_hrly = adapter.document(ERCOT_GEN_HRLY_DOC).unwrap();
        assert!(gen_hrly.data_types().is_empty());
    }

    #[test]
    fn test_dictionary_covers_only_mapped_documents() {
        let labels = &profile().labels;
        let row: RawRow = [("SE_EXE_TIME_DST", "N"), ("SE_EXE_TIME", "09/15/2014 13:50:20"), ("SE_MW", "50123.4")]
            .into_iter()
            .collect();
        for field in labels.fields() {
            assert!(labels.find(&row, field).is_none(), "{} matched a generation report label", field);
        }
    }
}
