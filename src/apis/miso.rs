use super::SourceAdapter;
use crate::constants::{MISO_BA_NAME, MISO_FUEL_MIX_DOC, MISO_ID};
use crate::pipeline::processing::assemble::RecordMeta;
use crate::pipeline::processing::extract::{Shape, XmlElementList};
use crate::pipeline::processing::mapper::{
    DstConvention, Field, FuelTags, LabelDictionary, LabelPattern, TimestampRule,
};
use crate::pipeline::schema::{DocumentSchema, Retrieval, SourceProfile};
use crate::types::{DataType, Fuel, Interval, Market};
use once_cell::sync::Lazy;
use std::collections::HashMap;

static MISO_LABELS: Lazy<LabelDictionary> = Lazy::new(|| {
    LabelDictionary::new()
        .with(Field::Timestamp, [LabelPattern::exact("INTERVALEST")])
        .with(Field::FuelCategory, [LabelPattern::exact("CATEGORY")])
        .with(Field::FuelGeneration, [LabelPattern::exact("ACT")])
});

static MISO_FUEL_TAGS: Lazy<FuelTags> = Lazy::new(|| {
    FuelTags::new()
        .with("COAL", Fuel::Coal)
        .with("GAS", Fuel::Natgas)
        .with("NUCLEAR", Fuel::Nuclear)
        .with("HYDRO", Fuel::Hydro)
        .with("WIND", Fuel::Wind)
        .with("SOLAR", Fuel::Solar)
        .with("OTHER", Fuel::Other)
});

/// MISO publishes Eastern Standard Time all year, so the zone is a fixed UTC-5.
pub fn profile() -> SourceProfile {
    SourceProfile {
        id: MISO_ID.to_string(),
        ba_name: MISO_BA_NAME.to_string(),
        tz: chrono_tz::Etc::GMTPlus5,
        dst: DstConvention::Daylight,
        labels: MISO_LABELS.clone(),
        fuel_tags: MISO_FUEL_TAGS.clone(),
    }
}

fn documents() -> Vec<DocumentSchema> {
    vec![DocumentSchema {
        id: MISO_FUEL_MIX_DOC.to_string(),
        file_name: "fuel_mix.xml".to_string(),
        retrieval: Retrieval::Snapshot,
        shape: Shape::XmlElements(XmlElementList {
            root: "Fuel".to_string(),
            element: "Type".to_string(),
        }),
        timestamp: TimestampRule::Text {
            field: Field::Timestamp,
            dst_field: None,
        },
        required: HashMap::from([(DataType::Gen, vec![Field::FuelCategory, Field::FuelGeneration])]),
        meta: RecordMeta::new(MISO_BA_NAME, Market::RealTime5Min, Interval::FiveMin),
    }]
}

/// MISO: real-time fuel mix only.
pub struct MisoAdapter {
    profile: SourceProfile,
    documents: Vec<DocumentSchema>,
}

impl Default for MisoAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MisoAdapter {
    pub fn new() -> Self {
        Self::with_profile(profile())
    }

    pub fn with_profile(profile: SourceProfile) -> Self {
        Self {
            profile,
            documents: documents(),
        }
    }
}

impl SourceAdapter for MisoAdapter {
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
    use crate::pipeline::processing::time::TimeNormalizer;
    use crate::types::{Freq, QueryOptions};
    use chrono::{TimeZone, Utc};

    const FUEL_MIX: &[u8] = br#"<?xml version="1.0" encoding="utf-8"?>
<Fuel>
  <Type INTERVALEST="2014-05-03T01:45:00" CATEGORY="COAL" ACT="38143" />
  <Type INTERVALEST="2014-05-03T01:45:00" CATEGORY="GAS" ACT="6200" />
  <Type INTERVALEST="2014-05-03T01:45:00" CATEGORY="WIND" ACT="9001" />
  <Type INTERVALEST="2014-05-03T01:45:00" CATEGORY="UNKNOWN" ACT="5" />
</Fuel>"#;

    #[test]
    fn test_utcify_fixed_offset() {
        let tn = TimeNormalizer::new(profile().tz);
        assert_eq!(
            tn.utcify_str("2014-05-03T01:45:00").unwrap(),
            Utc.with_ymd_and_hms(2014, 5, 3, 6, 45, 0).unwrap()
        );
    }

    #[test]
    fn test_fuel_mix_one_record_per_known_category() {
        let adapter = MisoAdapter::new();
        let request = adapter.configure(&QueryOptions::latest(DataType::Gen)).unwrap();
        let records = adapter.parse(&request, FUEL_MIX).unwrap();
        let fuels: Vec<_> = records
            .iter()
            .map(|r| {
                let g = r.as_gen().unwrap();
                (g.fuel_name, g.gen_mw)
            })
            .collect();
        assert_eq!(
            fuels,
            vec![(Fuel::Coal, 38143.0), (Fuel::Natgas, 6200.0), (Fuel::Wind, 9001.0)]
        );
        let first = records[0].as_gen().unwrap();
        assert_eq!(first.timestamp, Utc.with_ymd_and_hms(2014, 5, 3, 6, 45, 0).unwrap());
        assert_eq!(first.freq, Freq::Nominal(Interval::FiveMin));
        assert_eq!(first.market, Market::RealTime5Min);
        assert_eq!(first.ba_name, "MISO");
    }

    #[test]
    fn test_only_latest_generation_is_published() {
        let adapter = MisoAdapter::new();
        assert!(matches!(
            adapter.configure(&QueryOptions::latest(DataType::Load)),
            Err(GridError::Unsupported { .. })
        ));
        let start = Utc.with_ymd_and_hms(2014, 5, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            adapter.configure(&QueryOptions::range(DataType::Gen, start, start)),
            Err(GridError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_error_page_is_parse_error() {
        let adapter = MisoAdapter::new();
        let request = adapter.configure(&QueryOptions::latest(DataType::Gen)).unwrap();
        let err = adapter
            .parse(&request, b"<html><body>Service Unavailable</body></html>")
            .unwrap_err();
        assert_eq!(err.kind(), "parse");
    }
}
