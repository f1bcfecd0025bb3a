//! Runs one document through extraction, field mapping, timestamp resolution
//! and record assembly.

use super::processing::assemble::assemble;
use super::processing::extract::{extract, ExtractError, RawRow, Rows};
use super::processing::mapper::{Field, FieldMapper, MapError};
use super::processing::time::TimeNormalizer;
use super::schema::{DocumentSchema, SourceProfile};
use crate::error::{GridError, Result};
use crate::observability::metrics::ParserMetrics;
use crate::types::{DataType, QueryMode, Record};
use std::time::Instant;
use tracing::{debug, info, warn};

fn extraction_error(profile: &SourceProfile, schema: &DocumentSchema, err: ExtractError) -> GridError {
    match err {
        ExtractError::Structure(message) => GridError::parse(&profile.id, &schema.id, message),
        ExtractError::Empty => GridError::empty(&profile.id, &schema.id),
    }
}

/// Rows of `document` as the schema's shape reads them, without any mapping.
pub fn extract_rows<'a>(
    profile: &SourceProfile,
    schema: &DocumentSchema,
    document: &'a [u8],
) -> Result<Rows<'a>> {
    extract(document, &schema.shape).map_err(|e| extraction_error(profile, schema, e))
}

/// Parse `document` into records of `data`, keeping those inside `mode`'s window.
///
/// A row that fails to map or whose timestamp cannot be read is skipped. When
/// no row yields a record, the first row failure is returned, or
/// [`GridError::EmptyResult`] if there was none.
pub fn parse_document(
    profile: &SourceProfile,
    schema: &DocumentSchema,
    document: &[u8],
    data: DataType,
    mode: &QueryMode,
) -> Result<Vec<Record>> {
    let started = Instant::now();
    let outcome = run(profile, schema, document, data, mode);
    match &outcome {
        Ok(stats) => {
            info!(
                source = %profile.id,
                document = %schema.id,
                data = %data,
                rows = stats.rows,
                skipped = stats.skipped,
                records = stats.records.len(),
                "parsed document"
            );
            ParserMetrics::record_parse_success(
                &profile.id,
                &schema.id,
                stats.rows,
                stats.skipped,
                stats.records.len(),
                started.elapsed().as_secs_f64(),
            );
        }
        Err(e) => {
            warn!(source = %profile.id, document = %schema.id, error = %e, "document parse failed");
            ParserMetrics::record_parse_error(&profile.id, &schema.id, e.kind());
        }
    }
    outcome.map(|stats| stats.records)
}

struct ParseStats {
    rows: usize,
    skipped: usize,
    records: Vec<Record>,
}

fn run(
    profile: &SourceProfile,
    schema: &DocumentSchema,
    document: &[u8],
    data: DataType,
    mode: &QueryMode,
) -> Result<ParseStats> {
    let rows = extract_rows(profile, schema, document)?;
    let normalizer = TimeNormalizer::new(profile.tz);
    let mapper = FieldMapper::new(&profile.labels, &profile.fuel_tags, profile.dst);
    let required = schema.required_fields(data);

    let mut stats = ParseStats {
        rows: 0,
        skipped: 0,
        records: Vec::new(),
    };
    let mut assembled = 0usize;
    let mut first_failure: Option<GridError> = None;

    for (idx, row) in rows.enumerate() {
        stats.rows += 1;
        match row_records(profile, schema, &mapper, &normalizer, &row, data, required) {
            Ok(records) => {
                assembled += records.len();
                stats
                    .records
                    .extend(records.into_iter().filter(|r| mode.contains(&r.timestamp())));
            }
            Err(e) => {
                stats.skipped += 1;
                debug!(row = idx, error = %e, "skipping row");
                first_failure.get_or_insert(e);
            }
        }
    }

    if assembled == 0 {
        return Err(first_failure.unwrap_or_else(|| GridError::empty(&profile.id, &schema.id)));
    }
    if stats.skipped > 0 {
        warn!(
            source = %profile.id,
            document = %schema.id,
            skipped = stats.skipped,
            "some rows could not be mapped"
        );
    }
    Ok(stats)
}

fn row_records(
    profile: &SourceProfile,
    schema: &DocumentSchema,
    mapper: &FieldMapper<'_>,
    normalizer: &TimeNormalizer,
    row: &RawRow,
    data: DataType,
    required: &[Field],
) -> Result<Vec<Record>> {
    let unrecognized = |e: MapError| match e {
        MapError::UnrecognizedLabel(field) => GridError::UnrecognizedLabel {
            source_id: profile.id.clone(),
            document: schema.id.clone(),
            field: field.to_string(),
        },
    };

    let partials = mapper.map_row(row, data, required).map_err(unrecognized)?;
    if partials.is_empty() {
        return Ok(Vec::new());
    }
    let spec = mapper.timestamp(row, &schema.timestamp).map_err(unrecognized)?;
    let timestamp = normalizer
        .utcify(&spec)
        .map_err(|e| GridError::parse(&profile.id, &schema.id, e.to_string()))?;
    Ok(assemble(timestamp, partials, &schema.meta, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::assemble::RecordMeta;
    use crate::pipeline::processing::extract::{DelimitedReport, Shape};
    use crate::pipeline::processing::mapper::{
        DstConvention, FuelTags, LabelDictionary, LabelPattern, TimestampRule,
    };
    use crate::types::{Freq, Interval, Market};
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    fn profile() -> SourceProfile {
        SourceProfile {
            id: "TEST".into(),
            ba_name: "TEST".into(),
            tz: chrono_tz::America::Chicago,
            dst: DstConvention::RepeatedHour,
            labels: LabelDictionary::new()
                .with(Field::Timestamp, [LabelPattern::exact("When")])
                .with(Field::Load, [LabelPattern::exact("MW")]),
            fuel_tags: FuelTags::new(),
        }
    }

    fn schema() -> DocumentSchema {
        DocumentSchema {
            id: "test:csv".into(),
            file_name: "test.csv".into(),
            retrieval: crate::pipeline::schema::Retrieval::Report,
            shape: Shape::Delimited(DelimitedReport::default()),
            timestamp: TimestampRule::Text {
                field: Field::Timestamp,
                dst_field: None,
            },
            required: HashMap::from([(DataType::Load, vec![Field::Load])]),
            meta: RecordMeta::new("TEST", Market::RealTimeHourly, Interval::Hourly),
        }
    }

    fn range(from_hour: u32, to_hour: u32) -> QueryMode {
        QueryMode::Range {
            start_at: Utc.with_ymd_and_hms(2014, 9, 15, from_hour, 0, 0).unwrap(),
            end_at: Utc.with_ymd_and_hms(2014, 9, 15, to_hour, 0, 0).unwrap(),
        }
    }

    const DOC: &[u8] = b"When,MW\n09/15/2014 01:00,100\nnot a time,200\n09/15/2014 02:00,\n09/15/2014 03:00,300\n";

    #[test]
    fn test_bad_rows_are_skipped() {
        let records = parse_document(&profile(), &schema(), DOC, DataType::Load, &range(0, 23)).unwrap();
        let loads: Vec<_> = records.iter().map(|r| r.as_load().unwrap().load_mw).collect();
        assert_eq!(loads, vec![100.0, 300.0]);
        let first = records[0].as_load().unwrap();
        assert_eq!(first.timestamp, Utc.with_ymd_and_hms(2014, 9, 15, 6, 0, 0).unwrap());
        assert_eq!(first.freq, Freq::Nominal(Interval::Hourly));
    }

    #[test]
    fn test_range_filter_is_inclusive_and_may_empty_the_result() {
        let records = parse_document(&profile(), &schema(), DOC, DataType::Load, &range(6, 8)).unwrap();
        assert_eq!(records.len(), 2);
        let none = parse_document(&profile(), &schema(), DOC, DataType::Load, &range(12, 13)).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_all_rows_failing_surfaces_first_failure() {
        let doc = b"When,MW\nnonsense,1\n";
        let err = parse_document(&profile(), &schema(), doc, DataType::Load, &range(0, 23)).unwrap_err();
        assert_eq!(err.kind(), "parse");

        let doc = b"When,Other\n09/15/2014 01:00,1\n";
        let err = parse_document(&profile(), &schema(), doc, DataType::Load, &range(0, 23)).unwrap_err();
        assert!(matches!(err, GridError::UnrecognizedLabel { ref field, .. } if field == "load"));
    }

    #[test]
    fn test_no_usable_values_is_empty_result() {
        let doc = b"When,MW\n09/15/2014 01:00,\n";
        let err = parse_document(&profile(), &schema(), doc, DataType::Load, &range(0, 23)).unwrap_err();
        assert!(err.is_empty_result());

        let header_only = b"When,MW\n";
        let err = parse_document(&profile(), &schema(), header_only, DataType::Load, &range(0, 23)).unwrap_err();
        assert!(err.is_empty_result());
    }

    #[test]
    fn test_structural_failure_is_parse_error() {
        let err = parse_document(&profile(), &schema(), b"", DataType::Load, &range(0, 23)).unwrap_err();
        assert_eq!(err.kind(), "parse");
        assert!(err.to_string().contains("test:csv"));
    }
}
