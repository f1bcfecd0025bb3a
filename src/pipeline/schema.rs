//! Declarative description of operators and their documents.

use super::processing::assemble::RecordMeta;
use super::processing::extract::Shape;
use super::processing::mapper::{DstConvention, Field, FuelTags, LabelDictionary, TimestampRule};
use crate::types::{DataType, QueryMode};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::fmt;

/// Static per-operator context: who it is, where its clocks are, and how it labels things.
#[derive(Debug, Clone)]
pub struct SourceProfile {
    pub id: String,
    pub ba_name: String,
    pub tz: Tz,
    pub dst: DstConvention,
    pub labels: LabelDictionary,
    pub fuel_tags: FuelTags,
}

/// How a document is retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retrieval {
    /// Live snapshot, `latest` queries.
    Snapshot,
    /// Historical report covering a time range.
    Report,
    /// Not served to queries; extraction only.
    RawOnly,
}

impl Retrieval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Retrieval::Snapshot => "latest",
            Retrieval::Report => "range",
            Retrieval::RawOnly => "raw",
        }
    }

    pub fn serves(&self, mode: &QueryMode) -> bool {
        matches!(
            (self, mode),
            (Retrieval::Snapshot, QueryMode::Latest) | (Retrieval::Report, QueryMode::Range { .. })
        )
    }
}

/// Shape, timestamp rule, required fields and record metadata of one operator document.
#[derive(Debug, Clone)]
pub struct DocumentSchema {
    /// Stable identifier, e.g. `ercot:rtm`.
    pub id: String,
    /// Name a file-backed fetcher stores the document under.
    pub file_name: String,
    pub retrieval: Retrieval,
    pub shape: Shape,
    pub timestamp: TimestampRule,
    /// Fields a row must label for each data type the document serves.
    pub required: HashMap<DataType, Vec<Field>>,
    pub meta: RecordMeta,
}

impl DocumentSchema {
    pub fn data_types(&self) -> Vec<DataType> {
        DataType::ALL
            .into_iter()
            .filter(|d| self.required.contains_key(d))
            .collect()
    }

    pub fn serves(&self, data: DataType, mode: &QueryMode) -> bool {
        self.required.contains_key(&data) && self.retrieval.serves(mode)
    }

    pub fn required_fields(&self, data: DataType) -> &[Field] {
        self.required.get(&data).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// What an adapter asks the fetcher for, planned from validated options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRequest {
    pub source_id: String,
    pub document: String,
    pub file_name: String,
    pub data: DataType,
    pub mode: QueryMode,
}

impl DocumentRequest {
    pub fn new(profile: &SourceProfile, schema: &DocumentSchema, data: DataType, mode: QueryMode) -> Self {
        Self {
            source_id: profile.id.clone(),
            document: schema.id.clone(),
            file_name: schema.file_name.clone(),
            data,
            mode,
        }
    }
}

impl fmt::Display for DocumentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({} {})", self.source_id, self.document, self.data, self.mode.as_str())?;
        if let QueryMode::Range { start_at, end_at } = self.mode {
            write!(f, " {} .. {}", start_at.to_rfc3339(), end_at.to_rfc3339())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::extract::DelimitedReport;
    use crate::types::{Interval, Market};
    use chrono::{TimeZone, Utc};

    fn schema() -> DocumentSchema {
        DocumentSchema {
            id: "test:report".into(),
            file_name: "report.csv".into(),
            retrieval: Retrieval::Report,
            shape: Shape::Delimited(DelimitedReport::default()),
            timestamp: TimestampRule::Text {
                field: Field::Timestamp,
                dst_field: None,
            },
            required: HashMap::from([(DataType::Load, vec![Field::Load])]),
            meta: RecordMeta::new("TEST", Market::RealTimeHourly, Interval::Hourly),
        }
    }

    #[test]
    fn test_serves_only_declared_data_and_mode() {
        let s = schema();
        let range = QueryMode::Range {
            start_at: Utc.with_ymd_and_hms(2014, 9, 1, 0, 0, 0).unwrap(),
            end_at: Utc.with_ymd_and_hms(2014, 9, 2, 0, 0, 0).unwrap(),
        };
        assert!(s.serves(DataType::Load, &range));
        assert!(!s.serves(DataType::Load, &QueryMode::Latest));
        assert!(!s.serves(DataType::Gen, &range));
        assert_eq!(s.data_types(), vec![DataType::Load]);
        assert_eq!(s.required_fields(DataType::Gen), &[] as &[Field]);
    }

    #[test]
    fn test_raw_only_documents_serve_nothing() {
        assert!(!Retrieval::RawOnly.serves(&QueryMode::Latest));
    }
}
