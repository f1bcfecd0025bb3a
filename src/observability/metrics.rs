//! Metrics for the parsing pipeline.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! embedding process installs a recorder.

use std::fmt;

/// Every metric name the crate records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    DocumentsParsed,
    DocumentsFailed,
    DocumentsEmpty,
    RowsExtracted,
    RowsSkipped,
    RecordsProduced,
    ParseDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::DocumentsParsed => "iso_parser_documents_parsed_total",
            MetricName::DocumentsFailed => "iso_parser_documents_failed_total",
            MetricName::DocumentsEmpty => "iso_parser_documents_empty_total",
            MetricName::RowsExtracted => "iso_parser_rows_extracted_total",
            MetricName::RowsSkipped => "iso_parser_rows_skipped_total",
            MetricName::RecordsProduced => "iso_parser_records_produced_total",
            MetricName::ParseDuration => "iso_parser_duration_seconds",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            DocumentsParsed,
            DocumentsFailed,
            DocumentsEmpty,
            RowsExtracted,
            RowsSkipped,
            RecordsProduced,
            ParseDuration,
        ]
        .into_iter()
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-document parse outcome counters.
pub struct ParserMetrics;

impl ParserMetrics {
    pub fn record_parse_success(
        source_id: &str,
        document: &str,
        rows: usize,
        skipped: usize,
        records: usize,
        duration_secs: f64,
    ) {
        let labels = [
            ("source", source_id.to_string()),
            ("document", document.to_string()),
        ];
        ::metrics::counter!(MetricName::DocumentsParsed.as_str(), &labels).increment(1);
        ::metrics::counter!(MetricName::RowsExtracted.as_str(), &labels).increment(rows as u64);
        ::metrics::counter!(MetricName::RowsSkipped.as_str(), &labels).increment(skipped as u64);
        ::metrics::counter!(MetricName::RecordsProduced.as_str(), &labels)
            .increment(records as u64);
        ::metrics::histogram!(MetricName::ParseDuration.as_str(), &labels).record(duration_secs);
    }

    pub fn record_parse_error(source_id: &str, document: &str, error_kind: &'static str) {
        let name = if error_kind == "empty_result" {
            MetricName::DocumentsEmpty
        } else {
            MetricName::DocumentsFailed
        };
        ::metrics::counter!(
            name.as_str(),
            "source" => source_id.to_string(),
            "document" => document.to_string(),
            "error" => error_kind
        )
        .increment(1);
    }
}
