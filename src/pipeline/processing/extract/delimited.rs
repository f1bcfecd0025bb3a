use super::{normalize_label, DelimitedReport, ExtractError, RawRow};
use csv::{ReaderBuilder, Trim};
use tracing::warn;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Header row defines the labels; every later record becomes one row.
/// Records with a different field count than the header are skipped.
pub(super) fn extract<'a>(
    document: &'a [u8],
    report: &DelimitedReport,
) -> Result<impl Iterator<Item = RawRow> + 'a, ExtractError> {
    let body = document.strip_prefix(UTF8_BOM).unwrap_or(document);
    let mut reader = ReaderBuilder::new()
        .delimiter(report.delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(body);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ExtractError::Structure(format!("unreadable header row: {}", e)))?
        .iter()
        .map(normalize_label)
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ExtractError::Structure("missing header row".to_string()));
    }

    let width = headers.len();
    Ok(reader
        .into_records()
        .enumerate()
        .filter_map(move |(idx, record)| match record {
            Ok(record) if record.len() == width => Some(
                headers
                    .iter()
                    .zip(record.iter())
                    .collect::<RawRow>(),
            ),
            Ok(record) => {
                warn!(
                    record = idx + 1,
                    expected = width,
                    found = record.len(),
                    "skipping ragged report row"
                );
                None
            }
            Err(e) => {
                warn!(record = idx + 1, error = %e, "skipping unreadable report row");
                None
            }
        }))
}
