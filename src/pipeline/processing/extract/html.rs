use super::{normalize_label, ExtractError, LabelValueTable, RawRow};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static CSS selector")
}

fn cell_text(cell: &ElementRef) -> String {
    normalize_label(&cell.text().collect::<String>())
}

/// Collapse a label/value table into a single snapshot row.
///
/// `<th>` rows are section headers and carry no data. In data rows the label
/// is the `label_cell`-th `<td>` and the value sits `value_offset` cells to its
/// right, whatever the colspans say.
pub(super) fn extract_label_value(
    document: &[u8],
    table: &LabelValueTable,
) -> Result<Option<RawRow>, ExtractError> {
    let html = String::from_utf8_lossy(document);
    let parsed = Html::parse_document(&html);
    let table_sel = selector("table");
    let th_sel = selector("th");
    let tr_sel = selector("tr");
    let td_sel = selector("td");

    let mut tables = parsed.select(&table_sel).peekable();
    if tables.peek().is_none() {
        return Err(ExtractError::Structure("no <table> element".to_string()));
    }

    let chosen = match &table.header_marker {
        Some(marker) => {
            let wanted = marker.to_lowercase();
            tables
                .find(|t| {
                    t.select(&th_sel)
                        .any(|th| cell_text(&th).to_lowercase().contains(&wanted))
                })
                .ok_or_else(|| ExtractError::Structure(format!("no table with header '{}'", marker)))?
        }
        None => tables
            .next()
            .ok_or_else(|| ExtractError::Structure("no <table> element".to_string()))?,
    };

    let mut pairs: Vec<(String, String)> = Vec::new();
    for (idx, tr) in chosen.select(&tr_sel).enumerate() {
        let cells: Vec<String> = tr.select(&td_sel).map(|td| cell_text(&td)).collect();
        if cells.is_empty() {
            continue;
        }

        if let Some((marker, rest)) = split_prefix(&cells[0], &table.prefix_markers) {
            pairs.push((marker, rest));
            continue;
        }

        let value_cell = table.label_cell + table.value_offset;
        match (cells.get(table.label_cell), cells.get(value_cell)) {
            (Some(label), Some(value)) if !label.is_empty() => {
                pairs.push((label.clone(), value.clone()));
            }
            _ => debug!(row = idx, cells = cells.len(), "skipping table row without label/value pair"),
        }
    }

    if pairs.is_empty() {
        return Ok(None);
    }
    Ok(Some(pairs.into_iter().collect()))
}

fn split_prefix(text: &str, markers: &[String]) -> Option<(String, String)> {
    markers.iter().find_map(|marker| {
        let head = text.get(..marker.len())?;
        if head.eq_ignore_ascii_case(marker) {
            Some((marker.clone(), text[marker.len()..].trim().to_string()))
        } else {
            None
        }
    })
}
