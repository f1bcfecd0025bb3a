use super::{ExtractError, RawRow, XmlElementList};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::warn;

fn is_named(element: &BytesStart, name: &str) -> bool {
    element.local_name().as_ref() == name.as_bytes()
}

fn attributes(element: &BytesStart) -> RawRow {
    element
        .attributes()
        .filter_map(|attr| {
            let attr = match attr {
                Ok(attr) => attr,
                Err(e) => {
                    warn!(error = %e, "skipping malformed attribute");
                    return None;
                }
            };
            let name = std::str::from_utf8(attr.key.as_ref()).ok()?.to_string();
            let value = attr.unescape_value().ok()?.into_owned();
            Some((name, value))
        })
        .collect()
}

/// One row per `<element .../>` occurrence, attributes as labels.
///
/// The document element must be the declared root. Elements are read lazily
/// as rows are consumed; comments, CDATA and processing instructions never
/// produce rows.
pub(super) fn extract<'a>(
    document: &'a [u8],
    list: &XmlElementList,
) -> Result<impl Iterator<Item = RawRow> + 'a, ExtractError> {
    let text = std::str::from_utf8(document)
        .map_err(|e| ExtractError::Structure(format!("document is not UTF-8: {}", e)))?;
    let mut reader = Reader::from_str(text);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if is_named(&e, &list.root) {
                    break;
                }
                return Err(ExtractError::Structure(format!(
                    "root element <{}> not found, document element is <{}>",
                    list.root,
                    String::from_utf8_lossy(e.name().as_ref())
                )));
            }
            Ok(Event::Eof) => {
                return Err(ExtractError::Structure(format!("root element <{}> not found", list.root)));
            }
            Ok(_) => {}
            Err(e) => {
                return Err(ExtractError::Structure(format!(
                    "malformed XML before <{}> at byte {}: {}",
                    list.root,
                    reader.buffer_position(),
                    e
                )));
            }
        }
    }

    let element = list.element.clone();
    let mut finished = false;
    Ok(std::iter::from_fn(move || {
        while !finished {
            match reader.read_event() {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) if is_named(&e, &element) => {
                    let row = attributes(&e);
                    if !row.is_empty() {
                        return Some(row);
                    }
                }
                Ok(Event::Eof) => finished = true,
                Ok(_) => {}
                Err(e) => {
                    warn!(position = reader.buffer_position(), error = %e, "stopping at malformed XML");
                    finished = true;
                }
            }
        }
        None
    }))
}
