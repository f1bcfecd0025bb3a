//! Table extraction: raw document bytes to a single-pass sequence of [`RawRow`]s.
//!
//! The shape of a document is declared up front (see [`Shape`]); extraction
//! pairs labels with values by position and never looks at what the labels say.

mod delimited;
mod html;
mod xml;

use std::fmt;
use std::iter::Peekable;
use thiserror::Error;

/// One extracted row: label to raw string value, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    cells: Vec<(String, String)>,
}

impl RawRow {
    /// Value of the first cell whose label equals `label` after whitespace
    /// normalization.
    pub fn get(&self, label: &str) -> Option<&str> {
        let wanted = normalize_label(label);
        self.cells
            .iter()
            .find(|(l, _)| *l == wanted)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(l, _)| l.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<L: AsRef<str>, V: AsRef<str>> FromIterator<(L, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (L, V)>>(iter: I) -> Self {
        Self {
            cells: iter
                .into_iter()
                .map(|(l, v)| (normalize_label(l.as_ref()), v.as_ref().trim().to_string()))
                .collect(),
        }
    }
}

/// Collapse runs of whitespace (including non-breaking spaces) and trim.
pub fn normalize_label(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Declared structure of a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    HtmlLabelValue(LabelValueTable),
    Delimited(DelimitedReport),
    XmlElements(XmlElementList),
}

impl Shape {
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::HtmlLabelValue(_) => "html_label_value",
            Shape::Delimited(_) => "delimited",
            Shape::XmlElements(_) => "xml_elements",
        }
    }
}

/// An HTML table of `label | value` rows collapsed into one snapshot row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelValueTable {
    /// Text a `<th>` of the wanted table must contain.
    pub header_marker: Option<String>,
    /// Index of the label among a row's `<td>` cells.
    pub label_cell: usize,
    /// Distance from the label cell to its value cell.
    pub value_offset: usize,
    /// Single-cell rows starting with one of these yield `(marker, rest)`.
    pub prefix_markers: Vec<String>,
}

/// A delimited report whose first line is the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedReport {
    pub delimiter: u8,
}

impl Default for DelimitedReport {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// A flat list of XML elements under a root, one row per element, attributes as labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElementList {
    pub root: String,
    pub element: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// A structural marker the shape requires is missing.
    #[error("{0}")]
    Structure(String),
    /// Well-formed, but not a single data row.
    #[error("document contains no data rows")]
    Empty,
}

/// Lazy, single-pass sequence of rows from one document.
pub struct Rows<'a> {
    inner: Peekable<Box<dyn Iterator<Item = RawRow> + 'a>>,
}

impl Iterator for Rows<'_> {
    type Item = RawRow;

    fn next(&mut self) -> Option<RawRow> {
        self.inner.next()
    }
}

impl fmt::Debug for Rows<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rows").finish_non_exhaustive()
    }
}

/// Extract rows from `document` according to `shape`.
///
/// Fails with [`ExtractError::Structure`] when the shape's markers are absent
/// and with [`ExtractError::Empty`] when there is no data row at all.
pub fn extract<'a>(document: &'a [u8], shape: &Shape) -> Result<Rows<'a>, ExtractError> {
    let rows: Box<dyn Iterator<Item = RawRow> + 'a> = match shape {
        Shape::HtmlLabelValue(table) => Box::new(html::extract_label_value(document, table)?.into_iter()),
        Shape::Delimited(report) => Box::new(delimited::extract(document, report)?),
        Shape::XmlElements(list) => Box::new(xml::extract(document, list)?),
    };
    let mut inner = rows.peekable();
    if inner.peek().is_none() {
        return Err(ExtractError::Empty);
    }
    Ok(Rows { inner })
}
