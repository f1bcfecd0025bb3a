//! Per-operator source adapters and the registry that dispatches to them.

pub mod ercot;
pub mod miso;
pub mod registry;

use crate::error::{GridError, Result};
use crate::pipeline::engine::{extract_rows, parse_document};
use crate::pipeline::processing::extract::RawRow;
use crate::pipeline::schema::{DocumentRequest, DocumentSchema, SourceProfile};
use crate::types::{QueryOptions, Record};
use tracing::debug;

pub use ercot::{ErcotAdapter, ErcotReport};
pub use miso::MisoAdapter;
pub use registry::{default_registry, Registry};

/// Shared interface of every operator adapter.
///
/// An adapter is read-only after construction: its profile and document
/// schemas are plain data, so one instance can serve any number of queries
/// from any number of threads.
pub trait SourceAdapter: Send + Sync {
    /// Operator identifier, e.g. `ERCOT`.
    fn source_id(&self) -> &str {
        &self.profile().id
    }

    fn profile(&self) -> &SourceProfile;

    /// Every document this operator publishes.
    fn documents(&self) -> &[DocumentSchema];

    fn document(&self, id: &str) -> Option<&DocumentSchema> {
        self.documents().iter().find(|d| d.id == id)
    }

    /// Validate `options` and plan the document fetch that answers them.
    fn configure(&self, options: &QueryOptions) -> Result<DocumentRequest> {
        let mode = options.mode()?;
        let schema = self
            .documents()
            .iter()
            .find(|d| d.serves(options.data, &mode))
            .ok_or_else(|| GridError::Unsupported {
                source_id: self.source_id().to_string(),
                data: options.data.to_string(),
                mode: mode.as_str().to_string(),
            })?;
        debug!(source = self.source_id(), document = %schema.id, data = %options.data, "planned document request");
        Ok(DocumentRequest::new(self.profile(), schema, options.data, mode))
    }

    /// Turn the fetched bytes of `request`'s document into records.
    fn parse(&self, request: &DocumentRequest, document: &[u8]) -> Result<Vec<Record>> {
        let schema = self.document(&request.document).ok_or_else(|| {
            GridError::parse(self.source_id(), &request.document, "document is not published by this source")
        })?;
        parse_document(self.profile(), schema, document, request.data, &request.mode)
    }

    /// Raw rows of a document, before any field mapping.
    fn extract(&self, document_id: &str, document: &[u8]) -> Result<Vec<RawRow>> {
        let schema = self.document(document_id).ok_or_else(|| {
            GridError::parse(self.source_id(), document_id, "document is not published by this source")
        })?;
        Ok(extract_rows(self.profile(), schema, document)?.collect())
    }
}
