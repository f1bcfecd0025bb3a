//! Single-use query session.
//!
//! `Query<Configured>` holds an adapter, validated options and the planned
//! document request. Supplying the document moves it to `Query<Fetched>`, and
//! `parse` consumes that. No state can be revisited.

use super::schema::DocumentRequest;
use crate::apis::SourceAdapter;
use crate::error::Result;
use crate::infra::document_source::DocumentSource;
use crate::types::{QueryOptions, Record};
use tracing::{info_span, instrument};

/// Options validated, document request planned.
#[derive(Debug)]
pub struct Configured;

/// Raw document obtained.
pub struct Fetched {
    document: Vec<u8>,
}

pub struct Query<'a, S> {
    adapter: &'a dyn SourceAdapter,
    request: DocumentRequest,
    state: S,
}

impl<'a> Query<'a, Configured> {
    pub fn new(adapter: &'a dyn SourceAdapter, options: &QueryOptions) -> Result<Self> {
        let request = adapter.configure(options)?;
        Ok(Self {
            adapter,
            request,
            state: Configured,
        })
    }

    pub fn request(&self) -> &DocumentRequest {
        &self.request
    }

    pub fn fetch(self, source: &dyn DocumentSource) -> Result<Query<'a, Fetched>> {
        let span = info_span!("fetch", source = %self.request.source_id, document = %self.request.document);
        let _enter = span.enter();
        let document = source.fetch(&self.request)?;
        Ok(self.with_document(document))
    }

    /// Use bytes the caller already holds.
    pub fn with_document(self, document: impl Into<Vec<u8>>) -> Query<'a, Fetched> {
        Query {
            adapter: self.adapter,
            request: self.request,
            state: Fetched {
                document: document.into(),
            },
        }
    }
}

impl<'a> Query<'a, Fetched> {
    pub fn request(&self) -> &DocumentRequest {
        &self.request
    }

    pub fn document(&self) -> &[u8] {
        &self.state.document
    }

    #[instrument(skip(self), fields(source = %self.request.source_id, document = %self.request.document, data = %self.request.data))]
    pub fn parse(self) -> Result<Vec<Record>> {
        self.adapter.parse(&self.request, &self.state.document)
    }
}
