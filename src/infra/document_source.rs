use crate::error::{GridError, Result};
use crate::pipeline::schema::DocumentRequest;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Supplies raw document bytes for a planned request. Transport, retries and
/// timeouts live behind this trait.
pub trait DocumentSource {
    fn fetch(&self, request: &DocumentRequest) -> Result<Vec<u8>>;
}

/// Documents stored on disk under their schema file names, one directory per
/// source id (`<root>/ERCOT/load_7day.csv`) or flat in `<root>`.
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn candidates(&self, request: &DocumentRequest) -> [PathBuf; 2] {
        [
            self.root.join(&request.source_id).join(&request.file_name),
            self.root.join(&request.file_name),
        ]
    }
}

impl DocumentSource for FileSource {
    fn fetch(&self, request: &DocumentRequest) -> Result<Vec<u8>> {
        let [nested, flat] = self.candidates(request);
        let path = if nested.is_file() { nested } else { flat };
        debug!(path = %path.display(), document = %request.document, "reading document");
        fs::read(&path).map_err(GridError::from)
    }
}

/// In-memory documents keyed by document id.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    documents: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, document_id: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(document_id, bytes);
        self
    }

    pub fn insert(&mut self, document_id: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.documents.insert(document_id.into(), bytes.into());
    }
}

impl DocumentSource for MemorySource {
    fn fetch(&self, request: &DocumentRequest) -> Result<Vec<u8>> {
        self.documents.get(&request.document).cloned().ok_or_else(|| {
            GridError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no document '{}' loaded", request.document),
            ))
        })
    }
}
