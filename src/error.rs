use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("parse error in {source_id} document '{document}': {message}")]
    Parse {
        source_id: String,
        document: String,
        message: String,
    },

    #[error("no data rows in {source_id} document '{document}'")]
    EmptyResult { source_id: String, document: String },

    #[error("required field '{field}' has no matching label in {source_id} document '{document}'")]
    UnrecognizedLabel {
        source_id: String,
        document: String,
        field: String,
    },

    #[error("invalid query options: {0}")]
    InvalidOptions(String),

    #[error("{source_id} does not publish {data} data for {mode} queries")]
    Unsupported {
        source_id: String,
        data: String,
        mode: String,
    },

    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl GridError {
    /// Shorthand for a document-level parse failure.
    pub fn parse(source_id: &str, document: &str, message: impl Into<String>) -> Self {
        GridError::Parse {
            source_id: source_id.to_string(),
            document: document.to_string(),
            message: message.into(),
        }
    }

    pub fn empty(source_id: &str, document: &str) -> Self {
        GridError::EmptyResult {
            source_id: source_id.to_string(),
            document: document.to_string(),
        }
    }

    /// "No data yet" is not a failure of the document; callers usually poll again.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, GridError::EmptyResult { .. })
    }

    /// Short, stable tag used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            GridError::Parse { .. } => "parse",
            GridError::EmptyResult { .. } => "empty_result",
            GridError::UnrecognizedLabel { .. } => "unrecognized_label",
            GridError::InvalidOptions(_) => "invalid_options",
            GridError::Unsupported { .. } => "unsupported",
            GridError::UnknownSource(_) => "unknown_source",
            GridError::Config(_) => "config",
            GridError::Io(_) => "io",
            GridError::Toml(_) => "toml",
            GridError::Json(_) => "json",
        }
    }
}

pub type Result<T> = std::result::Result<T, GridError>;
