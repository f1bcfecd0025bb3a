pub mod apis;
pub mod config;
pub mod constants;
pub mod error;
pub mod infra;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod types;

pub use apis::{default_registry, Registry, SourceAdapter};
pub use error::{GridError, Result};
pub use pipeline::session::Query;
pub use types::{DataType, QueryOptions, Record};
