// Document pipeline: extraction, mapping, assembly, and the query session around them

pub mod engine;
pub mod processing;
pub mod schema;
pub mod session;
