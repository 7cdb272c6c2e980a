//! Persistence layer for mingle: diesel schema, models, enum mappings,
//! connection pooling, and query composition helpers.

pub mod db;
pub mod error;
pub mod model;
