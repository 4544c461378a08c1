//! Error types for NetGIS

use thiserror::Error;

/// Main error type for NetGIS operations
#[derive(Error, Debug)]
pub enum Error {
    /// An edge or point lacks an attribute the caller named.
    /// This is a schema violation on the caller's side and is not
    /// recoverable locally.
    #[error("missing attribute '{name}' on feature {id}")]
    MissingAttribute { name: String, id: i64 },

    /// An attribute exists but does not hold the expected value kind.
    #[error("attribute '{name}' on feature {id} is not numeric")]
    NonNumericAttribute { name: String, id: i64 },

    /// An edge has no center point although the operation requires one.
    /// Run the metric annotator first.
    #[error("edge {id} has no center point (run add_center first)")]
    MissingCenter { id: i64 },

    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("algorithm error: {0}")]
    Algorithm(String),
}

/// Result type alias for NetGIS operations
pub type Result<T> = std::result::Result<T, Error>;
