use std::path::PathBuf;

use thiserror::Error;

/// Convenient result alias for the stopreach library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Raised when a latitude or longitude falls outside its valid range.
    #[error("{axis} {value} is out of range ({min} to {max})")]
    CoordinateRange {
        axis: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Raised when a grid specification cannot produce any points.
    #[error("invalid grid specification: {message}")]
    InvalidGrid { message: String },

    /// Raised when the API key file could not be located.
    #[error("api key file not found at {path}")]
    ApiKeyNotFound { path: PathBuf },

    /// Raised when the API key file exists but holds no usable key.
    #[error("api key file at {path} is empty")]
    ApiKeyEmpty { path: PathBuf },

    /// A directions lookup failed after the client exhausted its options.
    #[error(transparent)]
    RouteLookup(#[from] RouteLookupError),

    /// Wrapper for SQLite errors. Constraint violations on route writes
    /// surface here and are never retried.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper for CSV ingestion/export errors.
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Failure modes of a single directions lookup.
///
/// The enrichment pipeline recovers from these at the per-candidate
/// granularity; everything else terminates the run.
#[derive(Debug, Error)]
pub enum RouteLookupError {
    /// Connection failure or timeout, after the retry budget was spent.
    #[error("directions request failed after {attempts} attempts: {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// The provider answered with an HTTP error status. Retrying the same
    /// request would not change the outcome.
    #[error("directions provider returned HTTP {status}")]
    Status { status: reqwest::StatusCode },

    /// The provider answered, but the body was not a decodable directions
    /// response.
    #[error("directions response could not be decoded: {message}")]
    Malformed { message: String },

    /// A well-formed response carrying zero candidate routes.
    #[error("directions response contained no routes")]
    NoRoutes,
}

impl RouteLookupError {
    /// Whether an immediate retry of the same request could plausibly
    /// succeed. Only network-level transport failures qualify.
    pub fn is_transient(&self) -> bool {
        matches!(self, RouteLookupError::Transport { .. })
    }
}
