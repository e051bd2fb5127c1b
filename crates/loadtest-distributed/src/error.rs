//! Error types for replica discovery and peer calls.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DistributedError {
    /// The registry could not be queried.
    #[error("Registry error: {0}")]
    Registry(String),

    /// Reading in-cluster credentials failed.
    #[error("Failed to read {path}: {source}")]
    Credentials {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The peer answered with a non-success status.
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    /// The peer did not answer within the call timeout.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// A static peer entry not in `name=address` form.
    #[error("Invalid peer entry '{0}', expected name=address")]
    InvalidPeer(String),
}
