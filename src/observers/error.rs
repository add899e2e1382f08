//! Unified error type for all observers.
//!
//! Every exporter returns [`ObserverError`], so switching between the table,
//! JSON and Prometheus outputs does not change error handling. Reading the
//! store can fail too; that surfaces as [`ObserverError::Store`].

use crate::error::StoreError;
use thiserror::Error;

/// Unified error type for all observer operations.
#[derive(Debug, Error)]
pub enum ObserverError {
    /// The store could not be read.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Error from the JSON observer.
    #[cfg(feature = "json")]
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A metric family could not be built, registered or encoded.
    #[cfg(feature = "prometheus")]
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    /// The encoded exposition text was not valid UTF-8.
    #[cfg(feature = "prometheus")]
    #[error("exposition text is not utf-8: {0}")]
    Exposition(#[from] std::string::FromUtf8Error),
}

/// Result type for observer operations.
pub type Result<T> = std::result::Result<T, ObserverError>;
