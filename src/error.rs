//! Error type shared by every counter store.
//!
//! All stores report failures through [`StoreError`], so callers can swap
//! the in-memory store for a durable one without changing error handling.
//! Two broad classes matter to callers:
//!
//! - [`StoreError::InvalidIdentifier`]: the id was rejected before any state
//!   was touched.
//! - everything else ([`StoreError::is_unavailable`]): the backing store could
//!   not commit the operation. The last committed value is still what reads
//!   return.

use thiserror::Error;

/// Error returned by counter store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The content identifier is empty, too long, or contains control characters.
    #[error("invalid content identifier: {0:?}")]
    InvalidIdentifier(String),

    /// I/O failure while reading or writing the backing file.
    #[error("store unavailable: {0}")]
    Io(#[from] std::io::Error),

    /// A journal record could not be encoded or decoded.
    #[cfg(feature = "journal")]
    #[error("journal encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite reported an error.
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The persisted data is damaged beyond a torn final record.
    #[error("corrupt store at line {line}: {reason}")]
    Corrupt {
        /// 1-based line number of the damaged record.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// Another store instance, in this process or another one, owns the file.
    #[error("store file {} is in use by another store", .0.display())]
    Locked(std::path::PathBuf),

    /// A previous failure left the backing file in an unknown state.
    #[error("store poisoned by an earlier write failure")]
    Poisoned,

    /// The counter for this id is already at its maximum.
    #[error("counter overflow for {0:?}")]
    Overflow(String),
}

impl StoreError {
    /// Returns `true` if the id itself was rejected.
    pub fn is_invalid_identifier(&self) -> bool {
        matches!(self, StoreError::InvalidIdentifier(_))
    }

    /// Returns `true` if the store could not commit the operation.
    pub fn is_unavailable(&self) -> bool {
        !self.is_invalid_identifier()
    }

    /// Returns `true` for failures worth retrying after a short pause.
    pub(crate) fn is_transient(&self) -> bool {
        match self {
            StoreError::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
            ),
            #[cfg(feature = "sqlite")]
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
