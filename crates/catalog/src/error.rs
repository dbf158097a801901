//! Catalog error types.

use thiserror::Error;

/// Errors raised by a persistent fallback store.
///
/// These never reach stock callers: the product service logs them and moves
/// on, since the store is a degraded source only.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be mapped back onto a record.
    #[error("Corrupt row for {kiosk_token}: {reason}")]
    CorruptRow { kiosk_token: String, reason: String },

    /// The store refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
