//! Error types for the file-backed log store.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store root is not a directory: {0}")]
    BadRoot(String),
}
