//! runlog-store: file-backed per-task log store.
//! One append-only log file per task; forward incremental reads and
//! backward line-paged reads over byte-offset cursors.

pub mod error;
pub mod file;

pub use error::StoreError;
pub use file::FileStore;
