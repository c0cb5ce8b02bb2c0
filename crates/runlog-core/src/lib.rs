//! runlog-core: shared types for the runlog workspace.
//! Task identity, the cursor-based wire contract, and buffer limits.

pub mod limits;
pub mod types;
