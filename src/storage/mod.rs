//! Local storage for completed runs.

mod runs;

pub use runs::{RunRecord, RunStore};
