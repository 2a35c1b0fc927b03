//! Data-side machinery for the filter pane engine
//!
//! Option scanning, custom-option counting, persistence snapshots,
//! server-mode payloads and the in-memory reference grid host.

pub mod compare;
pub mod memory;
pub mod scan;
pub mod server;
pub mod snapshot;

use thiserror::Error;

// Re-exports
pub use compare::{count_option, ComparisonCounts};
pub use memory::{GridCell, MemoryGrid};
pub use scan::{scan_column, ScanOutcome};
pub use server::{ServerData, ServerOption, ServerPayload};
pub use snapshot::{GroupSnapshot, LedgerEntrySnapshot, OptionSnapshot, PaneSnapshot};

/// Errors that can occur while building pane data
#[derive(Error, Debug)]
pub enum PaneDataError {
    #[error(
        "row {row}, column {column}: multi-value cell has {filter_len} filter values but {display_len} display values"
    )]
    MalformedMultiValue {
        row: usize,
        column: usize,
        filter_len: usize,
        display_len: usize,
    },

    #[error("host grid is missing required capability: {0}")]
    MissingCapability(&'static str),

    #[error("a pane group is already attached to this grid")]
    GroupAlreadyAttached,

    #[error("persisted state could not be decoded: {0}")]
    Snapshot(#[from] serde_json::Error),
}
