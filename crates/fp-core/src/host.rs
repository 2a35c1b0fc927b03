//! Host grid capability interface
//!
//! The engine never touches a grid widget directly. Everything it needs
//! from the host — row enumeration, orthogonal cell reads, the global
//! predicate chain, redraw and state persistence — comes through this
//! trait. Predicates are keyed by handle identity so that destroying one
//! pane can never remove a structurally identical predicate belonging to
//! a sibling.

use std::sync::Arc;

use crate::value::{CellRole, CellValue, RowData, RowIdx};

/// Which rows the host should enumerate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowScope {
    /// Every row in the dataset
    All,
    /// Rows currently passing the registered predicate chain
    Displayed,
}

/// Identity handle for a registered row predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PredicateHandle(uuid::Uuid);

impl PredicateHandle {
    pub fn new() -> Self {
        PredicateHandle(uuid::Uuid::new_v4())
    }
}

impl Default for PredicateHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Row-inclusion test registered into the host's filter chain
///
/// The host passes itself back in so the predicate can read cells without
/// holding its own reference to the grid.
pub type RowPredicate = Arc<dyn Fn(&dyn GridHost, RowIdx) -> bool + Send + Sync>;

/// What the host grid can do for the engine
///
/// Missing required capabilities fail pane-group construction, not the
/// first operation that happens to need them.
#[derive(Debug, Clone, Copy)]
pub struct HostCapabilities {
    /// The presentation layer can render selectable option lists
    pub selection: bool,

    /// `load_state`/`persist_state` are wired to real storage
    pub state_persistence: bool,

    /// Option data arrives from a server round-trip instead of scans
    pub server_side: bool,
}

/// Capability interface the engine consumes from the host grid
pub trait GridHost: Send + Sync {
    fn capabilities(&self) -> HostCapabilities;

    fn column_count(&self) -> usize;

    /// Human-readable column title, used for pane headers
    fn column_title(&self, column: usize) -> String;

    /// Data-source key for the column, used in server request payloads
    fn column_source(&self, column: usize) -> String;

    fn rows(&self, scope: RowScope) -> Vec<RowIdx>;

    /// Orthogonal cell read; the filter role may return a multi-value
    fn cell(&self, row: RowIdx, column: usize, role: CellRole) -> CellValue;

    /// Full row content handed to function-valued filters
    fn row_data(&self, row: RowIdx) -> RowData;

    /// Register a predicate under a handle. Registering the same handle
    /// again replaces the predicate in place; it never duplicates it.
    fn register_row_predicate(&self, handle: PredicateHandle, predicate: RowPredicate);

    /// Remove exactly the predicate registered under this handle
    fn unregister_row_predicate(&self, handle: PredicateHandle);

    /// Ask the host to re-evaluate row visibility and repaint
    fn request_redraw(&self);

    /// Claim the host's single pane-group slot. Returns false when a
    /// group is already attached.
    fn try_claim_panes(&self) -> bool;

    /// Release the pane-group slot on destruction
    fn release_panes(&self);

    /// Previously persisted engine state, if any
    fn load_state(&self) -> Option<serde_json::Value>;

    /// Persist the engine's serialized state
    fn persist_state(&self, state: serde_json::Value);
}
