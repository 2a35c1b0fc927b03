//! Persistence snapshots
//!
//! Serializable state for a pane group: the selection ledger in causal
//! order plus each pane's selections, search term, sort and save-time
//! option data (so a restored session can show counts before a rescan
//! completes). Selections persist as canonical string keys; function
//! valued filters restore through configuration, never through state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fp_core::config::PaneSort;
use fp_core::value::{FilterOption, FilterValue, PaneKey};

/// One selection event as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntrySnapshot {
    pub pane: PaneKey,
    pub selected: Vec<String>,
    pub protect: bool,
}

/// Saved option, enough to render a restored pane before a rescan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSnapshot {
    pub filter: String,
    pub display: String,
    pub sort: String,
    pub kind: String,
}

impl OptionSnapshot {
    /// Snapshot an option; function-valued filters have no stable
    /// serialized form and are skipped.
    pub fn from_option(option: &FilterOption) -> Option<Self> {
        option.filter.canonical().map(|filter| Self {
            filter,
            display: option.display.clone(),
            sort: option.sort.clone(),
            kind: option.kind.clone(),
        })
    }

    pub fn to_option(&self) -> FilterOption {
        FilterOption {
            filter: FilterValue::Scalar(self.filter.clone().into()),
            display: self.display.clone(),
            sort: self.sort.clone(),
            kind: self.kind.clone(),
        }
    }
}

/// Saved state of one pane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaneSnapshot {
    pub pane: PaneKey,

    /// Whether the pane was displayed; a true here beats the uniqueness
    /// heuristic on restore
    pub displayed: bool,

    /// Selected filter values as canonical keys
    pub selected: Vec<String>,

    pub search_term: String,

    pub sort: PaneSort,

    /// Dataset-wide counts at save time, keyed canonically
    pub bins_total: HashMap<String, usize>,

    /// Options at save time
    pub options: Vec<OptionSnapshot>,
}

/// Full saved state of a pane group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub saved_at: DateTime<Utc>,
    pub selection_list: Vec<LedgerEntrySnapshot>,
    pub panes: Vec<PaneSnapshot>,
}

impl GroupSnapshot {
    pub fn new() -> Self {
        Self {
            saved_at: Utc::now(),
            selection_list: Vec::new(),
            panes: Vec::new(),
        }
    }

    /// Look up a pane's saved state by identity
    pub fn pane(&self, key: &PaneKey) -> Option<&PaneSnapshot> {
        self.panes.iter().find(|pane| &pane.pane == key)
    }
}

impl Default for GroupSnapshot {
    fn default() -> Self {
        Self::new()
    }
}
