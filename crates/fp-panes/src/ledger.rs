//! Selection ledger
//!
//! Ordered log of selection events across all panes. Cascade
//! regeneration replays this log oldest-to-newest, so multi-pane
//! narrowing reproduces in the order the user built it, never in pane
//! display or column order.

use fp_core::value::{FilterOption, PaneKey};
use fp_data::snapshot::LedgerEntrySnapshot;

/// One recorded selection event
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub pane: PaneKey,

    /// Full selection snapshot for the pane at event time
    pub selected: Vec<FilterOption>,

    /// Written by a pane mid-deselect that still retains selections;
    /// protected entries survive condensation
    pub protect: bool,
}

/// Ordered log of selection events, the replay authority for cascade
/// recomputation
#[derive(Debug, Default)]
pub struct SelectionLedger {
    entries: Vec<LedgerEntry>,
}

impl SelectionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&LedgerEntry> {
        self.entries.last()
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn replace(&mut self, entries: Vec<LedgerEntry>) {
        self.entries = entries;
    }

    /// Condense the log into the list cascade regeneration replays.
    ///
    /// Only each pane's newest entry survives (later selections
    /// supersede earlier ones for the same pane); entries from the pane
    /// that just deselected are dropped unless protected. Protect flags
    /// are consumed here.
    pub fn condense(&mut self, deselected: Option<&PaneKey>) -> Vec<LedgerEntry> {
        let mut kept = Vec::new();
        for index in 0..self.entries.len() {
            let entry = &self.entries[index];
            if Some(&entry.pane) == deselected && !entry.protect {
                continue;
            }
            let superseded = self.entries[index + 1..]
                .iter()
                .any(|later| later.pane == entry.pane);
            if !superseded {
                let mut entry = entry.clone();
                entry.protect = false;
                kept.push(entry);
                self.entries[index].protect = false;
            }
        }
        kept
    }

    /// Persistable form; function-valued selections are skipped
    pub fn to_snapshot(&self) -> Vec<LedgerEntrySnapshot> {
        self.entries
            .iter()
            .map(|entry| LedgerEntrySnapshot {
                pane: entry.pane.clone(),
                selected: entry
                    .selected
                    .iter()
                    .filter_map(|option| option.filter.canonical())
                    .collect(),
                protect: entry.protect,
            })
            .collect()
    }
}
