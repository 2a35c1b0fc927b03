//! Faceted filter panes for data grids
//!
//! The engine behind per-column filter panes: each pane lists a column's
//! distinct values with occurrence counts, selections combine into the
//! host grid's row filter, and the pane group keeps every pane's counts
//! and visibility consistent as selections change.

mod group;
mod ledger;
mod pane;
mod viewmodel;

pub use group::PaneGroup;
pub use ledger::{LedgerEntry, SelectionLedger};
pub use pane::Pane;
pub use viewmodel::{GroupView, OptionRow, PaneView};
