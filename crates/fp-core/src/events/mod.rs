//! Typed engine events
//!
//! Selection and data-change notifications flow through one explicit
//! enum, dispatched by the pane group's central handler. This replaces
//! the scattered named-callback wiring a grid toolkit would otherwise
//! impose, and makes event ordering a property of one code path.

use crate::value::PaneKey;

/// Events the pane group's central handler dispatches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaneEvent {
    /// A pane gained one or more selected options
    SelectionChanged { pane: PaneKey },

    /// A pane lost one or more selected options; commit is debounced
    DeselectionChanged { pane: PaneKey },

    /// The host grid's underlying row data was reloaded
    DataReloaded,

    /// Columns were added, removed or reordered; panes must be rebuilt
    StructureChanged,
}

impl PaneEvent {
    /// The pane the event concerns, when it concerns exactly one
    pub fn pane(&self) -> Option<&PaneKey> {
        match self {
            PaneEvent::SelectionChanged { pane } | PaneEvent::DeselectionChanged { pane } => {
                Some(pane)
            }
            PaneEvent::DataReloaded | PaneEvent::StructureChanged => None,
        }
    }
}
