//! Core functionality for the faceted filter pane engine
//!
//! This crate provides the fundamental abstractions shared by the engine:
//! the value model for pane options, layered configuration resolution,
//! typed engine events, the host-grid capability interface and the clock
//! used for debounced commits.

pub mod clock;
pub mod config;
pub mod events;
pub mod host;
pub mod value;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{
    Combiner, ColumnConfig, CustomOption, CustomPaneDef, EffectiveConfig, GroupConfig,
    PaneDefaults, PaneSort, SortField,
};
pub use events::PaneEvent;
pub use host::{GridHost, HostCapabilities, PredicateHandle, RowPredicate, RowScope};
pub use value::{BinKey, CellRole, CellValue, FilterOption, FilterValue, PaneKey, RowData, RowIdx, RowTest, Scalar};
