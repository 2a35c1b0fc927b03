//! Layered pane configuration
//!
//! Pane behavior is configured at three layers: group-wide defaults,
//! per-column overrides and custom-pane definitions. `resolve` collapses
//! the layers into one `EffectiveConfig` with no hidden merge order.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::value::{CellRole, FilterValue, Scalar};

/// How multiple selections within one pane combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Combiner {
    /// A row matches when any selected option matches (default)
    Or,
    /// A row matches only when every selected option matches
    And,
}

impl Default for Combiner {
    fn default() -> Self {
        Combiner::Or
    }
}

/// Field a pane's option list is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortField {
    Label,
    Count,
}

/// Ordering applied to a pane's option list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaneSort {
    pub field: SortField,
    pub descending: bool,
}

impl Default for PaneSort {
    fn default() -> Self {
        Self {
            field: SortField::Label,
            descending: false,
        }
    }
}

/// A configured option, either for a column's option override or a
/// custom pane
#[derive(Debug, Clone)]
pub struct CustomOption {
    /// Label shown for the option
    pub label: String,

    /// Filter value, typically a `RowTest`
    pub value: FilterValue,
}

/// Definition of a custom (bonus) pane not backed by a single column
#[derive(Debug, Clone)]
pub struct CustomPaneDef {
    /// Name used for ordering and pane identity
    pub name: String,

    /// Title shown above the pane; falls back to the name
    pub header: Option<String>,

    /// The options the pane offers
    pub options: Vec<CustomOption>,

    /// Combiner override for this pane
    pub combiner: Option<Combiner>,
}

/// Per-column configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ColumnConfig {
    /// Column this override applies to
    pub column: usize,

    /// Force the pane shown (`Some(true)`) or hidden (`Some(false)`),
    /// bypassing the uniqueness heuristic
    pub show: Option<bool>,

    /// Uniqueness-ratio threshold override
    pub threshold: Option<f64>,

    /// Combiner override
    pub combiner: Option<Combiner>,

    /// Suppress the count badge for this pane
    pub hide_count: Option<bool>,

    /// Name used for ordering; falls back to the column title
    pub name: Option<String>,

    /// Title shown above the pane; falls back to the column title
    pub header: Option<String>,

    /// Filter values selected on first build
    pub pre_select: Vec<Scalar>,

    /// Replace scanned options with this configured list
    pub options: Option<Vec<CustomOption>>,

    /// Read one orthogonal role for all four option fields
    pub single_source: Option<CellRole>,
}

/// Defaults every pane starts from
#[derive(Debug, Clone)]
pub struct PaneDefaults {
    /// Uniqueness-ratio threshold above which a pane is hidden
    pub threshold: f64,

    /// Default selection combiner
    pub combiner: Combiner,

    /// Suppress count badges everywhere
    pub hide_count: bool,

    /// Truncate option labels longer than this many characters
    pub data_length: Option<usize>,

    /// Label standing in for empty cell values
    pub empty_message: String,
}

impl Default for PaneDefaults {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            combiner: Combiner::Or,
            hide_count: false,
            data_length: Some(30),
            empty_message: "No Data".to_string(),
        }
    }
}

/// Group-level configuration
#[derive(Debug, Clone)]
pub struct GroupConfig {
    /// Recompute every pane's counts against the other panes' filters
    pub cascade_panes: bool,

    /// Maintain and show dataset-wide totals next to filtered counts
    pub view_total: bool,

    /// Columns to build panes for; empty means all columns
    pub columns: Vec<usize>,

    /// Pane display order by name; panes not listed keep their position
    pub order: Vec<String>,

    /// Custom pane definitions appended after the column panes
    pub panes: Vec<CustomPaneDef>,

    /// Per-column overrides
    pub column_configs: Vec<ColumnConfig>,

    /// Defaults resolved into every pane
    pub defaults: PaneDefaults,

    /// Delay before a deselect commits, coalescing toggle bursts
    pub deselect_delay: Duration,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            cascade_panes: false,
            view_total: false,
            columns: Vec::new(),
            order: Vec::new(),
            panes: Vec::new(),
            column_configs: Vec::new(),
            defaults: PaneDefaults::default(),
            deselect_delay: Duration::from_millis(50),
        }
    }
}

/// Fully resolved configuration for one pane
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub threshold: f64,
    pub combiner: Combiner,
    pub show: Option<bool>,
    pub hide_count: bool,
    pub data_length: Option<usize>,
    pub empty_message: String,
    pub name: Option<String>,
    pub header: Option<String>,
    pub pre_select: Vec<Scalar>,
    pub options: Option<Vec<CustomOption>>,
    pub single_source: Option<CellRole>,
}

/// Resolve the layered configuration for one pane.
///
/// Column overrides beat the defaults field by field; a custom-pane
/// definition contributes its name, header, options and combiner. Pure
/// function of its inputs.
pub fn resolve(
    defaults: &PaneDefaults,
    column: Option<&ColumnConfig>,
    custom: Option<&CustomPaneDef>,
) -> EffectiveConfig {
    let mut effective = EffectiveConfig {
        threshold: defaults.threshold,
        combiner: defaults.combiner,
        show: None,
        hide_count: defaults.hide_count,
        data_length: defaults.data_length,
        empty_message: defaults.empty_message.clone(),
        name: None,
        header: None,
        pre_select: Vec::new(),
        options: None,
        single_source: None,
    };

    if let Some(column) = column {
        if let Some(threshold) = column.threshold {
            effective.threshold = threshold;
        }
        if let Some(combiner) = column.combiner {
            effective.combiner = combiner;
        }
        if let Some(hide_count) = column.hide_count {
            effective.hide_count = hide_count;
        }
        effective.show = column.show;
        effective.name = column.name.clone();
        effective.header = column.header.clone();
        effective.pre_select = column.pre_select.clone();
        effective.options = column.options.clone();
        effective.single_source = column.single_source;
    }

    if let Some(custom) = custom {
        effective.name = Some(custom.name.clone());
        effective.header = custom.header.clone().or(Some(custom.name.clone()));
        effective.options = Some(custom.options.clone());
        if let Some(combiner) = custom.combiner {
            effective.combiner = combiner;
        }
        // Custom panes are always shown; the heuristic has no bins to judge
        effective.show = Some(true);
    }

    effective
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults_only() {
        let effective = resolve(&PaneDefaults::default(), None, None);
        assert_eq!(effective.threshold, 0.6);
        assert_eq!(effective.combiner, Combiner::Or);
        assert_eq!(effective.show, None);
        assert!(effective.options.is_none());
    }

    #[test]
    fn test_resolve_column_overrides_beat_defaults() {
        let column = ColumnConfig {
            column: 2,
            threshold: Some(0.9),
            combiner: Some(Combiner::And),
            show: Some(true),
            ..Default::default()
        };
        let effective = resolve(&PaneDefaults::default(), Some(&column), None);
        assert_eq!(effective.threshold, 0.9);
        assert_eq!(effective.combiner, Combiner::And);
        assert_eq!(effective.show, Some(true));
    }

    #[test]
    fn test_resolve_custom_pane_is_always_shown() {
        let custom = CustomPaneDef {
            name: "range".to_string(),
            header: None,
            options: Vec::new(),
            combiner: None,
        };
        let effective = resolve(&PaneDefaults::default(), None, Some(&custom));
        assert_eq!(effective.show, Some(true));
        assert_eq!(effective.header.as_deref(), Some("range"));
    }
}
