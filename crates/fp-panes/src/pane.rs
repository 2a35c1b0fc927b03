//! A single filter pane
//!
//! Owns one column's option index, its live selection and its predicate
//! contribution to the host grid's filter chain. The predicate is
//! registered once, under a handle owned by the pane; selection changes
//! publish through a shared slot the closure reads, so the registration
//! itself never churns.

use std::sync::Arc;

use ahash::AHashMap;
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::debug;

use fp_core::config::{Combiner, EffectiveConfig};
use fp_core::host::{GridHost, PredicateHandle, RowPredicate, RowScope};
use fp_core::value::{BinKey, CellRole, CellValue, FilterOption, FilterValue, PaneKey, RowIdx, Scalar};
use fp_data::compare::count_option;
use fp_data::scan::scan_column;
use fp_data::server::ServerData;
use fp_data::snapshot::{OptionSnapshot, PaneSnapshot};
use fp_data::PaneDataError;

pub struct Pane {
    pub(crate) key: PaneKey,

    /// Backing column; `None` for custom panes and out-of-range fallbacks
    pub(crate) column: Option<usize>,

    pub(crate) host: Arc<dyn GridHost>,
    pub(crate) cfg: EffectiveConfig,
    pub(crate) title: String,
    pub(crate) name: String,

    /// Distinct options in first-seen row order
    pub(crate) options: IndexMap<BinKey, FilterOption>,

    /// Occurrence counts under the current displayed scope
    pub(crate) bins: AHashMap<BinKey, usize>,

    /// Occurrence counts across the whole dataset
    pub(crate) bins_total: AHashMap<BinKey, usize>,

    /// Every contributing occurrence from the last full scan
    pub(crate) total_options: usize,

    /// Staged selection, in selection order
    pub(crate) selection: IndexMap<BinKey, FilterOption>,

    /// Selection the registered predicate currently sees
    committed: Arc<RwLock<Vec<FilterOption>>>,

    handle: PredicateHandle,

    pub(crate) displayed: bool,
    pub(crate) filtering_active: bool,
    pub(crate) search_term: String,
    pub(crate) sort: fp_core::config::PaneSort,

    // Coordinator bookkeeping flags
    pub(crate) select_present: bool,
    pub(crate) deselect_pending: bool,
    pub(crate) server_selecting: bool,
}

impl Pane {
    pub(crate) fn for_column(host: Arc<dyn GridHost>, column: usize, cfg: EffectiveConfig) -> Self {
        let title = cfg
            .header
            .clone()
            .unwrap_or_else(|| host.column_title(column));
        let name = cfg.name.clone().unwrap_or_else(|| host.column_title(column));
        Self::new(host, PaneKey::Column(column), Some(column), cfg, title, name)
    }

    pub(crate) fn for_custom(host: Arc<dyn GridHost>, key: PaneKey, cfg: EffectiveConfig) -> Self {
        let title = cfg
            .header
            .clone()
            .or_else(|| cfg.name.clone())
            .unwrap_or_else(|| "Custom Pane".to_string());
        let name = cfg.name.clone().unwrap_or_else(|| title.clone());
        Self::new(host, key, None, cfg, title, name)
    }

    fn new(
        host: Arc<dyn GridHost>,
        key: PaneKey,
        column: Option<usize>,
        cfg: EffectiveConfig,
        title: String,
        name: String,
    ) -> Self {
        let pane = Self {
            key,
            column,
            host,
            cfg,
            title,
            name,
            options: IndexMap::new(),
            bins: AHashMap::new(),
            bins_total: AHashMap::new(),
            total_options: 0,
            selection: IndexMap::new(),
            committed: Arc::new(RwLock::new(Vec::new())),
            handle: PredicateHandle::new(),
            displayed: false,
            filtering_active: false,
            search_term: String::new(),
            sort: Default::default(),
            select_present: false,
            deselect_pending: false,
            server_selecting: false,
        };
        pane.register_predicate();
        pane
    }

    pub fn key(&self) -> &PaneKey {
        &self.key
    }

    pub fn column(&self) -> Option<usize> {
        self.column
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn displayed(&self) -> bool {
        self.displayed
    }

    pub fn has_selection(&self) -> bool {
        !self.selection.is_empty()
    }

    pub fn selection_len(&self) -> usize {
        self.selection.len()
    }

    pub(crate) fn option_by_key(&self, key: &BinKey) -> Option<&FilterOption> {
        self.options.get(key)
    }

    pub(crate) fn selection_snapshot(&self) -> Vec<FilterOption> {
        self.selection.values().cloned().collect()
    }

    /// Scan (or count) options and decide visibility.
    ///
    /// `prior_displayed` carries restored or pre-reload display state: a
    /// pane the user previously had open stays open regardless of what
    /// the uniqueness heuristic would decide.
    pub(crate) fn build(&mut self, prior_displayed: bool) -> Result<(), PaneDataError> {
        self.reset_scan_state();
        self.displayed = false;

        if self.cfg.options.is_some() || self.column.is_none() {
            self.build_configured_options();
            self.displayed = self.cfg.show.unwrap_or(true) || prior_displayed;
            self.apply_pre_select();
            return Ok(());
        }

        let Some(column) = self.column else {
            return Ok(());
        };
        if self.cfg.show == Some(false) && !prior_displayed {
            // Never shown, so never scanned
            return Ok(());
        }
        if self.cfg.show == Some(true) || prior_displayed {
            self.displayed = true;
        }

        let host = Arc::clone(&self.host);
        let all_rows = host.rows(RowScope::All);
        let outcome = scan_column(host.as_ref(), column, &all_rows, self.cfg.single_source)?;
        self.options = outcome.options;
        self.bins_total = outcome.bins.clone();
        self.bins = outcome.bins;
        self.total_options = outcome.total_options;

        if !self.displayed {
            let unique = self.options.len();
            let ratio = self.unique_ratio(unique, all_rows.len());
            if ratio > self.cfg.threshold || unique <= 1 {
                debug!(pane = %self.key, ratio, unique, "pane suppressed by uniqueness heuristic");
                return Ok(());
            }
            self.displayed = true;
        }

        self.apply_pre_select();
        Ok(())
    }

    /// Discard scan state, re-scan and re-apply whichever previous
    /// selections still exist in the new option set.
    pub(crate) fn rebuild(&mut self, maintain_selection: bool) -> Result<(), PaneDataError> {
        let prior: Vec<FilterValue> = if maintain_selection {
            self.selection.values().map(|o| o.filter.clone()).collect()
        } else {
            Vec::new()
        };
        let was_displayed = self.displayed;
        self.selection.clear();
        self.build(was_displayed)?;
        if !prior.is_empty() {
            self.stage_select(&prior);
        }
        self.commit_selection();
        Ok(())
    }

    /// Recompute displayed-scope counts against the given row set.
    ///
    /// Option identity never changes here; keys absent from the row set
    /// count zero, keeping the bins aligned with the option index.
    pub(crate) fn refresh(
        &mut self,
        rows: &[RowIdx],
        view_total: bool,
        filtering_active: bool,
    ) -> Result<(), PaneDataError> {
        self.filtering_active = filtering_active;
        if !self.displayed {
            return Ok(());
        }
        let host = Arc::clone(&self.host);

        if self.cfg.options.is_some() || self.column.is_none() {
            let all = host.rows(RowScope::All);
            let configured = self.cfg.options.clone().unwrap_or_default();
            for option in &configured {
                let counts = count_option(host.as_ref(), &option.value, rows, &all, self.column);
                let key = option.value.key();
                self.bins.insert(key.clone(), counts.shown);
                self.bins_total.insert(key, counts.total);
            }
            return Ok(());
        }

        let Some(column) = self.column else {
            return Ok(());
        };
        let outcome = scan_column(host.as_ref(), column, rows, self.cfg.single_source)?;
        self.bins = self
            .options
            .keys()
            .map(|key| (key.clone(), outcome.bins.get(key).copied().unwrap_or(0)))
            .collect();
        if view_total {
            let all = host.rows(RowScope::All);
            let totals = scan_column(host.as_ref(), column, &all, self.cfg.single_source)?;
            self.bins_total = self
                .options
                .keys()
                .map(|key| (key.clone(), totals.bins.get(key).copied().unwrap_or(0)))
                .collect();
        } else {
            self.bins_total = self.bins.clone();
        }
        Ok(())
    }

    /// Stage selection of the given filter values.
    ///
    /// Values not present in the option set are ignored, except while
    /// server data is reconciling, when they are accepted provisionally.
    pub(crate) fn stage_select(&mut self, values: &[FilterValue]) -> bool {
        let mut changed = false;
        for value in values {
            let key = value.key();
            if let Some(option) = self.options.get(&key) {
                changed |= self.selection.insert(key, option.clone()).is_none();
            } else if self.server_selecting {
                let display = value.canonical().unwrap_or_default();
                let provisional = FilterOption {
                    filter: value.clone(),
                    display: display.clone(),
                    sort: display,
                    kind: String::new(),
                };
                changed |= self.selection.insert(key, provisional).is_none();
            }
        }
        changed
    }

    pub(crate) fn stage_deselect(&mut self, values: &[FilterValue]) -> bool {
        let mut changed = false;
        for value in values {
            changed |= self.selection.shift_remove(&value.key()).is_some();
        }
        changed
    }

    pub(crate) fn clear_selection(&mut self) -> bool {
        let had = !self.selection.is_empty();
        self.selection.clear();
        self.commit_selection();
        had
    }

    /// Publish the staged selection to the registered predicate
    pub(crate) fn commit_selection(&self) {
        *self.committed.write() = self.selection.values().cloned().collect();
    }

    /// Whether this pane's committed selection admits the row
    pub(crate) fn admits(&self, row: RowIdx) -> bool {
        let selected = self.committed.read();
        if selected.is_empty() {
            return true;
        }
        let host = self.host.as_ref();
        let cell = self
            .column
            .map(|column| host.cell(row, column, CellRole::Filter));
        selection_matches(host, row, cell.as_ref(), &selected, self.cfg.combiner)
    }

    /// Replace scan state with server-provided option summaries
    pub(crate) fn apply_server_options(&mut self, data: &ServerData) {
        let Some(column) = self.column else {
            return;
        };
        let source = self.host.column_source(column);
        let Some(summaries) = data.options.get(&source) else {
            return;
        };

        let retained: Vec<FilterValue> =
            self.selection.values().map(|o| o.filter.clone()).collect();
        self.reset_scan_state();
        self.selection.clear();

        for summary in summaries {
            let filter = FilterValue::Scalar(Scalar::Text(summary.value.clone()));
            let key = filter.key();
            self.options.insert(
                key.clone(),
                FilterOption {
                    filter,
                    display: summary.label.clone(),
                    sort: summary.label.clone(),
                    kind: summary.label.clone(),
                },
            );
            self.bins.insert(key.clone(), summary.count);
            self.bins_total.insert(key, summary.total);
            self.total_options += summary.total;
        }

        if !self.displayed && self.cfg.show != Some(false) {
            let unique = self.options.len();
            let ratio = self.unique_ratio(unique, data.table_length);
            self.displayed = !(ratio > self.cfg.threshold || unique <= 1);
        }

        // Reconcile the previous selections against the fresh option set
        self.server_selecting = true;
        let kept: Vec<FilterValue> = retained
            .into_iter()
            .filter(|value| self.options.contains_key(&value.key()))
            .collect();
        self.stage_select(&kept);
        self.server_selecting = false;
        self.commit_selection();
    }

    /// Re-apply persisted selections by canonical key; unresolvable
    /// entries are dropped without complaint.
    pub(crate) fn restore_selection(&mut self, keys: &[String]) {
        let values: Vec<FilterValue> = keys
            .iter()
            .map(|key| FilterValue::Scalar(Scalar::Text(key.clone())))
            .collect();
        self.stage_select(&values);
        self.commit_selection();
    }

    pub(crate) fn snapshot(&self) -> PaneSnapshot {
        PaneSnapshot {
            pane: self.key.clone(),
            displayed: self.displayed,
            selected: self
                .selection
                .values()
                .filter_map(|option| option.filter.canonical())
                .collect(),
            search_term: self.search_term.clone(),
            sort: self.sort,
            bins_total: self
                .bins_total
                .iter()
                .filter_map(|(key, &count)| match key {
                    BinKey::Value(value) => Some((value.clone(), count)),
                    BinKey::Test(_) => None,
                })
                .collect(),
            options: self
                .options
                .values()
                .filter_map(OptionSnapshot::from_option)
                .collect(),
        }
    }

    /// Remove this pane's predicate from the host chain
    pub(crate) fn detach(&self) {
        self.host.unregister_row_predicate(self.handle);
    }

    fn register_predicate(&self) {
        let committed = Arc::clone(&self.committed);
        let column = self.column;
        let combiner = self.cfg.combiner;
        let predicate: RowPredicate = Arc::new(move |host, row| {
            let selected = committed.read();
            if selected.is_empty() {
                return true;
            }
            let cell = column.map(|column| host.cell(row, column, CellRole::Filter));
            selection_matches(host, row, cell.as_ref(), &selected, combiner)
        });
        self.host.register_row_predicate(self.handle, predicate);
    }

    fn build_configured_options(&mut self) {
        let host = Arc::clone(&self.host);
        let displayed = host.rows(RowScope::Displayed);
        let all = host.rows(RowScope::All);
        let Some(configured) = self.cfg.options.clone() else {
            return;
        };
        for option in &configured {
            let counts = count_option(host.as_ref(), &option.value, &displayed, &all, self.column);
            let key = option.value.key();
            self.options.insert(
                key.clone(),
                FilterOption {
                    filter: option.value.clone(),
                    display: option.label.clone(),
                    sort: option.label.clone(),
                    kind: option.label.clone(),
                },
            );
            self.bins.insert(key.clone(), counts.shown);
            self.bins_total.insert(key, counts.total);
            self.total_options += counts.total;
        }
    }

    fn apply_pre_select(&mut self) {
        if !self.selection.is_empty() || self.cfg.pre_select.is_empty() {
            return;
        }
        let values: Vec<FilterValue> = self
            .cfg
            .pre_select
            .iter()
            .cloned()
            .map(FilterValue::Scalar)
            .collect();
        if self.stage_select(&values) {
            self.commit_selection();
        }
    }

    /// Distinct bins over total option occurrences; 1.0 when either side
    /// is empty so degenerate panes stay hidden
    fn unique_ratio(&self, unique: usize, row_count: usize) -> f64 {
        if row_count > 0 && self.total_options > 0 {
            unique as f64 / self.total_options as f64
        } else {
            1.0
        }
    }

    fn reset_scan_state(&mut self) {
        self.options.clear();
        self.bins.clear();
        self.bins_total.clear();
        self.total_options = 0;
    }
}

fn selection_matches(
    host: &dyn GridHost,
    row: RowIdx,
    cell: Option<&CellValue>,
    selected: &[FilterOption],
    combiner: Combiner,
) -> bool {
    match combiner {
        Combiner::Or => selected
            .iter()
            .any(|option| option_matches(host, row, cell, &option.filter)),
        Combiner::And => selected
            .iter()
            .all(|option| option_matches(host, row, cell, &option.filter)),
    }
}

fn option_matches(
    host: &dyn GridHost,
    row: RowIdx,
    cell: Option<&CellValue>,
    filter: &FilterValue,
) -> bool {
    match filter {
        FilterValue::Scalar(want) => scalar_in_cell(cell, want),
        FilterValue::Many(wants) => wants.iter().any(|want| scalar_in_cell(cell, want)),
        FilterValue::Test(test) => test.matches(&host.row_data(row), row),
    }
}

fn scalar_in_cell(cell: Option<&CellValue>, want: &Scalar) -> bool {
    match cell {
        Some(CellValue::One(value)) => value.key() == want.key(),
        Some(CellValue::Many(values)) => values.iter().any(|value| value.key() == want.key()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fp_core::config::{resolve, ColumnConfig, PaneDefaults};
    use fp_core::value::RowTest;
    use fp_data::memory::{GridCell, MemoryGrid};

    fn column_pane(grid: Arc<MemoryGrid>, column: usize, config: Option<ColumnConfig>) -> Pane {
        let effective = resolve(&PaneDefaults::default(), config.as_ref(), None);
        Pane::for_column(grid, column, effective)
    }

    fn select(pane: &mut Pane, values: &[&str]) {
        let values: Vec<FilterValue> = values
            .iter()
            .map(|v| FilterValue::Scalar((*v).into()))
            .collect();
        pane.stage_select(&values);
        pane.commit_selection();
    }

    #[test]
    fn test_all_distinct_column_is_hidden() {
        let grid = Arc::new(MemoryGrid::new(&["Id"]));
        for i in 0..10 {
            grid.push_row(vec![GridCell::text(&format!("id-{i}"))]);
        }
        let mut pane = column_pane(grid, 0, None);
        pane.build(false).unwrap();
        // ratio 10/10 = 1.0 > 0.6
        assert!(!pane.displayed());
    }

    #[test]
    fn test_low_variance_column_is_shown() {
        let grid = Arc::new(MemoryGrid::new(&["State"]));
        for i in 0..100 {
            grid.push_row(vec![GridCell::text(if i % 2 == 0 { "open" } else { "closed" })]);
        }
        let mut pane = column_pane(grid, 0, None);
        pane.build(false).unwrap();
        // ratio 2/100 = 0.02
        assert!(pane.displayed());
    }

    #[test]
    fn test_single_value_column_is_hidden() {
        let grid = Arc::new(MemoryGrid::new(&["Constant"]));
        for _ in 0..50 {
            grid.push_row(vec![GridCell::text("same")]);
        }
        let mut pane = column_pane(grid, 0, None);
        pane.build(false).unwrap();
        assert!(!pane.displayed());
    }

    #[test]
    fn test_show_override_beats_heuristic() {
        let grid = Arc::new(MemoryGrid::new(&["Id"]));
        for i in 0..10 {
            grid.push_row(vec![GridCell::text(&format!("id-{i}"))]);
        }
        let config = ColumnConfig {
            column: 0,
            show: Some(true),
            ..Default::default()
        };
        let mut pane = column_pane(grid, 0, Some(config));
        pane.build(false).unwrap();
        assert!(pane.displayed());
    }

    #[test]
    fn test_prior_display_state_beats_heuristic() {
        let grid = Arc::new(MemoryGrid::new(&["Id"]));
        for i in 0..10 {
            grid.push_row(vec![GridCell::text(&format!("id-{i}"))]);
        }
        let mut pane = column_pane(grid, 0, None);
        pane.build(true).unwrap();
        assert!(pane.displayed());
    }

    #[test]
    fn test_or_combiner_admits_any_match() {
        let grid = Arc::new(MemoryGrid::new(&["Color"]));
        for color in ["red", "blue", "green"] {
            grid.push_row(vec![GridCell::text(color)]);
        }
        let mut pane = column_pane(Arc::clone(&grid), 0, None);
        pane.build(false).unwrap();
        select(&mut pane, &["red", "blue"]);

        assert!(pane.admits(0));
        assert!(pane.admits(1));
        assert!(!pane.admits(2));
    }

    #[test]
    fn test_and_combiner_with_two_scalars_admits_nothing() {
        let grid = Arc::new(MemoryGrid::new(&["Color"]));
        for color in ["red", "blue", "green"] {
            grid.push_row(vec![GridCell::text(color)]);
        }
        let config = ColumnConfig {
            column: 0,
            combiner: Some(Combiner::And),
            ..Default::default()
        };
        let mut pane = column_pane(Arc::clone(&grid), 0, Some(config));
        pane.build(false).unwrap();
        select(&mut pane, &["red", "blue"]);

        // A single-valued cell cannot equal two different scalars
        for row in 0..3 {
            assert!(!pane.admits(row));
        }
    }

    #[test]
    fn test_and_combiner_intersects_function_filters() {
        let grid = Arc::new(MemoryGrid::new(&["Price"]));
        for price in [5.0, 15.0, 25.0] {
            grid.push_row(vec![GridCell::number(price)]);
        }
        let over_ten = FilterValue::Test(RowTest::new(|data, _| {
            matches!(&data[0], CellValue::One(Scalar::Number(n)) if *n > 10.0)
        }));
        let under_twenty = FilterValue::Test(RowTest::new(|data, _| {
            matches!(&data[0], CellValue::One(Scalar::Number(n)) if *n < 20.0)
        }));
        let config = ColumnConfig {
            column: 0,
            combiner: Some(Combiner::And),
            options: Some(vec![
                fp_core::config::CustomOption {
                    label: "Over 10".to_string(),
                    value: over_ten.clone(),
                },
                fp_core::config::CustomOption {
                    label: "Under 20".to_string(),
                    value: under_twenty.clone(),
                },
            ]),
            ..Default::default()
        };
        let mut pane = column_pane(Arc::clone(&grid), 0, Some(config));
        pane.build(false).unwrap();
        pane.stage_select(&[over_ten, under_twenty]);
        pane.commit_selection();

        assert!(!pane.admits(0));
        assert!(pane.admits(1));
        assert!(!pane.admits(2));
    }

    #[test]
    fn test_multi_value_cell_matches_scalar_selection() {
        let grid = Arc::new(MemoryGrid::new(&["Tags"]));
        grid.push_row(vec![GridCell::multi(&["red", "blue"])]);
        grid.push_row(vec![GridCell::text("green")]);
        let mut pane = column_pane(Arc::clone(&grid), 0, None);
        pane.build(false).unwrap();
        select(&mut pane, &["red"]);

        assert!(pane.admits(0));
        assert!(!pane.admits(1));
    }

    #[test]
    fn test_empty_selection_admits_everything() {
        let grid = Arc::new(MemoryGrid::new(&["Color"]));
        grid.push_row(vec![GridCell::text("red")]);
        let mut pane = column_pane(Arc::clone(&grid), 0, None);
        pane.build(false).unwrap();
        assert!(pane.admits(0));
    }

    #[test]
    fn test_rebuild_drops_selections_the_data_no_longer_has() {
        let grid = Arc::new(MemoryGrid::new(&["Color"]));
        grid.push_row(vec![GridCell::text("red")]);
        grid.push_row(vec![GridCell::text("blue")]);
        grid.push_row(vec![GridCell::text("red")]);
        let mut pane = column_pane(Arc::clone(&grid), 0, None);
        pane.build(false).unwrap();
        select(&mut pane, &["red", "blue"]);
        assert_eq!(pane.selection_len(), 2);

        grid.replace_rows(vec![
            vec![GridCell::text("blue")],
            vec![GridCell::text("cyan")],
        ]);
        pane.rebuild(true).unwrap();
        assert_eq!(pane.selection_len(), 1);
        assert!(pane.selection.contains_key(&BinKey::Value("blue".into())));
    }

    #[test]
    fn test_pre_select_applies_on_build() {
        let grid = Arc::new(MemoryGrid::new(&["Color"]));
        for color in ["red", "blue", "red", "green", "blue", "red"] {
            grid.push_row(vec![GridCell::text(color)]);
        }
        let config = ColumnConfig {
            column: 0,
            pre_select: vec!["blue".into()],
            ..Default::default()
        };
        let mut pane = column_pane(Arc::clone(&grid), 0, Some(config));
        pane.build(false).unwrap();
        assert_eq!(pane.selection_len(), 1);
        assert!(!pane.admits(0));
        assert!(pane.admits(1));
    }
}
