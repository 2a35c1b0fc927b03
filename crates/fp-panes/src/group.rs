//! Pane group coordination
//!
//! The group owns every pane for one grid, dispatches typed engine
//! events through a single handler, decides which panes to recompute
//! when a selection changes and replays the selection ledger so cascade
//! state rebuilds deterministically. Reentrancy is controlled with two
//! plain flags: `updating` suppresses nested redraws, `regenerating`
//! suppresses ledger bookkeeping while a cascade replay is re-selecting.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use fp_core::clock::{Clock, MonotonicClock};
use fp_core::config::{resolve, GroupConfig, PaneSort};
use fp_core::events::PaneEvent;
use fp_core::host::{GridHost, RowScope};
use fp_core::value::{BinKey, FilterValue, PaneKey, RowIdx};
use fp_data::server::{ServerData, ServerPayload};
use fp_data::snapshot::GroupSnapshot;
use fp_data::PaneDataError;

use crate::ledger::{LedgerEntry, SelectionLedger};
use crate::pane::Pane;
use crate::viewmodel::GroupView;

/// Which pane currently drives the filtering, when exactly one does.
/// That pane's own counts are measured against the unfiltered-by-self
/// baseline so it never filters against its own in-progress selection.
#[derive(Debug, Clone)]
enum FilterPane {
    None,
    Single(PaneKey),
    Multiple,
}

struct PendingDeselect {
    pane: PaneKey,
    due: Instant,
}

pub struct PaneGroup {
    host: Arc<dyn GridHost>,
    cfg: GroupConfig,
    clock: Arc<dyn Clock>,
    panes: Vec<Pane>,
    ledger: SelectionLedger,
    filter_pane: FilterPane,
    updating: bool,
    regenerating: bool,
    pending_deselects: Vec<PendingDeselect>,
    filter_changed: Option<Box<dyn Fn(usize) + Send + Sync>>,
    filter_count: usize,
    title: String,
}

impl std::fmt::Debug for PaneGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaneGroup")
            .field("cfg", &self.cfg)
            .field("pane_count", &self.panes.len())
            .field("filter_pane", &self.filter_pane)
            .field("updating", &self.updating)
            .field("regenerating", &self.regenerating)
            .field("filter_count", &self.filter_count)
            .field("title", &self.title)
            .finish()
    }
}

impl PaneGroup {
    pub fn new(host: Arc<dyn GridHost>, cfg: GroupConfig) -> Result<Self, PaneDataError> {
        Self::with_clock(host, cfg, Arc::new(MonotonicClock))
    }

    /// Construct with an explicit clock; tests drive the deselect
    /// debounce through a manual one.
    pub fn with_clock(
        host: Arc<dyn GridHost>,
        cfg: GroupConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PaneDataError> {
        let capabilities = host.capabilities();
        if !capabilities.selection {
            return Err(PaneDataError::MissingCapability("selection"));
        }
        if !host.try_claim_panes() {
            return Err(PaneDataError::GroupAlreadyAttached);
        }

        let panes = Self::create_panes(&host, &cfg);
        let mut group = Self {
            host,
            cfg,
            clock,
            panes,
            ledger: SelectionLedger::new(),
            filter_pane: FilterPane::None,
            updating: false,
            regenerating: false,
            pending_deselects: Vec::new(),
            filter_changed: None,
            filter_count: 0,
            title: String::new(),
        };
        // On failure the claim and any predicates release through Drop
        group.startup()?;
        Ok(group)
    }

    /// Central dispatch for engine events
    pub fn handle_event(&mut self, event: PaneEvent) -> Result<(), PaneDataError> {
        match event {
            PaneEvent::SelectionChanged { pane } => self.on_select(pane),
            PaneEvent::DeselectionChanged { pane } => {
                self.schedule_deselect(pane);
                Ok(())
            }
            PaneEvent::DataReloaded => {
                debug!("data reload, rebuilding panes");
                self.rebuild(None, true)
            }
            PaneEvent::StructureChanged => self.on_structure_changed(),
        }
    }

    /// Select filter values in a pane; the presentation layer's select
    /// intent
    pub fn select(&mut self, pane: &PaneKey, values: &[FilterValue]) -> Result<(), PaneDataError> {
        let changed = match self.pane_mut(pane) {
            Some(target) => target.stage_select(values),
            None => false,
        };
        if changed {
            self.handle_event(PaneEvent::SelectionChanged { pane: pane.clone() })?;
        }
        Ok(())
    }

    /// Deselect filter values in a pane. The commit is debounced so a
    /// rapid deselect-then-reselect collapses into one recomputation.
    pub fn deselect(&mut self, pane: &PaneKey, values: &[FilterValue]) -> Result<(), PaneDataError> {
        let changed = match self.pane_mut(pane) {
            Some(target) => target.stage_deselect(values),
            None => false,
        };
        if changed {
            self.handle_event(PaneEvent::DeselectionChanged { pane: pane.clone() })?;
        }
        Ok(())
    }

    /// Commit debounced deselects that have come due. Returns how many
    /// committed.
    pub fn poll(&mut self) -> Result<usize, PaneDataError> {
        let now = self.clock.now();
        let mut committed = 0;
        loop {
            let Some(position) = self.pending_deselects.iter().position(|p| p.due <= now) else {
                break;
            };
            let pending = self.pending_deselects.remove(position);
            if let Some(target) = self.pane_mut(&pending.pane) {
                target.deselect_pending = true;
                target.commit_selection();
            }
            let outcome = self.redraw();
            for pane in &mut self.panes {
                pane.deselect_pending = false;
            }
            self.host.request_redraw();
            outcome?;
            committed += 1;
        }
        Ok(committed)
    }

    /// Recompute counts, visibility and the active-filter summary across
    /// all panes
    pub fn redraw(&mut self) -> Result<(), PaneDataError> {
        if self.updating {
            return Ok(());
        }
        self.updating = true;
        let outcome = self.redraw_inner();
        self.updating = false;
        outcome
    }

    /// Clear one pane's search box and selection, replaying whatever the
    /// other panes still hold
    pub fn clear_pane(&mut self, pane: &PaneKey) -> Result<(), PaneDataError> {
        let cleared = match self.pane_mut(pane) {
            Some(target) => {
                target.search_term.clear();
                target.clear_selection()
            }
            None => false,
        };
        if !cleared {
            return Ok(());
        }
        let entries = self.ledger.condense(Some(pane));
        if self.cfg.cascade_panes && !entries.is_empty() {
            self.cascade_regen(entries)?;
        } else {
            self.ledger.replace(entries);
        }
        self.redraw()?;
        self.host.request_redraw();
        Ok(())
    }

    /// Clear every pane's search box and selections
    pub fn clear_selections(&mut self) -> Result<(), PaneDataError> {
        for pane in &mut self.panes {
            pane.search_term.clear();
            pane.clear_selection();
        }
        self.ledger.clear();
        self.redraw()?;
        self.host.request_redraw();
        Ok(())
    }

    /// Re-scan one pane, or all of them, re-applying whichever
    /// selections still resolve
    pub fn rebuild(
        &mut self,
        target: Option<&PaneKey>,
        maintain_selection: bool,
    ) -> Result<(), PaneDataError> {
        for pane in &mut self.panes {
            if target.map_or(true, |key| key == pane.key()) {
                pane.rebuild(maintain_selection)?;
            }
        }
        if self.cfg.cascade_panes && !self.ledger.is_empty() {
            let entries = self.ledger.condense(None);
            if !entries.is_empty() {
                self.cascade_regen(entries)?;
            }
        }
        self.redraw()?;
        self.host.request_redraw();
        Ok(())
    }

    /// Detach a single pane, removing exactly its own predicate from the
    /// host chain
    pub fn detach_pane(&mut self, key: &PaneKey) -> bool {
        let Some(position) = self.panes.iter().position(|pane| pane.key() == key) else {
            return false;
        };
        let pane = self.panes.remove(position);
        pane.detach();
        true
    }

    /// Filter a pane's own option list; applies immediately, the grid is
    /// untouched
    pub fn set_search_term(&mut self, pane: &PaneKey, term: &str) {
        if let Some(target) = self.pane_mut(pane) {
            target.search_term = term.to_string();
        }
        self.persist();
    }

    pub fn set_sort(&mut self, pane: &PaneKey, sort: PaneSort) {
        if let Some(target) = self.pane_mut(pane) {
            target.sort = sort;
        }
        self.persist();
    }

    /// Ingest per-column option summaries from a server response
    pub fn apply_server_response(&mut self, data: &ServerData) -> Result<(), PaneDataError> {
        for pane in &mut self.panes {
            pane.apply_server_options(data);
        }
        self.redraw()?;
        self.host.request_redraw();
        Ok(())
    }

    /// Selected display values per column source, contributed to the
    /// next outgoing server request
    pub fn server_request_payload(&self) -> ServerPayload {
        let mut payload = ServerPayload::default();
        for pane in &self.panes {
            if let Some(column) = pane.column() {
                let source = self.host.column_source(column);
                let values = pane
                    .selection_snapshot()
                    .iter()
                    .map(|option| option.display.clone())
                    .collect();
                payload.0.insert(source, values);
            }
        }
        payload
    }

    /// Explicitly restore a persisted snapshot over the current state
    pub fn restore_state(&mut self, value: serde_json::Value) -> Result<(), PaneDataError> {
        let snapshot: GroupSnapshot = serde_json::from_value(value)?;
        self.apply_snapshot(&snapshot)?;
        self.redraw()?;
        self.host.request_redraw();
        Ok(())
    }

    pub fn snapshot(&self) -> GroupSnapshot {
        let mut snapshot = GroupSnapshot::new();
        snapshot.selection_list = self.ledger.to_snapshot();
        snapshot.panes = self.panes.iter().map(Pane::snapshot).collect();
        snapshot
    }

    pub fn view(&self) -> GroupView {
        GroupView {
            title: self.title.clone(),
            panes: self
                .panes
                .iter()
                .filter(|pane| pane.displayed())
                .map(|pane| pane.view(self.cfg.cascade_panes, self.cfg.view_total))
                .collect(),
        }
    }

    pub fn panes(&self) -> &[Pane] {
        &self.panes
    }

    pub fn filter_count(&self) -> usize {
        self.filter_count
    }

    /// The "Filters Active - N" summary line
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Notification invoked whenever the active-filter count is
    /// recomputed
    pub fn on_filter_changed(&mut self, callback: impl Fn(usize) + Send + Sync + 'static) {
        self.filter_changed = Some(Box::new(callback));
    }

    fn create_panes(host: &Arc<dyn GridHost>, cfg: &GroupConfig) -> Vec<Pane> {
        let mut panes = Vec::new();
        let columns: Vec<usize> = if cfg.columns.is_empty() {
            (0..host.column_count()).collect()
        } else {
            cfg.columns.clone()
        };
        for column in columns {
            let overrides = cfg.column_configs.iter().find(|c| c.column == column);
            let effective = resolve(&cfg.defaults, overrides, None);
            if column < host.column_count() {
                panes.push(Pane::for_column(Arc::clone(host), column, effective));
            } else {
                // Structural drift: the index outlived its column
                warn!(column, "pane configured for a missing column, using custom fallback");
                panes.push(Pane::for_custom(
                    Arc::clone(host),
                    PaneKey::Column(column),
                    effective,
                ));
            }
        }
        for def in &cfg.panes {
            let effective = resolve(&cfg.defaults, None, Some(def));
            panes.push(Pane::for_custom(
                Arc::clone(host),
                PaneKey::Custom(def.name.clone()),
                effective,
            ));
        }
        Self::order_panes(&mut panes, &cfg.order);
        panes
    }

    fn order_panes(panes: &mut Vec<Pane>, order: &[String]) {
        for (position, name) in order.iter().enumerate() {
            if position >= panes.len() {
                break;
            }
            if let Some(found) = panes.iter().position(|pane| pane.name == *name) {
                let pane = panes.remove(found);
                panes.insert(position, pane);
            }
        }
    }

    fn startup(&mut self) -> Result<(), PaneDataError> {
        let snapshot = self.host.load_state().and_then(|value| {
            match serde_json::from_value::<GroupSnapshot>(value) {
                Ok(snapshot) => Some(snapshot),
                Err(error) => {
                    warn!(%error, "ignoring undecodable persisted state");
                    None
                }
            }
        });

        for pane in &mut self.panes {
            let prior = snapshot.as_ref().and_then(|s| s.pane(pane.key()));
            if let Some(prior) = prior {
                pane.search_term = prior.search_term.clone();
                pane.sort = prior.sort;
            }
            pane.build(prior.map(|p| p.displayed).unwrap_or(false))?;
        }

        if let Some(snapshot) = snapshot {
            self.apply_snapshot_selections(&snapshot)?;
        }

        self.redraw()?;
        info!(panes = self.panes.len(), "pane group attached");
        Ok(())
    }

    fn apply_snapshot(&mut self, snapshot: &GroupSnapshot) -> Result<(), PaneDataError> {
        for pane in &mut self.panes {
            let prior = snapshot.pane(pane.key());
            if let Some(prior) = prior {
                pane.search_term = prior.search_term.clone();
                pane.sort = prior.sort;
            }
            pane.rebuild(false)?;
            if let Some(prior) = prior {
                if prior.displayed {
                    pane.displayed = true;
                }
            }
        }
        self.apply_snapshot_selections(snapshot)
    }

    fn apply_snapshot_selections(&mut self, snapshot: &GroupSnapshot) -> Result<(), PaneDataError> {
        self.restore_ledger(snapshot);
        if self.cfg.cascade_panes && !self.ledger.is_empty() {
            let entries = self.ledger.entries().to_vec();
            self.cascade_regen(entries)?;
        } else {
            for pane in &mut self.panes {
                if let Some(prior) = snapshot.pane(pane.key()) {
                    pane.restore_selection(&prior.selected);
                }
            }
        }
        Ok(())
    }

    /// Resolve persisted ledger entries against the freshly scanned
    /// option sets. Entries for dead panes and values the data no longer
    /// has are silently dropped.
    fn restore_ledger(&mut self, snapshot: &GroupSnapshot) {
        let mut entries = Vec::new();
        for entry in &snapshot.selection_list {
            let Some(pane) = self.panes.iter().find(|p| p.key() == &entry.pane) else {
                continue;
            };
            let selected: Vec<_> = entry
                .selected
                .iter()
                .filter_map(|key| pane.option_by_key(&BinKey::Value(key.clone())).cloned())
                .collect();
            if !selected.is_empty() {
                entries.push(LedgerEntry {
                    pane: entry.pane.clone(),
                    selected,
                    protect: entry.protect,
                });
            }
        }
        self.ledger.replace(entries);
    }

    fn on_select(&mut self, pane: PaneKey) -> Result<(), PaneDataError> {
        // A select supersedes any pending deselect for the same pane
        self.pending_deselects.retain(|pending| pending.pane != pane);
        if let Some(target) = self.pane_mut(&pane) {
            target.commit_selection();
            target.select_present = true;
        }
        if self.updating || self.regenerating {
            // Buffered: the flag is picked up by the redraw in progress
            return Ok(());
        }
        let outcome = self.redraw();
        if let Some(target) = self.pane_mut(&pane) {
            target.select_present = false;
        }
        self.host.request_redraw();
        outcome
    }

    fn schedule_deselect(&mut self, pane: PaneKey) {
        let due = self.clock.now() + self.cfg.deselect_delay;
        if let Some(pending) = self
            .pending_deselects
            .iter_mut()
            .find(|pending| pending.pane == pane)
        {
            pending.due = due;
        } else {
            self.pending_deselects.push(PendingDeselect { pane, due });
        }
    }

    fn redraw_inner(&mut self) -> Result<(), PaneDataError> {
        let total = self.host.rows(RowScope::All).len();
        let visible = self.host.rows(RowScope::Displayed).len();
        let filter_active = visible != total;
        self.filter_pane = self.locate_filter_pane(filter_active);

        if self.regenerating {
            self.refresh_panes(filter_active)?;
            self.update_filter_count();
            return Ok(());
        }

        let mut deselected: Option<PaneKey> = None;
        for pane in &self.panes {
            if pane.select_present {
                self.ledger.push(LedgerEntry {
                    pane: pane.key().clone(),
                    selected: pane.selection_snapshot(),
                    protect: false,
                });
                break;
            } else if pane.deselect_pending {
                deselected = Some(pane.key().clone());
                let snapshot = pane.selection_snapshot();
                if !snapshot.is_empty() {
                    self.ledger.push(LedgerEntry {
                        pane: pane.key().clone(),
                        selected: snapshot,
                        protect: true,
                    });
                }
            }
        }

        let condensed = self.ledger.condense(deselected.as_ref());

        self.refresh_panes(filter_active)?;
        self.update_filter_count();

        if self.cfg.cascade_panes {
            if !condensed.is_empty() && condensed.len() < self.ledger.len() {
                self.cascade_regen(condensed)?;
            }
        } else {
            self.ledger.replace(condensed);
        }

        if !filter_active {
            self.ledger.clear();
        }
        self.persist();
        Ok(())
    }

    /// Clear every pane and re-apply the condensed selection list in its
    /// original temporal order. Ledger order is authoritative here,
    /// never pane display order.
    fn cascade_regen(&mut self, entries: Vec<LedgerEntry>) -> Result<(), PaneDataError> {
        let entries: Vec<LedgerEntry> = entries
            .into_iter()
            .filter(|entry| self.panes.iter().any(|pane| pane.key() == &entry.pane))
            .collect();
        debug!(entries = entries.len(), "cascade regeneration");
        self.regenerating = true;
        for pane in &mut self.panes {
            pane.clear_selection();
        }
        for entry in &entries {
            let Some(position) = self.panes.iter().position(|p| p.key() == &entry.pane) else {
                continue;
            };
            let values: Vec<FilterValue> =
                entry.selected.iter().map(|o| o.filter.clone()).collect();
            {
                let pane = &mut self.panes[position];
                pane.clear_selection();
                pane.stage_select(&values);
                pane.commit_selection();
            }
            // Refresh counts so the next replayed selection sees this one
            let total = self.host.rows(RowScope::All).len();
            let visible = self.host.rows(RowScope::Displayed).len();
            let filter_active = visible != total;
            self.filter_pane = self.locate_filter_pane(filter_active);
            self.refresh_panes(filter_active)?;
            self.update_filter_count();
        }
        self.ledger.replace(entries);
        self.regenerating = false;
        self.persist();
        Ok(())
    }

    fn refresh_panes(&mut self, filter_active: bool) -> Result<(), PaneDataError> {
        for index in 0..self.panes.len() {
            let key = self.panes[index].key().clone();
            let self_filtering = matches!(&self.filter_pane, FilterPane::Single(k) if *k == key);
            let pane_filter_active = filter_active && !self_filtering;
            if self.cfg.cascade_panes {
                let rows = self.rows_excluding(index);
                self.panes[index].refresh(&rows, self.cfg.view_total, pane_filter_active)?;
            } else if self.cfg.view_total {
                let rows = if self_filtering {
                    self.rows_excluding(index)
                } else {
                    self.host.rows(RowScope::Displayed)
                };
                self.panes[index].refresh(&rows, true, pane_filter_active)?;
            } else {
                self.panes[index].filtering_active = pane_filter_active;
            }
        }
        Ok(())
    }

    /// Rows passing every pane's predicate except the given pane's own.
    /// This is what lets a pane show how many rows would remain if one
    /// of its values were additionally selected.
    fn rows_excluding(&self, skip: usize) -> Vec<RowIdx> {
        self.host
            .rows(RowScope::All)
            .into_iter()
            .filter(|&row| {
                self.panes
                    .iter()
                    .enumerate()
                    .all(|(index, pane)| index == skip || pane.admits(row))
            })
            .collect()
    }

    fn locate_filter_pane(&self, filter_active: bool) -> FilterPane {
        if !filter_active {
            return FilterPane::None;
        }
        let mut found = FilterPane::None;
        for pane in &self.panes {
            if pane.has_selection() {
                if matches!(found, FilterPane::None) {
                    found = FilterPane::Single(pane.key().clone());
                } else {
                    return FilterPane::Multiple;
                }
            }
        }
        found
    }

    fn update_filter_count(&mut self) {
        let count: usize = self.panes.iter().map(Pane::selection_len).sum();
        self.filter_count = count;
        self.title = format!("Filters Active - {}", count);
        if let Some(callback) = &self.filter_changed {
            callback(count);
        }
    }

    fn on_structure_changed(&mut self) -> Result<(), PaneDataError> {
        info!("grid structure changed, recreating panes");
        for pane in &self.panes {
            pane.detach();
        }
        self.panes = Self::create_panes(&self.host, &self.cfg);
        for pane in &mut self.panes {
            pane.build(false)?;
        }
        if self.cfg.cascade_panes && !self.ledger.is_empty() {
            let entries = self.ledger.condense(None);
            if !entries.is_empty() {
                self.cascade_regen(entries)?;
            } else {
                self.ledger.clear();
            }
        } else {
            self.ledger.clear();
        }
        self.redraw()?;
        self.host.request_redraw();
        Ok(())
    }

    fn persist(&self) {
        if !self.host.capabilities().state_persistence {
            return;
        }
        match serde_json::to_value(self.snapshot()) {
            Ok(value) => self.host.persist_state(value),
            Err(error) => warn!(%error, "state snapshot could not be serialized"),
        }
    }

    fn pane_mut(&mut self, key: &PaneKey) -> Option<&mut Pane> {
        self.panes.iter_mut().find(|pane| pane.key() == key)
    }
}

impl Drop for PaneGroup {
    fn drop(&mut self) {
        for pane in &self.panes {
            pane.detach();
        }
        self.host.release_panes();
    }
}
