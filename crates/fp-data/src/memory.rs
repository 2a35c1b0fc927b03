//! In-memory grid host
//!
//! Reference implementation of the host capability interface, used by
//! tests and the demo binary. Holds rows in memory, evaluates the
//! registered predicate chain for displayed-scope queries and keeps a
//! single pane-group claim plus a persisted-state slot.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use fp_core::host::{GridHost, HostCapabilities, PredicateHandle, RowPredicate, RowScope};
use fp_core::value::{CellRole, CellValue, RowData, RowIdx, Scalar};

/// Cell content for the in-memory grid
///
/// Only the filter value is mandatory; display falls back to it, sort
/// falls back to the display text and the type tag defaults to "string".
#[derive(Debug, Clone)]
pub struct GridCell {
    pub filter: CellValue,
    pub display: Option<CellValue>,
    pub sort: Option<Scalar>,
    pub kind: Option<Scalar>,
}

impl GridCell {
    pub fn text(value: &str) -> Self {
        Self::from_value(CellValue::One(value.into()))
    }

    pub fn number(value: f64) -> Self {
        Self::from_value(CellValue::One(value.into()))
    }

    pub fn empty() -> Self {
        Self::from_value(CellValue::One(Scalar::Empty))
    }

    /// Multi-valued cell; filter and display share the elements
    pub fn multi(values: &[&str]) -> Self {
        Self::from_value(CellValue::Many(values.iter().map(|v| (*v).into()).collect()))
    }

    /// A cell whose stored filter value differs from its rendered label
    pub fn rendered(filter: &str, display: &str) -> Self {
        GridCell {
            filter: CellValue::One(filter.into()),
            display: Some(CellValue::One(display.into())),
            sort: None,
            kind: None,
        }
    }

    fn from_value(filter: CellValue) -> Self {
        GridCell {
            filter,
            display: None,
            sort: None,
            kind: None,
        }
    }
}

/// In-memory reference host grid
pub struct MemoryGrid {
    columns: Vec<String>,
    rows: RwLock<Vec<Vec<GridCell>>>,
    chain: RwLock<Vec<(PredicateHandle, RowPredicate)>>,
    state: RwLock<Option<serde_json::Value>>,
    claimed: AtomicBool,
    redraws: AtomicUsize,
    server_side: bool,
}

impl MemoryGrid {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: RwLock::new(Vec::new()),
            chain: RwLock::new(Vec::new()),
            state: RwLock::new(None),
            claimed: AtomicBool::new(false),
            redraws: AtomicUsize::new(0),
            server_side: false,
        }
    }

    /// Mark this grid as server-backed: option data arrives via server
    /// summaries instead of local scans.
    pub fn server_side(mut self) -> Self {
        self.server_side = true;
        self
    }

    pub fn push_row(&self, cells: Vec<GridCell>) {
        self.rows.write().push(cells);
    }

    /// Swap the dataset wholesale, as a reload would
    pub fn replace_rows(&self, rows: Vec<Vec<GridCell>>) {
        *self.rows.write() = rows;
    }

    pub fn row_count(&self) -> usize {
        self.rows.read().len()
    }

    /// How many redraws the engine has requested
    pub fn redraw_count(&self) -> usize {
        self.redraws.load(Ordering::Relaxed)
    }

    /// Number of predicates currently registered
    pub fn chain_len(&self) -> usize {
        self.chain.read().len()
    }
}

impl GridHost for MemoryGrid {
    fn capabilities(&self) -> HostCapabilities {
        HostCapabilities {
            selection: true,
            state_persistence: true,
            server_side: self.server_side,
        }
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_title(&self, column: usize) -> String {
        self.columns.get(column).cloned().unwrap_or_default()
    }

    fn column_source(&self, column: usize) -> String {
        self.column_title(column).to_lowercase().replace(' ', "_")
    }

    fn rows(&self, scope: RowScope) -> Vec<RowIdx> {
        let count = self.rows.read().len();
        match scope {
            RowScope::All => (0..count).collect(),
            RowScope::Displayed => {
                // Snapshot the chain so predicates can read cells freely
                let chain: Vec<RowPredicate> =
                    self.chain.read().iter().map(|(_, p)| p.clone()).collect();
                (0..count)
                    .filter(|&row| chain.iter().all(|predicate| predicate(self, row)))
                    .collect()
            }
        }
    }

    fn cell(&self, row: RowIdx, column: usize, role: CellRole) -> CellValue {
        let rows = self.rows.read();
        let Some(cell) = rows.get(row).and_then(|cells| cells.get(column)) else {
            return CellValue::One(Scalar::Empty);
        };
        match role {
            CellRole::Filter => cell.filter.clone(),
            CellRole::Display => cell.display.clone().unwrap_or_else(|| cell.filter.clone()),
            CellRole::Sort => CellValue::One(cell.sort.clone().unwrap_or_else(|| {
                Scalar::Text(
                    cell.display
                        .clone()
                        .unwrap_or_else(|| cell.filter.clone())
                        .as_text(),
                )
            })),
            CellRole::Kind => CellValue::One(
                cell.kind
                    .clone()
                    .unwrap_or_else(|| Scalar::Text("string".to_string())),
            ),
        }
    }

    fn row_data(&self, row: RowIdx) -> RowData {
        let rows = self.rows.read();
        rows.get(row)
            .map(|cells| cells.iter().map(|cell| cell.filter.clone()).collect())
            .unwrap_or_default()
    }

    fn register_row_predicate(&self, handle: PredicateHandle, predicate: RowPredicate) {
        let mut chain = self.chain.write();
        if let Some(slot) = chain.iter_mut().find(|(existing, _)| *existing == handle) {
            slot.1 = predicate;
        } else {
            chain.push((handle, predicate));
        }
    }

    fn unregister_row_predicate(&self, handle: PredicateHandle) {
        let mut chain = self.chain.write();
        if let Some(position) = chain.iter().position(|(existing, _)| *existing == handle) {
            chain.remove(position);
        }
    }

    fn request_redraw(&self) {
        self.redraws.fetch_add(1, Ordering::Relaxed);
    }

    fn try_claim_panes(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn release_panes(&self) {
        self.claimed.store(false, Ordering::Release);
        debug!("pane group detached from memory grid");
    }

    fn load_state(&self) -> Option<serde_json::Value> {
        self.state.read().clone()
    }

    fn persist_state(&self, state: serde_json::Value) {
        *self.state.write() = Some(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn contains(host: &dyn GridHost, row: RowIdx, column: usize, needle: &str) -> bool {
        match host.cell(row, column, CellRole::Filter) {
            CellValue::One(scalar) => scalar.key() == needle,
            CellValue::Many(scalars) => scalars.iter().any(|s| s.key() == needle),
        }
    }

    #[test]
    fn test_displayed_scope_applies_the_chain() {
        let grid = MemoryGrid::new(&["Color"]);
        for color in ["red", "blue", "red", "green"] {
            grid.push_row(vec![GridCell::text(color)]);
        }

        let handle = PredicateHandle::new();
        grid.register_row_predicate(
            handle,
            Arc::new(|host, row| contains(host, row, 0, "red")),
        );

        assert_eq!(grid.rows(RowScope::All), vec![0, 1, 2, 3]);
        assert_eq!(grid.rows(RowScope::Displayed), vec![0, 2]);
    }

    #[test]
    fn test_registration_is_idempotent_per_handle() {
        let grid = MemoryGrid::new(&["Color"]);
        grid.push_row(vec![GridCell::text("red")]);

        let handle = PredicateHandle::new();
        grid.register_row_predicate(handle, Arc::new(|_, _| true));
        grid.register_row_predicate(handle, Arc::new(|_, _| true));
        assert_eq!(grid.chain_len(), 1);

        // A structurally identical predicate under a different handle is
        // a different registration
        let other = PredicateHandle::new();
        grid.register_row_predicate(other, Arc::new(|_, _| true));
        assert_eq!(grid.chain_len(), 2);

        grid.unregister_row_predicate(handle);
        assert_eq!(grid.chain_len(), 1);
        // Removing it again does nothing; the sibling registration stays
        grid.unregister_row_predicate(handle);
        assert_eq!(grid.chain_len(), 1);
    }

    #[test]
    fn test_single_group_claim() {
        let grid = MemoryGrid::new(&["A"]);
        assert!(grid.try_claim_panes());
        assert!(!grid.try_claim_panes());
        grid.release_panes();
        assert!(grid.try_claim_panes());
    }
}
