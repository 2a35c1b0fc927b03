//! Option scanning
//!
//! Builds the bag of distinct (filter, display, sort, type) tuples for
//! one column from a row set, with occurrence counts. The scan is a pure
//! function of the rows it is handed; displayed-scope and total-scope
//! scans are just different row sets.

use ahash::AHashMap;
use indexmap::IndexMap;
use tracing::debug;

use fp_core::host::GridHost;
use fp_core::value::{BinKey, CellRole, CellValue, FilterOption, FilterValue, RowIdx, Scalar};

use crate::PaneDataError;

/// Result of scanning one column over one row set
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Distinct options in first-seen row order
    pub options: IndexMap<BinKey, FilterOption>,

    /// Occurrence count per distinct filter value
    pub bins: AHashMap<BinKey, usize>,

    /// Every contributing occurrence, the denominator of the
    /// uniqueness-ratio heuristic
    pub total_options: usize,
}

impl ScanOutcome {
    /// Number of distinct filter values seen
    pub fn unique_bins(&self) -> usize {
        self.bins.len()
    }
}

/// Scan `rows` of `column`, expanding multi-value cells one option per
/// element.
///
/// A multi-value cell whose filter and display sequences differ in
/// length aborts the scan: silently skipping the row would corrupt the
/// counts every other pane is about to trust.
pub fn scan_column(
    host: &dyn GridHost,
    column: usize,
    rows: &[RowIdx],
    single_source: Option<CellRole>,
) -> Result<ScanOutcome, PaneDataError> {
    let mut outcome = ScanOutcome::default();

    for &row in rows {
        let filter_cell = host.cell(row, column, single_source.unwrap_or(CellRole::Filter));
        let (display_cell, sort, kind) = match single_source {
            Some(_) => (
                filter_cell.clone(),
                filter_cell.as_text(),
                filter_cell.as_text(),
            ),
            None => (
                host.cell(row, column, CellRole::Display),
                host.cell(row, column, CellRole::Sort).as_text(),
                host.cell(row, column, CellRole::Kind).as_text(),
            ),
        };

        match filter_cell {
            CellValue::Many(filters) => {
                let displays = match display_cell {
                    CellValue::Many(displays) => displays,
                    CellValue::One(_) => {
                        return Err(PaneDataError::MalformedMultiValue {
                            row,
                            column,
                            filter_len: filters.len(),
                            display_len: 1,
                        });
                    }
                };
                if filters.len() != displays.len() {
                    return Err(PaneDataError::MalformedMultiValue {
                        row,
                        column,
                        filter_len: filters.len(),
                        display_len: displays.len(),
                    });
                }
                for (filter, display) in filters.into_iter().zip(displays) {
                    add_occurrence(&mut outcome, filter, display.key(), &sort, &kind);
                }
            }
            CellValue::One(filter) => {
                let display = match &display_cell {
                    CellValue::One(scalar) => scalar.key(),
                    CellValue::Many(_) => display_cell.as_text(),
                };
                add_occurrence(&mut outcome, filter, display, &sort, &kind);
            }
        }
    }

    debug!(
        column,
        rows = rows.len(),
        unique = outcome.unique_bins(),
        total = outcome.total_options,
        "column scan complete"
    );
    Ok(outcome)
}

/// Record one occurrence: first sight appends an option, repeats only
/// increment the bin. Both paths count toward `total_options`.
fn add_occurrence(
    outcome: &mut ScanOutcome,
    filter: Scalar,
    display: String,
    sort: &str,
    kind: &str,
) {
    let key = BinKey::Value(filter.key());
    *outcome.bins.entry(key.clone()).or_insert(0) += 1;
    outcome.options.entry(key).or_insert_with(|| FilterOption {
        filter: FilterValue::Scalar(filter),
        display,
        sort: sort.to_string(),
        kind: kind.to_string(),
    });
    outcome.total_options += 1;
}
