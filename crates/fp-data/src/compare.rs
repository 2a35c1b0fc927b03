//! Custom-option counting
//!
//! Configured options (per-column overrides and custom panes) are not
//! scanned out of the data; their counts come from evaluating each
//! option against the displayed and total row sets.

use fp_core::host::GridHost;
use fp_core::value::{CellRole, CellValue, FilterValue, RowIdx, Scalar};

/// Shown/total occurrence counts for one configured option
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComparisonCounts {
    /// Rows matching under the grid's current filters
    pub shown: usize,

    /// Rows matching across the whole dataset
    pub total: usize,
}

/// Count how many displayed and total rows one configured option matches.
///
/// Function-valued options are invoked with the full row content. Scalar
/// and list values need a backing column to compare against; a custom
/// pane without one counts them as zero.
pub fn count_option(
    host: &dyn GridHost,
    value: &FilterValue,
    displayed: &[RowIdx],
    all: &[RowIdx],
    column: Option<usize>,
) -> ComparisonCounts {
    ComparisonCounts {
        shown: count_rows(host, value, displayed, column),
        total: count_rows(host, value, all, column),
    }
}

fn count_rows(
    host: &dyn GridHost,
    value: &FilterValue,
    rows: &[RowIdx],
    column: Option<usize>,
) -> usize {
    match value {
        FilterValue::Test(test) => rows
            .iter()
            .filter(|&&row| test.matches(&host.row_data(row), row))
            .count(),
        FilterValue::Scalar(scalar) => match column {
            Some(column) => rows
                .iter()
                .filter(|&&row| cell_matches(&host.cell(row, column, CellRole::Filter), scalar))
                .count(),
            None => 0,
        },
        FilterValue::Many(scalars) => match column {
            Some(column) => rows
                .iter()
                .filter(|&&row| {
                    let cell = host.cell(row, column, CellRole::Filter);
                    scalars.iter().any(|scalar| cell_matches(&cell, scalar))
                })
                .count(),
            None => 0,
        },
    }
}

fn cell_matches(cell: &CellValue, scalar: &Scalar) -> bool {
    match cell {
        CellValue::One(value) => value.key() == scalar.key(),
        CellValue::Many(values) => values.iter().any(|value| value.key() == scalar.key()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{GridCell, MemoryGrid};
    use fp_core::host::RowScope;
    use fp_core::value::RowTest;

    #[test]
    fn test_function_option_counts_by_evaluation() {
        let grid = MemoryGrid::new(&["Price"]);
        for price in [5.0, 15.0, 25.0, 35.0] {
            grid.push_row(vec![GridCell::number(price)]);
        }
        let all = grid.rows(RowScope::All);
        let over_ten = FilterValue::Test(RowTest::new(|data, _| {
            matches!(&data[0], CellValue::One(Scalar::Number(n)) if *n > 10.0)
        }));

        let counts = count_option(&grid, &over_ten, &all[..2], &all, None);
        assert_eq!(counts.shown, 1);
        assert_eq!(counts.total, 3);
    }

    #[test]
    fn test_scalar_option_counts_against_column() {
        let grid = MemoryGrid::new(&["Color"]);
        for color in ["red", "blue", "red"] {
            grid.push_row(vec![GridCell::text(color)]);
        }
        let all = grid.rows(RowScope::All);
        let red = FilterValue::Scalar("red".into());

        let counts = count_option(&grid, &red, &all, &all, Some(0));
        assert_eq!(counts.total, 2);

        // No backing column means no rows to compare against
        let counts = count_option(&grid, &red, &all, &all, None);
        assert_eq!(counts.total, 0);
    }
}
