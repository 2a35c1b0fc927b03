//! Demo dataset
//!
//! A small manufacturing log: station serials are near-unique (so that
//! pane is suppressed by the uniqueness heuristic), lines and results
//! have low variance, and the defect tags column is multi-valued.

use fp_data::{GridCell, MemoryGrid};

pub fn manufacturing_grid() -> MemoryGrid {
    let grid = MemoryGrid::new(&["Serial", "Line", "Result", "Defects"]);

    let rows: [(&str, &str, &str, &[&str]); 10] = [
        ("SN-1001", "assembly", "passed", &[]),
        ("SN-1002", "assembly", "failed", &["scratch", "misalign"]),
        ("SN-1003", "paint", "passed", &[]),
        ("SN-1004", "assembly", "failed", &["scratch"]),
        ("SN-1005", "paint", "failed", &["blister"]),
        ("SN-1006", "packaging", "passed", &[]),
        ("SN-1007", "assembly", "passed", &[]),
        ("SN-1008", "paint", "passed", &[]),
        ("SN-1009", "packaging", "failed", &["dent", "scratch"]),
        ("SN-1010", "assembly", "passed", &[]),
    ];

    for (serial, line, result, defects) in rows {
        let defects_cell = if defects.is_empty() {
            GridCell::empty()
        } else {
            GridCell::multi(defects)
        };
        grid.push_row(vec![
            GridCell::text(serial),
            GridCell::text(line),
            GridCell::text(result),
            defects_cell,
        ]);
    }

    grid
}
