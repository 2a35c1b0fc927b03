//! Main application entry point
//!
//! Drives the filter pane engine against an in-memory grid: attaches a
//! pane group, walks through a scripted select/deselect sequence and
//! prints the resulting pane view-models after each step.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use fp_core::{FilterValue, GridHost, GroupConfig, PaneKey, RowScope};
use fp_data::MemoryGrid;
use fp_panes::{GroupView, PaneGroup};

mod demo;

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting facetgrid demo");

    let grid = Arc::new(demo::manufacturing_grid());
    let cfg = GroupConfig {
        cascade_panes: true,
        view_total: true,
        ..Default::default()
    };
    let mut group = PaneGroup::new(Arc::clone(&grid) as Arc<dyn GridHost>, cfg)?;
    group.on_filter_changed(|count| info!(count, "active filter count changed"));

    print_view("initial state", &group.view(), &grid);

    let line = PaneKey::Column(1);
    let result = PaneKey::Column(2);

    group.select(&line, &[FilterValue::Scalar("assembly".into())])?;
    print_view("line = assembly", &group.view(), &grid);

    group.select(&result, &[FilterValue::Scalar("failed".into())])?;
    print_view("line = assembly, result = failed", &group.view(), &grid);

    // Deselects commit after the debounce window
    group.deselect(&line, &[FilterValue::Scalar("assembly".into())])?;
    thread::sleep(Duration::from_millis(60));
    group.poll()?;
    print_view("result = failed (line filter removed)", &group.view(), &grid);

    group.clear_selections()?;
    print_view("cleared", &group.view(), &grid);

    Ok(())
}

fn print_view(stage: &str, view: &GroupView, grid: &MemoryGrid) {
    println!("== {stage} ==");
    println!(
        "{} | {} of {} rows visible",
        view.title,
        grid.rows(RowScope::Displayed).len(),
        grid.row_count()
    );
    for pane in &view.panes {
        println!("  [{}]", pane.title);
        for row in &pane.rows {
            let marker = if row.selected { ">" } else { " " };
            let badge = row.badge.as_deref().unwrap_or("");
            println!("   {marker} {:<16} {badge}", row.label);
        }
    }
    println!();
}
