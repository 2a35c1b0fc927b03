//! Presentation view models
//!
//! What the presentation layer renders: per pane an ordered list of
//! labelled, badged, selectable rows, and for the group a title line and
//! the displayed panes in display order. Building these is the only
//! place labels are truncated, empty values substituted and the pane's
//! own search/sort applied.

use fp_core::config::SortField;
use fp_core::value::PaneKey;

use crate::pane::Pane;

/// One renderable option row
#[derive(Debug, Clone, PartialEq)]
pub struct OptionRow {
    pub label: String,

    /// Count badge; `None` when counts are configured hidden
    pub badge: Option<String>,

    pub selected: bool,
}

/// Renderable state of one pane
#[derive(Debug, Clone, PartialEq)]
pub struct PaneView {
    pub key: PaneKey,
    pub title: String,

    /// Whether the pane currently contributes a filter
    pub active: bool,

    pub rows: Vec<OptionRow>,
}

/// Renderable state of the whole group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupView {
    /// The "Filters Active - N" line
    pub title: String,

    /// Displayed panes, in display order
    pub panes: Vec<PaneView>,
}

impl Pane {
    pub(crate) fn view(&self, cascade: bool, view_total: bool) -> PaneView {
        let term = self.search_term.to_lowercase();
        let mut rows: Vec<(String, usize, OptionRow)> = Vec::new();

        for (key, option) in &self.options {
            let shown = self.bins.get(key).copied().unwrap_or(0);
            // Under cascade an option no surviving row carries is omitted
            if cascade && shown == 0 {
                continue;
            }
            let label = self.display_label(&option.display);
            if !term.is_empty() && !label.to_lowercase().contains(&term) {
                continue;
            }
            let total = self.bins_total.get(key).copied().unwrap_or(shown);
            let badge = if self.cfg.hide_count {
                None
            } else if view_total && self.filtering_active {
                Some(format!("{} ({})", shown, total))
            } else {
                Some(total.to_string())
            };
            rows.push((
                option.sort.to_lowercase(),
                shown,
                OptionRow {
                    label,
                    badge,
                    selected: self.selection.contains_key(key),
                },
            ));
        }

        match self.sort.field {
            SortField::Label => rows.sort_by(|a, b| a.0.cmp(&b.0)),
            SortField::Count => rows.sort_by(|a, b| a.1.cmp(&b.1)),
        }
        if self.sort.descending {
            rows.reverse();
        }

        PaneView {
            key: self.key.clone(),
            title: self.title.clone(),
            active: self.has_selection(),
            rows: rows.into_iter().map(|(_, _, row)| row).collect(),
        }
    }

    fn display_label(&self, display: &str) -> String {
        let mut label = if display.is_empty() {
            self.cfg.empty_message.clone()
        } else {
            display.to_string()
        };
        if let Some(max) = self.cfg.data_length {
            if label.chars().count() > max {
                label = label.chars().take(max).collect::<String>() + "...";
            }
        }
        label
    }
}
