//! Value model for pane options and row cells
//!
//! Everything the engine knows about row content passes through these
//! types; rows themselves stay opaque indices into the host grid.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Row index into the host grid's data
pub type RowIdx = usize;

/// Cell values for one row, in column order
pub type RowData = Vec<CellValue>;

/// Separator used when deriving a canonical key from a list of scalars
const LIST_KEY_SEPARATOR: char = '\u{0}';

/// A single cell scalar as seen by the filter engine
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Number(f64),
    Empty,
}

impl Scalar {
    /// Canonical string key used for bins, matching and persistence
    pub fn key(&self) -> String {
        match self {
            Scalar::Text(text) => text.clone(),
            Scalar::Number(number) => number.to_string(),
            Scalar::Empty => String::new(),
        }
    }

    /// Whether this scalar renders through the configured empty message
    pub fn is_empty(&self) -> bool {
        match self {
            Scalar::Text(text) => text.is_empty(),
            Scalar::Number(_) => false,
            Scalar::Empty => true,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl From<&str> for Scalar {
    fn from(text: &str) -> Self {
        Scalar::Text(text.to_string())
    }
}

impl From<String> for Scalar {
    fn from(text: String) -> Self {
        Scalar::Text(text)
    }
}

impl From<f64> for Scalar {
    fn from(number: f64) -> Self {
        Scalar::Number(number)
    }
}

impl From<i64> for Scalar {
    fn from(number: i64) -> Self {
        Scalar::Number(number as f64)
    }
}

/// A cell value fetched from the host grid
///
/// Multi-valued cells (e.g. a tags column) surface as `Many`; every other
/// cell is a single scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    One(Scalar),
    Many(Vec<Scalar>),
}

impl CellValue {
    /// Flatten to a display string, joining multi-values with a comma
    pub fn as_text(&self) -> String {
        match self {
            CellValue::One(scalar) => scalar.key(),
            CellValue::Many(scalars) => scalars
                .iter()
                .map(Scalar::key)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl From<Scalar> for CellValue {
    fn from(scalar: Scalar) -> Self {
        CellValue::One(scalar)
    }
}

/// User-supplied row test backing function-valued filters
///
/// Identity (the allocation, not the code) is the uniqueness key, so two
/// structurally identical tests never collide in bins or selections.
#[derive(Clone)]
pub struct RowTest(Arc<dyn Fn(&RowData, RowIdx) -> bool + Send + Sync>);

impl RowTest {
    pub fn new(test: impl Fn(&RowData, RowIdx) -> bool + Send + Sync + 'static) -> Self {
        RowTest(Arc::new(test))
    }

    /// Run the test against one row
    pub fn matches(&self, data: &RowData, row: RowIdx) -> bool {
        (self.0)(data, row)
    }

    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl PartialEq for RowTest {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for RowTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RowTest({:#x})", self.identity())
    }
}

/// The filter side of a pane option
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Single scalar, matched by canonical-key equality
    Scalar(Scalar),
    /// Ordered scalar list; matches when any element matches
    Many(Vec<Scalar>),
    /// Custom row test, matched by invoking it
    Test(RowTest),
}

impl FilterValue {
    /// Uniqueness key within a pane
    pub fn key(&self) -> BinKey {
        match self {
            FilterValue::Scalar(scalar) => BinKey::Value(scalar.key()),
            FilterValue::Many(scalars) => {
                let mut joined = String::new();
                for (i, scalar) in scalars.iter().enumerate() {
                    if i > 0 {
                        joined.push(LIST_KEY_SEPARATOR);
                    }
                    joined.push_str(&scalar.key());
                }
                BinKey::Value(joined)
            }
            FilterValue::Test(test) => BinKey::Test(test.identity()),
        }
    }

    /// Canonical string form, used by persistence snapshots
    ///
    /// Function-valued filters have no stable string form; they restore
    /// through configuration, not through state.
    pub fn canonical(&self) -> Option<String> {
        match self.key() {
            BinKey::Value(key) => Some(key),
            BinKey::Test(_) => None,
        }
    }
}

/// Hashable identity of a `FilterValue`, the key of every bin map
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BinKey {
    Value(String),
    Test(usize),
}

/// One selectable option within a pane
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOption {
    /// Value the row filter matches against
    pub filter: FilterValue,

    /// Label shown to the user
    pub display: String,

    /// Value the pane's option list sorts by
    pub sort: String,

    /// Type tag carried through from the column
    pub kind: String,
}

impl FilterOption {
    pub fn key(&self) -> BinKey {
        self.filter.key()
    }
}

/// Orthogonal role of a cell read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellRole {
    Filter,
    Display,
    Sort,
    Kind,
}

/// Stable identity of a pane within a group
///
/// Column panes keep their column index; custom panes are addressed by
/// name. A pane configured for a column index the grid no longer has is
/// treated as a custom pane rather than an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaneKey {
    Column(usize),
    Custom(String),
}

impl fmt::Display for PaneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaneKey::Column(index) => write!(f, "column:{}", index),
            PaneKey::Custom(name) => write!(f, "custom:{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_keys() {
        assert_eq!(Scalar::from("red").key(), "red");
        assert_eq!(Scalar::from(3i64).key(), "3");
        assert_eq!(Scalar::Empty.key(), "");
        assert!(Scalar::Empty.is_empty());
        assert!(Scalar::from("").is_empty());
    }

    #[test]
    fn test_filter_value_keys_distinguish_tests() {
        let a = FilterValue::Test(RowTest::new(|_, _| true));
        let b = FilterValue::Test(RowTest::new(|_, _| true));
        assert_ne!(a.key(), b.key());
        assert_eq!(a.key(), a.clone().key());
        assert_eq!(a.canonical(), None);
    }

    #[test]
    fn test_many_key_is_order_sensitive() {
        let ab = FilterValue::Many(vec!["a".into(), "b".into()]);
        let ba = FilterValue::Many(vec!["b".into(), "a".into()]);
        assert_ne!(ab.key(), ba.key());
    }
}
