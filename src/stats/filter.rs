//! Search/Filter Engine.
//!
//! Pure functions over a record collection: nothing here holds state, so the
//! visible set is recomputed whenever the collection, query, or category
//! selection changes.

use super::{Category, StatRecord};

/// Sentinel category option meaning "no filter".
pub const ALL: &str = "all";

/// A category selection: everything, or exactly one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    /// Parse a selector value. `"all"` and the empty string mean no filter;
    /// `"other"` selects coerced records. Unknown names return `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "" | ALL => Some(Self::All),
            "other" => Some(Self::Only(Category::Other)),
            name => Category::parse(name).map(Self::Only),
        }
    }

    pub fn matches(&self, category: Category) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => *wanted == category,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => ALL,
            Self::Only(category) => category.as_str(),
        }
    }
}

/// Records whose label contains `query` (case-insensitive) and whose
/// category passes `category`. Order is preserved.
pub fn filter_records<'a>(
    records: &'a [StatRecord],
    query: &str,
    category: CategoryFilter,
) -> Vec<&'a StatRecord> {
    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|r| category.matches(r.category))
        .filter(|r| needle.is_empty() || r.label.to_lowercase().contains(&needle))
        .collect()
}

/// Selector options for the current collection: [`ALL`] followed by each
/// category present, in order of first appearance.
pub fn category_options(records: &[StatRecord]) -> Vec<&'static str> {
    let mut options = vec![ALL];
    for record in records {
        let name = record.category.as_str();
        if !options.contains(&name) {
            options.push(name);
        }
    }
    options
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
