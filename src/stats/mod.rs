//! World statistics data model and the client-side data pipeline.
//!
//! - [`fallback`]: the built-in 63-entry dataset and the metric catalog
//! - [`fetcher`]: one provider call per refresh, always resolves to a [`FetchResult`]
//! - [`filter`]: pure search/category filtering for rendering
//! - [`store`]: the single source of truth, with change notifications

pub mod fallback;
pub mod fetcher;
pub mod filter;
pub mod store;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// The fixed set of metric categories.
///
/// `Other` is never sent by the provider; it only appears when the
/// coerce policy maps an out-of-set category into a catch-all bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Population,
    GovernmentEconomics,
    SocietyMedia,
    Environment,
    Food,
    Water,
    Energy,
    Health,
    Other,
}

impl Category {
    /// The eight categories the provider is allowed to return, in dashboard order.
    pub const FIXED: [Category; 8] = [
        Category::Population,
        Category::GovernmentEconomics,
        Category::SocietyMedia,
        Category::Environment,
        Category::Food,
        Category::Water,
        Category::Energy,
        Category::Health,
    ];

    /// Parse a wire name from the fixed set. `"other"` is not accepted.
    pub fn parse(s: &str) -> Option<Self> {
        Self::FIXED.into_iter().find(|c| c.as_str() == s.trim())
    }

    /// Wire name, as used in JSON payloads and CSV rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Population => "population",
            Self::GovernmentEconomics => "government_economics",
            Self::SocietyMedia => "society_media",
            Self::Environment => "environment",
            Self::Food => "food",
            Self::Water => "water",
            Self::Energy => "energy",
            Self::Health => "health",
            Self::Other => "other",
        }
    }

    /// Heading used when rendering a card (`government & economics`).
    pub fn display_name(&self) -> String {
        self.as_str().replacen('_', " & ", 1)
    }

    /// Section heading used in the provider prompt.
    pub fn heading(&self) -> &'static str {
        match self {
            Self::Population => "POPULATION",
            Self::GovernmentEconomics => "GOVERNMENT & ECONOMICS",
            Self::SocietyMedia => "SOCIETY & MEDIA",
            Self::Environment => "ENVIRONMENT",
            Self::Food => "FOOD",
            Self::Water => "WATER",
            Self::Energy => "ENERGY",
            Self::Health => "HEALTH",
            Self::Other => "OTHER",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Population => "👥",
            Self::Environment => "🌱",
            Self::GovernmentEconomics => "💰",
            Self::Health => "❤️",
            Self::SocietyMedia => "📱",
            Self::Food => "🍞",
            Self::Water => "💧",
            Self::Energy => "⚡",
            Self::Other => "📊",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One label/value/category metric entry shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRecord {
    pub label: String,
    /// Free-text magnitude (`"$18,000,000,000+"`, `"~40 years"`).
    pub value: String,
    pub category: Category,
}

impl StatRecord {
    pub fn new(label: impl Into<String>, value: impl Into<String>, category: Category) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            category,
        }
    }
}

/// Why a fetch degraded to the fallback dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Quota or rate-limit signal from the provider.
    RateLimited,
    /// Network error, missing credentials, or an empty/malformed payload.
    Provider,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate_limited"),
            Self::Provider => write!(f, "provider"),
        }
    }
}

/// Outcome of one stats fetch.
///
/// `is_fallback == false` implies every record passed category validation
/// (or was explicitly coerced by [`CategoryPolicy::Coerce`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub records: Vec<StatRecord>,
    pub is_fallback: bool,
    /// Set only for fallback results.
    pub failure: Option<FailureKind>,
    /// Number of provider records rejected during validation.
    pub dropped: usize,
}

impl FetchResult {
    pub fn live(records: Vec<StatRecord>, dropped: usize) -> Self {
        Self {
            records,
            is_fallback: false,
            failure: None,
            dropped,
        }
    }

    pub fn fallback(failure: FailureKind) -> Self {
        Self {
            records: fallback::dataset(),
            is_fallback: true,
            failure: Some(failure),
            dropped: 0,
        }
    }
}

/// What to do with a provider record whose category is outside the fixed set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CategoryPolicy {
    /// Reject the record and log it.
    #[default]
    Drop,
    /// Keep the record under [`Category::Other`].
    Coerce,
}

impl std::fmt::Display for CategoryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Drop => write!(f, "drop"),
            Self::Coerce => write!(f, "coerce"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_fixed_set_only() {
        assert_eq!(Category::parse("population"), Some(Category::Population));
        assert_eq!(
            Category::parse("society_media"),
            Some(Category::SocietyMedia)
        );
        assert_eq!(Category::parse("other"), None);
        assert_eq!(Category::parse("sports"), None);
        assert_eq!(Category::parse(""), None);
    }

    #[test]
    fn wire_names_round_trip_through_serde() {
        for cat in Category::FIXED {
            let json = serde_json::to_string(&cat).unwrap();
            assert_eq!(json, format!("\"{}\"", cat.as_str()));
        }
    }

    #[test]
    fn display_name_joins_compound_categories() {
        assert_eq!(
            Category::GovernmentEconomics.display_name(),
            "government & economics"
        );
        assert_eq!(Category::Water.display_name(), "water");
    }
}
