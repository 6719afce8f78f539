//! Catalog filter/sort engine.
//!
//! One engine serves every listing page (menu browse, full menu, search),
//! so the filter semantics cannot drift between views. Pure: given the
//! same catalog snapshot and query it always produces the same ordered
//! list, cheap enough to re-run on every keystroke. Malformed or missing
//! query fields degrade to the documented defaults instead of erroring.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

use crate::catalog::MenuItem;

/// Rating assumed for items the backend shipped without one.
pub const DEFAULT_RATING: f64 = 4.5;

/// Sentinel category that disables category filtering.
pub const ALL_CATEGORIES: &str = "all";

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    Popular,
    PriceLow,
    PriceHigh,
    Rating,
    Newest,
}

impl SortKey {
    /// Parse a sort key string; anything unrecognized falls back to
    /// `Popular`, the default ordering.
    pub fn parse(s: &str) -> SortKey {
        match s.trim().to_ascii_lowercase().as_str() {
            "price-low" | "price_low" => SortKey::PriceLow,
            "price-high" | "price_high" => SortKey::PriceHigh,
            "rating" => SortKey::Rating,
            "newest" => SortKey::Newest,
            _ => SortKey::Popular,
        }
    }
}

/// Query spec for one listing render.
#[derive(Debug, Clone)]
pub struct CatalogQuery {
    /// Case-insensitive substring over name, description, category and
    /// tags. Empty matches everything.
    pub text: String,
    /// Exact category match; `"all"` disables the filter.
    pub category: String,
    /// Inclusive [min, max] price band. `min > max` matches nothing:
    /// an impossible band is kept impossible rather than silently swapped.
    pub price_range: Option<(f64, f64)>,
    /// Items pass when `rating.unwrap_or(4.5) >= min_rating`.
    pub min_rating: f64,
    pub sort: SortKey,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self {
            text: String::new(),
            category: ALL_CATEGORIES.to_string(),
            price_range: None,
            min_rating: 0.0,
            sort: SortKey::Popular,
        }
    }
}

impl CatalogQuery {
    /// Build a query from a frontend payload, tolerating both camelCase
    /// and snake_case keys. Missing or malformed fields keep defaults.
    pub fn from_payload(payload: Option<&Value>) -> CatalogQuery {
        let mut query = CatalogQuery::default();
        let Some(v) = payload else {
            return query;
        };

        if let Some(text) = v.get("text").or_else(|| v.get("search")).and_then(Value::as_str) {
            query.text = text.trim().to_string();
        }
        if let Some(cat) = v.get("category").and_then(Value::as_str) {
            if !cat.trim().is_empty() {
                query.category = cat.trim().to_string();
            }
        }
        if let Some(range) = v
            .get("priceRange")
            .or_else(|| v.get("price_range"))
            .and_then(Value::as_array)
        {
            if let (Some(min), Some(max)) = (
                range.first().and_then(Value::as_f64),
                range.get(1).and_then(Value::as_f64),
            ) {
                query.price_range = Some((min, max));
            }
        }
        if let Some(min_rating) = v
            .get("minRating")
            .or_else(|| v.get("min_rating"))
            .and_then(Value::as_f64)
        {
            query.min_rating = min_rating;
        }
        if let Some(sort) = v.get("sort").or_else(|| v.get("sortKey")).and_then(Value::as_str) {
            query.sort = SortKey::parse(sort);
        }
        query
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

fn matches_text(item: &MenuItem, needle_lower: &str) -> bool {
    if needle_lower.is_empty() {
        return true;
    }
    item.name.to_lowercase().contains(needle_lower)
        || item.description.to_lowercase().contains(needle_lower)
        || item.category.to_lowercase().contains(needle_lower)
        || item
            .tags
            .iter()
            .any(|t| t.to_lowercase().contains(needle_lower))
}

fn matches(item: &MenuItem, query: &CatalogQuery, needle_lower: &str) -> bool {
    if !matches_text(item, needle_lower) {
        return false;
    }
    if query.category != ALL_CATEGORIES && !item.category.eq_ignore_ascii_case(&query.category) {
        return false;
    }
    if let Some((min, max)) = query.price_range {
        if item.price < min || item.price > max {
            return false;
        }
    }
    if item.rating.unwrap_or(DEFAULT_RATING) < query.min_rating {
        return false;
    }
    true
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

fn popularity_signal(item: &MenuItem) -> i64 {
    item.popularity.or(item.order_count).unwrap_or(0)
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn compare(a: &MenuItem, b: &MenuItem, sort: SortKey) -> Ordering {
    match sort {
        SortKey::PriceLow => cmp_f64(a.price, b.price),
        SortKey::PriceHigh => cmp_f64(b.price, a.price),
        SortKey::Rating => cmp_f64(b.rating.unwrap_or(0.0), a.rating.unwrap_or(0.0)),
        // Items without a timestamp sort last.
        SortKey::Newest => match (&b.created_at, &a.created_at) {
            (Some(b_ts), Some(a_ts)) => b_ts.cmp(a_ts),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        },
        SortKey::Popular => popularity_signal(b).cmp(&popularity_signal(a)),
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Narrow and order a catalog snapshot for display.
///
/// Filters apply conjunctively; the surviving set is sorted with a stable
/// sort, so items with equal keys keep their catalog order and unchanged
/// data never jitters across re-renders.
pub fn filter_and_sort(items: &[MenuItem], query: &CatalogQuery) -> Vec<MenuItem> {
    if let Some((min, max)) = query.price_range {
        if min > max {
            return Vec::new();
        }
    }

    let needle_lower = query.text.to_lowercase();
    let mut out: Vec<MenuItem> = items
        .iter()
        .filter(|item| matches(item, query, &needle_lower))
        .cloned()
        .collect();
    out.sort_by(|a, b| compare(a, b, query.sort));
    out
}

// ===========================================================================
// Tests
// ===========================================================================
