//! Menu catalog store.
//!
//! Holds the full, unfiltered list of menu items and categories fetched
//! from the backend. Loaded once at startup (when configured) and on
//! explicit refresh; read-only for every consumer except the designated
//! `replace` mutation used by the fetch path. Items are never mutated
//! client-side.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;
use tracing::{trace, warn};

use crate::api;
use crate::error::ClientError;
use crate::pricing;

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// A purchasable dish, exactly as the backend serves it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub price: f64,
    #[serde(default)]
    pub discount_percentage: Option<f64>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub prep_time: Option<u32>,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub is_vegetarian: bool,
    #[serde(default)]
    pub is_spicy: bool,
    #[serde(default)]
    pub is_gluten_free: bool,
    #[serde(default)]
    pub is_chef_special: bool,
    #[serde(default)]
    pub is_popular: bool,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub popularity: Option<i64>,
    #[serde(default)]
    pub order_count: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl MenuItem {
    /// Price after the item's own discount, before any cart-level coupon.
    pub fn effective_price(&self) -> f64 {
        pricing::effective_unit_price(self.price, self.discount_percentage)
    }
}

/// A grouping label with optional display metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub is_popular: bool,
    #[serde(default)]
    pub is_trending: bool,
}

impl Category {
    /// Whether `item_category` (the string on a MenuItem) belongs to this
    /// category. Matches id or display name, case-insensitively.
    pub fn matches(&self, item_category: &str) -> bool {
        self.id.eq_ignore_ascii_case(item_category) || self.name.eq_ignore_ascii_case(item_category)
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct CatalogData {
    items: Vec<MenuItem>,
    categories: Vec<Category>,
    loaded: bool,
}

/// Tauri managed state holding the catalog. Presentation reads snapshots;
/// only the fetch path writes, through `replace`.
pub struct CatalogState {
    inner: Mutex<CatalogData>,
}

impl CatalogState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(CatalogData::default()),
        }
    }

    /// Designated mutation entry point: swap in a freshly fetched catalog.
    pub fn replace(&self, items: Vec<MenuItem>, categories: Vec<Category>) {
        let mut data = self.inner.lock().unwrap();
        data.items = items;
        data.categories = categories;
        data.loaded = true;
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.lock().unwrap().loaded
    }

    /// Snapshot of all items, in catalog order.
    pub fn items(&self) -> Vec<MenuItem> {
        self.inner.lock().unwrap().items.clone()
    }

    /// Look up a single item; absent ids get an explicit not-found error,
    /// never a blank view.
    pub fn item_by_id(&self, id: &str) -> Result<MenuItem, ClientError> {
        self.inner
            .lock()
            .unwrap()
            .items
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| ClientError::not_found("Menu item", id))
    }

    /// Categories with a count for each. A server-supplied count wins;
    /// otherwise the count is derived from the loaded items, so it always
    /// equals the number of items whose category matches.
    pub fn categories_with_counts(&self) -> Vec<Category> {
        let data = self.inner.lock().unwrap();
        data.categories
            .iter()
            .map(|c| {
                let count = c
                    .count
                    .unwrap_or_else(|| data.items.iter().filter(|i| c.matches(&i.category)).count());
                Category {
                    count: Some(count),
                    ..c.clone()
                }
            })
            .collect()
    }
}

impl Default for CatalogState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Fetch from backend
// ---------------------------------------------------------------------------

fn parse_rows<T: serde::de::DeserializeOwned>(rows: &[Value], what: &str) -> Vec<T> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match serde_json::from_value::<T>(row.clone()) {
            Ok(parsed) => out.push(parsed),
            Err(e) => warn!("skipping malformed {what} row: {e}"),
        }
    }
    out
}

fn section<'a>(data: &'a Value, keys: &[&str]) -> &'a [Value] {
    for key in keys {
        if let Some(arr) = data.get(*key).and_then(Value::as_array) {
            return arr;
        }
    }
    &[]
}

/// Fetch and parse the catalog from `GET /api/catalog`, without touching
/// the store.
///
/// The backend wraps the payload as `{ items, categories }`; legacy
/// deployments used `{ data: { menuItems, categories } }`, so both shapes
/// are accepted.
pub async fn fetch_catalog() -> Result<(Vec<MenuItem>, Vec<Category>), ClientError> {
    let resp = api::fetch_from_backend("/api/catalog", Method::GET, None).await?;

    let data = resp.get("data").unwrap_or(&resp);
    let item_rows = section(data, &["items", "menuItems", "menu_items"]);
    let category_rows = section(data, &["categories"]);

    if item_rows.is_empty() && category_rows.is_empty() {
        return Err(ClientError::remote("Catalog response carried no data"));
    }

    Ok((
        parse_rows(item_rows, "menu item"),
        parse_rows(category_rows, "category"),
    ))
}

/// Swap a fetched catalog into the store and report counts. Separate from
/// the fetch so a caller can decide, after the response arrived, whether
/// it still should be applied.
pub fn commit_catalog(
    state: &CatalogState,
    items: Vec<MenuItem>,
    categories: Vec<Category>,
) -> Value {
    trace!(
        items = items.len(),
        categories = categories.len(),
        "catalog loaded"
    );
    let counts = serde_json::json!({
        "items": items.len(),
        "categories": categories.len(),
    });
    state.replace(items, categories);
    serde_json::json!({ "success": true, "counts": counts })
}

/// Fetch and commit in one step, for callers with no competing load.
pub async fn load_catalog(state: &CatalogState) -> Result<Value, ClientError> {
    let (items, categories) = fetch_catalog().await?;
    Ok(commit_catalog(state, items, categories))
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn item(id: &str, category: &str, price: f64) -> MenuItem {
        MenuItem {
            id: id.into(),
            name: format!("Item {id}"),
            description: String::new(),
            category: category.into(),
            price,
            discount_percentage: None,
            rating: None,
            prep_time: None,
            is_available: true,
            is_vegetarian: false,
            is_spicy: false,
            is_gluten_free: false,
            is_chef_special: false,
            is_popular: false,
            is_premium: false,
            created_at: None,
            popularity: None,
            order_count: None,
            tags: vec![],
        }
    }

    fn category(id: &str, name: &str, count: Option<usize>) -> Category {
        Category {
            id: id.into(),
            name: name.into(),
            icon: None,
            color: None,
            count,
            is_popular: false,
            is_trending: false,
        }
    }

    #[test]
    fn item_deserializes_from_backend_shape() {
        let parsed: MenuItem = serde_json::from_value(serde_json::json!({
            "_id": "itm-1",
            "name": "Paneer Tikka",
            "category": "veg",
            "price": 240.0,
            "discountPercentage": 10.0,
            "rating": 4.2,
            "isVegetarian": true,
            "tags": ["starter", "tandoor"]
        }))
        .expect("deserialize menu item");

        assert_eq!(parsed.id, "itm-1");
        assert!(parsed.is_available, "availability defaults to true");
        assert!(parsed.is_vegetarian);
        assert_eq!(parsed.discount_percentage, Some(10.0));
        assert!((parsed.effective_price() - 216.0).abs() < 1e-9);
    }

    #[test]
    fn derived_category_counts_match_item_membership() {
        let state = CatalogState::new();
        state.replace(
            vec![
                item("a", "veg", 100.0),
                item("b", "veg", 120.0),
                item("c", "desserts", 90.0),
            ],
            vec![
                category("veg", "Veg", None),
                category("desserts", "Desserts", None),
                category("seafood", "Seafood", None),
            ],
        );

        let cats = state.categories_with_counts();
        assert_eq!(cats[0].count, Some(2));
        assert_eq!(cats[1].count, Some(1));
        assert_eq!(cats[2].count, Some(0));
    }

    #[test]
    fn server_supplied_count_wins_over_derivation() {
        let state = CatalogState::new();
        state.replace(
            vec![item("a", "veg", 100.0)],
            vec![category("veg", "Veg", Some(7))],
        );
        assert_eq!(state.categories_with_counts()[0].count, Some(7));
    }

    #[test]
    fn missing_item_id_is_an_explicit_not_found() {
        let state = CatalogState::new();
        state.replace(vec![item("a", "veg", 100.0)], vec![]);

        let err = state.item_by_id("ghost").unwrap_err();
        assert_eq!(err.to_string(), "Menu item not found: ghost");
        assert!(state.item_by_id("a").is_ok());
    }
}
