use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::browse::{self, CatalogQuery};
use crate::catalog::{self, CatalogState, Category, MenuItem};
use crate::commands::runtime::ViewState;
use crate::error::ClientError;

/// Settle a finished catalog fetch: a response whose token was cancelled
/// by a newer load is dropped before it can reach the store, so stale
/// data never overwrites fresh data.
fn settle_catalog_load(
    catalog: &CatalogState,
    token: &CancellationToken,
    fetched: Result<(Vec<MenuItem>, Vec<Category>), ClientError>,
) -> Result<Value, String> {
    if token.is_cancelled() {
        info!("catalog load superseded, dropping response");
        return Ok(serde_json::json!({ "superseded": true }));
    }
    let (items, categories) = fetched.map_err(String::from)?;
    Ok(catalog::commit_catalog(catalog, items, categories))
}

/// Refresh the catalog from the backend. Stale responses (a newer load
/// started while this one was in flight) are dropped.
#[tauri::command]
pub async fn catalog_load(
    catalog: tauri::State<'_, CatalogState>,
    views: tauri::State<'_, ViewState>,
) -> Result<Value, String> {
    let token = views.begin("catalog");
    let fetched = catalog::fetch_catalog().await;
    settle_catalog_load(&catalog, &token, fetched)
}

/// Filter and sort the in-memory catalog. Pure and synchronous; the
/// frontend calls this on every keystroke.
#[tauri::command]
pub async fn catalog_query(
    arg0: Option<Value>,
    catalog: tauri::State<'_, CatalogState>,
) -> Result<Value, String> {
    let query = CatalogQuery::from_payload(arg0.as_ref());
    let items = catalog.items();
    let matched = browse::filter_and_sort(&items, &query);
    let matched_count = matched.len();
    Ok(serde_json::json!({
        "items": matched,
        "total": items.len(),
        "matched": matched_count,
    }))
}

#[tauri::command]
pub async fn catalog_get_item(
    arg0: Option<Value>,
    catalog: tauri::State<'_, CatalogState>,
) -> Result<Value, String> {
    let id = super::payload_arg0_as_string(arg0, &["id", "itemId", "item_id"])
        .ok_or("Missing menu item ID")?;
    let item = catalog.item_by_id(&id).map_err(String::from)?;
    serde_json::to_value(item).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn catalog_get_categories(
    catalog: tauri::State<'_, CatalogState>,
) -> Result<Value, String> {
    serde_json::to_value(catalog.categories_with_counts()).map_err(|e| e.to_string())
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, category: &str, price: f64) -> MenuItem {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": format!("Item {id}"),
            "category": category,
            "price": price,
        }))
        .unwrap()
    }

    #[test]
    fn superseded_load_never_reaches_the_store() {
        let store = CatalogState::new();
        let views = ViewState::default();

        // An old load starts, then a newer one supersedes it.
        let stale = views.begin("catalog");
        let fresh = views.begin("catalog");

        // The newer response lands first and commits.
        let out =
            settle_catalog_load(&store, &fresh, Ok((vec![item("new", "veg", 100.0)], vec![])))
                .unwrap();
        assert_eq!(out["success"], true);

        // The old response arrives late; it must be dropped, not applied.
        let out =
            settle_catalog_load(&store, &stale, Ok((vec![item("old", "veg", 90.0)], vec![])))
                .unwrap();
        assert_eq!(out["superseded"], true);

        let items = store.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "new");
    }

    #[test]
    fn superseded_failure_is_dropped_instead_of_surfaced() {
        let store = CatalogState::new();
        let views = ViewState::default();
        let stale = views.begin("catalog");
        let _fresh = views.begin("catalog");

        let out = settle_catalog_load(
            &store,
            &stale,
            Err(ClientError::remote("backend unreachable")),
        )
        .unwrap();
        assert_eq!(out["superseded"], true);
        assert!(!store.is_loaded());
    }
}
