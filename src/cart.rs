//! Cart store and mutation entry points.
//!
//! The cart references menu items by id and owns only quantities. Lines
//! are unique per item id; a quantity that reaches 0 removes its line.
//! The backend owns the persisted cart, so every mutation goes to the
//! server first and the local state is reconciled from the authoritative
//! response (or locally when the server replies without a cart body).
//! A per-item in-flight guard rejects a second mutation for the same item
//! while one is pending, so rapid repeated clicks cannot lose updates.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::api;
use crate::catalog::CatalogState;
use crate::error::ClientError;
use crate::pricing::{self, AddOn, DeliveryOption, PricedLine, Totals};

/// Quantity cap enforced by the quick-add control. The full cart view
/// does not cap.
pub const QUICK_ADD_MAX_QTY: u32 = 10;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One (item, quantity) pair. Quantity is always >= 1 in a stored line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(alias = "itemId", alias = "menu_item_id")]
    pub menu_item_id: String,
    pub quantity: u32,
}

/// Tauri managed state holding the session cart.
pub struct CartState {
    lines: Mutex<Vec<CartLine>>,
    pending: Arc<Mutex<HashSet<String>>>,
}

/// Releases the per-item in-flight slot when the mutation finishes,
/// whichever way it finishes.
#[derive(Debug)]
pub struct MutationGuard {
    pending: Arc<Mutex<HashSet<String>>>,
    item_id: String,
}

impl Drop for MutationGuard {
    fn drop(&mut self) {
        self.pending.lock().unwrap().remove(&self.item_id);
    }
}

impl CartState {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(Vec::new()),
            pending: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Claim the in-flight slot for an item. Fails while a previous
    /// mutation for the same item is still awaiting the server.
    pub fn begin_mutation(&self, item_id: &str) -> Result<MutationGuard, ClientError> {
        let mut pending = self.pending.lock().unwrap();
        if !pending.insert(item_id.to_string()) {
            return Err(ClientError::validation(
                "This item is still being updated. Please wait a moment.",
            ));
        }
        Ok(MutationGuard {
            pending: Arc::clone(&self.pending),
            item_id: item_id.to_string(),
        })
    }

    pub fn lines(&self) -> Vec<CartLine> {
        self.lines.lock().unwrap().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.lines.lock().unwrap().clear();
    }

    /// Local merge of an add: existing line grows, otherwise a new line.
    pub fn apply_add(&self, item_id: &str, quantity: u32) {
        let mut lines = self.lines.lock().unwrap();
        match lines.iter_mut().find(|l| l.menu_item_id == item_id) {
            Some(line) => line.quantity += quantity,
            None => lines.push(CartLine {
                menu_item_id: item_id.to_string(),
                quantity,
            }),
        }
    }

    /// Local quantity update. Zero removes the line rather than keeping a
    /// quantity-0 husk.
    pub fn apply_update(&self, item_id: &str, quantity: u32) -> Result<(), ClientError> {
        let mut lines = self.lines.lock().unwrap();
        if quantity == 0 {
            lines.retain(|l| l.menu_item_id != item_id);
            return Ok(());
        }
        match lines.iter_mut().find(|l| l.menu_item_id == item_id) {
            Some(line) => {
                line.quantity = quantity;
                Ok(())
            }
            None => Err(ClientError::not_found("Cart line", item_id)),
        }
    }

    pub fn apply_remove(&self, item_id: &str) {
        self.lines
            .lock()
            .unwrap()
            .retain(|l| l.menu_item_id != item_id);
    }

    /// Replace the whole cart from an authoritative server snapshot.
    pub fn reconcile(&self, server_lines: Vec<CartLine>) {
        let mut lines = self.lines.lock().unwrap();
        *lines = server_lines
            .into_iter()
            .filter(|l| l.quantity >= 1)
            .collect();
    }

    /// Resolve every line against the catalog for pricing. A line whose
    /// item vanished from the catalog is an explicit not-found.
    pub fn priced_lines(&self, catalog: &CatalogState) -> Result<Vec<PricedLine>, ClientError> {
        self.lines()
            .iter()
            .map(|line| {
                let item = catalog.item_by_id(&line.menu_item_id)?;
                Ok(PricedLine {
                    unit_price: item.price,
                    discount_percentage: item.discount_percentage,
                    quantity: line.quantity,
                })
            })
            .collect()
    }

    /// Current totals; recomputed from scratch on every call.
    pub fn totals(
        &self,
        catalog: &CatalogState,
        delivery: DeliveryOption,
        coupon: Option<&str>,
    ) -> Result<Totals, ClientError> {
        let lines = self.priced_lines(catalog)?;
        pricing::compute_totals(&lines, delivery, coupon)
    }

    /// Display snapshot: lines joined with catalog data plus totals.
    pub fn to_json(&self, catalog: &CatalogState) -> Result<Value, ClientError> {
        let lines = self.lines();
        let mut rendered = Vec::with_capacity(lines.len());
        for line in &lines {
            let item = catalog.item_by_id(&line.menu_item_id)?;
            rendered.push(serde_json::json!({
                "itemId": item.id,
                "name": item.name,
                "unitPrice": pricing::round2(item.price),
                "effectiveUnitPrice": pricing::round2(item.effective_price()),
                "quantity": line.quantity,
                "lineTotal": pricing::round2(item.effective_price() * line.quantity as f64),
            }));
        }
        let totals = self.totals(catalog, DeliveryOption::Standard, None)?;
        Ok(serde_json::json!({
            "items": rendered,
            "totals": totals.to_json(),
        }))
    }
}

impl Default for CartState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Server mutations
// ---------------------------------------------------------------------------

/// Pull cart lines out of a mutation response, tolerating
/// `{ cart: { items: [...] } }` and `{ items: [...] }` shapes.
fn lines_from_response(resp: &Value) -> Option<Vec<CartLine>> {
    let items = resp
        .get("cart")
        .and_then(|c| c.get("items"))
        .or_else(|| resp.get("items"))?
        .as_array()?;

    let mut lines = Vec::with_capacity(items.len());
    for row in items {
        match serde_json::from_value::<CartLine>(row.clone()) {
            Ok(line) => lines.push(line),
            Err(e) => warn!("skipping malformed cart row from server: {e}"),
        }
    }
    Some(lines)
}

/// Apply the server's view after a mutation, falling back to the local
/// projection when the response has no cart body.
fn settle(cart: &CartState, resp: &Value, local: impl FnOnce(&CartState)) {
    match lines_from_response(resp) {
        Some(server_lines) => cart.reconcile(server_lines),
        None => local(cart),
    }
}

/// Add an item to the cart.
pub async fn add_item(
    cart: &CartState,
    catalog: &CatalogState,
    item_id: &str,
    quantity: u32,
) -> Result<Value, ClientError> {
    if quantity < 1 {
        return Err(ClientError::validation("Quantity must be at least 1"));
    }
    let item = catalog.item_by_id(item_id)?;
    if !item.is_available {
        return Err(ClientError::validation(format!(
            "{} is currently unavailable",
            item.name
        )));
    }

    let _guard = cart.begin_mutation(item_id)?;
    let resp = api::post_json(
        "/api/cart/items",
        serde_json::json!({ "itemId": item_id, "quantity": quantity }),
    )
    .await?;

    settle(cart, &resp, |c| c.apply_add(item_id, quantity));
    info!(item_id, quantity, "cart: item added");
    cart.to_json(catalog)
}

/// Set a line's quantity. Zero removes the line.
pub async fn update_item(
    cart: &CartState,
    catalog: &CatalogState,
    item_id: &str,
    quantity: u32,
) -> Result<Value, ClientError> {
    let _guard = cart.begin_mutation(item_id)?;

    let resp = if quantity == 0 {
        api::fetch_from_backend(
            &format!("/api/cart/items/{item_id}"),
            Method::DELETE,
            None,
        )
        .await?
    } else {
        api::fetch_from_backend(
            &format!("/api/cart/items/{item_id}"),
            Method::PUT,
            Some(serde_json::json!({ "quantity": quantity })),
        )
        .await?
    };

    settle(cart, &resp, |c| {
        let _ = c.apply_update(item_id, quantity);
    });
    info!(item_id, quantity, "cart: quantity updated");
    cart.to_json(catalog)
}

/// Remove a line outright.
pub async fn remove_item(
    cart: &CartState,
    catalog: &CatalogState,
    item_id: &str,
) -> Result<Value, ClientError> {
    let _guard = cart.begin_mutation(item_id)?;
    let resp = api::fetch_from_backend(
        &format!("/api/cart/items/{item_id}"),
        Method::DELETE,
        None,
    )
    .await?;

    settle(cart, &resp, |c| c.apply_remove(item_id));
    info!(item_id, "cart: item removed");
    cart.to_json(catalog)
}

// ---------------------------------------------------------------------------
// Quick buy
// ---------------------------------------------------------------------------

/// Quick-buy selection from an item card: one item, the chosen add-on
/// options, quantity, delivery and an optional coupon. Priced without
/// touching the cart.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickBuyRequest {
    #[serde(alias = "item_id", alias = "id")]
    pub item_id: String,
    #[serde(default)]
    pub add_ons: Vec<AddOn>,
    #[serde(default = "default_quick_buy_qty")]
    pub quantity: u32,
    #[serde(default)]
    pub delivery_option: String,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

fn default_quick_buy_qty() -> u32 {
    1
}

/// Price a quick buy. The item discount applies before the add-ons; the
/// cart rules (delivery table, coupon allow-list, tax) apply unchanged.
pub fn quick_buy_quote(
    catalog: &CatalogState,
    request: &QuickBuyRequest,
) -> Result<Value, ClientError> {
    if request.quantity < 1 {
        return Err(ClientError::validation("Quantity must be at least 1"));
    }
    let item = catalog.item_by_id(&request.item_id)?;
    if !item.is_available {
        return Err(ClientError::validation(format!(
            "{} is currently unavailable",
            item.name
        )));
    }

    let delivery = DeliveryOption::parse(&request.delivery_option);
    let unit_price =
        pricing::quick_buy_unit_price(item.price, item.discount_percentage, &request.add_ons);
    let totals = pricing::quick_buy_totals(
        item.price,
        item.discount_percentage,
        &request.add_ons,
        request.quantity,
        delivery,
        request.coupon_code.as_deref(),
    )?;

    Ok(serde_json::json!({
        "itemId": item.id,
        "name": item.name,
        "unitPrice": pricing::round2(unit_price),
        "quantity": request.quantity,
        "deliveryOption": delivery.as_str(),
        "totals": totals.to_json(),
    }))
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MenuItem;

    fn test_item(id: &str, price: f64, discount: Option<f64>) -> MenuItem {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": format!("Item {id}"),
            "category": "veg",
            "price": price,
            "discountPercentage": discount,
        }))
        .expect("test item")
    }

    fn test_catalog(items: Vec<MenuItem>) -> CatalogState {
        let state = CatalogState::new();
        state.replace(items, vec![]);
        state
    }

    #[test]
    fn adding_same_item_twice_merges_into_one_line() {
        let cart = CartState::new();
        cart.apply_add("itm-1", 2);
        cart.apply_add("itm-1", 3);
        cart.apply_add("itm-2", 1);

        let lines = cart.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].menu_item_id, "itm-1");
        assert_eq!(lines[0].quantity, 5);
    }

    #[test]
    fn quantity_zero_removes_the_line() {
        let cart = CartState::new();
        cart.apply_add("itm-1", 2);
        cart.apply_update("itm-1", 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn updating_an_absent_line_is_not_found() {
        let cart = CartState::new();
        let err = cart.apply_update("ghost", 3).unwrap_err();
        assert!(matches!(err, ClientError::NotFound { .. }));
    }

    #[test]
    fn in_flight_guard_rejects_concurrent_mutation_of_one_item() {
        let cart = CartState::new();
        let guard = cart.begin_mutation("itm-1").expect("first claim");

        let err = cart.begin_mutation("itm-1").unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));

        // A different item is unaffected
        let other = cart.begin_mutation("itm-2");
        assert!(other.is_ok());

        // Releasing the slot allows the next mutation
        drop(guard);
        assert!(cart.begin_mutation("itm-1").is_ok());
    }

    #[test]
    fn reconcile_replaces_cart_and_drops_zero_quantity_rows() {
        let cart = CartState::new();
        cart.apply_add("stale", 4);

        let resp = serde_json::json!({
            "cart": { "items": [
                { "itemId": "itm-1", "quantity": 2 },
                { "itemId": "itm-2", "quantity": 0 },
            ]}
        });
        cart.reconcile(lines_from_response(&resp).unwrap());

        let lines = cart.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].menu_item_id, "itm-1");
        assert_eq!(lines[0].quantity, 2);
    }

    #[test]
    fn bare_items_response_shape_is_accepted() {
        let resp = serde_json::json!({
            "items": [ { "menuItemId": "itm-9", "quantity": 1 } ]
        });
        let lines = lines_from_response(&resp).unwrap();
        assert_eq!(lines[0].menu_item_id, "itm-9");
    }

    #[test]
    fn totals_use_effective_item_prices() {
        let catalog = test_catalog(vec![
            test_item("itm-1", 200.0, Some(50.0)),
            test_item("itm-2", 100.0, None),
        ]);
        let cart = CartState::new();
        cart.apply_add("itm-1", 2); // 2 x 100 effective
        cart.apply_add("itm-2", 1); // 1 x 100

        let totals = cart
            .totals(&catalog, DeliveryOption::Standard, None)
            .unwrap();
        assert_eq!(totals.subtotal, 300.0);
        assert_eq!(totals.tax, 15.0);
        assert_eq!(totals.total, 315.0);
    }

    #[test]
    fn pricing_a_line_for_a_vanished_item_is_not_found() {
        let catalog = test_catalog(vec![]);
        let cart = CartState::new();
        cart.apply_add("ghost", 1);

        let err = cart
            .totals(&catalog, DeliveryOption::Standard, None)
            .unwrap_err();
        assert!(matches!(err, ClientError::NotFound { .. }));
    }

    #[test]
    fn quick_buy_quote_prices_add_ons_after_the_item_discount() {
        let catalog = test_catalog(vec![test_item("itm-1", 200.0, Some(10.0))]);
        let request: QuickBuyRequest = serde_json::from_value(serde_json::json!({
            "itemId": "itm-1",
            "addOns": [
                { "name": "Extra cheese", "price": 30.0 },
                { "name": "Raita", "price": 20.0 },
            ],
            "quantity": 2,
            "deliveryOption": "express",
        }))
        .unwrap();

        let quote = quick_buy_quote(&catalog, &request).unwrap();
        // 200 at 10% off = 180, + 50 add-ons = 230/unit; subtotal 460,
        // express 49, tax 23
        assert_eq!(quote["unitPrice"], 230.0);
        assert_eq!(quote["totals"]["subtotal"], 460.0);
        assert_eq!(quote["totals"]["deliveryCharge"], 49.0);
        assert_eq!(quote["totals"]["total"], 532.0);
    }

    #[test]
    fn quick_buy_defaults_and_guards() {
        let catalog = test_catalog(vec![test_item("itm-1", 100.0, None)]);

        // Bare item id: quantity 1, standard delivery, no add-ons
        let request: QuickBuyRequest =
            serde_json::from_value(serde_json::json!({ "itemId": "itm-1" })).unwrap();
        let quote = quick_buy_quote(&catalog, &request).unwrap();
        assert_eq!(quote["quantity"], 1);
        assert_eq!(quote["totals"]["total"], 105.0);

        // Unknown item is an explicit not-found
        let ghost = QuickBuyRequest {
            item_id: "ghost".into(),
            ..request.clone()
        };
        assert!(matches!(
            quick_buy_quote(&catalog, &ghost).unwrap_err(),
            ClientError::NotFound { .. }
        ));

        // A bad coupon fails loudly, same as the cart
        let bad_coupon = QuickBuyRequest {
            coupon_code: Some("FREE99".into()),
            ..request
        };
        assert!(matches!(
            quick_buy_quote(&catalog, &bad_coupon).unwrap_err(),
            ClientError::Validation(_)
        ));
    }
}
