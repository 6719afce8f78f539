use serde_json::Value;

use crate::cart::{self, CartState, QuickBuyRequest, QUICK_ADD_MAX_QTY};
use crate::catalog::CatalogState;
use crate::orders::CheckoutRequest;

#[tauri::command]
pub async fn cart_get(
    cart: tauri::State<'_, CartState>,
    catalog: tauri::State<'_, CatalogState>,
) -> Result<Value, String> {
    cart.to_json(&catalog).map_err(Into::into)
}

#[tauri::command]
pub async fn cart_add_item(
    arg0: Option<Value>,
    cart: tauri::State<'_, CartState>,
    catalog: tauri::State<'_, CatalogState>,
) -> Result<Value, String> {
    let item_id = super::payload_arg0_as_string(arg0.clone(), &["itemId", "item_id", "id"])
        .ok_or("Missing menu item ID")?;
    // Card-level quick add caps the quantity; the cart page allows more
    // through cart_update_quantity.
    let quantity = super::payload_arg0_as_u32(&arg0, &["quantity", "qty"])
        .unwrap_or(1)
        .min(QUICK_ADD_MAX_QTY);
    cart::add_item(&cart, &catalog, &item_id, quantity)
        .await
        .map_err(Into::into)
}

#[tauri::command]
pub async fn cart_update_quantity(
    arg0: Option<Value>,
    cart: tauri::State<'_, CartState>,
    catalog: tauri::State<'_, CatalogState>,
) -> Result<Value, String> {
    let item_id = super::payload_arg0_as_string(arg0.clone(), &["itemId", "item_id", "id"])
        .ok_or("Missing menu item ID")?;
    let quantity =
        super::payload_arg0_as_u32(&arg0, &["quantity", "qty"]).ok_or("Missing quantity")?;
    cart::update_item(&cart, &catalog, &item_id, quantity)
        .await
        .map_err(Into::into)
}

#[tauri::command]
pub async fn cart_remove_item(
    arg0: Option<Value>,
    cart: tauri::State<'_, CartState>,
    catalog: tauri::State<'_, CatalogState>,
) -> Result<Value, String> {
    let item_id = super::payload_arg0_as_string(arg0, &["itemId", "item_id", "id"])
        .ok_or("Missing menu item ID")?;
    cart::remove_item(&cart, &catalog, &item_id)
        .await
        .map_err(Into::into)
}

/// Totals preview for a quick buy from an item card, priced without
/// touching the cart.
#[tauri::command]
pub async fn cart_quick_buy_quote(
    arg0: Option<Value>,
    catalog: tauri::State<'_, CatalogState>,
) -> Result<Value, String> {
    let request: QuickBuyRequest = serde_json::from_value(arg0.unwrap_or(Value::Null))
        .map_err(|e| format!("Invalid quick buy request: {e}"))?;
    cart::quick_buy_quote(&catalog, &request).map_err(Into::into)
}

/// Totals preview for the cart and checkout screens.
#[tauri::command]
pub async fn cart_get_totals(
    arg0: Option<Value>,
    cart: tauri::State<'_, CartState>,
    catalog: tauri::State<'_, CatalogState>,
) -> Result<Value, String> {
    let request = CheckoutRequest::from_payload(&arg0.unwrap_or(Value::Null));
    crate::orders::quote(&cart, &catalog, &request).map_err(Into::into)
}
