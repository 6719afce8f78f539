use serde_json::Value;

use crate::cart::CartState;
use crate::catalog::CatalogState;
use crate::orders::{self, CheckoutRequest};

#[tauri::command]
pub async fn order_place(
    arg0: Option<Value>,
    cart: tauri::State<'_, CartState>,
    catalog: tauri::State<'_, CatalogState>,
) -> Result<Value, String> {
    let request = CheckoutRequest::from_payload(&arg0.unwrap_or(Value::Null));
    orders::place_order(&cart, &catalog, &request)
        .await
        .map_err(Into::into)
}

#[tauri::command]
pub async fn order_get_history() -> Result<Value, String> {
    orders::order_history().await.map_err(Into::into)
}
