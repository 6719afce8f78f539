//! Checkout and order history.
//!
//! Checkout validates everything locally before any network call: an
//! empty cart, a missing address, or an unknown coupon never reaches the
//! server. The submitted payload carries the lines and the client-side
//! totals; the backend recomputes and is authoritative. Submission uses
//! a fresh idempotency key per attempt series so a retried request cannot
//! double-place an order.

use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api;
use crate::cart::CartState;
use crate::catalog::CatalogState;
use crate::error::ClientError;
use crate::pricing::{self, DeliveryOption};

// ---------------------------------------------------------------------------
// Checkout request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub address: String,
    pub payment_method: String,
    pub delivery_option: DeliveryOption,
    pub special_instructions: String,
    pub coupon_code: Option<String>,
}

impl CheckoutRequest {
    /// Parse the frontend payload, tolerating camelCase and snake_case.
    pub fn from_payload(payload: &Value) -> CheckoutRequest {
        let str_field = |keys: &[&str]| -> String {
            keys.iter()
                .find_map(|k| payload.get(*k).and_then(Value::as_str))
                .unwrap_or_default()
                .trim()
                .to_string()
        };
        let coupon = str_field(&["couponCode", "coupon_code", "coupon"]);
        CheckoutRequest {
            address: str_field(&["address", "deliveryAddress", "delivery_address"]),
            payment_method: str_field(&["paymentMethod", "payment_method"]),
            delivery_option: DeliveryOption::parse(&str_field(&[
                "deliveryOption",
                "delivery_option",
            ])),
            special_instructions: str_field(&["specialInstructions", "special_instructions"]),
            coupon_code: if coupon.is_empty() { None } else { Some(coupon) },
        }
    }
}

// ---------------------------------------------------------------------------
// Quote and placement
// ---------------------------------------------------------------------------

/// Totals preview for the checkout screen. Recomputed on every call.
pub fn quote(
    cart: &CartState,
    catalog: &CatalogState,
    request: &CheckoutRequest,
) -> Result<Value, ClientError> {
    let totals = cart.totals(
        catalog,
        request.delivery_option,
        request.coupon_code.as_deref(),
    )?;
    Ok(totals.to_json())
}

/// Validate a checkout and build the order payload. Pure apart from the
/// idempotency key; everything that can fail locally fails here, before
/// any network call.
pub fn prepare_order(
    cart: &CartState,
    catalog: &CatalogState,
    request: &CheckoutRequest,
) -> Result<Value, ClientError> {
    if cart.is_empty() {
        return Err(ClientError::validation(
            "Your cart is empty. Add something before checking out.",
        ));
    }
    if request.address.is_empty() {
        return Err(ClientError::validation("Please enter a delivery address"));
    }
    if request.payment_method.is_empty() {
        return Err(ClientError::validation("Please choose a payment method"));
    }

    // Rejects unknown coupons and vanished items before the server sees
    // anything.
    let totals = cart.totals(
        catalog,
        request.delivery_option,
        request.coupon_code.as_deref(),
    )?;

    let mut items = Vec::new();
    for line in cart.lines() {
        let item = catalog.item_by_id(&line.menu_item_id)?;
        items.push(serde_json::json!({
            "itemId": item.id,
            "name": item.name,
            "quantity": line.quantity,
            "unitPrice": pricing::round2(item.effective_price()),
        }));
    }

    Ok(serde_json::json!({
        "items": items,
        "address": request.address,
        "paymentMethod": request.payment_method,
        "deliveryOption": request.delivery_option.as_str(),
        "specialInstructions": request.special_instructions,
        "couponCode": request.coupon_code,
        "totals": totals.to_json(),
        "idempotencyKey": Uuid::new_v4().to_string(),
    }))
}

/// Place the order and clear the cart on success.
pub async fn place_order(
    cart: &CartState,
    catalog: &CatalogState,
    request: &CheckoutRequest,
) -> Result<Value, ClientError> {
    let payload = prepare_order(cart, catalog, request)?;

    match api::post_json("/api/orders", payload).await {
        Ok(resp) => {
            let order_id = resp
                .get("orderId")
                .or_else(|| resp.get("id"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            cart.clear();
            info!(order_id = %order_id, "order placed");
            Ok(serde_json::json!({ "success": true, "orderId": order_id }))
        }
        Err(e) => {
            warn!(error = %e, "order placement failed");
            Err(e)
        }
    }
}

/// Past orders for the signed-in user.
pub async fn order_history() -> Result<Value, ClientError> {
    api::get_json("/api/orders").await
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MenuItem;

    fn test_catalog() -> CatalogState {
        let item: MenuItem = serde_json::from_value(serde_json::json!({
            "id": "itm-1",
            "name": "Masala Dosa",
            "category": "veg",
            "price": 120.0,
        }))
        .unwrap();
        let state = CatalogState::new();
        state.replace(vec![item], vec![]);
        state
    }

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            address: "12 MG Road, Pune".into(),
            payment_method: "card".into(),
            delivery_option: DeliveryOption::Standard,
            special_instructions: String::new(),
            coupon_code: None,
        }
    }

    #[test]
    fn empty_cart_is_rejected_before_any_network_call() {
        let cart = CartState::new();
        let err = prepare_order(&cart, &test_catalog(), &request()).unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn missing_address_and_payment_method_are_rejected() {
        let catalog = test_catalog();
        let cart = CartState::new();
        cart.apply_add("itm-1", 1);

        let mut bad = request();
        bad.address = String::new();
        assert!(prepare_order(&cart, &catalog, &bad).is_err());

        let mut bad = request();
        bad.payment_method = String::new();
        assert!(prepare_order(&cart, &catalog, &bad).is_err());
    }

    #[test]
    fn unknown_coupon_fails_checkout_locally() {
        let catalog = test_catalog();
        let cart = CartState::new();
        cart.apply_add("itm-1", 1);

        let mut bad = request();
        bad.coupon_code = Some("NOTACODE".into());
        let err = prepare_order(&cart, &catalog, &bad).unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn prepared_payload_carries_lines_and_totals() {
        let catalog = test_catalog();
        let cart = CartState::new();
        cart.apply_add("itm-1", 2);

        let mut req = request();
        req.delivery_option = DeliveryOption::Express;
        let payload = prepare_order(&cart, &catalog, &req).unwrap();

        assert_eq!(payload["items"][0]["itemId"], "itm-1");
        assert_eq!(payload["items"][0]["quantity"], 2);
        // 240 subtotal + 49 express + 12 tax
        assert_eq!(payload["totals"]["subtotal"], 240.0);
        assert_eq!(payload["totals"]["deliveryCharge"], 49.0);
        assert_eq!(payload["totals"]["tax"], 12.0);
        assert_eq!(payload["totals"]["total"], 301.0);
        assert!(payload["idempotencyKey"].as_str().unwrap().len() >= 32);
    }

    #[test]
    fn checkout_request_parses_both_key_styles() {
        let req = CheckoutRequest::from_payload(&serde_json::json!({
            "delivery_address": "12 MG Road",
            "paymentMethod": "upi",
            "deliveryOption": "express",
            "coupon": "WELCOME20",
        }));
        assert_eq!(req.address, "12 MG Road");
        assert_eq!(req.payment_method, "upi");
        assert_eq!(req.delivery_option, DeliveryOption::Express);
        assert_eq!(req.coupon_code.as_deref(), Some("WELCOME20"));
    }
}
