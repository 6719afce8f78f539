//! Cart and quick-buy pricing.
//!
//! Pure money math: per-item discounts, the delivery charge table, the
//! coupon allow-list, and the 5% tax. Computation keeps full precision;
//! rounding to two decimals happens only when totals are serialized for
//! display, so nothing compounds across steps. The server recomputes all
//! of this on checkout; the client values are advisory display.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;

/// Tax applied to the pre-discount, pre-delivery subtotal.
pub const TAX_RATE: f64 = 0.05;

/// Flat surcharge for express delivery, in currency units.
pub const EXPRESS_DELIVERY_CHARGE: f64 = 49.0;

/// Promotional codes and their subtotal discount percentages.
pub const COUPONS: &[(&str, f64)] = &[
    ("NAIVEDYAM15", 15.0),
    ("WELCOME20", 20.0),
    ("HOTEL10", 10.0),
];

// ---------------------------------------------------------------------------
// Building blocks
// ---------------------------------------------------------------------------

/// Price after an item's own discount percentage, before cart coupons.
pub fn effective_unit_price(price: f64, discount_percentage: Option<f64>) -> f64 {
    match discount_percentage {
        Some(pct) => price * (1.0 - pct / 100.0),
        None => price,
    }
}

/// Round to 2 decimals. Display/serialization only.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOption {
    Standard,
    Express,
    Scheduled,
}

impl DeliveryOption {
    /// Unknown strings degrade to `Standard` (free), the default option.
    pub fn parse(s: &str) -> DeliveryOption {
        match s.trim().to_ascii_lowercase().as_str() {
            "express" => DeliveryOption::Express,
            "scheduled" => DeliveryOption::Scheduled,
            _ => DeliveryOption::Standard,
        }
    }

    pub fn charge(self) -> f64 {
        match self {
            DeliveryOption::Express => EXPRESS_DELIVERY_CHARGE,
            DeliveryOption::Standard | DeliveryOption::Scheduled => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryOption::Standard => "standard",
            DeliveryOption::Express => "express",
            DeliveryOption::Scheduled => "scheduled",
        }
    }
}

/// Discount percentage for a coupon code, case-insensitive.
pub fn coupon_percent(code: &str) -> Option<f64> {
    let code = code.trim();
    COUPONS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(code))
        .map(|(_, pct)| *pct)
}

/// One cart line reduced to what pricing needs.
#[derive(Debug, Clone, Copy)]
pub struct PricedLine {
    pub unit_price: f64,
    pub discount_percentage: Option<f64>,
    pub quantity: u32,
}

impl PricedLine {
    pub fn line_total(&self) -> f64 {
        effective_unit_price(self.unit_price, self.discount_percentage) * self.quantity as f64
    }
}

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

/// Derived money totals. Never persisted; recomputed on every change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub subtotal: f64,
    pub delivery_charge: f64,
    pub discount: f64,
    pub tax: f64,
    pub total: f64,
}

impl Totals {
    pub const ZERO: Totals = Totals {
        subtotal: 0.0,
        delivery_charge: 0.0,
        discount: 0.0,
        tax: 0.0,
        total: 0.0,
    };

    /// Display shape for the frontend, rounded to 2 decimals here and
    /// nowhere earlier.
    pub fn to_json(self) -> Value {
        serde_json::json!({
            "subtotal": round2(self.subtotal),
            "deliveryCharge": round2(self.delivery_charge),
            "discount": round2(self.discount),
            "tax": round2(self.tax),
            "total": round2(self.total),
        })
    }
}

/// Compute cart totals.
///
/// Fixed computation order: subtotal over effective line prices, then the
/// delivery charge, then the coupon discount on the subtotal only, then
/// tax on the pre-discount pre-delivery subtotal, then
/// `total = subtotal + delivery - discount + tax`.
///
/// An empty cart prices to all zeros regardless of the other inputs
/// (checkout separately refuses to submit one). On a non-empty cart an
/// unrecognized coupon is a validation failure, not a silent zero
/// discount.
pub fn compute_totals(
    lines: &[PricedLine],
    delivery: DeliveryOption,
    coupon: Option<&str>,
) -> Result<Totals, ClientError> {
    if lines.is_empty() {
        return Ok(Totals::ZERO);
    }

    let coupon_pct = match coupon.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => Some(
            coupon_percent(code)
                .ok_or_else(|| ClientError::validation(format!("Invalid coupon code: {code}")))?,
        ),
        None => None,
    };

    let subtotal: f64 = lines.iter().map(PricedLine::line_total).sum();
    let delivery_charge = delivery.charge();
    let discount = coupon_pct.map_or(0.0, |pct| subtotal * pct / 100.0);
    let tax = subtotal * TAX_RATE;
    let total = subtotal + delivery_charge - discount + tax;

    Ok(Totals {
        subtotal,
        delivery_charge,
        discount,
        tax,
        total,
    })
}

// ---------------------------------------------------------------------------
// Quick buy
// ---------------------------------------------------------------------------

/// A selected add-on option in the quick-buy flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddOn {
    pub name: String,
    pub price: f64,
}

/// Unit price for a quick-buy selection: effective item price plus the
/// selected add-ons. The item discount does not apply to add-ons.
pub fn quick_buy_unit_price(price: f64, discount_percentage: Option<f64>, add_ons: &[AddOn]) -> f64 {
    let add_on_sum: f64 = add_ons.iter().map(|a| a.price).sum();
    effective_unit_price(price, discount_percentage) + add_on_sum
}

/// Totals for a single-item quick buy, same rules as a one-line cart.
pub fn quick_buy_totals(
    price: f64,
    discount_percentage: Option<f64>,
    add_ons: &[AddOn],
    quantity: u32,
    delivery: DeliveryOption,
    coupon: Option<&str>,
) -> Result<Totals, ClientError> {
    let line = PricedLine {
        unit_price: quick_buy_unit_price(price, discount_percentage, add_ons),
        discount_percentage: None,
        quantity,
    };
    compute_totals(&[line], delivery, coupon)
}

// ===========================================================================
// Tests
// ===========================================================================
