//! Hotel listings and room bookings.
//!
//! The hotel list follows the same pattern as the menu catalog: fetched
//! whole, held in a store, searched client-side with conjunctive filters
//! and a stable sort. Room bookings validate locally (date window, guest
//! count) and derive the stay total from nights x nightly rate; the
//! server recomputes and remains authoritative.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api;
use crate::browse::SortKey;
use crate::error::ClientError;
use crate::pricing::round2;

/// Rating assumed for hotels listed without one, matching the menu side.
pub const DEFAULT_HOTEL_RATING: f64 = 4.5;

/// Sentinel city that disables city filtering.
pub const ALL_CITIES: &str = "all";

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub description: String,
    pub price_per_night: f64,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct HotelData {
    hotels: Vec<Hotel>,
    loaded: bool,
}

/// Tauri managed state holding the hotel list.
pub struct HotelState {
    inner: Mutex<HotelData>,
}

impl HotelState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HotelData::default()),
        }
    }

    pub fn replace(&self, hotels: Vec<Hotel>) {
        let mut data = self.inner.lock().unwrap();
        data.hotels = hotels;
        data.loaded = true;
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.lock().unwrap().loaded
    }

    pub fn hotels(&self) -> Vec<Hotel> {
        self.inner.lock().unwrap().hotels.clone()
    }

    pub fn hotel_by_id(&self, id: &str) -> Result<Hotel, ClientError> {
        self.inner
            .lock()
            .unwrap()
            .hotels
            .iter()
            .find(|h| h.id == id)
            .cloned()
            .ok_or_else(|| ClientError::not_found("Hotel", id))
    }
}

impl Default for HotelState {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch and parse the hotel list from `GET /api/hotels`, without touching
/// the store.
pub async fn fetch_hotels() -> Result<Vec<Hotel>, ClientError> {
    let resp = api::get_json("/api/hotels").await?;
    let rows = resp
        .get("hotels")
        .or_else(|| resp.get("data"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut hotels = Vec::with_capacity(rows.len());
    for row in &rows {
        match serde_json::from_value::<Hotel>(row.clone()) {
            Ok(h) => hotels.push(h),
            Err(e) => warn!("skipping malformed hotel row: {e}"),
        }
    }
    Ok(hotels)
}

/// Swap a fetched hotel list into the store. Separate from the fetch so a
/// caller can decide, after the response arrived, whether it still should
/// be applied.
pub fn commit_hotels(state: &HotelState, hotels: Vec<Hotel>) -> Value {
    let count = hotels.len();
    state.replace(hotels);
    serde_json::json!({ "success": true, "count": count })
}

/// Fetch and commit in one step, for callers with no competing load.
pub async fn load_hotels(state: &HotelState) -> Result<Value, ClientError> {
    let hotels = fetch_hotels().await?;
    Ok(commit_hotels(state, hotels))
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Query spec for the hotel listing, same conjunctive-filter discipline
/// as the menu engine.
#[derive(Debug, Clone)]
pub struct HotelQuery {
    pub text: String,
    pub city: String,
    /// Inclusive nightly-rate band; `min > max` matches nothing.
    pub price_range: Option<(f64, f64)>,
    pub min_rating: f64,
    pub sort: SortKey,
}

impl Default for HotelQuery {
    fn default() -> Self {
        Self {
            text: String::new(),
            city: ALL_CITIES.to_string(),
            price_range: None,
            min_rating: 0.0,
            sort: SortKey::Rating,
        }
    }
}

impl HotelQuery {
    pub fn from_payload(payload: Option<&Value>) -> HotelQuery {
        let mut query = HotelQuery::default();
        let Some(v) = payload else {
            return query;
        };
        if let Some(text) = v.get("text").or_else(|| v.get("search")).and_then(Value::as_str) {
            query.text = text.trim().to_string();
        }
        if let Some(city) = v.get("city").and_then(Value::as_str) {
            if !city.trim().is_empty() {
                query.city = city.trim().to_string();
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

fn matches(hotel: &Hotel, query: &HotelQuery, needle_lower: &str) -> bool {
    if !needle_lower.is_empty() {
        let hit = hotel.name.to_lowercase().contains(needle_lower)
            || hotel.city.to_lowercase().contains(needle_lower)
            || hotel.description.to_lowercase().contains(needle_lower)
            || hotel
                .amenities
                .iter()
                .any(|a| a.to_lowercase().contains(needle_lower));
        if !hit {
            return false;
        }
    }
    if query.city != ALL_CITIES && !hotel.city.eq_ignore_ascii_case(&query.city) {
        return false;
    }
    if let Some((min, max)) = query.price_range {
        if hotel.price_per_night < min || hotel.price_per_night > max {
            return false;
        }
    }
    if hotel.rating.unwrap_or(DEFAULT_HOTEL_RATING) < query.min_rating {
        return false;
    }
    true
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn compare(a: &Hotel, b: &Hotel, sort: SortKey) -> Ordering {
    match sort {
        SortKey::PriceLow => cmp_f64(a.price_per_night, b.price_per_night),
        SortKey::PriceHigh => cmp_f64(b.price_per_night, a.price_per_night),
        SortKey::Newest => match (&b.created_at, &a.created_at) {
            (Some(b_ts), Some(a_ts)) => b_ts.cmp(a_ts),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        },
        // Hotels carry no popularity signal; both remaining keys order
        // by rating.
        SortKey::Rating | SortKey::Popular => {
            cmp_f64(b.rating.unwrap_or(0.0), a.rating.unwrap_or(0.0))
        }
    }
}

/// Narrow and order the hotel list. Pure and stable, like the menu engine.
pub fn search_hotels(hotels: &[Hotel], query: &HotelQuery) -> Vec<Hotel> {
    if let Some((min, max)) = query.price_range {
        if min > max {
            return Vec::new();
        }
    }
    let needle_lower = query.text.to_lowercase();
    let mut out: Vec<Hotel> = hotels
        .iter()
        .filter(|h| matches(h, query, &needle_lower))
        .cloned()
        .collect();
    out.sort_by(|a, b| compare(a, b, query.sort));
    out
}

// ---------------------------------------------------------------------------
// Room booking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelBookingRequest {
    #[serde(alias = "hotel_id")]
    pub hotel_id: String,
    #[serde(default = "default_room_type")]
    pub room_type: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[serde(default = "default_guests")]
    pub guests: u32,
}

fn default_room_type() -> String {
    "standard".to_string()
}
fn default_guests() -> u32 {
    2
}

impl HotelBookingRequest {
    pub fn validate(&self, today: NaiveDate) -> Result<(), ClientError> {
        if self.guests < 1 {
            return Err(ClientError::validation("At least one guest is required"));
        }
        if self.check_in < today {
            return Err(ClientError::validation("Check-in date has already passed"));
        }
        if self.check_out <= self.check_in {
            return Err(ClientError::validation(
                "Check-out must be after check-in",
            ));
        }
        Ok(())
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

/// Book a room. The displayed stay total (nights x nightly rate) is the
/// value submitted; the server recomputes it.
pub async fn book_hotel(
    state: &HotelState,
    request: &HotelBookingRequest,
    today: NaiveDate,
) -> Result<Value, ClientError> {
    request.validate(today)?;
    let hotel = state.hotel_by_id(&request.hotel_id)?;
    if !hotel.is_available {
        return Err(ClientError::validation(format!(
            "{} has no rooms available right now",
            hotel.name
        )));
    }

    let stay_total = hotel.price_per_night * request.nights() as f64;
    let payload = serde_json::json!({
        "hotelId": request.hotel_id,
        "roomType": request.room_type,
        "checkIn": request.check_in,
        "checkOut": request.check_out,
        "guests": request.guests,
        "stayTotal": round2(stay_total),
        "idempotencyKey": Uuid::new_v4().to_string(),
    });

    let resp = api::post_json("/api/bookings/hotels", payload).await?;
    let booking_id = resp
        .get("bookingId")
        .or_else(|| resp.get("id"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    info!(booking_id = %booking_id, hotel_id = %request.hotel_id, "hotel booking submitted");
    Ok(serde_json::json!({
        "success": true,
        "bookingId": booking_id,
        "stayTotal": round2(stay_total),
    }))
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn hotel(id: &str, city: &str, rate: f64, rating: Option<f64>) -> Hotel {
        Hotel {
            id: id.into(),
            name: format!("Hotel {id}"),
            city: city.into(),
            description: String::new(),
            price_per_night: rate,
            rating,
            amenities: vec![],
            is_available: true,
            created_at: None,
        }
    }

    fn ids(hotels: &[Hotel]) -> Vec<&str> {
        hotels.iter().map(|h| h.id.as_str()).collect()
    }

    #[test]
    fn search_filters_conjunctively_with_inclusive_bounds() {
        let hotels = [
            hotel("a", "Pune", 3000.0, Some(4.5)),
            hotel("b", "Pune", 8000.0, Some(4.8)),
            hotel("c", "Goa", 3000.0, Some(4.9)),
        ];
        let query = HotelQuery {
            city: "pune".into(),
            price_range: Some((1000.0, 3000.0)),
            min_rating: 4.0,
            ..HotelQuery::default()
        };
        assert_eq!(ids(&search_hotels(&hotels, &query)), vec!["a"]);
    }

    #[test]
    fn search_covers_amenities_and_is_stable() {
        let mut a = hotel("a", "Pune", 3000.0, Some(4.5));
        a.amenities = vec!["Rooftop Pool".into()];
        let b = hotel("b", "Pune", 3000.0, Some(4.5));

        let query = HotelQuery {
            text: "pool".into(),
            ..HotelQuery::default()
        };
        assert_eq!(ids(&search_hotels(&[a.clone(), b.clone()], &query)), vec!["a"]);

        // Equal ratings keep input order
        let all = HotelQuery::default();
        assert_eq!(ids(&search_hotels(&[a, b], &all)), vec!["a", "b"]);
    }

    #[test]
    fn inverted_rate_band_matches_nothing() {
        let hotels = [hotel("a", "Pune", 3000.0, None)];
        let query = HotelQuery {
            price_range: Some((5000.0, 1000.0)),
            ..HotelQuery::default()
        };
        assert!(search_hotels(&hotels, &query).is_empty());
    }

    #[test]
    fn nights_and_validation() {
        let today = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let request = HotelBookingRequest {
            hotel_id: "h1".into(),
            room_type: "deluxe".into(),
            check_in: NaiveDate::from_ymd_opt(2026, 9, 10).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2026, 9, 13).unwrap(),
            guests: 2,
        };
        assert!(request.validate(today).is_ok());
        assert_eq!(request.nights(), 3);

        let same_day = HotelBookingRequest {
            check_out: request.check_in,
            ..request.clone()
        };
        assert!(same_day.validate(today).is_err());

        let past = HotelBookingRequest {
            check_in: NaiveDate::from_ymd_opt(2026, 8, 30).unwrap(),
            ..request.clone()
        };
        assert!(past.validate(today).is_err());

        let nobody = HotelBookingRequest {
            guests: 0,
            ..request
        };
        assert!(nobody.validate(today).is_err());
    }

    #[test]
    fn unknown_hotel_is_an_explicit_not_found() {
        let state = HotelState::new();
        state.replace(vec![hotel("h1", "Pune", 3000.0, None)]);
        let err = state.hotel_by_id("ghost").unwrap_err();
        assert_eq!(err.to_string(), "Hotel not found: ghost");
    }
}
