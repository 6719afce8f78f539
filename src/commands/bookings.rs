use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::booking::{self, BookingForm, BookingState};
use crate::commands::runtime::ViewState;
use crate::error::ClientError;
use crate::hotels::{self, Hotel, HotelBookingRequest, HotelQuery, HotelState};
use crate::pricing::round2;
use crate::session::SessionState;

fn local_now() -> (chrono::NaiveDate, chrono::NaiveTime) {
    let now = chrono::Local::now();
    (now.date_naive(), now.time())
}

// ---------------------------------------------------------------------------
// Table booking wizard
// ---------------------------------------------------------------------------

/// Start a fresh wizard, pre-filled from the signed-in user's profile.
#[tauri::command]
pub async fn booking_enter(
    bookings: tauri::State<'_, BookingState>,
    session: tauri::State<'_, SessionState>,
) -> Result<Value, String> {
    let (name, email, phone) = session.profile();
    Ok(bookings.enter(BookingForm::from_profile(&name, &email, &phone)))
}

/// Discard the wizard when the booking page unmounts.
#[tauri::command]
pub async fn booking_leave(bookings: tauri::State<'_, BookingState>) -> Result<(), String> {
    bookings.leave();
    Ok(())
}

/// Replace the form with the frontend's edit buffer. Navigation and
/// validation stay server-side of the IPC boundary.
#[tauri::command]
pub async fn booking_update_form(
    arg0: Option<Value>,
    bookings: tauri::State<'_, BookingState>,
) -> Result<Value, String> {
    let form: BookingForm = serde_json::from_value(arg0.unwrap_or(Value::Null))
        .map_err(|e| format!("Invalid booking form: {e}"))?;
    bookings
        .with_wizard(|w| {
            w.form = form;
            Ok(w.to_json())
        })
        .map_err(Into::into)
}

#[tauri::command]
pub async fn booking_next_step(bookings: tauri::State<'_, BookingState>) -> Result<Value, String> {
    let (today, now) = local_now();
    bookings
        .with_wizard(|w| {
            w.next(today, now)?;
            Ok(w.to_json())
        })
        .map_err(Into::into)
}

#[tauri::command]
pub async fn booking_previous_step(
    bookings: tauri::State<'_, BookingState>,
) -> Result<Value, String> {
    bookings
        .with_wizard(|w| {
            w.back();
            Ok(w.to_json())
        })
        .map_err(Into::into)
}

#[tauri::command]
pub async fn booking_get_state(bookings: tauri::State<'_, BookingState>) -> Result<Value, String> {
    bookings.with_wizard(|w| Ok(w.to_json())).map_err(Into::into)
}

/// Fee preview for a form the frontend has not committed yet.
#[tauri::command]
pub async fn booking_quote_fee(arg0: Option<Value>) -> Result<Value, String> {
    let form: BookingForm = serde_json::from_value(arg0.unwrap_or(Value::Null))
        .map_err(|e| format!("Invalid booking form: {e}"))?;
    Ok(serde_json::json!({ "bookingFee": round2(form.fee()) }))
}

#[tauri::command]
pub async fn booking_submit(bookings: tauri::State<'_, BookingState>) -> Result<Value, String> {
    booking::submit_booking(&bookings).await.map_err(Into::into)
}

#[tauri::command]
pub async fn booking_get_history() -> Result<Value, String> {
    booking::booking_history().await.map_err(Into::into)
}

// ---------------------------------------------------------------------------
// Hotel booking
// ---------------------------------------------------------------------------

/// Settle a finished hotel fetch: a response whose token was cancelled by
/// a newer load is dropped before it can reach the store.
fn settle_hotels_load(
    hotels: &HotelState,
    token: &CancellationToken,
    fetched: Result<Vec<Hotel>, ClientError>,
) -> Result<Value, String> {
    if token.is_cancelled() {
        info!("hotel load superseded, dropping response");
        return Ok(serde_json::json!({ "superseded": true }));
    }
    let rows = fetched.map_err(String::from)?;
    Ok(hotels::commit_hotels(hotels, rows))
}

/// Refresh the hotel list from the backend. Stale responses are dropped.
#[tauri::command]
pub async fn hotels_load(
    hotels: tauri::State<'_, HotelState>,
    views: tauri::State<'_, ViewState>,
) -> Result<Value, String> {
    let token = views.begin("hotels");
    let fetched = hotels::fetch_hotels().await;
    settle_hotels_load(&hotels, &token, fetched)
}

#[tauri::command]
pub async fn hotels_search(
    arg0: Option<Value>,
    hotels: tauri::State<'_, HotelState>,
) -> Result<Value, String> {
    let query = HotelQuery::from_payload(arg0.as_ref());
    let all = hotels.hotels();
    let matched = hotels::search_hotels(&all, &query);
    let matched_count = matched.len();
    Ok(serde_json::json!({
        "hotels": matched,
        "total": all.len(),
        "matched": matched_count,
    }))
}

#[tauri::command]
pub async fn hotel_book(
    arg0: Option<Value>,
    hotels: tauri::State<'_, HotelState>,
) -> Result<Value, String> {
    let request: HotelBookingRequest = serde_json::from_value(arg0.unwrap_or(Value::Null))
        .map_err(|e| format!("Invalid hotel booking: {e}"))?;
    let (today, _) = local_now();
    hotels::book_hotel(&hotels, &request, today)
        .await
        .map_err(Into::into)
}

// ===========================================================================
// Tests
// ===========================================================================
