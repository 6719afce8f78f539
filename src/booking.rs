//! Table reservations: fee calculation, form validation, and the
//! four-step booking wizard.
//!
//! The wizard is strictly linear (Details -> Time -> Table -> Confirm).
//! "Next" advances one step and only when the current step validates;
//! "Back" retreats one step without discarding anything, because the form
//! lives on the wizard, not inside a step view. Submit is reachable only
//! from Confirm; a server failure lands back on Confirm with the error
//! surfaced and every field intact. The computed fee is recomputed from
//! the current selections on every read and is the exact value submitted;
//! the server remains authoritative.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api;
use crate::error::ClientError;
use crate::pricing::round2;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Surcharge for a private dining table.
pub const PRIVATE_TABLE_FEE: f64 = 500.0;
/// Surcharge for a window-side table.
pub const WINDOW_TABLE_FEE: f64 = 200.0;
/// Surcharge for birthday or anniversary decor.
pub const CELEBRATION_FEE: f64 = 300.0;
/// Per-guest surcharge beyond the included party size.
pub const EXTRA_GUEST_FEE: f64 = 100.0;
/// Guests included before the per-guest surcharge starts.
pub const FEE_INCLUDED_GUESTS: u32 = 6;

/// Bookings are accepted up to this many days ahead.
pub const MAX_ADVANCE_DAYS: i64 = 30;

// ---------------------------------------------------------------------------
// Selections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableType {
    Standard,
    Window,
    Private,
    Outdoor,
    Family,
}

impl TableType {
    pub fn parse(s: &str) -> TableType {
        match s.trim().to_ascii_lowercase().as_str() {
            "window" => TableType::Window,
            "private" => TableType::Private,
            "outdoor" => TableType::Outdoor,
            "family" => TableType::Family,
            _ => TableType::Standard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaPreference {
    Main,
    Terrace,
    Garden,
    Private,
}

impl AreaPreference {
    pub fn parse(s: &str) -> AreaPreference {
        match s.trim().to_ascii_lowercase().as_str() {
            "terrace" => AreaPreference::Terrace,
            "garden" => AreaPreference::Garden,
            "private" => AreaPreference::Private,
            _ => AreaPreference::Main,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Occasion {
    None,
    Birthday,
    Anniversary,
    Proposal,
    Business,
    Celebration,
}

impl Occasion {
    pub fn parse(s: &str) -> Occasion {
        match s.trim().to_ascii_lowercase().as_str() {
            "birthday" => Occasion::Birthday,
            "anniversary" => Occasion::Anniversary,
            "proposal" => Occasion::Proposal,
            "business" => Occasion::Business,
            "celebration" => Occasion::Celebration,
            _ => Occasion::None,
        }
    }
}

// ---------------------------------------------------------------------------
// Fee
// ---------------------------------------------------------------------------

/// Reservation surcharge from the three selections. All parts are
/// additive and uncapped.
pub fn booking_fee(table_type: TableType, occasion: Occasion, guest_count: u32) -> f64 {
    let mut fee = 0.0;
    fee += match table_type {
        TableType::Private => PRIVATE_TABLE_FEE,
        TableType::Window => WINDOW_TABLE_FEE,
        _ => 0.0,
    };
    if matches!(occasion, Occasion::Birthday | Occasion::Anniversary) {
        fee += CELEBRATION_FEE;
    }
    fee += EXTRA_GUEST_FEE * guest_count.saturating_sub(FEE_INCLUDED_GUESTS) as f64;
    fee
}

// ---------------------------------------------------------------------------
// Form
// ---------------------------------------------------------------------------

/// Transient wizard state; created on page entry pre-filled from the
/// user profile, discarded on submit or navigation away.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default = "default_guest_count")]
    pub guest_count: u32,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub time: Option<NaiveTime>,
    #[serde(default = "default_table_type")]
    pub table_type: TableType,
    #[serde(default = "default_area")]
    pub area_preference: AreaPreference,
    #[serde(default = "default_occasion")]
    pub occasion: Occasion,
    #[serde(default)]
    pub note: String,
}

fn default_guest_count() -> u32 {
    2
}
fn default_table_type() -> TableType {
    TableType::Standard
}
fn default_area() -> AreaPreference {
    AreaPreference::Main
}
fn default_occasion() -> Occasion {
    Occasion::None
}

impl Default for BookingForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            phone: String::new(),
            guest_count: default_guest_count(),
            date: None,
            time: None,
            table_type: default_table_type(),
            area_preference: default_area(),
            occasion: default_occasion(),
            note: String::new(),
        }
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
}

fn is_valid_phone(phone: &str) -> bool {
    let digits: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '+'))
        .collect();
    (7..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

impl BookingForm {
    /// Pre-fill contact fields from the signed-in user's profile.
    pub fn from_profile(name: &str, email: &str, phone: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            phone: phone.trim().to_string(),
            ..Self::default()
        }
    }

    /// Step 1 requirements: contact details and party size.
    pub fn validate_details(&self) -> Result<(), ClientError> {
        if self.name.trim().is_empty() {
            return Err(ClientError::validation("Please enter your name"));
        }
        if !is_valid_email(self.email.trim()) {
            return Err(ClientError::validation("Please enter a valid email address"));
        }
        if !is_valid_phone(self.phone.trim()) {
            return Err(ClientError::validation("Please enter a valid phone number"));
        }
        if self.guest_count < 1 {
            return Err(ClientError::validation("At least one guest is required"));
        }
        Ok(())
    }

    /// Step 2 requirements: a date within the booking window and, for
    /// today, a time still in the future. `today`/`now` are injected so
    /// the rule is testable.
    pub fn validate_schedule(&self, today: NaiveDate, now: NaiveTime) -> Result<(), ClientError> {
        let date = self
            .date
            .ok_or_else(|| ClientError::validation("Please pick a date"))?;
        let time = self
            .time
            .ok_or_else(|| ClientError::validation("Please pick a time"))?;

        if date < today {
            return Err(ClientError::validation("The booking date has already passed"));
        }
        if date > today + chrono::Duration::days(MAX_ADVANCE_DAYS) {
            return Err(ClientError::validation(format!(
                "Bookings open up to {MAX_ADVANCE_DAYS} days in advance"
            )));
        }
        if date == today && time <= now {
            return Err(ClientError::validation(
                "Please pick a time later than now",
            ));
        }
        Ok(())
    }

    /// Fee for the current selections.
    pub fn fee(&self) -> f64 {
        booking_fee(self.table_type, self.occasion, self.guest_count)
    }
}

// ---------------------------------------------------------------------------
// Request phases
// ---------------------------------------------------------------------------

/// Explicit request state for an async action, instead of ad-hoc
/// boolean flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestPhase {
    Idle,
    Pending,
    Success,
    Error,
}

// ---------------------------------------------------------------------------
// Wizard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardStep {
    Details,
    Time,
    Table,
    Confirm,
    Submitted,
}

impl WizardStep {
    pub fn number(self) -> u8 {
        match self {
            WizardStep::Details => 1,
            WizardStep::Time => 2,
            WizardStep::Table => 3,
            WizardStep::Confirm => 4,
            WizardStep::Submitted => 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BookingWizard {
    pub form: BookingForm,
    pub step: WizardStep,
    pub phase: RequestPhase,
    pub error: Option<String>,
}

impl BookingWizard {
    pub fn new(form: BookingForm) -> Self {
        Self {
            form,
            step: WizardStep::Details,
            phase: RequestPhase::Idle,
            error: None,
        }
    }

    /// Advance exactly one step, gated on the current step's validation.
    pub fn next(&mut self, today: NaiveDate, now: NaiveTime) -> Result<(), ClientError> {
        self.step = match self.step {
            WizardStep::Details => {
                self.form.validate_details()?;
                WizardStep::Time
            }
            WizardStep::Time => {
                self.form.validate_schedule(today, now)?;
                WizardStep::Table
            }
            // Table/area/occasion all have defaults; nothing to validate.
            WizardStep::Table => WizardStep::Confirm,
            WizardStep::Confirm => {
                return Err(ClientError::validation(
                    "Review the booking and submit to continue",
                ))
            }
            WizardStep::Submitted => {
                return Err(ClientError::validation("This booking was already submitted"))
            }
        };
        self.error = None;
        Ok(())
    }

    /// Retreat exactly one step, keeping all entered data. No-op on the
    /// first step.
    pub fn back(&mut self) {
        self.step = match self.step {
            WizardStep::Details | WizardStep::Submitted => self.step,
            WizardStep::Time => WizardStep::Details,
            WizardStep::Table => WizardStep::Time,
            WizardStep::Confirm => WizardStep::Table,
        };
    }

    /// Claim the submit action. Only reachable from Confirm, and only
    /// while no submission is in flight (guards double-submit).
    pub fn begin_submit(&mut self) -> Result<(), ClientError> {
        if self.step != WizardStep::Confirm {
            return Err(ClientError::validation(
                "Complete the earlier steps before submitting",
            ));
        }
        if self.phase == RequestPhase::Pending {
            return Err(ClientError::validation("Your booking is already being submitted"));
        }
        self.phase = RequestPhase::Pending;
        self.error = None;
        Ok(())
    }

    /// Server rejected the booking: back on Confirm, data intact,
    /// error surfaced.
    pub fn submit_failed(&mut self, message: &str) {
        self.phase = RequestPhase::Error;
        self.error = Some(message.to_string());
        self.step = WizardStep::Confirm;
    }

    pub fn submit_succeeded(&mut self) {
        self.phase = RequestPhase::Success;
        self.step = WizardStep::Submitted;
        self.error = None;
    }

    /// Display shape for the frontend.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "step": self.step,
            "stepNumber": self.step.number(),
            "form": self.form,
            "bookingFee": round2(self.form.fee()),
            "phase": self.phase,
            "error": self.error,
        })
    }
}

// ---------------------------------------------------------------------------
// Managed state and submission
// ---------------------------------------------------------------------------

/// Tauri managed state: at most one wizard, alive while the booking page
/// is mounted.
pub struct BookingState {
    wizard: Mutex<Option<BookingWizard>>,
}

impl BookingState {
    pub fn new() -> Self {
        Self {
            wizard: Mutex::new(None),
        }
    }

    /// Enter the booking page: a fresh wizard replaces any stale one.
    pub fn enter(&self, form: BookingForm) -> Value {
        let wizard = BookingWizard::new(form);
        let json = wizard.to_json();
        *self.wizard.lock().unwrap() = Some(wizard);
        json
    }

    /// Leave the booking page: the wizard and its form are discarded.
    pub fn leave(&self) {
        *self.wizard.lock().unwrap() = None;
    }

    pub fn with_wizard<T>(
        &self,
        f: impl FnOnce(&mut BookingWizard) -> Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        let mut slot = self.wizard.lock().unwrap();
        let wizard = slot
            .as_mut()
            .ok_or_else(|| ClientError::validation("No booking in progress"))?;
        f(wizard)
    }
}

impl Default for BookingState {
    fn default() -> Self {
        Self::new()
    }
}

/// Submit the wizard's booking to the backend.
///
/// The fee submitted is exactly the fee displayed: both come from the
/// same pure function over the same form. The state lock is never held
/// across the network await.
pub async fn submit_booking(state: &BookingState) -> Result<Value, ClientError> {
    let form = state.with_wizard(|w| {
        w.begin_submit()?;
        Ok(w.form.clone())
    })?;

    let payload = serde_json::json!({
        "name": form.name,
        "email": form.email,
        "phone": form.phone,
        "guestCount": form.guest_count,
        "date": form.date,
        "time": form.time,
        "tableType": form.table_type,
        "areaPreference": form.area_preference,
        "occasion": form.occasion,
        "note": form.note,
        "bookingFee": round2(form.fee()),
        "idempotencyKey": Uuid::new_v4().to_string(),
    });

    match api::post_json("/api/bookings/tables", payload).await {
        Ok(resp) => {
            let booking_id = resp
                .get("bookingId")
                .or_else(|| resp.get("id"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            // The wizard may already be gone if the page unmounted while
            // the request was in flight; the booking still went through.
            let _ = state.with_wizard(|w| {
                w.submit_succeeded();
                Ok(())
            });
            info!(booking_id = %booking_id, "table booking submitted");
            Ok(serde_json::json!({ "success": true, "bookingId": booking_id }))
        }
        Err(e) => {
            let message = e.to_string();
            warn!(error = %message, "table booking failed");
            // Unauthenticated still needs the redirect; otherwise the
            // wizard stays on Confirm with the message surfaced.
            let _ = state.with_wizard(|w| {
                w.submit_failed(&message);
                Ok(())
            });
            Err(e)
        }
    }
}

/// Combined table + hotel booking history for the signed-in user.
pub async fn booking_history() -> Result<Value, ClientError> {
    api::get_json("/api/bookings/history").await
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> BookingForm {
        BookingForm {
            name: "Asha Rao".into(),
            email: "asha@example.com".into(),
            phone: "98450 12345".into(),
            guest_count: 4,
            date: Some(NaiveDate::from_ymd_opt(2026, 9, 10).unwrap()),
            time: Some(NaiveTime::from_hms_opt(19, 30, 0).unwrap()),
            ..BookingForm::default()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, 1).unwrap()
    }

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 0, 0).unwrap()
    }

    // -- fee ----------------------------------------------------------------

    #[test]
    fn private_birthday_party_of_eight_costs_1000() {
        let fee = booking_fee(TableType::Private, Occasion::Birthday, 8);
        assert_eq!(fee, 500.0 + 300.0 + 100.0 * 2.0);
    }

    #[test]
    fn fee_components_are_additive_and_default_free() {
        assert_eq!(booking_fee(TableType::Standard, Occasion::None, 4), 0.0);
        assert_eq!(booking_fee(TableType::Window, Occasion::None, 2), 200.0);
        assert_eq!(booking_fee(TableType::Standard, Occasion::Anniversary, 6), 300.0);
        assert_eq!(booking_fee(TableType::Standard, Occasion::Proposal, 7), 100.0);
        assert_eq!(booking_fee(TableType::Outdoor, Occasion::Business, 6), 0.0);
    }

    #[test]
    fn form_fee_matches_calculator() {
        let mut form = valid_form();
        form.table_type = TableType::Private;
        form.occasion = Occasion::Birthday;
        form.guest_count = 8;
        assert_eq!(form.fee(), 1000.0);
    }

    // -- validation ---------------------------------------------------------

    #[test]
    fn details_validation_checks_each_field() {
        let mut form = valid_form();
        assert!(form.validate_details().is_ok());

        form.name = "  ".into();
        assert!(form.validate_details().is_err());

        form = valid_form();
        form.email = "not-an-email".into();
        assert!(form.validate_details().is_err());

        form = valid_form();
        form.phone = "12ab34".into();
        assert!(form.validate_details().is_err());

        form = valid_form();
        form.guest_count = 0;
        assert!(form.validate_details().is_err());
    }

    #[test]
    fn schedule_rejects_past_and_far_future_dates() {
        let mut form = valid_form();
        form.date = Some(today() - chrono::Duration::days(1));
        assert!(form.validate_schedule(today(), noon()).is_err());

        form.date = Some(today() + chrono::Duration::days(MAX_ADVANCE_DAYS + 1));
        assert!(form.validate_schedule(today(), noon()).is_err());

        form.date = Some(today() + chrono::Duration::days(MAX_ADVANCE_DAYS));
        assert!(form.validate_schedule(today(), noon()).is_ok());
    }

    #[test]
    fn same_day_bookings_need_a_future_time() {
        let mut form = valid_form();
        form.date = Some(today());
        form.time = Some(NaiveTime::from_hms_opt(11, 0, 0).unwrap());
        assert!(form.validate_schedule(today(), noon()).is_err());

        form.time = Some(NaiveTime::from_hms_opt(12, 30, 0).unwrap());
        assert!(form.validate_schedule(today(), noon()).is_ok());
    }

    // -- wizard -------------------------------------------------------------

    #[test]
    fn wizard_walks_linearly_to_confirm() {
        let mut wizard = BookingWizard::new(valid_form());
        assert_eq!(wizard.step, WizardStep::Details);

        wizard.next(today(), noon()).unwrap();
        assert_eq!(wizard.step, WizardStep::Time);
        wizard.next(today(), noon()).unwrap();
        assert_eq!(wizard.step, WizardStep::Table);
        wizard.next(today(), noon()).unwrap();
        assert_eq!(wizard.step, WizardStep::Confirm);

        // Confirm has no "next": submit is the only exit
        assert!(wizard.next(today(), noon()).is_err());
        assert_eq!(wizard.step, WizardStep::Confirm);
    }

    #[test]
    fn next_is_gated_on_current_step_validation() {
        let mut form = valid_form();
        form.email = "broken".into();
        let mut wizard = BookingWizard::new(form);

        assert!(wizard.next(today(), noon()).is_err());
        assert_eq!(wizard.step, WizardStep::Details, "failed validation holds the step");

        wizard.form.email = "asha@example.com".into();
        wizard.next(today(), noon()).unwrap();
        assert_eq!(wizard.step, WizardStep::Time);
    }

    #[test]
    fn back_preserves_entered_data() {
        let mut wizard = BookingWizard::new(valid_form());
        wizard.next(today(), noon()).unwrap();
        wizard.form.occasion = Occasion::Anniversary;

        wizard.back();
        assert_eq!(wizard.step, WizardStep::Details);
        assert_eq!(wizard.form.occasion, Occasion::Anniversary);
        assert_eq!(wizard.form.name, "Asha Rao");

        // Back on the first step stays put
        wizard.back();
        assert_eq!(wizard.step, WizardStep::Details);
    }

    #[test]
    fn submit_only_from_confirm_and_not_while_pending() {
        let mut wizard = BookingWizard::new(valid_form());
        assert!(wizard.begin_submit().is_err());

        wizard.next(today(), noon()).unwrap();
        wizard.next(today(), noon()).unwrap();
        wizard.next(today(), noon()).unwrap();
        assert_eq!(wizard.step, WizardStep::Confirm);

        wizard.begin_submit().unwrap();
        assert_eq!(wizard.phase, RequestPhase::Pending);

        // Double-submit while in flight is rejected
        assert!(wizard.begin_submit().is_err());
    }

    #[test]
    fn failed_submission_returns_to_confirm_with_data_intact() {
        let mut wizard = BookingWizard::new(valid_form());
        wizard.next(today(), noon()).unwrap();
        wizard.next(today(), noon()).unwrap();
        wizard.next(today(), noon()).unwrap();
        wizard.begin_submit().unwrap();

        wizard.submit_failed("No tables left at that time");
        assert_eq!(wizard.step, WizardStep::Confirm);
        assert_eq!(wizard.phase, RequestPhase::Error);
        assert_eq!(wizard.error.as_deref(), Some("No tables left at that time"));
        assert_eq!(wizard.form.name, "Asha Rao");

        // Retry succeeds
        wizard.begin_submit().unwrap();
        wizard.submit_succeeded();
        assert_eq!(wizard.step, WizardStep::Submitted);
        assert_eq!(wizard.phase, RequestPhase::Success);
    }

    #[test]
    fn booking_state_prefills_and_discards() {
        let state = BookingState::new();
        let json = state.enter(BookingForm::from_profile(
            "Asha Rao",
            "asha@example.com",
            "9845012345",
        ));
        assert_eq!(json["form"]["name"], "Asha Rao");
        assert_eq!(json["stepNumber"], 1);

        state.leave();
        let err = state.with_wizard(|_| Ok(())).unwrap_err();
        assert!(err.to_string().contains("No booking in progress"));
    }

    #[test]
    fn enum_parsing_degrades_to_defaults() {
        assert_eq!(TableType::parse("gazebo"), TableType::Standard);
        assert_eq!(TableType::parse("PRIVATE"), TableType::Private);
        assert_eq!(AreaPreference::parse(""), AreaPreference::Main);
        assert_eq!(Occasion::parse("houswarming"), Occasion::None);
        assert_eq!(Occasion::parse("anniversary"), Occasion::Anniversary);
    }
}
