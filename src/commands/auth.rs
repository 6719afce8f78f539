use serde_json::Value;

use crate::session::{self, SessionState};
use crate::storage;

fn field(payload: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| payload.get(*k).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

#[tauri::command]
pub async fn auth_login(
    arg0: Option<Value>,
    session: tauri::State<'_, SessionState>,
) -> Result<Value, String> {
    let payload = arg0.unwrap_or(Value::Null);
    let email = field(&payload, &["email"]);
    let password = field(&payload, &["password"]);
    session::login(&session, &email, password)
        .await
        .map_err(Into::into)
}

#[tauri::command]
pub async fn auth_register(arg0: Option<Value>) -> Result<Value, String> {
    let payload = arg0.unwrap_or(Value::Null);
    let name = field(&payload, &["name", "fullName", "full_name"]);
    let email = field(&payload, &["email"]);
    let password = field(&payload, &["password"]);
    let confirm = payload
        .get("confirmPassword")
        .or_else(|| payload.get("confirm_password"))
        .and_then(Value::as_str)
        .map(|s| s.to_string());
    session::register(&name, &email, password, confirm)
        .await
        .map_err(Into::into)
}

#[tauri::command]
pub async fn auth_get_current_session(
    session: tauri::State<'_, SessionState>,
) -> Result<Value, String> {
    session::current_session(&session).await.map_err(Into::into)
}

#[tauri::command]
pub async fn auth_logout(session: tauri::State<'_, SessionState>) -> Result<Value, String> {
    Ok(session::logout(&session).await)
}

/// Last email used to sign in, for pre-filling the login form.
#[tauri::command]
pub async fn auth_get_remembered_email() -> Result<Value, String> {
    Ok(serde_json::json!({ "email": storage::last_login_email() }))
}
