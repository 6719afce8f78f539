//! Naivedyam desktop client - Tauri v2 backend.
//!
//! This module registers the IPC command handlers that the frontend
//! calls via `@tauri-apps/api/core::invoke()`. Command names use
//! snake_case derived from the frontend action names (e.g.
//! `catalog:query` -> `catalog_query`).

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// App start time for uptime calculation (epoch seconds).
pub(crate) static APP_START_EPOCH: AtomicU64 = AtomicU64::new(0);

mod api;
mod booking;
mod browse;
mod cart;
mod catalog;
mod commands;
mod error;
mod hotels;
mod logs;
mod orders;
mod pricing;
mod session;
mod storage;

pub fn run() {
    let epoch = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    APP_START_EPOCH.store(epoch, Ordering::Relaxed);

    // Structured logging: console plus a daily rolling file.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,naivedyam_client_lib=debug"));

    logs::prune_old_logs();

    let log_dir = logs::get_log_dir();
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&log_dir, "naivedyam");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = fmt::layer().with_target(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    // The guard flushes file logs on drop; the app runs until process
    // exit, so leak it.
    std::mem::forget(_guard);

    info!("Starting Naivedyam client v{}", env!("CARGO_PKG_VERSION"));

    tauri::Builder::default()
        .setup(|app| {
            use tauri::Manager;

            app.manage(catalog::CatalogState::new());
            app.manage(hotels::HotelState::new());
            app.manage(cart::CartState::new());
            app.manage(booking::BookingState::new());
            app.manage(session::SessionState::new());
            app.manage(commands::runtime::ViewState::default());

            // Warm the catalog and hotel caches once a backend is
            // configured. Failures are non-fatal; the frontend retries
            // through the load commands.
            if storage::is_configured() {
                let handle = app.handle().clone();
                tauri::async_runtime::spawn(async move {
                    let catalog_state = handle.state::<catalog::CatalogState>();
                    if let Err(e) = catalog::load_catalog(&catalog_state).await {
                        info!(error = %e, "startup catalog warm-up skipped");
                    }
                    let hotel_state = handle.state::<hotels::HotelState>();
                    if let Err(e) = hotels::load_hotels(&hotel_state).await {
                        info!(error = %e, "startup hotel warm-up skipped");
                    }
                });
            }

            info!("State stores registered");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // App lifecycle
            commands::runtime::app_get_version,
            commands::runtime::system_get_info,
            // Backend connection
            commands::runtime::settings_is_configured,
            commands::runtime::settings_get_backend_url,
            commands::runtime::settings_set_backend_url,
            commands::runtime::settings_test_connection,
            commands::runtime::settings_clear_connection,
            // Auth
            commands::auth::auth_login,
            commands::auth::auth_register,
            commands::auth::auth_get_current_session,
            commands::auth::auth_logout,
            commands::auth::auth_get_remembered_email,
            // Catalog
            commands::catalog::catalog_load,
            commands::catalog::catalog_query,
            commands::catalog::catalog_get_item,
            commands::catalog::catalog_get_categories,
            // Cart
            commands::cart::cart_get,
            commands::cart::cart_add_item,
            commands::cart::cart_update_quantity,
            commands::cart::cart_remove_item,
            commands::cart::cart_quick_buy_quote,
            commands::cart::cart_get_totals,
            // Orders
            commands::orders::order_place,
            commands::orders::order_get_history,
            // Table booking wizard
            commands::bookings::booking_enter,
            commands::bookings::booking_leave,
            commands::bookings::booking_update_form,
            commands::bookings::booking_next_step,
            commands::bookings::booking_previous_step,
            commands::bookings::booking_get_state,
            commands::bookings::booking_quote_fee,
            commands::bookings::booking_submit,
            commands::bookings::booking_get_history,
            // Hotels
            commands::bookings::hotels_load,
            commands::bookings::hotels_search,
            commands::bookings::hotel_book,
        ])
        .run(tauri::generate_context!())
        .expect("error while running Naivedyam client");
}
