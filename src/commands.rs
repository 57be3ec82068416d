use crate::error::AppError;
use crate::models::{BlockedApp, FocusEvent};
use crate::monitor::FocusMonitor;
use crate::settings::SettingsStore;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tauri::State;
use uuid::Uuid;

#[derive(Serialize)]
pub struct SettingsResponse {
    pub protection_enabled: bool,
    pub notifications_enabled: bool,
    pub blocked_apps: Vec<BlockedApp>,
}

#[tauri::command]
pub fn get_focus_log(
    monitor: State<Arc<Mutex<FocusMonitor>>>,
) -> Result<Vec<FocusEvent>, String> {
    let monitor = monitor.lock().map_err(|e| {
        log::error!("Failed to acquire monitor lock: {}", e);
        String::from(AppError::LockPoisoned)
    })?;

    Ok(monitor.log().to_vec())
}

#[tauri::command]
pub fn clear_focus_log(monitor: State<Arc<Mutex<FocusMonitor>>>) -> Result<(), String> {
    let mut monitor = monitor.lock().map_err(|e| {
        log::error!("Failed to acquire monitor lock: {}", e);
        String::from(AppError::LockPoisoned)
    })?;

    monitor.clear_log();
    Ok(())
}

#[tauri::command]
pub fn get_settings(
    settings: State<Arc<Mutex<SettingsStore>>>,
) -> Result<SettingsResponse, String> {
    let settings = settings.lock().map_err(|e| {
        log::error!("Failed to acquire settings lock: {}", e);
        String::from(AppError::LockPoisoned)
    })?;

    Ok(SettingsResponse {
        protection_enabled: settings.protection_enabled(),
        notifications_enabled: settings.notifications_enabled(),
        blocked_apps: settings.blocked_apps().to_vec(),
    })
}

#[tauri::command]
pub fn set_protection_enabled(
    settings: State<Arc<Mutex<SettingsStore>>>,
    enabled: bool,
) -> Result<(), String> {
    let mut settings = settings.lock().map_err(|e| {
        log::error!("Failed to acquire settings lock: {}", e);
        String::from(AppError::LockPoisoned)
    })?;

    settings.set_protection_enabled(enabled);
    Ok(())
}

#[tauri::command]
pub fn set_notifications_enabled(
    settings: State<Arc<Mutex<SettingsStore>>>,
    enabled: bool,
) -> Result<(), String> {
    let mut settings = settings.lock().map_err(|e| {
        log::error!("Failed to acquire settings lock: {}", e);
        String::from(AppError::LockPoisoned)
    })?;

    settings.set_notifications_enabled(enabled);
    Ok(())
}

#[tauri::command]
pub fn get_blocked_apps(
    settings: State<Arc<Mutex<SettingsStore>>>,
) -> Result<Vec<BlockedApp>, String> {
    let settings = settings.lock().map_err(|e| {
        log::error!("Failed to acquire settings lock: {}", e);
        String::from(AppError::LockPoisoned)
    })?;

    Ok(settings.blocked_apps().to_vec())
}

/// Add an app to the block list. The log window passes the bundle id and
/// display name straight from a log entry.
#[tauri::command]
pub fn add_blocked_app(
    settings: State<Arc<Mutex<SettingsStore>>>,
    bundle_identifier: String,
    display_name: String,
) -> Result<BlockedApp, String> {
    let mut settings = settings.lock().map_err(|e| {
        log::error!("Failed to acquire settings lock: {}", e);
        String::from(AppError::LockPoisoned)
    })?;

    settings
        .add_blocked_app(&bundle_identifier, &display_name)
        .map_err(|e| {
            log::error!("Failed to add blocked app: {}", e);
            String::from(e)
        })
}

#[tauri::command]
pub fn remove_blocked_app(
    settings: State<Arc<Mutex<SettingsStore>>>,
    id: String,
) -> Result<(), String> {
    let id = Uuid::parse_str(&id).map_err(|e| {
        String::from(AppError::InvalidInput {
            field: "id",
            reason: e.to_string(),
        })
    })?;

    let mut settings = settings.lock().map_err(|e| {
        log::error!("Failed to acquire settings lock: {}", e);
        String::from(AppError::LockPoisoned)
    })?;

    settings.remove_blocked_app(id).map_err(|e| {
        log::error!("Failed to remove blocked app: {}", e);
        String::from(e)
    })
}
