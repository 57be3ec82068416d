mod commands;
pub mod error;
mod models;
pub mod monitor;
mod platform;
pub mod policy;
pub mod settings;

use crate::monitor::{FocusMonitor, MonitorConfig, MonitorService};
use crate::platform::{NativeFocus, PlatformFocus};
use crate::settings::SettingsStore;
use directories::ProjectDirs;
use log::{error, info, warn};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tauri::{
    menu::{Menu, MenuItem, PredefinedMenuItem},
    tray::{TrayIcon, TrayIconBuilder},
    webview::WebviewWindowBuilder,
    AppHandle, Emitter, Manager, RunEvent, Wry,
};

/// Holds the monitor thread handle for graceful shutdown
pub struct MonitorHandle(Mutex<Option<JoinHandle<()>>>);

/// Holds the tray icon for dynamic menu updates
pub struct TrayHandle(Mutex<Option<TrayIcon<Wry>>>);

/// Payload of the `focus-restored` event delivered to the frontend.
#[derive(Clone, Serialize)]
struct RestorationNotice {
    blocked_app: String,
    restored_app: String,
}

/// Error type for FocusLock initialization failures
#[derive(Debug)]
pub enum InitError {
    NoProjectDirs,
    ConfigDirCreation(std::io::Error),
}

impl std::fmt::Display for InitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitError::NoProjectDirs => write!(f, "Could not determine project directories"),
            InitError::ConfigDirCreation(e) => {
                write!(f, "Could not create config directory: {}", e)
            }
        }
    }
}

impl std::error::Error for InitError {}

fn get_settings_path() -> Result<std::path::PathBuf, InitError> {
    let proj_dirs =
        ProjectDirs::from("com", "focuslock", "FocusLock").ok_or(InitError::NoProjectDirs)?;
    let config_dir = proj_dirs.config_dir();
    std::fs::create_dir_all(config_dir).map_err(InitError::ConfigDirCreation)?;
    Ok(config_dir.join("settings.json"))
}

/// Build the tray menu based on the current protection flag
fn build_tray_menu(app: &AppHandle) -> Result<Menu<Wry>, Box<dyn std::error::Error>> {
    let protection_enabled = if let Some(settings) = app.try_state::<Arc<Mutex<SettingsStore>>>() {
        settings
            .lock()
            .map(|s| s.protection_enabled())
            .unwrap_or(false)
    } else {
        false
    };

    let open = MenuItem::with_id(app, "open", "Show Focus Log", true, None::<&str>)?;
    let toggle_label = if protection_enabled {
        "Disable Protection"
    } else {
        "Enable Protection"
    };
    let toggle = MenuItem::with_id(app, "toggle_protection", toggle_label, true, None::<&str>)?;
    let separator = PredefinedMenuItem::separator(app)?;
    let quit = MenuItem::with_id(app, "quit", "Quit FocusLock", true, None::<&str>)?;

    Ok(Menu::with_items(app, &[&open, &toggle, &separator, &quit])?)
}

fn refresh_tray_menu(app: &AppHandle) {
    if let Some(tray_handle) = app.try_state::<TrayHandle>() {
        if let Ok(guard) = tray_handle.0.lock() {
            if let Some(tray) = guard.as_ref() {
                match build_tray_menu(app) {
                    Ok(new_menu) => {
                        if let Err(e) = tray.set_menu(Some(new_menu)) {
                            error!("Failed to update tray menu: {}", e);
                        }
                    }
                    Err(e) => error!("Failed to build tray menu: {}", e),
                }
            }
        }
    }
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .setup(|app| {
            let settings_path = match get_settings_path() {
                Ok(path) => path,
                Err(e) => {
                    error!("FocusLock initialization failed: {}", e);
                    return Err(Box::new(e) as Box<dyn std::error::Error>);
                }
            };

            let settings = Arc::new(Mutex::new(SettingsStore::load(&settings_path)));
            let platform: Arc<dyn PlatformFocus> = Arc::new(NativeFocus::new());

            let mut monitor = FocusMonitor::new(Arc::clone(&settings), Arc::clone(&platform));

            // Restoration notices go to the frontend as a Tauri event; the
            // notifications flag is checked here, not in the monitor.
            let app_handle = app.handle().clone();
            let observer_settings = Arc::clone(&settings);
            monitor.set_restore_observer(Box::new(move |blocked, restored| {
                info!("blocked {}, restored focus to {}", blocked, restored);

                let notify = observer_settings
                    .lock()
                    .map(|s| s.notifications_enabled())
                    .unwrap_or(false);
                if notify {
                    let notice = RestorationNotice {
                        blocked_app: blocked.to_string(),
                        restored_app: restored.to_string(),
                    };
                    if let Err(e) = app_handle.emit("focus-restored", notice) {
                        warn!("could not deliver restoration notice: {}", e);
                    }
                }
            }));

            let monitor = Arc::new(Mutex::new(monitor));

            // Start the monitor service
            let service = MonitorService::new(
                Arc::clone(&monitor),
                Arc::clone(&platform),
                MonitorConfig::default(),
            );
            let handle = service.start();
            let service = Arc::new(service);
            let monitor_handle = MonitorHandle(Mutex::new(Some(handle)));

            // Store in app state
            app.manage(settings);
            app.manage(monitor);
            app.manage(service);
            app.manage(monitor_handle);

            // Create the log window at startup (hidden)
            let _log_window = WebviewWindowBuilder::new(app, "main", tauri::WebviewUrl::default())
                .title("FocusLock")
                .inner_size(420.0, 520.0)
                .resizable(true)
                .visible(false)
                .center()
                .build()?;

            // Setup tray with initial menu
            let menu = build_tray_menu(app.handle())?;

            let tray = TrayIconBuilder::new()
                .menu(&menu)
                .show_menu_on_left_click(true)
                .tooltip("FocusLock")
                .on_menu_event(|app, event| {
                    let event_id = event.id.0.as_str();

                    if event_id == "toggle_protection" {
                        if let Some(settings) = app.try_state::<Arc<Mutex<SettingsStore>>>() {
                            match settings.lock() {
                                Ok(mut guard) => {
                                    let enabled = !guard.protection_enabled();
                                    guard.set_protection_enabled(enabled);
                                    info!(
                                        "protection {}",
                                        if enabled { "enabled" } else { "disabled" }
                                    );
                                }
                                Err(e) => error!("Failed to acquire settings lock: {}", e),
                            }
                        }

                        refresh_tray_menu(app);
                    } else if event_id == "open" {
                        // Show the log window
                        if let Some(window) = app.get_webview_window("main") {
                            let _ = window.show();
                            let _ = window.set_focus();
                        }
                    } else if event_id == "quit" {
                        // Gracefully stop the monitor before exiting
                        if let Some(service) = app.try_state::<Arc<MonitorService>>() {
                            service.stop();
                        }
                        if let Some(handle_state) = app.try_state::<MonitorHandle>() {
                            if let Ok(mut guard) = handle_state.0.lock() {
                                if let Some(handle) = guard.take() {
                                    let _ = handle.join();
                                }
                            }
                        }
                        app.exit(0);
                    }
                })
                .build(app)?;

            // Store tray handle for dynamic menu updates
            app.manage(TrayHandle(Mutex::new(Some(tray))));

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::get_focus_log,
            commands::clear_focus_log,
            commands::get_settings,
            commands::set_protection_enabled,
            commands::set_notifications_enabled,
            commands::get_blocked_apps,
            commands::add_blocked_app,
            commands::remove_blocked_app,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|_app, event| {
            // Prevent the app from exiting when all windows are closed
            // This is essential for tray-only apps
            if let RunEvent::ExitRequested { api, .. } = event {
                api.prevent_exit();
            }
        });
}
