use crate::error::AppError;
use crate::models::BlockedApp;
use crate::policy::PolicySnapshot;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Apps that cannot be blocked: blocking the blocker would leave no way
/// to regain focus.
pub const PROTECTED_BUNDLE_IDS: &[&str] = &["com.focuslock.app"];

#[derive(Debug, Serialize, Deserialize)]
struct SettingsFile {
    protection_enabled: bool,
    notifications_enabled: bool,
    blocked_apps: Vec<BlockedApp>,
}

impl Default for SettingsFile {
    fn default() -> Self {
        Self {
            protection_enabled: true,
            notifications_enabled: true,
            blocked_apps: vec![BlockedApp::new("com.apple.SecurityAgent", "SecurityAgent")],
        }
    }
}

/// Persisted configuration: protection flag, notifications flag, and the
/// block list. Every mutation is written back to disk; a failed write keeps
/// the in-memory change and logs a warning.
pub struct SettingsStore {
    path: PathBuf,
    data: SettingsFile,
}

impl SettingsStore {
    /// Load settings from `path`. A missing or unreadable file yields the
    /// defaults (protection on, notifications on, SecurityAgent blocked).
    pub fn load(path: &Path) -> Self {
        let data = match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(data) => data,
                Err(e) => {
                    warn!("settings file at {} is unreadable ({}), using defaults", path.display(), e);
                    SettingsFile::default()
                }
            },
            Err(_) => SettingsFile::default(),
        };

        Self {
            path: path.to_path_buf(),
            data,
        }
    }

    fn persist(&self) {
        let contents = match serde_json::to_string_pretty(&self.data) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("could not serialize settings: {}", e);
                return;
            }
        };

        if let Err(e) = fs::write(&self.path, contents) {
            warn!("could not write settings to {}: {}", self.path.display(), e);
        }
    }

    pub fn protection_enabled(&self) -> bool {
        self.data.protection_enabled
    }

    pub fn set_protection_enabled(&mut self, enabled: bool) {
        self.data.protection_enabled = enabled;
        self.persist();
    }

    pub fn notifications_enabled(&self) -> bool {
        self.data.notifications_enabled
    }

    pub fn set_notifications_enabled(&mut self, enabled: bool) {
        self.data.notifications_enabled = enabled;
        self.persist();
    }

    pub fn blocked_apps(&self) -> &[BlockedApp] {
        &self.data.blocked_apps
    }

    pub fn is_app_blocked(&self, bundle_identifier: Option<&str>) -> bool {
        match bundle_identifier {
            Some(id) => self
                .data
                .blocked_apps
                .iter()
                .any(|a| a.bundle_identifier == id),
            None => false,
        }
    }

    pub fn can_block_app(&self, bundle_identifier: Option<&str>) -> bool {
        match bundle_identifier {
            Some(id) => !PROTECTED_BUNDLE_IDS.contains(&id),
            None => false,
        }
    }

    pub fn add_blocked_app(
        &mut self,
        bundle_identifier: &str,
        display_name: &str,
    ) -> Result<BlockedApp, AppError> {
        let bundle_identifier = bundle_identifier.trim();
        if bundle_identifier.is_empty() {
            return Err(AppError::InvalidInput {
                field: "bundle_identifier",
                reason: "must not be empty".to_string(),
            });
        }

        if self.is_app_blocked(Some(bundle_identifier)) {
            return Err(AppError::AlreadyExists {
                name: display_name.to_string(),
            });
        }

        if !self.can_block_app(Some(bundle_identifier)) {
            return Err(AppError::ProtectedApp {
                bundle_id: bundle_identifier.to_string(),
            });
        }

        let app = BlockedApp::new(bundle_identifier, display_name);
        self.data.blocked_apps.push(app.clone());
        self.persist();

        Ok(app)
    }

    pub fn remove_blocked_app(&mut self, id: Uuid) -> Result<(), AppError> {
        let before = self.data.blocked_apps.len();
        self.data.blocked_apps.retain(|a| a.id != id);

        if self.data.blocked_apps.len() == before {
            return Err(AppError::NotFound {
                entity: "blocked app",
            });
        }

        self.persist();
        Ok(())
    }

    /// Consistent view of the policy inputs for one activation event.
    pub fn policy_snapshot(&self) -> PolicySnapshot {
        PolicySnapshot {
            protection_enabled: self.data.protection_enabled,
            blocked: self
                .data
                .blocked_apps
                .iter()
                .map(|a| a.bundle_identifier.clone())
                .collect(),
        }
    }
}
