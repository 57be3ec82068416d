use thiserror::Error;

/// A running application as reported by the OS at the moment it became
/// frontmost. Identity is the pid: a relaunched app is a different instance
/// even when the bundle identifier matches.
#[derive(Debug, Clone)]
pub struct ForegroundApp {
    pub pid: i32,
    pub bundle_id: Option<String>,
    pub app_name: String,
}

/// Focus restoration failure. Best effort only: callers do not retry.
#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("process {pid} is no longer running")]
    ProcessGone { pid: i32 },

    #[error("platform refused activation: {0}")]
    ActivationRefused(String),
}

pub trait PlatformFocus: Send + Sync {
    /// The currently frontmost application, or None when the OS reports no
    /// frontmost process or its required fields cannot be read.
    fn frontmost_app(&self) -> Option<ForegroundApp>;

    /// Ask the OS to bring the given process back to the foreground.
    fn activate(&self, pid: i32) -> Result<(), RestoreError>;
}
