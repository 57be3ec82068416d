pub mod types;

pub use types::{ForegroundApp, PlatformFocus, RestoreError};

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "macos")]
pub use macos::MacFocus as NativeFocus;

#[cfg(target_os = "linux")]
pub use linux::LinuxFocus as NativeFocus;

// Stub for development on other platforms
#[cfg(not(any(target_os = "macos", target_os = "linux")))]
pub struct NativeFocus;

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
impl PlatformFocus for NativeFocus {
    fn frontmost_app(&self) -> Option<ForegroundApp> {
        None
    }

    fn activate(&self, pid: i32) -> Result<(), RestoreError> {
        Err(RestoreError::ProcessGone { pid })
    }
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
impl NativeFocus {
    pub fn new() -> Self {
        Self
    }
}
