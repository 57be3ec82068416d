use super::{ForegroundApp, PlatformFocus, RestoreError};
use objc2_app_kit::{NSApplicationActivationOptions, NSRunningApplication, NSWorkspace};

pub struct MacFocus;

impl MacFocus {
    pub fn new() -> Self {
        Self
    }
}

impl PlatformFocus for MacFocus {
    fn frontmost_app(&self) -> Option<ForegroundApp> {
        let workspace = unsafe { NSWorkspace::sharedWorkspace() };
        let app = unsafe { workspace.frontmostApplication() }?;

        let pid = unsafe { app.processIdentifier() } as i32;
        let bundle_id = unsafe { app.bundleIdentifier() }.map(|s| s.to_string());
        let app_name = unsafe { app.localizedName() }
            .map(|s| s.to_string())
            .unwrap_or_else(|| "Unknown".to_string());

        Some(ForegroundApp {
            pid,
            bundle_id,
            app_name,
        })
    }

    fn activate(&self, pid: i32) -> Result<(), RestoreError> {
        let app = unsafe { NSRunningApplication::runningApplicationWithProcessIdentifier(pid) }
            .ok_or(RestoreError::ProcessGone { pid })?;

        let activated = unsafe {
            app.activateWithOptions(
                NSApplicationActivationOptions::NSApplicationActivateIgnoringOtherApps,
            )
        };

        if activated {
            Ok(())
        } else {
            Err(RestoreError::ActivationRefused(format!(
                "activation request for pid {} was declined",
                pid
            )))
        }
    }
}
