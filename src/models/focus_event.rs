use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// One recorded focus transition. Immutable once created.
#[derive(Debug, Clone, Serialize)]
pub struct FocusEvent {
    pub id: Uuid,
    pub timestamp: i64,
    pub app_name: String,
    pub bundle_identifier: Option<String>,
    pub previous_app_name: Option<String>,
    pub was_blocked: bool,
}

impl FocusEvent {
    pub fn new(
        app_name: &str,
        bundle_identifier: Option<String>,
        previous_app_name: Option<String>,
        was_blocked: bool,
    ) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        Self {
            id: Uuid::new_v4(),
            timestamp,
            app_name: app_name.to_string(),
            bundle_identifier,
            previous_app_name,
            was_blocked,
        }
    }

    /// Wall-clock time of day (UTC) as HH:MM:SS, for the log window.
    /// Currently used in tests; kept as part of the public API for future use.
    #[allow(dead_code)]
    pub fn formatted_time(&self) -> String {
        let seconds_today = self.timestamp.rem_euclid(86400);
        let hours = seconds_today / 3600;
        let minutes = (seconds_today % 3600) / 60;
        let seconds = seconds_today % 60;
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_captures_fields() {
        let event = FocusEvent::new(
            "Safari",
            Some("com.apple.Safari".to_string()),
            Some("Finder".to_string()),
            false,
        );

        assert_eq!(event.app_name, "Safari");
        assert_eq!(event.bundle_identifier.as_deref(), Some("com.apple.Safari"));
        assert_eq!(event.previous_app_name.as_deref(), Some("Finder"));
        assert!(!event.was_blocked);
        assert!(event.timestamp > 0);
    }

    #[test]
    fn test_formatted_time_shape() {
        let mut event = FocusEvent::new("Test", None, None, false);
        event.timestamp = 86400 + 3 * 3600 + 25 * 60 + 7;

        assert_eq!(event.formatted_time(), "03:25:07");
    }
}
