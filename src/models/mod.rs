pub mod blocked_app;
pub mod focus_event;

pub use blocked_app::BlockedApp;
pub use focus_event::FocusEvent;
