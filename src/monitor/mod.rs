pub mod history;

use crate::models::FocusEvent;
use crate::platform::{ForegroundApp, PlatformFocus};
use crate::policy::{self, PolicySnapshot};
use crate::settings::SettingsStore;
use history::EventLog;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// Called after a successful block-and-restore with
/// `(blocked_app_name, restored_app_name)`. At most once per event.
pub type RestoreObserver = Box<dyn Fn(&str, &str) + Send>;

/// The focus-change state machine.
///
/// Consumes one activation event at a time, tracks the current/previous
/// foreground app, and bounces focus back when a blocked app takes over.
/// The corrective re-activation comes back from the platform as a fresh
/// activation event for the app we restored; because the blocked branch
/// leaves `current` untouched, that feedback event is recognized as a
/// duplicate and dropped, which is what keeps the restore loop from
/// feeding itself.
pub struct FocusMonitor {
    settings: Arc<Mutex<SettingsStore>>,
    platform: Arc<dyn PlatformFocus>,
    current: Option<ForegroundApp>,
    previous: Option<ForegroundApp>,
    log: EventLog,
    on_restore: Option<RestoreObserver>,
}

impl FocusMonitor {
    pub fn new(settings: Arc<Mutex<SettingsStore>>, platform: Arc<dyn PlatformFocus>) -> Self {
        Self {
            settings,
            platform,
            current: None,
            previous: None,
            log: EventLog::new(),
            on_restore: None,
        }
    }

    /// The monitor does not own its observer's lifetime; the registrant
    /// does. An absent observer is fine.
    pub fn set_restore_observer(&mut self, observer: RestoreObserver) {
        self.on_restore = Some(observer);
    }

    /// Seed `current` with the app that was already frontmost when
    /// monitoring started. Produces no log entry.
    pub fn prime(&mut self, app: ForegroundApp) {
        self.current = Some(app);
    }

    /// Process one activation event, fully, before the next is delivered.
    pub fn handle_activation(&mut self, app: ForegroundApp) {
        // Same pid as current: an intra-app window switch or the feedback
        // from our own restoration. Either way, not a switch.
        if let Some(current) = &self.current {
            if current.pid == app.pid {
                return;
            }
        }

        let snapshot = self.policy_snapshot();
        let should_block = policy::should_block(app.bundle_id.as_deref(), &snapshot);

        // Log first, so the history records every attempted switch even
        // when the restore below fails.
        let previous_app_name = self.current.as_ref().map(|a| a.app_name.clone());
        self.log.push(FocusEvent::new(
            &app.app_name,
            app.bundle_id.clone(),
            previous_app_name,
            should_block,
        ));

        if should_block {
            self.block_and_restore(&app);
        } else {
            debug!("focus changed to {} ({:?})", app.app_name, app.bundle_id);
            self.previous = self.current.take();
            self.current = Some(app);
        }
    }

    /// Blocked branch: restore focus to `current` and leave the tracked
    /// pair exactly as it was, so the platform's follow-up activation of
    /// `current` is dropped as a duplicate.
    fn block_and_restore(&mut self, blocked: &ForegroundApp) {
        let Some(target) = self.current.clone() else {
            // First-ever event is a blocked app: nothing to restore to.
            warn!("{} is blocked but no previous app to restore", blocked.app_name);
            return;
        };

        info!(
            "blocking {} ({:?}), restoring focus to {}",
            blocked.app_name, blocked.bundle_id, target.app_name
        );

        match self.platform.activate(target.pid) {
            Ok(()) => {
                if let Some(observer) = &self.on_restore {
                    observer(&blocked.app_name, &target.app_name);
                }
            }
            Err(e) => {
                // Best effort: the blocked entry is already in the log and
                // the blocked app simply stays frontmost.
                warn!("could not restore focus to {}: {}", target.app_name, e);
            }
        }
    }

    /// Fresh policy inputs for this event. If the settings store cannot be
    /// read, fail safe: treat protection as disabled rather than block on
    /// inputs we could not load.
    fn policy_snapshot(&self) -> PolicySnapshot {
        match self.settings.lock() {
            Ok(store) => store.policy_snapshot(),
            Err(_) => {
                warn!("settings lock poisoned, treating protection as disabled for this event");
                PolicySnapshot::disabled()
            }
        }
    }

    pub fn current_app(&self) -> Option<&ForegroundApp> {
        self.current.as_ref()
    }

    pub fn previous_app(&self) -> Option<&ForegroundApp> {
        self.previous.as_ref()
    }

    pub fn log(&self) -> &[FocusEvent] {
        self.log.entries()
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }
}

pub struct MonitorConfig {
    pub poll_interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 200,
        }
    }
}

/// Runs the monitor as a single-threaded event consumer: polls the
/// frontmost app and synthesizes one activation event per observed pid
/// transition, delivered in order, one fully processed before the next.
pub struct MonitorService {
    config: MonitorConfig,
    running: Arc<AtomicBool>,
    monitor: Arc<Mutex<FocusMonitor>>,
    platform: Arc<dyn PlatformFocus>,
}

fn lock_monitor<'a>(monitor: &'a Mutex<FocusMonitor>) -> MutexGuard<'a, FocusMonitor> {
    match monitor.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("monitor mutex was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

impl MonitorService {
    pub fn new(
        monitor: Arc<Mutex<FocusMonitor>>,
        platform: Arc<dyn PlatformFocus>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            monitor,
            platform,
        }
    }

    pub fn start(&self) -> thread::JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.running);
        let monitor = Arc::clone(&self.monitor);
        let platform = Arc::clone(&self.platform);
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        thread::spawn(move || {
            // Whatever is frontmost when we start is the baseline, not an
            // event.
            let initial = platform.frontmost_app();
            let mut last_pid = initial.as_ref().map(|a| a.pid);
            if let Some(app) = initial {
                lock_monitor(&monitor).prime(app);
            }

            while running.load(Ordering::SeqCst) {
                if let Some(app) = platform.frontmost_app() {
                    if last_pid != Some(app.pid) {
                        last_pid = Some(app.pid);
                        lock_monitor(&monitor).handle_activation(app);
                    }
                }

                thread::sleep(poll_interval);
            }
        })
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::RestoreError;
    use tempfile::{tempdir, TempDir};

    #[derive(Default)]
    struct FakePlatform {
        frontmost: Mutex<Option<ForegroundApp>>,
        activations: Mutex<Vec<i32>>,
        fail_activation: AtomicBool,
    }

    impl FakePlatform {
        fn set_frontmost(&self, app: Option<ForegroundApp>) {
            *self.frontmost.lock().unwrap() = app;
        }

        fn activations(&self) -> Vec<i32> {
            self.activations.lock().unwrap().clone()
        }
    }

    impl PlatformFocus for FakePlatform {
        fn frontmost_app(&self) -> Option<ForegroundApp> {
            self.frontmost.lock().unwrap().clone()
        }

        fn activate(&self, pid: i32) -> Result<(), RestoreError> {
            if self.fail_activation.load(Ordering::SeqCst) {
                return Err(RestoreError::ProcessGone { pid });
            }
            self.activations.lock().unwrap().push(pid);
            Ok(())
        }
    }

    fn app(pid: i32, bundle_id: Option<&str>, name: &str) -> ForegroundApp {
        ForegroundApp {
            pid,
            bundle_id: bundle_id.map(|s| s.to_string()),
            app_name: name.to_string(),
        }
    }

    fn finder() -> ForegroundApp {
        app(10, Some("com.apple.finder"), "Finder")
    }

    fn security_agent() -> ForegroundApp {
        app(20, Some("com.apple.SecurityAgent"), "SecurityAgent")
    }

    fn safari() -> ForegroundApp {
        app(30, Some("com.apple.Safari"), "Safari")
    }

    // Settings defaults already block com.apple.SecurityAgent with
    // protection enabled, which is exactly the scenario the monitor tests
    // need.
    fn setup() -> (
        FocusMonitor,
        Arc<FakePlatform>,
        Arc<Mutex<SettingsStore>>,
        TempDir,
    ) {
        let dir = tempdir().unwrap();
        let settings = Arc::new(Mutex::new(SettingsStore::load(
            &dir.path().join("settings.json"),
        )));
        let platform = Arc::new(FakePlatform::default());
        let monitor = FocusMonitor::new(
            Arc::clone(&settings),
            Arc::clone(&platform) as Arc<dyn PlatformFocus>,
        );
        (monitor, platform, settings, dir)
    }

    #[test]
    fn test_first_event_becomes_current() {
        let (mut monitor, _platform, _settings, _dir) = setup();

        monitor.handle_activation(finder());

        assert_eq!(monitor.current_app().unwrap().pid, 10);
        assert!(monitor.previous_app().is_none());
        assert_eq!(monitor.log().len(), 1);
        assert!(monitor.log()[0].previous_app_name.is_none());
    }

    #[test]
    fn test_focus_switch_advances_pair() {
        let (mut monitor, _platform, _settings, _dir) = setup();
        monitor.handle_activation(finder());

        monitor.handle_activation(safari());

        assert_eq!(monitor.current_app().unwrap().pid, 30);
        assert_eq!(monitor.previous_app().unwrap().pid, 10);

        let entry = &monitor.log()[0];
        assert_eq!(entry.app_name, "Safari");
        assert_eq!(entry.previous_app_name.as_deref(), Some("Finder"));
        assert!(!entry.was_blocked);
    }

    #[test]
    fn test_duplicate_pid_discarded() {
        let (mut monitor, platform, _settings, _dir) = setup();
        monitor.handle_activation(finder());

        monitor.handle_activation(finder());

        assert_eq!(monitor.log().len(), 1);
        assert_eq!(monitor.current_app().unwrap().pid, 10);
        assert!(monitor.previous_app().is_none());
        assert!(platform.activations().is_empty());
    }

    #[test]
    fn test_duplicate_pid_suppressed_even_if_name_changes() {
        // Accepted simplification: identity is pid-only, so a re-delivery
        // for the current pid is dropped even with a different name payload.
        let (mut monitor, _platform, _settings, _dir) = setup();
        monitor.handle_activation(finder());

        monitor.handle_activation(app(10, Some("com.apple.finder"), "Renamed"));

        assert_eq!(monitor.log().len(), 1);
        assert_eq!(monitor.current_app().unwrap().app_name, "Finder");
    }

    #[test]
    fn test_blocked_app_restores_current() {
        let (mut monitor, platform, _settings, _dir) = setup();
        monitor.handle_activation(finder());

        monitor.handle_activation(security_agent());

        let entry = &monitor.log()[0];
        assert_eq!(entry.app_name, "SecurityAgent");
        assert_eq!(entry.previous_app_name.as_deref(), Some("Finder"));
        assert!(entry.was_blocked);

        assert_eq!(platform.activations(), vec![10]);
        // The blocked app never becomes current.
        assert_eq!(monitor.current_app().unwrap().pid, 10);
        assert!(monitor.previous_app().is_none());
    }

    #[test]
    fn test_restore_feedback_is_discarded() {
        let (mut monitor, platform, _settings, _dir) = setup();
        monitor.handle_activation(finder());
        monitor.handle_activation(security_agent());
        let log_len = monitor.log().len();

        // The platform reports our own corrective re-activation back to us.
        monitor.handle_activation(finder());

        assert_eq!(monitor.log().len(), log_len);
        assert_eq!(platform.activations(), vec![10]);
        assert_eq!(monitor.current_app().unwrap().pid, 10);
    }

    #[test]
    fn test_blocked_first_event_logs_without_restore() {
        let (mut monitor, platform, _settings, _dir) = setup();

        monitor.handle_activation(security_agent());

        assert_eq!(monitor.log().len(), 1);
        assert!(monitor.log()[0].was_blocked);
        assert!(platform.activations().is_empty());
        assert!(monitor.current_app().is_none());
    }

    #[test]
    fn test_protection_disabled_never_blocks() {
        let (mut monitor, platform, settings, _dir) = setup();
        settings.lock().unwrap().set_protection_enabled(false);

        monitor.handle_activation(finder());
        monitor.handle_activation(security_agent());
        monitor.handle_activation(safari());

        assert!(monitor.log().iter().all(|e| !e.was_blocked));
        assert!(platform.activations().is_empty());
        // Tracking advanced on every non-duplicate event.
        assert_eq!(monitor.current_app().unwrap().pid, 30);
        assert_eq!(monitor.previous_app().unwrap().pid, 20);
    }

    #[test]
    fn test_unidentified_app_never_blocked() {
        let (mut monitor, platform, _settings, _dir) = setup();
        monitor.handle_activation(finder());

        monitor.handle_activation(app(40, None, "Mystery"));

        assert!(!monitor.log()[0].was_blocked);
        assert!(platform.activations().is_empty());
        assert_eq!(monitor.current_app().unwrap().pid, 40);
    }

    #[test]
    fn test_restore_failure_keeps_state() {
        let (mut monitor, platform, _settings, _dir) = setup();
        monitor.handle_activation(finder());
        platform.fail_activation.store(true, Ordering::SeqCst);

        monitor.handle_activation(security_agent());

        // The blocked entry was written before the restore attempt.
        assert_eq!(monitor.log().len(), 2);
        assert!(monitor.log()[0].was_blocked);
        assert!(platform.activations().is_empty());
        assert_eq!(monitor.current_app().unwrap().pid, 10);
    }

    #[test]
    fn test_observer_notified_once_per_restore() {
        let (mut monitor, _platform, _settings, _dir) = setup();
        let seen: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        monitor.set_restore_observer(Box::new(move |blocked, restored| {
            sink.lock()
                .unwrap()
                .push((blocked.to_string(), restored.to_string()));
        }));

        monitor.handle_activation(finder());
        monitor.handle_activation(security_agent());
        monitor.handle_activation(finder()); // feedback, suppressed

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![("SecurityAgent".to_string(), "Finder".to_string())]
        );
    }

    #[test]
    fn test_observer_not_notified_when_restore_fails() {
        let (mut monitor, platform, _settings, _dir) = setup();
        let seen: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        monitor.set_restore_observer(Box::new(move |blocked, restored| {
            sink.lock()
                .unwrap()
                .push((blocked.to_string(), restored.to_string()));
        }));

        monitor.handle_activation(finder());
        platform.fail_activation.store(true, Ordering::SeqCst);
        monitor.handle_activation(security_agent());

        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_policy_reads_current_config_each_event() {
        let (mut monitor, platform, settings, _dir) = setup();
        monitor.handle_activation(finder());

        // Not blocked yet.
        monitor.handle_activation(safari());
        assert!(!monitor.log()[0].was_blocked);

        settings
            .lock()
            .unwrap()
            .add_blocked_app("com.example.game", "Game")
            .unwrap();

        monitor.handle_activation(app(50, Some("com.example.game"), "Game"));
        assert!(monitor.log()[0].was_blocked);
        assert_eq!(platform.activations(), vec![30]);
    }

    #[test]
    fn test_prime_sets_current_without_logging() {
        let (mut monitor, _platform, _settings, _dir) = setup();

        monitor.prime(finder());

        assert!(monitor.log().is_empty());
        assert_eq!(monitor.current_app().unwrap().pid, 10);

        // A re-delivery of the primed app is a duplicate.
        monitor.handle_activation(finder());
        assert!(monitor.log().is_empty());
    }

    #[test]
    fn test_clear_log() {
        let (mut monitor, _platform, _settings, _dir) = setup();
        monitor.handle_activation(finder());
        assert!(!monitor.log().is_empty());

        monitor.clear_log();
        assert!(monitor.log().is_empty());
    }

    #[test]
    fn test_service_starts_and_stops() {
        let (monitor, platform, _settings, _dir) = setup();
        let monitor = Arc::new(Mutex::new(monitor));
        let service = MonitorService::new(
            Arc::clone(&monitor),
            platform as Arc<dyn PlatformFocus>,
            MonitorConfig {
                poll_interval_ms: 10,
            },
        );

        assert!(!service.is_running());

        let handle = service.start();
        assert!(service.is_running());

        thread::sleep(Duration::from_millis(50));

        service.stop();
        handle.join().unwrap();

        assert!(!service.is_running());
    }

    #[test]
    fn test_service_delivers_frontmost_transitions() {
        let (monitor, platform, _settings, _dir) = setup();
        let monitor = Arc::new(Mutex::new(monitor));
        platform.set_frontmost(Some(finder()));

        let service = MonitorService::new(
            Arc::clone(&monitor),
            Arc::clone(&platform) as Arc<dyn PlatformFocus>,
            MonitorConfig {
                poll_interval_ms: 10,
            },
        );
        let handle = service.start();
        thread::sleep(Duration::from_millis(100));

        // The initial frontmost app is the baseline, not an event.
        assert!(monitor.lock().unwrap().log().is_empty());
        assert_eq!(monitor.lock().unwrap().current_app().unwrap().pid, 10);

        platform.set_frontmost(Some(safari()));
        thread::sleep(Duration::from_millis(100));

        {
            let guard = monitor.lock().unwrap();
            assert_eq!(guard.current_app().unwrap().pid, 30);
            assert_eq!(guard.log().len(), 1);
        }

        service.stop();
        handle.join().unwrap();

        // After stop the stream is unregistered: later frontmost changes
        // must not be delivered.
        platform.set_frontmost(Some(security_agent()));
        thread::sleep(Duration::from_millis(50));

        let guard = monitor.lock().unwrap();
        assert_eq!(guard.log().len(), 1);
        assert_eq!(guard.current_app().unwrap().pid, 30);
    }
}
