use super::{ForegroundApp, PlatformFocus, RestoreError};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    AtomEnum, ClientMessageEvent, ConnectionExt, EventMask, Window,
};

/// EWMH-based focus tracking. X11 has no bundle identifiers; the WM_CLASS
/// instance name is the stable per-application identity here.
pub struct LinuxFocus {
    conn: x11rb::rust_connection::RustConnection,
    root: Window,
}

impl LinuxFocus {
    pub fn new() -> Self {
        let (conn, screen_num) = x11rb::connect(None).expect("Failed to connect to X server");
        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;

        Self { conn, root }
    }

    fn get_atom(&self, name: &str) -> Option<u32> {
        self.conn
            .intern_atom(false, name.as_bytes())
            .ok()?
            .reply()
            .ok()
            .map(|r| r.atom)
    }

    fn get_string_property(&self, window: Window, atom: u32) -> Option<String> {
        let reply = self
            .conn
            .get_property(false, window, atom, AtomEnum::ANY, 0, 1024)
            .ok()?
            .reply()
            .ok()?;

        if reply.value.is_empty() {
            return None;
        }

        String::from_utf8(reply.value).ok()
    }

    fn get_cardinal_property(&self, window: Window, atom: u32) -> Option<u32> {
        let reply = self
            .conn
            .get_property(false, window, atom, AtomEnum::ANY, 0, 1)
            .ok()?
            .reply()
            .ok()?;

        reply.value32()?.next()
    }

    fn active_window(&self) -> Option<Window> {
        let atom = self.get_atom("_NET_ACTIVE_WINDOW")?;
        let reply = self
            .conn
            .get_property(false, self.root, atom, AtomEnum::WINDOW, 0, 1)
            .ok()?
            .reply()
            .ok()?;

        reply.value32()?.next()
    }

    fn window_pid(&self, window: Window) -> Option<u32> {
        let atom = self.get_atom("_NET_WM_PID")?;
        self.get_cardinal_property(window, atom)
    }

    /// Find a top-level window belonging to the given pid.
    fn window_for_pid(&self, pid: i32) -> Option<Window> {
        let atom = self.get_atom("_NET_CLIENT_LIST")?;
        let reply = self
            .conn
            .get_property(false, self.root, atom, AtomEnum::WINDOW, 0, 4096)
            .ok()?
            .reply()
            .ok()?;

        reply
            .value32()?
            .find(|&w| self.window_pid(w) == Some(pid as u32))
    }
}

impl PlatformFocus for LinuxFocus {
    fn frontmost_app(&self) -> Option<ForegroundApp> {
        let window = self.active_window()?;

        // A window the WM reports without a pid cannot be tracked at all.
        let pid = self.window_pid(window)? as i32;

        let wm_class = self.get_string_property(window, AtomEnum::WM_CLASS.into())?;
        let mut parts = wm_class.split('\0');
        let instance = parts.next().filter(|s| !s.is_empty())?;
        let class = parts.next().filter(|s| !s.is_empty()).unwrap_or(instance);

        Some(ForegroundApp {
            pid,
            bundle_id: Some(instance.to_string()),
            app_name: class.to_string(),
        })
    }

    fn activate(&self, pid: i32) -> Result<(), RestoreError> {
        let window = self
            .window_for_pid(pid)
            .ok_or(RestoreError::ProcessGone { pid })?;

        let atom = self
            .get_atom("_NET_ACTIVE_WINDOW")
            .ok_or_else(|| RestoreError::ActivationRefused("_NET_ACTIVE_WINDOW atom unavailable".to_string()))?;

        // Source indication 2 = direct user action, per EWMH.
        let event = ClientMessageEvent::new(32, window, atom, [2u32, 0, 0, 0, 0]);
        let _cookie = self
            .conn
            .send_event(
                false,
                self.root,
                EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY,
                event,
            )
            .map_err(|e| RestoreError::ActivationRefused(e.to_string()))?;
        self.conn
            .flush()
            .map_err(|e| RestoreError::ActivationRefused(e.to_string()))?;

        Ok(())
    }
}
