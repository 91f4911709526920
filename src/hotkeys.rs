//! Global toggle-hotkey bindings
//!
//! The coordinator installs one binding per enabled group (key name →
//! group id). A polling listener (feature `hotkeys`) watches the keyboard
//! and forwards a toggle for the bound group on each fresh press. Keeping
//! the table separate from the listener lets `stop` revoke every binding
//! without tearing the listener thread down.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Shared table of key name → group id
#[derive(Default)]
pub struct HotkeyBindings {
    map: Mutex<HashMap<String, String>>,
}

impl HotkeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a key to a group; key names are case-insensitive
    pub fn bind(&self, key: &str, group_id: &str) {
        self.map
            .lock()
            .insert(key.to_lowercase(), group_id.to_string());
    }

    pub fn unbind(&self, key: &str) {
        self.map.lock().remove(&key.to_lowercase());
    }

    /// Remove every binding
    pub fn clear(&self) {
        self.map.lock().clear();
    }

    pub fn lookup(&self, key: &str) -> Option<String> {
        self.map.lock().get(&key.to_lowercase()).cloned()
    }

    pub fn len(&self) -> usize {
        self.map.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.lock().is_empty()
    }
}

#[cfg(feature = "hotkeys")]
pub use listener::HotkeyListener;

#[cfg(feature = "hotkeys")]
mod listener {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread::{self, JoinHandle};
    use std::time::Duration;

    use device_query::{DeviceQuery, DeviceState, Keycode};

    use super::HotkeyBindings;

    const POLL_INTERVAL: Duration = Duration::from_millis(10);

    /// Polls the keyboard and fires the toggle callback on fresh presses of
    /// bound keys. Repeat events while a key stays held are suppressed.
    pub struct HotkeyListener {
        running: Arc<AtomicBool>,
        thread: Option<JoinHandle<()>>,
    }

    impl HotkeyListener {
        pub fn spawn<F>(bindings: Arc<HotkeyBindings>, on_toggle: F) -> std::io::Result<Self>
        where
            F: Fn(&str) + Send + 'static,
        {
            let running = Arc::new(AtomicBool::new(true));
            let flag = running.clone();

            let thread = thread::Builder::new()
                .name("hotkey-listener".to_string())
                .spawn(move || {
                    let device_state = DeviceState::new();
                    let mut held: Vec<Keycode> = Vec::new();

                    while flag.load(Ordering::SeqCst) {
                        let pressed = device_state.get_keys();

                        for code in &pressed {
                            if held.contains(code) {
                                continue;
                            }
                            if let Some(name) = keycode_name(code) {
                                if let Some(group_id) = bindings.lookup(name) {
                                    log::debug!("hotkey '{}' -> group {}", name, group_id);
                                    on_toggle(&group_id);
                                }
                            }
                        }

                        held = pressed;
                        thread::sleep(POLL_INTERVAL);
                    }
                })?;

            Ok(Self {
                running,
                thread: Some(thread),
            })
        }

        pub fn stop(&mut self) {
            self.running.store(false, Ordering::SeqCst);
            if let Some(thread) = self.thread.take() {
                let _ = thread.join();
            }
        }
    }

    impl Drop for HotkeyListener {
        fn drop(&mut self) {
            self.stop();
        }
    }

    /// Map a physical key code to the key names used in configuration
    fn keycode_name(code: &Keycode) -> Option<&'static str> {
        use Keycode::*;
        Some(match code {
            A => "a",
            B => "b",
            C => "c",
            D => "d",
            E => "e",
            F => "f",
            G => "g",
            H => "h",
            I => "i",
            J => "j",
            K => "k",
            L => "l",
            M => "m",
            N => "n",
            O => "o",
            P => "p",
            Q => "q",
            R => "r",
            S => "s",
            T => "t",
            U => "u",
            V => "v",
            W => "w",
            X => "x",
            Y => "y",
            Z => "z",
            Key0 => "0",
            Key1 => "1",
            Key2 => "2",
            Key3 => "3",
            Key4 => "4",
            Key5 => "5",
            Key6 => "6",
            Key7 => "7",
            Key8 => "8",
            Key9 => "9",
            F1 => "f1",
            F2 => "f2",
            F3 => "f3",
            F4 => "f4",
            F5 => "f5",
            F6 => "f6",
            F7 => "f7",
            F8 => "f8",
            F9 => "f9",
            F10 => "f10",
            F11 => "f11",
            F12 => "f12",
            Space => "space",
            Enter => "enter",
            Escape => "esc",
            Tab => "tab",
            Backspace => "backspace",
            CapsLock => "caps lock",
            Home => "home",
            End => "end",
            PageUp => "page up",
            PageDown => "page down",
            Insert => "insert",
            Delete => "delete",
            Up => "up",
            Down => "down",
            Left => "left",
            Right => "right",
            LShift | RShift => "shift",
            LControl | RControl => "ctrl",
            LAlt | RAlt => "alt",
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_lookup_case_insensitive() {
        let bindings = HotkeyBindings::new();
        bindings.bind("F1", "g1");

        assert_eq!(bindings.lookup("f1").as_deref(), Some("g1"));
        assert_eq!(bindings.lookup("F1").as_deref(), Some("g1"));
        assert!(bindings.lookup("f2").is_none());
    }

    #[test]
    fn test_rebind_replaces_target() {
        let bindings = HotkeyBindings::new();
        bindings.bind("f1", "g1");
        bindings.bind("f1", "g2");
        assert_eq!(bindings.lookup("f1").as_deref(), Some("g2"));
        assert_eq!(bindings.len(), 1);
    }

    #[test]
    fn test_clear_removes_everything() {
        let bindings = HotkeyBindings::new();
        bindings.bind("f1", "g1");
        bindings.bind("f2", "g2");
        bindings.clear();
        assert!(bindings.is_empty());
    }
}
