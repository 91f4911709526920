//! Real key injection through enigo

use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use parking_lot::Mutex;

use super::backend::KeyboardBackend;

/// [`KeyboardBackend`] backed by OS-level event injection.
///
/// One instance is shared by every worker; enigo needs exclusive access per
/// call, so injections from concurrent workers serialize on the mutex.
pub struct EnigoKeyboard {
    enigo: Mutex<Enigo>,
}

// Safety: access to the inner Enigo is serialized through the mutex
unsafe impl Send for EnigoKeyboard {}
unsafe impl Sync for EnigoKeyboard {}

impl EnigoKeyboard {
    pub fn new() -> anyhow::Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| anyhow::anyhow!("failed to initialize input backend: {e:?}"))?;
        Ok(Self {
            enigo: Mutex::new(enigo),
        })
    }

    fn apply(&self, key: &str, direction: Direction) -> anyhow::Result<()> {
        let key = parse_key(key)?;
        self.enigo
            .lock()
            .key(key, direction)
            .map_err(|e| anyhow::anyhow!("key injection failed: {e:?}"))
    }
}

impl KeyboardBackend for EnigoKeyboard {
    fn key_down(&self, key: &str) -> anyhow::Result<()> {
        self.apply(key, Direction::Press)
    }

    fn key_up(&self, key: &str) -> anyhow::Result<()> {
        self.apply(key, Direction::Release)
    }
}

/// Map a configured key name to an enigo key
fn parse_key(name: &str) -> anyhow::Result<Key> {
    let lower = name.trim().to_lowercase();
    let key = match lower.as_str() {
        "shift" => Key::Shift,
        "ctrl" | "control" => Key::Control,
        "alt" => Key::Alt,
        "meta" | "win" | "windows" | "cmd" | "command" => Key::Meta,
        "space" => Key::Space,
        "enter" | "return" => Key::Return,
        "tab" => Key::Tab,
        "esc" | "escape" => Key::Escape,
        "backspace" => Key::Backspace,
        "delete" | "del" => Key::Delete,
        "home" => Key::Home,
        "end" => Key::End,
        "page up" | "pageup" => Key::PageUp,
        "page down" | "pagedown" => Key::PageDown,
        "caps lock" | "capslock" => Key::CapsLock,
        "up" => Key::UpArrow,
        "down" => Key::DownArrow,
        "left" => Key::LeftArrow,
        "right" => Key::RightArrow,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        single => {
            let mut chars = single.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Unicode(c),
                _ => anyhow::bail!("unknown key name: '{name}'"),
            }
        }
    };
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_keys() {
        assert!(matches!(parse_key("Shift").unwrap(), Key::Shift));
        assert!(matches!(parse_key("CONTROL").unwrap(), Key::Control));
        assert!(matches!(parse_key("f11").unwrap(), Key::F11));
        assert!(matches!(parse_key(" space ").unwrap(), Key::Space));
    }

    #[test]
    fn test_parse_single_char() {
        assert!(matches!(parse_key("a").unwrap(), Key::Unicode('a')));
        assert!(matches!(parse_key("\"").unwrap(), Key::Unicode('"')));
    }

    #[test]
    fn test_parse_rejects_unknown_names() {
        assert!(parse_key("flux capacitor").is_err());
        assert!(parse_key("").is_err());
    }
}
