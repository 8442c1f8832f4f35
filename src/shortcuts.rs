//! Shortcut strings such as `"cmd+shift+p"` or `"space"`, turned into the
//! `global_hotkey` values the OS registry takes.
//!
//! Tokens split on `+` or whitespace and match case-insensitively. One token
//! names the key and every other token must be a modifier.

use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShortcutParseError {
    #[error("shortcut string is empty")]
    Empty,
    #[error("shortcut has no key, only modifiers")]
    MissingKey,
    #[error("shortcut names a second key '{0}'")]
    ExtraKey(String),
    #[error("unknown key '{0}'")]
    UnknownKey(String),
}

fn modifier(token: &str) -> Option<Modifiers> {
    match token {
        "cmd" | "command" | "meta" | "super" | "⌘" => Some(Modifiers::META),
        "ctrl" | "control" | "⌃" => Some(Modifiers::CONTROL),
        "alt" | "opt" | "option" | "⌥" => Some(Modifiers::ALT),
        "shift" | "⇧" => Some(Modifiers::SHIFT),
        _ => None,
    }
}

/// Split a shortcut into modifier flags and a key code.
pub fn parse_shortcut(shortcut: &str) -> Result<(Modifiers, Code), ShortcutParseError> {
    let mut mods = Modifiers::empty();
    let mut key: Option<String> = None;
    let mut seen_token = false;

    let tokens = shortcut
        .split(|c: char| c == '+' || c.is_whitespace())
        .filter(|token| !token.is_empty());
    for token in tokens {
        seen_token = true;
        let token = token.to_lowercase();
        if let Some(flag) = modifier(&token) {
            mods |= flag;
        } else if key.is_some() {
            return Err(ShortcutParseError::ExtraKey(token));
        } else {
            key = Some(token);
        }
    }

    if !seen_token {
        return Err(ShortcutParseError::Empty);
    }
    let key = key.ok_or(ShortcutParseError::MissingKey)?;
    let code = key_code(&key).ok_or(ShortcutParseError::UnknownKey(key))?;
    Ok((mods, code))
}

/// Build a registrable `HotKey`. Bare keys (e.g. Space) carry no modifiers.
pub fn to_hotkey(shortcut: &str) -> Result<HotKey, ShortcutParseError> {
    let (mods, code) = parse_shortcut(shortcut)?;
    let mods = if mods.is_empty() { None } else { Some(mods) };
    Ok(HotKey::new(mods, code))
}

/// Key code for a lower-case key name or one of its aliases.
pub fn key_code(key: &str) -> Option<Code> {
    let code = match key {
        "a" => Code::KeyA,
        "b" => Code::KeyB,
        "c" => Code::KeyC,
        "d" => Code::KeyD,
        "e" => Code::KeyE,
        "f" => Code::KeyF,
        "g" => Code::KeyG,
        "h" => Code::KeyH,
        "i" => Code::KeyI,
        "j" => Code::KeyJ,
        "k" => Code::KeyK,
        "l" => Code::KeyL,
        "m" => Code::KeyM,
        "n" => Code::KeyN,
        "o" => Code::KeyO,
        "p" => Code::KeyP,
        "q" => Code::KeyQ,
        "r" => Code::KeyR,
        "s" => Code::KeyS,
        "t" => Code::KeyT,
        "u" => Code::KeyU,
        "v" => Code::KeyV,
        "w" => Code::KeyW,
        "x" => Code::KeyX,
        "y" => Code::KeyY,
        "z" => Code::KeyZ,
        "0" => Code::Digit0,
        "1" => Code::Digit1,
        "2" => Code::Digit2,
        "3" => Code::Digit3,
        "4" => Code::Digit4,
        "5" => Code::Digit5,
        "6" => Code::Digit6,
        "7" => Code::Digit7,
        "8" => Code::Digit8,
        "9" => Code::Digit9,
        "f1" => Code::F1,
        "f2" => Code::F2,
        "f3" => Code::F3,
        "f4" => Code::F4,
        "f5" => Code::F5,
        "f6" => Code::F6,
        "f7" => Code::F7,
        "f8" => Code::F8,
        "f9" => Code::F9,
        "f10" => Code::F10,
        "f11" => Code::F11,
        "f12" => Code::F12,
        "space" => Code::Space,
        "enter" | "return" => Code::Enter,
        "tab" => Code::Tab,
        "escape" | "esc" => Code::Escape,
        "backspace" => Code::Backspace,
        "delete" | "del" => Code::Delete,
        "up" | "arrowup" => Code::ArrowUp,
        "down" | "arrowdown" => Code::ArrowDown,
        "left" | "arrowleft" => Code::ArrowLeft,
        "right" | "arrowright" => Code::ArrowRight,
        "semicolon" | ";" => Code::Semicolon,
        "comma" | "," => Code::Comma,
        "period" | "." => Code::Period,
        "slash" | "/" => Code::Slash,
        "minus" | "-" => Code::Minus,
        "equal" | "=" => Code::Equal,
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
#[path = "shortcuts_tests.rs"]
mod tests;
