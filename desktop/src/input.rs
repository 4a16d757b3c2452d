//! Host key handling: mapping pressed keys to joypad buttons and sharing
//! the pressed set with the CPU thread.

use std::sync::atomic::{AtomicU8, Ordering};

use minifb::{Key, Window};

use hamboy::{
    env::Input,
    machine::input::{Button, Keys},
};


/// The pressed button set, shared lock free between the window loop and
/// the CPU thread.
pub struct AtomicKeys(AtomicU8);

impl AtomicKeys {
    pub fn none() -> Self {
        Self(AtomicU8::new(Keys::none().bits()))
    }

    pub fn set(&self, keys: Keys) {
        self.0.store(keys.bits(), Ordering::SeqCst);
    }
}

impl Input for AtomicKeys {
    fn pressed(&self) -> Keys {
        Keys::from_bits(self.0.load(Ordering::SeqCst))
    }
}

/// Reads the currently pressed host keys and maps them to the joypad:
/// the arrow keys move, Enter is START, Right-Shift is SELECT, `a` is B
/// and `s` is A.
pub fn read_keys(window: &Window) -> Keys {
    let mut keys = Keys::none();
    for key in window.get_keys().unwrap_or_default() {
        let button = match key {
            Key::Up => Button::Up,
            Key::Down => Button::Down,
            Key::Left => Button::Left,
            Key::Right => Button::Right,
            Key::Enter => Button::Start,
            Key::RightShift => Button::Select,
            Key::A => Button::B,
            Key::S => Button::A,
            _ => continue,
        };
        keys = keys.with(button, true);
    }
    keys
}
