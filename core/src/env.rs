//! Traits through which the core talks to its host environment.

use crate::{SCREEN_WIDTH, machine::input::Keys};


/// The display the composed frames are written to, one line at a time.
///
/// Each pixel is a palette index in `0..=3` (0 is the lightest shade); the
/// host decides how those map to actual colors.
pub trait Display {
    fn write_line(&mut self, line: u8, pixels: &[u8; SCREEN_WIDTH]);
}

/// Source of the currently pressed joypad buttons.
pub trait Input {
    fn pressed(&self) -> Keys;
}
