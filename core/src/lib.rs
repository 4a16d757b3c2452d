//! Hamboy!
//!
//! The emulator core: a flat 64 KiB memory, the LR35902-style CPU, the pixel
//! processing unit and the driver glue that ties them together. Everything
//! host specific (window, framebuffer, key events, the actual threads) lives
//! in the front-end crate and talks to this crate through the traits in
//! [`env`].


pub mod primitives;
pub mod env;
pub mod instr;
pub mod rom;
pub mod machine;

/// The crate's logging surface: one glob import (`use crate::log::*;`)
/// brings every macro of the `log` facade into scope.
pub mod log {
    pub use log::{debug, error, info, log, trace, warn};
}


/// Width of the visible screen in pixels.
pub const SCREEN_WIDTH: usize = 160;

/// Height of the visible screen in pixels.
pub const SCREEN_HEIGHT: usize = 144;

/// Width and height of the background and window planes in pixels.
pub const PLANE_SIZE: usize = 256;

pub use crate::machine::{
    Machine,
    step::UnknownInstruction,
};
