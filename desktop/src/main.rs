use std::{
    fs,
    sync::{Arc, atomic::Ordering},
    thread,
};

use failure::{Error, ResultExt};
use minifb::{Key, Window, WindowOptions};
use spin_sleep::LoopHelper;
use structopt::StructOpt;

use hamboy::{
    SCREEN_WIDTH, SCREEN_HEIGHT,
    env::Display,
    log::*,
    machine::{
        Machine,
        driver::{self, CpuOptions, Shared},
    },
    primitives::Memory,
    rom,
};
use crate::{args::Args, input::AtomicKeys};


mod args;
mod input;


const WINDOW_TITLE: &str = "Hamboy";
const TARGET_FPS: f64 = 60.0;

/// The four grey shades of the display, lightest first.
const SHADES: [u32; 4] = [0xFF_FF_FF, 0xAA_AA_AA, 0x55_55_55, 0x00_00_00];


fn main() {
    // We just catch potential errors here and pretty print them.
    if let Err(e) = run() {
        println!("ERROR: {}", e);

        for cause in e.iter_causes() {
            println!("  ... caused by: {}", cause);
        }

        std::process::exit(1);
    }
}

/// The actual main function.
fn run() -> Result<(), Error> {
    let args = Args::from_args();
    init_logger(&args);

    // Load the ROM into a fresh address space.
    let rom_bytes = fs::read(&args.rom_file).context("failed to read ROM file")?;
    let mut mem = Memory::zeroed();
    rom::install(&mut mem, &rom_bytes)?;

    let shared = Arc::new(Shared::new(mem));
    let keys = Arc::new(AtomicKeys::none());

    // The CPU gets its own thread.
    let cpu_handle = {
        let shared = shared.clone();
        let keys = keys.clone();
        let opts = CpuOptions {
            skip_unknown: args.skip_unknown,
            fast: args.fast,
        };

        thread::spawn(move || {
            let mut machine = Machine::new();
            let res = driver::run_cpu(&shared, &mut machine, &*keys, &opts);

            // Whatever stopped the CPU, the frame loop has to stop too.
            shared.ending.store(true, Ordering::SeqCst);
            res
        })
    };

    // The main thread doubles as the frame thread: it owns the window,
    // drives the v-blank handshake and blits the composed frames.
    let mut window = open_window(&args).context("failed to open window")?;
    info!("Opened window");

    let mut framebuffer = Framebuffer::new();
    let mut loop_helper = LoopHelper::builder()
        .report_interval_s(1.0)
        .build_with_target_rate(TARGET_FPS);

    while window.is_open()
        && !window.is_key_down(Key::Escape)
        && !shared.ending.load(Ordering::SeqCst)
    {
        loop_helper.loop_start();

        // Leave the v-blank: compose and show a frame, pick up input.
        driver::compose_frame(&shared, &mut framebuffer, args.fast);
        window.update_with_buffer(&framebuffer.pixels).unwrap();
        keys.set(input::read_keys(&window));

        // Back into v-blank for the rest of the frame.
        driver::enter_vblank(&shared);

        if let Some(fps) = loop_helper.report_rate() {
            trace!(target: "driver", "frame rate: {:.1} fps", fps);
        }
        loop_helper.loop_sleep();
    }

    shared.ending.store(true, Ordering::SeqCst);
    match cpu_handle.join() {
        Ok(Ok(())) => {}
        Ok(Err(fault)) => return Err(fault.into()),
        Err(_) => return Err(failure::err_msg("CPU thread panicked")),
    }

    Ok(())
}

/// Sets up `env_logger`. The default level is `info`; `-v` and `-V`
/// additionally enable the per instruction and per frame trace targets.
fn init_logger(args: &Args) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(log::LevelFilter::Info);
    if args.trace_cpu {
        builder.filter(Some("cpu"), log::LevelFilter::Trace);
    }
    if args.trace_driver {
        builder.filter(Some("driver"), log::LevelFilter::Trace);
    }
    builder.init();
}

/// Opens a `minifb` window configured by `args`.
fn open_window(args: &Args) -> Result<Window, Error> {
    let options = WindowOptions {
        borderless: false,
        title: true,
        resize: false,
        scale: args.scale,
    };

    Window::new(WINDOW_TITLE, SCREEN_WIDTH, SCREEN_HEIGHT, options)
        .map_err(|e| e.into())
}

/// 160×144 host framebuffer handed to `minifb`.
struct Framebuffer {
    pixels: Vec<u32>,
}

impl Framebuffer {
    fn new() -> Self {
        Self {
            pixels: vec![SHADES[0]; SCREEN_WIDTH * SCREEN_HEIGHT],
        }
    }
}

impl Display for Framebuffer {
    fn write_line(&mut self, line: u8, pixels: &[u8; SCREEN_WIDTH]) {
        let start = line as usize * SCREEN_WIDTH;
        for (dst, &shade) in self.pixels[start..start + SCREEN_WIDTH].iter_mut().zip(pixels) {
            *dst = SHADES[shade as usize];
        }
    }
}
