//! The driver: write detection, redraw bookkeeping and the v-blank
//! handshake between the CPU thread and the frame thread.
//!
//! Two locks carry the whole concurrency story. The screen lock guards
//! the planes and the redraw flags: the CPU thread takes it briefly when
//! a store hits a watched region, the frame thread holds it across
//! composition. The v-blank gate (a flag behind a mutex plus a condvar)
//! paces `halt`: a CPU write that happens before the frame thread takes
//! the locks is visible in the next composed frame.

use std::sync::{
    Condvar, Mutex,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use crate::{
    SCREEN_HEIGHT,
    env::{Display, Input},
    instr,
    log::*,
    machine::{
        Machine, addr, lcdc,
        input::InputController,
        ppu::Ppu,
        step::UnknownInstruction,
    },
    primitives::{Byte, Word, Memory},
};


/// The per plane redraw requests, raised by write detection and consumed
/// by the PPU once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedrawFlags {
    pub background: bool,
    pub window: bool,
    pub sprites: bool,
}

impl RedrawFlags {
    pub fn none() -> Self {
        Self { background: false, window: false, sprites: false }
    }

    pub fn all() -> Self {
        Self { background: true, window: true, sprites: true }
    }

    pub fn raise_all(&mut self) {
        *self = Self::all();
    }

    /// Returns the current flags and clears them.
    pub fn take(&mut self) -> Self {
        std::mem::replace(self, Self::none())
    }
}

/// Watches the effective addresses of CPU stores and raises redraw flags
/// for writes that can change the composed frame.
pub struct WriteWatch {
    /// LCDC bits of the last observed control register write, to catch
    /// enable bits flipping on.
    lcdc_seen: u8,
}

impl WriteWatch {
    pub fn new() -> Self {
        Self { lcdc_seen: 0 }
    }

    pub fn observe(&mut self, at: Word, value: Byte, flags: &mut RedrawFlags) {
        let a = at.get();
        if (0x8000..0xA002).contains(&a) {
            // Tile data feeds all three layers.
            flags.raise_all();
        } else if (0xFE00..=0xFEA0).contains(&a) {
            flags.sprites = true;
        } else if at == addr::LCDC {
            let turned_on = value.get() & !self.lcdc_seen;
            self.lcdc_seen = value.get();

            if turned_on & lcdc::ON != 0 {
                flags.raise_all();
            } else {
                if turned_on & lcdc::BG_ON != 0 {
                    flags.background = true;
                }
                if turned_on & lcdc::WIN_ON != 0 {
                    flags.window = true;
                }
                if turned_on & lcdc::OBJ_ON != 0 {
                    flags.sprites = true;
                }
            }
        }
    }
}

/// The in-v-blank flag behind a lock, with a condvar for `halt` waiters.
pub struct VblankGate {
    in_vblank: Mutex<bool>,
    changed: Condvar,
}

impl VblankGate {
    pub fn new() -> Self {
        Self {
            in_vblank: Mutex::new(false),
            changed: Condvar::new(),
        }
    }

    /// Runs `f` with the lock held and the flag set to `to`, then wakes
    /// all waiters.
    pub fn transition<R>(&self, to: bool, f: impl FnOnce() -> R) -> R {
        let mut in_vblank = self.in_vblank.lock().unwrap();
        *in_vblank = to;
        let out = f();
        self.changed.notify_all();
        out
    }

    pub fn is_in_vblank(&self) -> bool {
        *self.in_vblank.lock().unwrap()
    }

    /// Blocks until the flag transitions into v-blank. This waits for an
    /// entry edge, not a level: a currently running v-blank has to end
    /// first. Returns early when `ending` is set; the timeouts keep the
    /// wait responsive to that.
    pub fn wait_for_vblank(&self, ending: &AtomicBool) {
        let tick = Duration::from_millis(4);

        let mut in_vblank = self.in_vblank.lock().unwrap();
        while *in_vblank && !ending.load(Ordering::SeqCst) {
            let (guard, _) = self.changed.wait_timeout(in_vblank, tick).unwrap();
            in_vblank = guard;
        }
        while !*in_vblank && !ending.load(Ordering::SeqCst) {
            let (guard, _) = self.changed.wait_timeout(in_vblank, tick).unwrap();
            in_vblank = guard;
        }
    }
}

/// The planes plus the pending redraw flags, guarded as one unit.
pub struct Screen {
    pub ppu: Ppu,
    pub flags: RedrawFlags,
}

/// Everything the CPU thread and the frame thread share.
pub struct Shared {
    pub mem: Mutex<Memory>,
    pub screen: Mutex<Screen>,
    pub gate: VblankGate,

    /// Process wide cancellation, set on window close. Both loops stop
    /// between iterations.
    pub ending: AtomicBool,
}

impl Shared {
    pub fn new(mut mem: Memory) -> Self {
        // Power-on state: the LCD is running and neither joypad group is
        // selected.
        mem[addr::LCDC] = Byte::new(lcdc::ON);
        mem[addr::P1] = Byte::new(0b0011_0000);

        Self {
            mem: Mutex::new(mem),
            screen: Mutex::new(Screen {
                ppu: Ppu::new(),
                // The first frame draws everything.
                flags: RedrawFlags::all(),
            }),
            gate: VblankGate::new(),
            ending: AtomicBool::new(false),
        }
    }
}

/// Behavior switches of the CPU loop.
pub struct CpuOptions {
    /// Print unknown opcodes and skip their operand bytes instead of
    /// stopping.
    pub skip_unknown: bool,

    /// Skip the screen lock on stores. The frame loop compensates by
    /// redrawing every plane every frame.
    pub fast: bool,
}

/// The fetch/decode/execute loop. Runs until `ending` is set, or until an
/// unknown opcode is hit in the default (fatal) mode.
pub fn run_cpu(
    shared: &Shared,
    machine: &mut Machine,
    input: &impl Input,
    opts: &CpuOptions,
) -> Result<(), UnknownInstruction> {
    let mut joypad = InputController::new();
    let mut watch = WriteWatch::new();

    while !shared.ending.load(Ordering::SeqCst) {
        let mut store = None;
        let mut wait_for_vblank = false;

        {
            let mut mem = shared.mem.lock().unwrap();

            match machine.step(&mut mem) {
                Ok(step) => {
                    trace!(
                        target: "cpu",
                        "{}  {}",
                        step.at,
                        instr::mnemonic(step.opcode).unwrap_or("??"),
                    );
                    store = step.store;
                    if step.halted {
                        wait_for_vblank = halt_waits(machine, &mem);
                        if !wait_for_vblank {
                            trace!(target: "cpu", "halt skipped (no interrupts or LCD off)");
                        }
                    }
                }
                Err(fault) => {
                    if !opts.skip_unknown {
                        error!("{} after {} cycles", fault, machine.cycle_counter);
                        return Err(fault);
                    }
                    machine.skip_unknown(&fault);
                    warn!(
                        target: "cpu",
                        "{} ; unsupported, skipped",
                        instr::mnemonic(fault.opcode).unwrap_or("??"),
                    );
                }
            }

            joypad.poll(&mut mem, input);
        }

        if !opts.fast {
            if let Some((at, value)) = store {
                let mut screen = shared.screen.lock().unwrap();
                watch.observe(at, value, &mut screen.flags);
            }
        }

        if wait_for_vblank {
            shared.gate.wait_for_vblank(&shared.ending);
        }
    }

    Ok(())
}

/// `halt` only waits when something could end the wait: interrupts
/// enabled, the v-blank interrupt allowed in IE, and the LCD on.
/// Everything else means no interrupt is pending and the instruction
/// returns immediately.
fn halt_waits(machine: &Machine, mem: &Memory) -> bool {
    machine.interrupts_enabled
        && mem[addr::IE].get() & 0b0000_0001 != 0
        && mem[addr::LCDC].get() & lcdc::ON != 0
}

/// The v-blank exit half of a frame tick: under the gate, LY returns to 0
/// and the PPU composes a frame from the current memory contents. Pending
/// redraw flags are consumed; in fast mode every plane is redrawn
/// instead.
pub fn compose_frame(shared: &Shared, display: &mut impl Display, fast: bool) {
    shared.gate.transition(false, || {
        let mut mem = shared.mem.lock().unwrap();
        mem[addr::LY] = Byte::zero();

        let mut screen = shared.screen.lock().unwrap();
        let flags = if fast {
            RedrawFlags::all()
        } else {
            screen.flags.take()
        };
        screen.ppu.compose(&mem, flags, display);
    });
}

/// The v-blank entry half of a frame tick: LY jumps to 144 and halted
/// CPUs wake up. The frame thread parks here for the rest of the frame.
pub fn enter_vblank(shared: &Shared) {
    shared.gate.transition(true, || {
        let mut mem = shared.mem.lock().unwrap();
        mem[addr::LY] = Byte::new(SCREEN_HEIGHT as u8);
    });
}


#[cfg(test)]
mod test {
    use std::sync::{Arc, mpsc};
    use std::thread;

    use super::*;
    use crate::SCREEN_WIDTH;


    struct Screenshot {
        lines: Vec<[u8; SCREEN_WIDTH]>,
    }

    impl Screenshot {
        fn new() -> Self {
            Self { lines: vec![[0; SCREEN_WIDTH]; SCREEN_HEIGHT] }
        }
    }

    impl Display for Screenshot {
        fn write_line(&mut self, line: u8, pixels: &[u8; SCREEN_WIDTH]) {
            self.lines[line as usize] = *pixels;
        }
    }

    struct NoInput;

    impl Input for NoInput {
        fn pressed(&self) -> crate::machine::input::Keys {
            crate::machine::input::Keys::none()
        }
    }

    #[test]
    fn test_watch_vram_store_raises_all() {
        let mut watch = WriteWatch::new();
        let mut flags = RedrawFlags::none();

        watch.observe(Word::new(0x8000), Byte::new(0x77), &mut flags);
        assert_eq!(flags, RedrawFlags::all());

        // Stores right below and above the watched region do nothing.
        let mut flags = RedrawFlags::none();
        watch.observe(Word::new(0x7FFF), Byte::new(0x77), &mut flags);
        watch.observe(Word::new(0xA002), Byte::new(0x77), &mut flags);
        assert_eq!(flags, RedrawFlags::none());

        watch.observe(Word::new(0xA001), Byte::new(0x77), &mut flags);
        assert_eq!(flags, RedrawFlags::all());
    }

    #[test]
    fn test_watch_oam_store_raises_sprites() {
        let mut watch = WriteWatch::new();
        let mut flags = RedrawFlags::none();

        watch.observe(Word::new(0xFE00), Byte::new(0x10), &mut flags);
        assert_eq!(flags, RedrawFlags { background: false, window: false, sprites: true });

        let mut flags = RedrawFlags::none();
        watch.observe(Word::new(0xFEA0), Byte::new(0x10), &mut flags);
        assert!(flags.sprites);
    }

    #[test]
    fn test_watch_lcdc_transitions() {
        let mut watch = WriteWatch::new();
        let mut flags = RedrawFlags::none();

        // LCD flipping on raises everything.
        watch.observe(addr::LCDC, Byte::new(0x80), &mut flags);
        assert_eq!(flags, RedrawFlags::all());

        // Writing the same value again is not a transition.
        let mut flags = RedrawFlags::none();
        watch.observe(addr::LCDC, Byte::new(0x80), &mut flags);
        assert_eq!(flags, RedrawFlags::none());

        // Turning on the window raises only the window flag.
        watch.observe(addr::LCDC, Byte::new(0x80 | 0x20), &mut flags);
        assert_eq!(flags, RedrawFlags { background: false, window: true, sprites: false });

        // Turning sprites and background on at once.
        let mut flags = RedrawFlags::none();
        watch.observe(addr::LCDC, Byte::new(0x80 | 0x20 | 0x03), &mut flags);
        assert_eq!(flags, RedrawFlags { background: true, window: false, sprites: true });
    }

    #[test]
    fn test_store_to_composition_roundtrip() {
        let mut mem = Memory::zeroed();
        mem[addr::BGP] = Byte::new(0b1110_0100);
        mem.write_block(Word::new(0x100), &[
            0x3E, 0x91,       // ld a,0x91 (LCD on, 0x8000 data, bg on)
            0xEA, 0x40, 0xFF, // ld [0xff40],a
            0x3E, 0x77,       // ld a,0x77
            0xEA, 0x00, 0x80, // ld [0x8000],a
        ]);

        let shared = Shared::new(mem);
        shared.screen.lock().unwrap().flags.take();

        let mut machine = Machine::new();
        let mut watch = WriteWatch::new();
        for _ in 0..4 {
            let step = {
                let mut mem = shared.mem.lock().unwrap();
                machine.step(&mut mem).unwrap()
            };
            if let Some((at, value)) = step.store {
                let mut screen = shared.screen.lock().unwrap();
                watch.observe(at, value, &mut screen.flags);
            }
        }
        assert_eq!(shared.screen.lock().unwrap().flags, RedrawFlags::all());

        let mut shot = Screenshot::new();
        compose_frame(&shared, &mut shot, false);

        // The flags were consumed and the tile at 0x8000 was decoded:
        // its first row 0x77 0x00 starts with a 0 pixel, then a 1 pixel.
        assert_eq!(shared.screen.lock().unwrap().flags, RedrawFlags::none());
        assert_eq!(shot.lines[0][0], 0);
        assert_eq!(shot.lines[0][1], 1);
        assert_eq!(shared.mem.lock().unwrap()[addr::LY], 0);

        enter_vblank(&shared);
        assert_eq!(shared.mem.lock().unwrap()[addr::LY], 144);
        assert!(shared.gate.is_in_vblank());
    }

    #[test]
    fn test_gate_wakes_halt_waiter_on_entry() {
        let shared = Arc::new(Shared::new(Memory::zeroed()));
        let (tx, rx) = mpsc::channel();

        let waiter = {
            let shared = shared.clone();
            thread::spawn(move || {
                shared.gate.wait_for_vblank(&shared.ending);
                tx.send(()).unwrap();
            })
        };

        // Not in v-blank yet: the waiter stays blocked.
        thread::sleep(Duration::from_millis(30));
        assert!(rx.try_recv().is_err());

        shared.gate.transition(true, || ());
        rx.recv_timeout(Duration::from_secs(2)).unwrap();
        waiter.join().unwrap();
    }

    #[test]
    fn test_gate_waits_for_fresh_edge() {
        let shared = Arc::new(Shared::new(Memory::zeroed()));
        shared.gate.transition(true, || ());

        let (tx, rx) = mpsc::channel();
        let waiter = {
            let shared = shared.clone();
            thread::spawn(move || {
                shared.gate.wait_for_vblank(&shared.ending);
                tx.send(()).unwrap();
            })
        };

        // Still inside the v-blank the waiter started in: no wake up.
        thread::sleep(Duration::from_millis(30));
        assert!(rx.try_recv().is_err());

        // Leaving and re-entering is the edge the waiter needs.
        shared.gate.transition(false, || ());
        thread::sleep(Duration::from_millis(10));
        shared.gate.transition(true, || ());
        rx.recv_timeout(Duration::from_secs(2)).unwrap();
        waiter.join().unwrap();
    }

    #[test]
    fn test_gate_wait_cancelled_by_ending() {
        let shared = Arc::new(Shared::new(Memory::zeroed()));
        shared.gate.transition(true, || ());

        let waiter = {
            let shared = shared.clone();
            thread::spawn(move || {
                shared.gate.wait_for_vblank(&shared.ending);
            })
        };

        thread::sleep(Duration::from_millis(10));
        shared.ending.store(true, Ordering::SeqCst);
        waiter.join().unwrap();
    }

    #[test]
    fn test_run_cpu_fails_on_unknown_opcode() {
        let mut mem = Memory::zeroed();
        mem.write_block(Word::new(0x100), &[0xD3]);
        let shared = Shared::new(mem);
        let mut machine = Machine::new();

        let opts = CpuOptions { skip_unknown: false, fast: false };
        let err = run_cpu(&shared, &mut machine, &NoInput, &opts).unwrap_err();
        assert_eq!(err.opcode, 0xD3);
        assert_eq!(err.at, Word::new(0x0100));
    }

    #[test]
    fn test_run_cpu_skip_mode_survives_unknown_opcodes() {
        // daa, an invalid opcode, then an endless loop.
        let mut mem = Memory::zeroed();
        mem.write_block(Word::new(0x100), &[0x27, 0xD3, 0x18, 0xFE]);
        let shared = Arc::new(Shared::new(mem));

        let handle = {
            let shared = shared.clone();
            thread::spawn(move || {
                let mut machine = Machine::new();
                let opts = CpuOptions { skip_unknown: true, fast: false };
                run_cpu(&shared, &mut machine, &NoInput, &opts)
            })
        };

        thread::sleep(Duration::from_millis(50));
        shared.ending.store(true, Ordering::SeqCst);
        assert!(handle.join().unwrap().is_ok());
    }

    #[test]
    fn test_halt_returns_immediately_without_interrupts() {
        // di; halt; jr back to the halt. With interrupts disabled the
        // halt does not block, so the loop keeps spinning until `ending`
        // is set.
        let mut mem = Memory::zeroed();
        mem[addr::LCDC] = Byte::new(0x80);
        mem[addr::IE] = Byte::new(0x01);
        mem.write_block(Word::new(0x100), &[0xF3, 0x76, 0x18, 0xFD]);
        let shared = Arc::new(Shared::new(mem));

        let handle = {
            let shared = shared.clone();
            thread::spawn(move || {
                let mut machine = Machine::new();
                let opts = CpuOptions { skip_unknown: false, fast: false };
                run_cpu(&shared, &mut machine, &NoInput, &opts)
            })
        };

        thread::sleep(Duration::from_millis(50));
        shared.ending.store(true, Ordering::SeqCst);
        assert!(handle.join().unwrap().is_ok());
    }
}
