//! Contains code to actually execute instructions.

use std::{error::Error, fmt};

use super::Machine;
use crate::{
    instr::{self, INSTRUCTIONS, PREFIXED_INSTRUCTIONS},
    primitives::{Byte, Word, Memory},
};


/// What a single executed instruction did, as far as the driver cares.
#[derive(Debug, Clone, Copy)]
pub struct Step {
    /// The executed opcode. Prefixed instructions show up as `0xCBxx`.
    pub opcode: u16,

    /// Address the instruction was fetched from.
    pub at: Word,

    /// Machine cycles the instruction took.
    pub cycles: u8,

    /// Effective address and stored value of a `ld` family store. The
    /// driver watches these for writes into the video regions. Stores
    /// performed by other instructions (`push`, `inc [hl]`, prefixed
    /// writes) are not reported.
    pub store: Option<(Word, Byte)>,

    /// Set when the instruction was `halt`. The caller decides how to wait
    /// for the v-blank.
    pub halted: bool,
}

/// Error for opcodes the decoder has no implementation for. `pc` is left at
/// the start of the offending instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownInstruction {
    /// The offending opcode.
    pub opcode: u16,

    /// Address of the instruction.
    pub at: Word,
}

impl fmt::Display for UnknownInstruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "instruction 0x{:02x} at {} not supported", self.opcode, self.at)
    }
}

impl Error for UnknownInstruction {}


impl Machine {
    /// Executes one (the next) instruction: fetch, decode, execute.
    pub fn step(&mut self, mem: &mut Memory) -> Result<Step, UnknownInstruction> {
        // ========== MACROS ==========

        /// Template for the INC instructions on 8 bit places. A wrap is the
        /// only way to reach 0, so Z and C coincide.
        macro_rules! inc8 {
            ($x:expr) => {{
                $x += 1u8;
                let zero = $x == 0;
                set_flags!(self.cpu.f => zero zero);
            }}
        }

        /// Template for the DEC instructions on 8 bit places. C records the
        /// wrap from 0 to 255.
        macro_rules! dec8 {
            ($x:expr) => {{
                let wrapped = $x == 0;
                $x -= 1u8;
                let zero = $x == 0;
                set_flags!(self.cpu.f => zero wrapped);
            }}
        }

        // Normal method stuff starts here
        let instr_start = self.cpu.pc;
        let op_byte = mem[instr_start];

        if op_byte == 0xCB {
            return self.step_prefixed(mem, instr_start);
        }

        let instr = match INSTRUCTIONS[op_byte] {
            Some(v) => v,
            None => {
                return Err(UnknownInstruction {
                    opcode: op_byte.get() as u16,
                    at: instr_start,
                });
            }
        };

        // Operands are read upfront; instructions that have none simply
        // ignore these values. 16 bit immediates are little endian.
        let arg_byte = mem[instr_start + 1u16];
        let arg_word = Word::from_bytes(mem[instr_start + 1u16], mem[instr_start + 2u16]);
        self.cpu.pc += instr.len as u16;

        let mut store = None;
        let mut halted = false;
        let mut action_taken = false;

        let op = op_byte.get();
        match op {
            // ======== 0x0_ ========

            // nop
            0x00 => {}

            // ld bc,n16
            0x01 => self.cpu.set_bc(arg_word),

            // ld [bc],a
            0x02 => {
                let dst = self.cpu.bc();
                mem[dst] = self.cpu.a;
                store = Some((dst, self.cpu.a));
            }

            // inc bc
            0x03 => self.cpu.set_bc(self.cpu.bc() + 1u16),

            // inc b / dec b
            0x04 => inc8!(self.cpu.b),
            0x05 => dec8!(self.cpu.b),

            // ld b,n8
            0x06 => self.cpu.b = arg_byte,

            // rlca
            0x07 => {
                let carry = self.cpu.a.rotate_left();
                set_flags!(self.cpu.f => 0 carry);
            }

            // ld [n16],sp
            0x08 => {
                self.store_word(mem, arg_word, self.cpu.sp);
                let (lsb, _) = self.cpu.sp.into_bytes();
                store = Some((arg_word, lsb));
            }

            // add hl,bc / add hl,de / add hl,hl / add hl,sp
            0x09 | 0x19 | 0x29 | 0x39 => {
                let rhs = match op {
                    0x09 => self.cpu.bc(),
                    0x19 => self.cpu.de(),
                    0x29 => self.cpu.hl(),
                    _ => self.cpu.sp,
                };
                let mut hl = self.cpu.hl();
                let carry = hl.add_with_carry(rhs);
                self.cpu.set_hl(hl);
                set_flags!(self.cpu.f => - carry);
            }

            // ld a,[bc]
            0x0A => self.cpu.a = mem[self.cpu.bc()],

            // dec bc
            0x0B => self.cpu.set_bc(self.cpu.bc() - 1),

            // inc c / dec c
            0x0C => inc8!(self.cpu.c),
            0x0D => dec8!(self.cpu.c),

            // ld c,n8
            0x0E => self.cpu.c = arg_byte,

            // rrca
            0x0F => {
                let carry = self.cpu.a.rotate_right();
                set_flags!(self.cpu.f => 0 carry);
            }

            // ======== 0x1_ ========

            // stop (the pad byte is consumed via the instruction length)
            0x10 => {}

            // ld de,n16
            0x11 => self.cpu.set_de(arg_word),

            // ld [de],a
            0x12 => {
                let dst = self.cpu.de();
                mem[dst] = self.cpu.a;
                store = Some((dst, self.cpu.a));
            }

            // inc de
            0x13 => self.cpu.set_de(self.cpu.de() + 1u16),

            // inc d / dec d
            0x14 => inc8!(self.cpu.d),
            0x15 => dec8!(self.cpu.d),

            // ld d,n8
            0x16 => self.cpu.d = arg_byte,

            // rla
            0x17 => {
                let carry = self.cpu.a.rotate_left_through_carry(self.cpu.carry());
                set_flags!(self.cpu.f => 0 carry);
            }

            // jr s8
            0x18 => self.cpu.pc += arg_byte.get() as i8,

            // ld a,[de]
            0x1A => self.cpu.a = mem[self.cpu.de()],

            // dec de
            0x1B => self.cpu.set_de(self.cpu.de() - 1),

            // inc e / dec e
            0x1C => inc8!(self.cpu.e),
            0x1D => dec8!(self.cpu.e),

            // ld e,n8
            0x1E => self.cpu.e = arg_byte,

            // rra
            0x1F => {
                let carry = self.cpu.a.rotate_right_through_carry(self.cpu.carry());
                set_flags!(self.cpu.f => 0 carry);
            }

            // ======== 0x2_ ========

            // jr nz,s8 / jr z,s8 / jr nc,s8 / jr c,s8
            //
            // The displacement byte is consumed either way; it is only
            // applied when the condition holds.
            0x20 | 0x28 | 0x30 | 0x38 => {
                if self.condition(op) {
                    self.cpu.pc += arg_byte.get() as i8;
                    action_taken = true;
                }
            }

            // ld hl,n16
            0x21 => self.cpu.set_hl(arg_word),

            // ldi [hl],a
            0x22 => {
                let dst = self.cpu.hl();
                mem[dst] = self.cpu.a;
                store = Some((dst, self.cpu.a));
                self.cpu.set_hl(dst + 1u16);
            }

            // inc hl
            0x23 => self.cpu.set_hl(self.cpu.hl() + 1u16),

            // inc h / dec h
            0x24 => inc8!(self.cpu.h),
            0x25 => dec8!(self.cpu.h),

            // ld h,n8
            0x26 => self.cpu.h = arg_byte,

            // ldi a,[hl]
            0x2A => {
                let src = self.cpu.hl();
                self.cpu.a = mem[src];
                self.cpu.set_hl(src + 1u16);
            }

            // dec hl
            0x2B => self.cpu.set_hl(self.cpu.hl() - 1),

            // inc l / dec l
            0x2C => inc8!(self.cpu.l),
            0x2D => dec8!(self.cpu.l),

            // ld l,n8
            0x2E => self.cpu.l = arg_byte,

            // cpl (flags stay untouched)
            0x2F => self.cpu.a = !self.cpu.a,

            // ======== 0x3_ ========

            // ld sp,n16
            0x31 => self.cpu.sp = arg_word,

            // ldd [hl],a
            0x32 => {
                let dst = self.cpu.hl();
                mem[dst] = self.cpu.a;
                store = Some((dst, self.cpu.a));
                self.cpu.set_hl(dst - 1);
            }

            // inc sp
            0x33 => self.cpu.sp += 1u16,

            // inc [hl] / dec [hl]
            0x34 => inc8!(mem[self.cpu.hl()]),
            0x35 => dec8!(mem[self.cpu.hl()]),

            // ld [hl],n8
            0x36 => {
                let dst = self.cpu.hl();
                mem[dst] = arg_byte;
                store = Some((dst, arg_byte));
            }

            // scf
            0x37 => {
                set_flags!(self.cpu.f => - 1);
            }

            // ldd a,[hl]
            0x3A => {
                let src = self.cpu.hl();
                self.cpu.a = mem[src];
                self.cpu.set_hl(src - 1);
            }

            // dec sp
            0x3B => self.cpu.sp -= 1u16,

            // inc a / dec a
            0x3C => inc8!(self.cpu.a),
            0x3D => dec8!(self.cpu.a),

            // ld a,n8
            0x3E => self.cpu.a = arg_byte,

            // ccf
            0x3F => {
                let carry = !self.cpu.carry();
                set_flags!(self.cpu.f => - carry);
            }

            // ======== 0x4_ -- 0x7_: 8 bit loads ========

            // halt
            0x76 => halted = true,

            // ld r,r' (with `[hl]` as source or destination)
            0x40..=0x7F => {
                let val = self.read_operand(mem, op);
                match (op >> 3) & 0b111 {
                    0 => self.cpu.b = val,
                    1 => self.cpu.c = val,
                    2 => self.cpu.d = val,
                    3 => self.cpu.e = val,
                    4 => self.cpu.h = val,
                    5 => self.cpu.l = val,
                    6 => {
                        let dst = self.cpu.hl();
                        mem[dst] = val;
                        store = Some((dst, val));
                    }
                    _ => self.cpu.a = val,
                }
            }

            // ======== 0x8_ -- 0xB_: 8 bit ALU ========

            // add a,r / adc a,r
            0x80..=0x87 => self.alu_add(self.read_operand(mem, op), false),
            0x88..=0x8F => self.alu_add(self.read_operand(mem, op), true),

            // sub r / sbc a,r
            0x90..=0x97 => self.alu_sub(self.read_operand(mem, op), false, true),
            0x98..=0x9F => self.alu_sub(self.read_operand(mem, op), true, true),

            // and r / xor r / or r
            0xA0..=0xA7 => self.alu_and(self.read_operand(mem, op)),
            0xA8..=0xAF => self.alu_xor(self.read_operand(mem, op)),
            0xB0..=0xB7 => self.alu_or(self.read_operand(mem, op)),

            // cp r
            0xB8..=0xBF => self.alu_sub(self.read_operand(mem, op), false, false),

            // ======== 0xC_ ========

            // ret nz / ret z / ret nc / ret c
            0xC0 | 0xC8 | 0xD0 | 0xD8 => {
                if self.condition(op) {
                    self.cpu.pc = self.pop(mem);
                    action_taken = true;
                }
            }

            // pop bc / push bc
            0xC1 => {
                let val = self.pop(mem);
                self.cpu.set_bc(val);
            }
            0xC5 => {
                let val = self.cpu.bc();
                self.push(mem, val);
            }

            // jp nz,n16 / jp z,n16 / jp nc,n16 / jp c,n16
            //
            // Both operand bytes are consumed whether or not the jump is
            // taken.
            0xC2 | 0xCA | 0xD2 | 0xDA => {
                if self.condition(op) {
                    self.cpu.pc = arg_word;
                    action_taken = true;
                }
            }

            // jp n16
            0xC3 => self.cpu.pc = arg_word,

            // call nz,n16 / call z,n16 / call nc,n16 / call c,n16
            0xC4 | 0xCC | 0xD4 | 0xDC => {
                if self.condition(op) {
                    let ret = self.cpu.pc;
                    self.push(mem, ret);
                    self.cpu.pc = arg_word;
                    action_taken = true;
                } else {
                    // An untaken call leaves its immediate in the
                    // instruction stream.
                    self.cpu.pc -= 2u16;
                }
            }

            // rst 00h .. rst 38h
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                let ret = self.cpu.pc;
                self.push(mem, ret);
                self.cpu.pc = Word::new((op & 0x38) as u16);
            }

            // ret / reti
            0xC9 => self.cpu.pc = self.pop(mem),
            0xD9 => {
                self.cpu.pc = self.pop(mem);
                self.interrupts_enabled = true;
            }

            // call n16
            0xCD => {
                let ret = self.cpu.pc;
                self.push(mem, ret);
                self.cpu.pc = arg_word;
            }

            // add a,n8 / adc a,n8
            0xC6 => self.alu_add(arg_byte, false),
            0xCE => self.alu_add(arg_byte, true),

            // ======== 0xD_ ========

            // pop de / push de
            0xD1 => {
                let val = self.pop(mem);
                self.cpu.set_de(val);
            }
            0xD5 => {
                let val = self.cpu.de();
                self.push(mem, val);
            }

            // sub n8 / sbc a,n8
            0xD6 => self.alu_sub(arg_byte, false, true),
            0xDE => self.alu_sub(arg_byte, true, true),

            // ======== 0xE_ ========

            // ldh [a8],a
            0xE0 => {
                let dst = Word::new(0xFF00) + arg_byte;
                mem[dst] = self.cpu.a;
                store = Some((dst, self.cpu.a));
            }

            // pop hl / push hl
            0xE1 => {
                let val = self.pop(mem);
                self.cpu.set_hl(val);
            }
            0xE5 => {
                let val = self.cpu.hl();
                self.push(mem, val);
            }

            // ld [c],a
            0xE2 => {
                let dst = Word::new(0xFF00) + self.cpu.c;
                mem[dst] = self.cpu.a;
                store = Some((dst, self.cpu.a));
            }

            // and n8
            0xE6 => self.alu_and(arg_byte),

            // add sp,s8
            0xE8 => {
                let carry = self.cpu.sp.add_signed(arg_byte.get() as i8);
                set_flags!(self.cpu.f => 0 carry);
            }

            // jp hl
            0xE9 => self.cpu.pc = self.cpu.hl(),

            // ld [n16],a
            0xEA => {
                mem[arg_word] = self.cpu.a;
                store = Some((arg_word, self.cpu.a));
            }

            // xor n8
            0xEE => self.alu_xor(arg_byte),

            // ======== 0xF_ ========

            // ldh a,[a8]
            0xF0 => self.cpu.a = mem[Word::new(0xFF00) + arg_byte],

            // pop af / push af
            0xF1 => {
                let val = self.pop(mem);
                self.cpu.set_af(val);
            }
            0xF5 => {
                let val = self.cpu.af();
                self.push(mem, val);
            }

            // ld a,[c]
            0xF2 => self.cpu.a = mem[Word::new(0xFF00) + self.cpu.c],

            // di / ei
            0xF3 => self.interrupts_enabled = false,
            0xFB => self.interrupts_enabled = true,

            // or n8
            0xF6 => self.alu_or(arg_byte),

            // ld hl,sp+s8
            0xF8 => {
                let mut val = self.cpu.sp;
                let carry = val.add_signed(arg_byte.get() as i8);
                self.cpu.set_hl(val);
                set_flags!(self.cpu.f => 0 carry);
            }

            // ld sp,hl
            0xF9 => self.cpu.sp = self.cpu.hl(),

            // ld a,[n16]
            0xFA => self.cpu.a = mem[arg_word],

            // cp n8
            0xFE => self.alu_sub(arg_byte, false, false),

            _ => {
                // In the table, but without an implementation (`daa` is the
                // only such instruction).
                self.cpu.pc = instr_start;
                return Err(UnknownInstruction {
                    opcode: op as u16,
                    at: instr_start,
                });
            }
        }

        let cycles = if action_taken {
            instr.cycles_taken.unwrap_or(instr.cycles)
        } else {
            instr.cycles
        };
        self.cycle_counter += cycles as u64;

        Ok(Step {
            opcode: op as u16,
            at: instr_start,
            cycles,
            store,
            halted,
        })
    }

    /// Executes an instruction behind the `0xCB` prefix. All 256 second
    /// bytes are valid instructions.
    fn step_prefixed(
        &mut self,
        mem: &mut Memory,
        instr_start: Word,
    ) -> Result<Step, UnknownInstruction> {
        let op_byte = mem[instr_start + 1u16];
        let instr = PREFIXED_INSTRUCTIONS[op_byte];
        self.cpu.pc += instr.len as u16;

        let op = op_byte.get();
        match op {
            // rlc r
            0x00..=0x07 => {
                let mut val = self.read_operand(mem, op);
                let carry = val.rotate_left();
                self.write_operand(mem, op, val);
                let zero = val == 0;
                set_flags!(self.cpu.f => zero carry);
            }

            // rrc r
            0x08..=0x0F => {
                let mut val = self.read_operand(mem, op);
                let carry = val.rotate_right();
                self.write_operand(mem, op, val);
                let zero = val == 0;
                set_flags!(self.cpu.f => zero carry);
            }

            // rl r
            0x10..=0x17 => {
                let mut val = self.read_operand(mem, op);
                let carry = val.rotate_left_through_carry(self.cpu.carry());
                self.write_operand(mem, op, val);
                let zero = val == 0;
                set_flags!(self.cpu.f => zero carry);
            }

            // rr r
            0x18..=0x1F => {
                let mut val = self.read_operand(mem, op);
                let carry = val.rotate_right_through_carry(self.cpu.carry());
                self.write_operand(mem, op, val);
                let zero = val == 0;
                set_flags!(self.cpu.f => zero carry);
            }

            // sla r
            0x20..=0x27 => {
                let mut val = self.read_operand(mem, op);
                let carry = val.shift_left();
                self.write_operand(mem, op, val);
                let zero = val == 0;
                set_flags!(self.cpu.f => zero carry);
            }

            // sra r
            0x28..=0x2F => {
                let mut val = self.read_operand(mem, op);
                let carry = val.arithmetic_shift_right();
                self.write_operand(mem, op, val);
                let zero = val == 0;
                set_flags!(self.cpu.f => zero carry);
            }

            // swap r
            0x30..=0x37 => {
                let val = self.read_operand(mem, op).swap_nybbles();
                self.write_operand(mem, op, val);
                let zero = val == 0;
                set_flags!(self.cpu.f => zero 0);
            }

            // srl r
            0x38..=0x3F => {
                let mut val = self.read_operand(mem, op);
                let carry = val.shift_right();
                self.write_operand(mem, op, val);
                let zero = val == 0;
                set_flags!(self.cpu.f => zero carry);
            }

            // bit n,r: Z is the complement of the inspected bit
            0x40..=0x7F => {
                let val = self.read_operand(mem, op);
                let zero = val.get() & (1 << ((op >> 3) & 0b111)) == 0;
                set_flags!(self.cpu.f => zero -);
            }

            // res n,r
            0x80..=0xBF => {
                let mask = 1u8 << ((op >> 3) & 0b111);
                let val = self.read_operand(mem, op).map(|b| b & !mask);
                self.write_operand(mem, op, val);
            }

            // set n,r
            0xC0..=0xFF => {
                let mask = 1u8 << ((op >> 3) & 0b111);
                let val = self.read_operand(mem, op).map(|b| b | mask);
                self.write_operand(mem, op, val);
            }
        }

        self.cycle_counter += instr.cycles as u64;

        Ok(Step {
            opcode: 0xCB00 | op as u16,
            at: instr_start,
            cycles: instr.cycles,
            store: None,
            halted: false,
        })
    }

    /// Advances `pc` past an instruction [`Machine::step`] refused to
    /// execute: the opcode byte plus the operand bytes according to the
    /// metadata table. Only single byte opcodes can be refused (all 256
    /// prefixed instructions are implemented). This is the print-and-skip
    /// recovery used by the driver.
    pub fn skip_unknown(&mut self, fault: &UnknownInstruction) {
        self.cpu.pc = fault.at + (1 + instr::operand_count(fault.opcode) as u16);
    }

    /// Reads the 8 bit operand selected by the low three bits of an opcode
    /// (order: b, c, d, e, h, l, `[hl]`, a).
    fn read_operand(&self, mem: &Memory, sel: u8) -> Byte {
        match sel & 0b111 {
            0 => self.cpu.b,
            1 => self.cpu.c,
            2 => self.cpu.d,
            3 => self.cpu.e,
            4 => self.cpu.h,
            5 => self.cpu.l,
            6 => mem[self.cpu.hl()],
            _ => self.cpu.a,
        }
    }

    /// Counterpart of [`Machine::read_operand`] for writes.
    fn write_operand(&mut self, mem: &mut Memory, sel: u8, val: Byte) {
        match sel & 0b111 {
            0 => self.cpu.b = val,
            1 => self.cpu.c = val,
            2 => self.cpu.d = val,
            3 => self.cpu.e = val,
            4 => self.cpu.h = val,
            5 => self.cpu.l = val,
            6 => mem[self.cpu.hl()] = val,
            _ => self.cpu.a = val,
        }
    }

    /// Condition encoded in bits 3 and 4 of the conditional jump, call and
    /// return opcodes (order: nz, z, nc, c).
    fn condition(&self, op: u8) -> bool {
        match (op >> 3) & 0b11 {
            0 => !self.cpu.zero(),
            1 => self.cpu.zero(),
            2 => !self.cpu.carry(),
            _ => self.cpu.carry(),
        }
    }

    fn alu_add(&mut self, rhs: Byte, with_carry: bool) {
        let carry_in = with_carry && self.cpu.carry();
        let carry = self.cpu.a.full_add_with_carry(rhs, carry_in);
        let zero = self.cpu.a == 0;
        set_flags!(self.cpu.f => zero carry);
    }

    /// `sub`, `sbc` and (with `keep_result = false`) the `cp` family.
    fn alu_sub(&mut self, rhs: Byte, with_carry: bool, keep_result: bool) {
        let borrow_in = with_carry && self.cpu.carry();
        let mut result = self.cpu.a;
        let carry = result.full_sub_with_borrow(rhs, borrow_in);
        let zero = result == 0;
        if keep_result {
            self.cpu.a = result;
        }
        set_flags!(self.cpu.f => zero carry);
    }

    fn alu_and(&mut self, rhs: Byte) {
        self.cpu.a &= rhs;
        let zero = self.cpu.a == 0;
        set_flags!(self.cpu.f => zero 0);
    }

    fn alu_xor(&mut self, rhs: Byte) {
        self.cpu.a ^= rhs;
        let zero = self.cpu.a == 0;
        set_flags!(self.cpu.f => zero 0);
    }

    fn alu_or(&mut self, rhs: Byte) {
        self.cpu.a |= rhs;
        let zero = self.cpu.a == 0;
        set_flags!(self.cpu.f => zero 0);
    }
}


#[cfg(test)]
mod test {
    use super::*;


    /// Returns a machine and a memory with the given code placed at the
    /// entry point 0x0100.
    fn with_rom(code: &[u8]) -> (Machine, Memory) {
        let mut mem = Memory::zeroed();
        mem.write_block(Word::new(0x100), code);
        (Machine::new(), mem)
    }

    fn run(machine: &mut Machine, mem: &mut Memory, steps: usize) {
        for _ in 0..steps {
            machine.step(mem).unwrap();
        }
    }

    #[test]
    fn test_jp_absolute() {
        let (mut machine, mut mem) = with_rom(&[0xC3, 0x50, 0x01]);
        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.pc, 0x0150);
    }

    #[test]
    fn test_ld_and_add() {
        // ld a,0x2a; ld b,0x05; add a,b
        let (mut machine, mut mem) = with_rom(&[0x3E, 0x2A, 0x06, 0x05, 0x80]);
        run(&mut machine, &mut mem, 3);
        assert_eq!(machine.cpu.a, 0x2F);
        assert!(!machine.cpu.zero());
        assert!(!machine.cpu.carry());
    }

    #[test]
    fn test_add_wraps_and_sets_flags() {
        // ld a,0xff; add a,0x01
        let (mut machine, mut mem) = with_rom(&[0x3E, 0xFF, 0xC6, 0x01]);
        run(&mut machine, &mut mem, 2);
        assert_eq!(machine.cpu.a, 0x00);
        assert!(machine.cpu.zero());
        assert!(machine.cpu.carry());
    }

    #[test]
    fn test_ldi_writes_and_bumps_hl() {
        // ld hl,0x1234; ldi [hl],a
        let (mut machine, mut mem) = with_rom(&[0x21, 0x34, 0x12, 0x22]);
        machine.cpu.a = Byte::new(0x77);
        run(&mut machine, &mut mem, 1);

        let step = machine.step(&mut mem).unwrap();
        assert_eq!(mem[Word::new(0x1234)], 0x77);
        assert_eq!(machine.cpu.hl(), 0x1235);
        assert_eq!(step.store, Some((Word::new(0x1234), Byte::new(0x77))));
    }

    #[test]
    fn test_call_and_ret() {
        let (mut machine, mut mem) = with_rom(&[
            0xCD, 0x08, 0x01, // call 0x0108
            0x00, 0x00, 0x00, 0x00, 0x00,
            0xC9, // ret
        ]);
        let sp_before = machine.cpu.sp;

        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.pc, 0x0108);
        assert_eq!(machine.cpu.sp, sp_before - 2);
        // The return address is pushed low byte first.
        assert_eq!(mem[machine.cpu.sp], 0x03);
        assert_eq!(mem[machine.cpu.sp + 1u16], 0x01);

        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.pc, 0x0103);
        assert_eq!(machine.cpu.sp, sp_before);
    }

    #[test]
    fn test_inc_sequence() {
        // inc b, repeatedly
        let (mut machine, mut mem) = with_rom(&[]);
        machine.cpu.b = Byte::new(0xFC);
        for _ in 0..0x104 {
            mem.write_block(machine.cpu.pc, &[0x04]);
            machine.step(&mut mem).unwrap();
        }
        // 0xfc + 0x104 steps = 0x100 mod 256
        assert_eq!(machine.cpu.b, 0x00);
        assert!(machine.cpu.zero());
        assert!(machine.cpu.carry());
    }

    #[test]
    fn test_inc_wrap_boundary() {
        let (mut machine, mut mem) = with_rom(&[0x3C, 0x3C]);
        machine.cpu.a = Byte::new(0xFF);

        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.a, 0x00);
        assert!(machine.cpu.zero());
        assert!(machine.cpu.carry());

        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.a, 0x01);
        assert!(!machine.cpu.zero());
        assert!(!machine.cpu.carry());
    }

    #[test]
    fn test_dec_wrap_boundary() {
        let (mut machine, mut mem) = with_rom(&[0x05, 0x05]);
        machine.cpu.b = Byte::new(0x00);

        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.b, 0xFF);
        assert!(!machine.cpu.zero());
        assert!(machine.cpu.carry());

        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.b, 0xFE);
        assert!(!machine.cpu.zero());
        assert!(!machine.cpu.carry());
    }

    #[test]
    fn test_dec_to_zero() {
        let (mut machine, mut mem) = with_rom(&[0x3D]);
        machine.cpu.a = Byte::new(0x01);
        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.a, 0x00);
        assert!(machine.cpu.zero());
        assert!(!machine.cpu.carry());
    }

    #[test]
    fn test_sub_a_a() {
        let (mut machine, mut mem) = with_rom(&[0x97]);
        machine.cpu.a = Byte::new(0x42);
        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.a, 0x00);
        assert!(machine.cpu.zero());
        assert!(!machine.cpu.carry());
    }

    #[test]
    fn test_sub_borrow() {
        // ld a,0x10; sub 0x20
        let (mut machine, mut mem) = with_rom(&[0x3E, 0x10, 0xD6, 0x20]);
        run(&mut machine, &mut mem, 2);
        assert_eq!(machine.cpu.a, 0xF0);
        assert!(!machine.cpu.zero());
        assert!(machine.cpu.carry());
    }

    #[test]
    fn test_adc_uses_carry() {
        // ld a,0xff; add a,0x01 (sets C); adc a,0x00
        let (mut machine, mut mem) = with_rom(&[0x3E, 0xFF, 0xC6, 0x01, 0xCE, 0x00]);
        run(&mut machine, &mut mem, 3);
        assert_eq!(machine.cpu.a, 0x01);
        assert!(!machine.cpu.zero());
        assert!(!machine.cpu.carry());
    }

    #[test]
    fn test_cp() {
        // ld a,0x10; cp 0x10; then cp 0x20; then cp b (b = 0)
        let (mut machine, mut mem) = with_rom(&[0x3E, 0x10, 0xFE, 0x10, 0xFE, 0x20, 0xB8]);
        run(&mut machine, &mut mem, 2);
        assert!(machine.cpu.zero());
        assert!(!machine.cpu.carry());
        assert_eq!(machine.cpu.a, 0x10);

        run(&mut machine, &mut mem, 1);
        assert!(!machine.cpu.zero());
        assert!(machine.cpu.carry());

        run(&mut machine, &mut mem, 1);
        assert!(!machine.cpu.zero());
        assert!(!machine.cpu.carry());
    }

    #[test]
    fn test_jr_negative_two_loops_in_place() {
        let (mut machine, mut mem) = with_rom(&[0x18, 0xFE]);
        for _ in 0..4 {
            run(&mut machine, &mut mem, 1);
            assert_eq!(machine.cpu.pc, 0x0100);
        }
    }

    #[test]
    fn test_conditional_jr_consumes_displacement() {
        // jr z,+10 with Z clear
        let (mut machine, mut mem) = with_rom(&[0x28, 0x0A]);
        let step = machine.step(&mut mem).unwrap();
        assert_eq!(machine.cpu.pc, 0x0102);
        assert_eq!(step.cycles, 2);

        // jr nz,+10 with Z clear
        let (mut machine, mut mem) = with_rom(&[0x20, 0x0A]);
        let step = machine.step(&mut mem).unwrap();
        assert_eq!(machine.cpu.pc, 0x010C);
        assert_eq!(step.cycles, 3);
    }

    #[test]
    fn test_conditional_jp_consumes_operands() {
        // jp z,0x0200 with Z clear falls through to the next instruction
        let (mut machine, mut mem) = with_rom(&[0xCA, 0x00, 0x02, 0x3E, 0x05]);
        run(&mut machine, &mut mem, 2);
        assert_eq!(machine.cpu.a, 0x05);
        assert_eq!(machine.cpu.pc, 0x0105);
    }

    #[test]
    fn test_conditional_call_taken() {
        // call nz,0x0200 with Z clear
        let (mut machine, mut mem) = with_rom(&[0xC4, 0x00, 0x02]);
        let sp_before = machine.cpu.sp;
        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.pc, 0x0200);
        assert_eq!(machine.cpu.sp, sp_before - 2);
    }

    #[test]
    fn test_conditional_ret() {
        // xor a (sets Z); ret z
        let (mut machine, mut mem) = with_rom(&[0xAF, 0xC8]);
        machine.push(&mut mem, Word::new(0x0234));
        run(&mut machine, &mut mem, 2);
        assert_eq!(machine.cpu.pc, 0x0234);
        assert_eq!(machine.cpu.sp, 0xFFFE);
    }

    #[test]
    fn test_rst() {
        let (mut machine, mut mem) = with_rom(&[0xEF]); // rst 28h
        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.pc, 0x0028);
        assert_eq!(machine.pop(&mem), 0x0101);
    }

    #[test]
    fn test_ld_r16_n16_transposition() {
        // ld bc,0x1234: the first operand byte lands in c, the second in b
        let (mut machine, mut mem) = with_rom(&[0x01, 0x34, 0x12]);
        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.b, 0x12);
        assert_eq!(machine.cpu.c, 0x34);
        assert_eq!(machine.cpu.bc(), 0x1234);
    }

    #[test]
    fn test_immediate_word_roundtrip() {
        // ld sp,0x1234; ld [0xc000],sp: the stored bytes equal the
        // original little endian operands.
        let (mut machine, mut mem) = with_rom(&[0x31, 0x34, 0x12, 0x08, 0x00, 0xC0]);
        run(&mut machine, &mut mem, 2);
        assert_eq!(mem[Word::new(0xC000)], 0x34);
        assert_eq!(mem[Word::new(0xC001)], 0x12);
    }

    #[test]
    fn test_xor_laws() {
        // xor a; xor b (b = 0x5a)
        let (mut machine, mut mem) = with_rom(&[0xAF, 0xA8]);
        machine.cpu.b = Byte::new(0x5A);

        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.a, 0x00);
        assert!(machine.cpu.zero());

        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.a, 0x5A);
        assert!(!machine.cpu.zero());

        // xor a; xor b with b = 0 keeps Z set
        let (mut machine, mut mem) = with_rom(&[0xAF, 0xA8]);
        run(&mut machine, &mut mem, 2);
        assert_eq!(machine.cpu.a, 0x00);
        assert!(machine.cpu.zero());
    }

    #[test]
    fn test_logic_clears_carry() {
        // scf; and a
        let (mut machine, mut mem) = with_rom(&[0x37, 0xA7]);
        run(&mut machine, &mut mem, 2);
        assert!(!machine.cpu.carry());
    }

    #[test]
    fn test_cpl_keeps_flags() {
        // scf; cpl
        let (mut machine, mut mem) = with_rom(&[0x37, 0x2F]);
        machine.cpu.a = Byte::new(0b1010_0101);
        run(&mut machine, &mut mem, 2);
        assert_eq!(machine.cpu.a, 0b0101_1010);
        assert!(machine.cpu.carry());
    }

    #[test]
    fn test_push_pop_roundtrip() {
        // push bc; pop bc
        let (mut machine, mut mem) = with_rom(&[0xC5, 0xC1]);
        machine.cpu.set_bc(Word::new(0xBEEF));
        let sp_before = machine.cpu.sp;
        run(&mut machine, &mut mem, 2);
        assert_eq!(machine.cpu.bc(), 0xBEEF);
        assert_eq!(machine.cpu.sp, sp_before);
    }

    #[test]
    fn test_store_changes_only_target_byte() {
        // ld [0x4321],a
        let (mut machine, mut mem) = with_rom(&[0xEA, 0x21, 0x43]);
        machine.cpu.a = Byte::new(0x99);
        run(&mut machine, &mut mem, 1);

        for addr in 0..0x1_0000usize {
            let expected = match addr {
                0x4321 => 0x99,
                0x0100 => 0xEA,
                0x0101 => 0x21,
                0x0102 => 0x43,
                _ => 0x00,
            };
            assert_eq!(mem[Word::new(addr as u16)], expected, "at address {:04x}", addr);
        }
    }

    #[test]
    fn test_add_hl_keeps_zero_flag() {
        // xor a (sets Z); add hl,bc overflowing
        let (mut machine, mut mem) = with_rom(&[0xAF, 0x09]);
        machine.cpu.set_hl(Word::new(0xFFFF));
        machine.cpu.set_bc(Word::new(0x0001));
        run(&mut machine, &mut mem, 2);
        assert_eq!(machine.cpu.hl(), 0x0000);
        assert!(machine.cpu.carry());
        assert!(machine.cpu.zero());
    }

    #[test]
    fn test_inc_dec_r16_no_flags() {
        // inc bc from 0xffff wraps without touching flags
        let (mut machine, mut mem) = with_rom(&[0x03, 0x0B]);
        machine.cpu.set_bc(Word::new(0xFFFF));
        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.bc(), 0x0000);
        assert!(!machine.cpu.zero());
        assert!(!machine.cpu.carry());

        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.bc(), 0xFFFF);
        assert!(!machine.cpu.zero());
        assert!(!machine.cpu.carry());
    }

    #[test]
    fn test_ldh() {
        // ldh [0x47],a; ldh a,[0x44]
        let (mut machine, mut mem) = with_rom(&[0xE0, 0x47, 0xF0, 0x44]);
        machine.cpu.a = Byte::new(0xE4);
        mem[Word::new(0xFF44)] = Byte::new(0x90);

        let step = machine.step(&mut mem).unwrap();
        assert_eq!(mem[Word::new(0xFF47)], 0xE4);
        assert_eq!(step.store, Some((Word::new(0xFF47), Byte::new(0xE4))));

        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.a, 0x90);
    }

    #[test]
    fn test_ld_hl_block() {
        // ld b,[hl]; ld [hl],c
        let (mut machine, mut mem) = with_rom(&[0x46, 0x71]);
        machine.cpu.set_hl(Word::new(0xC123));
        machine.cpu.c = Byte::new(0x55);
        mem[Word::new(0xC123)] = Byte::new(0xAA);

        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.b, 0xAA);

        let step = machine.step(&mut mem).unwrap();
        assert_eq!(mem[Word::new(0xC123)], 0x55);
        assert_eq!(step.store, Some((Word::new(0xC123), Byte::new(0x55))));
    }

    #[test]
    fn test_swap_twice_is_identity() {
        let (mut machine, mut mem) = with_rom(&[0xCB, 0x37, 0xCB, 0x37]);
        machine.cpu.a = Byte::new(0xA7);

        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.a, 0x7A);
        assert!(!machine.cpu.zero());
        assert!(!machine.cpu.carry());

        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.a, 0xA7);
    }

    #[test]
    fn test_bit() {
        // bit 7,h with bit set, then with bit clear
        let (mut machine, mut mem) = with_rom(&[0xCB, 0x7C, 0xCB, 0x7C]);
        machine.cpu.h = Byte::new(0x80);
        run(&mut machine, &mut mem, 1);
        assert!(!machine.cpu.zero());

        machine.cpu.h = Byte::new(0x7F);
        run(&mut machine, &mut mem, 1);
        assert!(machine.cpu.zero());
    }

    #[test]
    fn test_set_and_res() {
        // set 3,b; res 3,b
        let (mut machine, mut mem) = with_rom(&[0xCB, 0xD8, 0xCB, 0x98]);
        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.b, 0b0000_1000);
        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.b, 0x00);
    }

    #[test]
    fn test_srl() {
        // srl a
        let (mut machine, mut mem) = with_rom(&[0xCB, 0x3F, 0xCB, 0x3F]);
        machine.cpu.a = Byte::new(0x03);

        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.a, 0x01);
        assert!(machine.cpu.carry());
        assert!(!machine.cpu.zero());

        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.a, 0x00);
        assert!(machine.cpu.carry());
        assert!(machine.cpu.zero());
    }

    #[test]
    fn test_prefixed_on_hl() {
        // set 0,[hl]
        let (mut machine, mut mem) = with_rom(&[0xCB, 0xC6]);
        machine.cpu.set_hl(Word::new(0xC050));
        let step = machine.step(&mut mem).unwrap();
        assert_eq!(mem[Word::new(0xC050)], 0x01);
        assert_eq!(step.opcode, 0xCBC6);
        assert_eq!(step.cycles, 4);
    }

    #[test]
    fn test_halt_is_reported() {
        let (mut machine, mut mem) = with_rom(&[0x76]);
        let step = machine.step(&mut mem).unwrap();
        assert!(step.halted);
        assert_eq!(machine.cpu.pc, 0x0101);
    }

    #[test]
    fn test_di_ei() {
        let (mut machine, mut mem) = with_rom(&[0xF3, 0xFB]);
        assert!(machine.interrupts_enabled);
        run(&mut machine, &mut mem, 1);
        assert!(!machine.interrupts_enabled);
        run(&mut machine, &mut mem, 1);
        assert!(machine.interrupts_enabled);
    }

    #[test]
    fn test_unknown_opcode_is_fatal() {
        let (mut machine, mut mem) = with_rom(&[0xD3]);
        let err = machine.step(&mut mem).unwrap_err();
        assert_eq!(err, UnknownInstruction { opcode: 0xD3, at: Word::new(0x0100) });
        // pc stays at the offending instruction
        assert_eq!(machine.cpu.pc, 0x0100);

        machine.skip_unknown(&err);
        assert_eq!(machine.cpu.pc, 0x0101);
    }

    #[test]
    fn test_daa_is_unsupported() {
        let (mut machine, mut mem) = with_rom(&[0x27]);
        let err = machine.step(&mut mem).unwrap_err();
        assert_eq!(err.opcode, 0x27);
        assert_eq!(machine.cpu.pc, 0x0100);

        machine.skip_unknown(&err);
        assert_eq!(machine.cpu.pc, 0x0101);
    }

    #[test]
    fn test_inc_hl_indirect() {
        // inc [hl] from 0xff wraps and sets Z and C
        let (mut machine, mut mem) = with_rom(&[0x34]);
        machine.cpu.set_hl(Word::new(0xC000));
        mem[Word::new(0xC000)] = Byte::new(0xFF);
        run(&mut machine, &mut mem, 1);
        assert_eq!(mem[Word::new(0xC000)], 0x00);
        assert!(machine.cpu.zero());
        assert!(machine.cpu.carry());
    }

    #[test]
    fn test_scf_ccf() {
        let (mut machine, mut mem) = with_rom(&[0x37, 0x3F, 0x3F]);
        run(&mut machine, &mut mem, 1);
        assert!(machine.cpu.carry());
        run(&mut machine, &mut mem, 1);
        assert!(!machine.cpu.carry());
        run(&mut machine, &mut mem, 1);
        assert!(machine.cpu.carry());
    }

    #[test]
    fn test_ld_hl_sp_offset() {
        // ld hl,sp+0x02 with sp = 0xfffe
        let (mut machine, mut mem) = with_rom(&[0xF8, 0x02]);
        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.hl(), 0x0000);
        assert!(machine.cpu.carry());
        assert_eq!(machine.cpu.sp, 0xFFFE);
    }

    #[test]
    fn test_ld_sp_hl() {
        let (mut machine, mut mem) = with_rom(&[0xF9]);
        machine.cpu.set_hl(Word::new(0xD000));
        run(&mut machine, &mut mem, 1);
        assert_eq!(machine.cpu.sp, 0xD000);
    }

    #[test]
    fn test_rla_rotates_through_carry() {
        // scf; rla
        let (mut machine, mut mem) = with_rom(&[0x37, 0x17]);
        machine.cpu.a = Byte::new(0b1000_0000);
        run(&mut machine, &mut mem, 2);
        assert_eq!(machine.cpu.a, 0b0000_0001);
        assert!(machine.cpu.carry());
        assert!(!machine.cpu.zero());
    }
}
