//! Instruction metadata.
//!
//! Length and machine cycle counts for every instruction, stored in two
//! dense 256-element arrays: one for the main opcode space and one for the
//! instructions behind the `0xCB` prefix. The executor advances `pc` by the
//! lengths stored here, the verbose trace prints the mnemonics, and the
//! print-and-skip fallback uses both.

use std::ops::Index;

use crate::primitives::Byte;


/// The information we store per instruction.
#[derive(Debug, Clone, Copy)]
pub struct Instr {
    /// The (meaningful) opcode of this instruction. For prefixed
    /// instructions this is the second byte, not `0xCB`. It always equals
    /// the index in the corresponding array.
    pub opcode: Byte,

    /// Mnemonic, including operand placeholders:
    /// - `n8`/`n16`: immediate data
    /// - `a8`: 8 bit offset from `0xFF00`
    /// - `s8`: signed 8 bit value
    pub mnemonic: &'static str,

    /// Length in bytes, including the opcode byte(s).
    pub len: u8,

    /// Machine cycles (1 MHz steps).
    pub cycles: u8,

    /// Machine cycles if the branch is taken. Only set for conditional
    /// instructions; `cycles` is the not-taken count for those.
    pub cycles_taken: Option<u8>,
}

impl Instr {
    const fn some(
        opcode: u8,
        mnemonic: &'static str,
        len: u8,
        cycles: u8,
        cycles_taken: Option<u8>,
    ) -> Option<Self> {
        Some(Instr::new(opcode, mnemonic, len, cycles, cycles_taken))
    }

    const fn new(
        opcode: u8,
        mnemonic: &'static str,
        len: u8,
        cycles: u8,
        cycles_taken: Option<u8>,
    ) -> Self {
        Instr {
            opcode: Byte::new(opcode),
            mnemonic,
            len,
            cycles,
            cycles_taken,
        }
    }
}

/// Simple wrapper to make the static arrays indexable with `Byte` instead
/// of `usize`.
pub struct OpTable<T>([T; 256]);

impl<T> Index<Byte> for OpTable<T> {
    type Output = T;
    fn index(&self, idx: Byte) -> &Self::Output {
        &self.0[idx.get() as usize]
    }
}

/// Returns the mnemonic of the given opcode, if it denotes a known
/// instruction. Prefixed opcodes are passed as `0xCBxx`.
pub fn mnemonic(opcode: u16) -> Option<&'static str> {
    if opcode > 0xFF {
        match opcode >> 8 {
            0xCB => Some(PREFIXED_INSTRUCTIONS[Byte::new(opcode as u8)].mnemonic),
            _ => None,
        }
    } else {
        INSTRUCTIONS[Byte::new(opcode as u8)].map(|i| i.mnemonic)
    }
}

/// Number of operand bytes following the opcode byte(s). Opcodes without a
/// table entry count as having none.
pub fn operand_count(opcode: u16) -> u8 {
    if opcode > 0xFF {
        // Prefixed instructions never carry operands.
        0
    } else {
        INSTRUCTIONS[Byte::new(opcode as u8)]
            .map(|i| i.len.saturating_sub(1))
            .unwrap_or(0)
    }
}

/// Main instruction data. Entries with the value `None` are invalid
/// opcodes.
///
/// The `prefix cb` entry has length and cycle count 0: the values stored in
/// `PREFIXED_INSTRUCTIONS` already cover the whole two byte instruction.
pub const INSTRUCTIONS: OpTable<Option<Instr>> = OpTable([
    Instr::some(0x00, "nop",          1, 1, None),
    Instr::some(0x01, "ld bc,n16",    3, 3, None),
    Instr::some(0x02, "ld [bc],a",    1, 2, None),
    Instr::some(0x03, "inc bc",       1, 2, None),
    Instr::some(0x04, "inc b",        1, 1, None),
    Instr::some(0x05, "dec b",        1, 1, None),
    Instr::some(0x06, "ld b,n8",      2, 2, None),
    Instr::some(0x07, "rlca",         1, 1, None),
    Instr::some(0x08, "ld [n16],sp",  3, 5, None),
    Instr::some(0x09, "add hl,bc",    1, 2, None),
    Instr::some(0x0a, "ld a,[bc]",    1, 2, None),
    Instr::some(0x0b, "dec bc",       1, 2, None),
    Instr::some(0x0c, "inc c",        1, 1, None),
    Instr::some(0x0d, "dec c",        1, 1, None),
    Instr::some(0x0e, "ld c,n8",      2, 2, None),
    Instr::some(0x0f, "rrca",         1, 1, None),

    Instr::some(0x10, "stop",         2, 1, None),
    Instr::some(0x11, "ld de,n16",    3, 3, None),
    Instr::some(0x12, "ld [de],a",    1, 2, None),
    Instr::some(0x13, "inc de",       1, 2, None),
    Instr::some(0x14, "inc d",        1, 1, None),
    Instr::some(0x15, "dec d",        1, 1, None),
    Instr::some(0x16, "ld d,n8",      2, 2, None),
    Instr::some(0x17, "rla",          1, 1, None),
    Instr::some(0x18, "jr s8",        2, 3, None),
    Instr::some(0x19, "add hl,de",    1, 2, None),
    Instr::some(0x1a, "ld a,[de]",    1, 2, None),
    Instr::some(0x1b, "dec de",       1, 2, None),
    Instr::some(0x1c, "inc e",        1, 1, None),
    Instr::some(0x1d, "dec e",        1, 1, None),
    Instr::some(0x1e, "ld e,n8",      2, 2, None),
    Instr::some(0x1f, "rra",          1, 1, None),

    Instr::some(0x20, "jr nz,s8",     2, 2, Some(3)),
    Instr::some(0x21, "ld hl,n16",    3, 3, None),
    Instr::some(0x22, "ldi [hl],a",   1, 2, None),
    Instr::some(0x23, "inc hl",       1, 2, None),
    Instr::some(0x24, "inc h",        1, 1, None),
    Instr::some(0x25, "dec h",        1, 1, None),
    Instr::some(0x26, "ld h,n8",      2, 2, None),
    Instr::some(0x27, "daa",          1, 1, None),
    Instr::some(0x28, "jr z,s8",      2, 2, Some(3)),
    Instr::some(0x29, "add hl,hl",    1, 2, None),
    Instr::some(0x2a, "ldi a,[hl]",   1, 2, None),
    Instr::some(0x2b, "dec hl",       1, 2, None),
    Instr::some(0x2c, "inc l",        1, 1, None),
    Instr::some(0x2d, "dec l",        1, 1, None),
    Instr::some(0x2e, "ld l,n8",      2, 2, None),
    Instr::some(0x2f, "cpl",          1, 1, None),

    Instr::some(0x30, "jr nc,s8",     2, 2, Some(3)),
    Instr::some(0x31, "ld sp,n16",    3, 3, None),
    Instr::some(0x32, "ldd [hl],a",   1, 2, None),
    Instr::some(0x33, "inc sp",       1, 2, None),
    Instr::some(0x34, "inc [hl]",     1, 3, None),
    Instr::some(0x35, "dec [hl]",     1, 3, None),
    Instr::some(0x36, "ld [hl],n8",   2, 3, None),
    Instr::some(0x37, "scf",          1, 1, None),
    Instr::some(0x38, "jr c,s8",      2, 2, Some(3)),
    Instr::some(0x39, "add hl,sp",    1, 2, None),
    Instr::some(0x3a, "ldd a,[hl]",   1, 2, None),
    Instr::some(0x3b, "dec sp",       1, 2, None),
    Instr::some(0x3c, "inc a",        1, 1, None),
    Instr::some(0x3d, "dec a",        1, 1, None),
    Instr::some(0x3e, "ld a,n8",      2, 2, None),
    Instr::some(0x3f, "ccf",          1, 1, None),

    Instr::some(0x40, "ld b,b",       1, 1, None),
    Instr::some(0x41, "ld b,c",       1, 1, None),
    Instr::some(0x42, "ld b,d",       1, 1, None),
    Instr::some(0x43, "ld b,e",       1, 1, None),
    Instr::some(0x44, "ld b,h",       1, 1, None),
    Instr::some(0x45, "ld b,l",       1, 1, None),
    Instr::some(0x46, "ld b,[hl]",    1, 2, None),
    Instr::some(0x47, "ld b,a",       1, 1, None),
    Instr::some(0x48, "ld c,b",       1, 1, None),
    Instr::some(0x49, "ld c,c",       1, 1, None),
    Instr::some(0x4a, "ld c,d",       1, 1, None),
    Instr::some(0x4b, "ld c,e",       1, 1, None),
    Instr::some(0x4c, "ld c,h",       1, 1, None),
    Instr::some(0x4d, "ld c,l",       1, 1, None),
    Instr::some(0x4e, "ld c,[hl]",    1, 2, None),
    Instr::some(0x4f, "ld c,a",       1, 1, None),

    Instr::some(0x50, "ld d,b",       1, 1, None),
    Instr::some(0x51, "ld d,c",       1, 1, None),
    Instr::some(0x52, "ld d,d",       1, 1, None),
    Instr::some(0x53, "ld d,e",       1, 1, None),
    Instr::some(0x54, "ld d,h",       1, 1, None),
    Instr::some(0x55, "ld d,l",       1, 1, None),
    Instr::some(0x56, "ld d,[hl]",    1, 2, None),
    Instr::some(0x57, "ld d,a",       1, 1, None),
    Instr::some(0x58, "ld e,b",       1, 1, None),
    Instr::some(0x59, "ld e,c",       1, 1, None),
    Instr::some(0x5a, "ld e,d",       1, 1, None),
    Instr::some(0x5b, "ld e,e",       1, 1, None),
    Instr::some(0x5c, "ld e,h",       1, 1, None),
    Instr::some(0x5d, "ld e,l",       1, 1, None),
    Instr::some(0x5e, "ld e,[hl]",    1, 2, None),
    Instr::some(0x5f, "ld e,a",       1, 1, None),

    Instr::some(0x60, "ld h,b",       1, 1, None),
    Instr::some(0x61, "ld h,c",       1, 1, None),
    Instr::some(0x62, "ld h,d",       1, 1, None),
    Instr::some(0x63, "ld h,e",       1, 1, None),
    Instr::some(0x64, "ld h,h",       1, 1, None),
    Instr::some(0x65, "ld h,l",       1, 1, None),
    Instr::some(0x66, "ld h,[hl]",    1, 2, None),
    Instr::some(0x67, "ld h,a",       1, 1, None),
    Instr::some(0x68, "ld l,b",       1, 1, None),
    Instr::some(0x69, "ld l,c",       1, 1, None),
    Instr::some(0x6a, "ld l,d",       1, 1, None),
    Instr::some(0x6b, "ld l,e",       1, 1, None),
    Instr::some(0x6c, "ld l,h",       1, 1, None),
    Instr::some(0x6d, "ld l,l",       1, 1, None),
    Instr::some(0x6e, "ld l,[hl]",    1, 2, None),
    Instr::some(0x6f, "ld l,a",       1, 1, None),

    Instr::some(0x70, "ld [hl],b",    1, 2, None),
    Instr::some(0x71, "ld [hl],c",    1, 2, None),
    Instr::some(0x72, "ld [hl],d",    1, 2, None),
    Instr::some(0x73, "ld [hl],e",    1, 2, None),
    Instr::some(0x74, "ld [hl],h",    1, 2, None),
    Instr::some(0x75, "ld [hl],l",    1, 2, None),
    Instr::some(0x76, "halt",         1, 1, None),
    Instr::some(0x77, "ld [hl],a",    1, 2, None),
    Instr::some(0x78, "ld a,b",       1, 1, None),
    Instr::some(0x79, "ld a,c",       1, 1, None),
    Instr::some(0x7a, "ld a,d",       1, 1, None),
    Instr::some(0x7b, "ld a,e",       1, 1, None),
    Instr::some(0x7c, "ld a,h",       1, 1, None),
    Instr::some(0x7d, "ld a,l",       1, 1, None),
    Instr::some(0x7e, "ld a,[hl]",    1, 2, None),
    Instr::some(0x7f, "ld a,a",       1, 1, None),

    Instr::some(0x80, "add a,b",      1, 1, None),
    Instr::some(0x81, "add a,c",      1, 1, None),
    Instr::some(0x82, "add a,d",      1, 1, None),
    Instr::some(0x83, "add a,e",      1, 1, None),
    Instr::some(0x84, "add a,h",      1, 1, None),
    Instr::some(0x85, "add a,l",      1, 1, None),
    Instr::some(0x86, "add a,[hl]",   1, 2, None),
    Instr::some(0x87, "add a,a",      1, 1, None),
    Instr::some(0x88, "adc a,b",      1, 1, None),
    Instr::some(0x89, "adc a,c",      1, 1, None),
    Instr::some(0x8a, "adc a,d",      1, 1, None),
    Instr::some(0x8b, "adc a,e",      1, 1, None),
    Instr::some(0x8c, "adc a,h",      1, 1, None),
    Instr::some(0x8d, "adc a,l",      1, 1, None),
    Instr::some(0x8e, "adc a,[hl]",   1, 2, None),
    Instr::some(0x8f, "adc a,a",      1, 1, None),

    Instr::some(0x90, "sub b",        1, 1, None),
    Instr::some(0x91, "sub c",        1, 1, None),
    Instr::some(0x92, "sub d",        1, 1, None),
    Instr::some(0x93, "sub e",        1, 1, None),
    Instr::some(0x94, "sub h",        1, 1, None),
    Instr::some(0x95, "sub l",        1, 1, None),
    Instr::some(0x96, "sub [hl]",     1, 2, None),
    Instr::some(0x97, "sub a",        1, 1, None),
    Instr::some(0x98, "sbc a,b",      1, 1, None),
    Instr::some(0x99, "sbc a,c",      1, 1, None),
    Instr::some(0x9a, "sbc a,d",      1, 1, None),
    Instr::some(0x9b, "sbc a,e",      1, 1, None),
    Instr::some(0x9c, "sbc a,h",      1, 1, None),
    Instr::some(0x9d, "sbc a,l",      1, 1, None),
    Instr::some(0x9e, "sbc a,[hl]",   1, 2, None),
    Instr::some(0x9f, "sbc a,a",      1, 1, None),

    Instr::some(0xa0, "and b",        1, 1, None),
    Instr::some(0xa1, "and c",        1, 1, None),
    Instr::some(0xa2, "and d",        1, 1, None),
    Instr::some(0xa3, "and e",        1, 1, None),
    Instr::some(0xa4, "and h",        1, 1, None),
    Instr::some(0xa5, "and l",        1, 1, None),
    Instr::some(0xa6, "and [hl]",     1, 2, None),
    Instr::some(0xa7, "and a",        1, 1, None),
    Instr::some(0xa8, "xor b",        1, 1, None),
    Instr::some(0xa9, "xor c",        1, 1, None),
    Instr::some(0xaa, "xor d",        1, 1, None),
    Instr::some(0xab, "xor e",        1, 1, None),
    Instr::some(0xac, "xor h",        1, 1, None),
    Instr::some(0xad, "xor l",        1, 1, None),
    Instr::some(0xae, "xor [hl]",     1, 2, None),
    Instr::some(0xaf, "xor a",        1, 1, None),

    Instr::some(0xb0, "or b",         1, 1, None),
    Instr::some(0xb1, "or c",         1, 1, None),
    Instr::some(0xb2, "or d",         1, 1, None),
    Instr::some(0xb3, "or e",         1, 1, None),
    Instr::some(0xb4, "or h",         1, 1, None),
    Instr::some(0xb5, "or l",         1, 1, None),
    Instr::some(0xb6, "or [hl]",      1, 2, None),
    Instr::some(0xb7, "or a",         1, 1, None),
    Instr::some(0xb8, "cp b",         1, 1, None),
    Instr::some(0xb9, "cp c",         1, 1, None),
    Instr::some(0xba, "cp d",         1, 1, None),
    Instr::some(0xbb, "cp e",         1, 1, None),
    Instr::some(0xbc, "cp h",         1, 1, None),
    Instr::some(0xbd, "cp l",         1, 1, None),
    Instr::some(0xbe, "cp [hl]",      1, 2, None),
    Instr::some(0xbf, "cp a",         1, 1, None),

    Instr::some(0xc0, "ret nz",       1, 2, Some(5)),
    Instr::some(0xc1, "pop bc",       1, 3, None),
    Instr::some(0xc2, "jp nz,n16",    3, 3, Some(4)),
    Instr::some(0xc3, "jp n16",       3, 4, None),
    Instr::some(0xc4, "call nz,n16",  3, 3, Some(6)),
    Instr::some(0xc5, "push bc",      1, 4, None),
    Instr::some(0xc6, "add a,n8",     2, 2, None),
    Instr::some(0xc7, "rst 00h",      1, 4, None),
    Instr::some(0xc8, "ret z",        1, 2, Some(5)),
    Instr::some(0xc9, "ret",          1, 4, None),
    Instr::some(0xca, "jp z,n16",     3, 3, Some(4)),
    Instr::some(0xcb, "prefix cb",    0, 0, None),
    Instr::some(0xcc, "call z,n16",   3, 3, Some(6)),
    Instr::some(0xcd, "call n16",     3, 6, None),
    Instr::some(0xce, "adc a,n8",     2, 2, None),
    Instr::some(0xcf, "rst 08h",      1, 4, None),

    Instr::some(0xd0, "ret nc",       1, 2, Some(5)),
    Instr::some(0xd1, "pop de",       1, 3, None),
    Instr::some(0xd2, "jp nc,n16",    3, 3, Some(4)),
    None,
    Instr::some(0xd4, "call nc,n16",  3, 3, Some(6)),
    Instr::some(0xd5, "push de",      1, 4, None),
    Instr::some(0xd6, "sub n8",       2, 2, None),
    Instr::some(0xd7, "rst 10h",      1, 4, None),
    Instr::some(0xd8, "ret c",        1, 2, Some(5)),
    Instr::some(0xd9, "reti",         1, 4, None),
    Instr::some(0xda, "jp c,n16",     3, 3, Some(4)),
    None,
    Instr::some(0xdc, "call c,n16",   3, 3, Some(6)),
    None,
    Instr::some(0xde, "sbc a,n8",     2, 2, None),
    Instr::some(0xdf, "rst 18h",      1, 4, None),

    Instr::some(0xe0, "ldh [a8],a",   2, 3, None),
    Instr::some(0xe1, "pop hl",       1, 3, None),
    Instr::some(0xe2, "ld [c],a",     1, 2, None),
    None,
    None,
    Instr::some(0xe5, "push hl",      1, 4, None),
    Instr::some(0xe6, "and n8",       2, 2, None),
    Instr::some(0xe7, "rst 20h",      1, 4, None),
    Instr::some(0xe8, "add sp,s8",    2, 4, None),
    Instr::some(0xe9, "jp hl",        1, 1, None),
    Instr::some(0xea, "ld [n16],a",   3, 4, None),
    None,
    None,
    None,
    Instr::some(0xee, "xor n8",       2, 2, None),
    Instr::some(0xef, "rst 28h",      1, 4, None),

    Instr::some(0xf0, "ldh a,[a8]",   2, 3, None),
    Instr::some(0xf1, "pop af",       1, 3, None),
    Instr::some(0xf2, "ld a,[c]",     1, 2, None),
    Instr::some(0xf3, "di",           1, 1, None),
    None,
    Instr::some(0xf5, "push af",      1, 4, None),
    Instr::some(0xf6, "or n8",        2, 2, None),
    Instr::some(0xf7, "rst 30h",      1, 4, None),
    Instr::some(0xf8, "ld hl,sp+s8",  2, 3, None),
    Instr::some(0xf9, "ld sp,hl",     1, 2, None),
    Instr::some(0xfa, "ld a,[n16]",   3, 4, None),
    Instr::some(0xfb, "ei",           1, 1, None),
    None,
    None,
    Instr::some(0xfe, "cp n8",        2, 2, None),
    Instr::some(0xff, "rst 38h",      1, 4, None),
]);

/// Instructions behind the `0xCB` prefix. All of them are valid, two bytes
/// long, and the cycle counts cover both bytes.
pub const PREFIXED_INSTRUCTIONS: OpTable<Instr> = OpTable([
    Instr::new(0x00, "rlc b",         2, 2, None),
    Instr::new(0x01, "rlc c",         2, 2, None),
    Instr::new(0x02, "rlc d",         2, 2, None),
    Instr::new(0x03, "rlc e",         2, 2, None),
    Instr::new(0x04, "rlc h",         2, 2, None),
    Instr::new(0x05, "rlc l",         2, 2, None),
    Instr::new(0x06, "rlc [hl]",      2, 4, None),
    Instr::new(0x07, "rlc a",         2, 2, None),
    Instr::new(0x08, "rrc b",         2, 2, None),
    Instr::new(0x09, "rrc c",         2, 2, None),
    Instr::new(0x0a, "rrc d",         2, 2, None),
    Instr::new(0x0b, "rrc e",         2, 2, None),
    Instr::new(0x0c, "rrc h",         2, 2, None),
    Instr::new(0x0d, "rrc l",         2, 2, None),
    Instr::new(0x0e, "rrc [hl]",      2, 4, None),
    Instr::new(0x0f, "rrc a",         2, 2, None),

    Instr::new(0x10, "rl b",          2, 2, None),
    Instr::new(0x11, "rl c",          2, 2, None),
    Instr::new(0x12, "rl d",          2, 2, None),
    Instr::new(0x13, "rl e",          2, 2, None),
    Instr::new(0x14, "rl h",          2, 2, None),
    Instr::new(0x15, "rl l",          2, 2, None),
    Instr::new(0x16, "rl [hl]",       2, 4, None),
    Instr::new(0x17, "rl a",          2, 2, None),
    Instr::new(0x18, "rr b",          2, 2, None),
    Instr::new(0x19, "rr c",          2, 2, None),
    Instr::new(0x1a, "rr d",          2, 2, None),
    Instr::new(0x1b, "rr e",          2, 2, None),
    Instr::new(0x1c, "rr h",          2, 2, None),
    Instr::new(0x1d, "rr l",          2, 2, None),
    Instr::new(0x1e, "rr [hl]",       2, 4, None),
    Instr::new(0x1f, "rr a",          2, 2, None),

    Instr::new(0x20, "sla b",         2, 2, None),
    Instr::new(0x21, "sla c",         2, 2, None),
    Instr::new(0x22, "sla d",         2, 2, None),
    Instr::new(0x23, "sla e",         2, 2, None),
    Instr::new(0x24, "sla h",         2, 2, None),
    Instr::new(0x25, "sla l",         2, 2, None),
    Instr::new(0x26, "sla [hl]",      2, 4, None),
    Instr::new(0x27, "sla a",         2, 2, None),
    Instr::new(0x28, "sra b",         2, 2, None),
    Instr::new(0x29, "sra c",         2, 2, None),
    Instr::new(0x2a, "sra d",         2, 2, None),
    Instr::new(0x2b, "sra e",         2, 2, None),
    Instr::new(0x2c, "sra h",         2, 2, None),
    Instr::new(0x2d, "sra l",         2, 2, None),
    Instr::new(0x2e, "sra [hl]",      2, 4, None),
    Instr::new(0x2f, "sra a",         2, 2, None),

    Instr::new(0x30, "swap b",        2, 2, None),
    Instr::new(0x31, "swap c",        2, 2, None),
    Instr::new(0x32, "swap d",        2, 2, None),
    Instr::new(0x33, "swap e",        2, 2, None),
    Instr::new(0x34, "swap h",        2, 2, None),
    Instr::new(0x35, "swap l",        2, 2, None),
    Instr::new(0x36, "swap [hl]",     2, 4, None),
    Instr::new(0x37, "swap a",        2, 2, None),
    Instr::new(0x38, "srl b",         2, 2, None),
    Instr::new(0x39, "srl c",         2, 2, None),
    Instr::new(0x3a, "srl d",         2, 2, None),
    Instr::new(0x3b, "srl e",         2, 2, None),
    Instr::new(0x3c, "srl h",         2, 2, None),
    Instr::new(0x3d, "srl l",         2, 2, None),
    Instr::new(0x3e, "srl [hl]",      2, 4, None),
    Instr::new(0x3f, "srl a",         2, 2, None),

    Instr::new(0x40, "bit 0,b",       2, 2, None),
    Instr::new(0x41, "bit 0,c",       2, 2, None),
    Instr::new(0x42, "bit 0,d",       2, 2, None),
    Instr::new(0x43, "bit 0,e",       2, 2, None),
    Instr::new(0x44, "bit 0,h",       2, 2, None),
    Instr::new(0x45, "bit 0,l",       2, 2, None),
    Instr::new(0x46, "bit 0,[hl]",    2, 3, None),
    Instr::new(0x47, "bit 0,a",       2, 2, None),
    Instr::new(0x48, "bit 1,b",       2, 2, None),
    Instr::new(0x49, "bit 1,c",       2, 2, None),
    Instr::new(0x4a, "bit 1,d",       2, 2, None),
    Instr::new(0x4b, "bit 1,e",       2, 2, None),
    Instr::new(0x4c, "bit 1,h",       2, 2, None),
    Instr::new(0x4d, "bit 1,l",       2, 2, None),
    Instr::new(0x4e, "bit 1,[hl]",    2, 3, None),
    Instr::new(0x4f, "bit 1,a",       2, 2, None),

    Instr::new(0x50, "bit 2,b",       2, 2, None),
    Instr::new(0x51, "bit 2,c",       2, 2, None),
    Instr::new(0x52, "bit 2,d",       2, 2, None),
    Instr::new(0x53, "bit 2,e",       2, 2, None),
    Instr::new(0x54, "bit 2,h",       2, 2, None),
    Instr::new(0x55, "bit 2,l",       2, 2, None),
    Instr::new(0x56, "bit 2,[hl]",    2, 3, None),
    Instr::new(0x57, "bit 2,a",       2, 2, None),
    Instr::new(0x58, "bit 3,b",       2, 2, None),
    Instr::new(0x59, "bit 3,c",       2, 2, None),
    Instr::new(0x5a, "bit 3,d",       2, 2, None),
    Instr::new(0x5b, "bit 3,e",       2, 2, None),
    Instr::new(0x5c, "bit 3,h",       2, 2, None),
    Instr::new(0x5d, "bit 3,l",       2, 2, None),
    Instr::new(0x5e, "bit 3,[hl]",    2, 3, None),
    Instr::new(0x5f, "bit 3,a",       2, 2, None),

    Instr::new(0x60, "bit 4,b",       2, 2, None),
    Instr::new(0x61, "bit 4,c",       2, 2, None),
    Instr::new(0x62, "bit 4,d",       2, 2, None),
    Instr::new(0x63, "bit 4,e",       2, 2, None),
    Instr::new(0x64, "bit 4,h",       2, 2, None),
    Instr::new(0x65, "bit 4,l",       2, 2, None),
    Instr::new(0x66, "bit 4,[hl]",    2, 3, None),
    Instr::new(0x67, "bit 4,a",       2, 2, None),
    Instr::new(0x68, "bit 5,b",       2, 2, None),
    Instr::new(0x69, "bit 5,c",       2, 2, None),
    Instr::new(0x6a, "bit 5,d",       2, 2, None),
    Instr::new(0x6b, "bit 5,e",       2, 2, None),
    Instr::new(0x6c, "bit 5,h",       2, 2, None),
    Instr::new(0x6d, "bit 5,l",       2, 2, None),
    Instr::new(0x6e, "bit 5,[hl]",    2, 3, None),
    Instr::new(0x6f, "bit 5,a",       2, 2, None),

    Instr::new(0x70, "bit 6,b",       2, 2, None),
    Instr::new(0x71, "bit 6,c",       2, 2, None),
    Instr::new(0x72, "bit 6,d",       2, 2, None),
    Instr::new(0x73, "bit 6,e",       2, 2, None),
    Instr::new(0x74, "bit 6,h",       2, 2, None),
    Instr::new(0x75, "bit 6,l",       2, 2, None),
    Instr::new(0x76, "bit 6,[hl]",    2, 3, None),
    Instr::new(0x77, "bit 6,a",       2, 2, None),
    Instr::new(0x78, "bit 7,b",       2, 2, None),
    Instr::new(0x79, "bit 7,c",       2, 2, None),
    Instr::new(0x7a, "bit 7,d",       2, 2, None),
    Instr::new(0x7b, "bit 7,e",       2, 2, None),
    Instr::new(0x7c, "bit 7,h",       2, 2, None),
    Instr::new(0x7d, "bit 7,l",       2, 2, None),
    Instr::new(0x7e, "bit 7,[hl]",    2, 3, None),
    Instr::new(0x7f, "bit 7,a",       2, 2, None),

    Instr::new(0x80, "res 0,b",       2, 2, None),
    Instr::new(0x81, "res 0,c",       2, 2, None),
    Instr::new(0x82, "res 0,d",       2, 2, None),
    Instr::new(0x83, "res 0,e",       2, 2, None),
    Instr::new(0x84, "res 0,h",       2, 2, None),
    Instr::new(0x85, "res 0,l",       2, 2, None),
    Instr::new(0x86, "res 0,[hl]",    2, 4, None),
    Instr::new(0x87, "res 0,a",       2, 2, None),
    Instr::new(0x88, "res 1,b",       2, 2, None),
    Instr::new(0x89, "res 1,c",       2, 2, None),
    Instr::new(0x8a, "res 1,d",       2, 2, None),
    Instr::new(0x8b, "res 1,e",       2, 2, None),
    Instr::new(0x8c, "res 1,h",       2, 2, None),
    Instr::new(0x8d, "res 1,l",       2, 2, None),
    Instr::new(0x8e, "res 1,[hl]",    2, 4, None),
    Instr::new(0x8f, "res 1,a",       2, 2, None),

    Instr::new(0x90, "res 2,b",       2, 2, None),
    Instr::new(0x91, "res 2,c",       2, 2, None),
    Instr::new(0x92, "res 2,d",       2, 2, None),
    Instr::new(0x93, "res 2,e",       2, 2, None),
    Instr::new(0x94, "res 2,h",       2, 2, None),
    Instr::new(0x95, "res 2,l",       2, 2, None),
    Instr::new(0x96, "res 2,[hl]",    2, 4, None),
    Instr::new(0x97, "res 2,a",       2, 2, None),
    Instr::new(0x98, "res 3,b",       2, 2, None),
    Instr::new(0x99, "res 3,c",       2, 2, None),
    Instr::new(0x9a, "res 3,d",       2, 2, None),
    Instr::new(0x9b, "res 3,e",       2, 2, None),
    Instr::new(0x9c, "res 3,h",       2, 2, None),
    Instr::new(0x9d, "res 3,l",       2, 2, None),
    Instr::new(0x9e, "res 3,[hl]",    2, 4, None),
    Instr::new(0x9f, "res 3,a",       2, 2, None),

    Instr::new(0xa0, "res 4,b",       2, 2, None),
    Instr::new(0xa1, "res 4,c",       2, 2, None),
    Instr::new(0xa2, "res 4,d",       2, 2, None),
    Instr::new(0xa3, "res 4,e",       2, 2, None),
    Instr::new(0xa4, "res 4,h",       2, 2, None),
    Instr::new(0xa5, "res 4,l",       2, 2, None),
    Instr::new(0xa6, "res 4,[hl]",    2, 4, None),
    Instr::new(0xa7, "res 4,a",       2, 2, None),
    Instr::new(0xa8, "res 5,b",       2, 2, None),
    Instr::new(0xa9, "res 5,c",       2, 2, None),
    Instr::new(0xaa, "res 5,d",       2, 2, None),
    Instr::new(0xab, "res 5,e",       2, 2, None),
    Instr::new(0xac, "res 5,h",       2, 2, None),
    Instr::new(0xad, "res 5,l",       2, 2, None),
    Instr::new(0xae, "res 5,[hl]",    2, 4, None),
    Instr::new(0xaf, "res 5,a",       2, 2, None),

    Instr::new(0xb0, "res 6,b",       2, 2, None),
    Instr::new(0xb1, "res 6,c",       2, 2, None),
    Instr::new(0xb2, "res 6,d",       2, 2, None),
    Instr::new(0xb3, "res 6,e",       2, 2, None),
    Instr::new(0xb4, "res 6,h",       2, 2, None),
    Instr::new(0xb5, "res 6,l",       2, 2, None),
    Instr::new(0xb6, "res 6,[hl]",    2, 4, None),
    Instr::new(0xb7, "res 6,a",       2, 2, None),
    Instr::new(0xb8, "res 7,b",       2, 2, None),
    Instr::new(0xb9, "res 7,c",       2, 2, None),
    Instr::new(0xba, "res 7,d",       2, 2, None),
    Instr::new(0xbb, "res 7,e",       2, 2, None),
    Instr::new(0xbc, "res 7,h",       2, 2, None),
    Instr::new(0xbd, "res 7,l",       2, 2, None),
    Instr::new(0xbe, "res 7,[hl]",    2, 4, None),
    Instr::new(0xbf, "res 7,a",       2, 2, None),

    Instr::new(0xc0, "set 0,b",       2, 2, None),
    Instr::new(0xc1, "set 0,c",       2, 2, None),
    Instr::new(0xc2, "set 0,d",       2, 2, None),
    Instr::new(0xc3, "set 0,e",       2, 2, None),
    Instr::new(0xc4, "set 0,h",       2, 2, None),
    Instr::new(0xc5, "set 0,l",       2, 2, None),
    Instr::new(0xc6, "set 0,[hl]",    2, 4, None),
    Instr::new(0xc7, "set 0,a",       2, 2, None),
    Instr::new(0xc8, "set 1,b",       2, 2, None),
    Instr::new(0xc9, "set 1,c",       2, 2, None),
    Instr::new(0xca, "set 1,d",       2, 2, None),
    Instr::new(0xcb, "set 1,e",       2, 2, None),
    Instr::new(0xcc, "set 1,h",       2, 2, None),
    Instr::new(0xcd, "set 1,l",       2, 2, None),
    Instr::new(0xce, "set 1,[hl]",    2, 4, None),
    Instr::new(0xcf, "set 1,a",       2, 2, None),

    Instr::new(0xd0, "set 2,b",       2, 2, None),
    Instr::new(0xd1, "set 2,c",       2, 2, None),
    Instr::new(0xd2, "set 2,d",       2, 2, None),
    Instr::new(0xd3, "set 2,e",       2, 2, None),
    Instr::new(0xd4, "set 2,h",       2, 2, None),
    Instr::new(0xd5, "set 2,l",       2, 2, None),
    Instr::new(0xd6, "set 2,[hl]",    2, 4, None),
    Instr::new(0xd7, "set 2,a",       2, 2, None),
    Instr::new(0xd8, "set 3,b",       2, 2, None),
    Instr::new(0xd9, "set 3,c",       2, 2, None),
    Instr::new(0xda, "set 3,d",       2, 2, None),
    Instr::new(0xdb, "set 3,e",       2, 2, None),
    Instr::new(0xdc, "set 3,h",       2, 2, None),
    Instr::new(0xdd, "set 3,l",       2, 2, None),
    Instr::new(0xde, "set 3,[hl]",    2, 4, None),
    Instr::new(0xdf, "set 3,a",       2, 2, None),

    Instr::new(0xe0, "set 4,b",       2, 2, None),
    Instr::new(0xe1, "set 4,c",       2, 2, None),
    Instr::new(0xe2, "set 4,d",       2, 2, None),
    Instr::new(0xe3, "set 4,e",       2, 2, None),
    Instr::new(0xe4, "set 4,h",       2, 2, None),
    Instr::new(0xe5, "set 4,l",       2, 2, None),
    Instr::new(0xe6, "set 4,[hl]",    2, 4, None),
    Instr::new(0xe7, "set 4,a",       2, 2, None),
    Instr::new(0xe8, "set 5,b",       2, 2, None),
    Instr::new(0xe9, "set 5,c",       2, 2, None),
    Instr::new(0xea, "set 5,d",       2, 2, None),
    Instr::new(0xeb, "set 5,e",       2, 2, None),
    Instr::new(0xec, "set 5,h",       2, 2, None),
    Instr::new(0xed, "set 5,l",       2, 2, None),
    Instr::new(0xee, "set 5,[hl]",    2, 4, None),
    Instr::new(0xef, "set 5,a",       2, 2, None),

    Instr::new(0xf0, "set 6,b",       2, 2, None),
    Instr::new(0xf1, "set 6,c",       2, 2, None),
    Instr::new(0xf2, "set 6,d",       2, 2, None),
    Instr::new(0xf3, "set 6,e",       2, 2, None),
    Instr::new(0xf4, "set 6,h",       2, 2, None),
    Instr::new(0xf5, "set 6,l",       2, 2, None),
    Instr::new(0xf6, "set 6,[hl]",    2, 4, None),
    Instr::new(0xf7, "set 6,a",       2, 2, None),
    Instr::new(0xf8, "set 7,b",       2, 2, None),
    Instr::new(0xf9, "set 7,c",       2, 2, None),
    Instr::new(0xfa, "set 7,d",       2, 2, None),
    Instr::new(0xfb, "set 7,e",       2, 2, None),
    Instr::new(0xfc, "set 7,h",       2, 2, None),
    Instr::new(0xfd, "set 7,l",       2, 2, None),
    Instr::new(0xfe, "set 7,[hl]",    2, 4, None),
    Instr::new(0xff, "set 7,a",       2, 2, None),
]);


#[cfg(test)]
mod test {
    use super::*;


    #[test]
    fn test_tables_are_consistent() {
        for idx in 0..=255u8 {
            if let Some(instr) = INSTRUCTIONS[Byte::new(idx)] {
                assert_eq!(instr.opcode, idx);
            }
            assert_eq!(PREFIXED_INSTRUCTIONS[Byte::new(idx)].opcode, idx);
            assert_eq!(PREFIXED_INSTRUCTIONS[Byte::new(idx)].len, 2);
        }
    }

    #[test]
    fn test_mnemonic_lookup() {
        assert_eq!(mnemonic(0x00), Some("nop"));
        assert_eq!(mnemonic(0x22), Some("ldi [hl],a"));
        assert_eq!(mnemonic(0xd3), None);
        assert_eq!(mnemonic(0xcb37), Some("swap a"));
        assert_eq!(mnemonic(0xab12), None);
    }

    #[test]
    fn test_operand_count() {
        assert_eq!(operand_count(0x00), 0);
        assert_eq!(operand_count(0x3e), 1);
        assert_eq!(operand_count(0xc3), 2);
        assert_eq!(operand_count(0xd3), 0);
        assert_eq!(operand_count(0xcb7c), 0);
    }
}
