use serde::{Deserialize, Serialize};

use crate::error::DecodeFault;

pub const IMMEDIATE_BIT: u8 = 0b1_00_0_0_000;
const CLASS_MASK: u8 = 0b0_11_0_0_000;

/// Operation class held in bits 6..5 of the opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpClass {
    Arithmetic,
    Logic,
    LoadStore,
    Branch,
}

/// Operand layout of an instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    /// dest, src, src
    Dss,
    /// dest, src, imm8
    Dsi,
    /// dest, src (16-bit field)
    Ds,
    /// dest, imm16
    Di,
    /// imm24
    I,
}

impl Shape {
    /// Bit widths of the operand fields following the opcode byte.
    /// Unused trailing fields are zero.
    pub const fn field_widths(self) -> (u32, u32, u32) {
        match self {
            Shape::Dss | Shape::Dsi => (8, 8, 8),
            Shape::Ds | Shape::Di => (8, 16, 0),
            Shape::I => (24, 0, 0),
        }
    }

    pub const fn operand_count(self) -> usize {
        match self {
            Shape::Dss | Shape::Dsi => 3,
            Shape::Ds | Shape::Di => 2,
            Shape::I => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Shape::Dss => "DSS",
            Shape::Dsi => "DSI",
            Shape::Ds => "DS",
            Shape::Di => "DI",
            Shape::I => "I",
        }
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0x00,
    // arithmetic
    Add = 0x01,
    Mul = 0x02,
    Mulh = 0x03,
    Div = 0x04,
    Rem = 0x05,
    // logic
    And = 0x20,
    Or = 0x21,
    Not = 0x22,
    Xor = 0x23,
    // logic / shift
    Sll = 0x30,
    Srl = 0x31,
    Sra = 0x32,
    // logic / set
    Slt = 0x38,
    Slts = 0x39,
    Seqz = 0x3A,
    // immediate counterparts
    Addi = 0x81,
    Andi = 0xA0,
    Ori = 0xA1,
    Xori = 0xA3,
    Slli = 0xB0,
    Srli = 0xB1,
    Srai = 0xB2,
    Slti = 0xB8,
    Sltsi = 0xB9,
    // store
    Sb = 0xC0,
    Sh = 0xC1,
    Sw = 0xC2,
    // load
    Lb = 0xD0,
    Lh = 0xD1,
    Lw = 0xD2,
    Lui = 0xD3,
    Lli = 0xD4,
    // branch
    Beq = 0xE0,
    Bneq = 0xE1,
    Blt = 0xE2,
    Ble = 0xE3,
    Blts = 0xE4,
    Bltes = 0xE5,
    // jump
    Jalr = 0xF0,
    Jal = 0xF1,
    J = 0xF2,
}

static BY_BYTE: [Option<Opcode>; 256] = {
    let mut table = [None; 256];
    let mut i = 0;
    while i < Opcode::ALL.len() {
        table[Opcode::ALL[i] as usize] = Some(Opcode::ALL[i]);
        i += 1;
    }
    table
};

impl Opcode {
    pub const ALL: [Opcode; 42] = [
        Opcode::Nop,
        Opcode::Add,
        Opcode::Mul,
        Opcode::Mulh,
        Opcode::Div,
        Opcode::Rem,
        Opcode::And,
        Opcode::Or,
        Opcode::Not,
        Opcode::Xor,
        Opcode::Sll,
        Opcode::Srl,
        Opcode::Sra,
        Opcode::Slt,
        Opcode::Slts,
        Opcode::Seqz,
        Opcode::Addi,
        Opcode::Andi,
        Opcode::Ori,
        Opcode::Xori,
        Opcode::Slli,
        Opcode::Srli,
        Opcode::Srai,
        Opcode::Slti,
        Opcode::Sltsi,
        Opcode::Sb,
        Opcode::Sh,
        Opcode::Sw,
        Opcode::Lb,
        Opcode::Lh,
        Opcode::Lw,
        Opcode::Lui,
        Opcode::Lli,
        Opcode::Beq,
        Opcode::Bneq,
        Opcode::Blt,
        Opcode::Ble,
        Opcode::Blts,
        Opcode::Bltes,
        Opcode::Jalr,
        Opcode::Jal,
        Opcode::J,
    ];

    pub fn from_byte(byte: u8) -> Option<Opcode> {
        BY_BYTE[byte as usize]
    }

    /// Case-insensitive mnemonic lookup.
    pub fn from_name(name: &str) -> Option<Opcode> {
        Opcode::ALL
            .iter()
            .copied()
            .find(|op| op.name().eq_ignore_ascii_case(name))
    }

    pub const fn byte(self) -> u8 {
        self as u8
    }

    pub const fn is_immediate(self) -> bool {
        self as u8 & IMMEDIATE_BIT != 0
    }

    pub const fn class(self) -> OpClass {
        match (self as u8 & CLASS_MASK) >> 5 {
            0 => OpClass::Arithmetic,
            1 => OpClass::Logic,
            2 => OpClass::LoadStore,
            _ => OpClass::Branch,
        }
    }

    /// Shape follows the immediate bit, except for SEQZ, JAL/LUI/LLI and J.
    pub const fn shape(self) -> Shape {
        match self {
            Opcode::Seqz => Shape::Ds,
            Opcode::Jal | Opcode::Lui | Opcode::Lli => Shape::Di,
            Opcode::J => Shape::I,
            _ if self.is_immediate() => Shape::Dsi,
            _ => Shape::Dss,
        }
    }

    /// Canonical (upper-case) mnemonic.
    pub const fn name(self) -> &'static str {
        match self {
            Opcode::Nop => "NOP",
            Opcode::Add => "ADD",
            Opcode::Mul => "MUL",
            Opcode::Mulh => "MULH",
            Opcode::Div => "DIV",
            Opcode::Rem => "REM",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Not => "NOT",
            Opcode::Xor => "XOR",
            Opcode::Sll => "SLL",
            Opcode::Srl => "SRL",
            Opcode::Sra => "SRA",
            Opcode::Slt => "SLT",
            Opcode::Slts => "SLTS",
            Opcode::Seqz => "SEQZ",
            Opcode::Addi => "ADDI",
            Opcode::Andi => "ANDI",
            Opcode::Ori => "ORI",
            Opcode::Xori => "XORI",
            Opcode::Slli => "SLLI",
            Opcode::Srli => "SRLI",
            Opcode::Srai => "SRAI",
            Opcode::Slti => "SLTI",
            Opcode::Sltsi => "SLTSI",
            Opcode::Sb => "SB",
            Opcode::Sh => "SH",
            Opcode::Sw => "SW",
            Opcode::Lb => "LB",
            Opcode::Lh => "LH",
            Opcode::Lw => "LW",
            Opcode::Lui => "LUI",
            Opcode::Lli => "LLI",
            Opcode::Beq => "BEQ",
            Opcode::Bneq => "BNEQ",
            Opcode::Blt => "BLT",
            Opcode::Ble => "BLE",
            Opcode::Blts => "BLTS",
            Opcode::Bltes => "BLTES",
            Opcode::Jalr => "JALR",
            Opcode::Jal => "JAL",
            Opcode::J => "J",
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Shape of a raw opcode byte; unassigned bytes are rejected.
pub fn classify(byte: u8) -> Result<Shape, DecodeFault> {
    Opcode::from_byte(byte)
        .map(Opcode::shape)
        .ok_or(DecodeFault::UnknownOpcode(byte))
}

pub const REGISTER_COUNT: usize = 32;

static REGISTER_NAMES: [&str; REGISTER_COUNT] = [
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "r13",
    "r14", "r15", "r16", "r17", "r18", "r19", "r20", "r21", "r22", "r23", "r24", "r25", "r26",
    "r27", "r28", "r29", "r30", "r31",
];

pub fn register_name(index: u32) -> Option<&'static str> {
    REGISTER_NAMES.get(index as usize).copied()
}

/// Parses `r0`..`r31`, case-insensitive.
pub fn parse_register(s: &str) -> Option<u8> {
    let digits = s.strip_prefix(['r', 'R'])?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // reject "r01" so every register has one spelling
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    let n: u32 = digits.parse().ok()?;
    (n < REGISTER_COUNT as u32).then_some(n as u8)
}

/// `rN` with any N, used to tell an out-of-range register from a label.
pub(crate) fn looks_like_register(s: &str) -> bool {
    s.strip_prefix(['r', 'R'])
        .is_some_and(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
}
