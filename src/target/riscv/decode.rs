use std::fmt;

use num_enum::TryFromPrimitive;
use strum_macros::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

use crate::utils::{extract_bits, sign_extend, to_signed};

#[derive(Debug, Copy, Clone, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum Opcode {
    R = 0b0110011,
    I = 0b0010011,
    Load = 0b0000011,
    Jalr = 0b1100111,
    U = 0b0110111,
    S = 0b0100011,
    Sb = 0b1100011,
    Uj = 0b1101111,
}

/// Instruction format tag.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Kind {
    R,
    I,
    Load,
    Jalr,
    S,
    Sb,
    U,
    Uj,
    Invalid,
}

impl Kind {
    pub fn of(opcode: u8) -> Self {
        match Opcode::try_from(opcode) {
            Ok(Opcode::R) => Kind::R,
            Ok(Opcode::I) => Kind::I,
            Ok(Opcode::Load) => Kind::Load,
            Ok(Opcode::Jalr) => Kind::Jalr,
            Ok(Opcode::U) => Kind::U,
            Ok(Opcode::S) => Kind::S,
            Ok(Opcode::Sb) => Kind::Sb,
            Ok(Opcode::Uj) => Kind::Uj,
            Err(_) => Kind::Invalid,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display, IntoStaticStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Mnemonic {
    Add,
    Sub,
    Xor,
    Or,
    And,
    Sll,
    Srl,
    Sra,
    Slt,
    Sltu,

    Addi,
    Xori,
    Ori,
    Andi,
    Slti,
    Sltiu,

    Lb,
    Lh,
    Lw,
    Lbu,
    Lhu,

    Jalr,

    Sb,
    Sh,
    Sw,

    Beq,
    Bne,
    Blt,
    Bltu,
    Bge,
    Bgeu,

    Lui,
    Jal,
}

impl Mnemonic {
    /// Access width in bits of a load or store.
    pub fn width(self) -> Option<u32> {
        match self {
            Mnemonic::Lb | Mnemonic::Lbu | Mnemonic::Sb => Some(8),
            Mnemonic::Lh | Mnemonic::Lhu | Mnemonic::Sh => Some(16),
            Mnemonic::Lw | Mnemonic::Sw => Some(32),
            _ => None,
        }
    }

    pub fn is_load(self) -> bool {
        matches!(
            self,
            Mnemonic::Lb | Mnemonic::Lh | Mnemonic::Lw | Mnemonic::Lbu | Mnemonic::Lhu
        )
    }

    pub fn is_store(self) -> bool {
        matches!(self, Mnemonic::Sb | Mnemonic::Sh | Mnemonic::Sw)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ArgsR {
    pub rd: u8,
    pub func3: u8,
    pub rs1: u8,
    pub rs2: u8,
    pub func7: u8,
}

/// Arithmetic-immediate, load and `jalr` operands.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ArgsI {
    pub rd: u8,
    pub func3: u8,
    pub rs1: u8,
    pub imm: u32,
    pub imm_signed: i32,
}

/// Store and branch operands.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ArgsS {
    pub func3: u8,
    pub rs1: u8,
    pub rs2: u8,
    pub imm: u32,
    pub imm_signed: i32,
}

/// `lui` and `jal` operands.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ArgsU {
    pub rd: u8,
    pub imm: u32,
    pub imm_signed: i32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Args {
    R(ArgsR),
    I(ArgsI),
    Load(ArgsI),
    Jalr(ArgsI),
    S(ArgsS),
    Sb(ArgsS),
    U(ArgsU),
    Uj(ArgsU),
}

impl Args {
    pub fn kind(&self) -> Kind {
        match self {
            Args::R(_) => Kind::R,
            Args::I(_) => Kind::I,
            Args::Load(_) => Kind::Load,
            Args::Jalr(_) => Kind::Jalr,
            Args::S(_) => Kind::S,
            Args::Sb(_) => Kind::Sb,
            Args::U(_) => Kind::U,
            Args::Uj(_) => Kind::Uj,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Insn {
    pub raw: u32,
    pub opcode: u8,
    pub mnemonic: Mnemonic,
    pub args: Args,
}

#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown opcode {opcode:#09b} in {word:#010x}")]
    UnknownOpcode { word: u32, opcode: u8 },
    #[error("no instruction for func3={func3:#05b} func7={func7:#09b} in {word:#010x}")]
    UnknownFunction { word: u32, func3: u8, func7: u8 },
}

fn rd(insn: u32) -> u8 {
    extract_bits(insn, 11, 7) as u8
}

fn func3(insn: u32) -> u8 {
    extract_bits(insn, 14, 12) as u8
}

fn rs1(insn: u32) -> u8 {
    extract_bits(insn, 19, 15) as u8
}

fn rs2(insn: u32) -> u8 {
    extract_bits(insn, 24, 20) as u8
}

fn func7(insn: u32) -> u8 {
    extract_bits(insn, 31, 25) as u8
}

fn args_r(insn: u32) -> ArgsR {
    ArgsR {
        rd: rd(insn),
        func3: func3(insn),
        rs1: rs1(insn),
        rs2: rs2(insn),
        func7: func7(insn),
    }
}

fn args_i(insn: u32) -> ArgsI {
    let imm = extract_bits(insn, 31, 20);
    ArgsI {
        rd: rd(insn),
        func3: func3(insn),
        rs1: rs1(insn),
        imm,
        imm_signed: sign_extend(imm, 12),
    }
}

fn args_s(insn: u32) -> ArgsS {
    let imm = extract_bits(insn, 11, 7) | extract_bits(insn, 31, 25) << 5;
    ArgsS {
        func3: func3(insn),
        rs1: rs1(insn),
        rs2: rs2(insn),
        imm,
        imm_signed: sign_extend(to_signed(imm, 12) as u32, 12),
    }
}

fn args_sb(insn: u32) -> ArgsS {
    let imm = extract_bits(insn, 7, 7) << 11
        | extract_bits(insn, 11, 8) << 1
        | extract_bits(insn, 30, 25) << 5
        | extract_bits(insn, 31, 31) << 12;
    ArgsS {
        func3: func3(insn),
        rs1: rs1(insn),
        rs2: rs2(insn),
        imm,
        imm_signed: sign_extend(to_signed(imm, 13) as u32, 13),
    }
}

fn args_u(insn: u32) -> ArgsU {
    let imm = extract_bits(insn, 31, 12) << 12;
    ArgsU {
        rd: rd(insn),
        imm,
        imm_signed: sign_extend(imm, 32),
    }
}

fn args_uj(insn: u32) -> ArgsU {
    let imm = extract_bits(insn, 19, 12) << 12
        | extract_bits(insn, 20, 20) << 11
        | extract_bits(insn, 30, 21) << 1
        | extract_bits(insn, 31, 31) << 20;
    ArgsU {
        rd: rd(insn),
        imm,
        imm_signed: sign_extend(imm, 21),
    }
}

/// Decodes a single instruction word.
pub fn decode(insn: u32) -> Result<Insn, DecodeError> {
    let opcode = extract_bits(insn, 6, 0) as u8;

    let f3 = func3(insn);
    let f7 = func7(insn);
    let unknown = DecodeError::UnknownFunction {
        word: insn,
        func3: f3,
        func7: f7,
    };

    use Mnemonic::*;

    let (mnemonic, args) = match Kind::of(opcode) {
        Kind::Invalid => return Err(DecodeError::UnknownOpcode { word: insn, opcode }),
        Kind::R => {
            let mnemonic = match (f3, f7) {
                (0b000, 0b0000000) => Add,
                (0b000, 0b0100000) => Sub,
                (0b100, _) => Xor,
                (0b110, _) => Or,
                (0b111, _) => And,
                (0b001, _) => Sll,
                (0b101, 0b0000000) => Srl,
                (0b101, 0b0100000) => Sra,
                (0b010, _) => Slt,
                (0b011, _) => Sltu,
                _ => return Err(unknown),
            };
            (mnemonic, Args::R(args_r(insn)))
        }
        Kind::I => {
            let mnemonic = match f3 {
                0b000 => Addi,
                0b100 => Xori,
                0b110 => Ori,
                0b111 => Andi,
                0b010 => Slti,
                0b011 => Sltiu,
                _ => return Err(unknown),
            };
            (mnemonic, Args::I(args_i(insn)))
        }
        Kind::Load => {
            let mnemonic = match f3 {
                0b000 => Lb,
                0b001 => Lh,
                0b010 => Lw,
                0b100 => Lbu,
                0b101 => Lhu,
                _ => return Err(unknown),
            };
            (mnemonic, Args::Load(args_i(insn)))
        }
        Kind::Jalr => match f3 {
            0b000 => (Jalr, Args::Jalr(args_i(insn))),
            _ => return Err(unknown),
        },
        Kind::S => {
            let mnemonic = match f3 {
                0b000 => Sb,
                0b001 => Sh,
                0b010 => Sw,
                _ => return Err(unknown),
            };
            (mnemonic, Args::S(args_s(insn)))
        }
        Kind::Sb => {
            let mnemonic = match f3 {
                0b000 => Beq,
                0b001 => Bne,
                0b100 => Blt,
                0b110 => Bltu,
                0b101 => Bge,
                0b111 => Bgeu,
                _ => return Err(unknown),
            };
            (mnemonic, Args::Sb(args_sb(insn)))
        }
        Kind::U => (Lui, Args::U(args_u(insn))),
        Kind::Uj => (Jal, Args::Uj(args_uj(insn))),
    };

    Ok(Insn {
        raw: insn,
        opcode,
        mnemonic,
        args,
    })
}

impl fmt::Display for Insn {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let name = self.mnemonic;
        match self.args {
            Args::R(r) => write!(fmt, "{name}\tx{}, x{}, x{}", r.rd, r.rs1, r.rs2),
            Args::I(i) => write!(fmt, "{name}\tx{}, x{}, {}", i.rd, i.rs1, i.imm_signed),
            Args::Load(i) | Args::Jalr(i) => {
                write!(fmt, "{name}\tx{}, {}(x{})", i.rd, i.imm_signed, i.rs1)
            }
            Args::S(s) => write!(fmt, "{name}\tx{}, {}(x{})", s.rs2, s.imm_signed, s.rs1),
            Args::Sb(b) => write!(fmt, "{name}\tx{}, x{}, {}", b.rs1, b.rs2, b.imm_signed),
            Args::U(u) => write!(fmt, "{name}\tx{}, {:#x}", u.rd, u.imm >> 12),
            Args::Uj(j) => write!(fmt, "{name}\tx{}, {}", j.rd, j.imm_signed),
        }
    }
}
