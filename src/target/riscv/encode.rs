//! Instruction word builders, the inverse of [`decode`](super::decode).

use crate::utils::{deposit, extract_bits, sign_extend};

use super::decode::Opcode;

pub fn r_type(rd: u8, func3: u8, rs1: u8, rs2: u8, func7: u8) -> u32 {
    let mut insn = Opcode::R as u32;
    insn = deposit(insn, 7, 5, rd);
    insn = deposit(insn, 12, 3, func3);
    insn = deposit(insn, 15, 5, rs1);
    insn = deposit(insn, 20, 5, rs2);
    deposit(insn, 25, 7, func7)
}

pub fn i_type(opcode: Opcode, rd: u8, func3: u8, rs1: u8, imm: i32) -> u32 {
    let mut insn = opcode as u32;
    insn = deposit(insn, 7, 5, rd);
    insn = deposit(insn, 12, 3, func3);
    insn = deposit(insn, 15, 5, rs1);
    deposit(insn, 20, 12, imm as u32)
}

pub fn s_type(func3: u8, rs1: u8, rs2: u8, imm: i32) -> u32 {
    let imm = imm as u32;
    let mut insn = Opcode::S as u32;
    insn = deposit(insn, 7, 5, extract_bits(imm, 4, 0));
    insn = deposit(insn, 12, 3, func3);
    insn = deposit(insn, 15, 5, rs1);
    insn = deposit(insn, 20, 5, rs2);
    deposit(insn, 25, 7, extract_bits(imm, 11, 5))
}

/// `imm` is a byte offset; bit 0 is dropped.
pub fn sb_type(func3: u8, rs1: u8, rs2: u8, imm: i32) -> u32 {
    let imm = imm as u32;
    let mut insn = Opcode::Sb as u32;
    insn = deposit(insn, 7, 1, extract_bits(imm, 11, 11));
    insn = deposit(insn, 8, 4, extract_bits(imm, 4, 1));
    insn = deposit(insn, 12, 3, func3);
    insn = deposit(insn, 15, 5, rs1);
    insn = deposit(insn, 20, 5, rs2);
    insn = deposit(insn, 25, 6, extract_bits(imm, 10, 5));
    deposit(insn, 31, 1, extract_bits(imm, 12, 12))
}

/// `imm` is the 20-bit value placed in bits 31:12.
pub fn u_type(rd: u8, imm: u32) -> u32 {
    let insn = deposit(Opcode::U as u32, 7, 5, rd);
    deposit(insn, 12, 20, imm)
}

/// `imm` is a byte offset; bit 0 is dropped.
pub fn uj_type(rd: u8, imm: i32) -> u32 {
    let imm = imm as u32;
    let mut insn = deposit(Opcode::Uj as u32, 7, 5, rd);
    insn = deposit(insn, 12, 8, extract_bits(imm, 19, 12));
    insn = deposit(insn, 20, 1, extract_bits(imm, 11, 11));
    insn = deposit(insn, 21, 10, extract_bits(imm, 10, 1));
    deposit(insn, 31, 1, extract_bits(imm, 20, 20))
}

macro_rules! insn_r {
    ($($name:ident = $func3:expr, $func7:expr);+ $(;)?) => (
        $(pub fn $name(rd: u8, rs1: u8, rs2: u8) -> u32 {
            r_type(rd, $func3, rs1, rs2, $func7)
        })+
    );
}

macro_rules! insn_i {
    ($($name:ident = $opcode:ident, $func3:expr);+ $(;)?) => (
        $(pub fn $name(rd: u8, rs1: u8, imm: i32) -> u32 {
            i_type(Opcode::$opcode, rd, $func3, rs1, imm)
        })+
    );
}

macro_rules! insn_s {
    ($($name:ident = $func3:expr);+ $(;)?) => (
        $(pub fn $name(rs2: u8, rs1: u8, imm: i32) -> u32 {
            s_type($func3, rs1, rs2, imm)
        })+
    );
}

macro_rules! insn_sb {
    ($($name:ident = $func3:expr);+ $(;)?) => (
        $(pub fn $name(rs1: u8, rs2: u8, imm: i32) -> u32 {
            sb_type($func3, rs1, rs2, imm)
        })+
    );
}

#[rustfmt::skip]
insn_r! {
    add     = 0b000, 0b0000000;
    sub     = 0b000, 0b0100000;
    xor     = 0b100, 0b0000000;
    or      = 0b110, 0b0000000;
    and     = 0b111, 0b0000000;
    sll     = 0b001, 0b0000000;
    srl     = 0b101, 0b0000000;
    sra     = 0b101, 0b0100000;
    slt     = 0b010, 0b0000000;
    sltu    = 0b011, 0b0000000;
}

#[rustfmt::skip]
insn_i! {
    addi    = I, 0b000;
    xori    = I, 0b100;
    ori     = I, 0b110;
    andi    = I, 0b111;
    slti    = I, 0b010;
    sltiu   = I, 0b011;

    lb      = Load, 0b000;
    lh      = Load, 0b001;
    lw      = Load, 0b010;
    lbu     = Load, 0b100;
    lhu     = Load, 0b101;

    jalr    = Jalr, 0b000;
}

#[rustfmt::skip]
insn_s! {
    sb      = 0b000;
    sh      = 0b001;
    sw      = 0b010;
}

#[rustfmt::skip]
insn_sb! {
    beq     = 0b000;
    bne     = 0b001;
    blt     = 0b100;
    bge     = 0b101;
    bltu    = 0b110;
    bgeu    = 0b111;
}

pub fn lui(rd: u8, imm: u32) -> u32 {
    u_type(rd, imm)
}

pub fn jal(rd: u8, imm: i32) -> u32 {
    uj_type(rd, imm)
}

/// Loads a full 32-bit constant into `rd` with `lui` + `addi`.
pub fn li(rd: u8, value: u32) -> [u32; 2] {
    let lo = sign_extend(value & 0xfff, 12);
    let hi = value.wrapping_sub(lo as u32) >> 12;
    [lui(rd, hi), addi(rd, rd, lo)]
}
