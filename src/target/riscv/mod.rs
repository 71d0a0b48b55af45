pub mod decode;
pub mod encode;
pub mod port;

use std::fmt;

use thiserror::Error;

use crate::device::Console;
use crate::heap::BANK_SIZE;
use crate::mem::{Bus, Memory, HEAP_BASE};
use crate::utils::{extract_bits, sign_extend};

use self::decode::{decode, Args, ArgsI, ArgsR, ArgsS, ArgsU, DecodeError, Insn, Mnemonic};
use self::port::{Access, HeapPort, Port};

/// Register receiving the pointer produced by the malloc port.
pub const MALLOC_RESULT: u8 = 28;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Halt {
    /// The guest stored to the halt port.
    Requested,
    /// The program counter left instruction memory.
    PcOutOfRange,
}

impl fmt::Display for Halt {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Halt::Requested => fmt.write_str("halt requested"),
            Halt::PcOutOfRange => fmt.write_str("pc left instruction memory"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum State {
    Running,
    Halted(Halt),
}

#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("{pc:#06x}: illegal instruction {word:#010x}")]
    IllegalInstruction {
        pc: u16,
        word: u32,
        #[source]
        source: DecodeError,
    },
}

pub struct Cpu<C> {
    pub bus: Bus,
    pub console: C,

    pc: u16,
    npc: u16,
    gr: [u32; 32],

    retired: u64,
}

impl<C> Cpu<C> {
    pub fn new(bus: Bus, console: C) -> Self {
        Self {
            bus,
            console,
            pc: 0,
            npc: 0,
            gr: [0; 32],
            retired: 0,
        }
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    pub fn register(&self, i: u8) -> u32 {
        self.gr[i as usize]
    }

    pub fn set_register(&mut self, i: u8, value: u32) {
        self.write_gr(i, value);
    }

    pub fn registers(&self) -> &[u32; 32] {
        &self.gr
    }

    /// Number of instructions executed so far.
    pub fn retired(&self) -> u64 {
        self.retired
    }

    fn write_gr(&mut self, i: u8, value: u32) {
        match i {
            0 => {}
            _ => self.gr[i as usize] = value,
        }
    }
}

impl<C: Console> Cpu<C> {
    /// Runs until the guest halts or executes something undecodable.
    pub fn run(&mut self) -> Result<Halt, Error> {
        info!("starting at {:#06x}", self.pc);

        loop {
            if let State::Halted(halt) = self.step()? {
                info!("{halt} at {:#06x} after {} instructions", self.pc, self.retired);
                return Ok(halt);
            }
        }
    }

    /// Fetches, decodes and executes a single instruction.
    pub fn step(&mut self) -> Result<State, Error> {
        let word = match self.bus.fetch(self.pc) {
            Some(word) => word,
            None => return Ok(State::Halted(Halt::PcOutOfRange)),
        };

        self.gr[0] = 0;

        let insn = match decode(word) {
            Ok(insn) => insn,
            Err(source) => {
                error!("{:x}: {source}", self.pc);
                self.print(format!("Instruction Not Implemented: 0x{word:08x}\n").as_bytes());
                self.dump_registers();
                return Err(Error::IllegalInstruction {
                    pc: self.pc,
                    word,
                    source,
                });
            }
        };

        self.npc = self.pc.wrapping_add(4);
        let state = self.exec(&insn);
        if state == State::Running {
            self.pc = self.npc;
        }
        self.retired += 1;
        Ok(state)
    }

    fn exec(&mut self, insn: &Insn) -> State {
        let name = insn.mnemonic;
        match insn.args {
            Args::R(r) => self.exec_r(name, r),
            Args::I(i) => self.exec_i(name, i),
            Args::Load(i) => self.exec_l(name, i),
            Args::Jalr(i) => self.jalr(name, i),
            Args::S(s) => return self.exec_s(name, s),
            Args::Sb(b) => self.exec_b(name, b),
            Args::U(u) => self.lui(name, u),
            Args::Uj(j) => self.jal(name, j),
        }
        State::Running
    }

    fn exec_r(&mut self, name: Mnemonic, r: ArgsR) {
        let s1 = self.gr[r.rs1 as usize];
        let s2 = self.gr[r.rs2 as usize];
        let res = alu(name, s1, s2);
        trace!(
            "{:x}: {name}\tx{}={res}, x{}={s1}, x{}={s2}",
            self.pc,
            r.rd,
            r.rs1,
            r.rs2
        );
        self.write_gr(r.rd, res);
    }

    fn exec_i(&mut self, name: Mnemonic, i: ArgsI) {
        let s1 = self.gr[i.rs1 as usize];
        // sltiu compares against the raw 12-bit field
        let imm = match name {
            Mnemonic::Sltiu => i.imm,
            _ => i.imm_signed as u32,
        };
        let res = alu(name, s1, imm);
        trace!(
            "{:x}: {name}\tx{}={res}, x{}={s1}, {}",
            self.pc,
            i.rd,
            i.rs1,
            i.imm_signed
        );
        self.write_gr(i.rd, res);
    }

    fn exec_l(&mut self, name: Mnemonic, i: ArgsI) {
        let pc = self.pc;
        let s1 = self.gr[i.rs1 as usize];
        let addr = s1.wrapping_add(i.imm_signed as u32);
        let raw = match Port::input(addr) {
            Some(port) => self.read_port(port),
            None => {
                let num_bytes = name.width().unwrap_or(32) as usize / 8;
                self.bus.read_bytes(addr, num_bytes).unwrap_or_else(|err| {
                    warn!("{pc:x}: {name}: {err}, reading 0");
                    0
                })
            }
        };
        let value = load_extend(name, raw);
        trace!(
            "{pc:x}: {name}\tx{}={value:#x}, {}(x{}={s1:#x})",
            i.rd,
            i.imm_signed,
            i.rs1
        );
        self.write_gr(i.rd, value);
    }

    fn exec_s(&mut self, name: Mnemonic, s: ArgsS) -> State {
        let pc = self.pc;
        let s1 = self.gr[s.rs1 as usize];
        let s2 = self.gr[s.rs2 as usize];
        let addr = s1.wrapping_add(s.imm_signed as u32);
        let width = name.width().unwrap_or(32);
        trace!(
            "{pc:x}: {name}\tx{}={s2:#x}, {}(x{}={s1:#x})",
            s.rs2,
            s.imm_signed,
            s.rs1
        );

        match Access::classify(addr) {
            Access::Routine(port) => return self.write_port(port, width, s2),
            Access::Heap(HeapPort::Malloc) => self.malloc(s2),
            Access::Heap(HeapPort::Free) => {
                warn!("{pc:x}: free({s2:#x}) ignored, banks are never released");
            }
            Access::Plain(addr) => {
                if let Err(err) = self.bus.write_bytes(addr, s2, width as usize / 8) {
                    warn!("{pc:x}: {name}: {err}, store dropped");
                }
            }
        }
        State::Running
    }

    fn exec_b(&mut self, name: Mnemonic, b: ArgsS) {
        let s1 = self.gr[b.rs1 as usize];
        let s2 = self.gr[b.rs2 as usize];
        trace!(
            "{:x}: {name}\tx{}={s1}, x{}={s2}, {}",
            self.pc,
            b.rs1,
            b.rs2,
            b.imm_signed
        );
        if taken(name, s1, s2) {
            self.npc = self.pc.wrapping_add(b.imm_signed as u16);
        }
    }

    fn jal(&mut self, name: Mnemonic, j: ArgsU) {
        let npc = self.pc.wrapping_add(j.imm_signed as u16);
        trace!("{:x}: {name}\tx{}, {} # {npc:x}", self.pc, j.rd, j.imm_signed);
        self.write_gr(j.rd, self.npc as u32);
        self.npc = npc;
    }

    fn jalr(&mut self, name: Mnemonic, i: ArgsI) {
        let s1 = self.gr[i.rs1 as usize];
        let npc = s1 as u16;
        trace!("{:x}: {name}\tx{}, x{}={s1} # {npc:x}", self.pc, i.rd, i.rs1);
        self.write_gr(i.rd, self.npc as u32);
        self.npc = npc;
    }

    fn lui(&mut self, name: Mnemonic, u: ArgsU) {
        trace!("{:x}: {name}\tx{}, {:#x}", self.pc, u.rd, u.imm);
        self.write_gr(u.rd, u.imm_signed as u32);
    }

    fn malloc(&mut self, num_bytes: u32) {
        let ptr = match self.bus.heap_mut().malloc(num_bytes) {
            Some(bank) => HEAP_BASE + (bank * BANK_SIZE) as u32,
            None => {
                debug!("{:x}: malloc({num_bytes}) found no free run", self.pc);
                0
            }
        };
        self.write_gr(MALLOC_RESULT, ptr);
    }

    fn read_port(&mut self, port: Port) -> u32 {
        let value = match port {
            Port::ReadChar => self.console.read_char(),
            Port::ReadInt => self.console.read_int().map(|v| v.map(|v| v as u32)),
            _ => Ok(Some(0)),
        };
        match value {
            Ok(Some(value)) => {
                debug!("{:x}: {port:?} -> {value:#x}", self.pc);
                value
            }
            Ok(None) => {
                warn!("{:x}: {port:?}: no input, reading 0", self.pc);
                0
            }
            Err(err) => {
                warn!("{:x}: {port:?}: {err}, reading 0", self.pc);
                0
            }
        }
    }

    fn write_port(&mut self, port: Port, width: u32, value: u32) -> State {
        let masked = extract_bits(value, width - 1, 0);
        debug!("{:x}: {port:?}({masked:#x})", self.pc);

        match port {
            Port::WriteChar => self.print(&[masked as u8]),
            Port::WriteInt => self.print(format!("{}", masked as i32).as_bytes()),
            Port::WriteUint => self.print(format!("{masked:x}").as_bytes()),
            Port::Halt => {
                self.print(b"CPU Halt Requested\n");
                return State::Halted(Halt::Requested);
            }
            Port::DumpPc => self.print(format!("0x{:04x}", self.pc).as_bytes()),
            Port::DumpRegisters => self.dump_registers(),
            Port::DumpMemory => {
                let byte = self.bus.read_u8(value).unwrap_or_else(|err| {
                    warn!("dump memory: {err}");
                    0
                });
                self.print(format!("{byte:08x}").as_bytes());
            }
            Port::ReadChar | Port::ReadInt | Port::Malloc | Port::Free => {}
        }
        State::Running
    }

    pub fn dump_registers(&mut self) {
        let mut out = format!("PC = 0x{:08x};\n", self.pc);
        for (i, r) in self.gr.iter().enumerate() {
            out.push_str(&format!("R[{i}] = 0x{r:08x};\n"));
        }
        self.print(out.as_bytes());
    }

    fn print(&mut self, bytes: &[u8]) {
        if let Err(err) = self.console.write(bytes) {
            warn!("console write failed: {err}");
        }
    }
}

fn alu(name: Mnemonic, a: u32, b: u32) -> u32 {
    use Mnemonic::*;

    match name {
        Add | Addi => a.wrapping_add(b),
        Sub => a.wrapping_sub(b),
        Xor | Xori => a ^ b,
        Or | Ori => a | b,
        And | Andi => a & b,
        Sll => a.wrapping_shl(b),
        Srl => a.wrapping_shr(b),
        Sra => sra(a, b),
        Slt | Slti => slt(a, b),
        Sltu | Sltiu => sltu(a, b),
        _ => unreachable!("{name} has no ALU operation"),
    }
}

fn taken(name: Mnemonic, a: u32, b: u32) -> bool {
    use Mnemonic::*;

    match name {
        Beq => a == b,
        Bne => a != b,
        Blt => (a as i32) < (b as i32),
        Bge => (a as i32) >= (b as i32),
        Bltu => a < b,
        Bgeu => a >= b,
        _ => unreachable!("{name} is not a branch"),
    }
}

/// Narrows a loaded value to the access width of `name`.
fn load_extend(name: Mnemonic, raw: u32) -> u32 {
    match name {
        Mnemonic::Lb => sign_extend(extract_bits(raw, 7, 0), 8) as u32,
        Mnemonic::Lh => sign_extend(extract_bits(raw, 15, 0), 16) as u32,
        Mnemonic::Lbu => extract_bits(raw, 7, 0),
        Mnemonic::Lhu => extract_bits(raw, 15, 0),
        _ => raw,
    }
}

fn slt(a: u32, b: u32) -> u32 {
    ((a as i32) < (b as i32)) as u32
}

fn sltu(a: u32, b: u32) -> u32 {
    (a < b) as u32
}

fn sra(a: u32, b: u32) -> u32 {
    (a as i32).wrapping_shr(b) as u32
}
