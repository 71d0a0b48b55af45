use std::mem;

use thiserror::Error;

use crate::heap::{Heap, BANK_COUNT, BANK_SIZE};

pub const INSN_MEM_SIZE: usize = 1024;
pub const INSN_WORDS: usize = INSN_MEM_SIZE / 4;
pub const DATA_MEM_BASE: u32 = 0x0400;
pub const DATA_MEM_SIZE: usize = 1024;
pub const HEAP_BASE: u32 = 0xb700;
pub const HEAP_END: u32 = HEAP_BASE + (BANK_COUNT * BANK_SIZE) as u32;

#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("access fault at {0:#06x}")]
    AccessFault(u32),
    #[error("store to read-only memory at {0:#06x}")]
    ReadOnly(u32),
}

/// Where a logical address lands.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Region {
    Insn(usize),
    Data(usize),
    /// The I/O window and the gap up to the heap. Never backed by storage.
    Io(u32),
    Heap { bank: usize, offset: usize },
}

impl Region {
    pub fn of(address: u32) -> Self {
        match address {
            0..=0x03ff => Region::Insn(address as usize),
            0x0400..=0x07ff => Region::Data((address - DATA_MEM_BASE) as usize),
            HEAP_BASE.. => {
                let offset = (address - HEAP_BASE) as usize;
                Region::Heap {
                    bank: offset / BANK_SIZE,
                    offset: offset % BANK_SIZE,
                }
            }
            _ => Region::Io(address),
        }
    }
}

macro_rules! impl_read {
    ($($n:ident: $t:ty = $f:ident),+ $(,)?) => (
        $(fn $n(&self, address: u32) -> Result<$t, Error> {
            Ok(<$t>::$f(self.read_array::<{ mem::size_of::<$t>() }>(address)?))
        })+
    );
}

macro_rules! impl_write {
    ($($n:ident: $t:ty = $f:ident),+ $(,)?) => (
        $(fn $n(&mut self, address: u32, value: $t) -> Result<(), Error> {
            self.write_array(address, value.$f())
        })+
    );
}

/// Byte-addressed guest memory.
///
/// Multi-byte accesses are split into single bytes at consecutive addresses and
/// assembled little-endian, so a partial write is observable byte by byte.
pub trait Memory {
    fn read_byte(&self, address: u32) -> Result<u8, Error>;

    fn write_byte(&mut self, address: u32, value: u8) -> Result<(), Error>;

    fn read(&self, address: u32, data: &mut [u8]) -> Result<(), Error> {
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = self.read_byte(address.wrapping_add(i as u32))?;
        }
        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), Error> {
        for (i, byte) in data.iter().enumerate() {
            self.write_byte(address.wrapping_add(i as u32), *byte)?;
        }
        Ok(())
    }

    fn read_array<const N: usize>(&self, address: u32) -> Result<[u8; N], Error> {
        let mut buf = [0; N];
        self.read(address, &mut buf)?;
        Ok(buf)
    }

    fn write_array<const N: usize>(&mut self, address: u32, data: [u8; N]) -> Result<(), Error> {
        self.write(address, &data)
    }

    fn read_u8(&self, address: u32) -> Result<u8, Error> {
        self.read_byte(address)
    }

    fn read_i8(&self, address: u32) -> Result<i8, Error> {
        Ok(self.read_u8(address)? as i8)
    }

    fn write_u8(&mut self, address: u32, value: u8) -> Result<(), Error> {
        self.write_byte(address, value)
    }

    /// Reads `num_bytes` (1, 2 or 4) bytes as a little-endian value.
    fn read_bytes(&self, address: u32, num_bytes: usize) -> Result<u32, Error> {
        let mut buf = [0; 4];
        self.read(address, &mut buf[..num_bytes])?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Writes the low `num_bytes` (1, 2 or 4) bytes of `value` little-endian.
    fn write_bytes(&mut self, address: u32, value: u32, num_bytes: usize) -> Result<(), Error> {
        self.write(address, &value.to_le_bytes()[..num_bytes])
    }

    #[rustfmt::skip]
    impl_read! {
        read_u32_le: u32 = from_le_bytes,
        read_i16_le: i16 = from_le_bytes,
    }

    #[rustfmt::skip]
    impl_write! {
        write_u32_le: u32 = to_le_bytes,
    }
}

/// The machine's address space: instruction memory, data memory and heap banks.
pub struct Bus {
    insn: [u8; INSN_MEM_SIZE],
    words: [u32; INSN_WORDS],
    data: [u8; DATA_MEM_SIZE],
    heap: Heap,
}

impl Bus {
    pub fn new(insn: [u8; INSN_MEM_SIZE], words: [u32; INSN_WORDS], data: [u8; DATA_MEM_SIZE]) -> Self {
        Self {
            insn,
            words,
            data,
            heap: Heap::new(),
        }
    }

    /// Returns the pre-parsed instruction word containing `pc`.
    pub fn fetch(&self, pc: u16) -> Option<u32> {
        self.words.get(pc as usize / 4).copied()
    }

    pub fn insn(&self) -> &[u8] {
        &self.insn
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }
}

impl Memory for Bus {
    fn read_byte(&self, address: u32) -> Result<u8, Error> {
        match Region::of(address) {
            Region::Insn(i) => Ok(self.insn[i]),
            Region::Data(i) => Ok(self.data[i]),
            Region::Heap { bank, offset } => self
                .heap
                .read(bank, offset)
                .ok_or(Error::AccessFault(address)),
            Region::Io(address) => {
                warn!("load from unmapped port {address:#06x}, reading 0");
                Ok(0)
            }
        }
    }

    fn write_byte(&mut self, address: u32, value: u8) -> Result<(), Error> {
        match Region::of(address) {
            Region::Insn(_) => Err(Error::ReadOnly(address)),
            Region::Data(i) => {
                self.data[i] = value;
                Ok(())
            }
            Region::Heap { bank, offset } => {
                if self.heap.write(bank, offset, value) {
                    Ok(())
                } else {
                    Err(Error::AccessFault(address))
                }
            }
            Region::Io(address) => {
                warn!("store to unmapped port {address:#06x} dropped");
                Ok(())
            }
        }
    }
}
