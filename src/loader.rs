use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::mem::{Bus, DATA_MEM_SIZE, INSN_MEM_SIZE, INSN_WORDS};

pub const IMAGE_SIZE: usize = INSN_MEM_SIZE + DATA_MEM_SIZE;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("image holds {found} bytes, expected {expected}")]
    Truncated { expected: usize, found: usize },
}

/// Initial contents of instruction and data memory.
pub struct Image {
    pub insn: [u8; INSN_MEM_SIZE],
    pub words: [u32; INSN_WORDS],
    pub data: [u8; DATA_MEM_SIZE],
}

impl Image {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })?;
        info!("loaded {} ({} bytes)", path.display(), bytes.len());
        Self::from_bytes(&bytes)
    }

    /// Splits a raw image into 1024 bytes of instructions followed by 1024
    /// bytes of data. Trailing bytes are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < IMAGE_SIZE {
            return Err(Error::Truncated {
                expected: IMAGE_SIZE,
                found: bytes.len(),
            });
        }
        if bytes.len() > IMAGE_SIZE {
            warn!("ignoring {} trailing bytes", bytes.len() - IMAGE_SIZE);
        }

        let mut insn = [0; INSN_MEM_SIZE];
        insn.copy_from_slice(&bytes[..INSN_MEM_SIZE]);
        let mut data = [0; DATA_MEM_SIZE];
        data.copy_from_slice(&bytes[INSN_MEM_SIZE..IMAGE_SIZE]);

        let mut words = [0; INSN_WORDS];
        for (word, chunk) in words.iter_mut().zip(insn.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }

        Ok(Self { insn, words, data })
    }

    /// Builds an image from instruction words and initial data. Anything that
    /// does not fit is dropped.
    pub fn from_words(program: &[u32], data: &[u8]) -> Self {
        let mut bytes = vec![0; IMAGE_SIZE];
        for (chunk, word) in bytes[..INSN_MEM_SIZE].chunks_exact_mut(4).zip(program) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        let len = data.len().min(DATA_MEM_SIZE);
        bytes[INSN_MEM_SIZE..INSN_MEM_SIZE + len].copy_from_slice(&data[..len]);

        let mut insn = [0; INSN_MEM_SIZE];
        insn.copy_from_slice(&bytes[..INSN_MEM_SIZE]);
        let mut words = [0; INSN_WORDS];
        for (slot, word) in words.iter_mut().zip(program) {
            *slot = *word;
        }
        let mut image_data = [0; DATA_MEM_SIZE];
        image_data.copy_from_slice(&bytes[INSN_MEM_SIZE..]);

        Self {
            insn,
            words,
            data: image_data,
        }
    }
}

impl From<Image> for Bus {
    fn from(image: Image) -> Self {
        Bus::new(image.insn, image.words, image.data)
    }
}
