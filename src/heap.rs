pub const BANK_SIZE: usize = 64;
pub const BANK_COUNT: usize = 128;

#[derive(Clone)]
pub struct Bank {
    data: [u8; BANK_SIZE],
    bytes_allocated: usize,
}

impl Default for Bank {
    fn default() -> Self {
        Self {
            data: [0; BANK_SIZE],
            bytes_allocated: 0,
        }
    }
}

impl Bank {
    pub fn data(&self) -> &[u8; BANK_SIZE] {
        &self.data
    }

    /// Zero when the bank is free, otherwise `1..=64`.
    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }

    pub fn is_free(&self) -> bool {
        self.bytes_allocated == 0
    }
}

/// Fixed pool of 64-byte banks handed out first-fit in contiguous runs.
pub struct Heap {
    banks: Vec<Bank>,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    pub fn new() -> Self {
        Self {
            banks: vec![Bank::default(); BANK_COUNT],
        }
    }

    pub fn bank(&self, index: usize) -> Option<&Bank> {
        self.banks.get(index)
    }

    pub fn banks(&self) -> &[Bank] {
        &self.banks
    }

    pub fn read(&self, bank: usize, offset: usize) -> Option<u8> {
        self.banks.get(bank).and_then(|b| b.data.get(offset)).copied()
    }

    pub fn write(&mut self, bank: usize, offset: usize, value: u8) -> bool {
        match self.banks.get_mut(bank).and_then(|b| b.data.get_mut(offset)) {
            Some(byte) => {
                *byte = value;
                true
            }
            None => false,
        }
    }

    /// Number of banks backing a request of `num_bytes`.
    pub fn banks_for(num_bytes: u32) -> usize {
        ((num_bytes as usize + BANK_SIZE - 1) / BANK_SIZE).max(1)
    }

    /// Reserves the first run of free banks large enough for `num_bytes` and
    /// returns the index of its first bank.
    ///
    /// Every bank in the run is marked full except the last one, which carries
    /// the remainder when `num_bytes` is not a multiple of the bank size.
    pub fn malloc(&mut self, num_bytes: u32) -> Option<usize> {
        let num_banks = Self::banks_for(num_bytes);
        if num_banks > BANK_COUNT {
            return None;
        }

        let start = (0..=BANK_COUNT - num_banks)
            .find(|&i| self.banks[i..i + num_banks].iter().all(Bank::is_free))?;

        let rem = num_bytes as usize % BANK_SIZE;
        let last = start + num_banks - 1;
        for (i, bank) in self.banks[start..=last].iter_mut().enumerate() {
            bank.bytes_allocated = if start + i == last && rem != 0 {
                rem
            } else {
                BANK_SIZE
            };
        }

        debug!("heap: malloc({num_bytes}) -> banks {start}..={last}");
        Some(start)
    }
}
