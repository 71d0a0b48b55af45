pub trait Extract: Sized {
    fn zextract(&self, pos: u32, len: u32) -> Self;
    fn sextract(&self, pos: u32, len: u32) -> Self;
}

macro_rules! impl_extract {
    ($($uint:ty = $sint:ty),+ $(,)?) => (
        $(impl Extract for $uint {
            fn zextract(&self, pos: u32, len: u32) -> Self {
                (*self << (<$uint>::BITS - pos - len)) >> (<$uint>::BITS - len)
            }

            fn sextract(&self, pos: u32, len: u32) -> Self {
                ((*self << (<$uint>::BITS - pos - len)) as $sint >> (<$uint>::BITS - len)) as Self
            }
        })+
    );
}

impl_extract! {
    u8 = i8,
    u16 = i16,
    u32 = i32,
}

pub fn zextract<T: Extract>(value: T, pos: u32, len: u32) -> T {
    value.zextract(pos, len)
}

pub fn sextract<T: Extract>(value: T, pos: u32, len: u32) -> T {
    value.sextract(pos, len)
}

pub trait Deposit: Sized {
    fn deposit<F: Into<Self>>(&self, pos: u32, len: u32, field: F) -> Self;
}

macro_rules! impl_deposit {
    ($($uint:ty),+ $(,)?) => {
        $(
            impl Deposit for $uint {
                fn deposit<F: Into<Self>>(&self, pos: u32, len: u32, field: F) -> Self {
                    let mask = (1 as $uint).checked_shl(len).unwrap_or(0).wrapping_sub(1) << pos;
                    (*self & !mask) | ((field.into() << pos) & mask)
                }
            }
         )+
    };
}

impl_deposit! {
    u8,
    u16,
    u32,
}

pub fn deposit<T: Deposit, F: Into<T>>(value: T, pos: u32, len: u32, field: F) -> T {
    value.deposit(pos, len, field)
}

/// Returns bits `[low, high]` of `word` (inclusive, bit 0 is the least significant).
///
/// Requires `low <= high <= 31`.
pub fn extract_bits(word: u32, high: u32, low: u32) -> u32 {
    zextract(word, low, high - low + 1)
}

/// Checks the sign bit of a field whose sign sits at bit `length`, one past the
/// top data bit.
pub fn is_negative(value: u32, length: u32) -> bool {
    extract_bits(value, length, length) & 1 == 1
}

/// Magnitude of a negative `length + 1` bit two's-complement field.
///
/// Everything above bit `length` produced by the inversion is cleared.
pub fn twos_complement_magnitude(value: u32, length: u32) -> u32 {
    let value = (!value).wrapping_add(1);
    (value << (31 - length)) >> (31 - length)
}

/// Replicates bit `num_bits - 1` of `value` into all higher bits.
///
/// `num_bits == 32` passes the value through unchanged.
pub fn sign_extend(value: u32, num_bits: u32) -> i32 {
    sextract(value, 0, num_bits) as i32
}

/// Interprets `value` as a signed field with its sign at bit `length`, without
/// extending it any further.
pub fn to_signed(value: u32, length: u32) -> i32 {
    if is_negative(value, length) {
        -(twos_complement_magnitude(value, length) as i32)
    } else {
        value as i32
    }
}
