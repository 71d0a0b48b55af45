#[cfg(feature = "target-riscv")]
pub mod riscv;
