#[macro_use]
extern crate log;

pub mod device;
pub mod heap;
pub mod loader;
pub mod mem;
pub mod target;
pub mod utils;
