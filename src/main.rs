#[macro_use]
extern crate log;

use std::env;
use std::process::ExitCode;

use rvx::device::Terminal;
use rvx::loader::Image;
use rvx::mem::Bus;

#[cfg(feature = "target-riscv")]
fn main() -> ExitCode {
    use rvx::target::riscv::Cpu;

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args: Vec<_> = env::args().collect();
    if args.len() != 2 {
        println!("Wrong number of arguments");
        return ExitCode::FAILURE;
    }

    let image = match Image::load(&args[1]) {
        Ok(image) => image,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let mut cpu = Cpu::new(Bus::from(image), Terminal::stdio());
    match cpu.run() {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(feature = "target-riscv"))]
fn main() -> ExitCode {
    eprintln!("rvx was built without a target");
    ExitCode::FAILURE
}
