use rvx::device::Terminal;
use rvx::heap::BANK_COUNT;
use rvx::loader::Image;
use rvx::mem::{Bus, HEAP_BASE};
use rvx::target::riscv::encode::*;
use rvx::target::riscv::{Cpu, Error, Halt, MALLOC_RESULT};

type Machine = Cpu<Terminal<&'static [u8], Vec<u8>>>;

const WRITE_CHAR: u32 = 0x0800;
const WRITE_INT: u32 = 0x0804;
const WRITE_UINT: u32 = 0x0808;
const HALT: u32 = 0x080c;
const READ_CHAR: u32 = 0x0812;
const READ_INT: u32 = 0x0816;
const DUMP_PC: u32 = 0x0820;
const DUMP_MEMORY: u32 = 0x0828;
const MALLOC: u32 = 0x0830;
const FREE: u32 = 0x0834;

#[derive(Default)]
struct Program {
    words: Vec<u32>,
    data: Vec<u8>,
    input: &'static str,
}

impl Program {
    fn op(mut self, word: u32) -> Self {
        self.words.push(word);
        self
    }

    fn li(mut self, rd: u8, value: u32) -> Self {
        self.words.extend(li(rd, value));
        self
    }

    /// Stores `rs` to `port` through x31.
    fn port(self, port: u32, store: fn(u8, u8, i32) -> u32, rs: u8) -> Self {
        self.li(31, port).op(store(rs, 31, 0))
    }

    fn halt(self) -> Self {
        self.port(HALT, sw, 0)
    }

    fn data(mut self, data: &[u8]) -> Self {
        self.data = data.to_vec();
        self
    }

    fn input(mut self, input: &'static str) -> Self {
        self.input = input;
        self
    }

    fn machine(&self) -> Machine {
        let _ = env_logger::builder().is_test(true).try_init();
        let bus = Bus::from(Image::from_words(&self.words, &self.data));
        Cpu::new(bus, Terminal::new(self.input.as_bytes(), Vec::new()))
    }

    fn run(&self) -> (Result<Halt, Error>, Machine) {
        let mut cpu = self.machine();
        let res = cpu.run();
        (res, cpu)
    }
}

fn program() -> Program {
    Program::default()
}

fn output(cpu: &Machine) -> &str {
    std::str::from_utf8(cpu.console.output()).unwrap()
}

#[test]
fn add_wraps_around() {
    let (res, cpu) = program()
        .li(1, 0xffff_ffff)
        .op(addi(2, 0, 1))
        .op(add(3, 1, 2))
        .op(sub(4, 0, 2))
        .halt()
        .run();

    assert_eq!(res, Ok(Halt::Requested));
    assert_eq!(cpu.register(3), 0);
    assert_eq!(cpu.register(4), 0xffff_ffff);
}

#[test]
fn shifts_compares_and_upper_immediates() {
    let (res, cpu) = program()
        .li(1, 0x8000_0000)
        .op(addi(2, 0, 4))
        .op(sra(3, 1, 2))
        .op(srl(4, 1, 2))
        .op(sll(5, 2, 2))
        .op(addi(6, 0, -1))
        .op(slt(7, 6, 0))
        .op(sltu(8, 6, 0))
        .op(slti(9, 2, 5))
        .op(sltiu(10, 2, -1))
        .op(lui(11, 0xabcde))
        .op(xori(12, 6, 0x0f0))
        .op(andi(13, 6, 0x0f0))
        .op(ori(14, 0, 0x0f0))
        .li(15, 0x1000)
        .op(sltiu(15, 15, -1))
        .halt()
        .run();

    assert_eq!(res, Ok(Halt::Requested));
    assert_eq!(cpu.register(3), 0xf800_0000);
    assert_eq!(cpu.register(4), 0x0800_0000);
    assert_eq!(cpu.register(5), 64);
    assert_eq!(cpu.register(7), 1);
    assert_eq!(cpu.register(8), 0);
    assert_eq!(cpu.register(9), 1);
    assert_eq!(cpu.register(10), 1);
    assert_eq!(cpu.register(11), 0xabcd_e000);
    assert_eq!(cpu.register(12), 0xffff_ff0f);
    assert_eq!(cpu.register(13), 0x0f0);
    assert_eq!(cpu.register(14), 0x0f0);
    assert_eq!(cpu.register(15), 0);
}

#[test]
fn counted_loop() {
    // sum 1..=10
    let (res, cpu) = program()
        .op(addi(1, 0, 10))
        .op(add(2, 2, 1))
        .op(addi(1, 1, -1))
        .op(bne(1, 0, -8))
        .halt()
        .run();

    assert_eq!(res, Ok(Halt::Requested));
    assert_eq!(cpu.register(2), 55);
}

#[test]
fn write_char_does_not_touch_memory() {
    let (res, cpu) = program()
        .op(addi(2, 0, 'A' as i32))
        .port(WRITE_CHAR, sb, 2)
        .halt()
        .run();

    assert_eq!(res, Ok(Halt::Requested));
    assert_eq!(output(&cpu), "ACPU Halt Requested\n");
    assert!(cpu.bus.data().iter().all(|&b| b == 0));
}

#[test]
fn write_formats_use_store_width() {
    let (_, cpu) = program()
        .op(addi(2, 0, -5))
        .port(WRITE_INT, sw, 2)
        .op(addi(3, 0, ' ' as i32))
        .port(WRITE_CHAR, sb, 3)
        .port(WRITE_INT, sb, 2)
        .port(WRITE_CHAR, sb, 3)
        .op(addi(4, 0, 255))
        .port(WRITE_UINT, sw, 4)
        .port(WRITE_CHAR, sb, 3)
        .port(WRITE_UINT, sh, 2)
        .halt()
        .run();

    assert_eq!(output(&cpu), "-5 251 ff fffbCPU Halt Requested\n");
}

#[test]
fn signed_and_unsigned_loads() {
    let (_, cpu) = program()
        .data(&[0x80, 0xff, 0x34, 0x12])
        .li(1, 0x0400)
        .op(lb(2, 1, 0))
        .op(lbu(3, 1, 0))
        .op(lh(4, 1, 0))
        .op(lhu(5, 1, 0))
        .op(lw(6, 1, 0))
        .halt()
        .run();

    assert_eq!(cpu.register(2), 0xffff_ff80);
    assert_eq!(cpu.register(3), 0x80);
    assert_eq!(cpu.register(4), 0xffff_ff80);
    assert_eq!(cpu.register(5), 0xff80);
    assert_eq!(cpu.register(6), 0x1234_ff80);
}

#[test]
fn data_memory_store_and_load() {
    let (_, cpu) = program()
        .li(1, 0x0400)
        .li(2, 0xdead_beef)
        .op(sw(2, 1, 8))
        .op(sh(0, 1, 8))
        .op(sb(2, 1, 12))
        .op(lw(3, 1, 8))
        .halt()
        .run();

    assert_eq!(cpu.register(3), 0xdead_0000);
    assert_eq!(&cpu.bus.data()[8..13], &[0x00, 0x00, 0xad, 0xde, 0xef]);
}

#[test]
fn instruction_memory_is_read_only() {
    let (res, cpu) = program().op(sw(0, 0, 0)).halt().run();

    assert_eq!(res, Ok(Halt::Requested));
    assert_eq!(cpu.bus.fetch(0), Some(sw(0, 0, 0)));
    assert_eq!(&cpu.bus.insn()[..4], &sw(0, 0, 0).to_le_bytes());
}

#[test]
fn malloc_rounds_up_to_banks() {
    let (_, cpu) = program()
        .op(addi(2, 0, 100))
        .port(MALLOC, sw, 2)
        .op(add(5, MALLOC_RESULT, 0))
        .op(addi(2, 0, 1))
        .port(MALLOC, sw, 2)
        .halt()
        .run();

    let heap = cpu.bus.heap();
    assert_eq!(cpu.register(5), HEAP_BASE);
    assert_eq!(cpu.register(MALLOC_RESULT), HEAP_BASE + 128);
    assert_eq!(heap.banks()[0].bytes_allocated(), 64);
    assert_eq!(heap.banks()[1].bytes_allocated(), 36);
    assert_eq!(heap.banks()[2].bytes_allocated(), 1);
    assert!(heap.banks()[3].is_free());
}

#[test]
fn malloc_exhaustion_yields_null() {
    let (res, cpu) = program()
        .li(1, MALLOC)
        .op(addi(2, 0, 64))
        .op(addi(3, 0, 129))
        .op(sw(2, 1, 0))
        .op(addi(3, 3, -1))
        .op(bne(3, 0, -8))
        .halt()
        .run();

    assert_eq!(res, Ok(Halt::Requested));
    assert_eq!(cpu.register(MALLOC_RESULT), 0);
    assert!(cpu.bus.heap().banks().iter().all(|bank| !bank.is_free()));
    assert_eq!(cpu.bus.heap().banks().len(), BANK_COUNT);
}

#[test]
fn heap_store_and_load() {
    let (_, cpu) = program()
        .op(addi(2, 0, 8))
        .port(MALLOC, sw, 2)
        .li(5, 0x1234_5678)
        .op(sw(5, MALLOC_RESULT, 60))
        .op(lw(6, MALLOC_RESULT, 60))
        .op(lbu(7, MALLOC_RESULT, 63))
        .halt()
        .run();

    assert_eq!(cpu.register(6), 0x1234_5678);
    assert_eq!(cpu.register(7), 0x12);
    assert_eq!(&cpu.bus.heap().banks()[0].data()[60..], &[0x78, 0x56, 0x34, 0x12]);
}

#[test]
fn free_is_ignored() {
    let (res, cpu) = program()
        .op(addi(2, 0, 10))
        .port(MALLOC, sw, 2)
        .port(FREE, sw, MALLOC_RESULT)
        .halt()
        .run();

    assert_eq!(res, Ok(Halt::Requested));
    assert!(!cpu.bus.heap().banks()[0].is_free());
}

#[test]
fn console_input() {
    let (_, cpu) = program()
        .input("  -42\nq")
        .li(1, READ_INT)
        .op(lw(2, 1, 0))
        .li(1, READ_CHAR)
        .op(lw(3, 1, 0))
        .op(lw(4, 1, 0))
        .op(lw(5, 1, 0))
        .halt()
        .run();

    assert_eq!(cpu.register(2), -42i32 as u32);
    assert_eq!(cpu.register(3), '\n' as u32);
    assert_eq!(cpu.register(4), 'q' as u32);
    assert_eq!(cpu.register(5), 0);
}

#[test]
fn console_input_follows_load_width() {
    let (_, cpu) = program()
        .input("200 200 -1 é")
        .li(1, READ_INT)
        .op(lb(2, 1, 0))
        .op(lbu(3, 1, 0))
        .op(lhu(4, 1, 0))
        .li(1, READ_CHAR)
        .op(lb(5, 1, 0))
        .op(lh(6, 1, 0))
        .halt()
        .run();

    assert_eq!(cpu.register(2), 0xffff_ffc8);
    assert_eq!(cpu.register(3), 0xc8);
    assert_eq!(cpu.register(4), 0xffff);
    assert_eq!(cpu.register(5), ' ' as u32);
    assert_eq!(cpu.register(6), 0xe9);
}

#[test]
fn unreadable_int_reads_zero() {
    let (_, cpu) = program()
        .input("abc")
        .op(addi(2, 0, 9))
        .li(1, READ_INT)
        .op(lw(2, 1, 0))
        .halt()
        .run();

    assert_eq!(cpu.register(2), 0);
}

#[test]
fn dump_pc_and_memory() {
    let (_, cpu) = program()
        .data(&[0xab])
        .port(DUMP_PC, sw, 0)
        .li(2, 0x0400)
        .port(DUMP_MEMORY, sw, 2)
        .halt()
        .run();

    // li expands to two words, the store sits at 0x8
    assert_eq!(output(&cpu), "0x0008000000abCPU Halt Requested\n");
}

#[test]
fn illegal_instruction_is_fatal() {
    let (res, cpu) = program().op(addi(1, 0, 1)).op(0x0000_007f).run();

    assert!(matches!(
        res,
        Err(Error::IllegalInstruction {
            pc: 4,
            word: 0x7f,
            ..
        })
    ));
    let out = output(&cpu);
    assert!(out.starts_with("Instruction Not Implemented: 0x0000007f\nPC = 0x00000004;\n"));
    assert!(out.contains("R[1] = 0x00000001;\n"));
    assert!(out.ends_with("R[31] = 0x00000000;\n"));
}

#[test]
fn leaving_instruction_memory_ends_run() {
    let (res, cpu) = program().op(jal(0, 0x400)).run();

    assert_eq!(res, Ok(Halt::PcOutOfRange));
    assert_eq!(cpu.pc(), 0x400);
    assert_eq!(output(&cpu), "");
}

#[test]
fn subroutine_call_and_return() {
    let (res, cpu) = program()
        .op(jal(1, 20))
        .op(addi(5, 5, 1))
        .halt()
        .op(addi(5, 5, 10))
        .op(jalr(0, 1, 0))
        .run();

    assert_eq!(res, Ok(Halt::Requested));
    assert_eq!(cpu.register(1), 4);
    assert_eq!(cpu.register(5), 11);
}

#[test]
fn image_from_file() {
    let mut program = vec![addi(1, 0, 7)];
    program.extend(li(31, HALT));
    program.push(sw(0, 31, 0));
    let image = Image::from_words(&program, &[]);
    let mut bytes = image.insn.to_vec();
    bytes.extend_from_slice(&image.data);

    let path = std::env::temp_dir().join(format!("rvx-image-{}.mi", std::process::id()));
    std::fs::write(&path, &bytes).unwrap();
    let loaded = Image::load(&path);
    std::fs::remove_file(&path).unwrap();

    let mut cpu = Cpu::new(Bus::from(loaded.unwrap()), Terminal::new(&b""[..], Vec::new()));
    assert_eq!(cpu.run(), Ok(Halt::Requested));
    assert_eq!(cpu.register(1), 7);
}
