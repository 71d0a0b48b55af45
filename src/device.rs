use std::io::{self, BufRead, StdinLock, Stdout, Write};
use std::str;

/// Host side of the console routines.
///
/// Reads block until input is available. `Ok(None)` means the input is
/// exhausted or holds no value of the requested shape.
pub trait Console {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn read_char(&mut self) -> io::Result<Option<u32>>;

    fn read_int(&mut self) -> io::Result<Option<i32>>;
}

pub struct Terminal<R, W> {
    input: R,
    output: W,
}

impl Terminal<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R, W> Terminal<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }
}

impl<R: BufRead, W> Terminal<R, W> {
    fn peek(&mut self) -> io::Result<Option<u8>> {
        Ok(self.input.fill_buf()?.first().copied())
    }

    fn skip_whitespace(&mut self) -> io::Result<()> {
        while let Some(b) = self.peek()? {
            if !b.is_ascii_whitespace() {
                break;
            }
            self.input.consume(1);
        }
        Ok(())
    }
}

fn utf8_len(lead: u8) -> usize {
    match lead {
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => 1,
    }
}

impl<R: BufRead, W: Write> Console for Terminal<R, W> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.output.write_all(bytes)?;
        self.output.flush()
    }

    fn read_char(&mut self) -> io::Result<Option<u32>> {
        let mut buf = [0; 4];
        if self.input.read(&mut buf[..1])? == 0 {
            return Ok(None);
        }
        let len = utf8_len(buf[0]);
        self.input.read_exact(&mut buf[1..len])?;
        let c = match str::from_utf8(&buf[..len]) {
            Ok(s) => s.chars().next().map_or(buf[0] as u32, |c| c as u32),
            Err(_) => buf[0] as u32,
        };
        trace!("terminal: read char {c:#x}");
        Ok(Some(c))
    }

    fn read_int(&mut self) -> io::Result<Option<i32>> {
        self.skip_whitespace()?;
        let mut text = String::new();
        if let Some(b @ (b'-' | b'+')) = self.peek()? {
            text.push(b as char);
            self.input.consume(1);
        }
        while let Some(b) = self.peek()? {
            if !b.is_ascii_digit() {
                break;
            }
            text.push(b as char);
            self.input.consume(1);
        }
        trace!("terminal: read int {text:?}");
        Ok(text.parse::<i64>().ok().map(|value| value as i32))
    }
}
