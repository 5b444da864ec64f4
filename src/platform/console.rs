//! Text console: synchronous line output, asynchronous character input.

use std::io::{self, BufRead, Cursor, Write};

use log::warn;

use super::{Clock, ErrorCode, Ticks, Upcall};

/// Where console characters (and, on PC, button gestures) come from.
pub struct Input(Box<dyn BufRead>);

impl Input {
    pub fn stdin() -> Self {
        Input(Box::new(io::BufReader::new(io::stdin())))
    }

    pub fn script(text: &str) -> Self {
        Input(Box::new(Cursor::new(text.as_bytes().to_vec())))
    }

    fn byte(&mut self) -> Option<u8> {
        let byte = match self.0.fill_buf() {
            Ok(buf) => *buf.first()?,
            Err(err) => {
                warn!("console input: {}", err);
                return None;
            }
        };
        self.0.consume(1);
        Some(byte)
    }

    fn line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.0.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line),
            Err(err) => {
                warn!("console input: {}", err);
                None
            }
        }
    }
}

/// Where console text goes.
pub enum Output {
    Stream(Box<dyn Write>),
    Captured(Vec<u8>),
}

impl Output {
    pub fn stdout() -> Self {
        Output::Stream(Box::new(io::stdout()))
    }

    pub fn captured() -> Self {
        Output::Captured(Vec::new())
    }
}

pub struct Console {
    clock: Clock,
    input: Input,
    output: Output,
    upcall: Option<Upcall>,
    read_buffer: Vec<u8>,
    reading: bool,
    received: Option<(Ticks, u8)>,
}

impl Console {
    pub(crate) fn new(clock: Clock, input: Input, output: Output) -> Self {
        Self {
            clock,
            input,
            output,
            upcall: None,
            read_buffer: Vec::new(),
            reading: false,
            received: None,
        }
    }

    /// Writes `text` without a line terminator.
    pub fn print(&mut self, text: &str) {
        let result = match &mut self.output {
            Output::Stream(stream) => stream.write_all(text.as_bytes()).and_then(|_| stream.flush()),
            Output::Captured(buffer) => {
                buffer.extend_from_slice(text.as_bytes());
                Ok(())
            }
        };
        if let Err(err) = result {
            warn!("console output: {}", err);
        }
    }

    pub fn println(&mut self, line: impl core::fmt::Display) {
        self.print(&format!("{}\r\n", line));
    }

    /// Everything written so far, when the output is captured.
    pub fn transcript(&self) -> Option<String> {
        match &self.output {
            Output::Captured(buffer) => Some(String::from_utf8_lossy(buffer).into_owned()),
            Output::Stream(_) => None,
        }
    }

    /// Replaces the read-completion upcall, returning the previous one.
    ///
    /// The upcall receives `(status, length, 0)`.
    pub fn subscribe(&mut self, upcall: Option<Upcall>) -> Option<Upcall> {
        core::mem::replace(&mut self.upcall, upcall)
    }

    pub fn allow_read(&mut self, buffer: Vec<u8>) -> Result<Vec<u8>, ErrorCode> {
        if self.reading {
            return Err(ErrorCode::Busy);
        }
        Ok(core::mem::replace(&mut self.read_buffer, buffer))
    }

    /// Starts receiving a single character into the read buffer.
    pub fn read(&mut self) -> Result<(), ErrorCode> {
        if self.reading {
            return Err(ErrorCode::Busy);
        }
        if self.read_buffer.is_empty() {
            return Err(ErrorCode::Reserve);
        }
        self.reading = true;
        Ok(())
    }

    pub fn abort_read(&mut self) -> Result<(), ErrorCode> {
        if !self.reading {
            return Err(ErrorCode::Already);
        }
        self.reading = false;
        self.received = None;
        Ok(())
    }

    pub(crate) fn wants_input(&self) -> bool {
        self.reading && self.received.is_none()
    }

    /// Pulls one character from the input for the pending read.
    pub(crate) fn feed(&mut self) -> bool {
        match self.input.byte() {
            Some(byte) => {
                self.received = Some((self.clock.now(), byte));
                true
            }
            None => false,
        }
    }

    pub(crate) fn next_line(&mut self) -> Option<String> {
        self.input.line()
    }

    pub(crate) fn deadline(&self) -> Option<Ticks> {
        self.received.map(|(at, _)| at)
    }

    pub(crate) fn service(&mut self) {
        let (_, byte) = match self.received.take() {
            Some(received) => received,
            None => return,
        };
        self.reading = false;
        self.read_buffer[0] = byte;
        if let Some(upcall) = self.upcall.as_mut() {
            upcall(0, 1, 0);
        }
    }
}
