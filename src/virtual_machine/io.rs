//! Input and output ports for the VM.
//!
//! The [`IoPort`] trait is the only channel between a running program and the
//! outside world: `IN` pulls one value from [`IoPort::read`], `OUT` pushes one
//! value into [`IoPort::write`]. [`QueuePort`] is a deterministic, pre-seeded
//! port for tests and batch runs; [`ConsolePort`] prompts interactively.

use crate::virtual_machine::errors::VMError;
use std::collections::VecDeque;
use std::io::{self, BufRead, StdinLock, Stdout, Write};

/// Blocking input source and output sink used by the `IN` and `OUT` instructions.
pub trait IoPort {
    /// Returns the next input value.
    ///
    /// Implementations that read text must retry malformed input themselves;
    /// the VM only ever sees a well-formed integer or an error.
    fn read(&mut self) -> Result<i64, VMError>;
    /// Consumes one output value.
    fn write(&mut self, value: i64) -> Result<(), VMError>;
}

impl<P: IoPort + ?Sized> IoPort for &mut P {
    fn read(&mut self) -> Result<i64, VMError> {
        (**self).read()
    }

    fn write(&mut self, value: i64) -> Result<(), VMError> {
        (**self).write(value)
    }
}

/// Pre-seeded input queue with collected output.
#[derive(Clone, Debug, Default)]
pub struct QueuePort {
    input: VecDeque<i64>,
    output: Vec<i64>,
}

impl QueuePort {
    /// Creates a port that yields `input` in order.
    pub fn new(input: impl IntoIterator<Item = i64>) -> Self {
        Self {
            input: input.into_iter().collect(),
            output: Vec::new(),
        }
    }

    /// Appends a value to the end of the input queue.
    pub fn push_input(&mut self, value: i64) {
        self.input.push_back(value);
    }

    /// Values not yet consumed by the program.
    pub fn remaining_input(&self) -> usize {
        self.input.len()
    }

    /// Values written so far, in order.
    pub fn output(&self) -> &[i64] {
        &self.output
    }

    pub fn into_output(self) -> Vec<i64> {
        self.output
    }
}

impl IoPort for QueuePort {
    fn read(&mut self) -> Result<i64, VMError> {
        self.input.pop_front().ok_or(VMError::InputExhausted)
    }

    fn write(&mut self, value: i64) -> Result<(), VMError> {
        self.output.push(value);
        Ok(())
    }
}

/// Line-oriented interactive port.
///
/// Prompts with `input: ` before every read and prints each output as
/// `output: <value>`. Lines that are not integers are reported and the prompt
/// repeats; end of input yields [`VMError::InputExhausted`].
pub struct ConsolePort<R, W> {
    reader: R,
    writer: W,
}

impl ConsolePort<StdinLock<'static>, Stdout> {
    /// Port bound to the process stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePort<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R: BufRead, W: Write> IoPort for ConsolePort<R, W> {
    fn read(&mut self) -> Result<i64, VMError> {
        let mut line = Vec::new();
        loop {
            write!(self.writer, "input: ")?;
            self.writer.flush()?;

            line.clear();
            if self.reader.read_until(b'\n', &mut line)? == 0 {
                return Err(VMError::InputExhausted);
            }
            // Non-UTF-8 bytes are just another malformed line.
            let parsed = std::str::from_utf8(&line)
                .ok()
                .and_then(|text| text.trim().parse::<i64>().ok());
            match parsed {
                Some(value) => return Ok(value),
                None => writeln!(self.writer, "Invalid input, must be an integer")?,
            }
        }
    }

    fn write(&mut self, value: i64) -> Result<(), VMError> {
        writeln!(self.writer, "output: {value}")?;
        Ok(())
    }
}
