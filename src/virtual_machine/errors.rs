use thiserror::Error;

/// Errors raised while parsing, decoding, or executing an Intcode program.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum VMError {
    /// Program counter or operand address outside the memory extent.
    #[error("address {address} out of bounds (memory length {len})")]
    OutOfBounds { address: i64, len: usize },
    /// Decoded opcode has no entry in the instruction table.
    #[error("invalid opcode {opcode}")]
    InvalidOpcode { opcode: i64 },
    /// Mode digit other than 0 or 1, or immediate mode on a write target.
    #[error("invalid addressing mode {mode} for parameter {param}")]
    InvalidAddressingMode { mode: i64, param: usize },
    /// Step or run requested after the engine halted or faulted.
    #[error("engine already terminated")]
    AlreadyTerminated,
    /// Input requested but the source has no more values.
    #[error("input exhausted")]
    InputExhausted,
    /// Program text contains a token that is not a decimal integer.
    #[error("token {index} is not an integer: {token:?}")]
    ParseError { index: usize, token: String },
    /// Reader or writer behind an I/O port failed.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for VMError {
    fn from(err: std::io::Error) -> Self {
        VMError::Io(err.to_string())
    }
}

/// Terminal fault returned by [`VM::run`](super::vm::VM::run).
///
/// Carries the reason together with the program counter of the faulting
/// instruction and memory exactly as it was last written.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{reason} (pc {pc})")]
pub struct Fault {
    pub reason: VMError,
    pub pc: usize,
    pub memory: Vec<i64>,
}
