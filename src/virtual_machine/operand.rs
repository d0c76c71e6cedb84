//! Opcode decoding and operand resolution.
//!
//! An encoded opcode packs the instruction in its two low decimal digits and
//! one addressing mode per parameter in the digits above, read right to left:
//!
//! ```text
//!   1002
//!   ││└┴─ opcode 02 (MUL)
//!   │└─── parameter 1: position
//!   └──── parameter 2: immediate (parameter 3 absent, defaults to position)
//! ```

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{Instruction, MAX_PARAMS};
use crate::virtual_machine::memory::Memory;

/// Addressing mode of a single parameter.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Mode {
    /// The raw value is an address to dereference.
    #[default]
    Position = 0,
    /// The raw value is the operand itself.
    Immediate = 1,
}

impl Mode {
    fn from_digit(digit: i64, param: usize) -> Result<Self, VMError> {
        match digit {
            0 => Ok(Mode::Position),
            1 => Ok(Mode::Immediate),
            _ => Err(VMError::InvalidAddressingMode { mode: digit, param }),
        }
    }
}

/// An instruction together with the addressing mode of each parameter.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Decoded {
    pub instruction: Instruction,
    modes: [Mode; MAX_PARAMS],
}

impl Decoded {
    /// Modes for the instruction's parameters, one per parameter.
    pub fn modes(&self) -> &[Mode] {
        &self.modes[..self.instruction.param_count()]
    }

    /// Mode of parameter `index` (0-based). `index` must be below
    /// [`MAX_PARAMS`]; callers outside the engine use [`Decoded::modes`].
    pub(crate) fn mode(&self, index: usize) -> Mode {
        self.modes[index]
    }
}

/// Decodes a raw memory cell into an instruction and its parameter modes.
///
/// Mode digits past the instruction's parameter count are ignored.
pub fn decode(raw: i64) -> Result<Decoded, VMError> {
    if raw < 0 {
        return Err(VMError::InvalidOpcode { opcode: raw });
    }
    let instruction = Instruction::try_from(raw % 100)?;

    let mut modes = [Mode::Position; MAX_PARAMS];
    let mut digits = raw / 100;
    for (param, slot) in modes
        .iter_mut()
        .take(instruction.param_count())
        .enumerate()
    {
        *slot = Mode::from_digit(digits % 10, param + 1)?;
        digits /= 10;
    }

    Ok(Decoded { instruction, modes })
}

/// Resolves a read-class parameter to its operand value.
pub fn resolve(mode: Mode, raw: i64, memory: &Memory) -> Result<i64, VMError> {
    match mode {
        Mode::Position => memory.get(raw),
        Mode::Immediate => Ok(raw),
    }
}

/// Validates a write-class parameter and returns the destination address.
///
/// Destinations are never dereferenced; immediate mode is rejected.
pub fn write_target(mode: Mode, raw: i64, param: usize) -> Result<i64, VMError> {
    match mode {
        Mode::Position => Ok(raw),
        Mode::Immediate => Err(VMError::InvalidAddressingMode {
            mode: Mode::Immediate as i64,
            param,
        }),
    }
}
