//! Flat, fixed-size VM memory.

use crate::virtual_machine::errors::VMError;
use std::str::FromStr;

/// Program memory: a fixed-length array of signed 64-bit cells.
///
/// The length is set once from the program text and never changes; every
/// access is bounds-checked against it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Memory {
    cells: Vec<i64>,
}

impl Memory {
    /// Parses comma-separated decimal integers, e.g. `"1,0,0,0,99"`.
    ///
    /// Whitespace around each token is ignored so a program file with a
    /// trailing newline loads unchanged.
    pub fn parse(text: &str) -> Result<Self, VMError> {
        let cells = text
            .split(',')
            .enumerate()
            .map(|(index, token)| {
                let token = token.trim();
                token.parse::<i64>().map_err(|_| VMError::ParseError {
                    index,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { cells })
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Reads the cell at `address`.
    pub fn get(&self, address: i64) -> Result<i64, VMError> {
        let idx = self.index(address)?;
        Ok(self.cells[idx])
    }

    /// Overwrites the cell at `address`.
    pub fn set(&mut self, address: i64, value: i64) -> Result<(), VMError> {
        let idx = self.index(address)?;
        self.cells[idx] = value;
        Ok(())
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.cells
    }

    pub fn to_vec(&self) -> Vec<i64> {
        self.cells.clone()
    }

    fn index(&self, address: i64) -> Result<usize, VMError> {
        usize::try_from(address)
            .ok()
            .filter(|idx| *idx < self.cells.len())
            .ok_or(VMError::OutOfBounds {
                address,
                len: self.cells.len(),
            })
    }
}

impl From<Vec<i64>> for Memory {
    fn from(cells: Vec<i64>) -> Self {
        Self { cells }
    }
}

impl FromStr for Memory {
    type Err = VMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Memory::parse(s)
    }
}
