//! Intcode virtual machine.
//!
//! Programs are flat sequences of signed 64-bit integers that double as the
//! machine's memory. The VM fetches the encoded opcode at the program counter,
//! decodes the instruction and its parameter modes, resolves operands, and
//! executes until it halts or faults.
//!
//! # Architecture
//!
//! - **Memory**: fixed-length `i64` cells, bounds-checked on every access
//! - **Addressing modes**: position (dereference) and immediate (literal)
//! - **Instruction set**: add, multiply, input, output, two conditional
//!   jumps, two comparisons, and halt
//! - **Execution model**: explicit `Running`/`Halted`/`Faulted` status; the
//!   only suspension point is input, pulled from an [`io::IoPort`]
//!
//! # Modules
//!
//! - [`errors`]: Execution error and fault types
//! - [`io`]: I/O port trait plus queue and console adapters
//! - [`isa`]: Instruction set definition and opcode mappings
//! - [`memory`]: Program parsing and bounds-checked memory
//! - [`operand`]: Opcode decoding and operand resolution
//! - [`vm`]: The execution engine

pub mod errors;
pub mod io;
pub mod isa;
pub mod memory;
pub mod operand;
pub mod vm;
