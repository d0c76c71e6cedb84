//! Intcode virtual machine library.
//!
//! Provides the Intcode VM, its I/O ports, caller-side run helpers, and logging.

pub mod harness;
pub mod utils;
pub mod virtual_machine;

pub use virtual_machine::errors::{Fault, VMError};
pub use virtual_machine::io::{ConsolePort, IoPort, QueuePort};
pub use virtual_machine::vm::{EngineState, Status, VM};
