//! Core virtual machine implementation.
//!
//! The VM owns a flat [`Memory`] and a program counter and runs a classic
//! fetch/decode/execute cycle. Handlers never touch the program counter
//! themselves: they return a [`Flow`] and the engine applies exactly one pc
//! update per step. All arithmetic uses wrapping semantics to prevent overflow
//! panics.

use crate::virtual_machine::errors::{Fault, VMError};
use crate::virtual_machine::io::IoPort;
use crate::virtual_machine::isa::Instruction;
use crate::virtual_machine::memory::Memory;
use crate::virtual_machine::operand::{Decoded, Mode, decode, resolve, write_target};
use std::fmt;

#[cfg(test)]
mod tests;

/// Lifecycle status of an engine.
///
/// `Halted` and `Faulted` are terminal: once reached, the status never changes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Status {
    Running,
    /// Reached `HALT`.
    Halted,
    /// Stopped on an error; the reason is kept for diagnosis.
    Faulted(VMError),
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Status::Running)
    }
}

/// Memory, program counter, and status of one engine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EngineState {
    memory: Memory,
    pc: usize,
    status: Status,
}

impl EngineState {
    fn new(memory: Memory) -> Self {
        Self {
            memory,
            pc: 0,
            status: Status::Running,
        }
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Address of the next instruction, or of the faulting/halting one.
    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn status(&self) -> &Status {
        &self.status
    }
}

/// Program counter update requested by a handler.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Flow {
    /// Continue with the next instruction.
    Advance,
    /// Continue at the given address.
    Jump(i64),
    /// Stop; the pc stays on the halting instruction.
    Halt,
}

macro_rules! exec_vm {
    // Entry point
    (
        vm = $vm:ident,
        decoded = $decoded:ident,
        { $( $variant:ident => $handler:ident ( $( $field:ident : $kind:ident ),* $(,)? ) ),* $(,)? }
    ) => {{
        match $decoded.instruction {
            $(
                Instruction::$variant => {
                    exec_vm!(@call $vm, $decoded, $handler, [], 0usize, $( $field : $kind ),*)
                }
            ),*
        }
    }};

    // All operands bound, invoke the handler
    (@call $vm:ident, $decoded:ident, $handler:ident, [ $( $bound:ident ),* ], $idx:expr, ) => {{
        $vm.$handler($( $bound ),*)
    }};

    // Bind the next operand and recurse
    (@call $vm:ident, $decoded:ident, $handler:ident, [ $( $bound:ident ),* ], $idx:expr,
        $field:ident : $kind:ident $(, $rest:ident : $rest_kind:ident )*
    ) => {{
        let $field = exec_vm!(@operand $vm, $decoded, $idx, $kind)?;
        exec_vm!(@call $vm, $decoded, $handler, [ $( $bound, )* $field ], $idx + 1, $( $rest : $rest_kind ),*)
    }};

    // Value operand, dereferenced according to its mode
    (@operand $vm:ident, $decoded:ident, $idx:expr, Read) => {{
        let raw = $vm.fetch(1 + $idx)?;
        resolve($decoded.mode($idx), raw, &$vm.state.memory)
    }};

    // Destination address, never dereferenced
    (@operand $vm:ident, $decoded:ident, $idx:expr, Write) => {{
        let raw = $vm.fetch(1 + $idx)?;
        write_target($decoded.mode($idx), raw, $idx + 1)
    }};
}

/// Intcode virtual machine.
///
/// Owns its memory exclusively; independent instances never share state. The
/// I/O port is owned as well, or borrowed when `P` is `&mut SomePort`, and is
/// released when the VM is dropped regardless of how execution ended.
pub struct VM<P: IoPort> {
    state: EngineState,
    port: P,
}

impl<P: IoPort> fmt::Debug for VM<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VM").field("state", &self.state).finish_non_exhaustive()
    }
}

impl<P: IoPort> VM<P> {
    /// Creates a VM from comma-separated program text, e.g. `"1,0,0,0,99"`.
    pub fn new(program: &str, port: P) -> Result<Self, VMError> {
        Ok(Self::with_memory(Memory::parse(program)?, port))
    }

    /// Creates a VM over already-parsed memory.
    pub fn with_memory(memory: Memory, port: P) -> Self {
        Self {
            state: EngineState::new(memory),
            port,
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn status(&self) -> &Status {
        &self.state.status
    }

    pub fn pc(&self) -> usize {
        self.state.pc
    }

    pub fn memory(&self) -> &Memory {
        &self.state.memory
    }

    /// Reads memory at `address`; used by callers inspecting results.
    pub fn get_memory(&self, address: i64) -> Result<i64, VMError> {
        self.state.memory.get(address)
    }

    /// Writes memory at `address`; used by callers seeding a program.
    pub fn set_memory(&mut self, address: i64, value: i64) -> Result<(), VMError> {
        self.state.memory.set(address, value)
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn into_port(self) -> P {
        self.port
    }

    /// Decodes the instruction at the program counter without executing it.
    pub fn current_instruction(&self) -> Result<Decoded, VMError> {
        decode(self.fetch(0)?)
    }

    /// Renders the instruction at the program counter, e.g. `MUL [4], 3, [4]`.
    ///
    /// Position operands are shown in brackets, immediates bare.
    pub fn describe_current(&self) -> Result<String, VMError> {
        let decoded = self.current_instruction()?;
        let mut out = decoded.instruction.mnemonic().to_string();
        for (idx, mode) in decoded.modes().iter().enumerate() {
            let raw = self.fetch(1 + idx)?;
            let sep = if idx == 0 { " " } else { ", " };
            out.push_str(&match mode {
                Mode::Position => format!("{sep}[{raw}]"),
                Mode::Immediate => format!("{sep}{raw}"),
            });
        }
        Ok(out)
    }

    /// Executes a single instruction and returns the resulting status.
    ///
    /// On failure the VM moves to [`Status::Faulted`] and the reason is
    /// returned; memory and pc are left exactly as they were at the fault.
    /// Stepping a halted or faulted VM fails with [`VMError::AlreadyTerminated`]
    /// and changes nothing.
    pub fn step(&mut self) -> Result<Status, VMError> {
        if self.state.status.is_terminal() {
            return Err(VMError::AlreadyTerminated);
        }
        match self.cycle() {
            Ok(()) => Ok(self.state.status.clone()),
            Err(err) => {
                self.state.status = Status::Faulted(err.clone());
                Err(err)
            }
        }
    }

    /// Steps until the VM halts or faults.
    ///
    /// Returns the final state on halt, or a [`Fault`] carrying the reason, the
    /// pc of the faulting instruction, and a snapshot of memory.
    pub fn run(&mut self) -> Result<&EngineState, Fault> {
        loop {
            match self.step() {
                Ok(Status::Running) => {}
                Ok(_) => return Ok(&self.state),
                Err(reason) => {
                    return Err(Fault {
                        reason,
                        pc: self.state.pc,
                        memory: self.state.memory.to_vec(),
                    });
                }
            }
        }
    }

    /// Reads the cell `offset` cells past the program counter.
    fn fetch(&self, offset: usize) -> Result<i64, VMError> {
        let address = self.state.pc.saturating_add(offset);
        self.state.memory.get(address as i64)
    }

    fn cycle(&mut self) -> Result<(), VMError> {
        let pc = self.state.pc;
        let decoded = self.current_instruction()?;

        let width = decoded.instruction.width();
        if pc + width > self.state.memory.len() {
            return Err(VMError::OutOfBounds {
                address: (pc + width - 1) as i64,
                len: self.state.memory.len(),
            });
        }

        match self.exec(&decoded)? {
            Flow::Advance => self.state.pc = pc + width,
            Flow::Jump(target) => {
                self.state.pc = usize::try_from(target).map_err(|_| VMError::OutOfBounds {
                    address: target,
                    len: self.state.memory.len(),
                })?;
            }
            Flow::Halt => self.state.status = Status::Halted,
        }
        Ok(())
    }

    /// Resolves operands and runs the handler for one decoded instruction.
    fn exec(&mut self, decoded: &Decoded) -> Result<Flow, VMError> {
        exec_vm! {
            vm = self,
            decoded = decoded,
            {
                // Arithmetic
                Add => op_add(a: Read, b: Read, dst: Write),
                Mul => op_mul(a: Read, b: Read, dst: Write),
                // I/O
                Input => op_input(dst: Write),
                Output => op_output(a: Read),
                // Control flow
                JumpIfTrue => op_jump_if_true(cond: Read, target: Read),
                JumpIfFalse => op_jump_if_false(cond: Read, target: Read),
                // Comparison
                LessThan => op_less_than(a: Read, b: Read, dst: Write),
                Equals => op_equals(a: Read, b: Read, dst: Write),
                Halt => op_halt(),
            }
        }
    }

    fn op_add(&mut self, a: i64, b: i64, dst: i64) -> Result<Flow, VMError> {
        self.state.memory.set(dst, a.wrapping_add(b))?;
        Ok(Flow::Advance)
    }

    fn op_mul(&mut self, a: i64, b: i64, dst: i64) -> Result<Flow, VMError> {
        self.state.memory.set(dst, a.wrapping_mul(b))?;
        Ok(Flow::Advance)
    }

    fn op_input(&mut self, dst: i64) -> Result<Flow, VMError> {
        // Check the destination first so a bad address does not consume input.
        self.state.memory.get(dst)?;
        let value = self.port.read()?;
        self.state.memory.set(dst, value)?;
        Ok(Flow::Advance)
    }

    fn op_output(&mut self, a: i64) -> Result<Flow, VMError> {
        self.port.write(a)?;
        Ok(Flow::Advance)
    }

    fn op_jump_if_true(&mut self, cond: i64, target: i64) -> Result<Flow, VMError> {
        Ok(if cond != 0 {
            Flow::Jump(target)
        } else {
            Flow::Advance
        })
    }

    fn op_jump_if_false(&mut self, cond: i64, target: i64) -> Result<Flow, VMError> {
        Ok(if cond == 0 {
            Flow::Jump(target)
        } else {
            Flow::Advance
        })
    }

    fn op_less_than(&mut self, a: i64, b: i64, dst: i64) -> Result<Flow, VMError> {
        self.state.memory.set(dst, i64::from(a < b))?;
        Ok(Flow::Advance)
    }

    fn op_equals(&mut self, a: i64, b: i64, dst: i64) -> Result<Flow, VMError> {
        self.state.memory.set(dst, i64::from(a == b))?;
        Ok(Flow::Advance)
    }

    fn op_halt(&mut self) -> Result<Flow, VMError> {
        Ok(Flow::Halt)
    }
}
