//! Caller-side helpers that seed memory and drive VM instances.
//!
//! Each helper builds fresh, independent engines from program text; nothing
//! here shares memory between runs.

use crate::virtual_machine::errors::{Fault, VMError};
use crate::virtual_machine::io::{IoPort, QueuePort};
use crate::virtual_machine::vm::VM;

/// A single `(address, value)` memory patch applied before execution.
pub type Patch = (i64, i64);

/// Memory cells patched by the noun/verb search.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SearchSpace {
    /// Largest noun and verb value tried (inclusive).
    pub max: i64,
    pub noun_addr: i64,
    pub verb_addr: i64,
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            max: 99,
            noun_addr: 1,
            verb_addr: 2,
        }
    }
}

/// Builds a VM and applies `patches` in order, without running it.
pub fn prepare<P: IoPort>(program: &str, patches: &[Patch], port: P) -> Result<VM<P>, Fault> {
    let mut vm = VM::new(program, port).map_err(|reason| Fault {
        reason,
        pc: 0,
        memory: Vec::new(),
    })?;
    for &(addr, value) in patches {
        vm.set_memory(addr, value).map_err(|reason| Fault {
            reason,
            pc: 0,
            memory: vm.memory().to_vec(),
        })?;
    }
    Ok(vm)
}

/// Builds a VM, applies `patches` in order, and runs it to completion.
///
/// Returns the halted VM so the caller can inspect memory and the port.
pub fn run_with_patches<P: IoPort>(
    program: &str,
    patches: &[Patch],
    port: P,
) -> Result<VM<P>, Fault> {
    let mut vm = prepare(program, patches, port)?;
    vm.run()?;
    Ok(vm)
}

/// Finds the first `(noun, verb)` pair for which the program halts with
/// `target` in memory cell 0.
///
/// Pairs are tried noun-major from `(0, 0)` on fresh VMs. Candidates that fault
/// are skipped; a program that does not parse, or patch addresses outside
/// memory, fail immediately.
pub fn find_noun_verb(
    program: &str,
    target: i64,
    space: SearchSpace,
) -> Result<Option<(i64, i64)>, VMError> {
    let template = VM::new(program, QueuePort::default())?;
    template.get_memory(space.noun_addr)?;
    template.get_memory(space.verb_addr)?;
    let memory = template.memory().clone();

    for noun in 0..=space.max {
        for verb in 0..=space.max {
            let mut vm = VM::with_memory(memory.clone(), QueuePort::default());
            vm.set_memory(space.noun_addr, noun)?;
            vm.set_memory(space.verb_addr, verb)?;
            if vm.run().is_ok() && vm.get_memory(0)? == target {
                return Ok(Some((noun, verb)));
            }
        }
    }
    Ok(None)
}
