use super::*;
use crate::virtual_machine::io::QueuePort;
use proptest::prelude::*;

/// Day-5 style program: outputs 999 if input < 8, 1000 if == 8, 1001 if > 8.
const COMPARE_TO_EIGHT: &str = "3,21,1008,21,8,20,1005,20,22,107,8,21,20,1006,20,31,\
    1106,0,36,98,0,0,1002,21,125,20,4,20,1105,1,46,104,999,1105,1,46,1101,1000,1,\
    20,4,20,1105,1,46,98,99";

fn vm(source: &str) -> VM<QueuePort> {
    VM::new(source, QueuePort::default()).expect("parse failed")
}

fn run_vm(source: &str) -> VM<QueuePort> {
    let mut vm = vm(source);
    vm.run().expect("vm run failed");
    vm
}

fn run_and_get_memory(source: &str) -> Vec<i64> {
    run_vm(source).memory().to_vec()
}

fn run_with_input(source: &str, input: &[i64]) -> Vec<i64> {
    let mut vm = VM::new(source, QueuePort::new(input.iter().copied())).expect("parse failed");
    vm.run().expect("vm run failed");
    vm.into_port().into_output()
}

fn run_expect_fault(source: &str) -> Fault {
    vm(source).run().expect_err("expected fault")
}

fn program(cells: Vec<i64>) -> VM<QueuePort> {
    VM::with_memory(Memory::from(cells), QueuePort::default())
}

// ==================== Construction ====================

#[test]
fn new_vm_starts_running_at_zero() {
    let vm = vm("1,0,0,0,99");
    assert_eq!(vm.memory().as_slice(), &[1, 0, 0, 0, 99]);
    assert_eq!(vm.pc(), 0);
    assert_eq!(vm.status(), &Status::Running);
}

#[test]
fn new_vm_rejects_bad_text() {
    assert!(matches!(
        VM::new("1,0,x", QueuePort::default()),
        Err(VMError::ParseError { index: 2, .. })
    ));
}

// ==================== Arithmetic ====================

#[test]
fn add_program() {
    let vm = run_vm("1,0,0,0,99");
    assert_eq!(vm.memory().as_slice(), &[2, 0, 0, 0, 99]);
    assert_eq!(vm.status(), &Status::Halted);
    assert_eq!(vm.pc(), 4);
}

#[test]
fn mul_programs() {
    assert_eq!(run_and_get_memory("2,3,0,3,99"), vec![2, 3, 0, 6, 99]);
    assert_eq!(run_and_get_memory("2,4,4,5,99,0"), vec![2, 4, 4, 5, 99, 9801]);
    assert_eq!(
        run_and_get_memory("1,1,1,4,99,5,6,0,99"),
        vec![30, 1, 1, 4, 2, 5, 6, 0, 99]
    );
}

#[test]
fn mul_with_immediate_mode() {
    let memory = run_and_get_memory("1002,4,3,4,33");
    assert_eq!(memory[4], 99);
}

#[test]
fn add_with_negative_immediate() {
    assert_eq!(run_and_get_memory("1101,100,-1,4,0"), vec![1101, 100, -1, 4, 99]);
}

#[test]
fn end_to_end() {
    let memory = run_and_get_memory("1,9,10,3,2,3,11,0,99,30,40,50");
    assert_eq!(memory[0], 3500);
    assert_eq!(memory[3], 70);
}

#[test]
fn arithmetic_wraps_on_overflow() {
    let mut vm = program(vec![1101, i64::MAX, 1, 0, 1102, i64::MIN, -1, 1, 99]);
    vm.run().unwrap();
    assert_eq!(vm.get_memory(0), Ok(i64::MIN));
    assert_eq!(vm.get_memory(1), Ok(i64::MIN));
}

#[test]
fn large_values() {
    assert_eq!(
        run_with_input("1102,34915192,34915192,7,4,7,99,0", &[]),
        vec![1_219_070_632_396_864]
    );
    assert_eq!(
        run_with_input("104,1125899906842624,99", &[]),
        vec![1_125_899_906_842_624]
    );
}

// ==================== I/O ====================

#[test]
fn echo_input_to_output() {
    assert_eq!(run_with_input("3,0,4,0,99", &[-37]), vec![-37]);
}

#[test]
fn input_exhausted_faults() {
    let fault = run_expect_fault("3,0,99");
    assert_eq!(fault.reason, VMError::InputExhausted);
    assert_eq!(fault.pc, 0);
    assert_eq!(fault.memory, vec![3, 0, 99]);
}

#[test]
fn input_to_bad_address_keeps_value_queued() {
    let mut vm = VM::new("3,50,99", QueuePort::new([5])).unwrap();
    let fault = vm.run().unwrap_err();
    assert_eq!(fault.reason, VMError::OutOfBounds { address: 50, len: 3 });
    assert_eq!(vm.port().remaining_input(), 1);
}

#[test]
fn borrowed_port_outlives_vm() {
    let mut port = QueuePort::new([8]);
    {
        let mut vm = VM::new(COMPARE_TO_EIGHT, &mut port).unwrap();
        vm.run().unwrap();
    }
    assert_eq!(port.output(), &[1000]);
    assert_eq!(port.remaining_input(), 0);
}

#[test]
fn refilled_port_runs_on_fresh_vm() {
    let mut port = QueuePort::default();
    let fault = VM::new("3,0,4,0,99", &mut port).unwrap().run().unwrap_err();
    assert_eq!(fault.reason, VMError::InputExhausted);

    port.push_input(11);
    VM::new("3,0,4,0,99", &mut port).unwrap().run().unwrap();
    assert_eq!(port.output(), &[11]);
}

#[test]
fn port_topped_up_between_steps() {
    let mut vm = VM::new("3,0,3,1,99", QueuePort::new([7])).unwrap();
    assert_eq!(vm.step(), Ok(Status::Running));
    assert_eq!(vm.port().remaining_input(), 0);

    vm.port_mut().push_input(8);
    assert_eq!(vm.step(), Ok(Status::Running));
    assert_eq!(vm.step(), Ok(Status::Halted));
    assert_eq!(vm.memory().as_slice(), &[7, 8, 3, 1, 99]);
}

// ==================== Comparison ====================

#[test]
fn equals_eight_position_mode() {
    let source = "3,9,8,9,10,9,4,9,99,-1,8";
    assert_eq!(run_with_input(source, &[8]), vec![1]);
    assert_eq!(run_with_input(source, &[7]), vec![0]);
}

#[test]
fn less_than_eight_position_mode() {
    let source = "3,9,7,9,10,9,4,9,99,-1,8";
    assert_eq!(run_with_input(source, &[7]), vec![1]);
    assert_eq!(run_with_input(source, &[8]), vec![0]);
}

#[test]
fn equals_eight_immediate_mode() {
    let source = "3,3,1108,-1,8,3,4,3,99";
    assert_eq!(run_with_input(source, &[8]), vec![1]);
    assert_eq!(run_with_input(source, &[-8]), vec![0]);
}

#[test]
fn less_than_eight_immediate_mode() {
    let source = "3,3,1107,-1,8,3,4,3,99";
    assert_eq!(run_with_input(source, &[-100]), vec![1]);
    assert_eq!(run_with_input(source, &[9]), vec![0]);
}

#[test]
fn compare_to_eight() {
    assert_eq!(run_with_input(COMPARE_TO_EIGHT, &[7]), vec![999]);
    assert_eq!(run_with_input(COMPARE_TO_EIGHT, &[8]), vec![1000]);
    assert_eq!(run_with_input(COMPARE_TO_EIGHT, &[9]), vec![1001]);
}

// ==================== Control Flow ====================

#[test]
fn jump_if_true_skips_instructions() {
    // The ADD at 3..7 would overwrite memory[0] if it ran.
    let memory = run_and_get_memory("1105,1,7,1101,5,5,0,99");
    assert_eq!(memory[0], 1105);
}

#[test]
fn jump_if_true_falls_through() {
    let memory = run_and_get_memory("1105,0,7,1101,5,5,0,99");
    assert_eq!(memory[0], 10);
}

#[test]
fn jump_if_true_lands_on_target() {
    let mut vm = vm("1105,1,4,99,1105,1,4,99");
    let before = vm.memory().clone();
    assert_eq!(vm.step(), Ok(Status::Running));
    assert_eq!(vm.pc(), 4);
    assert_eq!(vm.step(), Ok(Status::Running));
    assert_eq!(vm.pc(), 4);
    assert_eq!(vm.memory(), &before);
}

#[test]
fn jump_if_false_skips_instructions() {
    let memory = run_and_get_memory("1106,0,7,1101,5,5,0,99");
    assert_eq!(memory[0], 1106);
    let memory = run_and_get_memory("1106,3,7,1101,5,5,0,99");
    assert_eq!(memory[0], 10);
}

#[test]
fn jump_tests_position_mode() {
    let source = "3,12,6,12,15,1,13,14,13,4,13,99,-1,0,1,9";
    assert_eq!(run_with_input(source, &[0]), vec![0]);
    assert_eq!(run_with_input(source, &[5]), vec![1]);
}

#[test]
fn jump_tests_immediate_mode() {
    let source = "3,3,1105,-1,9,1101,0,0,12,4,12,99,1";
    assert_eq!(run_with_input(source, &[0]), vec![0]);
    assert_eq!(run_with_input(source, &[-3]), vec![1]);
}

#[test]
fn jump_to_negative_target_faults_in_place() {
    let fault = run_expect_fault("1105,1,-1");
    assert_eq!(fault.reason, VMError::OutOfBounds { address: -1, len: 3 });
    assert_eq!(fault.pc, 0);
}

#[test]
fn jump_past_end_faults_on_next_fetch() {
    let mut vm = vm("1105,1,50,99");
    assert_eq!(vm.step(), Ok(Status::Running));
    assert_eq!(vm.pc(), 50);
    assert_eq!(vm.step(), Err(VMError::OutOfBounds { address: 50, len: 4 }));
    assert_eq!(
        vm.status(),
        &Status::Faulted(VMError::OutOfBounds { address: 50, len: 4 })
    );
}

// ==================== Stepping / Termination ====================

#[test]
fn step_reports_status() {
    let mut vm = vm("1101,1,1,5,99,0");
    assert_eq!(vm.step(), Ok(Status::Running));
    assert_eq!(vm.get_memory(5), Ok(2));
    assert_eq!(vm.step(), Ok(Status::Halted));
    assert_eq!(vm.pc(), 4);
}

#[test]
fn step_after_halt_is_rejected() {
    let mut vm = run_vm("1,0,0,0,99");
    let before = vm.memory().clone();
    assert_eq!(vm.step(), Err(VMError::AlreadyTerminated));
    assert_eq!(vm.step(), Err(VMError::AlreadyTerminated));
    assert_eq!(vm.memory(), &before);
    assert_eq!(vm.status(), &Status::Halted);
    assert_eq!(vm.pc(), 4);
}

#[test]
fn run_after_halt_is_rejected() {
    let mut vm = run_vm("1,0,0,0,99");
    let fault = vm.run().unwrap_err();
    assert_eq!(fault.reason, VMError::AlreadyTerminated);
    assert_eq!(fault.memory, vec![2, 0, 0, 0, 99]);
    assert_eq!(vm.status(), &Status::Halted);
}

#[test]
fn step_after_fault_keeps_reason() {
    let mut vm = vm("42");
    assert_eq!(vm.step(), Err(VMError::InvalidOpcode { opcode: 42 }));
    assert_eq!(vm.step(), Err(VMError::AlreadyTerminated));
    assert_eq!(
        vm.status(),
        &Status::Faulted(VMError::InvalidOpcode { opcode: 42 })
    );
}

#[test]
fn run_returns_final_state() {
    let mut vm = vm("1,0,0,0,99");
    let state = vm.run().unwrap();
    assert_eq!(state.status(), &Status::Halted);
    assert_eq!(state.pc(), 4);
    assert_eq!(state.memory().get(0), Ok(2));
}

// ==================== Faults ====================

#[test]
fn invalid_opcode_faults() {
    let fault = run_expect_fault("1,0,0,0,42");
    assert_eq!(fault.reason, VMError::InvalidOpcode { opcode: 42 });
    assert_eq!(fault.pc, 4);
    assert_eq!(fault.memory, vec![2, 0, 0, 0, 42]);
}

#[test]
fn running_off_the_end_faults() {
    let fault = run_expect_fault("1,0,0,0");
    assert_eq!(fault.reason, VMError::OutOfBounds { address: 4, len: 4 });
    assert_eq!(fault.pc, 4);
}

#[test]
fn truncated_instruction_faults() {
    let fault = run_expect_fault("1,0,0");
    assert_eq!(fault.reason, VMError::OutOfBounds { address: 3, len: 3 });
    assert_eq!(fault.pc, 0);
    assert_eq!(fault.memory, vec![1, 0, 0]);
}

#[test]
fn operand_out_of_bounds_faults() {
    let fault = run_expect_fault("1,100,0,0,99");
    assert_eq!(fault.reason, VMError::OutOfBounds { address: 100, len: 5 });
    let fault = run_expect_fault("1,0,0,-3,99");
    assert_eq!(fault.reason, VMError::OutOfBounds { address: -3, len: 5 });
}

#[test]
fn immediate_write_target_is_rejected() {
    let fault = run_expect_fault("11101,1,1,0,99");
    assert_eq!(
        fault.reason,
        VMError::InvalidAddressingMode { mode: 1, param: 3 }
    );
    assert_eq!(fault.memory, vec![11101, 1, 1, 0, 99]);

    let fault = run_expect_fault("103,0,99");
    assert_eq!(
        fault.reason,
        VMError::InvalidAddressingMode { mode: 1, param: 1 }
    );
}

#[test]
fn unknown_mode_digit_is_rejected() {
    let fault = run_expect_fault("201,0,0,0,99");
    assert_eq!(
        fault.reason,
        VMError::InvalidAddressingMode { mode: 2, param: 1 }
    );
}

#[test]
fn fault_keeps_memory_as_last_written() {
    let fault = run_expect_fault("1101,2,3,0,42");
    assert_eq!(fault.memory, vec![5, 2, 3, 0, 42]);
    assert_eq!(fault.pc, 4);
}

// ==================== Memory Access ====================

#[test]
fn seeded_memory_changes_result() {
    let mut vm = vm("1,0,0,0,99");
    vm.set_memory(1, 4).unwrap();
    vm.set_memory(2, 4).unwrap();
    vm.run().unwrap();
    assert_eq!(vm.get_memory(0), Ok(198));
}

#[test]
fn independent_instances_do_not_alias() {
    let source = "1,0,0,0,99";
    let mut first = vm(source);
    let second = vm(source);
    first.run().unwrap();
    assert_eq!(first.get_memory(0), Ok(2));
    assert_eq!(second.get_memory(0), Ok(1));
}

#[test]
fn describe_current_instruction() {
    let mut vm = vm("1002,4,3,4,33");
    assert_eq!(vm.describe_current().unwrap(), "MUL [4], 3, [4]");
    vm.run().unwrap();
    assert_eq!(vm.describe_current().unwrap(), "HALT");
}

#[test]
fn debug_shows_engine_state() {
    let vm = vm("1,0,0,0,99");
    let text = format!("{vm:?}");
    assert!(text.starts_with("VM"));
    assert!(text.contains("pc: 0"));
    assert!(text.contains("Running"));
}

#[test]
fn current_instruction_decodes_without_executing() {
    let vm = vm("1105,1,4,99,1105");
    let decoded = vm.current_instruction().unwrap();
    assert_eq!(decoded.instruction, Instruction::JumpIfTrue);
    assert_eq!(vm.pc(), 0);
    assert_eq!(vm.status(), &Status::Running);
}

// ==================== Properties ====================

proptest! {
    /// LT and EQ only ever store 0 or 1.
    #[test]
    fn prop_comparisons_store_booleans(a in any::<i64>(), b in any::<i64>()) {
        let mut vm = program(vec![1107, a, b, 9, 1108, a, b, 10, 99, -5, -5]);
        vm.run().unwrap();
        prop_assert_eq!(vm.get_memory(9).unwrap(), i64::from(a < b));
        prop_assert_eq!(vm.get_memory(10).unwrap(), i64::from(a == b));
    }

    /// Position-mode comparisons agree with immediate-mode ones.
    #[test]
    fn prop_comparisons_position_mode(a in -1000i64..1000, b in -1000i64..1000) {
        let mut vm = program(vec![7, 9, 10, 11, 8, 9, 10, 12, 99, a, b, 7, 7]);
        vm.run().unwrap();
        prop_assert_eq!(vm.get_memory(11).unwrap(), i64::from(a < b));
        prop_assert_eq!(vm.get_memory(12).unwrap(), i64::from(a == b));
    }

    /// Every address outside the memory extent is rejected.
    #[test]
    fn prop_out_of_bounds_rejected(len in 1usize..64, address in any::<i64>()) {
        prop_assume!(address < 0 || address >= len as i64);
        let mut vm = program(vec![0; len]);
        let expected = VMError::OutOfBounds { address, len };
        prop_assert_eq!(vm.get_memory(address), Err(expected.clone()));
        prop_assert_eq!(vm.set_memory(address, 1), Err(expected));
        prop_assert!(vm.memory().as_slice().iter().all(|c| *c == 0));
    }

    /// Same program and input always produce the same memory and output.
    #[test]
    fn prop_runs_are_deterministic(input in any::<i64>()) {
        let first = {
            let mut vm = VM::new(COMPARE_TO_EIGHT, QueuePort::new([input])).unwrap();
            vm.run().unwrap();
            (vm.memory().to_vec(), vm.into_port().into_output())
        };
        let second = {
            let mut vm = VM::new(COMPARE_TO_EIGHT, QueuePort::new([input])).unwrap();
            vm.run().unwrap();
            (vm.memory().to_vec(), vm.into_port().into_output())
        };
        prop_assert_eq!(&first, &second);
        let expected = match input.cmp(&8) {
            std::cmp::Ordering::Less => 999,
            std::cmp::Ordering::Equal => 1000,
            std::cmp::Ordering::Greater => 1001,
        };
        prop_assert_eq!(first.1, vec![expected]);
    }
}
