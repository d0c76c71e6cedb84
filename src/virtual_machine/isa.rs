//! Instruction Set Architecture (ISA) definitions.
//!
//! The [`for_each_instruction!`](crate::for_each_instruction) macro holds the
//! canonical instruction list and hands it to a callback macro, so the table is
//! written once and every consumer expands from the same source.
//!
//! This module generates:
//! - The [`Instruction`] enum with its opcode mapping
//! - `TryFrom<i64>` for decoding opcodes
//! - Parameter metadata ([`ParamKind`]) and mnemonics
//!
//! # Encoding
//!
//! An instruction occupies `1 + param_count` consecutive memory cells: the
//! encoded opcode followed by its raw parameters. The two low decimal digits of
//! the encoded opcode select the instruction, higher digits carry addressing
//! modes (see [`operand`](super::operand)).

use crate::virtual_machine::errors::VMError;

/// Largest parameter count of any instruction.
pub const MAX_PARAMS: usize = 3;

/// Role of an instruction parameter.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ParamKind {
    /// Value operand, resolved through its addressing mode.
    Read,
    /// Destination address, always used as-is.
    Write,
}

/// Invokes a callback macro with the complete instruction definition list.
#[macro_export]
macro_rules! for_each_instruction {
    ($callback:ident) => {
        $callback! {
            /// ADD a, b, dst ; dst = a + b
            Add = 1, "ADD" => [a: Read, b: Read, dst: Write],
            /// MUL a, b, dst ; dst = a * b
            Mul = 2, "MUL" => [a: Read, b: Read, dst: Write],
            /// IN dst ; dst = next input value
            Input = 3, "IN" => [dst: Write],
            /// OUT a ; emit a
            Output = 4, "OUT" => [a: Read],
            /// JNZ cond, target ; if cond != 0 then PC = target
            JumpIfTrue = 5, "JNZ" => [cond: Read, target: Read],
            /// JZ cond, target ; if cond == 0 then PC = target
            JumpIfFalse = 6, "JZ" => [cond: Read, target: Read],
            /// LT a, b, dst ; dst = (a < b) ? 1 : 0
            LessThan = 7, "LT" => [a: Read, b: Read, dst: Write],
            /// EQ a, b, dst ; dst = (a == b) ? 1 : 0
            Equals = 8, "EQ" => [a: Read, b: Read, dst: Write],
            /// HALT ; stop execution
            Halt = 99, "HALT" => [],
        }
    };
}

#[macro_export]
macro_rules! define_instructions {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $opcode:literal, $mnemonic:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ]
        ),* $(,)?
    ) => {
        #[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
        #[repr(u8)]
        pub enum Instruction {
            $(
                $(#[$doc])*
                $name = $opcode,
            )*
        }

        impl TryFrom<i64> for Instruction {
            type Error = VMError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                match value {
                    $( $opcode => Ok(Instruction::$name), )*
                    _ => Err(VMError::InvalidOpcode { opcode: value }),
                }
            }
        }

        impl Instruction {
            /// Every instruction in opcode order.
            pub const ALL: &'static [Instruction] = &[ $( Instruction::$name, )* ];

            /// Returns the numeric opcode.
            pub const fn opcode(&self) -> i64 {
                *self as u8 as i64
            }

            /// Returns the assembly mnemonic for this instruction.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Instruction::$name => $mnemonic, )*
                }
            }

            /// Returns the kind of each parameter, in encoding order.
            pub const fn params(&self) -> &'static [ParamKind] {
                match self {
                    $( Instruction::$name => &[ $( ParamKind::$kind ),* ], )*
                }
            }

            /// Returns the number of parameters following the opcode.
            pub const fn param_count(&self) -> usize {
                self.params().len()
            }

            /// Returns the number of memory cells the instruction occupies.
            pub const fn width(&self) -> usize {
                1 + self.param_count()
            }
        }
    };
}

for_each_instruction!(define_instructions);
