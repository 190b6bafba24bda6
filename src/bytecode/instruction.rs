use std::fmt::{Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};

use crate::bytecode::Word;
use crate::registers::RegisterIndex;

/**
  Opcodes of the machine. The numeric value of each variant is its opcode
  in the binary format, so the order the opcodes are listed below is
  significant. Order-dependencies:
      ```
      binary::try_decode_instruction()
      binary::encode_instruction()
      ```
*/
#[derive(
StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
Clone,        Copy,          Eq, PartialEq,  Debug,            Hash
)]
#[repr(u8)]
pub enum Operation {
  ConditionalMove,   // if r[C] != 0 then r[A] := r[B]
  SegmentedLoad,     // r[A] := m[r[B]][r[C]]
  SegmentedStore,    // m[r[A]][r[B]] := r[C]
  Add,               // r[A] := (r[B] + r[C]) mod 2^32
  Multiply,          // r[A] := (r[B] * r[C]) mod 2^32
  Divide,            // r[A] := r[B] / r[C]
  BitwiseNand,       // r[A] := !(r[B] & r[C])
  Halt,              // release all segments and stop
  MapSegment,        // r[B] := identifier of a fresh segment, r[C] words long
  UnmapSegment,      // unmap segment r[C]
  Output,            // write r[C] as one byte
  Input,             // r[C] := one byte, or all ones at end of input
  LoadProgram,       // m[0] := copy of m[r[B]]; pc := r[C]
  LoadValue,         // r[A] := 25 bit immediate
}

/// Holds the unencoded components of an instruction, one variant per
/// binary layout.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum Instruction {
  /// [Opcode:4][Unused:19][A:3][B:3][C:3]
  ThreeRegister {
    opcode: Operation,
    a: RegisterIndex,
    b: RegisterIndex,
    c: RegisterIndex,
  },
  /// [Opcode:4][A:3][Value:25]
  LoadValue {
    a: RegisterIndex,
    value: Word,
  },
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      Instruction::ThreeRegister { opcode, a, b, c } => {
        write!(f, "{}({}, {}, {})", opcode, a, b, c)
      }

      Instruction::LoadValue { a, value } => {
        write!(f, "{}({}, {})", Operation::LoadValue, a, value)
      }

    }
  }
}

impl Operation {
  pub fn code(self) -> u8 {
    Into::<u8>::into(self)
  }

  /// Number of operands in the operation's textual (assembly) form. The
  /// binary layout always carries three register fields; the assembly form
  /// only names the ones the operation reads or writes.
  pub fn arity(self) -> usize {
    match self {
      Operation::Halt => 0,

      | Operation::Output
      | Operation::Input
      | Operation::UnmapSegment => 1,

      | Operation::MapSegment
      | Operation::LoadProgram
      | Operation::LoadValue => 2,

      _ => 3,
    }
  }
}
