/*!
  This module is responsible for the encoding and decoding of binary
  instructions. The field accessors are pure extraction with no
  validation; the opcode value is validated when a word is decoded for
  dispatch, and an undefined opcode surfaces as `Fault::IllegalOpcode`.
*/
use std::convert::TryFrom;

use super::{Instruction, Operation};
use crate::error::Fault;
use crate::registers::RegisterIndex;

// If you change this you must also change `encode_instruction` and
// `try_decode_instruction`.
pub type Word = u32;

const OPCODE_OFFSET: u32 = 28;
const REG_A_OFFSET: u32 = 6;
const REG_B_OFFSET: u32 = 3;
const REG_C_OFFSET: u32 = 0;
// Register A sits next to the opcode in the immediate-load layout.
const LOAD_REG_A_OFFSET: u32 = 25;
const VALUE_WIDTH: u32 = 25;

/// The numeric opcode field: 4 bits at bit 28. Not validated.
pub fn opcode_field(word: Word) -> Word {
  word >> OPCODE_OFFSET
}

/// Register A of the three-register layout: 3 bits at bit 6.
pub fn reg_a(word: Word) -> RegisterIndex {
  RegisterIndex::from_field(word >> REG_A_OFFSET)
}

/// Register B of the three-register layout: 3 bits at bit 3.
pub fn reg_b(word: Word) -> RegisterIndex {
  RegisterIndex::from_field(word >> REG_B_OFFSET)
}

/// Register C of the three-register layout: 3 bits at bit 0.
pub fn reg_c(word: Word) -> RegisterIndex {
  RegisterIndex::from_field(word >> REG_C_OFFSET)
}

/// Register A of the immediate-load layout: 3 bits at bit 25.
pub fn reg_a_load(word: Word) -> RegisterIndex {
  RegisterIndex::from_field(word >> LOAD_REG_A_OFFSET)
}

/// The unsigned immediate of the immediate-load layout: 25 bits at bit 0.
pub fn value_field(word: Word) -> Word {
  word & ((1 << VALUE_WIDTH) - 1)
}

pub fn try_decode_instruction(word: Word) -> Result<Instruction, Fault> {
  let opcode = Operation::try_from(opcode_field(word) as u8)
    .map_err(|_| Fault::IllegalOpcode(opcode_field(word)))?;

  let instruction = match opcode {

    Operation::LoadValue => Instruction::LoadValue {
      a: reg_a_load(word),
      value: value_field(word),
    },

    _ => Instruction::ThreeRegister {
      opcode,
      a: reg_a(word),
      b: reg_b(word),
      c: reg_c(word),
    },

  };

  Ok(instruction)
}

/**
  Encodes the instruction into a word, the inverse of
  `try_decode_instruction`. This is how the assembler and the tests author
  instruction streams.
*/
pub fn encode_instruction(instruction: &Instruction) -> Word {
  match *instruction {

    Instruction::ThreeRegister { opcode, a, b, c } => {
      ((opcode.code() as Word) << OPCODE_OFFSET)
        + ((a.idx() as Word) << REG_A_OFFSET)
        + ((b.idx() as Word) << REG_B_OFFSET)
        + ((c.idx() as Word) << REG_C_OFFSET)
    }

    Instruction::LoadValue { a, value } => {
      ((Operation::LoadValue.code() as Word) << OPCODE_OFFSET)
        + ((a.idx() as Word) << LOAD_REG_A_OFFSET)
        + value_field(value)
    }

  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accessors_extract_the_documented_fields() {
    // Add with a=1, b=2, c=3: opcode 3 at bit 28, then 0b001_010_011.
    let word: Word = (3 << 28) | (1 << 6) | (2 << 3) | 3;
    assert_eq!(opcode_field(word), 3);
    assert_eq!(reg_a(word).idx(), 1);
    assert_eq!(reg_b(word).idx(), 2);
    assert_eq!(reg_c(word).idx(), 3);

    // LoadValue r7 <- the largest immediate.
    let word: Word = (13 << 28) | (7 << 25) | 0x01FF_FFFF;
    assert_eq!(opcode_field(word), 13);
    assert_eq!(reg_a_load(word).idx(), 7);
    assert_eq!(value_field(word), 0x01FF_FFFF);
  }

  #[test]
  fn decode_is_the_inverse_of_encode() {
    let instructions = [
      Instruction::ThreeRegister {
        opcode: Operation::ConditionalMove,
        a: RegisterIndex::from_field(4),
        b: RegisterIndex::from_field(5),
        c: RegisterIndex::from_field(6),
      },
      Instruction::ThreeRegister {
        opcode: Operation::Halt,
        a: RegisterIndex::from_field(0),
        b: RegisterIndex::from_field(0),
        c: RegisterIndex::from_field(0),
      },
      Instruction::LoadValue {
        a: RegisterIndex::from_field(1),
        value: 60,
      },
    ];
    for instruction in instructions.iter() {
      let decoded = try_decode_instruction(encode_instruction(instruction)).unwrap();
      assert_eq!(decoded, *instruction);
    }
  }

  #[test]
  fn undefined_opcodes_are_a_dispatch_fault() {
    for opcode in &[14u32, 15u32] {
      let word = opcode << 28;
      match try_decode_instruction(word) {
        Err(Fault::IllegalOpcode(code)) => assert_eq!(code, *opcode),
        other => panic!("expected an illegal opcode fault, got {:?}", other),
      }
    }
  }

  #[test]
  fn value_field_truncates_to_25_bits() {
    let instruction = Instruction::LoadValue {
      a: RegisterIndex::from_field(0),
      value: 0xFFFF_FFFF,
    };
    assert_eq!(value_field(encode_instruction(&instruction)), 0x01FF_FFFF);
  }
}
