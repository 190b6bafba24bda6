//! The register file: eight general purpose 32 bit registers. No register
//! has special hardware meaning; register 0 is an ordinary register, not a
//! zero register.

use std::fmt::{Display, Formatter};
use std::ops::{Index, IndexMut};

use crate::bytecode::Word;

/// A register number, 0–7. Only the bytecode layer constructs these, always
/// from a 3 bit instruction field, so an out-of-range register is
/// unrepresentable and indexing the register file can never fail.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct RegisterIndex(u8);

impl RegisterIndex {
  /// Keeps the low three bits of an extracted field.
  pub(crate) fn from_field(bits: Word) -> RegisterIndex {
    RegisterIndex((bits & 0x7) as u8)
  }

  /// Converts the register number to an index into the register file.
  pub fn idx(self) -> usize {
    self.0 as usize
  }
}

impl Display for RegisterIndex {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "r{}", self.0)
  }
}

/// The flat 8-slot register file, all zero at machine creation.
#[derive(Clone, Debug, Default)]
pub struct Registers([Word; 8]);

impl Registers {
  pub fn new() -> Registers {
    Registers([0; 8])
  }

  pub fn iter(&self) -> impl Iterator<Item = &Word> {
    self.0.iter()
  }
}

impl Index<RegisterIndex> for Registers {
  type Output = Word;

  fn index(&self, register: RegisterIndex) -> &Word {
    &self.0[register.idx()]
  }
}

impl IndexMut<RegisterIndex> for Registers {
  fn index_mut(&mut self, register: RegisterIndex) -> &mut Word {
    &mut self.0[register.idx()]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn field_extraction_masks_to_three_bits() {
    assert_eq!(RegisterIndex::from_field(0b101).idx(), 5);
    assert_eq!(RegisterIndex::from_field(0b1111).idx(), 7);
  }

  #[test]
  fn registers_start_zeroed_and_index_by_register() {
    let mut registers = Registers::new();
    let r3 = RegisterIndex::from_field(3);
    assert_eq!(registers[r3], 0);
    registers[r3] = 0xDEAD_BEEF;
    assert_eq!(registers[r3], 0xDEAD_BEEF);
  }
}
