//! Structures and functions for the machine proper: the register file, the
//! address space, and the fetch-decode-dispatch loop that interprets the
//! fourteen operations.

use std::fmt::{Display, Formatter};
use std::io::{ErrorKind, Read, Write};

use prettytable::{format as TableFormat, Table};

use crate::address_space::AddressSpace;
use crate::bytecode::{try_decode_instruction, Instruction, Operation, Word};
use crate::error::Fault;
use crate::registers::{RegisterIndex, Registers};

/// Register value reported by the input operation at end of input.
const END_OF_INPUT: Word = Word::max_value();

/// What the dispatched operation did to the flow of control.
enum Flow {
  /// Advance the program counter to the next instruction.
  Advance,
  /// The operation set the program counter itself.
  Jumped,
  /// The halt operation ran.
  Halted,
}

pub struct Machine<R: Read, W: Write> {
  registers: Registers,
  space: AddressSpace,

  /// Index into the program segment of the next instruction.
  pc: Word,
  /// Word count of the program segment; the loop ends when `pc` reaches
  /// it. Reset by the load-program operation when the program is replaced.
  bound: Word,

  input: R,
  output: W,
}

impl<R: Read, W: Write> Machine<R, W> {

  // region Loading

  pub fn new(input: R, output: W) -> Machine<R, W> {
    Machine {
      registers: Registers::new(),
      space: AddressSpace::new(),
      pc: 0,
      bound: 0,
      input,
      output,
    }
  }

  /**
    The loader contract: maps the program segment with exactly
    `word_count` words and fills it from `program`, four big-endian bytes
    per word, in stream order. The program counter starts at 0.
  */
  pub fn load(&mut self, mut program: impl Read, word_count: Word) -> Result<(), Fault> {
    let id = self.space.allocate(word_count);
    let mut bytes = [0u8; 4];
    for offset in 0..word_count {
      program.read_exact(&mut bytes)?;
      *self.space.word_mut(id, offset)? = Word::from_be_bytes(bytes);
    }
    self.pc = 0;
    self.bound = word_count;
    Ok(())
  }

  /// Consumes the machine and hands back the output stream.
  pub fn into_output(self) -> W {
    self.output
  }

  // endregion

  // region Execution loop

  /**
    Runs the loaded program: repeatedly fetches the word at the program
    counter from the program segment, decodes it, and dispatches. The
    loop ends when the halt operation runs, when the program counter
    reaches the instruction-count bound (implicit successful
    termination), or when an operation faults. Faults are never caught
    here; the caller observes the typed failure.
  */
  pub fn run(&mut self) -> Result<(), Fault> {
    while self.pc < self.bound {
      let word = self.space.word(0, self.pc)?;
      let instruction = try_decode_instruction(word)?;

      #[cfg(feature = "trace_computation")]
      eprintln!("[{:>6}] {}\n{}", self.pc, instruction, self);

      match self.dispatch(instruction)? {

        Flow::Advance => {
          self.pc += 1;
        }

        Flow::Jumped => {}

        Flow::Halted => {
          self.flush()?;
          return Ok(());
        }

      }
    }
    self.flush()?;
    Ok(())
  }

  fn dispatch(&mut self, instruction: Instruction) -> Result<Flow, Fault> {
    match instruction {

      Instruction::LoadValue { a, value } => {
        self.load_value(a, value);
        Ok(Flow::Advance)
      }

      Instruction::ThreeRegister { opcode, a, b, c } => match opcode {
        Operation::ConditionalMove => {
          self.conditional_move(a, b, c);
          Ok(Flow::Advance)
        }
        Operation::SegmentedLoad => {
          self.segmented_load(a, b, c)?;
          Ok(Flow::Advance)
        }
        Operation::SegmentedStore => {
          self.segmented_store(a, b, c)?;
          Ok(Flow::Advance)
        }
        Operation::Add => {
          self.add(a, b, c);
          Ok(Flow::Advance)
        }
        Operation::Multiply => {
          self.multiply(a, b, c);
          Ok(Flow::Advance)
        }
        Operation::Divide => {
          self.divide(a, b, c)?;
          Ok(Flow::Advance)
        }
        Operation::BitwiseNand => {
          self.bitwise_nand(a, b, c);
          Ok(Flow::Advance)
        }
        Operation::Halt => {
          self.halt();
          Ok(Flow::Halted)
        }
        Operation::MapSegment => {
          self.map_segment(b, c);
          Ok(Flow::Advance)
        }
        Operation::UnmapSegment => {
          self.unmap_segment(c)?;
          Ok(Flow::Advance)
        }
        Operation::Output => {
          self.output(c)?;
          Ok(Flow::Advance)
        }
        Operation::Input => {
          self.input(c)?;
          Ok(Flow::Advance)
        }
        Operation::LoadProgram => {
          self.load_program(b, c)?;
          Ok(Flow::Jumped)
        }
        Operation::LoadValue => {
          unreachable!("LoadValue decodes to Instruction::LoadValue");
        }
      },

    }
  }

  // endregion

  // region Operations

  /// `if r[C] != 0 { r[A] := r[B] }`
  fn conditional_move(&mut self, a: RegisterIndex, b: RegisterIndex, c: RegisterIndex) {
    if self.registers[c] != 0 {
      self.registers[a] = self.registers[b];
    }
  }

  /// `r[A] := m[r[B]][r[C]]`
  fn segmented_load(
    &mut self,
    a: RegisterIndex,
    b: RegisterIndex,
    c: RegisterIndex,
  ) -> Result<(), Fault> {
    self.registers[a] = self.space.word(self.registers[b], self.registers[c])?;
    Ok(())
  }

  /// `m[r[A]][r[B]] := r[C]`
  fn segmented_store(
    &mut self,
    a: RegisterIndex,
    b: RegisterIndex,
    c: RegisterIndex,
  ) -> Result<(), Fault> {
    *self.space.word_mut(self.registers[a], self.registers[b])? = self.registers[c];
    Ok(())
  }

  /// `r[A] := (r[B] + r[C]) mod 2^32`
  fn add(&mut self, a: RegisterIndex, b: RegisterIndex, c: RegisterIndex) {
    self.registers[a] = self.registers[b].wrapping_add(self.registers[c]);
  }

  /// `r[A] := (r[B] * r[C]) mod 2^32`
  fn multiply(&mut self, a: RegisterIndex, b: RegisterIndex, c: RegisterIndex) {
    self.registers[a] = self.registers[b].wrapping_mul(self.registers[c]);
  }

  /// Unsigned truncating division. A zero divisor is a fault, never a
  /// silent zero.
  fn divide(
    &mut self,
    a: RegisterIndex,
    b: RegisterIndex,
    c: RegisterIndex,
  ) -> Result<(), Fault> {
    match self.registers[c] {
      0 => Err(Fault::DivideByZero),
      divisor => {
        self.registers[a] = self.registers[b] / divisor;
        Ok(())
      }
    }
  }

  /// `r[A] := !(r[B] & r[C])`
  fn bitwise_nand(&mut self, a: RegisterIndex, b: RegisterIndex, c: RegisterIndex) {
    self.registers[a] = !(self.registers[b] & self.registers[c]);
  }

  /// Releases every segment; the loop stops after this runs.
  fn halt(&mut self) {
    self.space.teardown();
  }

  /// Maps a fresh zero-filled segment of `r[C]` words and places its
  /// identifier in `r[B]`.
  fn map_segment(&mut self, b: RegisterIndex, c: RegisterIndex) {
    let length = self.registers[c];
    let id = self.space.allocate(length);
    #[cfg(feature = "trace_computation")]
    eprintln!("map_segment: {} words at identifier {}", length, id);
    self.registers[b] = id;
  }

  /// Unmaps segment `r[C]`, returning its identifier to the recycle pool.
  fn unmap_segment(&mut self, c: RegisterIndex) -> Result<(), Fault> {
    #[cfg(feature = "trace_computation")]
    eprintln!("unmap_segment: identifier {}", self.registers[c]);
    self.space.unmap(self.registers[c])
  }

  /// Writes `r[C]` to the output stream as a single byte.
  fn output(&mut self, c: RegisterIndex) -> Result<(), Fault> {
    let value = self.registers[c];
    if value >= 256 {
      return Err(Fault::OutputNotAByte(value));
    }
    self.output.write_all(&[value as u8])?;
    Ok(())
  }

  /// Reads one byte from the input stream into `r[C]`; at end of input
  /// the register holds the all-ones word instead. Pending output is
  /// flushed first so an interactive program's prompt is visible.
  fn input(&mut self, c: RegisterIndex) -> Result<(), Fault> {
    self.flush()?;
    let mut byte = [0u8; 1];
    self.registers[c] = match self.input.read_exact(&mut byte) {
      Ok(()) => Word::from(byte[0]),
      Err(ref error) if error.kind() == ErrorKind::UnexpectedEof => END_OF_INPUT,
      Err(error) => return Err(Fault::Io(error)),
    };
    Ok(())
  }

  /// Replaces the program segment with a copy of segment `r[B]` (a no-op
  /// when `r[B]` is 0) and jumps to `r[C]`. A replacement resets the
  /// instruction-count bound to the new program's length.
  fn load_program(&mut self, b: RegisterIndex, c: RegisterIndex) -> Result<(), Fault> {
    #[cfg(feature = "trace_computation")]
    eprintln!(
      "load_program: segment {}, jump to {}",
      self.registers[b], self.registers[c]
    );
    if let Some(length) = self.space.replace_program(self.registers[b])? {
      self.bound = length;
    }
    self.pc = self.registers[c];
    Ok(())
  }

  /// `r[A] := value`
  fn load_value(&mut self, a: RegisterIndex, value: Word) {
    self.registers[a] = value;
  }

  fn flush(&mut self) -> Result<(), Fault> {
    self.output.flush()?;
    Ok(())
  }

  // endregion
}

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl<R: Read, W: Write> Display for Machine<R, W> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let mut table = Table::new();
    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Register", ubl->"Contents"]);
    for (i, value) in self.registers.iter().enumerate() {
      table.add_row(row![r->format!("r{} =", i), format!("{:#010x}", value)]);
    }

    write!(
      f,
      "pc: {}  bound: {}  segments: {}\n{}",
      self.pc,
      self.bound,
      self.space.segment_count(),
      table
    )
  }
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use super::*;
  use crate::bytecode::assemble;

  fn loaded(text: &str, input: &[u8]) -> Machine<Cursor<Vec<u8>>, Vec<u8>> {
    let words = assemble(text).unwrap();
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes().to_vec()).collect();
    let mut machine = Machine::new(Cursor::new(input.to_vec()), Vec::new());
    machine
      .load(Cursor::new(bytes), words.len() as Word)
      .unwrap();
    machine
  }

  #[test]
  fn load_fills_the_program_segment_big_endian() {
    let mut machine = Machine::new(Cursor::new(vec![]), Vec::new());
    machine
      .load(Cursor::new(vec![0x00, 0x00, 0x00, 0x2A, 0xD0, 0x00, 0x00, 0x01]), 2)
      .unwrap();
    assert_eq!(machine.space.word(0, 0).unwrap(), 42);
    assert_eq!(machine.space.word(0, 1).unwrap(), 0xD000_0001);
    assert_eq!(machine.bound, 2);
  }

  #[test]
  fn running_off_the_end_terminates_implicitly() {
    // No halt: three arithmetic instructions, then the bound is reached.
    let mut machine = loaded(
      "LoadValue(1, 2)\nLoadValue(2, 3)\nAdd(3, 1, 2)",
      &[],
    );
    machine.run().unwrap();
    assert_eq!(machine.pc, machine.bound);
  }

  #[test]
  fn replacing_the_program_resets_the_bound_and_jumps() {
    // Map a 10 word segment (all zero words decode to ConditionalMove of
    // r0 into r0, a harmless no-op), load it as the program, and continue
    // from offset 4.
    let mut machine = loaded(
      "LoadValue(1, 10)\n\
       MapSegment(2, 1)\n\
       LoadValue(3, 4)\n\
       LoadProgram(2, 3)",
      &[],
    );
    machine.run().unwrap();
    assert_eq!(machine.bound, 10);
    assert_eq!(machine.pc, 10);
  }

  #[test]
  fn jumping_within_the_program_does_not_change_the_bound() {
    // LoadProgram with r[B] = 0 only moves the program counter.
    let mut machine = loaded(
      "LoadValue(1, 3)\n\
       LoadProgram(0, 1)\n\
       Halt\n\
       LoadValue(2, 7)",
      &[],
    );
    machine.run().unwrap();
    assert_eq!(machine.bound, 4);
    assert_eq!(machine.pc, 4);
  }

  #[test]
  fn halt_tears_down_the_address_space() {
    let mut machine = loaded("LoadValue(1, 5)\nMapSegment(2, 1)\nHalt", &[]);
    machine.run().unwrap();
    assert_eq!(machine.space.segment_count(), 0);
  }
}
