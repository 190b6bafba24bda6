/*!

  The machine uses a 32 bit word size, big-endian on the wire: a program
  file is a sequence of words, each transmitted most significant byte
  first, so a file's length is always a multiple of four bytes. Every
  instruction is exactly one word, in one of two layouts.

  Three-register layout (opcodes 0–12):

    Opcode:      4 bits @ 28
    Register A:  3 bits @ 6
    Register B:  3 bits @ 3
    Register C:  3 bits @ 0

  Immediate-load layout (opcode 13):

    Opcode:      4 bits @ 28
    Register A:  3 bits @ 25
    Value:      25 bits @ 0

  All field extraction is unsigned; nothing is sign extended. The bits
  between the opcode and the register fields of the three-register layout
  are ignored.

  An instruction could be stored as an enum with one variant per opcode,
  but thirteen of the fourteen operations share a single layout, so the
  decoded form instead carries the opcode as its own one-byte enum inside
  a variant per layout. That keeps decoding a pair of straight-line field
  extractions and makes the dispatch match read like the opcode table.

*/

mod assembly;
mod binary;
mod instruction;

pub use assembly::{assemble, parse_assembly, AssemblyError, ParsedAssemblySyntax};
pub use binary::{
  encode_instruction, opcode_field, reg_a, reg_a_load, reg_b, reg_c, try_decode_instruction,
  value_field, Word,
};
pub use instruction::{Instruction, Operation};
