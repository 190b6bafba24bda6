//! An interpreter for the UM-32 "Universal Machine": eight 32 bit general
//! purpose registers, a segmented address space with recycled segment
//! identifiers, and fourteen operations in a fixed 32 bit instruction
//! format. A program is a sequence of big-endian words loaded into
//! segment 0; the machine runs it to an explicit halt, to the end of the
//! program segment, or to the first fault.

#[macro_use]
extern crate prettytable;
#[macro_use]
extern crate lazy_static;

pub mod address_space;
pub mod bytecode;
pub mod error;
pub mod machine;
pub mod registers;

pub use crate::address_space::{AddressSpace, Segment};
pub use crate::bytecode::Word;
pub use crate::error::Fault;
pub use crate::machine::Machine;
