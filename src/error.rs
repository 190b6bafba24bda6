//! The machine's fault taxonomy. Every variant but `Io` is a checked
//! invariant violation: a malformed or ill-behaved program, not a
//! recoverable runtime condition. Nothing in the core catches or retries
//! one; the driver maps any fault to an abnormal process exit, distinct
//! from the halt operation's graceful shutdown.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Fault {
  /// A divide operation whose divisor register held zero.
  #[error("division by zero")]
  DivideByZero,

  /// A segment identifier that is out of range of the table or denotes a
  /// tombstoned slot.
  #[error("segment {0} is not mapped")]
  UnmappedSegment(u32),

  /// A word offset past the end of a live segment.
  #[error("offset {offset} is out of range for segment {id}")]
  OffsetOutOfRange { id: u32, offset: u32 },

  /// An attempt to unmap segment 0, which holds the running program.
  #[error("cannot unmap the program segment")]
  UnmapProgramSegment,

  /// An output operand that does not fit in a byte.
  #[error("output value {0} does not fit in a byte")]
  OutputNotAByte(u32),

  /// An opcode field outside the fourteen defined operations.
  #[error("unrecognized opcode {0}")]
  IllegalOpcode(u32),

  /// The input or output stream failed. End of input is not a failure;
  /// the input operation reports it as an all-ones register.
  #[error("stream error: {0}")]
  Io(#[from] io::Error),
}
