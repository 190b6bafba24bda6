//! The segmented address space: a growable table of segments addressed by
//! identifier, with unmapped identifiers recycled in last-freed-first-reused
//! order.
//!
//! Identifiers double as ordinary register values, so the recycling order is
//! an externally observable part of the machine's contract and is fixed as
//! LIFO. A slot is never removed from the table once allocated; unmapping
//! tombstones it, which keeps every other identifier stable.

use crate::bytecode::Word;
use crate::error::Fault;

/// One unit of addressable memory: a fixed-length block of words,
/// zero-filled at creation. The length never changes; words are mutated in
/// place.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Segment {
  words: Vec<Word>,
}

impl Segment {
  fn zeroed(length: Word) -> Segment {
    Segment {
      words: vec![0; length as usize],
    }
  }

  pub fn len(&self) -> Word {
    self.words.len() as Word
  }
}

/// The table of segments. Identifier 0 denotes the currently executing
/// program and exists for the lifetime of the machine; it may be replaced
/// wholesale by `replace_program` but never unmapped.
#[derive(Default)]
pub struct AddressSpace {
  /// Indexed by identifier. A tombstoned (unmapped) identifier holds `None`.
  segments: Vec<Option<Segment>>,
  /// Unmapped identifiers, most recently freed last; `allocate` pops from
  /// the end.
  unmapped: Vec<Word>,
}

impl AddressSpace {
  pub fn new() -> AddressSpace {
    AddressSpace {
      segments: vec![],
      unmapped: vec![],
    }
  }

  /// Number of slots in the table, live and tombstoned alike.
  pub fn segment_count(&self) -> usize {
    self.segments.len()
  }

  /**
    Creates a zero-filled segment of `length` words and returns its
    identifier: the most recently unmapped identifier if any exists,
    otherwise a fresh one equal to the current table length.
  */
  pub fn allocate(&mut self, length: Word) -> Word {
    let segment = Segment::zeroed(length);
    match self.unmapped.pop() {

      Some(id) => {
        self.segments[id as usize] = Some(segment);
        id
      }

      None => {
        let id = self.segments.len() as Word;
        self.segments.push(Some(segment));
        id
      }

    }
  }

  /**
    Tombstones the slot at `id`, releases the segment's storage, and
    returns the identifier to the recycle pool. The program segment can
    never be unmapped this way; `replace_program` is the only path that
    replaces it.
  */
  pub fn unmap(&mut self, id: Word) -> Result<(), Fault> {
    if id == 0 {
      return Err(Fault::UnmapProgramSegment);
    }
    let slot = self
      .segments
      .get_mut(id as usize)
      .ok_or(Fault::UnmappedSegment(id))?;
    match slot.take() {

      Some(_segment) => {
        self.unmapped.push(id);
        Ok(())
      }

      // Already tombstoned.
      None => Err(Fault::UnmappedSegment(id)),

    }
  }

  fn segment(&self, id: Word) -> Result<&Segment, Fault> {
    self
      .segments
      .get(id as usize)
      .and_then(|slot| slot.as_ref())
      .ok_or(Fault::UnmappedSegment(id))
  }

  /// Bounds-checked read of the word at `offset` within segment `id`.
  pub fn word(&self, id: Word, offset: Word) -> Result<Word, Fault> {
    self
      .segment(id)?
      .words
      .get(offset as usize)
      .copied()
      .ok_or(Fault::OffsetOutOfRange { id, offset })
  }

  /// Bounds-checked mutable access to the word at `offset` within segment
  /// `id`.
  pub fn word_mut(&mut self, id: Word, offset: Word) -> Result<&mut Word, Fault> {
    self
      .segments
      .get_mut(id as usize)
      .and_then(|slot| slot.as_mut())
      .ok_or(Fault::UnmappedSegment(id))?
      .words
      .get_mut(offset as usize)
      .ok_or(Fault::OffsetOutOfRange { id, offset })
  }

  /**
    Replaces the program segment with a deep, word-for-word copy of the
    segment at `id`, discarding the old program, and returns the copy's
    length so the execution loop can reset its instruction-count bound.
    Loading the program over itself is a no-op and returns `None`.
  */
  pub fn replace_program(&mut self, id: Word) -> Result<Option<Word>, Fault> {
    if id == 0 {
      return Ok(None);
    }
    let copy = self.segment(id)?.clone();
    let length = copy.len();
    self.segments[0] = Some(copy);
    Ok(Some(length))
  }

  /// Releases every live segment along with the table and the recycle
  /// pool. The halt operation's graceful path; faults skip it, since the
  /// process is ending anyway.
  pub fn teardown(&mut self) {
    self.segments.clear();
    self.unmapped.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identifiers_are_recycled_in_lifo_order() {
    let mut space = AddressSpace::new();
    let program = space.allocate(4);
    assert_eq!(program, 0);

    let a = space.allocate(1);
    let b = space.allocate(1);
    let c = space.allocate(1);
    assert_eq!((a, b, c), (1, 2, 3));

    space.unmap(b).unwrap();
    space.unmap(c).unwrap();

    // The most recently freed identifier comes back first.
    assert_eq!(space.allocate(1), c);
    assert_eq!(space.allocate(1), b);
    // With the pool drained, a fresh identifier equals the table length.
    assert_eq!(space.allocate(1), 4);
  }

  #[test]
  fn unmapping_the_program_segment_is_an_invariant_violation() {
    let mut space = AddressSpace::new();
    space.allocate(4);
    assert!(matches!(space.unmap(0), Err(Fault::UnmapProgramSegment)));
  }

  #[test]
  fn tombstoned_and_unknown_identifiers_are_invalid() {
    let mut space = AddressSpace::new();
    space.allocate(4);
    let id = space.allocate(2);
    space.unmap(id).unwrap();

    assert!(matches!(space.word(id, 0), Err(Fault::UnmappedSegment(1))));
    assert!(matches!(space.unmap(id), Err(Fault::UnmappedSegment(1))));
    assert!(matches!(space.word(9, 0), Err(Fault::UnmappedSegment(9))));
  }

  #[test]
  fn word_access_is_bounds_checked() {
    let mut space = AddressSpace::new();
    space.allocate(4);
    let id = space.allocate(3);

    assert_eq!(space.word(id, 2).unwrap(), 0);
    *space.word_mut(id, 2).unwrap() = 99;
    assert_eq!(space.word(id, 2).unwrap(), 99);
    assert!(matches!(
      space.word(id, 3),
      Err(Fault::OffsetOutOfRange { id: 1, offset: 3 })
    ));
  }

  #[test]
  fn replace_program_copies_word_for_word() {
    let mut space = AddressSpace::new();
    space.allocate(4);
    let id = space.allocate(2);
    *space.word_mut(id, 0).unwrap() = 7;
    *space.word_mut(id, 1).unwrap() = 8;

    assert_eq!(space.replace_program(id).unwrap(), Some(2));
    assert_eq!(space.word(0, 0).unwrap(), 7);
    assert_eq!(space.word(0, 1).unwrap(), 8);

    // The source segment is untouched, and the copy is independent.
    *space.word_mut(0, 0).unwrap() = 1;
    assert_eq!(space.word(id, 0).unwrap(), 7);
  }

  #[test]
  fn replacing_the_program_with_itself_is_a_no_op() {
    let mut space = AddressSpace::new();
    space.allocate(4);
    *space.word_mut(0, 3).unwrap() = 5;
    assert_eq!(space.replace_program(0).unwrap(), None);
    assert_eq!(space.word(0, 3).unwrap(), 5);
  }

  #[test]
  fn teardown_releases_the_table() {
    let mut space = AddressSpace::new();
    space.allocate(4);
    space.allocate(2);
    space.teardown();
    assert_eq!(space.segment_count(), 0);
  }
}
