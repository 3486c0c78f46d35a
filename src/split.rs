//! Serving a small request from a larger class.
//!
//! Splitting the head block of class `L` for a class-`k` request:
//!
//! ```text
//!   before: ┌──────────────────────────────────────────────────────────┐
//!           │                     class L block                        │
//!           └──────────────────────────────────────────────────────────┘
//!   after:  ┌──────┬────────┬────────────┬─ ─ ─ ─┬──────────────┬──────┐
//!           │  k   │  k+1   │    k+2     │       │     L-1      │  k   │
//!           │ free │  free  │    free    │       │     free     │ used │
//!           └──────┴────────┴────────────┴─ ─ ─ ─┴──────────────┴──────┘
//! ```
//!
//! `2^k + (2^k + 2^(k+1) + ... + 2^(L-1)) == 2^L`, so the pieces tile the old
//! block exactly.

use log::trace;

use crate::{
  arena::Arena,
  block::{Block, BlockState},
  class::{capacity, slot_size},
  free_list,
  heap::Heap,
};

impl<A: Arena> Heap<A> {
  /// Carves the head block of `source` into one free block of every class
  /// from `target` up to `source - 1`, and returns the header of the
  /// remaining highest-address slice, sized for `target` and detached.
  ///
  /// Returns `None` when `source` has no free block.
  pub(crate) fn split(
    &mut self,
    target: usize,
    source: usize,
  ) -> Option<usize> {
    debug_assert!(source > target, "split from class {source} into {target}");

    let bytes = self.arena.bytes_mut();
    let source_header = free_list::pop_head(bytes, source)?;

    let mut cursor = source_header;
    for class in target..source {
      Block::new(None, capacity(class), BlockState::Free).write(bytes, cursor);
      free_list::push_head(bytes, class, cursor);
      cursor += slot_size(class);
    }

    Block::allocated(capacity(target)).write(bytes, cursor);
    self.stats.splits += 1;

    trace!(
      "split 0x{:x} (class {}) for class {}, returning 0x{:x}",
      source_header, source, target, cursor
    );
    Some(cursor)
  }
}

#[cfg(test)]
mod tests {
  use crate::{
    arena::{Arena, VecArena},
    block::{self, BlockState, HEADER_SIZE},
    class::{BIN_COUNT, capacity, slot_size},
    free_list,
    heap::Heap,
  };

  fn heap() -> Heap<VecArena> {
    Heap::init(VecArena::new()).unwrap()
  }

  #[test]
  fn test_split_conserves_bytes_for_every_pair() {
    for source in 1..BIN_COUNT {
      for target in 0..source {
        let carved: usize = (target..source).map(slot_size).sum();
        assert_eq!(slot_size(target) + carved, slot_size(source), "{target} from {source}");
      }
    }
  }

  #[test]
  fn test_split_layout() {
    let mut heap = heap();
    let source_header = free_list::head(heap.arena.bytes(), 6).unwrap();

    let returned = heap.split(2, 6).unwrap();

    let bytes = heap.arena.bytes();
    let mut cursor = source_header;
    for class in 2..6 {
      // Each carved block is the fresh head of its class.
      assert_eq!(free_list::head(bytes, class), Some(cursor), "class {class}");
      assert_eq!(block::size(bytes, cursor), capacity(class));
      assert_eq!(block::state(bytes, cursor), Some(BlockState::Free));
      cursor += slot_size(class);
    }

    assert_eq!(returned, cursor);
    assert_eq!(block::size(bytes, returned), capacity(2));
    assert_eq!(block::next(bytes, returned), None);
    assert_eq!(block::state(bytes, returned), Some(BlockState::Allocated));
    assert_eq!(returned + HEADER_SIZE + capacity(2), source_header + slot_size(6));

    assert!(free_list::is_empty(bytes, 6));
    assert_eq!(heap.stats().splits, 1);
  }

  #[test]
  fn test_split_keeps_tiling() {
    for target in 0..BIN_COUNT - 1 {
      let mut heap = heap();

      heap.split(target, BIN_COUNT - 1).unwrap();

      assert_eq!(heap.integrity_check(), Ok(()), "target {target}");
      let free_blocks: usize = (0..BIN_COUNT).map(|class| heap.free_count(class)).sum();
      assert_eq!(free_blocks, BIN_COUNT - 1 + (BIN_COUNT - 1 - target));
    }
  }

  #[test]
  fn test_split_of_empty_source() {
    let mut heap = heap();
    free_list::pop_head(heap.arena.bytes_mut(), 4).unwrap();

    assert_eq!(heap.split(1, 4), None);
    assert_eq!(heap.stats().splits, 0);
  }
}
