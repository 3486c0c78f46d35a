//! Extending the arena once every class has run dry.
//!
//! ```text
//!   old tail                                               new tail
//!      │                                                       │
//!      ▼                                                       ▼
//!   ───┬────┬──────┬──────────┬─ ─ ─ ─ ─ ─ ─┬──────────────────┐
//!      │ c0 │  c1  │    c2    │             │       c19        │
//!   ───┴────┴──────┴──────────┴─ ─ ─ ─ ─ ─ ─┴──────────────────┘
//! ```

use log::{debug, warn};

use crate::{
  arena::Arena,
  block,
  class::{BIN_COUNT, all_slots_size, capacity, slot_size},
  error::AllocResult,
  free_list,
  heap::Heap,
};

impl<A: Arena> Heap<A> {
  /// Appends one free block of every class to the arena.
  ///
  /// On failure nothing is written and the free lists are untouched.
  pub(crate) fn increase_heap_size(&mut self) -> AllocResult<()> {
    let increment = all_slots_size();
    let start = self
      .arena
      .extend(increment)
      .inspect_err(|err| warn!("heap growth by {} bytes failed: {}", increment, err))?;

    let bytes = self.arena.bytes_mut();
    let mut cursor = start;
    for class in 0..BIN_COUNT {
      block::set_size(bytes, cursor, capacity(class));
      free_list::push_head(bytes, class, cursor);
      cursor += slot_size(class);
    }
    self.stats.grow_events += 1;

    debug!("heap grown by {} bytes at 0x{:x}, now {} bytes", increment, start, self.arena.len());
    if self.config.log_free_lists_on_grow {
      self.log_free_lists();
    }

    self.verify()
  }
}

#[cfg(test)]
mod tests {
  use crate::{
    arena::{Arena, VecArena},
    block::{self, BlockState},
    class::{BIN_COUNT, all_slots_size, capacity, slot_size},
    config::HeapConfig,
    error::{AllocError, ArenaError},
    heap::{Heap, INITIAL_ARENA_SIZE},
  };

  #[test]
  fn test_growth_appends_one_block_per_class() {
    let mut heap = Heap::init(VecArena::new()).unwrap();
    let before = heap.free_lists();

    heap.increase_heap_size().unwrap();

    assert_eq!(heap.arena.len(), INITIAL_ARENA_SIZE + all_slots_size());
    let lists = heap.free_lists();
    let bytes = heap.arena.bytes();
    let mut header = INITIAL_ARENA_SIZE;
    for class in 0..BIN_COUNT {
      // The new block is pushed in front of the old one.
      assert_eq!(lists[class][0], header, "class {class}");
      assert_eq!(lists[class][1..], before[class][..], "class {class}");
      assert_eq!(block::size(bytes, header), capacity(class));
      assert_eq!(block::state(bytes, header), Some(BlockState::Free));
      header += slot_size(class);
    }
    assert_eq!(header, heap.arena.len());
    assert_eq!(heap.stats().grow_events, 1);
    assert_eq!(heap.integrity_check(), Ok(()));
  }

  #[test]
  fn test_growth_failure_leaves_lists_unchanged() {
    let mut heap = Heap::init(VecArena::with_limit(INITIAL_ARENA_SIZE)).unwrap();
    let before = heap.free_lists();

    let err = heap.increase_heap_size().unwrap_err();

    assert!(matches!(err, AllocError::ArenaExhausted(ArenaError::LimitExceeded { .. })));
    assert_eq!(heap.free_lists(), before);
    assert_eq!(heap.arena.len(), INITIAL_ARENA_SIZE);
    assert_eq!(heap.stats().grow_events, 0);
  }

  #[test]
  fn test_repeated_growth_with_checks() {
    let config = HeapConfig::default()
      .with_verify_on_mutation(true)
      .with_log_free_lists_on_grow(true);
    let mut heap = Heap::with_config(VecArena::new(), config).unwrap();

    for _ in 0..3 {
      heap.increase_heap_size().unwrap();
    }

    assert_eq!(heap.arena.len(), INITIAL_ARENA_SIZE + 3 * all_slots_size());
    for class in 0..BIN_COUNT {
      assert_eq!(heap.free_count(class), 4);
    }
  }
}
