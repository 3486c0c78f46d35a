//! Merging a released block with its right neighbour.
//!
//! ```text
//!   before: ┌────────────┬────────────┐
//!           │  class c   │  class c   │
//!           │ (released) │   (free)   │
//!           └────────────┴────────────┘
//!   after:  ┌─────────────────────────┐
//!           │        class c+1        │   neighbour's header is abandoned
//!           └─────────────────────────┘
//! ```
//!
//! Only the right neighbour is considered, and only once per release.

use log::{trace, warn};

use crate::{
  arena::Arena,
  block::{self, BlockState},
  class::{BIN_COUNT, capacity, class_of_capacity},
  free_list,
  heap::Heap,
};

impl<A: Arena> Heap<A> {
  /// Absorbs the block right of `header` if it is free and the same size,
  /// growing `header` to the next class. Returns whether a merge happened.
  ///
  /// `header` itself is not on any list; the caller pushes it afterwards.
  pub(crate) fn coalesce(
    &mut self,
    header: usize,
  ) -> bool {
    let bytes = self.arena.bytes_mut();
    let size = block::size(bytes, header);

    let Some(class) = class_of_capacity(size) else {
      return false;
    };
    if class + 1 >= BIN_COUNT {
      return false;
    }

    let neighbor = block::right_neighbor(bytes, header);
    if !free_list::in_bounds(bytes, neighbor) {
      return false;
    }
    if block::size(bytes, neighbor) != size {
      return false;
    }
    if block::state(bytes, neighbor) != Some(BlockState::Free) {
      return false;
    }

    if !free_list::unlink(bytes, class, neighbor) {
      warn!("free block 0x{:x} missing from class {} list", neighbor, class);
      return false;
    }

    block::set_size(bytes, header, capacity(class + 1));
    self.stats.coalesces += 1;

    trace!("coalesced 0x{:x} into 0x{:x} (class {})", neighbor, header, class + 1);
    true
  }
}

#[cfg(test)]
mod tests {
  use crate::{
    arena::{Arena, VecArena},
    block::{self, BlockState},
    class::{BIN_COUNT, capacity, slot_size},
    free_list,
    heap::{BlockPtr, Heap},
  };

  fn heap() -> Heap<VecArena> {
    Heap::init(VecArena::new()).unwrap()
  }

  fn header(ptr: BlockPtr) -> usize {
    block::header_of(ptr.offset()).unwrap()
  }

  #[test]
  fn test_merge_with_free_equal_neighbour() {
    let mut heap = heap();
    // The second request splits class 2, leaving a free class-1 block right
    // after the first.
    let first = heap.alloc(16).unwrap();
    let _second = heap.alloc(16).unwrap();
    let neighbor = header(first) + slot_size(1);
    assert_eq!(heap.free_lists()[1], vec![neighbor]);

    assert!(heap.coalesce(header(first)));

    let bytes = heap.arena.bytes();
    assert_eq!(block::size(bytes, header(first)), capacity(2));
    assert!(free_list::is_empty(bytes, 1));
    assert_eq!(heap.stats().coalesces, 1);
  }

  #[test]
  fn test_no_merge_with_larger_neighbour() {
    let mut heap = heap();
    let first = heap.alloc(16).unwrap();

    // Right of the only class-1 block is the initial class-2 block.
    assert!(!heap.coalesce(header(first)));
    assert_eq!(block::size(heap.arena.bytes(), header(first)), capacity(1));
  }

  #[test]
  fn test_no_merge_with_allocated_neighbour() {
    let mut heap = heap();
    let first = heap.alloc(16).unwrap();
    let _second = heap.alloc(16).unwrap();
    let third = heap.alloc(16).unwrap();

    // `third` took the carved block right after `first`.
    assert_eq!(header(third), header(first) + slot_size(1));
    assert!(!heap.coalesce(header(first)));
  }

  #[test]
  fn test_merge_does_not_cascade() {
    let mut heap = heap();
    let _a = heap.alloc(16).unwrap();
    let b = heap.alloc(16).unwrap();
    let _c = heap.alloc(16).unwrap();
    let _d = heap.alloc(16).unwrap();
    // Class 2 was split for `b`, class 3 for `d`, leaving
    //   [a c1][c c1][b c1][free c1][free c2][d c1]
    let free_c1 = header(b) + slot_size(1);
    let free_c2 = free_c1 + slot_size(1);
    assert_eq!(heap.free_lists()[1], vec![free_c1]);
    assert_eq!(heap.free_lists()[2], vec![free_c2]);

    heap.release(b).unwrap();

    // `b` absorbed the free class-1 block but stops short of the free
    // class-2 block now to its right.
    let bytes = heap.arena.bytes();
    assert_eq!(block::size(bytes, header(b)), capacity(2));
    assert_eq!(block::right_neighbor(bytes, header(b)), free_c2);
    assert_eq!(heap.free_lists()[2], vec![header(b), free_c2]);
    assert!(heap.free_lists()[1].is_empty());
    assert_eq!(heap.stats().coalesces, 1);
    assert_eq!(heap.integrity_check(), Ok(()));
  }

  #[test]
  fn test_top_class_never_merges() {
    let mut heap = heap();
    let top = heap.alloc(capacity(BIN_COUNT - 1)).unwrap();
    assert_eq!(block::right_neighbor(heap.arena.bytes(), header(top)), heap.arena.len());

    // Plant an equal-sized free block to its right.
    heap.increase_heap_size().unwrap();
    let planted = block::right_neighbor(heap.arena.bytes(), header(top));
    let bytes = heap.arena.bytes_mut();
    block::set_size(bytes, planted, capacity(BIN_COUNT - 1));
    block::set_state(bytes, planted, BlockState::Free);

    assert!(!heap.coalesce(header(top)));
    assert_eq!(block::size(heap.arena.bytes(), header(top)), capacity(BIN_COUNT - 1));
    assert_eq!(heap.stats().coalesces, 0);
  }
}
