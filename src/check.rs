//! Whole-heap consistency walk.
//!
//! Two passes: the block walk visits every header from the end of the bin
//! table to the arena tail, then each free list is followed from its head.
//! The first problem found is returned.

use log::error;

use crate::{
  align::{ALIGNMENT, is_aligned},
  arena::Arena,
  block::{self, BlockState},
  class::{BIN_COUNT, BIN_TABLE_SIZE, capacity, class_of_capacity},
  error::Corruption,
  free_list,
  heap::Heap,
};

impl<A: Arena> Heap<A> {
  /// Verifies the structural invariants of the heap.
  ///
  /// - blocks tile `[BIN_TABLE_SIZE, len)` with no gap or overlap
  /// - every block address is aligned and its size is a class capacity
  /// - every block carries a known state tag
  /// - every listed block is in range, free and of its list's class
  /// - no list loops, and the free tags match the listed blocks
  pub fn integrity_check(&self) -> Result<(), Corruption> {
    self
      .check_blocks()
      .and_then(|tagged| self.check_lists(tagged))
      .inspect_err(|err| error!("integrity check failed: {}", err))
  }

  /// Walks the tiling and returns how many blocks are tagged free.
  fn check_blocks(&self) -> Result<usize, Corruption> {
    let bytes = self.arena.bytes();
    let base = self.arena.region_low() as usize;

    let mut tagged = 0;
    let mut header = BIN_TABLE_SIZE;
    while header < bytes.len() {
      let address = base + header;
      if !is_aligned(address) {
        return Err(Corruption::Misaligned {
          offset: header,
          address,
          alignment: ALIGNMENT,
        });
      }
      if !free_list::in_bounds(bytes, header) {
        return Err(Corruption::TilingMismatch {
          expected: bytes.len(),
          actual: header,
        });
      }

      let size = block::size(bytes, header);
      if class_of_capacity(size).is_none() {
        return Err(Corruption::BadSize { offset: header, size });
      }

      match block::state(bytes, header) {
        Some(BlockState::Free) => tagged += 1,
        Some(BlockState::Allocated) => {}
        None => {
          return Err(Corruption::BadState {
            offset: header,
            tag: block::state_tag(bytes, header),
          });
        }
      }

      header = block::right_neighbor(bytes, header);
    }

    if header != bytes.len() {
      return Err(Corruption::TilingMismatch {
        expected: bytes.len(),
        actual: header,
      });
    }
    Ok(tagged)
  }

  fn check_lists(
    &self,
    tagged: usize,
  ) -> Result<(), Corruption> {
    let bytes = self.arena.bytes();
    let limit = free_list::max_blocks(bytes);

    let mut listed = 0;
    for class in 0..BIN_COUNT {
      let mut cursor = free_list::head(bytes, class);
      let mut seen = 0;

      while let Some(offset) = cursor {
        let in_region = offset >= BIN_TABLE_SIZE && free_list::in_bounds(bytes, offset);
        if !in_region || !is_aligned(offset) {
          return Err(Corruption::ListOutOfRange { class, offset });
        }

        let size = block::size(bytes, offset);
        if size != capacity(class) {
          return Err(Corruption::ListWrongClass {
            class,
            offset,
            expected: capacity(class),
            actual: size,
          });
        }
        if block::state(bytes, offset) != Some(BlockState::Free) {
          return Err(Corruption::ListNotFree { class, offset });
        }

        seen += 1;
        if seen > limit {
          return Err(Corruption::ListCycle { class, limit });
        }
        cursor = block::next(bytes, offset);
      }

      listed += seen;
    }

    if listed != tagged {
      return Err(Corruption::FreeCountMismatch { listed, tagged });
    }
    Ok(())
  }
}
