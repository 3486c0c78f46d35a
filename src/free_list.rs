//! The bin table and the singly linked free list hanging off each entry.
//!
//! ```text
//!   arena offset 0
//!   ┌─────────┬─────────┬─────────┬─ ─ ─┬──────────┐
//!   │ bin 0   │ bin 1   │ bin 2   │     │ bin 19   │   bin table (20 words)
//!   └────┬────┴────┬────┴───NIL───┴─ ─ ─┴────┬─────┘
//!        │         │                         │
//!        ▼         ▼                         ▼
//!      [blk]     [blk]──►[blk]──►NIL       [blk]──►NIL
//!        │
//!        ▼
//!       NIL
//! ```
//!
//! Every function takes the whole arena as bytes and header offsets into it.

use crate::{
  block::{self, BlockState, HEADER_SIZE},
  class::bin_entry,
};

/// Head of the free list of `class`.
pub fn head(
  bytes: &[u8],
  class: usize,
) -> Option<usize> {
  block::decode_link(block::read_u64(bytes, bin_entry(class)))
}

pub fn set_head(
  bytes: &mut [u8],
  class: usize,
  header: Option<usize>,
) {
  block::write_u64(bytes, bin_entry(class), block::encode_link(header));
}

pub fn is_empty(
  bytes: &[u8],
  class: usize,
) -> bool {
  head(bytes, class).is_none()
}

/// Detaches the head block of `class`, leaving it with no successor.
pub fn pop_head(
  bytes: &mut [u8],
  class: usize,
) -> Option<usize> {
  let header = head(bytes, class)?;
  let successor = block::next(bytes, header);

  set_head(bytes, class, successor);
  block::set_next(bytes, header, None);

  Some(header)
}

/// Makes `header` the new head of `class` and tags it free.
///
/// The caller is responsible for the block's size matching the class.
pub fn push_head(
  bytes: &mut [u8],
  class: usize,
  header: usize,
) {
  let old_head = head(bytes, class);

  block::set_next(bytes, header, old_head);
  block::set_state(bytes, header, BlockState::Free);
  set_head(bytes, class, Some(header));
}

/// Splices `header` out of the free list of `class`.
///
/// Walks from the bin table entry looking for the predecessor, so this is
/// linear in the list length. Returns `false` when `header` is not on the
/// list.
pub fn unlink(
  bytes: &mut [u8],
  class: usize,
  header: usize,
) -> bool {
  let Some(first) = head(bytes, class) else {
    return false;
  };
  if !in_bounds(bytes, first) {
    return false;
  }

  if first == header {
    let successor = block::next(bytes, header);
    set_head(bytes, class, successor);
    block::set_next(bytes, header, None);
    return true;
  }

  let mut budget = max_blocks(bytes);
  let mut previous = first;
  while let Some(current) = block::next(bytes, previous) {
    if current == header {
      let successor = block::next(bytes, header);
      block::set_next(bytes, previous, successor);
      block::set_next(bytes, header, None);
      return true;
    }

    budget = budget.saturating_sub(1);
    if budget == 0 || !in_bounds(bytes, current) {
      break;
    }
    previous = current;
  }

  false
}

/// Walks the free list of `class` from its head.
pub fn iter(
  bytes: &[u8],
  class: usize,
) -> FreeListIter<'_> {
  FreeListIter {
    bytes,
    cursor: head(bytes, class),
    budget: max_blocks(bytes),
  }
}

/// Iterator over the header offsets of one free list.
///
/// Stops early on a link that leaves the arena or once more entries have
/// been seen than blocks could fit in the arena, so a damaged list cannot
/// hang or panic the walk.
pub struct FreeListIter<'a> {
  bytes: &'a [u8],
  cursor: Option<usize>,
  budget: usize,
}

impl Iterator for FreeListIter<'_> {
  type Item = usize;

  fn next(&mut self) -> Option<usize> {
    let current = self.cursor?;
    if self.budget == 0 || !in_bounds(self.bytes, current) {
      self.cursor = None;
      return None;
    }

    self.budget -= 1;
    self.cursor = block::next(self.bytes, current);
    Some(current)
  }
}

/// Upper bound on the number of blocks that fit in `bytes`.
pub(crate) fn max_blocks(bytes: &[u8]) -> usize {
  bytes.len() / HEADER_SIZE
}

pub(crate) fn in_bounds(
  bytes: &[u8],
  header: usize,
) -> bool {
  header
    .checked_add(HEADER_SIZE)
    .is_some_and(|end| end <= bytes.len())
}
