//! Power-of-two size classes.
//!
//! ```text
//!   class │ slot size │ capacity (slot - header)
//!   ──────┼───────────┼─────────────────────────
//!     0   │      16 B │        0 B
//!     1   │      32 B │       16 B
//!     2   │      64 B │       48 B
//!     3   │     128 B │      112 B
//!    ...  │    ...    │      ...
//!    19   │     8 MiB │  8 MiB - 16 B
//! ```

use crate::{
  align,
  block::{HEADER_SIZE, WORD_SIZE},
  error::AllocError,
};

/// Number of size classes, and of entries in the bin table.
pub const BIN_COUNT: usize = 20;

/// Log2 of the smallest slot size.
pub const BASE_SHIFT: u32 = 4;

/// Bytes taken by the bin table at the start of the arena.
pub const BIN_TABLE_SIZE: usize = BIN_COUNT * WORD_SIZE;

/// Header plus payload bytes of one block of `class`.
pub const fn slot_size(class: usize) -> usize {
  align!(1usize << (class as u32 + BASE_SHIFT))
}

/// Payload bytes of one block of `class`.
pub const fn capacity(class: usize) -> usize {
  align!(slot_size(class) - HEADER_SIZE)
}

/// Largest payload any request can be served with.
pub const MAX_CAPACITY: usize = capacity(BIN_COUNT - 1);

/// Sum of one slot of every class: what one heap growth appends.
pub const fn all_slots_size() -> usize {
  let mut total = 0;
  let mut class = 0;
  while class < BIN_COUNT {
    total += slot_size(class);
    class += 1;
  }
  total
}

/// Smallest class whose capacity holds `size` bytes.
///
/// This is `ceil(log2(size + HEADER_SIZE)) - BASE_SHIFT`, floored at zero.
pub fn class_for_request(size: usize) -> Result<usize, AllocError> {
  let oversize = AllocError::Oversize {
    requested: size,
    max: MAX_CAPACITY,
  };

  let slot = size
    .checked_add(HEADER_SIZE)
    .and_then(usize::checked_next_power_of_two)
    .ok_or_else(|| oversize.clone())?;

  let class = slot.trailing_zeros().saturating_sub(BASE_SHIFT) as usize;
  if class >= BIN_COUNT {
    return Err(oversize);
  }

  Ok(class)
}

/// The class whose capacity is exactly `size`, if any.
pub fn class_of_capacity(size: usize) -> Option<usize> {
  let slot = size.checked_add(HEADER_SIZE)?;
  if !slot.is_power_of_two() {
    return None;
  }

  let class = slot.trailing_zeros().checked_sub(BASE_SHIFT)? as usize;
  (class < BIN_COUNT).then_some(class)
}

/// Offset of the bin table entry for `class`.
pub const fn bin_entry(class: usize) -> usize {
  class * WORD_SIZE
}
