use std::mem;

use crate::error::ArenaError;

/// Default byte limit of a [`VecArena`].
pub const DEFAULT_LIMIT: usize = 1 << 30;

/// A contiguous, append-only byte region the heap is laid out in.
///
/// This plays the part of `sbrk`: the region only ever grows at its tail, and
/// the allocator is its sole owner. Positions inside the region are expressed
/// as offsets from [`Arena::region_low`].
pub trait Arena {
  /// Grows the region by `increment` bytes and returns the offset at which the
  /// new span starts. The new bytes hold unspecified contents.
  fn extend(
    &mut self,
    increment: usize,
  ) -> Result<usize, ArenaError>;

  /// The whole region as bytes.
  fn bytes(&self) -> &[u8];

  /// The whole region as mutable bytes.
  fn bytes_mut(&mut self) -> &mut [u8];

  fn len(&self) -> usize {
    self.bytes().len()
  }

  fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Address of the first byte of the region.
  ///
  /// May move across [`Arena::extend`] calls for providers that reallocate,
  /// which is why the heap never holds on to it.
  fn region_low(&self) -> *const u8 {
    self.bytes().as_ptr()
  }

  /// Address of the last valid byte of the region, `None` while it is empty.
  fn region_high(&self) -> Option<*const u8> {
    self.bytes().last().map(|byte| byte as *const u8)
  }
}

/// An arena backed by an owned, word-aligned buffer.
///
/// ```text
///   words: [u64; n]       (8-byte aligned storage)
///   ┌────────┬────────┬────────┬────────┬─ ─ ─ ─ ─ ┐
///   │ word 0 │ word 1 │ word 2 │  ...   │  spare    │
///   └────────┴────────┴────────┴────────┴─ ─ ─ ─ ─ ┘
///   ◄──────────── len bytes ──────────►
/// ```
///
/// Growth may reallocate the buffer, so the region's address is not stable,
/// but offsets into it are.
#[derive(Debug)]
pub struct VecArena {
  words: Vec<u64>,
  len: usize,
  limit: usize,
}

impl VecArena {
  pub fn new() -> Self {
    Self::with_limit(DEFAULT_LIMIT)
  }

  /// An arena that refuses to grow beyond `limit` bytes.
  pub fn with_limit(limit: usize) -> Self {
    Self {
      words: Vec::new(),
      len: 0,
      limit,
    }
  }

  pub fn limit(&self) -> usize {
    self.limit
  }
}

impl Default for VecArena {
  fn default() -> Self {
    Self::new()
  }
}

impl Arena for VecArena {
  fn extend(
    &mut self,
    increment: usize,
  ) -> Result<usize, ArenaError> {
    let exceeded = ArenaError::LimitExceeded {
      requested: increment,
      len: self.len,
      limit: self.limit,
    };
    let new_len = match self.len.checked_add(increment) {
      Some(new_len) if new_len <= self.limit => new_len,
      _ => return Err(exceeded),
    };

    let word = mem::size_of::<u64>();
    self.words.resize(new_len.div_ceil(word), 0);

    let start = self.len;
    self.len = new_len;
    Ok(start)
  }

  fn bytes(&self) -> &[u8] {
    &bytemuck::cast_slice::<u64, u8>(&self.words)[..self.len]
  }

  fn bytes_mut(&mut self) -> &mut [u8] {
    &mut bytemuck::cast_slice_mut::<u64, u8>(&mut self.words)[..self.len]
  }

  fn len(&self) -> usize {
    self.len
  }
}
