//! In-arena block header layout.
//!
//! ```text
//!   header (16 bytes)                  payload
//!   ┌──────────────┬────────┬────────┬───────────────────────┐
//!   │ next  (u64)  │ size   │ state  │  size bytes           │
//!   │              │ (u32)  │ (u32)  │                       │
//!   └──────────────┴────────┴────────┴───────────────────────┘
//!   ▲                                ▲
//!   header offset                    header offset + HEADER_SIZE
//! ```
//!
//! All fields are native-endian. Offsets are relative to the arena start.

use std::mem;

use crate::align;

/// Size of one header word, rounded to the alignment.
pub const WORD_SIZE: usize = align!(mem::size_of::<u64>());

/// Size of a block header.
pub const HEADER_SIZE: usize = align!(2 * WORD_SIZE);

/// End-of-list sentinel stored in `next` fields and bin table entries.
pub const NIL: u64 = u64::MAX;

const NEXT_OFFSET: usize = 0;
const SIZE_OFFSET: usize = WORD_SIZE;
const STATE_OFFSET: usize = WORD_SIZE + mem::size_of::<u32>();

const FREE_TAG: u32 = 0x4652_4545;
const ALLOCATED_TAG: u32 = 0x5553_4544;

/// Whether a block sits on a free list or belongs to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
  Free,
  Allocated,
}

impl BlockState {
  pub const fn tag(self) -> u32 {
    match self {
      BlockState::Free => FREE_TAG,
      BlockState::Allocated => ALLOCATED_TAG,
    }
  }

  pub const fn from_tag(tag: u32) -> Option<Self> {
    match tag {
      FREE_TAG => Some(BlockState::Free),
      ALLOCATED_TAG => Some(BlockState::Allocated),
      _ => None,
    }
  }
}

/// A decoded block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
  pub next: Option<usize>,
  pub size: usize,
  pub state: BlockState,
}

impl Block {
  pub fn new(
    next: Option<usize>,
    size: usize,
    state: BlockState,
  ) -> Self {
    Self { next, size, state }
  }

  /// A detached block handed to a caller.
  pub fn allocated(size: usize) -> Self {
    Self::new(None, size, BlockState::Allocated)
  }

  /// Writes all three header fields at `at`.
  pub fn write(
    self,
    bytes: &mut [u8],
    at: usize,
  ) {
    set_next(bytes, at, self.next);
    set_size(bytes, at, self.size);
    write_u32(bytes, at + STATE_OFFSET, self.state.tag());
  }
}

/// Payload offset of the block whose header is at `header`.
pub const fn payload_of(header: usize) -> usize {
  header + HEADER_SIZE
}

/// Header offset of the block whose payload is at `payload`.
pub const fn header_of(payload: usize) -> Option<usize> {
  payload.checked_sub(HEADER_SIZE)
}

/// Offset of the block immediately to the right of `header`.
pub fn right_neighbor(
  bytes: &[u8],
  header: usize,
) -> usize {
  header + HEADER_SIZE + size(bytes, header)
}

pub fn next(
  bytes: &[u8],
  at: usize,
) -> Option<usize> {
  decode_link(read_u64(bytes, at + NEXT_OFFSET))
}

pub fn set_next(
  bytes: &mut [u8],
  at: usize,
  next: Option<usize>,
) {
  write_u64(bytes, at + NEXT_OFFSET, encode_link(next));
}

pub fn size(
  bytes: &[u8],
  at: usize,
) -> usize {
  read_u32(bytes, at + SIZE_OFFSET) as usize
}

/// Stores `size`, which must fit the compact 32-bit field.
pub fn set_size(
  bytes: &mut [u8],
  at: usize,
  size: usize,
) {
  debug_assert!(size <= u32::MAX as usize, "block size {size} exceeds the size field");
  write_u32(bytes, at + SIZE_OFFSET, size as u32);
}

/// Raw state tag, which may be garbage on a corrupted heap.
pub fn state_tag(
  bytes: &[u8],
  at: usize,
) -> u32 {
  read_u32(bytes, at + STATE_OFFSET)
}

pub fn state(
  bytes: &[u8],
  at: usize,
) -> Option<BlockState> {
  BlockState::from_tag(state_tag(bytes, at))
}

pub fn set_state(
  bytes: &mut [u8],
  at: usize,
  state: BlockState,
) {
  write_u32(bytes, at + STATE_OFFSET, state.tag());
}

pub(crate) fn decode_link(raw: u64) -> Option<usize> {
  if raw == NIL { None } else { Some(raw as usize) }
}

pub(crate) fn encode_link(link: Option<usize>) -> u64 {
  link.map_or(NIL, |offset| offset as u64)
}

pub(crate) fn read_u64(
  bytes: &[u8],
  at: usize,
) -> u64 {
  let mut raw = [0u8; 8];
  raw.copy_from_slice(&bytes[at..at + 8]);
  u64::from_ne_bytes(raw)
}

pub(crate) fn write_u64(
  bytes: &mut [u8],
  at: usize,
  value: u64,
) {
  bytes[at..at + 8].copy_from_slice(&value.to_ne_bytes());
}

fn read_u32(
  bytes: &[u8],
  at: usize,
) -> u32 {
  let mut raw = [0u8; 4];
  raw.copy_from_slice(&bytes[at..at + 4]);
  u32::from_ne_bytes(raw)
}

fn write_u32(
  bytes: &mut [u8],
  at: usize,
  value: u32,
) {
  bytes[at..at + 4].copy_from_slice(&value.to_ne_bytes());
}
