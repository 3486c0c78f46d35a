use thiserror::Error;

/// Failure reported by an [`Arena`](crate::arena::Arena) provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArenaError {
  #[error(
    "arena limit exceeded: requested {requested} more bytes with {len} in use, limit {limit}"
  )]
  LimitExceeded {
    requested: usize,
    len: usize,
    limit: usize,
  },

  #[error("zero-sized arena reservation")]
  ZeroSized,

  #[error("operating system refused the mapping (errno {0})")]
  Os(i32),
}

/// Failure reported by the allocator facade.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
  #[error("request of {requested} bytes exceeds the largest class capacity of {max} bytes")]
  Oversize { requested: usize, max: usize },

  #[error("arena exhausted: {0}")]
  ArenaExhausted(#[from] ArenaError),

  #[error("arena must be empty before the heap is laid down, found {0} bytes")]
  ArenaNotEmpty(usize),

  #[error("0x{0:x} does not address a block of this heap")]
  InvalidPointer(usize),

  #[error("block at 0x{0:x} is already free")]
  DoubleRelease(usize),

  #[error("heap corrupted: {0}")]
  Corrupted(#[from] Corruption),
}

/// First inconsistency found by [`Heap::integrity_check`](crate::Heap::integrity_check).
///
/// Offsets are relative to the start of the arena.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Corruption {
  #[error("block at 0x{offset:x} (address 0x{address:x}) violates {alignment}-byte alignment")]
  Misaligned {
    offset: usize,
    address: usize,
    alignment: usize,
  },

  #[error("block at 0x{offset:x} has size {size}, which is not a class capacity")]
  BadSize { offset: usize, size: usize },

  #[error("block at 0x{offset:x} has unknown state tag 0x{tag:08x}")]
  BadState { offset: usize, tag: u32 },

  #[error("block walk ended at 0x{actual:x}, expected 0x{expected:x}")]
  TilingMismatch { expected: usize, actual: usize },

  #[error("class {class} list entry 0x{offset:x} lies outside the block region")]
  ListOutOfRange { class: usize, offset: usize },

  #[error("class {class} list entry 0x{offset:x} has size {actual}, expected {expected}")]
  ListWrongClass {
    class: usize,
    offset: usize,
    expected: usize,
    actual: usize,
  },

  #[error("class {class} list entry 0x{offset:x} is not tagged free")]
  ListNotFree { class: usize, offset: usize },

  #[error("class {class} list does not terminate after {limit} entries")]
  ListCycle { class: usize, limit: usize },

  #[error("class {class} free list is empty where a block was expected")]
  EmptyClass { class: usize },

  #[error("{listed} blocks are listed free but {tagged} are tagged free")]
  FreeCountMismatch { listed: usize, tagged: usize },
}

pub type AllocResult<T> = Result<T, AllocError>;
