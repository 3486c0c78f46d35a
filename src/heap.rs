use log::{debug, trace, warn};

use crate::{
  align,
  align::is_aligned,
  arena::Arena,
  block::{self, Block, BlockState},
  class::{
    self, BIN_COUNT, BIN_TABLE_SIZE, capacity, class_for_request, class_of_capacity, slot_size,
  },
  config::HeapConfig,
  error::{AllocError, AllocResult, Corruption},
  free_list,
};

/// Bytes requested from the arena when the heap is laid down: the bin table
/// plus one block of every class.
pub const INITIAL_ARENA_SIZE: usize = align!(BIN_TABLE_SIZE + class::all_slots_size());

/// A payload handed out by [`Heap::alloc`], as an offset into the arena.
///
/// The real address is `arena.region_low() + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockPtr(usize);

impl BlockPtr {
  pub const fn new(offset: usize) -> Self {
    Self(offset)
  }

  pub const fn offset(self) -> usize {
    self.0
  }
}

/// Counters describing the heap's history and current shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
  /// Bytes currently held by the arena, bin table included.
  pub arena_bytes: usize,
  /// How many times the arena was extended after initialization.
  pub grow_events: usize,
  /// How many larger blocks were carved up to serve a request.
  pub splits: usize,
  /// How many releases merged with their right neighbour.
  pub coalesces: usize,
  /// Blocks currently handed out.
  pub live_blocks: usize,
  /// Blocks currently on a free list.
  pub free_blocks: usize,
}

/// Segregated free-list allocator over an [`Arena`].
///
/// ```text
///   offset 0        160
///   ┌──────────────┬────┬──────┬──────────┬─────────────────┬─ ─ ─
///   │  bin table   │ c0 │  c1  │    c2    │       c3        │ ...
///   │  (20 words)  │    │      │          │                 │
///   └──────────────┴────┴──────┴──────────┴─────────────────┴─ ─ ─
///                  ◄──── blocks tile the rest of the arena ────►
/// ```
///
/// Every operation takes `&mut self`; the heap is single-threaded.
pub struct Heap<A: Arena> {
  pub(crate) arena: A,
  pub(crate) config: HeapConfig,
  pub(crate) stats: HeapStats,
}

impl<A: Arena> Heap<A> {
  /// Lays the heap down in `arena` with the default configuration.
  pub fn init(arena: A) -> AllocResult<Self> {
    Self::with_config(arena, HeapConfig::default())
  }

  /// Lays the heap down in `arena`, which must still be empty.
  pub fn with_config(
    mut arena: A,
    config: HeapConfig,
  ) -> AllocResult<Self> {
    if !arena.is_empty() {
      return Err(AllocError::ArenaNotEmpty(arena.len()));
    }

    let start = arena.extend(INITIAL_ARENA_SIZE)?;
    debug_assert_eq!(start, 0);

    let bytes = arena.bytes_mut();
    let mut header = BIN_TABLE_SIZE;
    for class in 0..BIN_COUNT {
      Block::new(None, capacity(class), BlockState::Free).write(bytes, header);
      free_list::set_head(bytes, class, Some(header));
      header += slot_size(class);
    }

    debug!(
      "heap initialized: {} bytes at {:?}, {} classes",
      INITIAL_ARENA_SIZE,
      arena.region_low(),
      BIN_COUNT
    );

    let heap = Self {
      arena,
      config,
      stats: HeapStats::default(),
    };
    heap.verify()?;
    Ok(heap)
  }

  /// Hands out a block of at least `size` bytes.
  ///
  /// Tries the request's own class first, then every larger class, splitting
  /// the first non-empty one. When all classes are empty the arena is grown
  /// once and the request is served from the new block of its class.
  ///
  /// An [`AllocError::Corrupted`] from the post-mutation check is reported
  /// after the block was taken off its list, so that block stays allocated
  /// and unreachable. The heap is already damaged at that point.
  pub fn alloc(
    &mut self,
    size: usize,
  ) -> AllocResult<BlockPtr> {
    let target =
      class_for_request(size).inspect_err(|err| warn!("alloc({}) rejected: {}", size, err))?;

    let found = match self.first_nonempty(target) {
      Some(found) => found,
      None => {
        self.increase_heap_size()?;
        target
      }
    };

    let header = if found == target {
      free_list::pop_head(self.arena.bytes_mut(), target)
    } else {
      self.split(target, found)
    }
    .ok_or(Corruption::EmptyClass { class: found })?;

    block::set_state(self.arena.bytes_mut(), header, BlockState::Allocated);
    self.stats.live_blocks += 1;

    let ptr = BlockPtr(block::payload_of(header));
    trace!("alloc({}) -> 0x{:x} (class {}, from class {})", size, ptr.0, target, found);

    self.verify()?;
    Ok(ptr)
  }

  /// Returns a block to its free list, merging it with an equal-sized free
  /// right neighbour first.
  ///
  /// Releasing a pointer this heap did not hand out is a caller error. The
  /// cheap cases (out of range, misaligned, already free) are rejected
  /// without touching the heap; anything subtler is not detected.
  pub fn release(
    &mut self,
    ptr: BlockPtr,
  ) -> AllocResult<()> {
    let header = self
      .allocated_header(ptr)
      .inspect_err(|err| warn!("release(0x{:x}) rejected: {}", ptr.0, err))?;

    self.coalesce(header);

    let bytes = self.arena.bytes_mut();
    let size = block::size(bytes, header);
    let class = class_of_capacity(size).ok_or(Corruption::BadSize { offset: header, size })?;
    free_list::push_head(bytes, class, header);
    self.stats.live_blocks -= 1;

    trace!("release(0x{:x}) -> class {}", ptr.0, class);

    self.verify()
  }

  /// Moves an allocation into a block of at least `size` bytes.
  ///
  /// The first `min(size, old capacity)` bytes are carried over. If the new
  /// block cannot be had, the original block is left as it was. An
  /// [`AllocError::Corrupted`] may instead arrive after the move, with the
  /// new block allocated and the old one released or on its way there.
  pub fn realloc(
    &mut self,
    ptr: BlockPtr,
    size: usize,
  ) -> AllocResult<BlockPtr> {
    let old_header = self.allocated_header(ptr)?;
    let old_size = block::size(self.arena.bytes(), old_header);

    let new_ptr = self.alloc(size)?;

    let copy_size = size.min(old_size);
    self
      .arena
      .bytes_mut()
      .copy_within(ptr.0..ptr.0 + copy_size, new_ptr.0);

    self.release(ptr)?;

    trace!(
      "realloc(0x{:x}, {}) -> 0x{:x}, copied {} bytes",
      ptr.0, size, new_ptr.0, copy_size
    );
    Ok(new_ptr)
  }

  /// The full capacity of an allocated block.
  pub fn payload(
    &self,
    ptr: BlockPtr,
  ) -> AllocResult<&[u8]> {
    let header = self.allocated_header(ptr)?;
    let bytes = self.arena.bytes();
    let size = block::size(bytes, header);
    Ok(&bytes[ptr.0..ptr.0 + size])
  }

  /// The full capacity of an allocated block, writable.
  pub fn payload_mut(
    &mut self,
    ptr: BlockPtr,
  ) -> AllocResult<&mut [u8]> {
    let header = self.allocated_header(ptr)?;
    let bytes = self.arena.bytes_mut();
    let size = block::size(bytes, header);
    Ok(&mut bytes[ptr.0..ptr.0 + size])
  }

  /// Capacity of an allocated block, which may exceed what was requested.
  pub fn usable_size(
    &self,
    ptr: BlockPtr,
  ) -> AllocResult<usize> {
    let header = self.allocated_header(ptr)?;
    Ok(block::size(self.arena.bytes(), header))
  }

  pub fn stats(&self) -> HeapStats {
    HeapStats {
      arena_bytes: self.arena.len(),
      free_blocks: (0..BIN_COUNT).map(|class| self.free_count(class)).sum(),
      ..self.stats
    }
  }

  pub fn config(&self) -> HeapConfig {
    self.config
  }

  pub fn arena(&self) -> &A {
    &self.arena
  }

  /// Gives the arena back, heap contents and all.
  pub fn into_arena(self) -> A {
    self.arena
  }

  /// Header offsets on the free list of every class, head first.
  pub fn free_lists(&self) -> Vec<Vec<usize>> {
    (0..BIN_COUNT)
      .map(|class| free_list::iter(self.arena.bytes(), class).collect())
      .collect()
  }

  pub fn free_count(
    &self,
    class: usize,
  ) -> usize {
    free_list::iter(self.arena.bytes(), class).count()
  }

  /// Writes every non-empty free list to the `debug` log.
  pub fn log_free_lists(&self) {
    for (class, list) in self.free_lists().iter().enumerate() {
      if !list.is_empty() {
        debug!("class {} (capacity {}): {:x?}", class, capacity(class), list);
      }
    }
  }

  fn first_nonempty(
    &self,
    from: usize,
  ) -> Option<usize> {
    let bytes = self.arena.bytes();
    (from..BIN_COUNT).find(|&class| !free_list::is_empty(bytes, class))
  }

  /// Header of the allocated block whose payload starts at `ptr`.
  fn allocated_header(
    &self,
    ptr: BlockPtr,
  ) -> AllocResult<usize> {
    let bytes = self.arena.bytes();
    let invalid = AllocError::InvalidPointer(ptr.0);

    let header = match block::header_of(ptr.0) {
      Some(header) if header >= BIN_TABLE_SIZE && is_aligned(header) => header,
      _ => return Err(invalid),
    };
    if !free_list::in_bounds(bytes, header) {
      return Err(invalid);
    }

    match block::state(bytes, header) {
      Some(BlockState::Allocated) => {}
      Some(BlockState::Free) => return Err(AllocError::DoubleRelease(ptr.0)),
      None => return Err(invalid),
    }

    let size = block::size(bytes, header);
    let fits = ptr.0.checked_add(size).is_some_and(|end| end <= bytes.len());
    if class_of_capacity(size).is_none() || !fits {
      return Err(invalid);
    }

    Ok(header)
  }

  /// Runs the integrity check when the configuration asks for it.
  pub(crate) fn verify(&self) -> AllocResult<()> {
    if self.config.verify_on_mutation {
      self.integrity_check()?;
    }
    Ok(())
  }
}
