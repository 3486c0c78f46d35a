use std::{ptr, slice};

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_NORESERVE, MAP_PRIVATE, PROT_READ, PROT_WRITE, c_void};

use crate::{arena::Arena, error::ArenaError};

/// An arena carved out of one anonymous mapping reserved up front.
///
/// The mapping is reserved with `MAP_NORESERVE`, so untouched pages cost
/// nothing. A private break moves through it the way `sbrk(2)` moves the
/// program break:
///
/// ```text
///   base                     brk                               base + capacity
///   ┌────────────────────────┬────────────────────────────────────────┐
///   │   region handed out    │          reserved, not yet used        │
///   └────────────────────────┴────────────────────────────────────────┘
///                            ▲
///                            └── extend(n) returns this offset, then brk += n
/// ```
///
/// Unlike the real program break, nothing else in the process can move this
/// one, and the region never changes address.
#[derive(Debug)]
pub struct MmapArena {
  base: *mut u8,
  brk: usize,
  capacity: usize,
}

impl MmapArena {
  /// Reserves `capacity` bytes of address space.
  pub fn reserve(capacity: usize) -> Result<Self, ArenaError> {
    if capacity == 0 {
      return Err(ArenaError::ZeroSized);
    }

    let address = unsafe {
      libc::mmap(
        ptr::null_mut(),
        capacity,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS | MAP_NORESERVE,
        -1,
        0,
      )
    };

    if address == MAP_FAILED {
      let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
      return Err(ArenaError::Os(errno));
    }

    log::debug!("reserved {} bytes at {:?}", capacity, address);

    Ok(Self {
      base: address as *mut u8,
      brk: 0,
      capacity,
    })
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }
}

impl Arena for MmapArena {
  fn extend(
    &mut self,
    increment: usize,
  ) -> Result<usize, ArenaError> {
    let exceeded = ArenaError::LimitExceeded {
      requested: increment,
      len: self.brk,
      limit: self.capacity,
    };
    let new_brk = match self.brk.checked_add(increment) {
      Some(new_brk) if new_brk <= self.capacity => new_brk,
      _ => return Err(exceeded),
    };

    let start = self.brk;
    self.brk = new_brk;
    Ok(start)
  }

  fn bytes(&self) -> &[u8] {
    // SAFETY: `base..base + capacity` is a live read/write mapping owned by
    // `self`, and `brk <= capacity`.
    unsafe { slice::from_raw_parts(self.base, self.brk) }
  }

  fn bytes_mut(&mut self) -> &mut [u8] {
    // SAFETY: as in `bytes`, and `&mut self` makes the view unique.
    unsafe { slice::from_raw_parts_mut(self.base, self.brk) }
  }

  fn len(&self) -> usize {
    self.brk
  }
}

impl Drop for MmapArena {
  fn drop(&mut self) {
    // SAFETY: the mapping was created in `reserve` with exactly this length
    // and no view of it outlives `self`.
    let result = unsafe { libc::munmap(self.base as *mut c_void, self.capacity) };
    if result != 0 {
      log::warn!("munmap of {:?} failed", self.base);
    }
  }
}
