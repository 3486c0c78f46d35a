/// Minimum alignment of every block header and every payload handed out.
///
/// Must be a power of two and at least the size of the header's `next` word.
pub const ALIGNMENT: usize = 8;

/// Rounds `value` up to the nearest multiple of [`ALIGNMENT`].
///
/// # Examples
///
/// ```rust
/// use binalloc::align;
///
/// assert_eq!(align!(0), 0);
/// assert_eq!(align!(13), 16);
/// assert_eq!(align!(16), 16);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + $crate::align::ALIGNMENT - 1) & !($crate::align::ALIGNMENT - 1)
  };
}

/// Returns `true` when `value` is a multiple of [`ALIGNMENT`].
pub const fn is_aligned(value: usize) -> bool {
  value & (ALIGNMENT - 1) == 0
}
