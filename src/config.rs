/// Switches that trade speed for diagnostics.
///
/// ```rust
/// use binalloc::HeapConfig;
///
/// let config = HeapConfig::default().with_verify_on_mutation(true);
/// assert!(config.verify_on_mutation);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapConfig {
  /// Run the full integrity check after every `alloc`, `release` and heap
  /// growth, failing the operation with
  /// [`AllocError::Corrupted`](crate::AllocError::Corrupted) if it trips.
  /// The failed operation is not rolled back. The check walks the whole
  /// arena, so this is for debugging only.
  pub verify_on_mutation: bool,

  /// Dump every free list at `debug` level after each heap growth.
  pub log_free_lists_on_grow: bool,
}

impl HeapConfig {
  pub fn with_verify_on_mutation(
    mut self,
    enabled: bool,
  ) -> Self {
    self.verify_on_mutation = enabled;
    self
  }

  pub fn with_log_free_lists_on_grow(
    mut self,
    enabled: bool,
  ) -> Self {
    self.log_free_lists_on_grow = enabled;
    self
  }
}
