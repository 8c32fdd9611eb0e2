use crate::block::HEADER_SIZE;

/// Snapshot of the heap's bookkeeping counters.
///
/// `allocated_*` cover every block that exists, free or occupied, resident or
/// mapped. `free_*` cover free resident blocks only; mapped blocks are never
/// cached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
  pub free_blocks: usize,
  pub free_bytes: usize,
  pub allocated_blocks: usize,
  pub allocated_bytes: usize,
  pub mapped_blocks: usize,
  pub mapped_bytes: usize,
}

impl HeapStats {
  pub const fn new() -> Self {
    Self {
      free_blocks: 0,
      free_bytes: 0,
      allocated_blocks: 0,
      allocated_bytes: 0,
      mapped_blocks: 0,
      mapped_bytes: 0,
    }
  }

  /// Bytes spent on headers across every existing block.
  pub const fn metadata_bytes(&self) -> usize {
    self.allocated_blocks * HEADER_SIZE
  }

  pub(crate) fn carved(
    &mut self,
    size: usize,
  ) {
    self.allocated_blocks += 1;
    self.allocated_bytes += size;
  }

  pub(crate) fn extended(
    &mut self,
    delta: usize,
  ) {
    self.allocated_bytes += delta;
  }

  pub(crate) fn mapped(
    &mut self,
    size: usize,
  ) {
    self.carved(size);
    self.mapped_blocks += 1;
    self.mapped_bytes += size;
  }

  pub(crate) fn unmapped(
    &mut self,
    size: usize,
  ) {
    self.allocated_blocks -= 1;
    self.allocated_bytes -= size;
    self.mapped_blocks -= 1;
    self.mapped_bytes -= size;
  }

  pub(crate) fn freed(
    &mut self,
    size: usize,
  ) {
    self.free_blocks += 1;
    self.free_bytes += size;
  }

  pub(crate) fn claimed(
    &mut self,
    size: usize,
  ) {
    self.free_blocks -= 1;
    self.free_bytes -= size;
  }

  /// A split turned former payload into a new header.
  pub(crate) fn header_carved(&mut self) {
    self.allocated_blocks += 1;
    self.allocated_bytes -= HEADER_SIZE;
  }

  /// A merge turned an absorbed header into payload.
  pub(crate) fn header_reclaimed(&mut self) {
    self.allocated_blocks -= 1;
    self.allocated_bytes += HEADER_SIZE;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_split_and_merge_cancel_out() {
    let mut stats = HeapStats::new();
    stats.carved(1000);
    let before = stats;

    stats.header_carved();
    assert_eq!(stats.allocated_blocks, 2);
    assert_eq!(stats.allocated_bytes, 1000 - HEADER_SIZE);
    assert_eq!(stats.metadata_bytes(), 2 * HEADER_SIZE);

    stats.header_reclaimed();
    assert_eq!(stats, before);
  }

  #[test]
  fn test_mapped_blocks_count_as_allocated() {
    let mut stats = HeapStats::new();
    stats.mapped(200_000);

    assert_eq!(stats.allocated_blocks, 1);
    assert_eq!(stats.allocated_bytes, 200_000);
    assert_eq!(stats.free_blocks, 0);

    stats.unmapped(200_000);
    assert_eq!(stats, HeapStats::default());
  }
}
