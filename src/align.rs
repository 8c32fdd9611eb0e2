/// Rounds the given size up to the heap's [`ALIGNMENT`](crate::config::ALIGNMENT).
///
/// # Examples
///
/// ```rust
/// use segalloc::align;
///
/// assert_eq!(align!(1), 8);
/// assert_eq!(align!(100), 104);
/// assert_eq!(align!(128_000), 128_000);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + $crate::config::ALIGNMENT - 1) & !($crate::config::ALIGNMENT - 1)
  };
}

#[cfg(test)]
mod tests {
  use crate::config::ALIGNMENT;

  #[test]
  fn test_align_rounds_up_to_grid() {
    for size in 1..=ALIGNMENT {
      assert_eq!(align!(size), ALIGNMENT);
    }

    assert_eq!(align!(100), 104);
    assert_eq!(align!(127_993), 128_000);
    // one past the class edge lands in the large class
    assert_eq!(align!(128_001), 128_008);
    assert_eq!(align!(99_999_999), 100_000_000);
  }

  #[test]
  fn test_align_keeps_multiples() {
    for size in [0, 8, 1000, 127_000, 128_000, 100_000_000] {
      assert_eq!(size, align!(size));
    }
  }
}
