use crate::{
  bins::bin_index,
  block::BlockHeader,
  config::{ALIGNMENT, BIN_COUNT},
  error::IntegrityError,
  source::HeapSource,
};

use super::Heap;

fn expect(
  counter: &'static str,
  recorded: usize,
  actual: usize,
) -> Result<(), IntegrityError> {
  if recorded == actual {
    Ok(())
  } else {
    Err(IntegrityError::CounterDrift {
      counter,
      recorded,
      actual,
    })
  }
}

impl<S: HeapSource> Heap<S> {
  /// Walks every resident block and every bin and checks the heap's
  /// structural invariants against each other and against the counters.
  ///
  /// Mapped blocks are only visible through the counters.
  pub fn audit(&self) -> Result<(), IntegrityError> {
    let mut resident_blocks = 0;
    let mut resident_bytes = 0;
    let mut free_blocks = 0;
    let mut free_bytes = 0;
    let mut previous: *mut BlockHeader = std::ptr::null_mut();

    for block in self.blocks.iter() {
      let addr = block as usize;

      unsafe {
        if (*block).addr_prev != previous {
          return Err(IntegrityError::BrokenLink { addr });
        }
        if !previous.is_null() && BlockHeader::end(previous) as usize > addr {
          return Err(IntegrityError::Unordered { addr });
        }
        if (*block).mapped {
          return Err(IntegrityError::StrayMapping { addr });
        }
        if (*block).size % ALIGNMENT != 0 {
          return Err(IntegrityError::Misaligned {
            addr,
            size: (*block).size,
          });
        }
        if !previous.is_null()
          && (*previous).is_free
          && (*block).is_free
          && BlockHeader::borders(previous, block)
        {
          return Err(IntegrityError::Uncoalesced {
            left: previous as usize,
            right: addr,
          });
        }

        resident_blocks += 1;
        resident_bytes += (*block).size;
        if (*block).is_free {
          free_blocks += 1;
          free_bytes += (*block).size;
        }
      }

      previous = block;
    }

    if previous != self.blocks.wilderness() {
      return Err(IntegrityError::BrokenLink {
        addr: self.blocks.wilderness() as usize,
      });
    }

    let mut binned = 0;

    for bin in 0..BIN_COUNT {
      let mut current = self.bins.head(bin);
      let mut last_size = 0;

      while !current.is_null() {
        let addr = current as usize;

        unsafe {
          if !(*current).is_free {
            return Err(IntegrityError::OccupiedInBin { addr, bin });
          }
          let expected = bin_index((*current).size);
          if expected != bin {
            return Err(IntegrityError::Misfiled {
              addr,
              found: bin,
              expected,
            });
          }
          if (*current).size < last_size {
            return Err(IntegrityError::BinUnsorted { bin, addr });
          }

          last_size = (*current).size;
          current = (*current).bin_next;
        }

        binned += 1;
      }
    }

    if binned != free_blocks {
      return Err(IntegrityError::Unbinned {
        binned,
        free: free_blocks,
      });
    }

    let stats = self.stats;
    expect("resident blocks", self.blocks.len(), resident_blocks)?;
    expect("free blocks", stats.free_blocks, free_blocks)?;
    expect("free bytes", stats.free_bytes, free_bytes)?;
    expect(
      "allocated blocks",
      stats.allocated_blocks,
      resident_blocks + stats.mapped_blocks,
    )?;
    expect(
      "allocated bytes",
      stats.allocated_bytes,
      resident_bytes + stats.mapped_bytes,
    )?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use crate::{Heap, error::IntegrityError, source::ReservedSource};

  #[test]
  fn test_empty_heap_is_sound() {
    let heap = Heap::with_source(ReservedSource::new(4096).unwrap());
    assert_eq!(heap.audit(), Ok(()));
  }

  #[test]
  fn test_counter_drift_is_reported() {
    let mut heap = Heap::with_source(ReservedSource::new(4096).unwrap());
    let _p = heap.allocate(100);

    heap.stats.free_bytes += 8;

    assert_eq!(
      heap.audit(),
      Err(IntegrityError::CounterDrift {
        counter: "free bytes",
        recorded: 8,
        actual: 0,
      })
    );
  }

  #[test]
  fn test_occupied_block_in_bin_is_reported() {
    let mut heap = Heap::with_source(ReservedSource::new(4096).unwrap());
    let p = heap.allocate(100);
    let _guard = heap.allocate(100);

    unsafe {
      heap.release(p);
      let block = heap.bins.head(0);
      (*block).is_free = false;

      assert_eq!(
        heap.audit(),
        Err(IntegrityError::OccupiedInBin {
          addr: block as usize,
          bin: 0,
        })
      );
    }
  }
}
