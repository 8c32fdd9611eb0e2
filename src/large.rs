//! Requests above the large-class edge bypass the bins and the break: each
//! one gets its own mapping, released the moment the block is.

use log::debug;

use crate::{
  block::{BlockHeader, HEADER_SIZE},
  error::HeapError,
  source::HeapSource,
};

pub unsafe fn map_block<S: HeapSource>(
  source: &mut S,
  size: usize,
) -> Result<*mut BlockHeader, HeapError> {
  unsafe {
    let region = source.map(HEADER_SIZE + size)?;
    let block = region.as_ptr() as *mut BlockHeader;
    block.write(BlockHeader::new(size, true));

    debug!("mapped large block {:?} of {} bytes", block, size);
    Ok(block)
  }
}

pub unsafe fn unmap_block<S: HeapSource>(
  source: &mut S,
  block: *mut BlockHeader,
) {
  unsafe {
    debug_assert!((*block).mapped);

    let size = (*block).size;
    source.unmap(std::ptr::NonNull::new_unchecked(block as *mut u8), HEADER_SIZE + size);

    debug!("unmapped large block {:?} of {} bytes", block, size);
  }
}
