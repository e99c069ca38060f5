//! Chunk planning.

use super::Asset;

/// Number of assets handled per remote round trip, by job size.
pub fn chunk_size(total: usize) -> usize {
    if total > 2500 {
        100
    } else if total < 100 {
        1
    } else {
        10
    }
}

/// A contiguous run of assets whose results land at `start_offset`
/// onwards in the imageset.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    pub assets: &'a [Asset],
    pub start_offset: u64,
}

impl Chunk<'_> {
    pub fn count(&self) -> usize {
        self.assets.len()
    }

    /// One past the last slot this chunk owns.
    pub fn end_offset(&self) -> u64 {
        self.start_offset + self.assets.len() as u64
    }
}

/// Splits `assets` into ordered chunks tiling `[offset, offset + len)`.
pub fn plan(assets: &[Asset], offset: u64) -> Vec<Chunk<'_>> {
    if assets.is_empty() {
        return Vec::new();
    }
    let size = chunk_size(assets.len());
    assets
        .chunks(size)
        .enumerate()
        .map(|(i, run)| Chunk {
            assets: run,
            start_offset: offset + (i * size) as u64,
        })
        .collect()
}
