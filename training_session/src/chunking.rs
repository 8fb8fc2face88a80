use std::ops::Range;

/// One request's worth of a chunked upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedChunk {
    pub index: u64,
    pub range: Range<u64>,
    pub is_last: bool,
}

/// Splits a file of `file_size` bytes into consecutive ranges of at most `chunk_size` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    file_size: u64,
    chunk_size: u64,
}

impl ChunkPlan {
    /// `chunk_size` must be positive.
    pub fn new(file_size: u64, chunk_size: u64) -> Self {
        debug_assert!(chunk_size > 0);
        Self {
            file_size,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn total_chunks(&self) -> u64 {
        self.file_size.div_ceil(self.chunk_size)
    }

    pub fn range(&self, index: u64) -> Range<u64> {
        let start = index.saturating_mul(self.chunk_size).min(self.file_size);
        let end = start.saturating_add(self.chunk_size).min(self.file_size);
        start..end
    }

    /// Upload progress once chunk `index` is acknowledged: `round((index + 1) / total * 100)`,
    /// with halves rounded up.
    pub fn progress_percent(&self, index: u64) -> u8 {
        let total = self.total_chunks();
        if total == 0 {
            return 100;
        }
        let done = (index + 1).min(total) as u128;
        let total = total as u128;
        ((done * 200 + total) / (2 * total)) as u8
    }

    pub fn chunks(&self) -> impl Iterator<Item = PlannedChunk> + '_ {
        let total = self.total_chunks();
        (0..total).map(move |index| PlannedChunk {
            index,
            range: self.range(index),
            is_last: index + 1 == total,
        })
    }
}
