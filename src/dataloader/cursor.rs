use super::error::{DataLoaderError, Result};

/// Read offset into one split. The offset may go negative after a
/// wraparound so that the row which overflowed maps to index 0.
#[derive(Clone, Copy, Debug)]
pub struct CyclicCursor {
    offset: i64,
    len: usize,
}

/// Indices for one batch, computed without touching the cursor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchPlan {
    pub indices: Vec<usize>,
    /// Row at which the list wrapped back to index 0, if it did.
    pub wrapped_at: Option<usize>,
    next_offset: i64,
}

impl BatchPlan {
    pub fn next_offset(&self) -> i64 {
        self.next_offset
    }
}

impl CyclicCursor {
    pub fn new(len: usize) -> Self {
        CyclicCursor { offset: 0, len }
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn check_batch_size(&self, batch_size: usize) -> Result<()> {
        if batch_size == 0 {
            return Err(DataLoaderError::InvalidBatchSize);
        }
        // A second wrap inside one batch has no defined meaning
        if batch_size > self.len {
            return Err(DataLoaderError::BatchTooLarge {
                batch_size,
                len: self.len,
            });
        }
        Ok(())
    }

    pub fn plan(&self, batch_size: usize) -> Result<BatchPlan> {
        self.check_batch_size(batch_size)?;

        let len = self.len as i64;
        let mut offset = self.offset;
        let mut wrapped_at = None;
        let mut indices = Vec::with_capacity(batch_size);

        for i in 0..batch_size as i64 {
            let mut idx = i + offset;
            if idx >= len {
                offset = -i;
                idx = 0;
                wrapped_at = Some(i as usize);
            }
            indices.push(idx as usize);
        }

        Ok(BatchPlan {
            indices,
            wrapped_at,
            next_offset: offset + batch_size as i64,
        })
    }

    pub fn commit(&mut self, plan: &BatchPlan) {
        self.offset = plan.next_offset;
    }

    /// Indices consumed by the most recent batch of `count` rows, rebuilt
    /// from the current offset. Negative positions count from the tail.
    pub fn recent(&self, count: usize) -> Result<Vec<usize>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        self.check_batch_size(count)?;
        let len = self.len as i64;
        Ok((0..count as i64)
            .map(|i| (i + self.offset - count as i64).rem_euclid(len) as usize)
            .collect())
    }
}
