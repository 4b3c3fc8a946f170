use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver};
use tracing::debug;

use super::data_batch::DataBatch;
use super::dataloader::{BatchSource, DatasetSplit};
use super::error::{DataLoaderError, Result};

/// Batches produced ahead of time by one worker thread that owns the source.
///
/// The stream is endless since splits cycle. It stops after the first error,
/// which is handed to the consumer as the last item.
pub struct PrefetchIterator {
    receiver: Option<Receiver<Result<DataBatch>>>,
    worker: Option<JoinHandle<()>>,
}

impl PrefetchIterator {
    pub fn new<S>(mut source: S, split: DatasetSplit, batch_size: usize, capacity: usize) -> Result<Self>
    where
        S: BatchSource + Send + 'static,
    {
        let (sender, receiver) = bounded(capacity.max(1));

        let worker = thread::Builder::new()
            .name(format!("prefetch-{split}"))
            .spawn(move || loop {
                let batch = source.get_batch(split, batch_size);
                let failed = batch.is_err();
                if sender.send(batch).is_err() || failed {
                    break;
                }
            })?;

        debug!(%split, batch_size, capacity, "prefetch worker started");

        Ok(PrefetchIterator {
            receiver: Some(receiver),
            worker: Some(worker),
        })
    }

    /// Block for the next batch, reporting a stopped worker as an error.
    pub fn next_batch(&mut self) -> Result<DataBatch> {
        match self.receiver.as_ref().map(Receiver::recv) {
            Some(Ok(batch)) => batch,
            _ => Err(DataLoaderError::PrefetchDisconnected),
        }
    }
}

impl Iterator for PrefetchIterator {
    type Item = Result<DataBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.as_ref()?.recv().ok()
    }
}

impl Drop for PrefetchIterator {
    fn drop(&mut self) {
        // Closing the channel fails the worker's next send, ending its loop
        self.receiver.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

pub trait PrefetchBatches: BatchSource {
    fn prefetch(self, split: DatasetSplit) -> Result<PrefetchIterator>
    where
        Self: Sized + Send + 'static;
}

impl<T: BatchSource> PrefetchBatches for T {
    fn prefetch(self, split: DatasetSplit) -> Result<PrefetchIterator>
    where
        Self: Sized + Send + 'static,
    {
        let batch_size = self.default_batch_size(split);
        let capacity = self.get_config().prefetch_count;
        PrefetchIterator::new(self, split, batch_size, capacity)
    }
}
