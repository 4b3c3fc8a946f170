use tracing::info;

use crate::dataloader::config::DataConfig;

use super::dataloader::{BatchSource, DatasetSplit};

/// Batches needed to visit every row of a split once.
pub fn batches_per_cycle(len: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        return 0;
    }
    len.div_ceil(batch_size)
}

pub fn log_dataset_info(dl: &impl BatchSource) {
    let config: &DataConfig = dl.get_config();

    info!(
        profile = ?dl.profile_kind(),
        shuffle = config.train_shuffle,
        seed = ?config.shuffle_seed,
        flip = config.flip_train,
        "dataset information"
    );

    for split in [DatasetSplit::Train, DatasetSplit::Test] {
        let size = dl.len(split);
        let batch_size = dl.default_batch_size(split);
        info!(
            %split,
            size,
            batch_size,
            batches = batches_per_cycle(size, batch_size),
            last_batch_wraps = batch_size != 0 && size % batch_size != 0,
            "split"
        );
    }
}
