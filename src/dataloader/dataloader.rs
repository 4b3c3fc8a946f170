use std::fmt;

use super::{config::DataConfig, data_batch::DataBatch, error::Result};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DatasetSplit {
    Train,
    Test,
}

impl fmt::Display for DatasetSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetSplit::Train => f.write_str("train"),
            DatasetSplit::Test => f.write_str("test"),
        }
    }
}

/// Where the profile side of a batch comes from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProfileKind {
    Images,
    Features,
}

pub trait BatchSource {
    /// Fetch the next `batch_size` rows of `split`, wrapping at the end of the list.
    fn get_batch(&mut self, split: DatasetSplit, batch_size: usize) -> Result<DataBatch>;
    /// Number of rows one cycle of `split` visits.
    fn len(&self, split: DatasetSplit) -> usize;
    fn profile_kind(&self) -> ProfileKind;
    fn get_config(&self) -> &DataConfig;

    fn default_batch_size(&self, split: DatasetSplit) -> usize {
        match split {
            DatasetSplit::Train => self.get_config().batch_size,
            DatasetSplit::Test => self.get_config().test_batch_size,
        }
    }
}
