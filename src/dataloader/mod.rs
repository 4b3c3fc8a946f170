pub mod config;
pub mod cursor;
pub mod data_batch;
#[allow(clippy::module_inception)]
pub mod dataloader;
pub mod error;
pub mod feature_stream;
pub mod for_pairs;
pub mod info;
pub mod manifest;
pub mod par_iter;

pub use config::DataConfig;
pub use cursor::{BatchPlan, CyclicCursor};
pub use data_batch::{DataBatch, ProfileData};
pub use dataloader::{BatchSource, DatasetSplit, ProfileKind};
pub use error::{DataLoaderError, Result};
pub use feature_stream::{FeatureStream, StreamState};
pub use for_pairs::{PairedLoader, SplitSource};
pub use info::log_dataset_info;
pub use manifest::{Manifest, ManifestRecord, PathList};
pub use par_iter::{PrefetchBatches, PrefetchIterator};
