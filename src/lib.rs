//! Batched data feeding for paired face images.
//!
//! Profile and front images (or precomputed profile features and front
//! images) are listed in comma separated manifests, optionally shuffled once,
//! and served as fixed size batches that cycle through each list. Helpers
//! decode and crop images, read packed feature records, tile a batch into a
//! grid and write processed batches back to disk.
//!
//! ```no_run
//! use pairfeed::{BatchSource, DataConfig, DatasetSplit, PairedLoader};
//!
//! # fn main() -> pairfeed::Result<()> {
//! let config = DataConfig::from_json_file("data.json")?;
//! let mut loader = PairedLoader::new(config)?;
//!
//! let batch = loader.get_batch(DatasetSplit::Test, 8)?;
//! loader.save_images_as(batch.front.view(), &batch.profile_names(), 0)?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod dataloader;

pub use codec::{merge_images, read_feature, save_merged, write_features, ColorMode, CropBox, ImageCodec, ImageGeometry};
pub use dataloader::{
    log_dataset_info, BatchSource, DataBatch, DataConfig, DataLoaderError, DatasetSplit, PairedLoader,
    PrefetchBatches, PrefetchIterator, ProfileData, ProfileKind, Result,
};
