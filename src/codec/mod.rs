//! Stateless helpers: image decoding, feature records, grid tiling and
//! persistence of processed batches.

pub mod features;
pub mod grid;
pub mod image_codec;
pub mod save;

pub use features::{read_feature, write_features, FEATURE_DIM};
pub use grid::{merge_images, save_merged};
pub use image_codec::{ColorMode, CropBox, ImageCodec, ImageGeometry};
pub use save::{epoch_dir, save_image, save_named, save_numbered};
