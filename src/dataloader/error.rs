use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataLoaderError {
    // IO and file format errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load image {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to save image {path}: {source}")]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // Dataset errors
    #[error("No records found in manifest {0}")]
    EmptyDataset(PathBuf),

    #[error("Malformed manifest {path} at line {line}: {reason}")]
    MalformedManifest {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Image {path} is {actual:?} (w, h), expected {expected:?}")]
    DimensionMismatch {
        path: PathBuf,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Image {path} decoded to shape {actual:?}, expected {expected:?}")]
    ImageShape {
        path: PathBuf,
        expected: [usize; 3],
        actual: [usize; 3],
    },

    #[error("Image {path} has {channels} channels but a single channel is configured")]
    ColorMismatch { path: PathBuf, channels: u8 },

    #[error("Feature file {path} is {len} bytes, not a multiple of the {record_bytes} byte record")]
    MisalignedFeatureFile {
        path: PathBuf,
        len: u64,
        record_bytes: usize,
    },

    #[error("Feature record {record} in {path} is truncated")]
    TruncatedFeature { path: PathBuf, record: usize },

    #[error("Feature stream {0} is exhausted, rewind before reading")]
    StreamExhausted(PathBuf),

    // Batching errors
    #[error("Batch size must be positive")]
    InvalidBatchSize,

    #[error("Batch size {batch_size} exceeds the {len} entries available")]
    BatchTooLarge { batch_size: usize, len: usize },

    #[error("Grid of {rows}x{cols} tiles cannot hold {images} images")]
    GridTooSmall {
        rows: usize,
        cols: usize,
        images: usize,
    },

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Cannot write an image with {0} channels")]
    UnsupportedChannels(usize),

    #[error("{images} images but {names} file names")]
    NameCountMismatch { images: usize, names: usize },

    #[error("Invalid config value for {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("Prefetch worker stopped")]
    PrefetchDisconnected,
}

pub type Result<T> = std::result::Result<T, DataLoaderError>;
