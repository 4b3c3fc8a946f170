use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::codec::features::FEATURE_DIM;

use super::error::{DataLoaderError, Result};

// Settings arrive from an external provider, usually a JSON file.
// Any field left out falls back to Default.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub ori_width: u32,
    pub ori_height: u32,
    pub width: u32,
    pub height: u32,
    pub channels: usize,
    pub crop: bool,

    pub profile_dir: PathBuf,
    pub front_dir: PathBuf,
    pub test_dir: PathBuf,
    pub test_front_dir: Option<PathBuf>,
    pub results_dir: PathBuf,
    pub train_samples_dir: PathBuf,

    pub profile_list: PathBuf,
    pub front_list: Option<PathBuf>,
    pub test_list: PathBuf,

    pub use_profile_features: bool,
    pub profile_features: Option<PathBuf>,
    pub test_features: Option<PathBuf>,
    pub feature_dim: usize,

    pub batch_size: usize,
    pub test_batch_size: usize,
    pub train_shuffle: bool,
    pub shuffle_seed: Option<u64>,
    pub flip_train: bool,
    /// Crop train profile images at a random position instead of the center.
    pub random_crop_train: bool,
    pub prefetch_count: usize,
}

impl DataConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DataLoaderError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| DataLoaderError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn build(self) -> Result<Self> {
        check_geometry(&self)?;
        check_positive("batch_size", self.batch_size)?;
        check_positive("test_batch_size", self.test_batch_size)?;
        check_positive("feature_dim", self.feature_dim)?;
        check_positive("prefetch_count", self.prefetch_count)?;

        if self.use_profile_features {
            if self.profile_features.is_none() {
                return Err(invalid("profile_features", "required when use_profile_features is set"));
            }
            if self.test_features.is_none() {
                return Err(invalid("test_features", "required when use_profile_features is set"));
            }
        }

        Ok(self)
    }

    pub fn test_front_dir(&self) -> &Path {
        self.test_front_dir.as_deref().unwrap_or(&self.test_dir)
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            ori_width: 250,
            ori_height: 250,
            width: 224,
            height: 224,
            channels: 3,
            crop: true,
            profile_dir: PathBuf::from("data/profile"),
            front_dir: PathBuf::from("data/front"),
            test_dir: PathBuf::from("data/test"),
            test_front_dir: None,
            results_dir: PathBuf::from("results"),
            train_samples_dir: PathBuf::from("train_imgs"),
            profile_list: PathBuf::from("data/profile.txt"),
            front_list: Some(PathBuf::from("data/front.txt")),
            test_list: PathBuf::from("data/test.txt"),
            use_profile_features: false,
            profile_features: None,
            test_features: None,
            feature_dim: FEATURE_DIM,
            batch_size: 20,
            test_batch_size: 20,
            train_shuffle: true,
            shuffle_seed: None,
            flip_train: true,
            random_crop_train: false,
            prefetch_count: 4,
        }
    }
}

fn check_geometry(config: &DataConfig) -> Result<()> {
    if config.channels != 1 && config.channels != 3 {
        return Err(invalid("channels", format!("{} is not 1 or 3", config.channels)));
    }
    if config.width == 0 || config.height == 0 {
        return Err(invalid("width/height", "target size must be non-zero"));
    }
    if config.width > config.ori_width || config.height > config.ori_height {
        return Err(invalid(
            "width/height",
            format!(
                "target {}x{} is larger than original {}x{}",
                config.width, config.height, config.ori_width, config.ori_height
            ),
        ));
    }
    // Without cropping there is no way to reach the target size
    if !config.crop && (config.width != config.ori_width || config.height != config.ori_height) {
        return Err(invalid("crop", "target size must equal original size when cropping is disabled"));
    }
    Ok(())
}

fn check_positive(field: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(invalid(field, "must be positive"));
    }
    Ok(())
}

fn invalid(field: &'static str, reason: impl Into<String>) -> DataLoaderError {
    DataLoaderError::InvalidConfig {
        field,
        reason: reason.into(),
    }
}
