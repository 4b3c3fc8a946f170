use std::path::PathBuf;

use ndarray::{Array2, Array4, Axis};

use super::dataloader::DatasetSplit;
use super::manifest::file_name_of;

#[derive(Debug)]
pub enum ProfileData {
    /// `[batch, height, width, channels]`
    Images(Array4<f32>),
    /// `[batch, feature_dim]`
    Features(Array2<f32>),
}

impl ProfileData {
    pub fn len(&self) -> usize {
        match self {
            ProfileData::Images(images) => images.len_of(Axis(0)),
            ProfileData::Features(features) => features.len_of(Axis(0)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One batch plus the source file behind every row. Values are raw pixel
/// intensities or raw feature floats.
#[derive(Debug)]
pub struct DataBatch {
    pub split: DatasetSplit,
    pub batch_number: usize,
    pub profile: ProfileData,
    pub front: Array4<f32>,
    pub profile_sources: Vec<PathBuf>,
    pub front_sources: Vec<PathBuf>,
}

impl DataBatch {
    pub fn len(&self) -> usize {
        self.front.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn profile_images(&self) -> Option<&Array4<f32>> {
        match &self.profile {
            ProfileData::Images(images) => Some(images),
            ProfileData::Features(_) => None,
        }
    }

    pub fn profile_features(&self) -> Option<&Array2<f32>> {
        match &self.profile {
            ProfileData::Features(features) => Some(features),
            ProfileData::Images(_) => None,
        }
    }

    pub fn profile_names(&self) -> Vec<String> {
        self.profile_sources
            .iter()
            .map(|path| match path.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => file_name_of(&path.to_string_lossy()).to_string(),
            })
            .collect()
    }
}
