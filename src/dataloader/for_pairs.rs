use std::path::{Path, PathBuf};

use ndarray::{ArrayView4, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::codec::image_codec::{CropBox, ImageCodec, ImageGeometry};
use crate::codec::save::{epoch_dir, save_named, save_numbered};

use super::config::DataConfig;
use super::cursor::CyclicCursor;
use super::data_batch::{DataBatch, ProfileData};
use super::dataloader::{BatchSource, DatasetSplit, ProfileKind};
use super::error::{DataLoaderError, Result};
use super::feature_stream::FeatureStream;
use super::manifest::{Manifest, PathList};

/// Path lists, optional feature stream and read cursor of one split.
pub struct SplitSource {
    split: DatasetSplit,
    profile: PathList,
    front: PathList,
    features: Option<FeatureStream>,
    cursor: CyclicCursor,
    batches_served: usize,
}

impl SplitSource {
    pub fn new(split: DatasetSplit, profile: PathList, front: PathList, features: Option<FeatureStream>) -> Self {
        // Whichever side runs out first decides where the split wraps
        let mut len = profile.len().min(front.len());
        if profile.len() != front.len() {
            debug!(%split, profile = profile.len(), front = front.len(), "lists differ in length");
        }
        if let Some(stream) = &features {
            if stream.records() != profile.len() {
                warn!(
                    %split,
                    records = stream.records(),
                    entries = profile.len(),
                    path = %stream.path().display(),
                    "feature record count differs from manifest"
                );
            }
            len = len.min(stream.records());
        }

        SplitSource {
            split,
            profile,
            front,
            features,
            cursor: CyclicCursor::new(len),
            batches_served: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.cursor.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.is_empty()
    }

    pub fn cursor(&self) -> &CyclicCursor {
        &self.cursor
    }

    pub fn profile(&self) -> &PathList {
        &self.profile
    }

    pub fn front(&self) -> &PathList {
        &self.front
    }

    fn first_image(&self) -> PathBuf {
        match self.features {
            Some(_) => self.front.resolve(0),
            None => self.profile.resolve(0),
        }
    }

    fn fetch(&mut self, batch_size: usize, codec: &ImageCodec, rng: &mut StdRng, augment: Augment) -> Result<DataBatch> {
        let plan = self.cursor.plan(batch_size)?;
        if let Some(row) = plan.wrapped_at {
            debug!(split = %self.split, offset = self.cursor.offset(), row, "list wrapped around");
        }

        let profile_sources = plan
            .indices
            .iter()
            .map(|&idx| self.profile.resolve(idx))
            .collect::<Vec<_>>();
        let front_sources = plan
            .indices
            .iter()
            .map(|&idx| self.front.resolve(idx))
            .collect::<Vec<_>>();

        // Flips are drawn up front, row by row, so a seed reproduces a run
        // even though rows decode in parallel
        let flip = augment.flip;
        let flip_profile = flip && self.features.is_none();
        let (profile_mirrors, front_mirrors): (Vec<bool>, Vec<bool>) = (0..batch_size)
            .map(|_| (flip_profile && rng.gen_bool(0.5), flip && rng.gen_bool(0.5)))
            .unzip();
        // Front images always keep the centered box
        let profile_crops: Option<Vec<CropBox>> = (augment.random_crop && self.features.is_none())
            .then(|| (0..batch_size).map(|_| codec.geometry().random_crop(&mut *rng)).collect());

        let front = codec.read_batch(&front_sources, &front_mirrors)?;
        let profile = match (self.features.as_mut(), &profile_crops) {
            (Some(stream), _) => ProfileData::Features(stream.read_batch(&plan)?),
            (None, Some(crops)) => {
                ProfileData::Images(codec.read_batch_cropped(&profile_sources, &profile_mirrors, crops)?)
            }
            (None, None) => ProfileData::Images(codec.read_batch(&profile_sources, &profile_mirrors)?),
        };

        self.cursor.commit(&plan);
        let batch_number = self.batches_served;
        self.batches_served += 1;

        Ok(DataBatch {
            split: self.split,
            batch_number,
            profile,
            front,
            profile_sources,
            front_sources,
        })
    }
}

/// Per-split augmentation switches.
#[derive(Clone, Copy, Debug, Default)]
struct Augment {
    flip: bool,
    random_crop: bool,
}

/// Feeds profile/front batches for training and testing from manifest files.
pub struct PairedLoader {
    config: DataConfig,
    codec: ImageCodec,
    rng: StdRng,
    train: SplitSource,
    test: SplitSource,
}

impl PairedLoader {
    pub fn new(config: DataConfig) -> Result<Self> {
        let mut config = config.build()?;
        let codec = ImageCodec::new(ImageGeometry::from_config(&config)?);

        // Kept in the config so the shuffle and flips can be replayed
        let seed = *config.shuffle_seed.get_or_insert_with(|| rand::thread_rng().gen());
        let mut rng = StdRng::seed_from_u64(seed);

        let train = load_train(&config, &mut rng)?;
        let test = load_test(&config)?;

        codec.check_original_dims(&train.first_image())?;

        info!(
            train = train.len(),
            test = test.len(),
            seed,
            features = config.use_profile_features,
            "paired loader ready"
        );

        Ok(PairedLoader {
            config,
            codec,
            rng,
            train,
            test,
        })
    }

    pub fn get_train_batch(&mut self) -> Result<DataBatch> {
        self.get_batch(DatasetSplit::Train, self.config.batch_size)
    }

    pub fn get_test_batch(&mut self, batch_size: Option<usize>) -> Result<DataBatch> {
        let batch_size = batch_size.unwrap_or(self.config.test_batch_size);
        self.get_batch(DatasetSplit::Test, batch_size)
    }

    pub fn split(&self, split: DatasetSplit) -> &SplitSource {
        match split {
            DatasetSplit::Train => &self.train,
            DatasetSplit::Test => &self.test,
        }
    }

    pub fn codec(&self) -> &ImageCodec {
        &self.codec
    }

    /// Save results for the test batch fetched just before this call, naming
    /// each file after the test entry it came from.
    ///
    /// Names are rebuilt from the test cursor, so this must directly follow
    /// the matching [`PairedLoader::get_test_batch`]. Prefer
    /// [`PairedLoader::save_images_as`] with the names carried by the batch.
    pub fn save_images(&self, images: ArrayView4<f32>, epoch: usize) -> Result<Vec<PathBuf>> {
        let count = images.len_of(Axis(0));
        let names = self
            .test
            .cursor
            .recent(count)?
            .into_iter()
            .map(|idx| self.test.profile.file_name(idx).to_string())
            .collect::<Vec<_>>();
        self.save_images_as(images, &names, epoch)
    }

    pub fn save_images_as<S: AsRef<str>>(&self, images: ArrayView4<f32>, names: &[S], epoch: usize) -> Result<Vec<PathBuf>> {
        save_named(images, names, &epoch_dir(&self.config.results_dir, epoch))
    }

    /// Dump training samples as `imgs_{i}.jpg` for a quick visual check.
    pub fn save_train(&self, images: ArrayView4<f32>) -> Result<Vec<PathBuf>> {
        save_numbered(images, &self.config.train_samples_dir)
    }
}

impl BatchSource for PairedLoader {
    fn get_batch(&mut self, split: DatasetSplit, batch_size: usize) -> Result<DataBatch> {
        // Test reads are never augmented
        let (source, augment) = match split {
            DatasetSplit::Train => (
                &mut self.train,
                Augment {
                    flip: self.config.flip_train,
                    random_crop: self.config.random_crop_train,
                },
            ),
            DatasetSplit::Test => (&mut self.test, Augment::default()),
        };
        source.fetch(batch_size, &self.codec, &mut self.rng, augment)
    }

    fn len(&self, split: DatasetSplit) -> usize {
        self.split(split).len()
    }

    fn profile_kind(&self) -> ProfileKind {
        if self.config.use_profile_features {
            ProfileKind::Features
        } else {
            ProfileKind::Images
        }
    }

    fn get_config(&self) -> &DataConfig {
        &self.config
    }
}

fn open_features(config: &DataConfig, path: Option<&Path>, field: &'static str) -> Result<Option<FeatureStream>> {
    if !config.use_profile_features {
        return Ok(None);
    }
    let path = path.ok_or(DataLoaderError::InvalidConfig {
        field,
        reason: "required when use_profile_features is set".to_string(),
    })?;
    Ok(Some(FeatureStream::open(path, config.feature_dim)?))
}

fn load_train(config: &DataConfig, rng: &mut StdRng) -> Result<SplitSource> {
    let mut manifest = Manifest::load(&config.profile_list)?;
    let features = open_features(config, config.profile_features.as_deref(), "profile_features")?;

    // Feature records follow manifest order, so that side has to stay put
    if config.train_shuffle {
        if features.is_none() {
            manifest.shuffle(rng);
        } else {
            debug!("profile manifest kept in order to match feature records");
        }
    }

    let front = match &config.front_list {
        Some(front_list) => {
            let mut front_manifest = Manifest::load(front_list)?;
            if config.train_shuffle {
                front_manifest.shuffle(rng);
            }
            front_manifest.front_list(&config.front_dir)
        }
        None => manifest.front_list(&config.front_dir),
    };

    Ok(SplitSource::new(
        DatasetSplit::Train,
        manifest.profile_list(&config.profile_dir),
        front,
        features,
    ))
}

fn load_test(config: &DataConfig) -> Result<SplitSource> {
    let manifest = Manifest::load(&config.test_list)?;
    let features = open_features(config, config.test_features.as_deref(), "test_features")?;

    Ok(SplitSource::new(
        DatasetSplit::Test,
        manifest.profile_list(&config.test_dir),
        manifest.front_list(config.test_front_dir()),
        features,
    ))
}
