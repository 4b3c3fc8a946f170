use std::path::{Path, PathBuf};

use image::DynamicImage;
use ndarray::{Array3, Array4};
use rand::Rng;
use rayon::prelude::*;

use crate::dataloader::config::DataConfig;
use crate::dataloader::error::{DataLoaderError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorMode {
    Grayscale,
    Rgb,
}

impl ColorMode {
    pub fn from_channels(channels: usize) -> Result<Self> {
        match channels {
            1 => Ok(ColorMode::Grayscale),
            3 => Ok(ColorMode::Rgb),
            other => Err(DataLoaderError::InvalidConfig {
                field: "channels",
                reason: format!("{other} is not 1 or 3"),
            }),
        }
    }

    pub fn channels(&self) -> usize {
        match self {
            ColorMode::Grayscale => 1,
            ColorMode::Rgb => 3,
        }
    }
}

/// Centered crop rectangle, right and bottom exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropBox {
    pub fn centered(ori_width: u32, ori_height: u32, width: u32, height: u32) -> Result<Self> {
        if width > ori_width || height > ori_height {
            return Err(DataLoaderError::InvalidConfig {
                field: "width/height",
                reason: format!("crop {width}x{height} does not fit in {ori_width}x{ori_height}"),
            });
        }
        Ok(CropBox::at((ori_width - width) / 2, (ori_height - height) / 2, width, height))
    }

    pub fn at(left: u32, top: u32, width: u32, height: u32) -> Self {
        CropBox {
            left,
            top,
            right: left + width,
            bottom: top + height,
        }
    }

    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// Everything the codec needs to know about pixel layout, resolved once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageGeometry {
    pub original: (u32, u32),
    pub crop: Option<CropBox>,
    pub color_mode: ColorMode,
}

impl ImageGeometry {
    pub fn from_config(config: &DataConfig) -> Result<Self> {
        let crop = if config.crop {
            Some(CropBox::centered(
                config.ori_width,
                config.ori_height,
                config.width,
                config.height,
            )?)
        } else {
            None
        };
        Ok(ImageGeometry {
            original: (config.ori_width, config.ori_height),
            crop,
            color_mode: ColorMode::from_channels(config.channels)?,
        })
    }

    pub fn output_dims(&self) -> (u32, u32) {
        match self.crop {
            Some(crop) => (crop.width(), crop.height()),
            None => self.original,
        }
    }

    /// Box of the output size placed uniformly at random inside the original.
    pub fn random_crop<R: Rng + ?Sized>(&self, rng: &mut R) -> CropBox {
        let (width, height) = self.output_dims();
        let (ori_width, ori_height) = self.original;
        let left = rng.gen_range(0..=ori_width.saturating_sub(width));
        let top = rng.gen_range(0..=ori_height.saturating_sub(height));
        CropBox::at(left, top, width, height)
    }

    /// `[height, width, channels]` of every decoded image.
    pub fn shape(&self) -> [usize; 3] {
        let (width, height) = self.output_dims();
        [height as usize, width as usize, self.color_mode.channels()]
    }
}

pub struct ImageCodec {
    geometry: ImageGeometry,
}

impl ImageCodec {
    pub fn new(geometry: ImageGeometry) -> Self {
        ImageCodec { geometry }
    }

    pub fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    /// Header-only check that an image has the configured original size.
    pub fn check_original_dims(&self, path: &Path) -> Result<()> {
        let actual = image::image_dimensions(path).map_err(|source| DataLoaderError::ImageLoad {
            path: path.to_path_buf(),
            source,
        })?;
        if actual != self.geometry.original {
            return Err(DataLoaderError::DimensionMismatch {
                path: path.to_path_buf(),
                expected: self.geometry.original,
                actual,
            });
        }
        Ok(())
    }

    /// Decode one image, mirroring it with probability 0.5 when `flip` is set.
    pub fn read_image<R: Rng + ?Sized>(&self, path: &Path, flip: bool, rng: &mut R) -> Result<Array3<f32>> {
        let mirror = flip && rng.gen_bool(0.5);
        self.decode(path, mirror)
    }

    pub fn decode(&self, path: &Path, mirror: bool) -> Result<Array3<f32>> {
        self.decode_with(path, mirror, self.geometry.crop)
    }

    /// Decode with an explicit crop box in place of the configured one.
    pub fn decode_with(&self, path: &Path, mirror: bool, crop: Option<CropBox>) -> Result<Array3<f32>> {
        let img = image::open(path).map_err(|source| DataLoaderError::ImageLoad {
            path: path.to_path_buf(),
            source,
        })?;

        let source_channels = img.color().channel_count();
        // Luma and luma+alpha are the only sources that map onto one channel
        if self.geometry.color_mode == ColorMode::Grayscale && source_channels > 2 {
            return Err(DataLoaderError::ColorMismatch {
                path: path.to_path_buf(),
                channels: source_channels,
            });
        }

        let img = if mirror { img.fliph() } else { img };
        let img = match crop {
            Some(crop) => img.crop_imm(crop.left, crop.top, crop.width(), crop.height()),
            None => img,
        };

        self.to_array(path, &img)
    }

    fn to_array(&self, path: &Path, img: &DynamicImage) -> Result<Array3<f32>> {
        let expected = self.geometry.shape();
        let channels = self.geometry.color_mode.channels();
        let actual = [img.height() as usize, img.width() as usize, channels];
        // crop_imm clamps to the image bounds, so undersized inputs show up here
        if actual != expected {
            return Err(DataLoaderError::ImageShape {
                path: path.to_path_buf(),
                expected,
                actual,
            });
        }

        let raw = match self.geometry.color_mode {
            ColorMode::Grayscale => img.to_luma8().into_raw(),
            ColorMode::Rgb => img.to_rgb8().into_raw(),
        };
        let values = raw.into_iter().map(f32::from).collect::<Vec<f32>>();

        Array3::from_shape_vec((actual[0], actual[1], actual[2]), values).map_err(|_| {
            DataLoaderError::ImageShape {
                path: path.to_path_buf(),
                expected,
                actual,
            }
        })
    }

    /// Decode a planned batch. Rows decode in parallel; `mirrors[i]` is the
    /// flip decision already drawn for row `i`.
    pub fn read_batch(&self, paths: &[PathBuf], mirrors: &[bool]) -> Result<Array4<f32>> {
        self.decode_rows(paths, mirrors, |_| self.geometry.crop)
    }

    /// Like [`ImageCodec::read_batch`], cropping row `i` with `crops[i]`.
    pub fn read_batch_cropped(&self, paths: &[PathBuf], mirrors: &[bool], crops: &[CropBox]) -> Result<Array4<f32>> {
        debug_assert_eq!(paths.len(), crops.len());
        self.decode_rows(paths, mirrors, |i| Some(crops[i]))
    }

    fn decode_rows<F>(&self, paths: &[PathBuf], mirrors: &[bool], crop_for: F) -> Result<Array4<f32>>
    where
        F: Fn(usize) -> Option<CropBox> + Sync,
    {
        debug_assert_eq!(paths.len(), mirrors.len());

        let decoded = paths
            .par_iter()
            .zip(mirrors.par_iter())
            .enumerate()
            .map(|(i, (path, &mirror))| self.decode_with(path, mirror, crop_for(i)))
            .collect::<Result<Vec<Array3<f32>>>>()?;

        let [height, width, channels] = self.geometry.shape();
        let mut batch = Array4::<f32>::zeros((paths.len(), height, width, channels));
        for (mut slot, img) in batch.outer_iter_mut().zip(decoded.iter()) {
            slot.assign(img);
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn geometry(crop: bool, color_mode: ColorMode) -> ImageGeometry {
        ImageGeometry {
            original: (8, 6),
            crop: crop.then(|| CropBox::centered(8, 6, 4, 4).unwrap()),
            color_mode,
        }
    }

    // Red channel encodes x, green encodes y
    fn gradient(dir: &Path) -> PathBuf {
        let path = dir.join("gradient.png");
        RgbImage::from_fn(8, 6, |x, y| Rgb([x as u8 * 10, y as u8 * 10, 7]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn crop_box_is_centered() {
        let crop = CropBox::centered(250, 250, 224, 224).unwrap();
        assert_eq!((crop.left, crop.top, crop.right, crop.bottom), (13, 13, 237, 237));

        let odd = CropBox::centered(5, 7, 2, 4).unwrap();
        assert_eq!(odd.width(), 2);
        assert_eq!(odd.height(), 4);
        assert_eq!((odd.left, odd.top), (1, 1));
    }

    #[test]
    fn crop_larger_than_original_is_rejected() {
        assert!(CropBox::centered(10, 10, 11, 10).is_err());
    }

    #[test]
    fn cropped_read_has_target_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = gradient(dir.path());
        let codec = ImageCodec::new(geometry(true, ColorMode::Rgb));

        let img = codec.decode(&path, false).unwrap();
        assert_eq!(img.shape(), &[4, 4, 3]);
        // Box starts at (2, 1)
        assert_eq!(img[[0, 0, 0]], 20.0);
        assert_eq!(img[[0, 0, 1]], 10.0);
        assert_eq!(img[[3, 3, 0]], 50.0);
    }

    #[test]
    fn mirror_reverses_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = gradient(dir.path());
        let codec = ImageCodec::new(geometry(false, ColorMode::Rgb));

        let plain = codec.decode(&path, false).unwrap();
        let mirrored = codec.decode(&path, true).unwrap();
        assert_eq!(plain[[2, 0, 0]], 0.0);
        assert_eq!(mirrored[[2, 0, 0]], 70.0);
        assert_eq!(mirrored[[2, 7, 0]], plain[[2, 0, 0]]);
    }

    #[test]
    fn flip_happens_about_half_the_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = gradient(dir.path());
        let codec = ImageCodec::new(geometry(false, ColorMode::Rgb));
        let mut rng = StdRng::seed_from_u64(42);

        let trials = 400;
        let mirrored = (0..trials)
            .filter(|_| codec.read_image(&path, true, &mut rng).unwrap()[[0, 0, 0]] != 0.0)
            .count();
        assert!((140..=260).contains(&mirrored), "mirrored {mirrored} of {trials}");

        let never = (0..20)
            .filter(|_| codec.read_image(&path, false, &mut rng).unwrap()[[0, 0, 0]] != 0.0)
            .count();
        assert_eq!(never, 0);
    }

    #[test]
    fn grayscale_keeps_a_channel_axis() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        GrayImage::from_pixel(8, 6, Luma([99])).save(&path).unwrap();

        let codec = ImageCodec::new(geometry(true, ColorMode::Grayscale));
        let img = codec.decode(&path, false).unwrap();
        assert_eq!(img.shape(), &[4, 4, 1]);
        assert_eq!(img[[1, 1, 0]], 99.0);
    }

    #[test]
    fn grayscale_source_upconverts_to_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        GrayImage::from_pixel(8, 6, Luma([42])).save(&path).unwrap();

        let codec = ImageCodec::new(geometry(true, ColorMode::Rgb));
        let img = codec.decode(&path, false).unwrap();
        assert_eq!(img.shape(), &[4, 4, 3]);
        assert!(img.iter().all(|&v| v == 42.0));
    }

    #[test]
    fn color_source_is_never_downsampled() {
        let dir = tempfile::tempdir().unwrap();
        let path = gradient(dir.path());
        let codec = ImageCodec::new(geometry(true, ColorMode::Grayscale));
        assert!(matches!(
            codec.decode(&path, false),
            Err(DataLoaderError::ColorMismatch { channels: 3, .. })
        ));
    }

    #[test]
    fn undersized_image_fails_the_shape_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.png");
        RgbImage::new(3, 3).save(&path).unwrap();

        let codec = ImageCodec::new(geometry(true, ColorMode::Rgb));
        assert!(matches!(codec.decode(&path, false), Err(DataLoaderError::ImageShape { .. })));
        assert!(matches!(
            codec.check_original_dims(&path),
            Err(DataLoaderError::DimensionMismatch { actual: (3, 3), .. })
        ));
    }

    #[test]
    fn random_crops_stay_inside_the_original() {
        let geometry = geometry(true, ColorMode::Rgb);
        let mut rng = StdRng::seed_from_u64(3);
        let mut origins = std::collections::BTreeSet::new();
        for _ in 0..200 {
            let crop = geometry.random_crop(&mut rng);
            assert!(crop.right <= 8 && crop.bottom <= 6);
            assert_eq!((crop.width(), crop.height()), (4, 4));
            origins.insert((crop.left, crop.top));
        }
        // 5 horizontal by 3 vertical placements
        assert_eq!(origins.len(), 15);
    }

    #[test]
    fn cropped_batch_uses_each_row_box() {
        let dir = tempfile::tempdir().unwrap();
        let path = gradient(dir.path());
        let codec = ImageCodec::new(geometry(true, ColorMode::Rgb));

        let paths = vec![path.clone(), path];
        let crops = [CropBox::at(0, 0, 4, 4), CropBox::at(4, 2, 4, 4)];
        let batch = codec.read_batch_cropped(&paths, &[false, false], &crops).unwrap();
        assert_eq!(batch.shape(), &[2, 4, 4, 3]);
        assert_eq!((batch[[0, 0, 0, 0]], batch[[0, 0, 0, 1]]), (0.0, 0.0));
        assert_eq!((batch[[1, 0, 0, 0]], batch[[1, 0, 0, 1]]), (40.0, 20.0));
    }

    #[test]
    fn batch_rows_follow_path_order() {
        let dir = tempfile::tempdir().unwrap();
        let paths = (0..3u8)
            .map(|i| {
                let path = dir.path().join(format!("{i}.png"));
                RgbImage::from_pixel(8, 6, Rgb([i * 30, 0, 0])).save(&path).unwrap();
                path
            })
            .collect::<Vec<_>>();

        let codec = ImageCodec::new(geometry(true, ColorMode::Rgb));
        let batch = codec.read_batch(&paths, &[false; 3]).unwrap();
        assert_eq!(batch.shape(), &[3, 4, 4, 3]);
        for i in 0..3 {
            assert_eq!(batch[[i, 0, 0, 0]], i as f32 * 30.0);
        }
    }
}
