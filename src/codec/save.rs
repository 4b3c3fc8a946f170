use std::path::{Path, PathBuf};

use image::{GrayImage, RgbImage};
use ndarray::{Array3, Array4, ArrayView3, ArrayView4, Axis};
use tracing::debug;

use crate::dataloader::error::{DataLoaderError, Result};

// `as` truncates toward zero and saturates at the u8 bounds
#[inline]
fn to_byte(value: f32) -> u8 {
    value as u8
}

/// Truncate a batch already scaled to [0, 255] into bytes.
pub fn to_bytes(images: ArrayView4<f32>) -> Array4<u8> {
    images.mapv(to_byte)
}

pub fn to_bytes3(image: ArrayView3<f32>) -> Array3<u8> {
    image.mapv(to_byte)
}

/// Write one `[h, w, c]` byte image; `c == 1` is written as grayscale.
/// The format follows the file extension.
pub fn save_image(image: ArrayView3<u8>, path: &Path) -> Result<()> {
    let (height, width, channels) = image.dim();
    let raw = image.iter().copied().collect::<Vec<u8>>();
    let (width, height) = (width as u32, height as u32);

    let saved = match channels {
        1 => GrayImage::from_raw(width, height, raw).map(|img| img.save(path)),
        3 => RgbImage::from_raw(width, height, raw).map(|img| img.save(path)),
        other => return Err(DataLoaderError::UnsupportedChannels(other)),
    };

    match saved {
        Some(result) => result.map_err(|source| DataLoaderError::ImageSave {
            path: path.to_path_buf(),
            source,
        }),
        None => Err(DataLoaderError::UnsupportedChannels(channels)),
    }
}

pub fn epoch_dir(results_dir: &Path, epoch: usize) -> PathBuf {
    results_dir.join(format!("epoch{epoch}"))
}

/// Save every image of a batch under the matching name inside `dir`.
pub fn save_named<S: AsRef<str>>(images: ArrayView4<f32>, names: &[S], dir: &Path) -> Result<Vec<PathBuf>> {
    let count = images.len_of(Axis(0));
    if names.len() != count {
        return Err(DataLoaderError::NameCountMismatch {
            images: count,
            names: names.len(),
        });
    }
    std::fs::create_dir_all(dir)?;

    let bytes = to_bytes(images);
    let mut written = Vec::with_capacity(count);
    for (image, name) in bytes.outer_iter().zip(names) {
        let path = dir.join(name.as_ref());
        save_image(image, &path)?;
        written.push(path);
    }
    debug!(count, dir = %dir.display(), "saved named images");
    Ok(written)
}

/// Save a batch as `imgs_0.jpg`, `imgs_1.jpg`, ... inside `dir`.
pub fn save_numbered(images: ArrayView4<f32>, dir: &Path) -> Result<Vec<PathBuf>> {
    let names = (0..images.len_of(Axis(0)))
        .map(|i| format!("imgs_{i}.jpg"))
        .collect::<Vec<_>>();
    save_named(images, &names, dir)
}

#[cfg(test)]
mod tests {
    use ndarray::Array4;

    use super::*;

    #[test]
    fn bytes_truncate_and_saturate() {
        let images = Array4::from_shape_vec((1, 1, 4, 1), vec![12.9, 255.7, -3.0, 300.0]).unwrap();
        let bytes = to_bytes(images.view());
        assert_eq!(bytes.iter().copied().collect::<Vec<_>>(), vec![12, 255, 0, 255]);
    }

    #[test]
    fn single_channel_is_written_as_grayscale() {
        let dir = tempfile::tempdir().unwrap();
        let images = Array4::<f32>::from_elem((2, 3, 5, 1), 77.0);
        let written = save_named(images.view(), &["a.png", "b.png"], dir.path()).unwrap();

        assert_eq!(written, vec![dir.path().join("a.png"), dir.path().join("b.png")]);
        let img = image::open(&written[1]).unwrap();
        assert_eq!(img.color(), image::ColorType::L8);
        assert_eq!((img.width(), img.height()), (5, 3));
        assert_eq!(img.to_luma8().get_pixel(4, 2).0, [77]);
    }

    #[test]
    fn names_must_match_batch() {
        let dir = tempfile::tempdir().unwrap();
        let images = Array4::<f32>::zeros((2, 2, 2, 3));
        assert!(matches!(
            save_named(images.view(), &["only.png"], dir.path()),
            Err(DataLoaderError::NameCountMismatch { images: 2, names: 1 })
        ));
    }

    #[test]
    fn numbered_files_land_in_a_created_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("train_imgs");
        let images = Array4::<f32>::from_elem((3, 4, 4, 3), 128.0);
        save_numbered(images.view(), &out).unwrap();
        for i in 0..3 {
            assert!(out.join(format!("imgs_{i}.jpg")).is_file());
        }
    }

    #[test]
    fn two_channel_images_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let image = Array3::<u8>::zeros((2, 2, 2));
        assert!(matches!(
            save_image(image.view(), &dir.path().join("x.png")),
            Err(DataLoaderError::UnsupportedChannels(2))
        ));
    }
}
