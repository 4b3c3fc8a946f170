#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use ndarray::Array2;
use pairfeed::{write_features, DataConfig};
use tempfile::TempDir;

pub const ORI: (u32, u32) = (8, 6);
pub const TARGET: (u32, u32) = (4, 4);

/// Red tags the list position and stays flat, so flips and crops leave the
/// tag intact. Green is flat per side.
pub fn tag(idx: usize) -> f32 {
    (idx * 10 + 5) as f32
}

/// Blue rises left to right by this much per original column.
pub const BLUE_STEP: f32 = 20.0;

pub fn write_image(path: &Path, idx: usize, green: u8) {
    RgbImage::from_fn(ORI.0, ORI.1, |x, _| Rgb([tag(idx) as u8, green, (x as f32 * BLUE_STEP) as u8]))
        .save(path)
        .unwrap();
}

pub fn write_manifest(path: &Path, lines: &[String]) {
    fs::write(path, lines.join("\n")).unwrap();
}

/// Record r is `dim` copies of r.
pub fn write_feature_file(path: &Path, records: usize, dim: usize) {
    let rows = Array2::from_shape_fn((records, dim), |(r, _)| r as f32);
    let mut file = fs::File::create(path).unwrap();
    write_features(&mut file, rows.view()).unwrap();
}

pub struct Fixture {
    pub dir: TempDir,
    pub config: DataConfig,
}

impl Fixture {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }
}

/// Train profile `p{i}`, train front `f{i}` and test `t{i}` images with
/// separate single column manifests. Shuffling is off unless the caller
/// turns it on.
pub fn fixture(train_len: usize, test_len: usize) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    for sub in ["profile", "front", "test"] {
        fs::create_dir_all(root.join(sub)).unwrap();
    }

    let mut profiles = Vec::new();
    let mut fronts = Vec::new();
    for i in 0..train_len {
        let (p, f) = (format!("p{i:02}.png"), format!("f{i:02}.png"));
        write_image(&root.join("profile").join(&p), i, 0);
        write_image(&root.join("front").join(&f), i, 200);
        profiles.push(p);
        fronts.push(f);
    }
    let mut tests = Vec::new();
    for i in 0..test_len {
        let t = format!("t{i:02}.png");
        write_image(&root.join("test").join(&t), i, 100);
        tests.push(t);
    }

    write_manifest(&root.join("profile.txt"), &profiles);
    write_manifest(&root.join("front.txt"), &fronts);
    write_manifest(&root.join("test.txt"), &tests);

    let config = DataConfig {
        ori_width: ORI.0,
        ori_height: ORI.1,
        width: TARGET.0,
        height: TARGET.1,
        channels: 3,
        crop: true,
        profile_dir: root.join("profile"),
        front_dir: root.join("front"),
        test_dir: root.join("test"),
        results_dir: root.join("results"),
        train_samples_dir: root.join("train_imgs"),
        profile_list: root.join("profile.txt"),
        front_list: Some(root.join("front.txt")),
        test_list: root.join("test.txt"),
        batch_size: 3,
        test_batch_size: 4,
        train_shuffle: false,
        shuffle_seed: Some(11),
        ..Default::default()
    };

    Fixture { dir, config }
}

/// Red tags of the rows of an image batch.
pub fn tags(images: &ndarray::Array4<f32>) -> Vec<f32> {
    images.outer_iter().map(|img| img[[0, 0, 0]]).collect()
}

/// Rows whose blue gradient runs right to left.
pub fn mirrored(images: &ndarray::Array4<f32>) -> Vec<bool> {
    let last = images.shape()[2] - 1;
    images.outer_iter().map(|img| img[[0, 0, 2]] > img[[0, last, 2]]).collect()
}

/// Original column each row's left edge came from, after undoing a mirror.
pub fn left_columns(images: &ndarray::Array4<f32>) -> Vec<u32> {
    let last = images.shape()[2] - 1;
    images
        .outer_iter()
        .map(|img| (img[[0, 0, 2]].min(img[[0, last, 2]]) / BLUE_STEP) as u32)
        .collect()
}

pub fn expected_tags(indices: &[usize]) -> Vec<f32> {
    indices.iter().map(|&i| tag(i)).collect()
}
