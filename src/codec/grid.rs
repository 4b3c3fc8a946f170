use std::path::Path;

use ndarray::{Array3, ArrayView4, Axis};
use rayon::prelude::*;

use crate::dataloader::error::{DataLoaderError, Result};

use super::save::{save_image, to_bytes3};

/// Tile a batch `[n, h, w, c]` into one `[h * rows, w * cols, c]` canvas.
///
/// Image `idx` lands in tile row `idx / cols`, tile column `idx % cols`.
/// Tiles past the last image stay zero.
pub fn merge_images(images: ArrayView4<f32>, rows: usize, cols: usize) -> Result<Array3<f32>> {
    let [count, height, width, channels] = [
        images.len_of(Axis(0)),
        images.len_of(Axis(1)),
        images.len_of(Axis(2)),
        images.len_of(Axis(3)),
    ];
    if rows.checked_mul(cols).map_or(true, |tiles| tiles < count) {
        return Err(DataLoaderError::GridTooSmall {
            rows,
            cols,
            images: count,
        });
    }

    let pixel_row = width * channels;
    let canvas_row = pixel_row * cols;
    let band = canvas_row * height;
    if band == 0 {
        return Ok(Array3::zeros((height * rows, width * cols, channels)));
    }
    let mut canvas = vec![0f32; band * rows];

    // One band per tile row, bands never overlap
    canvas
        .par_chunks_exact_mut(band)
        .enumerate()
        .for_each(|(tile_row, strip)| {
            for tile_col in 0..cols {
                let idx = tile_row * cols + tile_col;
                if idx >= count {
                    break;
                }
                let image = images.index_axis(Axis(0), idx);
                for (y, line) in image.outer_iter().enumerate() {
                    let start = y * canvas_row + tile_col * pixel_row;
                    let dst = &mut strip[start..start + pixel_row];
                    for (dst, &src) in dst.iter_mut().zip(line.iter()) {
                        *dst = src;
                    }
                }
            }
        });

    Ok(Array3::from_shape_vec((height * rows, width * cols, channels), canvas)?)
}

/// Merge a batch and write the grid as a single 8-bit image.
pub fn save_merged(images: ArrayView4<f32>, rows: usize, cols: usize, path: impl AsRef<Path>) -> Result<()> {
    let canvas = merge_images(images, rows, cols)?;
    save_image(to_bytes3(canvas.view()).view(), path.as_ref())
}
