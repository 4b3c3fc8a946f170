use std::io::{ErrorKind, Read, Write};

use ndarray::{Array1, ArrayView2};

use crate::dataloader::error::{DataLoaderError, Result};

pub const FEATURE_DIM: usize = 4096;
pub const BYTES_PER_VALUE: usize = 4;

/// Read one record of `dim` packed little endian f32 values.
///
/// Returns `ErrorKind::UnexpectedEof` wrapped as an IO error when fewer than
/// `dim * 4` bytes remain; callers that know the record number map this to
/// [`DataLoaderError::TruncatedFeature`].
pub fn read_feature<R: Read>(reader: &mut R, dim: usize) -> Result<Array1<f32>> {
    let mut bytes = vec![0u8; dim * BYTES_PER_VALUE];
    reader.read_exact(&mut bytes)?;

    let values = bytes
        .chunks_exact(BYTES_PER_VALUE)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect::<Vec<f32>>();

    Ok(Array1::from_vec(values))
}

/// Pack rows of features back to back, no header and no padding.
pub fn write_features<W: Write>(writer: &mut W, rows: ArrayView2<f32>) -> Result<()> {
    let mut bytes = Vec::with_capacity(rows.ncols() * BYTES_PER_VALUE);
    for row in rows.outer_iter() {
        bytes.clear();
        for value in row.iter() {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        writer.write_all(&bytes)?;
    }
    Ok(())
}

pub(crate) fn is_short_read(err: &DataLoaderError) -> bool {
    matches!(err, DataLoaderError::IoError(io) if io.kind() == ErrorKind::UnexpectedEof)
}
