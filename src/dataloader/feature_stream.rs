use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};
use tracing::{debug, warn};

use crate::codec::features::{is_short_read, read_feature, BYTES_PER_VALUE};

use super::cursor::BatchPlan;
use super::error::{DataLoaderError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    Reading,
    Exhausted,
}

/// Sequential reader over a headerless file of fixed width f32 records.
/// The file stays open until the stream is dropped.
pub struct FeatureStream {
    path: PathBuf,
    reader: BufReader<File>,
    dim: usize,
    records: usize,
    position: usize,
    state: StreamState,
}

impl FeatureStream {
    pub fn open(path: impl AsRef<Path>, dim: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DataLoaderError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let len = file.metadata()?.len();
        let record_bytes = dim * BYTES_PER_VALUE;
        if record_bytes == 0 || len % record_bytes as u64 != 0 {
            return Err(DataLoaderError::MisalignedFeatureFile {
                path: path.to_path_buf(),
                len,
                record_bytes,
            });
        }
        let records = (len / record_bytes as u64) as usize;
        if records == 0 {
            return Err(DataLoaderError::EmptyDataset(path.to_path_buf()));
        }

        Ok(FeatureStream {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            dim,
            records,
            position: 0,
            state: StreamState::Reading,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn records(&self) -> usize {
        self.records
    }

    /// Index of the next record to be read.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn rewind(&mut self) -> Result<()> {
        self.seek_record(0)?;
        debug!(path = %self.path.display(), "feature stream rewound");
        Ok(())
    }

    pub fn seek_record(&mut self, record: usize) -> Result<()> {
        let offset = (record * self.dim * BYTES_PER_VALUE) as u64;
        self.reader.seek(SeekFrom::Start(offset))?;
        self.position = record;
        self.state = if record < self.records {
            StreamState::Reading
        } else {
            StreamState::Exhausted
        };
        Ok(())
    }

    pub fn read_next(&mut self) -> Result<Array1<f32>> {
        if self.state == StreamState::Exhausted {
            return Err(DataLoaderError::StreamExhausted(self.path.clone()));
        }

        let record = read_feature(&mut self.reader, self.dim).map_err(|err| {
            if is_short_read(&err) {
                DataLoaderError::TruncatedFeature {
                    path: self.path.clone(),
                    record: self.position,
                }
            } else {
                err
            }
        })?;

        self.position += 1;
        if self.position >= self.records {
            self.state = StreamState::Exhausted;
        }
        Ok(record)
    }

    /// Read the records of a planned batch, rewinding where the plan wrapped.
    /// On failure the stream is put back where it started.
    pub fn read_batch(&mut self, plan: &BatchPlan) -> Result<Array2<f32>> {
        let start = self.position;
        match self.read_planned(plan) {
            Ok(batch) => Ok(batch),
            Err(err) => {
                if let Err(seek_err) = self.seek_record(start) {
                    warn!(
                        path = %self.path.display(),
                        record = start,
                        error = %seek_err,
                        "could not restore feature stream position"
                    );
                }
                Err(err)
            }
        }
    }

    fn read_planned(&mut self, plan: &BatchPlan) -> Result<Array2<f32>> {
        let mut batch = Array2::<f32>::zeros((plan.indices.len(), self.dim));
        for (i, (&idx, mut row)) in plan.indices.iter().zip(batch.outer_iter_mut()).enumerate() {
            if plan.wrapped_at == Some(i) {
                self.rewind()?;
            }
            debug_assert_eq!(idx, self.position, "feature stream out of step with cursor");
            row.assign(&self.read_next()?);
        }
        Ok(batch)
    }
}
