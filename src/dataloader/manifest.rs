use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;

use super::error::{DataLoaderError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ManifestRecord {
    Single(Box<str>),
    Pair { profile: Box<str>, front: Box<str> },
}

impl ManifestRecord {
    pub fn profile(&self) -> &str {
        match self {
            ManifestRecord::Single(entry) => entry,
            ManifestRecord::Pair { profile, .. } => profile,
        }
    }

    /// Second field of a pair, or the only field of a single record.
    pub fn front(&self) -> &str {
        match self {
            ManifestRecord::Single(entry) => entry,
            ManifestRecord::Pair { front, .. } => front,
        }
    }

    fn field_count(&self) -> usize {
        match self {
            ManifestRecord::Single(_) => 1,
            ManifestRecord::Pair { .. } => 2,
        }
    }
}

/// Comma delimited list of relative file names, one record per line.
#[derive(Clone, Debug)]
pub struct Manifest {
    path: PathBuf,
    records: Vec<ManifestRecord>,
}

impl Manifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DataLoaderError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text)
    }

    pub fn parse(path: impl AsRef<Path>, text: &str) -> Result<Self> {
        let path = path.as_ref();
        let mut records: Vec<ManifestRecord> = Vec::new();

        for (line_idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let malformed = |reason: &str| DataLoaderError::MalformedManifest {
                path: path.to_path_buf(),
                line: line_idx + 1,
                reason: reason.to_string(),
            };

            let record = match line.split_once(',') {
                None => ManifestRecord::Single(line.into()),
                Some((profile, front)) => {
                    let (profile, front) = (profile.trim(), front.trim());
                    if profile.is_empty() || front.is_empty() {
                        return Err(malformed("empty field"));
                    }
                    if front.contains(',') {
                        return Err(malformed("more than two fields"));
                    }
                    ManifestRecord::Pair {
                        profile: profile.into(),
                        front: front.into(),
                    }
                }
            };

            if let Some(first) = records.first() {
                if first.field_count() != record.field_count() {
                    return Err(malformed("field count differs from the first record"));
                }
            }
            records.push(record);
        }

        if records.is_empty() {
            return Err(DataLoaderError::EmptyDataset(path.to_path_buf()));
        }

        Ok(Manifest {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[ManifestRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_paired(&self) -> bool {
        matches!(self.records.first(), Some(ManifestRecord::Pair { .. }))
    }

    // Pairs move together, so a paired manifest keeps its profile/front
    // association through the shuffle.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.records.shuffle(rng);
    }

    pub fn profile_list(&self, base: impl Into<PathBuf>) -> PathList {
        PathList::new(base, self.records.iter().map(|r| r.profile().into()).collect())
    }

    pub fn front_list(&self, base: impl Into<PathBuf>) -> PathList {
        PathList::new(base, self.records.iter().map(|r| r.front().into()).collect())
    }
}

/// Manifest entries of one side, joined with their base directory on access.
#[derive(Clone, Debug)]
pub struct PathList {
    base: PathBuf,
    entries: Vec<Box<str>>,
}

impl PathList {
    pub fn new(base: impl Into<PathBuf>, entries: Vec<Box<str>>) -> Self {
        PathList {
            base: base.into(),
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, idx: usize) -> &str {
        &self.entries[idx]
    }

    pub fn resolve(&self, idx: usize) -> PathBuf {
        self.base.join(&*self.entries[idx])
    }

    pub fn file_name(&self, idx: usize) -> &str {
        file_name_of(&self.entries[idx])
    }
}

pub(crate) fn file_name_of(entry: &str) -> &str {
    entry.rsplit('/').next().unwrap_or(entry)
}
