use crate::error::BuildError;
use bytes::Bytes;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use stratus_core::asset::{AssetKind, AssetSource};
use tracing::debug;
use walkdir::WalkDir;

pub const METADATA_FILE: &str = "metadata.json";

/// One entry of the build's `metadata.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MetadataEntry {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<AssetKind>,
}

/// Read-only access to a build's output.
///
/// Paths are relative to the output root and always use `/`.
pub trait ArtifactProvider {
    /// Every file below the root. Directories are never listed.
    fn files(&self) -> Result<Vec<String>, BuildError>;

    fn exists(&self, path: &str) -> bool;

    fn read(&self, path: &str) -> Result<Bytes, BuildError>;

    fn size(&self, path: &str) -> Result<u64, BuildError>;

    /// How the publisher reaches the file's bytes later on.
    fn source(&self, path: &str) -> AssetSource;

    /// The parsed `metadata.json`, or `None` when the build did not write one.
    fn metadata(&self) -> Result<Option<Vec<MetadataEntry>>, BuildError> {
        if !self.exists(METADATA_FILE) {
            return Ok(None);
        }
        let data = self.read(METADATA_FILE)?;
        Ok(Some(serde_json::from_slice(&data)?))
    }
}

/// A `dist` directory on disk.
#[derive(Debug, Clone)]
pub struct FsArtifacts {
    root: PathBuf,
}

impl FsArtifacts {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn get_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl ArtifactProvider for FsArtifacts {
    fn files(&self) -> Result<Vec<String>, BuildError> {
        if !self.root.is_dir() {
            debug!("Build output {:?} does not exist", self.root);
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|e| BuildError::io(entry.path(), std::io::Error::other(e)))?
                .to_string_lossy()
                .replace('\\', "/");
            files.push(relative);
        }

        files.sort();
        Ok(files)
    }

    fn exists(&self, path: &str) -> bool {
        self.get_path(path).is_file()
    }

    fn read(&self, path: &str) -> Result<Bytes, BuildError> {
        let path = self.get_path(path);
        std::fs::read(&path)
            .map(Bytes::from)
            .map_err(|e| BuildError::io(path, e))
    }

    fn size(&self, path: &str) -> Result<u64, BuildError> {
        let path = self.get_path(path);
        std::fs::metadata(&path)
            .map(|m| m.len())
            .map_err(|e| BuildError::io(path, e))
    }

    fn source(&self, path: &str) -> AssetSource {
        AssetSource::File(self.get_path(path))
    }
}

/// Build output held in memory. Files surface as inline content.
#[derive(Debug, Clone, Default)]
pub struct MemoryArtifacts {
    files: BTreeMap<String, Bytes>,
}

impl MemoryArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.insert(path, data);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, data: impl Into<Bytes>) {
        self.files.insert(path.into(), data.into());
    }

    fn get(&self, path: &str) -> Result<&Bytes, BuildError> {
        self.files
            .get(path)
            .ok_or_else(|| BuildError::Missing(path.to_string()))
    }
}

impl ArtifactProvider for MemoryArtifacts {
    fn files(&self) -> Result<Vec<String>, BuildError> {
        Ok(self.files.keys().cloned().collect())
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn read(&self, path: &str) -> Result<Bytes, BuildError> {
        self.get(path).cloned()
    }

    fn size(&self, path: &str) -> Result<u64, BuildError> {
        self.get(path).map(|data| data.len() as u64)
    }

    fn source(&self, path: &str) -> AssetSource {
        AssetSource::Inline(self.files.get(path).cloned().unwrap_or_default())
    }
}
