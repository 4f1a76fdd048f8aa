//! Directory-per-collection JSON record store.
//!
//! A record lives at `{root}/{path}/{id}.json`, where `path` is a collection
//! directory such as `repositories/2/accessions`. Writes go through a temp file
//! in the target directory and are renamed into place, so a rewrite replaces
//! the whole file and readers never see a half-written record.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct RecordStore {
    root: PathBuf,
}

impl RecordStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| Error::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn write(&self, path: &str, id: u64, json: &[u8]) -> Result<()> {
        let dir = self.collection_dir(path)?;
        fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        let target = dir.join(format!("{id}.json"));

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| Error::io(&dir, e))?;
        tmp.write_all(json).map_err(|e| Error::io(tmp.path(), e))?;
        tmp.persist(&target).map_err(|e| Error::io(&target, e.error))?;
        debug!(path, id, bytes = json.len(), "record written");
        Ok(())
    }

    /// Serialize `record` as pretty JSON and write it.
    pub fn write_record<T: Serialize>(&self, path: &str, id: u64, record: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(record).map_err(|source| Error::MalformedRecord { key: format!("{path}/{id}"), source })?;
        self.write(path, id, &bytes)
    }

    pub fn read(&self, path: &str, id: u64) -> Result<Vec<u8>> {
        let file = self.collection_dir(path)?.join(format!("{id}.json"));
        fs::read(&file).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::NotFound(format!("{path}/{id}")),
            _ => Error::io(&file, e),
        })
    }

    pub fn read_record<T: DeserializeOwned>(&self, path: &str, id: u64) -> Result<T> {
        let bytes = self.read(path, id)?;
        serde_json::from_slice(&bytes).map_err(|source| Error::MalformedRecord { key: format!("{path}/{id}"), source })
    }

    /// Ids of every record in a collection, ascending. A collection that was
    /// never written has no keys.
    pub fn keys(&self, path: &str) -> Result<Vec<u64>> {
        let dir = self.collection_dir(path)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(&dir, e)),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&dir, e))?;
            let file_name = entry.file_name();
            let Some(stem) = file_name.to_str().and_then(|n| n.strip_suffix(".json")) else { continue };
            match stem.parse::<u64>() {
                Ok(id) => ids.push(id),
                Err(_) => warn!(path, file = stem, "ignoring non-numeric record file"),
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    pub fn remove(&self, path: &str, id: u64) -> Result<bool> {
        let file = self.collection_dir(path)?.join(format!("{id}.json"));
        match fs::remove_file(&file) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(&file, e)),
        }
    }

    fn collection_dir(&self, path: &str) -> Result<PathBuf> {
        let rel = Path::new(path);
        let valid = !path.is_empty() && rel.components().all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(Error::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(rel))
    }
}
