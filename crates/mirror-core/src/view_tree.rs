//! The rendered view tree: one serialized [`SearchView`] per published
//! accession at `{root}/repositories/{r}/accessions/{id}.json`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::traits::ViewSource;
use crate::types::{SearchView, ViewEntry};
use crate::uri::RecordUri;

#[derive(Debug, Clone)]
pub struct ViewTree {
    root: PathBuf,
}

impl ViewTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the view for `uri` is rendered.
    pub fn path_for(&self, uri: &RecordUri) -> PathBuf {
        self.root.join(uri.collection_path()).join(format!("{}.json", uri.id()))
    }

    pub fn write(&self, view: &SearchView) -> Result<PathBuf> {
        let uri = RecordUri::parse(&view.uri)?;
        let path = self.path_for(&uri);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        }
        let bytes = serde_json::to_vec_pretty(view).map_err(|source| Error::MalformedRecord { key: view.uri.clone(), source })?;
        fs::write(&path, bytes).map_err(|e| Error::io(&path, e))?;
        Ok(path)
    }

    /// Delete a previously rendered view. Returns whether a file existed.
    pub fn remove(&self, uri: &RecordUri) -> Result<bool> {
        let path = self.path_for(uri);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(&path, e)),
        }
    }

    /// Rendered accession views in path order. Other JSON under the root is ignored.
    pub fn files(&self) -> Vec<PathBuf> {
        let in_accessions = |p: &Path| p.parent().and_then(Path::file_name).is_some_and(|d| d == "accessions");
        let mut files: Vec<PathBuf> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.path().extension().is_some_and(|ext| ext == "json"))
            .filter(|e| in_accessions(e.path()))
            .map(walkdir::DirEntry::into_path)
            .collect();
        files.sort();
        files
    }

    fn load(path: &Path) -> Option<SearchView> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable view");
                return None;
            }
        };
        match serde_json::from_slice::<SearchView>(&bytes) {
            Ok(view) if !view.uri.is_empty() => Some(view),
            Ok(_) => {
                warn!(path = %path.display(), "skipping view without uri");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping malformed view");
                None
            }
        }
    }
}

impl ViewSource for ViewTree {
    fn entries(&self) -> anyhow::Result<Box<dyn Iterator<Item = ViewEntry> + '_>> {
        if !self.root.is_dir() {
            anyhow::bail!("view tree {} does not exist", self.root.display());
        }
        Ok(Box::new(self.files().into_iter().filter_map(|p| Self::load(&p)).map(|v| ViewEntry::Publish(Box::new(v)))))
    }

    fn is_complete(&self) -> bool {
        true
    }
}
