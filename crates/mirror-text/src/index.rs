use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::Path;
use tantivy::collector::DocSetCollector;
use tantivy::query::AllQuery;
use tantivy::schema::Value;
use tantivy::{Index, IndexReader, ReloadPolicy, Searcher, TantivyDocument};

use crate::schema::{build_schema, register_analyzer, ViewFields};

/// Handle on one tantivy index: the index itself, a manually reloaded reader
/// and the resolved field set.
///
/// Created by the process entry point and lent to [`crate::IndexBuilder`] and
/// [`crate::QueryEngine`]. Searches see the state as of the last [`reload`];
/// during a build that may be a partially committed index.
///
/// [`reload`]: SearchIndex::reload
pub struct SearchIndex {
	index: Index,
	reader: IndexReader,
	fields: ViewFields,
}

impl SearchIndex {
	/// Create an empty index at `index_dir`, wiping anything already there.
	pub fn create(index_dir: &Path) -> Result<Self> {
		if index_dir.exists() { std::fs::remove_dir_all(index_dir).with_context(|| format!("clearing {}", index_dir.display()))?; }
		std::fs::create_dir_all(index_dir)?;
		let index = Index::create_in_dir(index_dir, build_schema())?;
		Self::from_index(index)
	}

	pub fn open(index_dir: &Path) -> Result<Self> {
		let index = Index::open_in_dir(index_dir).with_context(|| format!("opening index at {}", index_dir.display()))?;
		Self::from_index(index)
	}

	/// Open the index at `index_dir`, creating it when none exists yet.
	pub fn open_or_create(index_dir: &Path) -> Result<Self> {
		if index_dir.join("meta.json").is_file() { Self::open(index_dir) } else { Self::create(index_dir) }
	}

	pub fn in_ram() -> Result<Self> { Self::from_index(Index::create_in_ram(build_schema())) }

	fn from_index(index: Index) -> Result<Self> {
		register_analyzer(&index);
		let fields = ViewFields::resolve(&index.schema()).context("index schema does not match accession views")?;
		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
		Ok(Self { index, reader, fields })
	}

	pub fn index(&self) -> &Index { &self.index }

	pub fn fields(&self) -> &ViewFields { &self.fields }

	pub fn searcher(&self) -> Searcher { self.reader.searcher() }

	/// Make committed changes visible to new searchers.
	pub fn reload(&self) -> Result<()> { self.reader.reload()?; Ok(()) }

	pub fn num_docs(&self) -> u64 { self.reader.searcher().num_docs() }

	/// Accession URIs of every document visible to the current reader.
	pub fn indexed_uris(&self) -> Result<BTreeSet<String>> {
		let searcher = self.searcher();
		let mut uris = BTreeSet::new();
		for address in searcher.search(&AllQuery, &DocSetCollector)? {
			let doc: TantivyDocument = searcher.doc(address)?;
			if let Some(uri) = doc.get_first(self.fields.id).and_then(|v| v.as_str()) { uris.insert(uri.to_string()); }
		}
		Ok(uris)
	}
}
