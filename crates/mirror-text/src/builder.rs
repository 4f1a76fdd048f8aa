//! Batched index writes.
//!
//! Documents are keyed by accession URI: every publish deletes the previous
//! document with that key before adding the new one, so re-indexing replaces.
//! Batches start at `batch_start` operations and double after each commit up
//! to `batch_ceiling`. A failed commit aborts the build; nothing is retried and
//! the uncommitted batch is dropped with the writer.
//!
//! When the source is complete (a rendered view tree, the whole store), any
//! document it did not list is withdrawn in the last batch.
use std::collections::BTreeSet;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tantivy::IndexWriter;
use tracing::{debug, info};

use mirror_core::config::PipelineSettings;
use mirror_core::traits::ViewSource;
use mirror_core::types::ViewEntry;

use crate::index::SearchIndex;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
	pub indexed: usize,
	pub withdrawn: usize,
	pub batches: usize,
}

pub struct IndexBuilder<'a> {
	index: &'a SearchIndex,
	batch_start: usize,
	batch_ceiling: usize,
	heap_bytes: usize,
	show_progress: bool,
}

impl<'a> IndexBuilder<'a> {
	pub fn new(index: &'a SearchIndex) -> Self {
		let defaults = PipelineSettings::default();
		Self::from_settings(index, &defaults)
	}

	pub fn from_settings(index: &'a SearchIndex, settings: &PipelineSettings) -> Self {
		Self {
			index,
			batch_start: settings.batch_start.max(1),
			batch_ceiling: settings.batch_ceiling.max(settings.batch_start.max(1)),
			heap_bytes: settings.writer_heap_bytes,
			show_progress: false,
		}
	}

	pub fn with_batch_sizes(mut self, start: usize, ceiling: usize) -> Self {
		self.batch_start = start.max(1);
		self.batch_ceiling = ceiling.max(self.batch_start);
		self
	}

	pub fn with_progress(mut self, show: bool) -> Self { self.show_progress = show; self }

	/// Commit thresholds in order: `batch_start`, doubling, then `batch_ceiling` forever.
	fn batch_sizes(&self) -> impl Iterator<Item = usize> {
		let ceiling = self.batch_ceiling;
		std::iter::successors(Some(self.batch_start), move |&size| Some(size.saturating_mul(2).min(ceiling)))
	}

	pub fn build(&self, source: &dyn ViewSource) -> Result<BuildReport> {
		let fields = self.index.fields();
		let mut stale: BTreeSet<String> = if source.is_complete() { self.index.indexed_uris()? } else { BTreeSet::new() };
		let mut writer: IndexWriter = self.index.index().writer(self.heap_bytes)?;
		let pb = if self.show_progress { ProgressBar::new_spinner() } else { ProgressBar::hidden() };
		if let Ok(style) = ProgressStyle::with_template("{spinner} {pos} views {msg}") { pb.set_style(style); }

		let mut report = BuildReport::default();
		let mut sizes = self.batch_sizes();
		let (mut batch_size, mut pending) = (sizes.next().unwrap_or(self.batch_start), 0usize);
		for entry in source.entries()? {
			match entry {
				ViewEntry::Publish(view) => {
					stale.remove(&view.uri);
					writer.delete_term(fields.id_term(&view.uri));
					writer.add_document(fields.to_document(&view))?;
					report.indexed += 1;
				}
				ViewEntry::Withdraw(uri) => {
					stale.remove(&uri);
					writer.delete_term(fields.id_term(&uri));
					report.withdrawn += 1;
				}
			}
			pb.inc(1);
			pending += 1;
			if pending >= batch_size {
				writer.commit().with_context(|| format!("committing batch {} ({} operations)", report.batches + 1, pending))?;
				report.batches += 1;
				debug!(batch = report.batches, size = pending, indexed = report.indexed, "batch committed");
				pending = 0;
				batch_size = sizes.next().unwrap_or(self.batch_ceiling);
				pb.set_message(format!("batch size {batch_size}"));
			}
		}
		for uri in &stale {
			debug!(uri = %uri, "withdrawing document missing from source");
			writer.delete_term(fields.id_term(uri));
			report.withdrawn += 1;
			pending += 1;
		}
		if pending > 0 {
			writer.commit().with_context(|| format!("committing batch {} ({} operations)", report.batches + 1, pending))?;
			report.batches += 1;
		}
		writer.wait_merging_threads()?;
		self.index.reload()?;
		pb.finish_with_message("done");

		info!(indexed = report.indexed, withdrawn = report.withdrawn, batches = report.batches, "index build finished");
		Ok(report)
	}
}

/// Build (or update) `index` from `source` using the configured batch sizes.
pub fn build_index(index: &SearchIndex, source: &dyn ViewSource, settings: &PipelineSettings) -> Result<usize> {
	Ok(IndexBuilder::from_settings(index, settings).build(source)?.indexed)
}
