use std::collections::{BTreeMap, HashMap};

use tantivy::collector::{Count, FacetCollector, TopDocs};
use tantivy::query::Query;
use tantivy::schema::Facet;
use tantivy::snippet::SnippetGenerator;
use tantivy::{Searcher, TantivyDocument};
use tracing::debug;

use mirror_core::config::PipelineSettings;
use mirror_core::{Error, Result};

use crate::index::SearchIndex;
use crate::page::{FacetCount, FacetResult, Hit, PageWindow, SearchResultPage};
use crate::query::{QueryLimits, SearchQuery};
use crate::schema::{HIGHLIGHTED, SUBJECT_FACETS};

/// Read-only query side of a [`SearchIndex`]. Any number of engines may share
/// one index handle.
pub struct QueryEngine<'a> {
	index: &'a SearchIndex,
	limits: QueryLimits,
	facet_size: usize,
	snippet_chars: usize,
}

fn index_err(e: tantivy::TantivyError) -> Error { Error::Index(e.to_string()) }

impl<'a> QueryEngine<'a> {
	pub fn new(index: &'a SearchIndex) -> Self { Self::from_settings(index, &PipelineSettings::default()) }

	pub fn from_settings(index: &'a SearchIndex, settings: &PipelineSettings) -> Self {
		Self { index, limits: QueryLimits::from(settings), facet_size: settings.facet_size.max(1), snippet_chars: settings.snippet_chars }
	}

	/// Translate a raw parameter map and run it.
	pub fn search(&self, raw: &HashMap<String, String>) -> Result<SearchResultPage> {
		let query = SearchQuery::translate_with(raw, self.limits)?;
		self.execute(&query)
	}

	pub fn execute(&self, query: &SearchQuery) -> Result<SearchResultPage> {
		let compiled = query.compile(self.index)?;
		let searcher = self.index.searcher();

		let mut facet_collector = FacetCollector::for_field(SUBJECT_FACETS);
		for field in &query.facets { facet_collector.add_facet(Facet::from_path([field.as_str()])); }
		let (total, facet_counts) = searcher.search(&*compiled, &(Count, facet_collector)).map_err(index_err)?;

		let window = PageWindow::compute(total, query.from, query.size);
		let hits = if total == 0 { Vec::new() } else { self.collect_hits(&searcher, &*compiled, &window)? };

		let facets = query
			.facets
			.iter()
			.map(|field| FacetResult {
				field: field.clone(),
				terms: facet_counts
					.top_k(Facet::from_path([field.as_str()]), self.facet_size)
					.into_iter()
					.map(|(facet, count)| FacetCount { term: facet.to_path().last().map(|s| s.to_string()).unwrap_or_default(), count })
					.collect(),
			})
			.collect();

		let total = total as u64;
		debug!(total, page = window.this_page, hits = hits.len(), "query executed");
		let links = SearchResultPage::links_for(query, &window, total);
		Ok(SearchResultPage { query: query.clone(), total, window, hits, facets, links })
	}

	fn collect_hits(&self, searcher: &Searcher, query: &dyn Query, window: &PageWindow) -> Result<Vec<Hit>> {
		let fields = self.index.fields();
		let schema = self.index.index().schema();
		let mut generators = Vec::new();
		for name in HIGHLIGHTED {
			let field = schema.get_field(name).map_err(index_err)?;
			let mut generator = SnippetGenerator::create(searcher, query, field).map_err(index_err)?;
			generator.set_max_num_chars(self.snippet_chars);
			generators.push((name, generator));
		}

		let top_docs = searcher.search(query, &TopDocs::with_limit(window.size).and_offset(window.from)).map_err(index_err)?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, address) in top_docs {
			let doc: TantivyDocument = searcher.doc(address).map_err(index_err)?;
			let mut highlights = BTreeMap::new();
			for (name, generator) in &generators {
				let snippet = generator.snippet_from_doc(&doc);
				if !snippet.is_empty() { highlights.insert(name.to_string(), snippet.to_html()); }
			}
			hits.push(Hit { score, view: fields.to_view(&doc), highlights });
		}
		Ok(hits)
	}
}
