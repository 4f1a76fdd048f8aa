//! Raw request parameters → [`SearchQuery`] → tantivy query.
//!
//! Accepted keys: `q`, `q_required`, `q_exact`, `q_excluded`, `page` +
//! `page_size` or `from` + `size`, `facets` (comma separated) and `total`
//! (echoed back by page links, validated and ignored). Unknown keys are
//! ignored. Every clause is ANDed with the others.
use std::collections::HashMap;

use serde::Serialize;
use tantivy::query::{AllQuery, BooleanQuery, EmptyQuery, Occur, PhraseQuery, Query, QueryParser, TermQuery};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::tokenizer::TokenStream;
use tantivy::Term;
use tracing::debug;
use url::form_urlencoded;

use mirror_core::config::PipelineSettings;
use mirror_core::{Error, Result};

use crate::index::SearchIndex;
use crate::schema::{DEFAULT_FACETS, FACETABLE};

/// Page-size bounds applied during translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
	pub default_size: usize,
	pub max_size: usize,
}

impl Default for QueryLimits {
	fn default() -> Self { Self { default_size: 10, max_size: 100 } }
}

impl From<&PipelineSettings> for QueryLimits {
	fn from(s: &PipelineSettings) -> Self { Self { default_size: s.default_page_size, max_size: s.max_page_size } }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
	pub q: String,
	pub q_required: String,
	pub q_exact: String,
	pub q_excluded: String,
	pub size: usize,
	pub from: usize,
	pub facets: Vec<String>,
}

/// Translate with the default page-size limits.
pub fn translate(raw: &HashMap<String, String>) -> Result<SearchQuery> { SearchQuery::translate_with(raw, QueryLimits::default()) }

fn parse_number(raw: &HashMap<String, String>, name: &str) -> Result<Option<i64>> {
	let Some(value) = raw.get(name).map(|v| v.trim()).filter(|v| !v.is_empty()) else { return Ok(None) };
	value.parse::<i64>().map(Some).map_err(|e| Error::InvalidParameter { name: name.to_string(), value: value.to_string(), reason: e.to_string() })
}

fn non_negative(n: i64) -> usize { usize::try_from(n.max(0)).unwrap_or(usize::MAX) }

impl SearchQuery {
	pub fn translate_with(raw: &HashMap<String, String>, limits: QueryLimits) -> Result<Self> {
		let text = |key: &str| raw.get(key).map(|v| v.trim().to_string()).unwrap_or_default();

		let size = match parse_number(raw, "size")?.or(parse_number(raw, "page_size")?) {
			Some(n) if n > 0 => non_negative(n).min(limits.max_size),
			_ => limits.default_size,
		};
		let page = parse_number(raw, "page")?;
		let from = match parse_number(raw, "from")? {
			Some(n) => non_negative(n),
			None => non_negative(page.unwrap_or(1).max(1) - 1).saturating_mul(size),
		};
		parse_number(raw, "total")?;

		let facets = match raw.get("facets").map(|v| v.trim()).filter(|v| !v.is_empty()) {
			None => DEFAULT_FACETS.iter().map(|f| f.to_string()).collect(),
			Some(list) => {
				let mut facets = Vec::new();
				for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
					if !FACETABLE.contains(&name) {
						return Err(Error::InvalidParameter { name: "facets".into(), value: name.to_string(), reason: format!("expected one of {}", FACETABLE.join(", ")) });
					}
					if !facets.iter().any(|f| f == name) { facets.push(name.to_string()); }
				}
				facets
			}
		};

		Ok(Self { q: text("q"), q_required: text("q_required"), q_exact: text("q_exact"), q_excluded: text("q_excluded"), size, from, facets })
	}

	/// Parse a URL-encoded query string such as one produced by [`SearchQuery::to_query_string`].
	pub fn parse(query_string: &str, limits: QueryLimits) -> Result<Self> {
		let raw: HashMap<String, String> = form_urlencoded::parse(query_string.trim_start_matches('?').as_bytes()).into_owned().collect();
		Self::translate_with(&raw, limits)
	}

	pub fn has_terms(&self) -> bool { !(self.q.is_empty() && self.q_required.is_empty() && self.q_exact.is_empty() && self.q_excluded.is_empty()) }

	/// 1-based page number `from` falls on.
	pub fn page(&self) -> usize { self.from / self.size.max(1) + 1 }

	/// Same query starting at another offset.
	pub fn at(&self, from: usize) -> Self { Self { from, ..self.clone() } }

	/// URL-encoded form of this query, plus the computed total when known.
	pub fn to_query_string(&self, total: Option<u64>) -> String {
		let mut out = form_urlencoded::Serializer::new(String::new());
		for (key, value) in [("q", &self.q), ("q_required", &self.q_required), ("q_exact", &self.q_exact), ("q_excluded", &self.q_excluded)] {
			if !value.is_empty() { out.append_pair(key, value); }
		}
		out.append_pair("size", &self.size.to_string());
		out.append_pair("from", &self.from.to_string());
		if self.facets.iter().map(String::as_str).ne(DEFAULT_FACETS) { out.append_pair("facets", &self.facets.join(",")); }
		if let Some(total) = total { out.append_pair("total", &total.to_string()); }
		out.finish()
	}

	/// Compile into one boolean query over the index's analyzed fields.
	pub fn compile(&self, index: &SearchIndex) -> Result<Box<dyn Query>> {
		if !self.has_terms() { return Err(Error::EmptyQuery); }
		let fields = index.fields().searchable();
		let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();

		if !self.q.is_empty() {
			let parser = QueryParser::for_index(index.index(), fields.clone());
			let (query, errors) = parser.parse_query_lenient(&self.q);
			if !errors.is_empty() { debug!(q = %self.q, ?errors, "free text parsed leniently"); }
			clauses.push((Occur::Must, query));
		}
		for token in self.q_required.split_whitespace() {
			if let Some(query) = match_any_field(index, &fields, token)? { clauses.push((Occur::Must, query)); }
		}
		if !self.q_exact.is_empty() {
			if let Some(query) = match_any_field(index, &fields, &self.q_exact)? { clauses.push((Occur::Must, query)); }
		}

		let positive_requested = !(self.q.is_empty() && self.q_required.is_empty() && self.q_exact.is_empty());
		if clauses.is_empty() {
			// every positive term analyzed away (stop words only): nothing can match
			if positive_requested { return Ok(Box::new(EmptyQuery)); }
			clauses.push((Occur::Must, Box::new(AllQuery)));
		}
		for token in self.q_excluded.split_whitespace() {
			if let Some(query) = match_any_field(index, &fields, token)? { clauses.push((Occur::MustNot, query)); }
		}
		Ok(Box::new(BooleanQuery::new(clauses)))
	}
}

/// Terms `text` analyzes to in `field`, with their token positions. Stop words
/// leave gaps in the positions, same as at index time.
fn analyze(index: &SearchIndex, field: Field, text: &str) -> Result<Vec<(usize, Term)>> {
	let mut analyzer = index.index().tokenizer_for_field(field).map_err(|e| Error::Index(e.to_string()))?;
	let mut stream = analyzer.token_stream(text);
	let mut terms = Vec::new();
	while stream.advance() {
		let token = stream.token();
		terms.push((token.position, Term::from_field_text(field, &token.text)));
	}
	Ok(terms)
}

/// Match `text` in any analyzed field: a term query when it analyzes to one
/// term, a phrase when it analyzes to several. Phrase offsets count from the
/// first kept token so dropped stop words still occupy their slot. `None` when
/// every field drops it entirely.
fn match_any_field(index: &SearchIndex, fields: &[Field], text: &str) -> Result<Option<Box<dyn Query>>> {
	let mut per_field: Vec<(Occur, Box<dyn Query>)> = Vec::new();
	for &field in fields {
		let mut terms = analyze(index, field, text)?;
		let query: Box<dyn Query> = match terms.len() {
			0 => continue,
			1 => match terms.pop() { Some((_, term)) => Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)), None => continue },
			_ => {
				let first = terms[0].0;
				Box::new(PhraseQuery::new_with_offset(terms.into_iter().map(|(pos, term)| (pos - first, term)).collect()))
			}
		};
		per_field.push((Occur::Should, query));
	}
	Ok((!per_field.is_empty()).then(|| Box::new(BooleanQuery::new(per_field)) as Box<dyn Query>))
}
