//! Result page types and page arithmetic.
use std::collections::BTreeMap;

use serde::Serialize;

use mirror_core::types::SearchView;
use mirror_core::Error;

use crate::query::SearchQuery;

/// Where a request lands once the total is known.
///
/// A request past the last page is moved onto the last page. With no hits the
/// window is page 1 of 1 with both offsets 0. Neighbouring windows are `size`
/// hits either side of `from`, whether or not `from` sits on a page boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
	#[serde(skip)]
	pub total: usize,
	pub from: usize,
	pub size: usize,
	pub first_page: usize,
	pub last_page: usize,
	pub this_page: usize,
	pub offset_first: usize,
	pub offset_last: usize,
}

impl PageWindow {
	pub fn compute(total: usize, from: usize, size: usize) -> Self {
		let size = size.max(1);
		let last_page = total.div_ceil(size).max(1);
		let from = match total {
			0 => 0,
			_ if from >= total => (last_page - 1) * size,
			_ => from,
		};
		let this_page = (from / size + 1).min(last_page);
		let offset_first = if total == 0 { 0 } else { from + 1 };
		let offset_last = from.saturating_add(size).min(total);
		Self { total, from, size, first_page: 1, last_page, this_page, offset_first, offset_last }
	}

	pub fn has_next(&self) -> bool { self.offset_last < self.total }

	pub fn has_prev(&self) -> bool { self.from > 0 }

	/// Offset of the following window, if any hits remain.
	pub fn next_from(&self) -> Option<usize> { self.has_next().then_some(self.from + self.size) }

	/// Offset of the preceding window, never below zero.
	pub fn prev_from(&self) -> Option<usize> { self.has_prev().then(|| self.from.saturating_sub(self.size)) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetCount {
	pub term: String,
	pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetResult {
	pub field: String,
	pub terms: Vec<FacetCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Hit {
	pub score: f32,
	#[serde(flatten)]
	pub view: SearchView,
	/// HTML fragments keyed by field name; fields without a match are absent.
	pub highlights: BTreeMap<String, String>,
}

/// URL-encoded query strings for this page and its neighbours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLinks {
	pub this: String,
	pub next: Option<String>,
	pub prev: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResultPage {
	pub query: SearchQuery,
	pub total: u64,
	#[serde(flatten)]
	pub window: PageWindow,
	pub hits: Vec<Hit>,
	pub facets: Vec<FacetResult>,
	pub links: PageLinks,
}

impl SearchResultPage {
	pub fn links_for(query: &SearchQuery, window: &PageWindow, total: u64) -> PageLinks {
		let at = |from: usize| query.at(from).to_query_string(Some(total));
		PageLinks {
			this: at(window.from),
			next: window.next_from().map(&at),
			prev: window.prev_from().map(&at),
		}
	}

	pub fn query_string(&self) -> &str { &self.links.this }

	pub fn next_query_string(&self) -> Option<&str> { self.links.next.as_deref() }

	pub fn prev_query_string(&self) -> Option<&str> { self.links.prev.as_deref() }
}

/// What a caller gets instead of a page when the query fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
	pub error: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub parameter: Option<String>,
}

impl From<&Error> for ErrorPayload {
	fn from(e: &Error) -> Self { Self { error: e.to_string(), parameter: e.parameter().map(str::to_string) } }
}
