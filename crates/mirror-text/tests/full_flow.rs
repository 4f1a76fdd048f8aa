use std::collections::HashMap;

use tempfile::TempDir;

use serde_json::json;

use mirror_core::types::{SearchView, ViewEntry};
use mirror_core::traits::ViewSource;
use mirror_core::view_tree::ViewTree;
use mirror_core::{Error, RecordStore, RecordUri};
use mirror_text::{ErrorPayload, IndexBuilder, QueryEngine, SearchIndex};
use mirror_views::{render_view_tree, LookupMaps, StoreViews};

fn view(id: u64, title: &str) -> SearchView {
	SearchView { uri: format!("/repositories/2/accessions/{id}"), title: title.to_string(), ..SearchView::default() }
}

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> { pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect() }

fn three_missions() -> Vec<SearchView> {
	let mut photos = view(1, "Apollo Mission Photos");
	photos.subjects = vec!["Space flight".into(), "Photographs".into()];
	photos.subjects_topical = vec!["Space flight".into()];
	photos.subjects_function = vec!["Photographs".into()];
	photos.identifier = "2001-001".into();
	let mut logs = view(2, "Apollo Mission Logs");
	logs.subjects = vec!["Space flight".into()];
	logs.subjects_topical = vec!["Space flight".into()];
	logs.content_description = "Flight director logs from the lunar landings.".into();
	let mut gemini = view(3, "Gemini Mission Logs");
	gemini.subjects = vec!["Space flight".into(), "Orbital rendezvous".into()];
	gemini.subjects_topical = vec!["Space flight".into(), "Orbital rendezvous".into()];
	vec![photos, logs, gemini]
}

fn indexed(views: &[SearchView]) -> SearchIndex {
	let index = SearchIndex::in_ram().expect("index");
	let report = IndexBuilder::new(&index).build(&views.to_vec()).expect("build");
	assert_eq!(report.indexed, views.len());
	index
}

fn titles(index: &SearchIndex, pairs: &[(&str, &str)]) -> Vec<String> {
	let page = QueryEngine::new(index).search(&params(pairs)).expect("search");
	let mut titles: Vec<String> = page.hits.into_iter().map(|h| h.view.title).collect();
	titles.sort();
	titles
}

#[test]
fn required_term_matches_only_apollo() {
	let index = indexed(&three_missions());
	let page = QueryEngine::new(&index).search(&params(&[("q_required", "Apollo")])).expect("search");
	assert_eq!(page.total, 2);
	assert_eq!(page.hits.len(), 2);
	assert!(page.hits.iter().all(|h| h.view.title.contains("Apollo")));
}

#[test]
fn excluded_term_drops_gemini() {
	let index = indexed(&three_missions());
	assert_eq!(titles(&index, &[("q_excluded", "Gemini")]), vec!["Apollo Mission Logs", "Apollo Mission Photos"]);
	assert_eq!(titles(&index, &[("q", "logs"), ("q_excluded", "gemini")]), vec!["Apollo Mission Logs"]);
}

#[test]
fn exact_phrase_requires_adjacency() {
	let index = indexed(&three_missions());
	assert_eq!(titles(&index, &[("q_exact", "Mission Logs")]), vec!["Apollo Mission Logs", "Gemini Mission Logs"]);
	assert!(titles(&index, &[("q_exact", "Logs Mission")]).is_empty());
	assert_eq!(titles(&index, &[("q_exact", "orbital rendezvous")]), vec!["Gemini Mission Logs"]);
}

#[test]
fn exact_phrase_spans_stop_words() {
	let index = indexed(&[view(1, "Papers of the Jet Laboratory"), view(2, "Jet Papers")]);
	assert_eq!(titles(&index, &[("q_exact", "Papers of the Jet")]), vec!["Papers of the Jet Laboratory"]);
	assert_eq!(titles(&index, &[("q_exact", "of the Jet Laboratory")]), vec!["Papers of the Jet Laboratory"]);
	assert!(titles(&index, &[("q_exact", "Papers Jet")]).is_empty());
	assert!(titles(&index, &[("q_exact", "Papers of Jet")]).is_empty());
}

#[test]
fn free_text_searches_descriptions_and_subjects() {
	let index = indexed(&three_missions());
	assert_eq!(titles(&index, &[("q", "lunar")]), vec!["Apollo Mission Logs"]);
	assert_eq!(titles(&index, &[("q", "photographs")]), vec!["Apollo Mission Photos"]);
}

#[test]
fn clauses_are_combined_with_and() {
	let index = indexed(&three_missions());
	assert_eq!(titles(&index, &[("q_required", "logs"), ("q_exact", "apollo mission")]), vec!["Apollo Mission Logs"]);
}

#[test]
fn identifiers_are_stored_but_not_searchable() {
	let index = indexed(&three_missions());
	assert!(titles(&index, &[("q_required", "2001")]).is_empty());
	let page = QueryEngine::new(&index).search(&params(&[("q_required", "photos")])).expect("search");
	assert_eq!(page.hits[0].view.identifier, "2001-001");
}

#[test]
fn second_page_of_twelve() {
	let views: Vec<SearchView> = (1..=12).map(|i| view(i, &format!("Survey photograph {i}"))).collect();
	let index = indexed(&views);

	let page = QueryEngine::new(&index).search(&params(&[("q", "survey"), ("page_size", "5"), ("page", "2")])).expect("search");
	assert_eq!(page.total, 12);
	assert_eq!((page.window.offset_first, page.window.offset_last, page.window.last_page, page.window.this_page), (6, 10, 3, 2));
	assert_eq!(page.hits.len(), 5);

	let next = page.next_query_string().expect("next page");
	let prev = page.prev_query_string().expect("prev page");
	assert!(next.contains("from=10") && next.contains("total=12"));
	assert!(prev.contains("from=0"));

	let last = QueryEngine::new(&index).execute(&mirror_text::SearchQuery::parse(next, Default::default()).expect("parse")).expect("search");
	assert_eq!((last.window.this_page, last.hits.len()), (3, 2));
	assert!(last.next_query_string().is_none());
}

#[test]
fn facets_return_top_subject_terms() {
	let index = indexed(&three_missions());
	let page = QueryEngine::new(&index).search(&params(&[("q", "mission")])).expect("search");

	let topical = page.facets.iter().find(|f| f.field == "subjects_topical").expect("topical facet");
	assert_eq!(topical.terms[0].term, "Space flight");
	assert_eq!(topical.terms[0].count, 3);
	assert!(topical.terms.iter().any(|t| t.term == "Orbital rendezvous" && t.count == 1));

	let function = page.facets.iter().find(|f| f.field == "subjects_function").expect("function facet");
	assert_eq!(function.terms.len(), 1);
	assert_eq!(page.facets.len(), 3);
}

#[test]
fn facet_terms_are_capped() {
	let views: Vec<SearchView> = (1..=5)
		.map(|i| {
			let mut v = view(i, "Rocket engine tests");
			v.subjects = (0..i).map(|n| format!("Topic {n}")).collect();
			v
		})
		.collect();
	let index = indexed(&views);
	let page = QueryEngine::new(&index).search(&params(&[("q", "rocket"), ("facets", "subjects")])).expect("search");
	assert_eq!(page.facets.len(), 1);
	let terms = &page.facets[0].terms;
	assert_eq!(terms.len(), 3);
	assert_eq!((terms[0].term.as_str(), terms[0].count), ("Topic 0", 5));
}

#[test]
fn hits_carry_highlight_fragments() {
	let index = indexed(&three_missions());
	let page = QueryEngine::new(&index).search(&params(&[("q", "lunar")])).expect("search");
	let fragment = page.hits[0].highlights.get("content_description").expect("highlight");
	assert!(fragment.contains("<b>lunar</b>"), "{fragment}");
	assert!(!page.hits[0].highlights.contains_key("title"));
}

#[test]
fn reindexing_replaces_and_withdrawals_delete() {
	let index = indexed(&three_missions());
	let mut renamed = three_missions();
	renamed[0].title = "Apollo Mission Prints".into();
	IndexBuilder::new(&index).build(&renamed).expect("rebuild");
	assert_eq!(index.num_docs(), 3);
	assert_eq!(titles(&index, &[("q_required", "apollo")]), vec!["Apollo Mission Logs", "Apollo Mission Prints"]);

	struct Withdrawals(Vec<String>);
	impl ViewSource for Withdrawals {
		fn entries(&self) -> anyhow::Result<Box<dyn Iterator<Item = ViewEntry> + '_>> {
			Ok(Box::new(self.0.iter().cloned().map(ViewEntry::Withdraw)))
		}
	}
	let report = IndexBuilder::new(&index).build(&Withdrawals(vec!["/repositories/2/accessions/3".into()])).expect("withdraw");
	assert_eq!(report.withdrawn, 1);
	assert_eq!(index.num_docs(), 2);
	assert!(titles(&index, &[("q", "gemini")]).is_empty());
}

#[test]
fn small_batches_commit_everything() {
	let views: Vec<SearchView> = (1..=57).map(|i| view(i, "Telemetry tape")).collect();
	let index = SearchIndex::in_ram().expect("index");
	let report = IndexBuilder::new(&index).with_batch_sizes(2, 8).build(&views).expect("build");
	assert_eq!(report.indexed, 57);
	// 2 + 4 + 8 * 6 + 3
	assert_eq!(report.batches, 9);
	assert_eq!(index.num_docs(), 57);
}

#[test]
fn query_errors_are_explicit() {
	let index = indexed(&three_missions());
	let engine = QueryEngine::new(&index);

	let err = engine.search(&params(&[("q", "apollo"), ("page", "second")])).expect_err("bad page");
	assert_eq!(ErrorPayload::from(&err).parameter.as_deref(), Some("page"));
	assert!(matches!(engine.search(&params(&[])), Err(Error::EmptyQuery)));

	let none = engine.search(&params(&[("q_required", "voyager")])).expect("no hits is not an error");
	assert_eq!((none.total, none.window.offset_first, none.window.offset_last, none.window.last_page), (0, 0, 0, 1));
}

#[test]
fn index_on_disk_survives_reopen() {
	let tmp = TempDir::new().expect("tempdir");
	let dir = tmp.path().join("index");
	{
		let index = SearchIndex::create(&dir).expect("create");
		IndexBuilder::new(&index).build(&three_missions()).expect("build");
	}
	let reopened = SearchIndex::open_or_create(&dir).expect("reopen");
	assert_eq!(reopened.num_docs(), 3);
	assert_eq!(titles(&reopened, &[("q_required", "gemini")]), vec!["Gemini Mission Logs"]);

	let fresh = SearchIndex::create(&dir).expect("recreate");
	assert_eq!(fresh.num_docs(), 0);
}

#[test]
fn view_tree_build_drops_views_no_longer_rendered() {
	let tmp = TempDir::new().expect("tempdir");
	let tree = ViewTree::new(tmp.path().join("htdocs"));
	for v in three_missions() { tree.write(&v).expect("write view"); }
	let dir = tmp.path().join("index");
	IndexBuilder::new(&SearchIndex::open_or_create(&dir).expect("create")).build(&tree).expect("build");

	tree.remove(&RecordUri::parse("/repositories/2/accessions/3").expect("uri")).expect("remove");
	let index = SearchIndex::open_or_create(&dir).expect("reopen");
	let report = IndexBuilder::new(&index).build(&tree).expect("rebuild");
	assert_eq!((report.indexed, report.withdrawn), (2, 1));
	assert_eq!(index.num_docs(), 2);
	assert!(titles(&index, &[("q", "gemini")]).is_empty());
}

fn store_accession(store: &RecordStore, id: u64, title: &str, publish: bool) {
	let record = json!({"uri": format!("/repositories/2/accessions/{id}"), "title": title, "publish": publish});
	store.write_record("repositories/2/accessions", id, &record).expect("accession");
}

#[test]
fn unpublished_accession_leaves_index_after_render_and_reindex() {
	let tmp = TempDir::new().expect("tempdir");
	let store = RecordStore::open(tmp.path().join("dataset")).expect("store");
	store.write_record("repositories", 2, &json!({"uri": "/repositories/2"})).expect("repo");
	store_accession(&store, 1, "Apollo Mission Photos", true);
	store_accession(&store, 2, "Gemini Mission Logs", true);
	let tree = ViewTree::new(tmp.path().join("htdocs"));
	let dir = tmp.path().join("index");

	render_view_tree(&store, &LookupMaps::build(&store).expect("maps"), &tree).expect("render");
	IndexBuilder::new(&SearchIndex::open_or_create(&dir).expect("create")).build(&tree).expect("build");

	store_accession(&store, 2, "Gemini Mission Logs", false);
	let maps = LookupMaps::build(&store).expect("maps");
	let rendered = render_view_tree(&store, &maps, &tree).expect("render again");
	assert_eq!(rendered.withdrawn, 1);

	let index = SearchIndex::open_or_create(&dir).expect("reopen");
	IndexBuilder::new(&index).build(&tree).expect("reindex");
	assert_eq!(index.num_docs(), 1);
	assert!(titles(&index, &[("q", "gemini")]).is_empty());

	store_accession(&store, 3, "Mercury Capsule Drawings", true);
	let maps = LookupMaps::build(&store).expect("maps");
	IndexBuilder::new(&index).build(&StoreViews::new(&store, &maps)).expect("store build");
	assert_eq!(titles(&index, &[("q", "mission drawings")]), vec!["Apollo Mission Photos", "Mercury Capsule Drawings"]);
}
