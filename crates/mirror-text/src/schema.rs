//! Index schema for accession views.
//!
//! Free-text fields go through the English analyzer and are stored for display
//! and highlighting. Identifier, date and link fields are stored only so they
//! never produce matches. Subject buckets also feed one hierarchical facet field,
//! `/{bucket}/{label}`, which is what facet counts are computed from.
use chrono::{DateTime, Utc};
use tantivy::schema::{DateOptions, FacetOptions, Facet, Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Value, STORED, STRING};
use tantivy::tokenizer::{Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, StopWordFilter, TextAnalyzer};
use tantivy::{Index, TantivyDocument, Term};

use mirror_core::types::{DigitalObjectLinks, SearchView};

pub const ANALYZER: &str = "en";

pub const ID: &str = "id";
pub const TITLE: &str = "title";
pub const CONTENT_DESCRIPTION: &str = "content_description";
pub const SUBJECTS: &str = "subjects";
pub const SUBJECTS_TOPICAL: &str = "subjects_topical";
pub const SUBJECTS_FUNCTION: &str = "subjects_function";
pub const SUBJECTS_GEOGRAPHIC: &str = "subjects_geographic";
pub const SUBJECTS_GENRE_FORM: &str = "subjects_genre_form";
pub const AGENTS_CREATORS: &str = "linked_agents_creators";
pub const AGENTS_SUBJECTS: &str = "linked_agents_subjects";
pub const AGENTS_SOURCES: &str = "linked_agents_sources";
pub const EXTENTS: &str = "extents";
pub const IDENTIFIER: &str = "identifier";
pub const ACCESSION_DATE: &str = "accession_date";
pub const DATE_EXPRESSION: &str = "date_expression";
pub const DIGITAL_OBJECT_TITLES: &str = "digital_objects_title";
pub const DIGITAL_OBJECT_FILE_URIS: &str = "digital_objects_file_uris";
pub const CREATED: &str = "created";
pub const SUBJECT_FACETS: &str = "subject_facets";

/// Subject buckets that can be faceted on.
pub const FACETABLE: [&str; 5] = [SUBJECTS, SUBJECTS_TOPICAL, SUBJECTS_FUNCTION, SUBJECTS_GEOGRAPHIC, SUBJECTS_GENRE_FORM];

/// Facets returned when a query does not ask for specific ones.
pub const DEFAULT_FACETS: [&str; 3] = [SUBJECTS, SUBJECTS_TOPICAL, SUBJECTS_FUNCTION];

/// Fields that get highlight fragments on each hit.
pub const HIGHLIGHTED: [&str; 6] = [TITLE, CONTENT_DESCRIPTION, SUBJECTS, SUBJECTS_FUNCTION, SUBJECTS_TOPICAL, EXTENTS];

const ANALYZED: [&str; 11] = [
	TITLE, CONTENT_DESCRIPTION, SUBJECTS, SUBJECTS_TOPICAL, SUBJECTS_FUNCTION, SUBJECTS_GEOGRAPHIC, SUBJECTS_GENRE_FORM,
	AGENTS_CREATORS, AGENTS_SUBJECTS, AGENTS_SOURCES, EXTENTS,
];
const STORED_ONLY: [&str; 5] = [IDENTIFIER, ACCESSION_DATE, DATE_EXPRESSION, DIGITAL_OBJECT_TITLES, DIGITAL_OBJECT_FILE_URIS];

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field(ID, STRING | STORED);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(ANALYZER).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing).set_stored();
	for name in ANALYZED { schema_builder.add_text_field(name, text_options.clone()); }
	for name in STORED_ONLY { schema_builder.add_text_field(name, STORED); }
	schema_builder.add_date_field(CREATED, DateOptions::default().set_stored());
	schema_builder.add_facet_field(SUBJECT_FACETS, FacetOptions::default());
	schema_builder.build()
}

pub fn register_analyzer(index: &Index) {
	let stop_words = vec![
		"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
	];
	let analyzer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(RemoveLongFilter::limit(40))
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(stop_words.into_iter().map(|s| s.to_string())))
		.filter(Stemmer::new(Language::English))
		.build();
	index.tokenizers().register(ANALYZER, analyzer);
}

/// Resolved handles for every schema field.
#[derive(Debug, Clone)]
pub struct ViewFields {
	pub id: Field,
	pub title: Field,
	pub content_description: Field,
	pub subjects: Field,
	pub subjects_topical: Field,
	pub subjects_function: Field,
	pub subjects_geographic: Field,
	pub subjects_genre_form: Field,
	pub agents_creators: Field,
	pub agents_subjects: Field,
	pub agents_sources: Field,
	pub extents: Field,
	pub identifier: Field,
	pub accession_date: Field,
	pub date_expression: Field,
	pub digital_object_titles: Field,
	pub digital_object_file_uris: Field,
	pub created: Field,
	pub subject_facets: Field,
}

impl ViewFields {
	pub fn resolve(schema: &Schema) -> tantivy::Result<Self> {
		Ok(Self {
			id: schema.get_field(ID)?,
			title: schema.get_field(TITLE)?,
			content_description: schema.get_field(CONTENT_DESCRIPTION)?,
			subjects: schema.get_field(SUBJECTS)?,
			subjects_topical: schema.get_field(SUBJECTS_TOPICAL)?,
			subjects_function: schema.get_field(SUBJECTS_FUNCTION)?,
			subjects_geographic: schema.get_field(SUBJECTS_GEOGRAPHIC)?,
			subjects_genre_form: schema.get_field(SUBJECTS_GENRE_FORM)?,
			agents_creators: schema.get_field(AGENTS_CREATORS)?,
			agents_subjects: schema.get_field(AGENTS_SUBJECTS)?,
			agents_sources: schema.get_field(AGENTS_SOURCES)?,
			extents: schema.get_field(EXTENTS)?,
			identifier: schema.get_field(IDENTIFIER)?,
			accession_date: schema.get_field(ACCESSION_DATE)?,
			date_expression: schema.get_field(DATE_EXPRESSION)?,
			digital_object_titles: schema.get_field(DIGITAL_OBJECT_TITLES)?,
			digital_object_file_uris: schema.get_field(DIGITAL_OBJECT_FILE_URIS)?,
			created: schema.get_field(CREATED)?,
			subject_facets: schema.get_field(SUBJECT_FACETS)?,
		})
	}

	/// Analyzed fields, searched by free-text, required, exact and excluded terms.
	pub fn searchable(&self) -> Vec<Field> {
		vec![
			self.title, self.content_description, self.subjects, self.subjects_topical, self.subjects_function,
			self.subjects_geographic, self.subjects_genre_form, self.agents_creators, self.agents_subjects,
			self.agents_sources, self.extents,
		]
	}

	pub fn id_term(&self, uri: &str) -> Term { Term::from_field_text(self.id, uri) }

	fn buckets<'v>(&self, view: &'v SearchView) -> [(&'static str, Field, &'v [String]); 5] {
		[
			(SUBJECTS, self.subjects, view.subjects.as_slice()),
			(SUBJECTS_TOPICAL, self.subjects_topical, view.subjects_topical.as_slice()),
			(SUBJECTS_FUNCTION, self.subjects_function, view.subjects_function.as_slice()),
			(SUBJECTS_GEOGRAPHIC, self.subjects_geographic, view.subjects_geographic.as_slice()),
			(SUBJECTS_GENRE_FORM, self.subjects_genre_form, view.subjects_genre_form.as_slice()),
		]
	}

	pub fn to_document(&self, view: &SearchView) -> TantivyDocument {
		let mut doc = TantivyDocument::default();
		doc.add_text(self.id, &view.uri);
		doc.add_text(self.title, &view.title);
		doc.add_text(self.content_description, &view.content_description);
		for (name, field, values) in self.buckets(view) {
			for value in values {
				doc.add_text(field, value);
				doc.add_facet(self.subject_facets, Facet::from_path([name, value.as_str()]));
			}
		}
		let lists: [(Field, &[String]); 7] = [
			(self.agents_creators, view.linked_agents_creators.as_slice()),
			(self.agents_subjects, view.linked_agents_subjects.as_slice()),
			(self.agents_sources, view.linked_agents_sources.as_slice()),
			(self.extents, view.extents.as_slice()),
			(self.date_expression, view.date_expression.as_slice()),
			(self.digital_object_titles, view.digital_objects.title.as_slice()),
			(self.digital_object_file_uris, view.digital_objects.file_uris.as_slice()),
		];
		for (field, values) in lists { for value in values { doc.add_text(field, value); } }
		doc.add_text(self.identifier, &view.identifier);
		doc.add_text(self.accession_date, &view.accession_date);
		if let Some(created) = view.created { doc.add_date(self.created, tantivy::DateTime::from_timestamp_secs(created.timestamp())); }
		doc
	}

	pub fn to_view(&self, doc: &TantivyDocument) -> SearchView {
		let first = |field: Field| doc.get_first(field).and_then(|v| v.as_str().map(str::to_string)).unwrap_or_default();
		let all = |field: Field| doc.get_all(field).filter_map(|v| v.as_str().map(str::to_string)).collect::<Vec<String>>();
		let created = doc
			.get_first(self.created)
			.and_then(|v| v.as_datetime())
			.and_then(|d| DateTime::<Utc>::from_timestamp(d.into_timestamp_secs(), 0));
		SearchView {
			uri: first(self.id),
			title: first(self.title),
			identifier: first(self.identifier),
			content_description: first(self.content_description),
			subjects: all(self.subjects),
			subjects_topical: all(self.subjects_topical),
			subjects_function: all(self.subjects_function),
			subjects_geographic: all(self.subjects_geographic),
			subjects_genre_form: all(self.subjects_genre_form),
			linked_agents_creators: all(self.agents_creators),
			linked_agents_subjects: all(self.agents_subjects),
			linked_agents_sources: all(self.agents_sources),
			extents: all(self.extents),
			digital_objects: DigitalObjectLinks { title: all(self.digital_object_titles), file_uris: all(self.digital_object_file_uris) },
			accession_date: first(self.accession_date),
			date_expression: all(self.date_expression),
			created,
		}
	}
}
