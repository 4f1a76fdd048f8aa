//! Domain types: the subset of exported records the pipeline reads, and the
//! denormalized view that gets indexed.
//!
//! Record structs default every field so partial or older exports still
//! decode; the pipeline treats a missing field the same as an empty one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A by-reference pointer to another record, `{"ref": "/subjects/3"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ref {
    #[serde(rename = "ref")]
    pub uri: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkedAgent {
    #[serde(rename = "ref")]
    pub uri: String,
    pub role: String,
    pub relator: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Extent {
    pub number: String,
    pub extent_type: String,
    pub portion: String,
    pub container_summary: Option<String>,
    pub physical_details: Option<String>,
    pub dimensions: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRange {
    pub expression: Option<String>,
    pub begin: Option<String>,
    pub end: Option<String>,
    pub date_type: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Instance {
    pub instance_type: String,
    pub digital_object: Option<Ref>,
}

/// An accession as exported from the remote API.
///
/// - `publish`/`suppressed`/`restrictions_apply`: publication gate
/// - `subjects`, `linked_agents`, `instances`: references resolved during normalization
/// - `id_0`..`id_3`: the four-part accession identifier
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Accession {
    pub id: Option<u64>,
    pub uri: String,
    pub title: String,
    pub display_string: String,
    pub id_0: Option<String>,
    pub id_1: Option<String>,
    pub id_2: Option<String>,
    pub id_3: Option<String>,
    pub content_description: String,
    pub condition_description: String,
    pub accession_date: String,
    pub publish: bool,
    pub suppressed: bool,
    pub restrictions_apply: bool,
    pub subjects: Vec<Ref>,
    pub linked_agents: Vec<LinkedAgent>,
    pub extents: Vec<Extent>,
    pub dates: Vec<DateRange>,
    pub instances: Vec<Instance>,
    pub create_time: Option<String>,
    pub user_mtime: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentName {
    pub sort_name: String,
    pub primary_name: String,
    pub rest_of_name: Option<String>,
    pub authorized: bool,
    pub is_display_name: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Agent {
    pub uri: String,
    pub title: String,
    pub agent_type: String,
    pub publish: bool,
    pub names: Vec<AgentName>,
    pub display_name: Option<AgentName>,
}

impl Agent {
    /// Best display label: the display name, then the title, then the first name on record.
    pub fn label(&self) -> Option<&str> {
        self.display_name
            .as_ref()
            .map(|n| n.sort_name.as_str())
            .filter(|s| !s.is_empty())
            .or_else(|| Some(self.title.as_str()).filter(|s| !s.is_empty()))
            .or_else(|| self.names.iter().map(|n| n.sort_name.as_str()).find(|s| !s.is_empty()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectTerm {
    pub term: String,
    pub term_type: String,
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Subject {
    pub uri: String,
    pub title: String,
    pub publish: bool,
    pub terms: Vec<SubjectTerm>,
}

impl Subject {
    pub fn label(&self) -> Option<String> {
        if !self.title.is_empty() {
            return Some(self.title.clone());
        }
        let joined = self.terms.iter().map(|t| t.term.as_str()).filter(|t| !t.is_empty()).collect::<Vec<_>>().join(" -- ");
        (!joined.is_empty()).then_some(joined)
    }

    /// Declared type of the subject: the type of its first term.
    pub fn term_type(&self) -> &str {
        self.terms.first().map(|t| t.term_type.as_str()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileVersion {
    pub file_uri: String,
    pub publish: bool,
    pub use_statement: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DigitalObject {
    pub uri: String,
    pub title: String,
    pub digital_object_id: Option<String>,
    pub publish: bool,
    pub file_versions: Vec<FileVersion>,
}

impl DigitalObject {
    pub fn first_published_file(&self) -> Option<&str> {
        self.file_versions.iter().find(|f| f.publish && !f.file_uri.is_empty()).map(|f| f.file_uri.as_str())
    }
}

/// Parallel title/file-URI lists: `title[i]` belongs with `file_uris[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigitalObjectLinks {
    pub title: Vec<String>,
    pub file_uris: Vec<String>,
}

impl DigitalObjectLinks {
    pub fn push(&mut self, title: String, file_uri: String) {
        self.title.push(title);
        self.file_uris.push(file_uri);
    }

    pub fn is_empty(&self) -> bool {
        self.file_uris.is_empty()
    }
}

/// Reference-free projection of a published accession.
///
/// `uri` is the accession's own URI and doubles as the index document key.
/// Subject and agent lists hold resolved labels only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchView {
    pub uri: String,
    pub title: String,
    pub identifier: String,
    pub content_description: String,
    pub subjects: Vec<String>,
    pub subjects_topical: Vec<String>,
    pub subjects_function: Vec<String>,
    pub subjects_geographic: Vec<String>,
    pub subjects_genre_form: Vec<String>,
    pub linked_agents_creators: Vec<String>,
    pub linked_agents_subjects: Vec<String>,
    pub linked_agents_sources: Vec<String>,
    pub extents: Vec<String>,
    pub digital_objects: DigitalObjectLinks,
    pub accession_date: String,
    pub date_expression: Vec<String>,
    pub created: Option<DateTime<Utc>>,
}

/// One item handed to the index builder.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEntry {
    /// Add or replace the document for this view.
    Publish(Box<SearchView>),
    /// Remove any document keyed by this accession URI.
    Withdraw(String),
}
