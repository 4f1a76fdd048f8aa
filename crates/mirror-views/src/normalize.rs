//! Accession → [`SearchView`] normalization.
//!
//! Every reference is either resolved to a label or dropped; a dangling
//! reference never fails the record. Lists keep the order of the accession's
//! own reference arrays, with exact repeats removed.

use chrono::{DateTime, Utc};
use tracing::debug;

use mirror_core::types::{Accession, DateRange, Extent, SearchView};
use mirror_core::RecordUri;

use crate::lookup::{AgentsByUri, DigitalObjectsByUri, LookupMaps, SubjectsByUri};

#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    View(Box<SearchView>),
    Excluded(Exclusion),
}

/// Why an accession is kept out of the views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    Unpublished,
    Suppressed,
    Restricted,
}

impl Normalized {
    pub fn into_view(self) -> Option<SearchView> {
        match self {
            Self::View(view) => Some(*view),
            Self::Excluded(_) => None,
        }
    }
}

impl LookupMaps {
    pub fn normalize(&self, accession: &Accession) -> mirror_core::Result<Normalized> {
        normalize(accession, &self.agents, &self.subjects, &self.digital_objects)
    }
}

pub fn normalize(
    accession: &Accession,
    agents: &AgentsByUri,
    subjects: &SubjectsByUri,
    digital_objects: &DigitalObjectsByUri,
) -> mirror_core::Result<Normalized> {
    if let Some(reason) = exclusion(accession) {
        return Ok(Normalized::Excluded(reason));
    }
    RecordUri::parse(&accession.uri)?;

    let mut view = SearchView {
        uri: accession.uri.clone(),
        title: if accession.title.is_empty() { accession.display_string.clone() } else { accession.title.clone() },
        identifier: identifier(accession),
        content_description: accession.content_description.clone(),
        accession_date: accession.accession_date.clone(),
        created: accession.create_time.as_deref().and_then(parse_timestamp),
        ..SearchView::default()
    };

    for subject_ref in &accession.subjects {
        let Some(subject) = subjects.get(&subject_ref.uri) else {
            debug!(accession = %accession.uri, subject = %subject_ref.uri, "dangling subject reference");
            continue;
        };
        let Some(label) = subject.label() else { continue };
        let bucket = match subject.term_type() {
            "topical" => Some(&mut view.subjects_topical),
            "function" => Some(&mut view.subjects_function),
            "geographic" => Some(&mut view.subjects_geographic),
            "genre_form" => Some(&mut view.subjects_genre_form),
            _ => None,
        };
        if let Some(bucket) = bucket {
            push_unique(bucket, label.clone());
        }
        push_unique(&mut view.subjects, label);
    }

    for linked in &accession.linked_agents {
        let Some(label) = agents.get(&linked.uri).and_then(|a| a.label()) else {
            debug!(accession = %accession.uri, agent = %linked.uri, "dangling agent reference");
            continue;
        };
        let bucket = match linked.role.as_str() {
            "creator" => &mut view.linked_agents_creators,
            "subject" => &mut view.linked_agents_subjects,
            "source" => &mut view.linked_agents_sources,
            _ => continue,
        };
        push_unique(bucket, label.to_string());
    }

    for instance in &accession.instances {
        let Some(reference) = &instance.digital_object else { continue };
        let Some(object) = digital_objects.get(&reference.uri) else {
            debug!(accession = %accession.uri, digital_object = %reference.uri, "dangling digital object reference");
            continue;
        };
        let Some(file_uri) = object.first_published_file() else { continue };
        if view.digital_objects.file_uris.iter().any(|u| u == file_uri) {
            continue;
        }
        let title = [Some(object.title.as_str()), object.digital_object_id.as_deref()]
            .into_iter()
            .flatten()
            .find(|t| !t.is_empty())
            .unwrap_or(file_uri)
            .to_string();
        view.digital_objects.push(title, file_uri.to_string());
    }

    view.extents = accession.extents.iter().filter_map(render_extent).collect();
    for date in &accession.dates {
        if let Some(rendered) = render_date(date) {
            push_unique(&mut view.date_expression, rendered);
        }
    }

    Ok(Normalized::View(Box::new(view)))
}

fn exclusion(accession: &Accession) -> Option<Exclusion> {
    if accession.suppressed {
        Some(Exclusion::Suppressed)
    } else if accession.restrictions_apply {
        Some(Exclusion::Restricted)
    } else if !accession.publish {
        Some(Exclusion::Unpublished)
    } else {
        None
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

fn identifier(accession: &Accession) -> String {
    [&accession.id_0, &accession.id_1, &accession.id_2, &accession.id_3]
        .into_iter()
        .filter_map(|part| part.as_deref().map(str::trim))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|t| t.with_timezone(&Utc))
}

/// "2.5 linear feet (part), 3 boxes".
fn render_extent(extent: &Extent) -> Option<String> {
    let number = extent.number.trim();
    let kind = extent.extent_type.replace('_', " ");
    let kind = kind.trim();
    if number.is_empty() && kind.is_empty() {
        return None;
    }
    let mut out = [number, kind].iter().filter(|s| !s.is_empty()).copied().collect::<Vec<_>>().join(" ");
    let portion = extent.portion.trim();
    if !portion.is_empty() && portion != "whole" {
        out.push_str(&format!(" ({portion})"));
    }
    if let Some(summary) = extent.container_summary.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        out.push_str(", ");
        out.push_str(summary);
    }
    Some(out)
}

fn render_date(date: &DateRange) -> Option<String> {
    let non_empty = |s: &Option<String>| s.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    non_empty(&date.expression).or_else(|| match (non_empty(&date.begin), non_empty(&date.end)) {
        (Some(begin), Some(end)) if begin != end => Some(format!("{begin} - {end}")),
        (Some(begin), _) => Some(begin),
        (None, end) => end,
    })
}
