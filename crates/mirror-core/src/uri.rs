//! Typed parser for archival record URIs.
//!
//! Record URIs look like `/repositories/2/accessions/41`, `/agents/people/7`
//! or `/subjects/3`. The numeric id is always the last segment. Anything that
//! does not fit that shape is rejected with [`Error::InvalidUri`]; there is no
//! fallback id.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// One component of a parsed URI: a collection name optionally followed by a
/// numeric id (`repositories/2`), or a bare name (`agents`, `people`).
#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    name: String,
    id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordUri {
    raw: String,
    segments: Vec<Segment>,
}

impl RecordUri {
    pub fn parse(uri: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidUri { uri: uri.to_string(), reason: reason.to_string() };

        let rest = uri.strip_prefix('/').ok_or_else(|| invalid("must start with '/'"))?;
        let parts: Vec<&str> = rest.split('/').collect();
        if parts.len() < 2 {
            return Err(invalid("expected at least a collection and an id"));
        }

        let mut segments: Vec<Segment> = Vec::new();
        for part in parts {
            if part.is_empty() {
                return Err(invalid("empty path segment"));
            }
            if part.bytes().all(|b| b.is_ascii_digit()) {
                let id: u64 = part.parse().map_err(|_| invalid("id out of range"))?;
                match segments.last_mut() {
                    Some(seg) if seg.id.is_none() => seg.id = Some(id),
                    Some(_) => return Err(invalid("two consecutive numeric segments")),
                    None => return Err(invalid("must start with a collection name")),
                }
            } else {
                segments.push(Segment { name: part.to_string(), id: None });
            }
        }

        if segments.last().and_then(|s| s.id).is_none() {
            return Err(invalid("last segment is not a numeric id"));
        }

        Ok(Self { raw: uri.to_string(), segments })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Numeric id taken from the last segment.
    pub fn id(&self) -> u64 {
        // parse() guarantees the final segment carries an id
        self.segments.last().and_then(|s| s.id).unwrap_or_default()
    }

    /// Id attached to an ancestor collection, e.g. `parent_id("repositories")`
    /// on `/repositories/2/accessions/41` gives `Some(2)`.
    pub fn parent_id(&self, collection: &str) -> Option<u64> {
        let (_, ancestors) = self.segments.split_last()?;
        ancestors.iter().find(|s| s.name == collection).and_then(|s| s.id)
    }

    /// Store directory for the record, i.e. the URI without its leading slash
    /// and trailing id: `repositories/2/accessions`.
    pub fn collection_path(&self) -> String {
        let mut parts = Vec::with_capacity(self.segments.len() * 2);
        let last = self.segments.len() - 1;
        for (i, seg) in self.segments.iter().enumerate() {
            parts.push(seg.name.clone());
            if i != last {
                if let Some(id) = seg.id {
                    parts.push(id.to_string());
                }
            }
        }
        parts.join("/")
    }

    /// Name of the collection the record belongs to (`accessions`, `people`).
    pub fn collection(&self) -> &str {
        self.segments.last().map(|s| s.name.as_str()).unwrap_or_default()
    }
}

impl FromStr for RecordUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for RecordUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
