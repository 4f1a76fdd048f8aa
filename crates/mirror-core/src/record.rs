//! Record classes and where each one lives in the store.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    People,
    CorporateEntities,
    Families,
    Software,
}

impl AgentType {
    pub const ALL: [AgentType; 4] = [Self::People, Self::CorporateEntities, Self::Families, Self::Software];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::People => "people",
            Self::CorporateEntities => "corporate_entities",
            Self::Families => "families",
            Self::Software => "software",
        }
    }
}

/// The archival entity types the pipeline exports.
///
/// Accessions and digital objects live under a repository and terms under a
/// vocabulary; every other class is top level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordClass {
    Repository,
    Agent(AgentType),
    Accession,
    Subject,
    Vocabulary,
    Term,
    Location,
    DigitalObject,
}

impl RecordClass {
    /// Every class in export order: parents before the classes nested under them.
    pub fn all() -> Vec<RecordClass> {
        let mut classes = vec![Self::Repository];
        classes.extend(AgentType::ALL.into_iter().map(Self::Agent));
        classes.extend([Self::Subject, Self::Vocabulary, Self::Term, Self::Location, Self::Accession, Self::DigitalObject]);
        classes
    }

    pub fn parent(self) -> Option<RecordClass> {
        match self {
            Self::Accession | Self::DigitalObject => Some(Self::Repository),
            Self::Term => Some(Self::Vocabulary),
            _ => None,
        }
    }

    fn segment(self) -> &'static str {
        match self {
            Self::Repository => "repositories",
            Self::Agent(_) => "agents",
            Self::Accession => "accessions",
            Self::Subject => "subjects",
            Self::Vocabulary => "vocabularies",
            Self::Term => "terms",
            Self::Location => "locations",
            Self::DigitalObject => "digital_objects",
        }
    }

    /// Store directory for records of this class, e.g. `repositories/2/accessions`.
    ///
    /// Nested classes need their parent id; top-level classes must not get one.
    pub fn collection_path(self, parent_id: Option<u64>) -> Result<String> {
        match (self.parent(), parent_id) {
            (Some(parent), Some(pid)) => Ok(format!("{}/{}/{}", parent.segment(), pid, self.segment())),
            (Some(_), None) => Err(Error::InvalidPath(format!("{self} requires a parent id"))),
            (None, Some(pid)) => Err(Error::InvalidPath(format!("{self} has no parent, got parent id {pid}"))),
            (None, None) => Ok(match self {
                Self::Agent(kind) => format!("agents/{}", kind.as_str()),
                _ => self.segment().to_string(),
            }),
        }
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Agent(kind) => write!(f, "agents/{}", kind.as_str()),
            other => f.write_str(other.segment()),
        }
    }
}
