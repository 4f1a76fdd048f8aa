use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid record URI {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("Invalid store path {0:?}")]
    InvalidPath(String),

    #[error("Malformed record {key}: {source}")]
    MalformedRecord {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value {value:?} for parameter '{name}': {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Query has no search terms")]
    EmptyQuery,

    #[error("Index error: {0}")]
    Index(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Name of the offending request parameter, when the error came from one.
    pub fn parameter(&self) -> Option<&str> {
        match self {
            Self::InvalidParameter { name, .. } => Some(name),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn label(e: &Error) -> &'static str {
        match e {
            Error::InvalidConfig(_) => "config",
            Error::NotFound(_) => "not-found",
            Error::InvalidUri { .. } => "uri",
            Error::InvalidPath(_) => "path",
            Error::MalformedRecord { .. } => "malformed",
            Error::Io { .. } => "io",
            Error::InvalidParameter { .. } => "parameter",
            Error::EmptyQuery => "empty-query",
            Error::Index(_) => "index",
        }
    }

    #[test]
    fn variants_are_distinct_and_only_parameters_name_one() {
        let malformed = serde_json::from_str::<serde_json::Value>("{").expect_err("bad json");
        let errors = [
            Error::InvalidConfig("batch".into()),
            Error::NotFound("subjects/1".into()),
            Error::InvalidUri { uri: "x".into(), reason: "no slash".into() },
            Error::InvalidPath("..".into()),
            Error::MalformedRecord { key: "subjects/1".into(), source: malformed },
            Error::io("/tmp/x", std::io::Error::other("disk")),
            Error::InvalidParameter { name: "page".into(), value: "two".into(), reason: "not a number".into() },
            Error::EmptyQuery,
            Error::Index("closed".into()),
        ];
        let labels: std::collections::BTreeSet<&str> = errors.iter().map(label).collect();
        assert_eq!(labels.len(), errors.len());
        assert_eq!(errors.iter().filter_map(Error::parameter).collect::<Vec<_>>(), vec!["page"]);
    }
}
