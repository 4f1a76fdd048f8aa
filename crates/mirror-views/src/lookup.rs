//! URI-keyed lookup tables scanned from the record store.
//!
//! Build once per run, before any normalization; the maps are read-only
//! afterwards and reflect the store as of the scan.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use mirror_core::types::{Agent, DigitalObject, Subject};
use mirror_core::{AgentType, RecordClass, RecordStore};

pub type AgentsByUri = HashMap<String, Agent>;
pub type SubjectsByUri = HashMap<String, Subject>;
pub type DigitalObjectsByUri = HashMap<String, DigitalObject>;

#[derive(Debug, Default, Clone)]
pub struct LookupMaps {
    pub agents: AgentsByUri,
    pub subjects: SubjectsByUri,
    pub digital_objects: DigitalObjectsByUri,
}

trait HasUri {
    fn uri_mut(&mut self) -> &mut String;
}

impl HasUri for Agent {
    fn uri_mut(&mut self) -> &mut String {
        &mut self.uri
    }
}

impl HasUri for Subject {
    fn uri_mut(&mut self) -> &mut String {
        &mut self.uri
    }
}

impl HasUri for DigitalObject {
    fn uri_mut(&mut self) -> &mut String {
        &mut self.uri
    }
}

impl LookupMaps {
    pub fn build(store: &RecordStore) -> anyhow::Result<Self> {
        let mut maps = Self::default();

        for kind in AgentType::ALL {
            let path = RecordClass::Agent(kind).collection_path(None)?;
            scan_into(store, &path, &mut maps.agents)?;
        }
        scan_into(store, &RecordClass::Subject.collection_path(None)?, &mut maps.subjects)?;
        for repo in store.keys(&RecordClass::Repository.collection_path(None)?)? {
            let path = RecordClass::DigitalObject.collection_path(Some(repo))?;
            scan_into(store, &path, &mut maps.digital_objects)?;
        }

        info!(
            agents = maps.agents.len(),
            subjects = maps.subjects.len(),
            digital_objects = maps.digital_objects.len(),
            "lookup maps built"
        );
        Ok(maps)
    }
}

/// Load every record under `path` into `map`, keyed by URI. Records that fail
/// to decode are skipped. A record without a URI is keyed by its store location.
fn scan_into<T: DeserializeOwned + HasUri>(store: &RecordStore, path: &str, map: &mut HashMap<String, T>) -> anyhow::Result<()> {
    for id in store.keys(path)? {
        let mut record: T = match store.read_record(path, id) {
            Ok(record) => record,
            Err(e) => {
                warn!(path, id, error = %e, "skipping record in lookup scan");
                continue;
            }
        };
        let uri = record.uri_mut();
        if uri.is_empty() {
            *uri = format!("/{path}/{id}");
        }
        let key = uri.clone();
        map.insert(key, record);
    }
    Ok(())
}
