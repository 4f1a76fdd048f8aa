use crate::record::RecordClass;
use crate::types::{SearchView, ViewEntry};

/// The remote archival API as seen by the export walker.
///
/// Implementations own transport, session and paging concerns; `list_ids`
/// returns every id of the class in one call.
pub trait RecordSource: Send + Sync {
    fn list_ids(&self, class: RecordClass, parent_id: Option<u64>) -> anyhow::Result<Vec<u64>>;
    fn get(&self, class: RecordClass, parent_id: Option<u64>, id: u64) -> anyhow::Result<serde_json::Value>;
}

/// Anything the index builder can consume views from.
pub trait ViewSource {
    fn entries(&self) -> anyhow::Result<Box<dyn Iterator<Item = ViewEntry> + '_>>;

    /// Whether `entries` lists every view that should be searchable. Documents
    /// a complete source no longer lists are withdrawn by the builder.
    fn is_complete(&self) -> bool {
        false
    }
}

impl ViewSource for Vec<SearchView> {
    fn entries(&self) -> anyhow::Result<Box<dyn Iterator<Item = ViewEntry> + '_>> {
        Ok(Box::new(self.iter().map(|v| ViewEntry::Publish(Box::new(v.clone())))))
    }
}
