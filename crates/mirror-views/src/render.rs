//! Drive normalization over every stored accession.

use tracing::{info, warn};

use mirror_core::traits::ViewSource;
use mirror_core::types::{Accession, ViewEntry};
use mirror_core::view_tree::ViewTree;
use mirror_core::{RecordClass, RecordStore, RecordUri};

use crate::lookup::LookupMaps;
use crate::normalize::Normalized;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenderReport {
    pub rendered: usize,
    pub excluded: usize,
    /// Excluded accessions whose stale rendered file was removed.
    pub withdrawn: usize,
    pub failed: usize,
}

/// (repository id, accession id) for every stored accession.
fn accession_keys(store: &RecordStore) -> anyhow::Result<Vec<(u64, u64)>> {
    let mut keys = Vec::new();
    for repo in store.keys(&RecordClass::Repository.collection_path(None)?)? {
        for id in store.keys(&RecordClass::Accession.collection_path(Some(repo))?)? {
            keys.push((repo, id));
        }
    }
    Ok(keys)
}

fn load_accession(store: &RecordStore, repo: u64, id: u64) -> Option<Accession> {
    let path = format!("repositories/{repo}/accessions");
    match store.read_record::<Accession>(&path, id) {
        Ok(mut accession) => {
            if accession.uri.is_empty() {
                accession.uri = format!("/{path}/{id}");
            }
            Some(accession)
        }
        Err(e) => {
            warn!(repo, id, error = %e, "skipping unreadable accession");
            None
        }
    }
}

/// Normalize every stored accession into `tree`. Excluded accessions have any
/// earlier rendering removed so the tree only ever holds publishable views.
pub fn render_view_tree(store: &RecordStore, maps: &LookupMaps, tree: &ViewTree) -> anyhow::Result<RenderReport> {
    let mut report = RenderReport::default();
    for (repo, id) in accession_keys(store)? {
        let Some(accession) = load_accession(store, repo, id) else {
            report.failed += 1;
            continue;
        };
        match maps.normalize(&accession) {
            Ok(Normalized::View(view)) => match tree.write(&view) {
                Ok(_) => report.rendered += 1,
                Err(e) => {
                    warn!(uri = %accession.uri, error = %e, "writing view failed");
                    report.failed += 1;
                }
            },
            Ok(Normalized::Excluded(reason)) => {
                report.excluded += 1;
                let Ok(uri) = RecordUri::parse(&accession.uri) else { continue };
                match tree.remove(&uri) {
                    Ok(true) => {
                        info!(uri = %uri, ?reason, "withdrew previously rendered view");
                        report.withdrawn += 1;
                    }
                    Ok(false) => {}
                    Err(e) => warn!(uri = %uri, error = %e, "removing stale view failed"),
                }
            }
            Err(e) => {
                warn!(uri = %accession.uri, error = %e, "normalization failed");
                report.failed += 1;
            }
        }
    }
    info!(
        rendered = report.rendered,
        excluded = report.excluded,
        withdrawn = report.withdrawn,
        failed = report.failed,
        "view tree rendered"
    );
    Ok(report)
}

/// Views normalized straight from the store, without a rendered tree.
/// Excluded accessions come out as withdrawals.
pub struct StoreViews<'a> {
    store: &'a RecordStore,
    maps: &'a LookupMaps,
}

impl<'a> StoreViews<'a> {
    pub fn new(store: &'a RecordStore, maps: &'a LookupMaps) -> Self {
        Self { store, maps }
    }
}

impl ViewSource for StoreViews<'_> {
    fn entries(&self) -> anyhow::Result<Box<dyn Iterator<Item = ViewEntry> + '_>> {
        let keys = accession_keys(self.store)?;
        Ok(Box::new(keys.into_iter().filter_map(move |(repo, id)| {
            let accession = load_accession(self.store, repo, id)?;
            match self.maps.normalize(&accession) {
                Ok(Normalized::View(view)) => Some(ViewEntry::Publish(view)),
                Ok(Normalized::Excluded(_)) => Some(ViewEntry::Withdraw(accession.uri)),
                Err(e) => {
                    warn!(uri = %accession.uri, error = %e, "normalization failed");
                    None
                }
            }
        })))
    }

    fn is_complete(&self) -> bool {
        true
    }
}
