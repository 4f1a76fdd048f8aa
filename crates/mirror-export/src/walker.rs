//! Export walker: list ids, fetch, stamp the id from the URI, write.
//!
//! A failure on one record is logged and recorded in the class report; the
//! walk carries on. Failing to list a class's ids ends that class only.

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{bail, Context};
use serde_json::Value;
use tracing::{info, warn};

use mirror_core::config::PipelineSettings;
use mirror_core::traits::RecordSource;
use mirror_core::{RecordClass, RecordStore, RecordUri};

use crate::report::{ClassReport, ExportSummary, FailedRecord};

pub struct ExportWalker<'a> {
    source: &'a dyn RecordSource,
    store: &'a RecordStore,
    progress_every: usize,
    workers: usize,
}

struct Progress {
    class: RecordClass,
    every: usize,
    done: AtomicUsize,
}

impl Progress {
    fn tick(&self) {
        let n = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if self.every > 0 && n % self.every == 0 {
            info!(class = %self.class, processed = n, "export progress");
        }
    }
}

impl<'a> ExportWalker<'a> {
    pub fn new(source: &'a dyn RecordSource, store: &'a RecordStore) -> Self {
        Self { source, store, progress_every: 100, workers: 1 }
    }

    pub fn from_settings(source: &'a dyn RecordSource, store: &'a RecordStore, settings: &PipelineSettings) -> Self {
        Self::new(source, store).with_progress_every(settings.progress_every).with_workers(settings.export_workers)
    }

    pub fn with_progress_every(mut self, n: usize) -> Self {
        self.progress_every = n;
        self
    }

    /// Export up to `n` parents (repositories, vocabularies) at once.
    pub fn with_workers(mut self, n: usize) -> Self {
        self.workers = n.max(1);
        self
    }

    /// Export every record of `class`.
    ///
    /// Nested classes walk `parent_ids`, or every parent the source lists when
    /// none are given. Top-level classes take no parent ids.
    pub fn export(&self, class: RecordClass, parent_ids: &[u64]) -> anyhow::Result<ClassReport> {
        let progress = Progress { class, every: self.progress_every, done: AtomicUsize::new(0) };

        let report = match class.parent() {
            None => {
                if !parent_ids.is_empty() {
                    bail!("{class} is not nested under a parent");
                }
                let ids = self.source.list_ids(class, None).with_context(|| format!("listing {class} ids"))?;
                self.export_ids(class, None, &ids, &progress)
            }
            Some(parent) => {
                let parents = if parent_ids.is_empty() {
                    self.source.list_ids(parent, None).with_context(|| format!("listing {parent} ids for {class}"))?
                } else {
                    parent_ids.to_vec()
                };
                self.export_parents(class, &parents, &progress)
            }
        };

        info!(class = %class, exported = report.exported, failed = report.failed.len(), "class exported");
        Ok(report)
    }

    /// Export every class in dependency order. Never stops early.
    pub fn export_all(&self) -> ExportSummary {
        let mut summary = ExportSummary::default();
        for class in RecordClass::all() {
            let outcome = self.export(class, &[]).map_err(|e| {
                warn!(class = %class, error = %format!("{e:#}"), "class export failed");
                format!("{e:#}")
            });
            summary.classes.push((class, outcome));
        }
        info!(
            exported = summary.exported(),
            failed_records = summary.failed_records(),
            failed_classes = summary.failed_classes().len(),
            "export finished"
        );
        summary
    }

    fn export_parents(&self, class: RecordClass, parents: &[u64], progress: &Progress) -> ClassReport {
        let mut report = ClassReport::new(class);
        if self.workers <= 1 || parents.len() <= 1 {
            for &pid in parents {
                report.merge(self.export_parent(class, pid, progress));
            }
            return report;
        }

        let next = AtomicUsize::new(0);
        let mut partials: Vec<(u64, ClassReport)> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..self.workers.min(parents.len()))
                .map(|_| {
                    scope.spawn(|| {
                        let mut done = Vec::new();
                        loop {
                            let i = next.fetch_add(1, Ordering::Relaxed);
                            let Some(&pid) = parents.get(i) else { break };
                            done.push((pid, self.export_parent(class, pid, progress)));
                        }
                        done
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| match h.join() {
                    Ok(done) => done,
                    Err(_) => {
                        warn!(class = %class, "export worker panicked");
                        Vec::new()
                    }
                })
                .collect()
        });

        partials.sort_by_key(|(pid, _)| *pid);
        for (_, partial) in partials {
            report.merge(partial);
        }
        report
    }

    fn export_parent(&self, class: RecordClass, parent_id: u64, progress: &Progress) -> ClassReport {
        match self.source.list_ids(class, Some(parent_id)) {
            Ok(ids) => self.export_ids(class, Some(parent_id), &ids, progress),
            Err(e) => {
                warn!(class = %class, parent_id, error = %e, "listing child ids failed");
                let mut report = ClassReport::new(class);
                report.failed.push(FailedRecord { parent_id: Some(parent_id), id: None, error: format!("{e:#}") });
                report
            }
        }
    }

    fn export_ids(&self, class: RecordClass, parent_id: Option<u64>, ids: &[u64], progress: &Progress) -> ClassReport {
        let mut report = ClassReport::new(class);
        for &id in ids {
            match self.export_one(class, parent_id, id) {
                Ok(()) => report.exported += 1,
                Err(e) => {
                    warn!(class = %class, parent_id, id, error = %format!("{e:#}"), "record export failed");
                    report.failed.push(FailedRecord { parent_id, id: Some(id), error: format!("{e:#}") });
                }
            }
            progress.tick();
        }
        report
    }

    fn export_one(&self, class: RecordClass, parent_id: Option<u64>, id: u64) -> anyhow::Result<()> {
        let mut record = self.source.get(class, parent_id, id).with_context(|| format!("fetching {class} {id}"))?;
        let record_id = stamp_id(&mut record)?;
        if record_id != id {
            warn!(class = %class, requested = id, actual = record_id, "record URI names a different id");
        }
        let path = class.collection_path(parent_id)?;
        let bytes = serde_json::to_vec_pretty(&record)?;
        self.store.write(&path, record_id, &bytes).with_context(|| format!("writing {path}/{record_id}"))?;
        Ok(())
    }
}

/// Set the record's `id` from the last segment of its `uri` and return it.
pub fn stamp_id(record: &mut Value) -> anyhow::Result<u64> {
    let Some(obj) = record.as_object_mut() else { bail!("record is not a JSON object") };
    let uri = obj.get("uri").and_then(Value::as_str).context("record has no uri")?;
    let id = RecordUri::parse(uri)?.id();
    obj.insert("id".to_string(), Value::from(id));
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stamp_id_overwrites_missing_or_stale_ids() {
        let mut record = json!({"uri": "/repositories/2/accessions/41", "title": "x"});
        assert_eq!(stamp_id(&mut record).expect("stamp"), 41);
        assert_eq!(record["id"], json!(41));

        let mut stale = json!({"uri": "/subjects/3", "id": 0});
        assert_eq!(stamp_id(&mut stale).expect("stamp"), 3);
        assert_eq!(stale["id"], json!(3));
    }

    #[test]
    fn stamp_id_rejects_records_without_usable_uri() {
        assert!(stamp_id(&mut json!({"title": "no uri"})).is_err());
        assert!(stamp_id(&mut json!({"uri": "/subjects/abc"})).is_err());
        assert!(stamp_id(&mut json!(["not", "an", "object"])).is_err());
    }
}
