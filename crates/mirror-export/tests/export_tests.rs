use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::anyhow;
use serde_json::{json, Value};
use tempfile::TempDir;
use walkdir::WalkDir;

use mirror_core::config::PipelineSettings;
use mirror_core::traits::RecordSource;
use mirror_core::{AgentType, RecordClass, RecordStore};
use mirror_export::ExportWalker;

/// In-memory stand-in for the remote API. Records are keyed by
/// (class, parent id, id); bodies deliberately omit `id`.
#[derive(Default)]
struct FakeSource {
    records: BTreeMap<(RecordClass, Option<u64>, u64), Value>,
    broken_gets: HashSet<u64>,
    broken_listings: HashSet<RecordClass>,
}

impl FakeSource {
    fn add(&mut self, class: RecordClass, parent: Option<u64>, id: u64, uri: String, title: &str) {
        self.records.insert((class, parent, id), json!({ "uri": uri, "title": title, "publish": true }));
    }

    fn with_repository(mut self, repo: u64, accessions: u64) -> Self {
        self.add(RecordClass::Repository, None, repo, format!("/repositories/{repo}"), "Archives");
        for id in 1..=accessions {
            self.add(RecordClass::Accession, Some(repo), id, format!("/repositories/{repo}/accessions/{id}"), &format!("Accession {id}"));
        }
        self
    }
}

impl RecordSource for FakeSource {
    fn list_ids(&self, class: RecordClass, parent_id: Option<u64>) -> anyhow::Result<Vec<u64>> {
        if self.broken_listings.contains(&class) {
            return Err(anyhow!("listing {class} timed out"));
        }
        Ok(self.records.keys().filter(|(c, p, _)| *c == class && *p == parent_id).map(|(_, _, id)| *id).collect())
    }

    fn get(&self, class: RecordClass, parent_id: Option<u64>, id: u64) -> anyhow::Result<Value> {
        if self.broken_gets.contains(&id) {
            return Err(anyhow!("connection reset fetching {id}"));
        }
        self.records.get(&(class, parent_id, id)).cloned().ok_or_else(|| anyhow!("{class} {id} not found"))
    }
}

fn json_files(dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().strip_prefix(dir).expect("under root").display().to_string())
        .filter(|p| p.ends_with(".json"))
        .collect();
    files.sort();
    files
}

#[test]
fn exports_ten_accessions_into_repository_directory() {
    let tmp = TempDir::new().expect("tempdir");
    let store = RecordStore::open(tmp.path()).expect("store");
    let source = FakeSource::default().with_repository(2, 10);

    let report = ExportWalker::new(&source, &store).export(RecordClass::Accession, &[]).expect("export");

    assert_eq!(report.exported, 10);
    assert!(report.failed.is_empty());
    assert_eq!(store.keys("repositories/2/accessions").expect("keys"), (1..=10).collect::<Vec<_>>());
    let on_disk = fs::read_dir(tmp.path().join("repositories/2/accessions")).expect("dir").count();
    assert_eq!(on_disk, 10);
}

#[test]
fn exported_records_carry_id_from_uri() {
    let tmp = TempDir::new().expect("tempdir");
    let store = RecordStore::open(tmp.path()).expect("store");
    let source = FakeSource::default().with_repository(2, 3);

    ExportWalker::new(&source, &store).export(RecordClass::Accession, &[2]).expect("export");

    let record: Value = store.read_record("repositories/2/accessions", 3).expect("read");
    assert_eq!(record["id"], json!(3));
    assert_eq!(record["uri"], json!("/repositories/2/accessions/3"));
}

#[test]
fn exporting_twice_is_byte_identical() {
    let tmp = TempDir::new().expect("tempdir");
    let store = RecordStore::open(tmp.path()).expect("store");
    let mut source = FakeSource::default().with_repository(2, 4).with_repository(5, 2);
    source.add(RecordClass::Subject, None, 3, "/subjects/3".into(), "Space flight");
    source.add(RecordClass::Agent(AgentType::People), None, 8, "/agents/people/8".into(), "Armstrong, Neil");

    let walker = ExportWalker::new(&source, &store);
    assert!(walker.export_all().is_clean());
    let snapshot: Vec<(String, Vec<u8>)> =
        json_files(tmp.path()).into_iter().map(|p| { let bytes = fs::read(tmp.path().join(&p)).expect("read"); (p, bytes) }).collect();

    assert!(walker.export_all().is_clean());
    let again: Vec<(String, Vec<u8>)> =
        json_files(tmp.path()).into_iter().map(|p| { let bytes = fs::read(tmp.path().join(&p)).expect("read"); (p, bytes) }).collect();

    assert_eq!(snapshot, again);
    assert!(snapshot.iter().any(|(p, _)| p == "agents/people/8.json"));
    assert!(snapshot.iter().any(|(p, _)| p == "repositories/5/accessions/2.json"));
}

#[test]
fn failed_fetch_is_logged_and_walk_continues() {
    let tmp = TempDir::new().expect("tempdir");
    let store = RecordStore::open(tmp.path()).expect("store");
    let mut source = FakeSource::default().with_repository(2, 5);
    source.broken_gets.insert(3);

    let report = ExportWalker::new(&source, &store).export(RecordClass::Accession, &[]).expect("export");

    assert_eq!(report.exported, 4);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].id, Some(3));
    assert_eq!(report.failed[0].parent_id, Some(2));
    assert_eq!(store.keys("repositories/2/accessions").expect("keys"), vec![1, 2, 4, 5]);
}

#[test]
fn record_without_uri_is_reported_not_written() {
    let tmp = TempDir::new().expect("tempdir");
    let store = RecordStore::open(tmp.path()).expect("store");
    let mut source = FakeSource::default();
    source.add(RecordClass::Location, None, 1, "/locations/1".into(), "Vault A");
    source.records.insert((RecordClass::Location, None, 2), json!({"title": "Vault B"}));

    let report = ExportWalker::new(&source, &store).export(RecordClass::Location, &[]).expect("export");

    assert_eq!(report.exported, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(store.keys("locations").expect("keys"), vec![1]);
}

#[test]
fn listing_failure_ends_only_that_class() {
    let tmp = TempDir::new().expect("tempdir");
    let store = RecordStore::open(tmp.path()).expect("store");
    let mut source = FakeSource::default().with_repository(2, 2);
    source.add(RecordClass::Subject, None, 1, "/subjects/1".into(), "Rockets");
    source.broken_listings.insert(RecordClass::Subject);

    let walker = ExportWalker::new(&source, &store);
    assert!(walker.export(RecordClass::Subject, &[]).is_err());

    let summary = walker.export_all();
    assert_eq!(summary.failed_classes(), vec![RecordClass::Subject]);
    assert_eq!(store.keys("repositories/2/accessions").expect("keys"), vec![1, 2]);
    assert!(store.keys("subjects").expect("keys").is_empty());
}

#[test]
fn parallel_parents_export_same_records_as_serial() {
    let serial_dir = TempDir::new().expect("tempdir");
    let parallel_dir = TempDir::new().expect("tempdir");
    let source = (1..=6).fold(FakeSource::default(), |s, repo| s.with_repository(repo, 7));

    let serial_store = RecordStore::open(serial_dir.path()).expect("store");
    let serial = ExportWalker::new(&source, &serial_store).export(RecordClass::Accession, &[]).expect("serial");

    let parallel_store = RecordStore::open(parallel_dir.path()).expect("store");
    let settings = PipelineSettings { export_workers: 3, progress_every: 5, ..PipelineSettings::default() };
    let parallel = ExportWalker::from_settings(&source, &parallel_store, &settings)
        .export(RecordClass::Accession, &[])
        .expect("parallel");

    assert_eq!(serial.exported, 42);
    assert_eq!(parallel.exported, 42);
    assert_eq!(json_files(serial_dir.path()), json_files(parallel_dir.path()));
}

#[test]
fn top_level_class_rejects_parent_ids() {
    let tmp = TempDir::new().expect("tempdir");
    let store = RecordStore::open(tmp.path()).expect("store");
    let source = FakeSource::default();
    assert!(ExportWalker::new(&source, &store).export(RecordClass::Subject, &[1]).is_err());
}
