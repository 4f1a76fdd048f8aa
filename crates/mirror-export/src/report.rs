use serde::Serialize;

use mirror_core::RecordClass;

/// A record (or a whole parent's child listing when `id` is `None`) that
/// could not be exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRecord {
    pub parent_id: Option<u64>,
    pub id: Option<u64>,
    pub error: String,
}

/// Outcome of exporting one record class.
#[derive(Debug, Clone, Serialize)]
pub struct ClassReport {
    pub class: RecordClass,
    pub exported: usize,
    pub failed: Vec<FailedRecord>,
}

impl ClassReport {
    pub fn new(class: RecordClass) -> Self {
        Self { class, exported: 0, failed: Vec::new() }
    }

    pub(crate) fn merge(&mut self, other: ClassReport) {
        self.exported += other.exported;
        self.failed.extend(other.failed);
    }
}

/// Per-class results of a full export. A class whose id listing failed
/// carries the error text instead of a report.
#[derive(Debug, Default, Serialize)]
pub struct ExportSummary {
    pub classes: Vec<(RecordClass, Result<ClassReport, String>)>,
}

impl ExportSummary {
    pub fn exported(&self) -> usize {
        self.classes.iter().filter_map(|(_, r)| r.as_ref().ok()).map(|r| r.exported).sum()
    }

    pub fn failed_records(&self) -> usize {
        self.classes.iter().filter_map(|(_, r)| r.as_ref().ok()).map(|r| r.failed.len()).sum()
    }

    pub fn failed_classes(&self) -> Vec<RecordClass> {
        self.classes.iter().filter(|(_, r)| r.is_err()).map(|(c, _)| *c).collect()
    }

    pub fn is_clean(&self) -> bool {
        self.failed_records() == 0 && self.failed_classes().is_empty()
    }
}
