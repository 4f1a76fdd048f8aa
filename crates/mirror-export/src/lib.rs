//! mirror-export
//!
//! Walks the remote record collaborator class by class and mirrors every
//! record into a [`mirror_core::RecordStore`]. See [`walker`].
pub mod report;
pub mod walker;

pub use report::{ClassReport, ExportSummary, FailedRecord};
pub use walker::{stamp_id, ExportWalker};
