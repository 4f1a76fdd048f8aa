//! mirror-text
//!
//! Tantivy full-text index over [`SearchView`]s: the fixed schema and English
//! analyzer, an explicit index handle, the batching index builder, and the
//! query translator and paginator.
//!
//! [`SearchView`]: mirror_core::types::SearchView
pub mod builder;
pub mod index;
pub mod page;
pub mod query;
pub mod schema;
pub mod search;

pub use builder::{build_index, BuildReport, IndexBuilder};
pub use index::SearchIndex;
pub use page::{ErrorPayload, FacetCount, FacetResult, Hit, PageLinks, PageWindow, SearchResultPage};
pub use query::{translate, QueryLimits, SearchQuery};
pub use search::QueryEngine;
