//! mirror-views
//!
//! Turns exported accessions into reference-free [`SearchView`]s: build the
//! lookup maps once, normalize each accession against them, then either write
//! the rendered view tree or feed the views straight to the indexer.
//!
//! [`SearchView`]: mirror_core::types::SearchView
pub mod lookup;
pub mod normalize;
pub mod render;

pub use lookup::{AgentsByUri, DigitalObjectsByUri, LookupMaps, SubjectsByUri};
pub use normalize::{normalize, Exclusion, Normalized};
pub use render::{render_view_tree, RenderReport, StoreViews};
