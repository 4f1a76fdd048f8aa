#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod error;
pub mod record;
pub mod store;
pub mod traits;
pub mod types;
pub mod uri;
pub mod view_tree;

pub use error::{Error, Result};
pub use record::{AgentType, RecordClass};
pub use store::RecordStore;
pub use uri::RecordUri;
