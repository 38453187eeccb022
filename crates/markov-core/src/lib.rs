pub mod conflict;
pub mod dag;
pub mod error;
pub mod hash;
pub mod types;

pub use dag::{now_millis, CommitDag, DagSnapshot};
pub use error::DagError;
pub use types::*;
