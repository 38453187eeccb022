pub mod branch_file;
pub mod error;
pub mod fs;
pub mod lock;
pub mod paths;
pub mod schema;
pub mod store;

pub use branch_file::{BranchConfig, BranchFile, CurrentBranchPointer};
pub use error::StoreError;
pub use fs::{FileSystem, LocalFs, MemoryFs};
pub use lock::{LockHolder, WorkspaceLock};
pub use paths::MarkovPaths;
pub use schema::{validate_branch_file, SchemaIssue};
pub use store::{BranchFileStore, DEFAULT_BRANCH};
