pub mod dotfiles;
pub mod error;
pub mod lock;
pub mod operation;
pub mod reconcile;
pub mod spec;
pub mod types;

pub use dotfiles::DotfileEngine;
pub use error::{CoreError, CoreResult};
pub use lock::{LockFile, LockService, ResourceEntry};
pub use operation::{OperationResult, OperationStatus, Summary};
pub use spec::PackageSpec;
pub use types::{Domain, DotfileStatus, Item, ReconcileResult, ReconciliationState};
