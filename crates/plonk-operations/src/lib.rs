pub mod context;
pub mod error;
pub mod types;

pub mod apply;
pub mod diff;
pub mod doctor;
pub mod dotfiles;
pub mod install;
pub mod reconcile;
pub mod search;
pub mod uninstall;
pub mod upgrade;

pub use context::PlonkContext;
pub use error::{OpsError, OpsResult};
pub use types::*;
