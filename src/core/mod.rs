pub mod cache;
pub mod deployer;
pub mod plugin;
pub mod stats;
pub mod workspace;

pub use crate::domain::model::{DeploymentReport, StepOutcome, TransferStats};
pub use crate::domain::ports::{CommandRunner, RemoteSynchronizer};
pub use crate::utils::error::Result;
