pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;

pub use config::DeployConfig;
pub use core::deployer::Deployer;
pub use domain::model::{DeploymentReport, StepOutcome, TransferStats, TransportKind};
pub use utils::error::{DeployError, Result};
