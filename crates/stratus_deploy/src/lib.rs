//! # Stratus Deploy
//!
//! Sequences a deployment: manifest, upload, registration.
//!
//! ```no_run
//! # use stratus_core::settings::DeploySettings;
//! # async fn run(settings: DeploySettings) -> Result<(), stratus_deploy::DeployError> {
//! use stratus_build::FsArtifacts;
//! use stratus_deploy::Deployer;
//! use stratus_mock::{MemoryStorage, MockPortal};
//! use stratus_publish::StoragePublisher;
//! use tokio_util::sync::CancellationToken;
//!
//! let storage = MemoryStorage::new();
//! let deployer = Deployer::new(
//!     StoragePublisher::new(storage.clone(), storage),
//!     MockPortal::new(),
//! );
//! let report = deployer
//!     .deploy(&settings, &FsArtifacts::new("dist"), &CancellationToken::new())
//!     .await?;
//! println!("uploaded {} assets", report.uploaded.len());
//! # Ok(())
//! # }
//! ```

pub mod deploy;
pub mod error;

pub use deploy::{DeployReport, Deployer, Registration};
pub use error::{DeployError, Stage};
