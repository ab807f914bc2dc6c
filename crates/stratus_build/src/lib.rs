//! # Stratus Build
//!
//! Turns a front-end build output directory into [`Asset`](stratus_core::asset::Asset)
//! records: content-hashed or version-namespaced names, sizes, MD5 fingerprints
//! and SHA-384 integrity digests.
//!
//! Build output is accessed through [`ArtifactProvider`], so manifests can be
//! built from a real `dist` folder ([`FsArtifacts`]) or from memory
//! ([`MemoryArtifacts`]).
//!
//! ## Usage
//!
//! ```no_run
//! use stratus_build::{BuildOptions, FsArtifacts, build_manifest};
//! use stratus_core::settings::DeployMode;
//!
//! let dist = FsArtifacts::new("./dist");
//! let options = BuildOptions {
//!     mode: DeployMode::Static,
//!     version: "2.4.0".to_string(),
//!     hash_file_names: false,
//!     include_content: true,
//! };
//! let assets = build_manifest(&dist, &options)?;
//! # Ok::<(), stratus_build::BuildError>(())
//! ```

pub mod error;
pub mod fingerprint;
pub mod manifest;
pub mod provider;

pub use error::BuildError;
pub use fingerprint::Fingerprint;
pub use manifest::{BuildOptions, build_manifest, bundle_assets, emitted_assets};
pub use provider::{ArtifactProvider, FsArtifacts, MemoryArtifacts, MetadataEntry};
