pub use stratus_core::*;

pub mod build {
    pub use stratus_build::*;
}

pub mod compress {
    pub use stratus_compress::*;
}

pub mod publish {
    pub use stratus_publish::*;
}

pub mod deploy {
    pub use stratus_deploy::*;
}

#[cfg(feature = "opendal")]
pub mod opendal {
    pub use stratus_opendal::*;
}

#[cfg(feature = "portal")]
pub mod portal {
    pub use stratus_portal::*;
}

#[cfg(feature = "mock")]
pub mod mock {
    pub use stratus_mock::*;
}

pub mod prelude {
    pub use stratus_core::prelude::*;

    pub use stratus_build::{ArtifactProvider, BuildOptions, FsArtifacts, MemoryArtifacts};
    pub use stratus_deploy::{DeployError, DeployReport, Deployer, Registration};
    pub use stratus_publish::StoragePublisher;

    #[cfg(feature = "opendal")]
    pub use stratus_opendal::OpendalStorage;

    #[cfg(feature = "portal")]
    pub use stratus_portal::PortalHttpClient;

    #[cfg(feature = "mock")]
    pub use stratus_mock::{MemoryStorage, MockPortal};
}
