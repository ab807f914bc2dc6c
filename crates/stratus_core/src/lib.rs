pub mod asset;
pub mod entity;
pub mod error;
pub mod settings;
pub mod traits;
pub mod version;

pub mod prelude {
    pub use super::asset::*;
    pub use super::entity::*;
    pub use super::error::*;
    pub use super::settings::*;
    pub use super::traits::*;
    pub use super::version::*;
}
