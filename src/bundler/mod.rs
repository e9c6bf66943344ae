//! Bundle assembly pipeline for the Studio .app bundle.
//!
//! The pipeline is strictly sequential: compile → icon → metadata →
//! resources → snapshot → runtime embed → wrappers → finalize, optionally
//! followed by signing, image creation, and notarization. Every stage is a
//! full barrier for the next; the first failure aborts the build so a
//! partial bundle never ships.

pub mod checksum;
pub mod error;
pub mod image;
pub mod layout;
pub mod notarize;
pub mod pipeline;
pub mod runtime;
pub mod settings;
pub mod sign;
pub mod stages;
pub mod tools;
pub mod utils;

pub use error::{Error, Result};
pub use layout::BundleLayout;
pub use pipeline::{BundleArtifact, BundlePipeline};
pub use settings::{
    BundleSettings, MacOsSettings, PackageSettings, RuntimeSettings, Settings, SettingsBuilder,
};
pub use tools::Toolset;
