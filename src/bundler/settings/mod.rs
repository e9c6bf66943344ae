//! Configuration structures for bundle assembly.
//!
//! Every stage receives an explicit [`Settings`] value; nothing reads the
//! environment or the working directory ambiently. CLI flags and environment
//! variables are folded into `Settings` once, at the CLI edge.

mod builder;
mod bundle;
mod core;
mod macos;
mod package;
mod runtime;

// Re-export all public types
pub use builder::SettingsBuilder;
pub use bundle::BundleSettings;
pub use core::Settings;
pub use macos::MacOsSettings;
pub use package::PackageSettings;
pub use runtime::RuntimeSettings;
