//! Bundler and launcher library for the Studio desktop application.
//!
//! This library provides the two halves of Studio's distribution story:
//! - `bundler`: build-machine pipeline that assembles the .app bundle,
//!   embeds a relocatable Python runtime, signs, notarizes, and produces a
//!   distributable disk image.
//! - `launcher`: end-user deployment reconciler that keeps the per-user
//!   writable copy of the embedded source tree in sync with the shipped
//!   bundle before the real application starts.
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod bundler;
pub mod cli;
pub mod error;
pub mod launcher;
pub mod metadata;

// Re-export commonly used types
pub use error::{BundlerError, CliError, Result};

/// Returns an error built from a format string, using the bundler's
/// generic error variant.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($($arg)*)).into())
    };
}
