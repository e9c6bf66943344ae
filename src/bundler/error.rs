//! Error types for bundle assembly and launcher reconciliation.
//!
//! The taxonomy distinguishes non-fatal logged outcomes (a single binary
//! that could not be patched) from fatal abort outcomes (runtime
//! verification failed, signing failed). Build-time failures abort the
//! whole pipeline; launcher failures abort only that launch attempt.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for bundler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for bundler and launcher operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// IO error with the operation and path that failed
    #[error("{message}: {path}: {source}")]
    FsError {
        /// What was being attempted
        message: String,
        /// Path involved in the failure
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Runtime distribution could not be obtained
    #[error("runtime acquisition failed: {0}")]
    Acquisition(String),

    /// A binary's load paths could not be rewritten.
    ///
    /// Non-fatal on its own; the runtime smoke test is the backstop.
    #[error("failed to patch {path}: {reason}")]
    Patch {
        /// Binary that could not be rewritten
        path: PathBuf,
        /// Why the rewrite failed
        reason: String,
    },

    /// Dependency installation into the isolated package directory failed
    #[error("dependency install failed: {0}")]
    DependencyInstall(String),

    /// Signing identity missing or post-sign verification failed
    #[error("signing failed: {0}")]
    Signing(String),

    /// The notarization service returned a reject verdict.
    ///
    /// Carries the service's rejection detail verbatim.
    #[error("notarization rejected: {0}")]
    NotarizationRejected(String),

    /// The reconciler could not acquire the deployment lock in time
    #[error("could not acquire deployment lock on {0} within the wait budget")]
    LockContention(PathBuf),

    /// Partial copy or delete during a deployed-copy resync
    #[error("deployed copy sync failed: {0}")]
    Sync(String),

    /// A pipeline stage failed; carries the stage name for the exit report
    #[error("stage {stage} failed: {source}")]
    Stage {
        /// Name of the failing stage
        stage: &'static str,
        /// Underlying failure
        source: Box<Error>,
    },

    /// Path prefix manipulation errors
    #[error("path error: {0}")]
    StripPrefixError(#[from] std::path::StripPrefixError),

    /// Directory traversal errors
    #[error("walkdir error: {0}")]
    WalkdirError(#[from] walkdir::Error),

    /// Info.plist serialization errors
    #[error("plist error: {0}")]
    PlistError(#[from] plist::Error),

    /// Wrapper template rendering errors
    #[error("template error: {0}")]
    TemplateError(#[from] Box<handlebars::RenderError>),

    /// Generic errors
    #[error("{0}")]
    GenericError(String),
}

impl Error {
    /// Wraps this error with the pipeline stage it occurred in.
    pub fn in_stage(self, stage: &'static str) -> Self {
        Error::Stage {
            stage,
            source: Box::new(self),
        }
    }
}

impl From<handlebars::RenderError> for Error {
    fn from(e: handlebars::RenderError) -> Self {
        Error::TemplateError(Box::new(e))
    }
}

/// Extension trait attaching an operation description and path to IO results.
pub trait ErrorExt<T> {
    /// Converts an IO error into [`Error::FsError`] with context.
    fn fs_context(self, message: &str, path: &Path) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, message: &str, path: &Path) -> Result<T> {
        self.map_err(|source| Error::FsError {
            message: message.to_string(),
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Context helpers for Options and bundler Results.
pub trait Context<T> {
    /// Attaches a static message, producing a generic error on failure.
    fn context(self, message: &str) -> Result<T>;

    /// Attaches a lazily built message, producing a generic error on failure.
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T> Context<T> for Option<T> {
    fn context(self, message: &str) -> Result<T> {
        self.ok_or_else(|| Error::GenericError(message.to_string()))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.ok_or_else(|| Error::GenericError(f()))
    }
}

impl<T> Context<T> for Result<T> {
    fn context(self, message: &str) -> Result<T> {
        self.map_err(|e| Error::GenericError(format!("{message}: {e}")))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| Error::GenericError(format!("{}: {e}", f())))
    }
}
