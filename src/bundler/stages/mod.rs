//! Pipeline stages for bundle assembly.
//!
//! Each stage is a focused step of the build; the pipeline runs them in a
//! fixed order and tags any failure with the stage name. Stages receive
//! explicit [`Settings`](crate::bundler::Settings) and
//! [`BundleLayout`](crate::bundler::BundleLayout) values and never read
//! ambient state.

pub mod compile;
pub mod icon;
pub mod plist;
pub mod snapshot;
pub mod wrappers;
