//! Wrapper stage: relocatable launch scripts.
//!
//! Generates the interpreter bootstrap wrapper and one wrapper per bundled
//! helper tool. Every wrapper resolves its own location at run time and
//! derives all paths from it, so the bundle works from any install
//! location. The interpreter wrapper is parameterized by the version
//! detected from the copied tree, never by a hard-coded one.

use crate::bundler::{
    error::Result,
    layout::BundleLayout,
    settings::Settings,
    utils::fs,
};
use handlebars::Handlebars;
use std::collections::BTreeMap;

const PYTHON_WRAPPER_TEMPLATE: &str = r#"#!/bin/bash
# Relocatable bootstrap for the embedded interpreter.
set -euo pipefail
HERE="$(cd "$(dirname "${BASH_SOURCE[0]}")" && pwd)"
RUNTIME="$(cd "$HERE/.." && pwd)"
export PYTHONHOME="$RUNTIME/python"
export PYTHONPATH="$RUNTIME/site-packages"
export PYTHONNOUSERSITE=1
exec "$RUNTIME/python/bin/python{{version}}" "$@"
"#;

const HELPER_WRAPPER_TEMPLATE: &str = r#"#!/bin/bash
# Relocatable wrapper for the bundled {{tool}} tool.
set -euo pipefail
HERE="$(cd "$(dirname "${BASH_SOURCE[0]}")" && pwd)"
RESOURCES="$(cd "$HERE/.." && pwd)"
export PYTHONHOME="$RESOURCES/runtime/python"
export PYTHONPATH="$RESOURCES/runtime/site-packages"
export PYTHONNOUSERSITE=1
exec "$RESOURCES/runtime/python/bin/{{tool}}" "$@"
"#;

/// Writes the interpreter bootstrap wrapper for a detected `X.Y` version.
pub fn write_python_wrapper(layout: &BundleLayout, version: &str) -> Result<()> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    let mut data = BTreeMap::new();
    data.insert("version", version.to_string());

    let rendered = handlebars.render_template(PYTHON_WRAPPER_TEMPLATE, &data)?;
    fs::write_executable(&layout.python_wrapper(), &rendered)
}

/// Runs the wrapper stage for the configured helper tools.
pub async fn run(settings: &Settings, layout: &BundleLayout) -> Result<()> {
    let tools = &settings.bundle_settings().helper_tools;
    if tools.is_empty() {
        return Ok(());
    }

    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    for tool in tools {
        let mut data = BTreeMap::new();
        data.insert("tool", tool.clone());
        let rendered = handlebars.render_template(HELPER_WRAPPER_TEMPLATE, &data)?;
        fs::write_executable(&layout.helper_bin_dir().join(tool), &rendered)?;
        log::debug!("wrote helper wrapper: {tool}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_wrapper_uses_detected_version() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = BundleLayout::new(tmp.path(), "Studio");
        write_python_wrapper(&layout, "3.13").unwrap();

        let script = std::fs::read_to_string(layout.python_wrapper()).unwrap();
        assert!(script.contains("python3.13"));
        assert!(script.contains("PYTHONNOUSERSITE=1"));
        assert!(!script.contains("{{"));
    }

    #[test]
    fn wrapper_paths_are_self_relative() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = BundleLayout::new(tmp.path(), "Studio");
        write_python_wrapper(&layout, "3.12").unwrap();

        let script = std::fs::read_to_string(layout.python_wrapper()).unwrap();
        // No absolute bundle path may leak into the script.
        assert!(!script.contains(tmp.path().to_str().unwrap()));
        assert!(script.contains("BASH_SOURCE"));
    }
}
