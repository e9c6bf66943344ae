//! Studio bundle build tool.
//!
//! Assembles the Studio .app bundle and, when requested, signs, packages,
//! and notarizes a distributable disk image.

use std::process;
use studio_bundler::cli;

#[tokio::main]
async fn main() {
    env_logger::init();

    let exit_code = match cli::run().await {
        Ok(code) => code,
        Err(e) => {
            // Unwrap the bundler layer so stage failures read as
            // "error: stage <name> failed: ...".
            match &e {
                studio_bundler::BundlerError::Bundler(inner) => eprintln!("error: {inner}"),
                other => eprintln!("error: {other}"),
            }
            1
        }
    };

    process::exit(exit_code);
}
