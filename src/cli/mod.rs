//! Command line interface for the bundle build tool.
//!
//! Folds flags, environment variables, and the project manifest into one
//! [`Settings`](crate::bundler::Settings) value at this edge; the pipeline
//! itself never reads the environment.

mod args;

pub use args::Args;

use crate::bundler::{BundlePipeline, SettingsBuilder, Toolset};
use crate::error::Result;
use crate::metadata;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    let settings = build_settings(&args)?;

    let pipeline = BundlePipeline::new(settings, Toolset::host());
    let artifact = pipeline.run().await?;

    println!("bundle: {}", artifact.bundle_root.display());
    if let Some(image) = &artifact.image {
        println!("image: {}", image.display());
    }
    if let Some(checksum) = &artifact.checksum {
        println!("sha256: {checksum}");
    }
    Ok(0)
}

/// Builds settings from arguments plus the project manifest.
pub fn build_settings(args: &Args) -> Result<crate::bundler::Settings> {
    // Manifest problems are metadata-stage failures as far as the exit
    // report is concerned, even though the read happens before the
    // pipeline starts.
    let manifest = metadata::load_manifest(&args.project_root)
        .map_err(|e| stage_error("metadata", e))?;

    let mut bundle = manifest.bundle;
    if let Some(asset_dir) = &args.asset_dir {
        bundle.asset_dir = Some(asset_dir.clone());
    }

    let mut runtime = manifest.runtime;
    if let Some(home) = &args.python_home {
        runtime.source_home = Some(home.clone());
    }
    if let Some(version) = &args.python_version {
        runtime.requested_version = version.clone();
    }

    let macos = crate::bundler::MacOsSettings {
        signing_identity: args.signing_identity.clone(),
        notary_profile: args.notary_profile.clone(),
        minimum_system_version: Some("11.0".to_string()),
        skip_stapling: args.skip_stapling,
    };

    let out_dir = args
        .out_dir
        .clone()
        .unwrap_or_else(|| args.project_root.join("dist"));

    let mut builder = SettingsBuilder::new()
        .project_root(&args.project_root)
        .out_dir(out_dir)
        .package_settings(manifest.package)
        .bundle_settings(bundle)
        .runtime(runtime)
        .macos(macos)
        .sign(args.sign)
        .notarize(args.notarize);

    if let Some(prebuilt) = &args.prebuilt_shell {
        builder = builder.prebuilt_shell(prebuilt);
    }
    if let Some(output) = &args.output {
        builder = builder.output_image(output);
    }

    Ok(builder.build()?)
}

fn stage_error(stage: &'static str, error: crate::error::BundlerError) -> crate::error::BundlerError {
    match error {
        crate::error::BundlerError::Bundler(e) => {
            crate::error::BundlerError::Bundler(e.in_stage(stage))
        }
        other => crate::error::BundlerError::Bundler(
            crate::bundler::Error::GenericError(other.to_string()).in_stage(stage),
        ),
    }
}
