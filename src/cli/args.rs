//! Command line argument parsing for the build tool.

use clap::Parser;
use std::path::PathBuf;

/// macOS application bundler for the Studio desktop app
#[derive(Parser, Debug)]
#[command(
    name = "studio-bundle",
    version,
    about = "Assembles, signs, and packages the Studio .app bundle",
    long_about = "Assembles the Studio .app bundle: compiles the shell binary, embeds a \
relocatable Python runtime and a snapshot of the source tree, and optionally signs, \
packages, and notarizes a distributable disk image.

Usage:
  studio-bundle --project-root .
  studio-bundle --project-root . --sign
  studio-bundle --project-root . --notarize --output dist/Studio.dmg

Exit code 0 guarantees the bundle (and image, when requested) exists at the output path."
)]
pub struct Args {
    /// Root of the application project to bundle
    #[arg(short = 'p', long, value_name = "DIR", default_value = ".")]
    pub project_root: PathBuf,

    /// Output directory for the bundle and image
    #[arg(short = 'd', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Sign the bundle after assembly
    #[arg(long)]
    pub sign: bool,

    /// Notarize the disk image (implies --sign)
    #[arg(long)]
    pub notarize: bool,

    /// Skip stapling the notarization ticket (testing only)
    #[arg(long)]
    pub skip_stapling: bool,

    /// Override the output image path
    #[arg(short = 'o', long, value_name = "PATH", env = "BUNDLE_OUTPUT_IMAGE")]
    pub output: Option<PathBuf>,

    /// Pre-built shell binary to install instead of building
    #[arg(long, value_name = "PATH")]
    pub prebuilt_shell: Option<PathBuf>,

    /// Code signing identity
    #[arg(long, value_name = "IDENTITY", env = "BUNDLE_SIGNING_IDENTITY")]
    pub signing_identity: Option<String>,

    /// Keychain credential profile for the notarization service
    #[arg(long, value_name = "PROFILE", env = "BUNDLE_NOTARY_PROFILE")]
    pub notary_profile: Option<String>,

    /// Local Python distribution to embed instead of downloading
    #[arg(long, value_name = "DIR", env = "BUNDLE_PYTHON_HOME")]
    pub python_home: Option<PathBuf>,

    /// Python version to download when no local distribution is given
    #[arg(long, value_name = "X.Y.Z", env = "BUNDLE_PYTHON_VERSION")]
    pub python_version: Option<String>,

    /// External asset directory copied into the bundle
    #[arg(long, value_name = "DIR", env = "BUNDLE_ASSET_DIR")]
    pub asset_dir: Option<PathBuf>,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_current_directory() {
        let args = Args::parse_from(["studio-bundle"]);
        assert_eq!(args.project_root, PathBuf::from("."));
        assert!(!args.sign);
        assert!(!args.notarize);
    }

    #[test]
    fn output_image_override_comes_from_the_environment() {
        // set_var is process-global; scope it tightly.
        unsafe { std::env::set_var("BUNDLE_OUTPUT_IMAGE", "/tmp/Studio.dmg") };
        let args = Args::parse_from(["studio-bundle"]);
        unsafe { std::env::remove_var("BUNDLE_OUTPUT_IMAGE") };
        assert_eq!(args.output, Some(PathBuf::from("/tmp/Studio.dmg")));
    }

    #[test]
    fn notarize_and_sign_are_independent_flags() {
        let args = Args::parse_from(["studio-bundle", "--notarize"]);
        assert!(args.notarize);
        assert!(!args.sign); // sign() on Settings still reports true
    }
}
