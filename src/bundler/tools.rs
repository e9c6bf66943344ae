//! Narrow capability interfaces over the external host tools.
//!
//! Each external tool the pipeline shells out to (`install_name_tool`,
//! `codesign`, `pkgutil`, `hdiutil`, `xcrun notarytool`, the embedded
//! interpreter) is wrapped in a small trait so the orchestration can be
//! exercised with fakes independent of host tool availability. Host
//! implementations invoke the real tool with `std::process::Command`,
//! exactly one tool per trait.

use crate::bundler::error::{Error, Result};
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

/// Rewrites Mach-O load commands.
pub trait PatchTool: Send + Sync {
    /// Changes a dependent-library reference recorded in `binary`.
    fn change_ref(&self, binary: &Path, old: &str, new: &str) -> Result<()>;

    /// Rewrites the install name of a dylib.
    fn set_id(&self, dylib: &Path, id: &str) -> Result<()>;
}

/// Signs and verifies bundle artifacts.
pub trait SignTool: Send + Sync {
    /// Signs `path` with `identity`, overwriting any existing signature.
    ///
    /// `entitlements` attaches a capability descriptor; only the bundle
    /// root gets one. `hardened` enables the hardened runtime required for
    /// notarization.
    fn sign(
        &self,
        path: &Path,
        identity: &str,
        entitlements: Option<&Path>,
        hardened: bool,
    ) -> Result<()>;

    /// Strict recursive signature verification.
    fn verify(&self, path: &Path) -> Result<()>;
}

/// Expands an installer package payload into a directory.
pub trait PackageExpander: Send + Sync {
    /// Expands `pkg` fully into `dest`.
    fn expand(&self, pkg: &Path, dest: &Path) -> Result<()>;
}

/// Produces a distributable image from a directory.
pub trait ImageTool: Send + Sync {
    /// Creates an image at `out` from the contents of `src_dir`.
    fn create(&self, src_dir: &Path, volume_name: &str, out: &Path) -> Result<()>;
}

/// Terminal or pending verdict from the notarization service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotaryVerdict {
    /// Submission still being processed.
    InProgress,
    /// Submission accepted; the ticket can be stapled.
    Accepted,
    /// Submission rejected.
    Rejected,
}

/// Remote notarization service.
///
/// A long-running, externally paced call: submit once, poll to a terminal
/// verdict. The service is only safely idempotent via resubmission, so no
/// implementation retries internally.
pub trait Notary: Send + Sync {
    /// Submits an image, returning the submission id.
    fn submit(&self, image: &Path, profile: &str) -> Result<String>;

    /// Polls the verdict for a submission.
    fn status(&self, id: &str, profile: &str) -> Result<NotaryVerdict>;

    /// Fetches the service's rejection detail for a submission.
    fn rejection_log(&self, id: &str, profile: &str) -> Result<String>;

    /// Staples the notarization ticket to the image.
    fn staple(&self, image: &Path) -> Result<()>;
}

/// Runs the embedded interpreter for bootstrap, install, and smoke tests.
pub trait RuntimeExec: Send + Sync {
    /// Runs `interpreter` with `args` and `envs`, returning captured stdout.
    fn run_python(
        &self,
        interpreter: &Path,
        args: &[String],
        envs: &[(String, String)],
    ) -> Result<String>;
}

/// The full set of capabilities the pipeline needs, host or fake.
#[derive(Clone)]
pub struct Toolset {
    /// Mach-O load-command rewriter.
    pub patcher: Arc<dyn PatchTool>,
    /// Code signer.
    pub signer: Arc<dyn SignTool>,
    /// Installer package expander.
    pub expander: Arc<dyn PackageExpander>,
    /// Disk image producer.
    pub imager: Arc<dyn ImageTool>,
    /// Notarization service client.
    pub notary: Arc<dyn Notary>,
    /// Embedded interpreter runner.
    pub python: Arc<dyn RuntimeExec>,
}

impl Toolset {
    /// Toolset backed by the real host tools.
    pub fn host() -> Self {
        Self {
            patcher: Arc::new(InstallNameTool),
            signer: Arc::new(Codesign),
            expander: Arc::new(Pkgutil),
            imager: Arc::new(Hdiutil),
            notary: Arc::new(NotaryTool),
            python: Arc::new(HostPython),
        }
    }
}

fn run_checked(tool: &str, cmd: &mut Command) -> Result<std::process::Output> {
    let program = cmd.get_program().to_os_string();
    let output = cmd.output().map_err(|e| {
        if which::which(&program).is_err() {
            Error::GenericError(format!(
                "{tool} unavailable: {} not found on PATH",
                program.to_string_lossy()
            ))
        } else {
            Error::GenericError(format!("failed to run {tool}: {e}"))
        }
    })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::GenericError(format!(
            "{tool} failed: {}",
            stderr.trim()
        )));
    }
    Ok(output)
}

/// `install_name_tool` host implementation.
pub struct InstallNameTool;

impl PatchTool for InstallNameTool {
    fn change_ref(&self, binary: &Path, old: &str, new: &str) -> Result<()> {
        run_checked(
            "install_name_tool",
            Command::new("install_name_tool")
                .arg("-change")
                .arg(old)
                .arg(new)
                .arg(binary),
        )?;
        Ok(())
    }

    fn set_id(&self, dylib: &Path, id: &str) -> Result<()> {
        run_checked(
            "install_name_tool",
            Command::new("install_name_tool").arg("-id").arg(id).arg(dylib),
        )?;
        Ok(())
    }
}

/// `codesign` host implementation.
pub struct Codesign;

impl Codesign {
    /// Arguments for one signing invocation. Ad-hoc ("-") signatures
    /// cannot carry a secure timestamp, so `--timestamp` is only
    /// requested for a real identity.
    fn sign_args(identity: &str, entitlements: Option<&Path>, hardened: bool) -> Vec<String> {
        let mut args = vec!["--force".to_string()];
        if identity != "-" {
            args.push("--timestamp".to_string());
        }
        args.push("--sign".to_string());
        args.push(identity.to_string());
        if hardened {
            args.push("--options".to_string());
            args.push("runtime".to_string());
        }
        if let Some(ent) = entitlements {
            args.push("--entitlements".to_string());
            args.push(ent.to_string_lossy().into_owned());
        }
        args
    }
}

impl SignTool for Codesign {
    fn sign(
        &self,
        path: &Path,
        identity: &str,
        entitlements: Option<&Path>,
        hardened: bool,
    ) -> Result<()> {
        let mut cmd = Command::new("codesign");
        cmd.args(Self::sign_args(identity, entitlements, hardened));
        cmd.arg(path);
        run_checked("codesign", &mut cmd)
            .map_err(|e| Error::Signing(e.to_string()))?;
        Ok(())
    }

    fn verify(&self, path: &Path) -> Result<()> {
        run_checked(
            "codesign",
            Command::new("codesign")
                .arg("--verify")
                .arg("--deep")
                .arg("--strict")
                .arg(path),
        )
        .map_err(|e| Error::Signing(format!("verification failed: {e}")))?;
        Ok(())
    }
}

/// `pkgutil --expand-full` host implementation.
pub struct Pkgutil;

impl PackageExpander for Pkgutil {
    fn expand(&self, pkg: &Path, dest: &Path) -> Result<()> {
        run_checked(
            "pkgutil",
            Command::new("pkgutil")
                .arg("--expand-full")
                .arg(pkg)
                .arg(dest),
        )
        .map_err(|e| Error::Acquisition(e.to_string()))?;
        Ok(())
    }
}

/// `hdiutil create` host implementation.
pub struct Hdiutil;

impl ImageTool for Hdiutil {
    fn create(&self, src_dir: &Path, volume_name: &str, out: &Path) -> Result<()> {
        run_checked(
            "hdiutil",
            Command::new("hdiutil")
                .arg("create")
                .arg("-volname")
                .arg(volume_name)
                .arg("-srcfolder")
                .arg(src_dir)
                .arg("-ov")
                .arg("-format")
                .arg("UDZO")
                .arg(out),
        )?;
        Ok(())
    }
}

/// `xcrun notarytool` / `xcrun stapler` host implementation.
pub struct NotaryTool;

/// Shape of `notarytool ... --output-format json` responses.
#[derive(serde::Deserialize)]
struct NotaryResponse {
    id: Option<String>,
    status: Option<String>,
}

impl NotaryTool {
    fn parse_status(json: &str) -> Result<NotaryVerdict> {
        let response: NotaryResponse = serde_json::from_str(json)
            .map_err(|e| Error::GenericError(format!("unparseable notarytool output: {e}")))?;
        match response.status.as_deref() {
            Some("Accepted") => Ok(NotaryVerdict::Accepted),
            Some("Invalid") | Some("Rejected") => Ok(NotaryVerdict::Rejected),
            Some("In Progress") | None => Ok(NotaryVerdict::InProgress),
            Some(other) => Err(Error::GenericError(format!(
                "unexpected notarization status: {other}"
            ))),
        }
    }
}

impl Notary for NotaryTool {
    fn submit(&self, image: &Path, profile: &str) -> Result<String> {
        let output = run_checked(
            "notarytool",
            Command::new("xcrun")
                .arg("notarytool")
                .arg("submit")
                .arg(image)
                .arg("--keychain-profile")
                .arg(profile)
                .arg("--output-format")
                .arg("json"),
        )?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let response: NotaryResponse = serde_json::from_str(&stdout)
            .map_err(|e| Error::GenericError(format!("unparseable notarytool output: {e}")))?;
        response
            .id
            .ok_or_else(|| Error::GenericError("notarytool returned no submission id".into()))
    }

    fn status(&self, id: &str, profile: &str) -> Result<NotaryVerdict> {
        let output = run_checked(
            "notarytool",
            Command::new("xcrun")
                .arg("notarytool")
                .arg("info")
                .arg(id)
                .arg("--keychain-profile")
                .arg(profile)
                .arg("--output-format")
                .arg("json"),
        )?;
        Self::parse_status(&String::from_utf8_lossy(&output.stdout))
    }

    fn rejection_log(&self, id: &str, profile: &str) -> Result<String> {
        let output = run_checked(
            "notarytool",
            Command::new("xcrun")
                .arg("notarytool")
                .arg("log")
                .arg(id)
                .arg("--keychain-profile")
                .arg(profile),
        )?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn staple(&self, image: &Path) -> Result<()> {
        run_checked(
            "stapler",
            Command::new("xcrun").arg("stapler").arg("staple").arg(image),
        )?;
        Ok(())
    }
}

/// Runs the copied interpreter directly.
pub struct HostPython;

impl RuntimeExec for HostPython {
    fn run_python(
        &self,
        interpreter: &Path,
        args: &[String],
        envs: &[(String, String)],
    ) -> Result<String> {
        let mut cmd = Command::new(interpreter);
        cmd.args(args);
        for (key, value) in envs {
            cmd.env(key, value);
        }
        let output = run_checked("python", &mut cmd)
            .map_err(|e| Error::DependencyInstall(e.to_string()))?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
