//! Distribution flow behavior, exercised with fake tools.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use studio_bundler::bundler::tools::{
    ImageTool, Notary, NotaryVerdict, PackageExpander, PatchTool, RuntimeExec, SignTool, Toolset,
};
use studio_bundler::bundler::{
    BundleLayout, BundlePipeline, Error, MacOsSettings, PackageSettings, Settings, SettingsBuilder,
};

struct NoopPatcher;
impl PatchTool for NoopPatcher {
    fn change_ref(&self, _: &Path, _: &str, _: &str) -> studio_bundler::bundler::Result<()> {
        Ok(())
    }
    fn set_id(&self, _: &Path, _: &str) -> studio_bundler::bundler::Result<()> {
        Ok(())
    }
}

struct NoopExpander;
impl PackageExpander for NoopExpander {
    fn expand(&self, _: &Path, _: &Path) -> studio_bundler::bundler::Result<()> {
        Ok(())
    }
}

struct NoopPython;
impl RuntimeExec for NoopPython {
    fn run_python(
        &self,
        _: &Path,
        _: &[String],
        _: &[(String, String)],
    ) -> studio_bundler::bundler::Result<String> {
        Ok(String::new())
    }
}

#[derive(Default)]
struct FakeSigner {
    fail: bool,
    signs: AtomicUsize,
}
impl SignTool for FakeSigner {
    fn sign(
        &self,
        _: &Path,
        _: &str,
        _: Option<&Path>,
        _: bool,
    ) -> studio_bundler::bundler::Result<()> {
        if self.fail {
            return Err(Error::Signing("identity not found in keychain".into()));
        }
        self.signs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    fn verify(&self, _: &Path) -> studio_bundler::bundler::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct FakeImager {
    created: AtomicBool,
}
impl ImageTool for FakeImager {
    fn create(
        &self,
        _src: &Path,
        _volume: &str,
        out: &Path,
    ) -> studio_bundler::bundler::Result<()> {
        std::fs::write(out, b"fake image contents").unwrap();
        self.created.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeNotary {
    verdict: NotaryVerdict,
    stapled: AtomicBool,
}
impl Notary for FakeNotary {
    fn submit(&self, _: &Path, _: &str) -> studio_bundler::bundler::Result<String> {
        Ok("sub-0001".into())
    }
    fn status(&self, _: &str, _: &str) -> studio_bundler::bundler::Result<NotaryVerdict> {
        Ok(self.verdict.clone())
    }
    fn rejection_log(&self, id: &str, _: &str) -> studio_bundler::bundler::Result<String> {
        Ok(format!("submission {id}: binary is not hardened"))
    }
    fn staple(&self, _: &Path) -> studio_bundler::bundler::Result<()> {
        self.stapled.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn settings(out_dir: &Path, notarize: bool) -> Settings {
    SettingsBuilder::new()
        .project_root(out_dir.parent().unwrap())
        .out_dir(out_dir)
        .package_settings(PackageSettings {
            product_name: "Studio".into(),
            version: "1.0.0".into(),
            description: String::new(),
            shell_binary: "studio-shell".into(),
        })
        .macos(MacOsSettings {
            signing_identity: Some("Developer ID Application: Studio".into()),
            notary_profile: Some("studio-notary".into()),
            ..Default::default()
        })
        .sign(true)
        .notarize(notarize)
        .build()
        .unwrap()
}

/// A minimal assembled bundle with one Mach-O-looking file inside.
fn fabricate_bundle(out_dir: &Path) -> BundleLayout {
    let layout = BundleLayout::new(out_dir, "Studio");
    std::fs::create_dir_all(layout.macos_dir()).unwrap();
    let mut macho = vec![0xcf, 0xfa, 0xed, 0xfe];
    macho.extend_from_slice(&[0u8; 28]);
    std::fs::write(layout.macos_dir().join("studio-shell"), macho).unwrap();
    layout
}

fn toolset(
    signer: Arc<FakeSigner>,
    imager: Arc<FakeImager>,
    notary: Arc<FakeNotary>,
) -> Toolset {
    Toolset {
        patcher: Arc::new(NoopPatcher),
        signer,
        expander: Arc::new(NoopExpander),
        imager,
        notary,
        python: Arc::new(NoopPython),
    }
}

#[tokio::test]
async fn signing_failure_aborts_before_any_image_exists() {
    let tmp = tempfile::tempdir().unwrap();
    let out_dir = tmp.path().join("dist");
    let layout = fabricate_bundle(&out_dir);

    let signer = Arc::new(FakeSigner {
        fail: true,
        ..Default::default()
    });
    let imager = Arc::new(FakeImager::default());
    let notary = Arc::new(FakeNotary {
        verdict: NotaryVerdict::Accepted,
        stapled: AtomicBool::new(false),
    });

    let settings = settings(&out_dir, true);
    let image_path = settings.image_path();
    let pipeline = BundlePipeline::new(
        settings,
        toolset(signer, imager.clone(), notary),
    );

    let err = pipeline.distribute(&layout).await.unwrap_err();
    match err {
        Error::Stage { stage, source } => {
            assert_eq!(stage, "sign");
            assert!(matches!(*source, Error::Signing(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!imager.created.load(Ordering::SeqCst));
    assert!(!image_path.exists());
}

#[tokio::test]
async fn rejection_surfaces_the_service_log_and_skips_stapling() {
    let tmp = tempfile::tempdir().unwrap();
    let out_dir = tmp.path().join("dist");
    let layout = fabricate_bundle(&out_dir);

    let signer = Arc::new(FakeSigner::default());
    let imager = Arc::new(FakeImager::default());
    let notary = Arc::new(FakeNotary {
        verdict: NotaryVerdict::Rejected,
        stapled: AtomicBool::new(false),
    });

    let pipeline = BundlePipeline::new(
        settings(&out_dir, true),
        toolset(signer, imager, notary.clone()),
    );

    let err = pipeline.distribute(&layout).await.unwrap_err();
    match err {
        Error::Stage { stage, source } => {
            assert_eq!(stage, "notarize");
            match *source {
                Error::NotarizationRejected(detail) => {
                    assert!(detail.contains("binary is not hardened"));
                }
                other => panic!("unexpected inner error: {other}"),
            }
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!notary.stapled.load(Ordering::SeqCst));
}

#[tokio::test]
async fn acceptance_staples_and_writes_the_checksum_sidecar() {
    let tmp = tempfile::tempdir().unwrap();
    let out_dir = tmp.path().join("dist");
    let layout = fabricate_bundle(&out_dir);

    let signer = Arc::new(FakeSigner::default());
    let imager = Arc::new(FakeImager::default());
    let notary = Arc::new(FakeNotary {
        verdict: NotaryVerdict::Accepted,
        stapled: AtomicBool::new(false),
    });

    let pipeline = BundlePipeline::new(
        settings(&out_dir, true),
        toolset(signer.clone(), imager, notary.clone()),
    );

    let (image, checksum) = pipeline.distribute(&layout).await.unwrap();
    assert_eq!(image, out_dir.join("Studio-1.0.0.dmg"));
    assert!(image.is_file());
    assert!(notary.stapled.load(Ordering::SeqCst));
    // Nested binary plus the bundle root.
    assert!(signer.signs.load(Ordering::SeqCst) >= 2);

    let sidecar = out_dir.join("Studio-1.0.0.dmg.sha256");
    let sidecar_contents = std::fs::read_to_string(&sidecar).unwrap();
    assert!(sidecar_contents.starts_with(&checksum));
    assert!(sidecar_contents.contains("Studio-1.0.0.dmg"));
}

#[tokio::test]
async fn sign_only_flow_produces_an_image_without_notarizing() {
    let tmp = tempfile::tempdir().unwrap();
    let out_dir = tmp.path().join("dist");
    let layout = fabricate_bundle(&out_dir);

    let signer = Arc::new(FakeSigner::default());
    let imager = Arc::new(FakeImager::default());
    let notary = Arc::new(FakeNotary {
        verdict: NotaryVerdict::Rejected,
        stapled: AtomicBool::new(false),
    });

    let pipeline = BundlePipeline::new(
        settings(&out_dir, false),
        toolset(signer, imager, notary.clone()),
    );

    let (image, _) = pipeline.distribute(&layout).await.unwrap();
    assert!(image.is_file());
    // The notary was never consulted.
    assert!(!notary.stapled.load(Ordering::SeqCst));
}
