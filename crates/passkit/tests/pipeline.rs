//! End-to-end generation against the real `openssl` and `zip` tools.
//!
//! A throwaway self-signed certificate is created for every test. Tests that
//! need the tools print a notice and return early when either is missing
//! from `PATH`.

use passkit::process::find_in_path;
use passkit::{Error, Pass, PassArchive, PassField, PassGenerator, PassStructure, PassStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const PASSWORD: &str = "correct horse";

fn tools_available() -> bool {
    let path = std::env::var_os("PATH");
    ["openssl", "zip"]
        .iter()
        .all(|tool| find_in_path(Path::new(tool), path.as_deref()).is_some())
}

macro_rules! require_tools {
    () => {
        if !tools_available() {
            eprintln!("skipping: openssl and zip must be installed");
            return;
        }
    };
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("template")).unwrap();
        fs::create_dir(dir.path().join("work")).unwrap();
        Self { dir }
    }

    /// Create a self-signed certificate and pack it with its key into a
    /// PKCS#12 file protected by [`PASSWORD`].
    fn with_certificate(self) -> Self {
        let root = self.dir.path();
        openssl(
            root,
            &[
                "req", "-x509", "-newkey", "rsa:2048", "-nodes", "-days", "1",
                "-subj", "/CN=passkit test", "-keyout", "signer.key", "-out", "signer.crt",
            ],
        );
        openssl(
            root,
            &[
                "pkcs12", "-export", "-inkey", "signer.key", "-in", "signer.crt",
                "-out", "pass.p12", "-passout", &format!("pass:{PASSWORD}"),
            ],
        );
        // Any PEM certificate serves as the chain certificate here.
        fs::copy(root.join("signer.crt"), root.join("wwdr.pem")).unwrap();
        self
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn builder(&self) -> passkit::PassGeneratorBuilder {
        PassGenerator::builder()
            .pkcs12(self.path("pass.p12"))
            .password(PASSWORD)
            .wwdr_certificate(self.path("wwdr.pem"))
            .template_dir(self.path("template"))
            .work_root(self.path("work"))
    }

    fn work_root_is_empty(&self) -> bool {
        fs::read_dir(self.path("work")).unwrap().next().is_none()
    }
}

fn openssl(dir: &Path, args: &[&str]) {
    let output = Command::new("openssl")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "openssl {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn minimal_pass() -> Pass {
    Pass::new(
        "Test",
        "Example Inc.",
        "pass.com.example.test",
        "0001",
        "ABCDE12345",
        PassStyle::Generic(PassStructure::default()),
    )
}

#[tokio::test]
async fn test_minimal_pass_end_to_end() {
    require_tools!();
    let fixture = Fixture::new().with_certificate();
    let generator = fixture.builder().build().unwrap();

    let bytes = generator.generate(&minimal_pass()).await.unwrap();
    assert!(!bytes.is_empty());
    assert!(fixture.work_root_is_empty());

    let archive = PassArchive::from_bytes(&bytes).unwrap();
    assert_eq!(
        archive.entry_names().collect::<Vec<_>>(),
        vec!["manifest.json", "pass.json", "signature"]
    );
    assert_eq!(archive.manifest().unwrap().keys().collect::<Vec<_>>(), vec!["pass.json"]);
    assert!(!archive.signature().unwrap().is_empty());
    assert_eq!(archive.pass().unwrap(), minimal_pass());
    archive.verify_manifest().unwrap();
}

#[tokio::test]
async fn test_signature_verifies_against_manifest() {
    require_tools!();
    let fixture = Fixture::new().with_certificate();
    let generator = fixture.builder().build().unwrap();
    let archive = PassArchive::from_bytes(&generator.generate(&minimal_pass()).await.unwrap()).unwrap();

    fs::write(fixture.path("manifest.json"), archive.entry("manifest.json").unwrap()).unwrap();
    fs::write(fixture.path("signature.der"), archive.signature().unwrap()).unwrap();
    openssl(
        fixture.dir.path(),
        &[
            "smime", "-verify", "-binary", "-inform", "DER", "-in", "signature.der",
            "-content", "manifest.json", "-noverify", "-out", "verified.json",
        ],
    );
    assert_eq!(
        fs::read(fixture.path("verified.json")).unwrap(),
        archive.entry("manifest.json").unwrap()
    );
}

#[tokio::test]
async fn test_localized_pass_with_template() {
    require_tools!();
    let fixture = Fixture::new().with_certificate();
    fs::write(fixture.path("template").join("icon.png"), b"icon").unwrap();
    let generator = fixture.builder().build().unwrap();

    let pass = Pass {
        style: PassStyle::Generic(
            PassStructure::default()
                .primary(PassField::localized("seat", [("en", "Seat 12"), ("fr", "Siège 12")])),
        ),
        ..minimal_pass()
    };
    let archive = PassArchive::from_bytes(&generator.generate(&pass).await.unwrap()).unwrap();

    let manifest = archive.manifest().unwrap();
    let mut keys: Vec<_> = manifest.keys().collect();
    keys.sort();
    assert_eq!(
        keys,
        vec![
            "en.lproj/icon.png",
            "en.lproj/pass.strings",
            "fr.lproj/icon.png",
            "fr.lproj/pass.strings",
            "pass.json",
        ]
    );
    archive.verify_manifest().unwrap();
}

#[tokio::test]
async fn test_repeated_generation_is_equivalent() {
    require_tools!();
    let fixture = Fixture::new().with_certificate();
    fs::write(fixture.path("template").join("logo.png"), b"logo").unwrap();
    let generator = fixture.builder().build().unwrap();
    let pass = minimal_pass();

    let first = PassArchive::from_bytes(&generator.generate(&pass).await.unwrap()).unwrap();
    let second = PassArchive::from_bytes(&generator.generate(&pass).await.unwrap()).unwrap();
    assert_eq!(first.manifest().unwrap(), second.manifest().unwrap());
    assert_eq!(first.entry("pass.json"), second.entry("pass.json"));
    assert!(fixture.work_root_is_empty());
}

#[tokio::test]
async fn test_missing_certificate_fails_key_extraction() {
    require_tools!();
    let fixture = Fixture::new().with_certificate();
    let generator = fixture
        .builder()
        .pkcs12(fixture.path("does-not-exist.p12"))
        .build()
        .unwrap();

    let err = generator.generate(&minimal_pass()).await.unwrap_err();
    assert!(matches!(err, Error::KeyGenerationFailed { status } if status != 0));
    assert!(fixture.work_root_is_empty());
}

#[tokio::test]
async fn test_wrong_password_fails_key_extraction() {
    require_tools!();
    let fixture = Fixture::new().with_certificate();
    let generator = fixture.builder().password("wrong").build().unwrap();

    let err = generator.generate(&minimal_pass()).await.unwrap_err();
    assert!(matches!(err, Error::KeyGenerationFailed { .. }));
}

#[tokio::test]
async fn test_unresolvable_openssl_is_not_found() {
    let fixture = Fixture::new();
    let generator = fixture
        .builder()
        .openssl("passkit-missing-openssl")
        .build()
        .unwrap();

    let err = generator.generate(&minimal_pass()).await.unwrap_err();
    assert!(matches!(err, Error::ExecutableNotFound(name) if name == "passkit-missing-openssl"));
    assert!(fixture.work_root_is_empty());
}

#[tokio::test]
async fn test_unresolvable_zip_is_not_found() {
    require_tools!();
    let fixture = Fixture::new().with_certificate();
    let generator = fixture.builder().zip("passkit-missing-zip").build().unwrap();

    let err = generator.generate(&minimal_pass()).await.unwrap_err();
    assert!(matches!(err, Error::ExecutableNotFound(name) if name == "passkit-missing-zip"));
}
