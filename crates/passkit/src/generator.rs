//! Pass generation pipeline.
//!
//! [`PassGenerator`] turns a [`Pass`] into the bytes of a signed `.pkpass`
//! archive. Every call works in its own temporary directory:
//!
//! ```text
//! passkit-XXXXXX/
//! ├── key.pem
//! ├── cert.pem
//! ├── pass.pkpass
//! └── bundle/
//!     ├── <lang>.lproj/pass.strings
//!     ├── <template assets>
//!     ├── pass.json
//!     ├── manifest.json
//!     └── signature
//! ```
//!
//! The directory is removed when the call returns, whether it succeeded or
//! not, and also when the returned future is dropped mid-flight.

use crate::archive::{ZipCommand, Zipper};
use crate::bundle::manifest::MANIFEST_FILE_NAME;
use crate::bundle::{
    write_pass_json, ItemsCopier, LocalizablesGenerator, ManifestGenerator, Sha1ManifestGenerator,
    StringsFileGenerator, TemplateCopier,
};
use crate::crypto::{
    OpensslPemGenerator, OpensslSignatureGenerator, OpensslTool, PemGenerator, SignRequest,
    SignatureGenerator, SIGNATURE_FILE_NAME,
};
use crate::model::Pass;
use crate::process::{OutputObserver, ProcessRunner, TokioProcessRunner, TracingObserver};
use crate::{Error, Result};
use secrecy::SecretString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Prefix of the per-call working directory.
pub const WORK_DIR_PREFIX: &str = "passkit-";
/// Bundle directory inside the working directory.
pub const BUNDLE_DIR_NAME: &str = "bundle";
/// Archive file inside the working directory.
pub const ARCHIVE_FILE_NAME: &str = "pass.pkpass";
const KEY_FILE_NAME: &str = "key.pem";
const CERTIFICATE_FILE_NAME: &str = "cert.pem";

/// Assembles signed pass archives.
///
/// # Example
///
/// ```no_run
/// use passkit::{Pass, PassGenerator, PassStructure, PassStyle};
///
/// # async fn run() -> passkit::Result<()> {
/// let generator = PassGenerator::builder()
///     .pkcs12("pass.p12")
///     .password("secret")
///     .wwdr_certificate("AppleWWDRCA.pem")
///     .template_dir("template")
///     .build()?;
///
/// let pass = Pass::new(
///     "Coupon",
///     "Example Inc.",
///     "pass.com.example.coupon",
///     "0001",
///     "ABCDE12345",
///     PassStyle::Coupon(PassStructure::default()),
/// );
/// let bytes = generator.generate(&pass).await?;
/// std::fs::write("coupon.pkpass", bytes)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PassGenerator {
    pkcs12: PathBuf,
    password: SecretString,
    wwdr_certificate: PathBuf,
    template_dir: PathBuf,
    work_root: Option<PathBuf>,
    localizables: Arc<dyn LocalizablesGenerator>,
    items: Arc<dyn ItemsCopier>,
    manifest: Arc<dyn ManifestGenerator>,
    pem: Arc<dyn PemGenerator>,
    signer: Arc<dyn SignatureGenerator>,
    zipper: Arc<dyn Zipper>,
}

impl PassGenerator {
    pub fn builder() -> PassGeneratorBuilder {
        PassGeneratorBuilder::new()
    }

    /// Build the signed archive for `pass` and return its bytes.
    ///
    /// # Errors
    ///
    /// The first failing step aborts the call with its error:
    /// - [`Error::Io`] for filesystem failures (including template name
    ///   collisions)
    /// - [`Error::InvalidPass`] / [`Error::InvalidPassJson`] for bad pass data
    /// - [`Error::KeyGenerationFailed`], [`Error::CertificateGenerationFailed`],
    ///   [`Error::SigningFailed`] or [`Error::CompressionFailed`] with the
    ///   tool's exit status
    /// - [`Error::ExecutableNotFound`] / [`Error::Timeout`] from the external
    ///   tools
    pub async fn generate(&self, pass: &Pass) -> Result<Vec<u8>> {
        let work_dir = self.create_work_dir()?;
        info!(
            serial = %pass.serial_number,
            dir = %work_dir.path().display(),
            "Generating pass"
        );

        let result = self.assemble(pass, work_dir.path()).await;
        remove_work_dir(work_dir).await;

        if let Ok(bytes) = &result {
            info!(serial = %pass.serial_number, size = bytes.len(), "Generated pass");
        }
        result
    }

    fn create_work_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORK_DIR_PREFIX);
        let dir = match &self.work_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    async fn assemble(&self, pass: &Pass, work: &Path) -> Result<Vec<u8>> {
        let bundle = work.join(BUNDLE_DIR_NAME);
        tokio::fs::create_dir(&bundle).await?;

        info!("Writing localizations");
        let table = pass.string_table();
        let written = self.localizables.generate(&table, &bundle).await?;
        debug!(languages = written.len(), "Localizations written");

        info!(template = %self.template_dir.display(), "Copying template assets");
        self.items.copy_items(&self.template_dir, &bundle).await?;

        info!("Writing pass.json");
        write_pass_json(pass, &bundle).await?;

        info!("Writing manifest");
        let manifest_path = bundle.join(MANIFEST_FILE_NAME);
        let manifest = self.manifest.generate(&bundle, &manifest_path).await?;
        debug!(entries = manifest.len(), "Manifest written");

        info!("Extracting key and certificate");
        let key = work.join(KEY_FILE_NAME);
        let certificate = work.join(CERTIFICATE_FILE_NAME);
        let (key_result, certificate_result) = tokio::join!(
            self.pem.extract_key(&self.pkcs12, &self.password, &key),
            self.pem
                .extract_certificate(&self.pkcs12, &self.password, &certificate),
        );
        // Both run to completion; a key failure takes precedence.
        key_result?;
        certificate_result?;

        info!("Signing manifest");
        self.signer
            .sign(&SignRequest {
                certificate: &certificate,
                key: &key,
                wwdr_certificate: &self.wwdr_certificate,
                manifest: &manifest_path,
                signature_out: &bundle.join(SIGNATURE_FILE_NAME),
                password: &self.password,
            })
            .await?;

        info!("Compressing bundle");
        let archive = work.join(ARCHIVE_FILE_NAME);
        self.zipper.zip(&bundle, &archive).await?;

        Ok(tokio::fs::read(&archive).await?)
    }
}

/// Remove the working directory, logging instead of failing.
async fn remove_work_dir(dir: TempDir) {
    let path = dir.path().to_path_buf();
    match tokio::task::spawn_blocking(move || dir.close()).await {
        Ok(Ok(())) => debug!(path = %path.display(), "Removed working directory"),
        Ok(Err(e)) => warn!(path = %path.display(), "Failed to remove working directory: {}", e),
        Err(e) => warn!(path = %path.display(), "Working directory cleanup did not run: {}", e),
    }
}

impl fmt::Debug for PassGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassGenerator")
            .field("pkcs12", &self.pkcs12)
            .field("wwdr_certificate", &self.wwdr_certificate)
            .field("template_dir", &self.template_dir)
            .field("work_root", &self.work_root)
            .finish_non_exhaustive()
    }
}

/// Configuration for a [`PassGenerator`].
///
/// The PKCS#12 bundle, the WWDR certificate and the template directory are
/// required. Every pipeline stage can be replaced, which is how the
/// generator is tested without external tools.
#[derive(Clone)]
pub struct PassGeneratorBuilder {
    pkcs12: Option<PathBuf>,
    password: Option<SecretString>,
    wwdr_certificate: Option<PathBuf>,
    template_dir: Option<PathBuf>,
    work_root: Option<PathBuf>,
    openssl: PathBuf,
    zip: PathBuf,
    tool_timeout: Option<Duration>,
    legacy_pkcs12: bool,
    process_runner: Option<Arc<dyn ProcessRunner>>,
    output_observer: Option<Arc<dyn OutputObserver>>,
    localizables: Option<Arc<dyn LocalizablesGenerator>>,
    items: Option<Arc<dyn ItemsCopier>>,
    manifest: Option<Arc<dyn ManifestGenerator>>,
    pem: Option<Arc<dyn PemGenerator>>,
    signer: Option<Arc<dyn SignatureGenerator>>,
    zipper: Option<Arc<dyn Zipper>>,
}

impl PassGeneratorBuilder {
    pub fn new() -> Self {
        Self {
            pkcs12: None,
            password: None,
            wwdr_certificate: None,
            template_dir: None,
            work_root: None,
            openssl: PathBuf::from(OpensslTool::DEFAULT_PROGRAM),
            zip: PathBuf::from(ZipCommand::DEFAULT_PROGRAM),
            tool_timeout: None,
            legacy_pkcs12: false,
            process_runner: None,
            output_observer: None,
            localizables: None,
            items: None,
            manifest: None,
            pem: None,
            signer: None,
            zipper: None,
        }
    }

    /// PKCS#12 bundle holding the pass type certificate and its key.
    pub fn pkcs12(mut self, path: impl AsRef<Path>) -> Self {
        self.pkcs12 = Some(path.as_ref().to_path_buf());
        self
    }

    /// Password of the PKCS#12 bundle. Defaults to the empty string.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::new(password.into()));
        self
    }

    /// Apple WWDR intermediate certificate (PEM).
    pub fn wwdr_certificate(mut self, path: impl AsRef<Path>) -> Self {
        self.wwdr_certificate = Some(path.as_ref().to_path_buf());
        self
    }

    /// Directory whose contents (icons, logos, ...) are copied into every pass.
    pub fn template_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.template_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Parent of the per-call working directories. Defaults to the system
    /// temp directory.
    pub fn work_root(mut self, path: impl AsRef<Path>) -> Self {
        self.work_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// `openssl` binary, as a path or a name looked up in `PATH`.
    pub fn openssl(mut self, program: impl AsRef<Path>) -> Self {
        self.openssl = program.as_ref().to_path_buf();
        self
    }

    /// `zip` binary, as a path or a name looked up in `PATH`.
    pub fn zip(mut self, program: impl AsRef<Path>) -> Self {
        self.zip = program.as_ref().to_path_buf();
        self
    }

    /// Kill any external tool running longer than `timeout`.
    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    /// Read PKCS#12 bundles with OpenSSL 3's legacy provider.
    pub fn legacy_pkcs12(mut self, legacy: bool) -> Self {
        self.legacy_pkcs12 = legacy;
        self
    }

    /// Runs the external tools. Defaults to [`TokioProcessRunner`].
    pub fn process_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.process_runner = Some(runner);
        self
    }

    /// Receives external tool output. Defaults to [`TracingObserver`].
    pub fn output_observer(mut self, observer: Arc<dyn OutputObserver>) -> Self {
        self.output_observer = Some(observer);
        self
    }

    /// Writes the per-language string tables. Defaults to [`StringsFileGenerator`].
    pub fn localizables(mut self, stage: Arc<dyn LocalizablesGenerator>) -> Self {
        self.localizables = Some(stage);
        self
    }

    /// Copies the template assets. Defaults to [`TemplateCopier`].
    pub fn items_copier(mut self, stage: Arc<dyn ItemsCopier>) -> Self {
        self.items = Some(stage);
        self
    }

    /// Writes `manifest.json`. Defaults to [`Sha1ManifestGenerator`].
    pub fn manifest(mut self, stage: Arc<dyn ManifestGenerator>) -> Self {
        self.manifest = Some(stage);
        self
    }

    /// Extracts the key and certificate. Defaults to `openssl pkcs12`.
    pub fn pem(mut self, stage: Arc<dyn PemGenerator>) -> Self {
        self.pem = Some(stage);
        self
    }

    /// Signs the manifest. Defaults to `openssl smime`.
    pub fn signer(mut self, stage: Arc<dyn SignatureGenerator>) -> Self {
        self.signer = Some(stage);
        self
    }

    /// Compresses the bundle. Defaults to the `zip` command.
    pub fn zipper(mut self, stage: Arc<dyn Zipper>) -> Self {
        self.zipper = Some(stage);
        self
    }

    /// Validate the builder configuration.
    ///
    /// Returns an error if:
    /// - The PKCS#12 bundle or the WWDR certificate is missing
    /// - The template directory is missing
    /// - A tool program is empty or the tool timeout is zero
    pub fn validate(&self) -> Result<()> {
        self.required().map(|_| ())
    }

    fn required(&self) -> Result<(&Path, &Path, &Path)> {
        let pkcs12 = self.pkcs12.as_deref().ok_or_else(|| {
            Error::MissingCredentials("No PKCS#12 certificate configured".into())
        })?;
        let wwdr = self.wwdr_certificate.as_deref().ok_or_else(|| {
            Error::MissingCredentials("No WWDR certificate configured".into())
        })?;
        let template = self
            .template_dir
            .as_deref()
            .ok_or_else(|| Error::Config("No template directory configured".into()))?;

        if self.openssl.as_os_str().is_empty() || self.zip.as_os_str().is_empty() {
            return Err(Error::Config("Tool program must not be empty".into()));
        }
        if self.tool_timeout == Some(Duration::ZERO) {
            return Err(Error::Config("Tool timeout must be greater than zero".into()));
        }
        Ok((pkcs12, wwdr, template))
    }

    /// Validate the configuration and assemble the generator.
    pub fn build(self) -> Result<PassGenerator> {
        let (pkcs12, wwdr, template) = self.required()?;
        let (pkcs12, wwdr_certificate, template_dir) =
            (pkcs12.to_path_buf(), wwdr.to_path_buf(), template.to_path_buf());

        let runner: Arc<dyn ProcessRunner> = match self.process_runner {
            Some(runner) => runner,
            None => Arc::new(TokioProcessRunner),
        };
        let observer: Arc<dyn OutputObserver> = match self.output_observer {
            Some(observer) => observer,
            None => Arc::new(TracingObserver),
        };
        let openssl = OpensslTool::new(runner.clone(), &self.openssl)
            .with_timeout(self.tool_timeout)
            .with_observer(observer.clone());

        let localizables: Arc<dyn LocalizablesGenerator> = match self.localizables {
            Some(stage) => stage,
            None => Arc::new(StringsFileGenerator),
        };
        let items: Arc<dyn ItemsCopier> = match self.items {
            Some(stage) => stage,
            None => Arc::new(TemplateCopier),
        };
        let manifest: Arc<dyn ManifestGenerator> = match self.manifest {
            Some(stage) => stage,
            None => Arc::new(Sha1ManifestGenerator),
        };
        let pem: Arc<dyn PemGenerator> = match self.pem {
            Some(stage) => stage,
            None => Arc::new(OpensslPemGenerator::new(openssl.clone()).legacy(self.legacy_pkcs12)),
        };
        let signer: Arc<dyn SignatureGenerator> = match self.signer {
            Some(stage) => stage,
            None => Arc::new(OpensslSignatureGenerator::new(openssl)),
        };
        let zipper: Arc<dyn Zipper> = match self.zipper {
            Some(stage) => stage,
            None => Arc::new(
                ZipCommand::new(runner, &self.zip)
                    .with_timeout(self.tool_timeout)
                    .with_observer(observer),
            ),
        };

        Ok(PassGenerator {
            pkcs12,
            password: self
                .password
                .unwrap_or_else(|| SecretString::new(String::new())),
            wwdr_certificate,
            template_dir,
            work_root: self.work_root,
            localizables,
            items,
            manifest,
            pem,
            signer,
            zipper,
        })
    }
}

impl Default for PassGeneratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PassGeneratorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassGeneratorBuilder")
            .field("pkcs12", &self.pkcs12)
            .field("wwdr_certificate", &self.wwdr_certificate)
            .field("template_dir", &self.template_dir)
            .field("work_root", &self.work_root)
            .field("openssl", &self.openssl)
            .field("zip", &self.zip)
            .field("tool_timeout", &self.tool_timeout)
            .field("legacy_pkcs12", &self.legacy_pkcs12)
            .finish_non_exhaustive()
    }
}
