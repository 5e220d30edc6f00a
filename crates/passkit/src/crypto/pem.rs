//! PKCS#12 to PEM conversion.
//!
//! The signing command needs the signer's key and certificate as separate
//! PEM files, while pass type certificates are distributed as PKCS#12
//! bundles. Both extractions only depend on the PKCS#12 file, so they can run
//! concurrently.

use super::openssl::{password_source, OpensslTool};
use crate::{Error, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::ffi::OsString;
use std::path::Path;
use tracing::debug;

/// Extracts PEM files from a PKCS#12 bundle.
#[async_trait]
pub trait PemGenerator: Send + Sync {
    /// Write the private key to `key_out`, encrypted with `password`.
    ///
    /// # Errors
    ///
    /// [`Error::KeyGenerationFailed`] if the tool exits non-zero.
    async fn extract_key(&self, pkcs12: &Path, password: &SecretString, key_out: &Path) -> Result<()>;

    /// Write the leaf certificate (no key, no CA certificates) to `cert_out`.
    ///
    /// # Errors
    ///
    /// [`Error::CertificateGenerationFailed`] if the tool exits non-zero.
    async fn extract_certificate(
        &self,
        pkcs12: &Path,
        password: &SecretString,
        cert_out: &Path,
    ) -> Result<()>;
}

/// [`PemGenerator`] running `openssl pkcs12`.
#[derive(Debug, Clone, Default)]
pub struct OpensslPemGenerator {
    tool: OpensslTool,
    legacy: bool,
}

impl OpensslPemGenerator {
    pub fn new(tool: OpensslTool) -> Self {
        Self { tool, legacy: false }
    }

    /// Pass `-legacy`, needed by OpenSSL 3 for RC2-encrypted PKCS#12 files.
    pub fn legacy(mut self, legacy: bool) -> Self {
        self.legacy = legacy;
        self
    }

    fn base_args(&self, pkcs12: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["pkcs12".into(), "-in".into(), pkcs12.into()];
        if self.legacy {
            args.push("-legacy".into());
        }
        args
    }
}

#[async_trait]
impl PemGenerator for OpensslPemGenerator {
    async fn extract_key(&self, pkcs12: &Path, password: &SecretString, key_out: &Path) -> Result<()> {
        let mut args = self.base_args(pkcs12);
        args.extend(["-nocerts".into(), "-passin".into(), password_source().into()]);
        // An empty passphrase cannot encrypt PEM output.
        if password.expose_secret().is_empty() {
            args.push("-nodes".into());
        } else {
            args.extend(["-passout".into(), password_source().into()]);
        }
        args.extend(["-out".into(), key_out.into()]);

        let status = self.tool.run(args, password).await?;
        if status != 0 {
            return Err(Error::KeyGenerationFailed { status });
        }
        debug!(path = %key_out.display(), "Extracted private key");
        Ok(())
    }

    async fn extract_certificate(
        &self,
        pkcs12: &Path,
        password: &SecretString,
        cert_out: &Path,
    ) -> Result<()> {
        let mut args = self.base_args(pkcs12);
        args.extend([
            "-clcerts".into(),
            "-nokeys".into(),
            "-passin".into(),
            password_source().into(),
            "-out".into(),
            cert_out.into(),
        ]);

        let status = self.tool.run(args, password).await?;
        if status != 0 {
            return Err(Error::CertificateGenerationFailed { status });
        }
        debug!(path = %cert_out.display(), "Extracted certificate");
        Ok(())
    }
}
