//! Detached manifest signature.

use super::openssl::{password_source, OpensslTool};
use crate::{Error, Result};
use async_trait::async_trait;
use secrecy::SecretString;
use std::ffi::OsString;
use std::path::Path;
use tracing::debug;

/// Name of the signature file inside the bundle.
pub const SIGNATURE_FILE_NAME: &str = "signature";

/// Inputs of one signing operation.
pub struct SignRequest<'a> {
    /// Signer certificate (PEM).
    pub certificate: &'a Path,
    /// Signer private key (PEM), encrypted with `password`.
    pub key: &'a Path,
    /// Wallet authority intermediate certificate, included in the chain.
    pub wwdr_certificate: &'a Path,
    /// The file that is signed.
    pub manifest: &'a Path,
    /// Where the DER-encoded signature is written.
    pub signature_out: &'a Path,
    pub password: &'a SecretString,
}

/// Produces a detached signature over a manifest.
#[async_trait]
pub trait SignatureGenerator: Send + Sync {
    /// # Errors
    ///
    /// [`Error::SigningFailed`] if the tool exits non-zero.
    async fn sign(&self, request: &SignRequest<'_>) -> Result<()>;
}

/// [`SignatureGenerator`] running `openssl smime -sign`.
#[derive(Debug, Clone, Default)]
pub struct OpensslSignatureGenerator {
    tool: OpensslTool,
}

impl OpensslSignatureGenerator {
    pub fn new(tool: OpensslTool) -> Self {
        Self { tool }
    }
}

#[async_trait]
impl SignatureGenerator for OpensslSignatureGenerator {
    async fn sign(&self, request: &SignRequest<'_>) -> Result<()> {
        let args: Vec<OsString> = vec![
            "smime".into(),
            "-binary".into(),
            "-sign".into(),
            "-certfile".into(),
            request.wwdr_certificate.into(),
            "-signer".into(),
            request.certificate.into(),
            "-inkey".into(),
            request.key.into(),
            "-in".into(),
            request.manifest.into(),
            "-out".into(),
            request.signature_out.into(),
            "-outform".into(),
            "DER".into(),
            "-passin".into(),
            password_source().into(),
        ];

        let status = self.tool.run(args, request.password).await?;
        if status != 0 {
            return Err(Error::SigningFailed { status });
        }
        debug!(path = %request.signature_out.display(), "Signed manifest");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::openssl::testing::RecordingRunner;
    use std::sync::Arc;

    fn request<'a>(password: &'a SecretString) -> SignRequest<'a> {
        SignRequest {
            certificate: Path::new("cert.pem"),
            key: Path::new("key.pem"),
            wwdr_certificate: Path::new("wwdr.pem"),
            manifest: Path::new("bundle/manifest.json"),
            signature_out: Path::new("bundle/signature"),
            password,
        }
    }

    #[tokio::test]
    async fn test_sign_arguments() {
        let runner = Arc::new(RecordingRunner::new(0));
        let signer = OpensslSignatureGenerator::new(OpensslTool::new(runner.clone(), "openssl"));
        let password = SecretString::new("pw".into());
        signer.sign(&request(&password)).await.unwrap();

        assert_eq!(
            runner.args(0),
            vec![
                "smime", "-binary", "-sign",
                "-certfile", "wwdr.pem",
                "-signer", "cert.pem",
                "-inkey", "key.pem",
                "-in", "bundle/manifest.json",
                "-out", "bundle/signature",
                "-outform", "DER",
                "-passin", "env:PASSKIT_CERT_PASSWORD",
            ]
        );
    }

    #[tokio::test]
    async fn test_sign_failure_carries_status() {
        let runner = Arc::new(RecordingRunner::new(3));
        let signer = OpensslSignatureGenerator::new(OpensslTool::new(runner, "openssl"));
        let password = SecretString::new("pw".into());
        let err = signer.sign(&request(&password)).await.unwrap_err();
        assert!(matches!(err, Error::SigningFailed { status: 3 }));
        assert_eq!(err.exit_status(), Some(3));
    }
}
