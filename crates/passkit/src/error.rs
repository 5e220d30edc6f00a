//! Error types for pass bundle generation.
//!
//! This module defines the [`enum@Error`] enum covering every way a
//! generation can fail: invalid pass data, a failing external tool, a
//! missing executable, or a filesystem problem.
//!
//! # See Also
//!
//! - [`crate::Result`] - Convenience type alias using this error

use std::time::Duration;
use thiserror::Error;

/// Error type for pass generation.
///
/// All public functions in this crate return [`crate::Result<T>`], which uses this error type.
/// Every variant is fatal to the current generation; nothing is retried.
///
/// # Examples
///
/// ```no_run
/// use passkit::{Error, PassGenerator};
/// # async fn run(generator: PassGenerator, pass: passkit::Pass) {
/// match generator.generate(&pass).await {
///     Ok(bytes) => println!("{} bytes", bytes.len()),
///     Err(Error::KeyGenerationFailed { status }) => eprintln!("bad certificate or password ({status})"),
///     Err(Error::ExecutableNotFound(name)) => eprintln!("install {name}"),
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// # }
/// ```
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem operation failed.
    ///
    /// Directory creation, copying, reading or writing inside the working
    /// directory, propagated as-is.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The pass could not be encoded to (or decoded from) its JSON document.
    #[error("Invalid pass JSON: {0}")]
    InvalidPassJson(String),

    /// The pass violates a structural rule of the wallet format.
    ///
    /// See [`crate::Pass::validate`].
    #[error("Invalid pass: {0}")]
    InvalidPass(String),

    /// Extracting the PEM private key from the PKCS#12 bundle failed.
    #[error("Private key generation failed (exit status {status})")]
    KeyGenerationFailed {
        /// Exit status of the certificate tool.
        status: i32,
    },

    /// Extracting the PEM certificate from the PKCS#12 bundle failed.
    #[error("Certificate generation failed (exit status {status})")]
    CertificateGenerationFailed {
        /// Exit status of the certificate tool.
        status: i32,
    },

    /// Producing the detached manifest signature failed.
    #[error("Signing failed (exit status {status})")]
    SigningFailed {
        /// Exit status of the certificate tool.
        status: i32,
    },

    /// Compressing the bundle directory failed.
    #[error("Cannot compress bundle (exit status {status})")]
    CompressionFailed {
        /// Exit status of the compression tool.
        status: i32,
    },

    /// A bare executable name could not be resolved through `PATH`.
    #[error("Executable not found: {0}")]
    ExecutableNotFound(String),

    /// An external tool ran longer than the configured timeout and was killed.
    #[error("{program} timed out after {after:?}")]
    Timeout {
        /// Program that was killed.
        program: String,
        /// Configured limit.
        after: Duration,
    },

    /// Required signing inputs were not configured.
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Invalid generator configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A manifest or other JSON document could not be read or written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ZIP archive could not be read.
    ///
    /// Only produced by [`crate::archive::PassArchive`].
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A produced archive is missing entries or fails verification.
    #[error("Invalid archive: {0}")]
    InvalidArchive(String),
}

impl Error {
    /// Exit status carried by the external-tool failure variants.
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            Error::KeyGenerationFailed { status }
            | Error::CertificateGenerationFailed { status }
            | Error::SigningFailed { status }
            | Error::CompressionFailed { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Io(std::io::Error::other(format!("Background task failed: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status_only_for_tool_failures() {
        assert_eq!(Error::SigningFailed { status: 4 }.exit_status(), Some(4));
        assert_eq!(Error::CompressionFailed { status: 12 }.exit_status(), Some(12));
        assert_eq!(Error::ExecutableNotFound("zip".into()).exit_status(), None);
    }

    #[test]
    fn test_display_includes_status() {
        let err = Error::KeyGenerationFailed { status: 1 };
        assert!(err.to_string().contains("exit status 1"));
    }
}
