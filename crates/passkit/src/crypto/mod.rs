//! Certificate conversion and manifest signing.
//!
//! All cryptography is delegated to the `openssl` command-line tool; this
//! module only builds its command lines and maps exit codes to errors.

pub mod openssl;
pub mod pem;
pub mod signature;

pub use openssl::{OpensslTool, PASSWORD_ENV};
pub use pem::{OpensslPemGenerator, PemGenerator};
pub use signature::{OpensslSignatureGenerator, SignRequest, SignatureGenerator, SIGNATURE_FILE_NAME};
