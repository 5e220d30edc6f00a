//! Shared plumbing for invoking the `openssl` command-line tool.

use crate::process::{Invocation, OutputObserver, ProcessRunner, TokioProcessRunner, TracingObserver};
use crate::Result;
use secrecy::{ExposeSecret, SecretString};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Environment variable the certificate password is passed through.
///
/// Referenced from the command line as `env:PASSKIT_CERT_PASSWORD` so the
/// password never appears in the child's argument list.
pub const PASSWORD_ENV: &str = "PASSKIT_CERT_PASSWORD";

/// `-passin`/`-passout` argument value reading [`PASSWORD_ENV`].
pub(crate) fn password_source() -> String {
    format!("env:{PASSWORD_ENV}")
}

/// Location and execution settings of the `openssl` binary.
#[derive(Clone)]
pub struct OpensslTool {
    runner: Arc<dyn ProcessRunner>,
    observer: Arc<dyn OutputObserver>,
    program: PathBuf,
    timeout: Option<Duration>,
}

impl OpensslTool {
    /// Default program name, resolved through `PATH`.
    pub const DEFAULT_PROGRAM: &'static str = "openssl";

    pub fn new(runner: Arc<dyn ProcessRunner>, program: impl AsRef<Path>) -> Self {
        Self {
            runner,
            observer: Arc::new(TracingObserver),
            program: program.as_ref().to_path_buf(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Receive the tool's stdout/stderr instead of the default
    /// [`TracingObserver`].
    pub fn with_observer(mut self, observer: Arc<dyn OutputObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run `openssl <args>` with `password` exported as [`PASSWORD_ENV`].
    pub(crate) async fn run(&self, args: Vec<OsString>, password: &SecretString) -> Result<i32> {
        let invocation = Invocation::new(&self.program)
            .args(args)
            .env(PASSWORD_ENV, password.expose_secret())
            .timeout(self.timeout);
        self.runner.run(&invocation, self.observer.as_ref()).await
    }
}

impl Default for OpensslTool {
    fn default() -> Self {
        Self::new(Arc::new(TokioProcessRunner), Self::DEFAULT_PROGRAM)
    }
}

impl fmt::Debug for OpensslTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpensslTool")
            .field("program", &self.program)
            .field("timeout", &self.timeout)
            .finish()
    }
}
