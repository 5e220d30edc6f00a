//! External tool invocation.
//!
//! Every pipeline step that shells out (`openssl`, `zip`) goes through a
//! [`ProcessRunner`]. The default [`TokioProcessRunner`] spawns the child on
//! the tokio runtime, streams its stdout/stderr to an [`OutputObserver`] as the
//! chunks arrive and yields the exit code. Interpreting the exit code is left
//! to the caller: each step maps a non-zero status to its own error variant.
//!
//! # Examples
//!
//! ```no_run
//! use passkit::process::{Invocation, ProcessRunner, TokioProcessRunner, TracingObserver};
//!
//! # async fn run() -> passkit::Result<()> {
//! let status = TokioProcessRunner
//!     .run(&Invocation::new("zip").arg("-v"), &TracingObserver)
//!     .await?;
//! assert_eq!(status, 0);
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Exit code reported when the child was terminated by a signal.
pub const SIGNALED_EXIT_STATUS: i32 = -1;

/// Which pipe a chunk of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Receives child output while the process runs.
pub trait OutputObserver: Send + Sync {
    fn on_output(&self, stream: OutputStream, chunk: &[u8]);
}

/// Forwards tool output to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl OutputObserver for TracingObserver {
    fn on_output(&self, stream: OutputStream, chunk: &[u8]) {
        let text = String::from_utf8_lossy(chunk);
        let text = text.trim_end();
        if !text.is_empty() {
            debug!(?stream, "{}", text);
        }
    }
}

/// A single external program invocation.
///
/// Environment values are never printed by the [`fmt::Debug`] impl, so a
/// password handed to the child through the environment stays out of logs.
#[derive(Clone)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
    envs: Vec<(OsString, OsString)>,
    timeout: Option<Duration>,
}

impl Invocation {
    /// Create an invocation of `program`: an absolute path, a relative path,
    /// or a bare name looked up in `PATH`.
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            current_dir: None,
            envs: Vec::new(),
            timeout: None,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments in order.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Run the child with `dir` as its working directory.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set an environment variable for the child only.
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// Kill the child and fail with [`Error::Timeout`] once `timeout` elapses.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Program as given to [`Invocation::new`], before `PATH` lookup.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments passed to the program.
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Working directory of the child, if one was set.
    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Time the child may run before it is killed.
    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Value of an environment variable set on this invocation.
    pub fn get_env(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.envs
            .iter()
            .rev()
            .find(|(k, _)| k == key.as_ref())
            .map(|(_, v)| v.as_os_str())
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env_keys: Vec<_> = self.envs.iter().map(|(k, _)| k).collect();
        f.debug_struct("Invocation")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("current_dir", &self.current_dir)
            .field("env", &env_keys)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Runs external programs to completion.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `invocation`, streaming its output to `observer`, and return the
    /// exit code ([`SIGNALED_EXIT_STATUS`] if the child was killed by a signal).
    ///
    /// # Errors
    ///
    /// - [`Error::ExecutableNotFound`] if a bare program name is not in `PATH`
    /// - [`Error::Timeout`] if the invocation's timeout expired
    /// - [`Error::Io`] if the child could not be spawned or its pipes failed
    async fn run(&self, invocation: &Invocation, observer: &dyn OutputObserver) -> Result<i32>;
}

/// [`ProcessRunner`] backed by `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: &Invocation, observer: &dyn OutputObserver) -> Result<i32> {
        let program = resolve_executable(invocation.program())?;

        let mut command = Command::new(&program);
        command
            .args(&invocation.args)
            .envs(invocation.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.current_dir {
            command.current_dir(dir);
        }

        debug!(
            program = %program.display(),
            args = ?invocation.args,
            cwd = ?invocation.current_dir,
            "Running external tool"
        );

        let mut child = command.spawn()?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let completion = async {
            let (out, err) = tokio::join!(
                pump(stdout, OutputStream::Stdout, observer),
                pump(stderr, OutputStream::Stderr, observer),
            );
            out?;
            err?;
            child.wait().await
        };

        let status = match invocation.timeout {
            Some(limit) => {
                let outcome = tokio::time::timeout(limit, completion).await;
                match outcome {
                    Ok(status) => status?,
                    Err(_) => {
                        if let Err(e) = child.kill().await {
                            warn!(program = %program.display(), "Failed to kill timed out tool: {}", e);
                        }
                        return Err(Error::Timeout {
                            program: program.display().to_string(),
                            after: limit,
                        });
                    }
                }
            }
            None => completion.await?,
        };

        let code = status.code().unwrap_or(SIGNALED_EXIT_STATUS);
        debug!(program = %program.display(), code, "External tool exited");
        Ok(code)
    }
}

async fn pump<R>(
    reader: Option<R>,
    stream: OutputStream,
    observer: &dyn OutputObserver,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok(());
    };
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        observer.on_output(stream, &buf[..n]);
    }
}

/// Resolve `program` to a path that can be spawned.
///
/// Absolute paths are returned unchanged. Relative paths with more than one
/// component are joined onto the current directory, since the child may run
/// in another working directory. Bare names are looked up in `PATH`.
pub fn resolve_executable(program: &Path) -> Result<PathBuf> {
    if program.is_absolute() {
        return Ok(program.to_path_buf());
    }
    if program.components().count() > 1 {
        return Ok(std::env::current_dir()?.join(program));
    }
    find_in_path(program, std::env::var_os("PATH").as_deref())
        .ok_or_else(|| Error::ExecutableNotFound(program.display().to_string()))
}

/// Search the directories of `path_var` for an executable called `name`.
pub fn find_in_path(name: &Path, path_var: Option<&OsStr>) -> Option<PathBuf> {
    let path_var = path_var?;
    std::env::split_paths(path_var)
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| candidates(&dir, name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(windows)]
fn candidates(dir: &Path, name: &Path) -> Vec<PathBuf> {
    let plain = dir.join(name);
    let exe = plain.with_extension("exe");
    vec![plain, exe]
}

#[cfg(not(windows))]
fn candidates(dir: &Path, name: &Path) -> Vec<PathBuf> {
    vec![dir.join(name)]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
