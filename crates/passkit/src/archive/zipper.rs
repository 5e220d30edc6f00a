//! Bundle compression.
//!
//! The pipeline compresses the bundle with the external `zip` tool
//! ([`ZipCommand`]). [`ZipWriterZipper`] produces an equivalent archive
//! in-process with the `zip` crate, for hosts without the tool.

use crate::process::{Invocation, OutputObserver, ProcessRunner, TokioProcessRunner, TracingObserver};
use crate::{Error, Result};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Compresses a bundle directory into an archive file.
#[async_trait]
pub trait Zipper: Send + Sync {
    /// Archive the contents of `source_dir` recursively into `archive`.
    /// Entry names are relative to `source_dir`.
    ///
    /// # Errors
    ///
    /// [`Error::CompressionFailed`] if the tool exits non-zero.
    async fn zip(&self, source_dir: &Path, archive: &Path) -> Result<()>;
}

/// [`Zipper`] running `zip -r -q <archive> .` inside the source directory.
#[derive(Clone)]
pub struct ZipCommand {
    runner: Arc<dyn ProcessRunner>,
    observer: Arc<dyn OutputObserver>,
    program: PathBuf,
    timeout: Option<Duration>,
}

impl ZipCommand {
    /// Default program name, resolved through `PATH`.
    pub const DEFAULT_PROGRAM: &'static str = "zip";

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
}

impl Default for ZipCommand {
    fn default() -> Self {
        Self::new(Arc::new(TokioProcessRunner), Self::DEFAULT_PROGRAM)
    }
}

impl fmt::Debug for ZipCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipCommand")
            .field("program", &self.program)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl Zipper for ZipCommand {
    async fn zip(&self, source_dir: &Path, archive: &Path) -> Result<()> {
        // The child runs inside source_dir, so a relative destination would
        // land in the bundle itself.
        let archive = if archive.is_absolute() {
            archive.to_path_buf()
        } else {
            std::env::current_dir()?.join(archive)
        };

        let args = [OsStr::new("-r"), OsStr::new("-q"), archive.as_os_str(), OsStr::new(".")];
        let invocation = Invocation::new(&self.program)
            .args(args)
            .current_dir(source_dir)
            .timeout(self.timeout);
        let status = self.runner.run(&invocation, self.observer.as_ref()).await?;
        if status != 0 {
            return Err(Error::CompressionFailed { status });
        }
        debug!(path = %archive.display(), "Compressed bundle");
        Ok(())
    }
}

/// In-process [`Zipper`] using the `zip` crate with deflate compression.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipWriterZipper;

#[async_trait]
impl Zipper for ZipWriterZipper {
    async fn zip(&self, source_dir: &Path, archive: &Path) -> Result<()> {
        let source = source_dir.to_path_buf();
        let dest = archive.to_path_buf();
        tokio::task::spawn_blocking(move || write_archive(&source, &dest)).await??;
        debug!(path = %archive.display(), "Compressed bundle");
        Ok(())
    }
}

/// Write every file and directory below `source_dir` into a new zip archive.
pub fn write_archive(source_dir: &Path, archive: &Path) -> Result<()> {
    if !source_dir.is_dir() {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Bundle directory not found: {}", source_dir.display()),
        )));
    }

    let mut zip = ZipWriter::new(File::create(archive)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let walker = WalkDir::new(source_dir)
        .min_depth(1)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|e| Error::Io(io::Error::other(e)))?;
        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|e| Error::Io(io::Error::other(e)))?;
        // Zip entry names always use forward slashes.
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{name}/"), options)?;
        } else {
            zip.start_file(name, options)?;
            zip.write_all(&fs::read(entry.path())?)?;
        }
    }

    zip.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::openssl::testing::RecordingRunner;
    use std::io::Read;
    use tempfile::tempdir;
    use zip::ZipArchive;

    #[tokio::test]
    async fn test_zip_command_arguments() {
        let runner = Arc::new(RecordingRunner::new(0));
        let zipper = ZipCommand::new(runner.clone(), "zip").with_timeout(Some(Duration::from_secs(5)));
        zipper
            .zip(Path::new("/work/bundle"), Path::new("/work/pass.pkpass"))
            .await
            .unwrap();

        assert_eq!(runner.args(0), vec!["-r", "-q", "/work/pass.pkpass", "."]);
        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls[0].get_current_dir(), Some(Path::new("/work/bundle")));
        assert_eq!(calls[0].get_timeout(), Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_zip_command_absolutizes_destination() {
        let runner = Arc::new(RecordingRunner::new(0));
        ZipCommand::new(runner.clone(), "zip")
            .zip(Path::new("/work/bundle"), Path::new("out.pkpass"))
            .await
            .unwrap();
        let dest = PathBuf::from(&runner.args(0)[2]);
        assert!(dest.is_absolute());
        assert!(dest.ends_with("out.pkpass"));
    }

    #[tokio::test]
    async fn test_zip_command_failure() {
        let runner = Arc::new(RecordingRunner::new(12));
        let err = ZipCommand::new(runner, "zip")
            .zip(Path::new("/work/bundle"), Path::new("/work/pass.pkpass"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CompressionFailed { status: 12 }));
    }

    #[tokio::test]
    async fn test_zip_writer_archives_relative_entries() {
        let dir = tempdir().unwrap();
        let bundle = dir.path().join("bundle");
        fs::create_dir_all(bundle.join("en.lproj")).unwrap();
        fs::write(bundle.join("pass.json"), b"{}").unwrap();
        fs::write(bundle.join("en.lproj").join("pass.strings"), b"\"a\" = \"b\";\n").unwrap();
        let archive = dir.path().join("pass.pkpass");

        ZipWriterZipper.zip(&bundle, &archive).await.unwrap();

        let mut zip = ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let mut names: Vec<String> = zip.file_names().map(String::from).collect();
        names.sort();
        assert_eq!(names, vec!["en.lproj/", "en.lproj/pass.strings", "pass.json"]);

        let mut content = String::new();
        zip.by_name("pass.json").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "{}");
    }

    #[tokio::test]
    async fn test_zip_writer_missing_source() {
        let dir = tempdir().unwrap();
        let err = ZipWriterZipper
            .zip(&dir.path().join("nope"), &dir.path().join("out.zip"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(e) if e.kind() == io::ErrorKind::NotFound));
    }
}
