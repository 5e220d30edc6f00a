//! Copying template assets (icons, logos, strip images) into a bundle.
//!
//! Without language directories the template's contents are copied into the
//! bundle root. Once `<lang>.lproj` directories exist, every language gets its
//! own full copy of the template instead. Nothing is ever overwritten: a name
//! collision aborts the copy.

use super::localizables::LPROJ_EXTENSION;
use crate::Result;
use async_trait::async_trait;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Copies template assets into a bundle directory.
#[async_trait]
pub trait ItemsCopier: Send + Sync {
    async fn copy_items(&self, template_dir: &Path, bundle_dir: &Path) -> Result<()>;
}

/// [`ItemsCopier`] that walks the template with `walkdir` on the blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateCopier;

#[async_trait]
impl ItemsCopier for TemplateCopier {
    async fn copy_items(&self, template_dir: &Path, bundle_dir: &Path) -> Result<()> {
        let template_dir = template_dir.to_path_buf();
        let bundle_dir = bundle_dir.to_path_buf();
        tokio::task::spawn_blocking(move || copy_template(&template_dir, &bundle_dir)).await?
    }
}

/// Copy `template_dir` into `bundle_dir`, once per language directory if any exist.
pub fn copy_template(template_dir: &Path, bundle_dir: &Path) -> Result<()> {
    let languages = language_dirs(bundle_dir)?;
    if languages.is_empty() {
        copy_contents(template_dir, bundle_dir)?;
        debug!(template = %template_dir.display(), "Copied template into bundle root");
    } else {
        for dir in &languages {
            copy_contents(template_dir, dir)?;
        }
        debug!(
            template = %template_dir.display(),
            languages = languages.len(),
            "Copied template into every language directory"
        );
    }
    Ok(())
}

/// Immediate subdirectories of `dir` with an `.lproj` extension.
pub fn language_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir()
            && path.extension().is_some_and(|ext| ext == LPROJ_EXTENSION)
        {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Recursively copy everything below `src` into `dest`, failing on any existing name.
fn copy_contents(src: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(src)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry.path().strip_prefix(src).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "Failed to compute relative path")
        })?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir(&target)?;
        } else {
            let mut reader = File::open(entry.path())?;
            let mut writer = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&target)
                .map_err(|e| {
                    io::Error::new(e.kind(), format!("{}: {}", target.display(), e))
                })?;
            io::copy(&mut reader, &mut writer)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use tempfile::tempdir;

    fn template(dir: &Path) -> PathBuf {
        let template = dir.join("template");
        fs::create_dir_all(template.join("nested")).unwrap();
        fs::write(template.join("icon.png"), b"icon").unwrap();
        fs::write(template.join("nested/strip.png"), b"strip").unwrap();
        template
    }

    #[tokio::test]
    async fn test_copies_into_root_without_languages() {
        let dir = tempdir().unwrap();
        let template = template(dir.path());
        let bundle = dir.path().join("bundle");
        fs::create_dir(&bundle).unwrap();

        TemplateCopier.copy_items(&template, &bundle).await.unwrap();

        assert_eq!(fs::read(bundle.join("icon.png")).unwrap(), b"icon");
        assert_eq!(fs::read(bundle.join("nested/strip.png")).unwrap(), b"strip");
    }

    #[tokio::test]
    async fn test_copies_into_each_language() {
        let dir = tempdir().unwrap();
        let template = template(dir.path());
        let bundle = dir.path().join("bundle");
        fs::create_dir_all(bundle.join("en.lproj")).unwrap();
        fs::create_dir_all(bundle.join("de.lproj")).unwrap();

        TemplateCopier.copy_items(&template, &bundle).await.unwrap();

        for lang in ["en.lproj", "de.lproj"] {
            assert!(bundle.join(lang).join("icon.png").is_file());
            assert!(bundle.join(lang).join("nested/strip.png").is_file());
        }
        assert!(!bundle.join("icon.png").exists());
    }

    #[tokio::test]
    async fn test_collision_is_fatal() {
        let dir = tempdir().unwrap();
        let template = template(dir.path());
        let bundle = dir.path().join("bundle");
        fs::create_dir_all(bundle.join("en.lproj")).unwrap();
        fs::write(bundle.join("en.lproj/icon.png"), b"existing").unwrap();

        let err = TemplateCopier.copy_items(&template, &bundle).await.unwrap_err();
        assert!(matches!(err, Error::Io(e) if e.kind() == io::ErrorKind::AlreadyExists));
        assert_eq!(fs::read(bundle.join("en.lproj/icon.png")).unwrap(), b"existing");
    }

    #[tokio::test]
    async fn test_missing_template_fails() {
        let dir = tempdir().unwrap();
        let err = TemplateCopier
            .copy_items(&dir.path().join("missing"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_language_dirs_ignores_files() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("fr.lproj")).unwrap();
        fs::write(dir.path().join("notes.lproj"), b"file").unwrap();
        fs::create_dir(dir.path().join("images")).unwrap();
        assert_eq!(language_dirs(dir.path()).unwrap(), vec![dir.path().join("fr.lproj")]);
    }
}
