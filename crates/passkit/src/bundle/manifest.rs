//! Manifest generation for pass bundles.
//!
//! The manifest maps every file of the bundle to the lowercase hex SHA-1 of
//! its content. It is the document that gets signed, which lets the wallet
//! verify that nothing in the bundle was altered.
//!
//! # Manifest keys
//!
//! | File | Key |
//! |------|-----|
//! | `pass.json` | `pass.json` |
//! | `en.lproj/pass.strings` | `en.lproj/pass.strings` |
//! | `images/logo.png` | `logo.png` |
//!
//! A file is keyed by its base name, prefixed with its parent directory only
//! when that directory's name contains `lproj`. This matches manifests
//! produced by existing pass tooling byte for byte.
//!
//! Template subdirectories are flattened, so two files that share a base name
//! in different subdirectories share a key. [`scan`] rejects the bundle when
//! their contents differ instead of letting one hash overwrite the other.

use crate::Result;
use async_trait::async_trait;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Name of the manifest inside the bundle.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Bundle-relative key → hex SHA-1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(BTreeMap<String, String>);

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, hash: impl Into<String>) {
        self.0.insert(key.into(), hash.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

impl FromIterator<(String, String)> for Manifest {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Manifest(iter.into_iter().collect())
    }
}

/// Lowercase hex SHA-1 of `data`.
pub fn sha1_hex(data: &[u8]) -> String {
    format!("{:x}", Sha1::digest(data))
}

/// Manifest key for a file at `path` (see the module docs).
pub fn manifest_key(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    let parent = path
        .parent()
        .and_then(Path::file_name)
        .map(|p| p.to_string_lossy());
    match parent {
        Some(parent) if parent.contains("lproj") => Some(format!("{parent}/{name}")),
        _ => Some(name.into_owned()),
    }
}

/// Hashes a bundle directory and writes its manifest.
#[async_trait]
pub trait ManifestGenerator: Send + Sync {
    /// Hash every regular file below `bundle_dir` and write the manifest as
    /// pretty-printed JSON to `manifest_path`.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::Error::Io`] if `bundle_dir` does not exist, or
    /// with kind `AlreadyExists` if two files with different content map to
    /// the same key. No
    /// manifest file is written in either case.
    async fn generate(&self, bundle_dir: &Path, manifest_path: &Path) -> Result<Manifest>;
}

/// [`ManifestGenerator`] hashing files in parallel with `rayon`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha1ManifestGenerator;

#[async_trait]
impl ManifestGenerator for Sha1ManifestGenerator {
    async fn generate(&self, bundle_dir: &Path, manifest_path: &Path) -> Result<Manifest> {
        let root = bundle_dir.to_path_buf();
        let manifest = tokio::task::spawn_blocking(move || scan(&root)).await??;
        tokio::fs::write(manifest_path, manifest.to_json()?).await?;
        debug!(files = manifest.len(), path = %manifest_path.display(), "Wrote manifest");
        Ok(manifest)
    }
}

/// Hash every regular file below `root`.
pub fn scan(root: &Path) -> Result<Manifest> {
    if !fs::metadata(root)?.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Not a directory: {}", root.display()),
        )
        .into());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    let hashed: Vec<(String, &Path, String)> = files
        .par_iter()
        .filter_map(|path| manifest_key(path).map(|key| (key, path)))
        .map(|(key, path)| fs::read(path).map(|data| (key, path.as_path(), sha1_hex(&data))))
        .collect::<io::Result<_>>()?;

    let mut owners: BTreeMap<&str, (&Path, &str)> = BTreeMap::new();
    for (key, path, hash) in &hashed {
        match owners.insert(key.as_str(), (*path, hash.as_str())) {
            Some((other, other_hash)) if other_hash != hash.as_str() => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!(
                        "Manifest key {} used by both {} and {}",
                        key,
                        other.display(),
                        path.display()
                    ),
                )
                .into());
            }
            _ => {}
        }
    }

    Ok(hashed.into_iter().map(|(key, _, hash)| (key, hash)).collect())
}
