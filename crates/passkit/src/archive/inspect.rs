//! Reading produced pass archives back.
//!
//! # Examples
//!
//! ```no_run
//! use passkit::PassArchive;
//!
//! let bytes = std::fs::read("ticket.pkpass")?;
//! let archive = PassArchive::from_bytes(&bytes)?;
//! archive.verify_manifest()?;
//! println!("{}", archive.pass()?.serial_number);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::bundle::manifest::{manifest_key, sha1_hex, MANIFEST_FILE_NAME};
use crate::bundle::pass_json::{decode_pass, PASS_JSON_FILE_NAME};
use crate::bundle::Manifest;
use crate::crypto::SIGNATURE_FILE_NAME;
use crate::model::Pass;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

/// An opened `.pkpass` archive held in memory.
#[derive(Debug, Clone)]
pub struct PassArchive {
    entries: BTreeMap<String, Vec<u8>>,
}

impl PassArchive {
    /// Read every file entry of the zip archive in `data`.
    ///
    /// # Errors
    ///
    /// [`Error::Zip`] if `data` is not a readable zip archive.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(data))?;
        let mut entries = BTreeMap::new();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut content = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut content)?;
            entries.insert(name, content);
        }
        Ok(Self { entries })
    }

    /// Names of the file entries, sorted.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entry(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// The decoded `pass.json`.
    pub fn pass(&self) -> Result<Pass> {
        decode_pass(self.required(PASS_JSON_FILE_NAME)?)
    }

    /// The decoded `manifest.json`.
    pub fn manifest(&self) -> Result<Manifest> {
        Ok(serde_json::from_slice(self.required(MANIFEST_FILE_NAME)?)?)
    }

    /// The DER-encoded detached signature, if present.
    pub fn signature(&self) -> Option<&[u8]> {
        self.entry(SIGNATURE_FILE_NAME)
    }

    /// Check that the manifest covers exactly the archive's files and that
    /// every recorded hash matches the entry content.
    ///
    /// The manifest itself and the signature are not part of the manifest.
    /// Entries are matched to manifest keys with the same flattening rule the
    /// generator uses, so same-named files in different non-`lproj`
    /// directories must have identical content.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArchive`] naming the first offending entry.
    pub fn verify_manifest(&self) -> Result<()> {
        let manifest = self.manifest()?;
        let mut seen = BTreeMap::new();

        for (name, content) in &self.entries {
            if name == MANIFEST_FILE_NAME || name == SIGNATURE_FILE_NAME {
                continue;
            }
            let key = manifest_key(Path::new(name))
                .ok_or_else(|| Error::InvalidArchive(format!("unusable entry name {name}")))?;
            let expected = manifest
                .get(&key)
                .ok_or_else(|| Error::InvalidArchive(format!("{name} is not in the manifest")))?;
            if sha1_hex(content) != expected {
                return Err(Error::InvalidArchive(format!("hash mismatch for {name}")));
            }
            seen.insert(key, name);
        }

        if let Some(missing) = manifest.keys().find(|key| !seen.contains_key(*key)) {
            return Err(Error::InvalidArchive(format!(
                "manifest lists {missing} but the archive has no such file"
            )));
        }
        Ok(())
    }

    fn required(&self, name: &str) -> Result<&[u8]> {
        self.entry(name)
            .ok_or_else(|| Error::InvalidArchive(format!("missing {name}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn archive(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, content) in files {
            if name.ends_with('/') {
                zip.add_directory(*name, options).unwrap();
            } else {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content).unwrap();
            }
        }
        zip.finish().unwrap().into_inner()
    }

    fn manifest_for(files: &[(&str, &[u8])]) -> Vec<u8> {
        let manifest: Manifest = files
            .iter()
            .map(|(name, content)| (name.to_string(), sha1_hex(content)))
            .collect();
        manifest.to_json().unwrap()
    }

    const PASS: &[u8] = b"{}";
    const STRINGS: &[u8] = b"\"a\" = \"b\";\n";
    const PNG: &[u8] = b"png";

    #[test]
    fn test_verify_consistent_archive() {
        let manifest = manifest_for(&[("pass.json", PASS), ("en.lproj/pass.strings", STRINGS)]);
        let data = archive(&[
            ("en.lproj/", b"".as_slice()),
            ("en.lproj/pass.strings", STRINGS),
            ("manifest.json", manifest.as_slice()),
            ("pass.json", PASS),
            ("signature", b"sig".as_slice()),
        ]);

        let archive = PassArchive::from_bytes(&data).unwrap();
        assert_eq!(
            archive.entry_names().collect::<Vec<_>>(),
            vec!["en.lproj/pass.strings", "manifest.json", "pass.json", "signature"]
        );
        assert_eq!(archive.signature(), Some(b"sig".as_slice()));
        assert_eq!(archive.manifest().unwrap().len(), 2);
        archive.verify_manifest().unwrap();
    }

    #[test]
    fn test_verify_detects_tampering() {
        let manifest = manifest_for(&[("pass.json", PASS)]);
        let data = archive(&[("manifest.json", manifest.as_slice()), ("pass.json", b"{ }".as_slice())]);
        let err = PassArchive::from_bytes(&data).unwrap().verify_manifest().unwrap_err();
        assert!(matches!(err, Error::InvalidArchive(msg) if msg.contains("pass.json")));
    }

    #[test]
    fn test_verify_detects_unlisted_and_missing_files() {
        let manifest = manifest_for(&[("pass.json", PASS)]);
        let data = archive(&[
            ("manifest.json", manifest.as_slice()),
            ("pass.json", PASS),
            ("icon.png", PNG),
        ]);
        let err = PassArchive::from_bytes(&data).unwrap().verify_manifest().unwrap_err();
        assert!(matches!(err, Error::InvalidArchive(msg) if msg.contains("icon.png")));

        let manifest = manifest_for(&[("pass.json", PASS), ("logo.png", PNG)]);
        let data = archive(&[("manifest.json", manifest.as_slice()), ("pass.json", PASS)]);
        let err = PassArchive::from_bytes(&data).unwrap().verify_manifest().unwrap_err();
        assert!(matches!(err, Error::InvalidArchive(msg) if msg.contains("logo.png")));
    }

    #[test]
    fn test_missing_manifest() {
        let data = archive(&[("pass.json", PASS)]);
        let archive = PassArchive::from_bytes(&data).unwrap();
        assert!(archive.signature().is_none());
        assert!(matches!(archive.manifest(), Err(Error::InvalidArchive(_))));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            PassArchive::from_bytes(b"definitely not a zip"),
            Err(Error::Zip(_))
        ));
    }
}
