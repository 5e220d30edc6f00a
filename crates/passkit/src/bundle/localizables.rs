//! Per-language string tables.
//!
//! Writes one `<lang>.lproj/pass.strings` file per language of a
//! [`StringTable`]. Each line has the form `"key" = "value";`.

use crate::model::StringTable;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the string table written into every language directory.
pub const STRINGS_FILE_NAME: &str = "pass.strings";

/// Extension of per-language directories.
pub const LPROJ_EXTENSION: &str = "lproj";

/// `en` → `en.lproj`
pub fn lproj_dir_name(language: &str) -> String {
    format!("{language}.{LPROJ_EXTENSION}")
}

/// Reject language codes that would not name a single directory inside the
/// bundle.
fn check_language(language: &str) -> Result<()> {
    if language.is_empty() || language.contains(['/', '\\']) {
        return Err(Error::InvalidPass(format!("invalid language code {language:?}")));
    }
    Ok(())
}

/// Writes string tables into a bundle directory.
#[async_trait]
pub trait LocalizablesGenerator: Send + Sync {
    /// Create `<lang>.lproj/pass.strings` under `root` for every language in
    /// `table`. An empty table creates nothing. A language code containing a
    /// path separator fails with [`Error::InvalidPass`] before anything is
    /// written.
    async fn generate(&self, table: &StringTable, root: &Path) -> Result<Vec<PathBuf>>;
}

/// Writes UTF-8 `.strings` files with `tokio::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringsFileGenerator;

#[async_trait]
impl LocalizablesGenerator for StringsFileGenerator {
    async fn generate(&self, table: &StringTable, root: &Path) -> Result<Vec<PathBuf>> {
        for language in table.keys() {
            check_language(language)?;
        }
        let mut created = Vec::with_capacity(table.len());
        for (language, entries) in table {
            let dir = root.join(lproj_dir_name(language));
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::write(dir.join(STRINGS_FILE_NAME), render_strings(entries)).await?;
            debug!(language = %language, entries = entries.len(), "Wrote string table");
            created.push(dir);
        }
        Ok(created)
    }
}

/// Render `entries` in `.strings` syntax, one newline-terminated line each.
pub fn render_strings(entries: &BTreeMap<String, String>) -> String {
    let mut body = String::new();
    for (key, value) in entries {
        body.push('"');
        body.push_str(&escape(key));
        body.push_str("\" = \"");
        body.push_str(&escape(value));
        body.push_str("\";\n");
    }
    body
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(c),
        }
    }
    escaped
}
