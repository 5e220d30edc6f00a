//! Localizable text and string-table aggregation.
//!
//! A wallet pass never embeds translations in `pass.json`. A localized value
//! is written as a lookup key, and the text for each language lives in
//! `<lang>.lproj/pass.strings`. [`LocalizableString`] carries both halves and
//! the [`Localizable`] trait collects the translations of a whole pass into a
//! [`StringTable`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Language code → (lookup key → text).
pub type StringTable = BTreeMap<String, BTreeMap<String, String>>;

/// Text that is either written inline or looked up per language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalizableString {
    /// Written verbatim into `pass.json`.
    Plain(String),
    /// Written into `pass.json` as `key`; `translations` maps language code to text.
    Localized {
        key: String,
        translations: BTreeMap<String, String>,
    },
}

impl LocalizableString {
    pub fn plain(text: impl Into<String>) -> Self {
        LocalizableString::Plain(text.into())
    }

    /// Localized text looked up under `key`.
    ///
    /// ```
    /// use passkit::LocalizableString;
    ///
    /// let text = LocalizableString::localized("pass.description", [("en", "Ticket"), ("fr", "Billet")]);
    /// assert_eq!(text.as_str(), "pass.description");
    /// ```
    pub fn localized<I, L, T>(key: impl Into<String>, translations: I) -> Self
    where
        I: IntoIterator<Item = (L, T)>,
        L: Into<String>,
        T: Into<String>,
    {
        LocalizableString::Localized {
            key: key.into(),
            translations: translations
                .into_iter()
                .map(|(lang, text)| (lang.into(), text.into()))
                .collect(),
        }
    }

    /// The string that appears in `pass.json`: the text itself or the lookup key.
    pub fn as_str(&self) -> &str {
        match self {
            LocalizableString::Plain(text) => text,
            LocalizableString::Localized { key, .. } => key,
        }
    }

    /// Every concrete text this value can render as.
    pub fn texts(&self) -> Vec<&str> {
        match self {
            LocalizableString::Plain(text) => vec![text.as_str()],
            LocalizableString::Localized { translations, .. } => {
                translations.values().map(String::as_str).collect()
            }
        }
    }
}

impl From<&str> for LocalizableString {
    fn from(text: &str) -> Self {
        LocalizableString::Plain(text.to_string())
    }
}

impl From<String> for LocalizableString {
    fn from(text: String) -> Self {
        LocalizableString::Plain(text)
    }
}

impl Serialize for LocalizableString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LocalizableString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(LocalizableString::Plain)
    }
}

/// Something that contributes entries to the per-language string tables.
pub trait Localizable {
    /// Add this value's translations to `table`, overwriting existing keys.
    fn contribute(&self, table: &mut StringTable);

    /// This value's translations as a fresh table.
    fn localizations(&self) -> StringTable {
        let mut table = StringTable::new();
        self.contribute(&mut table);
        table
    }
}

impl Localizable for LocalizableString {
    fn contribute(&self, table: &mut StringTable) {
        if let LocalizableString::Localized { key, translations } = self {
            for (lang, text) in translations {
                table
                    .entry(lang.clone())
                    .or_default()
                    .insert(key.clone(), text.clone());
            }
        }
    }
}

impl<T: Localizable> Localizable for Option<T> {
    fn contribute(&self, table: &mut StringTable) {
        if let Some(inner) = self {
            inner.contribute(table);
        }
    }
}

impl<T: Localizable> Localizable for Vec<T> {
    fn contribute(&self, table: &mut StringTable) {
        for item in self {
            item.contribute(table);
        }
    }
}

/// Merge `other` into `table`; on a key collision the entry from `other` wins.
pub fn merge_tables(table: &mut StringTable, other: StringTable) {
    for (lang, entries) in other {
        table.entry(lang).or_default().extend(entries);
    }
}
