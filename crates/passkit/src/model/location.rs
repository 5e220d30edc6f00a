//! Geographic and proximity relevance triggers.

use super::localizable::{Localizable, LocalizableString, StringTable};
use serde::{Deserialize, Serialize};

/// A location where the pass is relevant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// Shown on the lock screen near this location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevant_text: Option<LocalizableString>,
}

impl PassLocation {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            relevant_text: None,
        }
    }

    pub fn with_relevant_text(mut self, text: impl Into<LocalizableString>) -> Self {
        self.relevant_text = Some(text.into());
        self
    }
}

impl Localizable for PassLocation {
    fn contribute(&self, table: &mut StringTable) {
        self.relevant_text.contribute(table);
    }
}

/// A Bluetooth beacon near which the pass is relevant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassBeacon {
    #[serde(rename = "proximityUUID")]
    pub proximity_uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minor: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevant_text: Option<LocalizableString>,
}

impl PassBeacon {
    pub fn new(proximity_uuid: impl Into<String>) -> Self {
        Self {
            proximity_uuid: proximity_uuid.into(),
            major: None,
            minor: None,
            relevant_text: None,
        }
    }

    pub fn with_relevant_text(mut self, text: impl Into<LocalizableString>) -> Self {
        self.relevant_text = Some(text.into());
        self
    }
}

impl Localizable for PassBeacon {
    fn contribute(&self, table: &mut StringTable) {
        self.relevant_text.contribute(table);
    }
}
