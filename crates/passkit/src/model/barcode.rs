use super::localizable::{Localizable, LocalizableString, StringTable};
use serde::{Deserialize, Serialize};

/// Default text encoding used by the wallet for barcode payloads.
pub const DEFAULT_MESSAGE_ENCODING: &str = "iso-8859-1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarcodeFormat {
    #[serde(rename = "PKBarcodeFormatQR")]
    Qr,
    #[serde(rename = "PKBarcodeFormatPDF417")]
    Pdf417,
    #[serde(rename = "PKBarcodeFormatAztec")]
    Aztec,
    #[serde(rename = "PKBarcodeFormatCode128")]
    Code128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Barcode {
    pub format: BarcodeFormat,
    pub message: String,
    pub message_encoding: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<LocalizableString>,
}

impl Barcode {
    pub fn new(format: BarcodeFormat, message: impl Into<String>) -> Self {
        Self {
            format,
            message: message.into(),
            message_encoding: DEFAULT_MESSAGE_ENCODING.to_string(),
            alt_text: None,
        }
    }

    pub fn with_alt_text(mut self, text: impl Into<LocalizableString>) -> Self {
        self.alt_text = Some(text.into());
        self
    }
}

impl Localizable for Barcode {
    fn contribute(&self, table: &mut StringTable) {
        self.alt_text.contribute(table);
    }
}
