//! The root pass document.

use super::barcode::Barcode;
use super::date;
use super::field::{FieldZone, PassStructure, TransitType, CHANGE_MESSAGE_PLACEHOLDER};
use super::localizable::{Localizable, LocalizableString, StringTable};
use super::location::{PassBeacon, PassLocation};
use super::semantics::PassSemantics;
use crate::{Error, Result};
use chrono::{DateTime, FixedOffset};
use serde::de::{self, Unexpected};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;

/// Minimum length the wallet accepts for a web-service authentication token.
pub const MIN_AUTHENTICATION_TOKEN_LEN: usize = 16;

/// The `formatVersion` key. Always encodes as `1`; any other value is rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatVersion;

impl FormatVersion {
    pub const VALUE: u8 = 1;
}

impl Serialize for FormatVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(Self::VALUE)
    }
}

impl<'de> Deserialize<'de> for FormatVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let version = u64::deserialize(deserializer)?;
        if version == u64::from(Self::VALUE) {
            Ok(FormatVersion)
        } else {
            Err(de::Error::invalid_value(Unexpected::Unsigned(version), &"1"))
        }
    }
}

/// The visual style of a pass. Exactly one is present on every pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PassStyle {
    BoardingPass(PassStructure),
    Coupon(PassStructure),
    EventTicket(PassStructure),
    Generic(PassStructure),
    StoreCard(PassStructure),
}

impl PassStyle {
    pub fn structure(&self) -> &PassStructure {
        match self {
            PassStyle::BoardingPass(s)
            | PassStyle::Coupon(s)
            | PassStyle::EventTicket(s)
            | PassStyle::Generic(s)
            | PassStyle::StoreCard(s) => s,
        }
    }

    /// The JSON key this style is written under.
    pub fn name(&self) -> &'static str {
        match self {
            PassStyle::BoardingPass(_) => "boardingPass",
            PassStyle::Coupon(_) => "coupon",
            PassStyle::EventTicket(_) => "eventTicket",
            PassStyle::Generic(_) => "generic",
            PassStyle::StoreCard(_) => "storeCard",
        }
    }
}

/// Update service credentials. Token and URL are only valid together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebService {
    pub authentication_token: String,
    #[serde(rename = "webServiceURL")]
    pub web_service_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassNfc {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_authentication: Option<bool>,
}

/// A wallet pass, serialized as `pass.json`.
///
/// # Examples
///
/// ```
/// use passkit::{Pass, PassField, PassStructure, PassStyle};
///
/// let pass = Pass::new(
///     "Test",
///     "Example Org",
///     "pass.com.example.ticket",
///     "0001",
///     "ABCDE12345",
///     PassStyle::Generic(PassStructure::new().primary(PassField::new("name", "Jane"))),
/// );
/// assert!(pass.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pass {
    pub description: LocalizableString,
    pub format_version: FormatVersion,
    pub organization_name: LocalizableString,
    pub pass_type_identifier: String,
    pub serial_number: String,
    pub team_identifier: String,
    #[serde(flatten)]
    pub style: PassStyle,

    #[serde(rename = "appLaunchURL", skip_serializing_if = "Option::is_none")]
    pub app_launch_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub associated_store_identifiers: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_info: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none", with = "date::option")]
    pub expiration_date: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voided: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<PassLocation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beacons: Option<Vec<PassBeacon>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "date::option")]
    pub relevant_date: Option<DateTime<FixedOffset>>,

    /// Single legacy barcode, for wallets older than `barcodes`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<Barcode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcodes: Option<Vec<Barcode>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_text: Option<LocalizableString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grouping_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suppress_strip_shine: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sharing_prohibited: Option<bool>,

    #[serde(flatten)]
    pub web_service: Option<WebService>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nfc: Option<PassNfc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantics: Option<PassSemantics>,
}

impl Pass {
    pub fn new(
        description: impl Into<LocalizableString>,
        organization_name: impl Into<LocalizableString>,
        pass_type_identifier: impl Into<String>,
        serial_number: impl Into<String>,
        team_identifier: impl Into<String>,
        style: PassStyle,
    ) -> Self {
        Self {
            description: description.into(),
            format_version: FormatVersion,
            organization_name: organization_name.into(),
            pass_type_identifier: pass_type_identifier.into(),
            serial_number: serial_number.into(),
            team_identifier: team_identifier.into(),
            style,
            app_launch_url: None,
            associated_store_identifiers: None,
            user_info: None,
            expiration_date: None,
            voided: None,
            locations: None,
            beacons: None,
            max_distance: None,
            relevant_date: None,
            barcode: None,
            barcodes: None,
            background_color: None,
            foreground_color: None,
            label_color: None,
            logo_text: None,
            grouping_identifier: None,
            suppress_strip_shine: None,
            sharing_prohibited: None,
            web_service: None,
            nfc: None,
            semantics: None,
        }
    }

    /// Description looked up under `pass.description`.
    pub fn with_localized_description<I, L, T>(mut self, translations: I) -> Self
    where
        I: IntoIterator<Item = (L, T)>,
        L: Into<String>,
        T: Into<String>,
    {
        self.description = LocalizableString::localized("pass.description", translations);
        self
    }

    /// Organization name looked up under `pass.organizationName`.
    pub fn with_localized_organization_name<I, L, T>(mut self, translations: I) -> Self
    where
        I: IntoIterator<Item = (L, T)>,
        L: Into<String>,
        T: Into<String>,
    {
        self.organization_name =
            LocalizableString::localized("pass.organizationName", translations);
        self
    }

    /// Logo text looked up under `pass.logoText`.
    pub fn with_localized_logo_text<I, L, T>(mut self, translations: I) -> Self
    where
        I: IntoIterator<Item = (L, T)>,
        L: Into<String>,
        T: Into<String>,
    {
        self.logo_text = Some(LocalizableString::localized("pass.logoText", translations));
        self
    }

    pub fn with_web_service(
        mut self,
        authentication_token: impl Into<String>,
        web_service_url: impl Into<String>,
    ) -> Self {
        self.web_service = Some(WebService {
            authentication_token: authentication_token.into(),
            web_service_url: web_service_url.into(),
        });
        self
    }

    pub fn structure(&self) -> &PassStructure {
        self.style.structure()
    }

    /// Merged translations of the pass and everything nested in it.
    pub fn string_table(&self) -> StringTable {
        self.localizations()
    }

    /// Check the structural rules the wallet enforces on a pass.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPass`] naming the first violated rule.
    pub fn validate(&self) -> Result<()> {
        let mut keys = HashSet::new();
        for (zone, field) in self.structure().fields() {
            if !keys.insert(field.key.as_str()) {
                return Err(invalid(format!("duplicate field key '{}'", field.key)));
            }
            if let Some(message) = &field.change_message {
                for text in message.texts() {
                    if text.matches(CHANGE_MESSAGE_PLACEHOLDER).count() != 1 {
                        return Err(invalid(format!(
                            "change message of '{}' must contain {} exactly once",
                            field.key, CHANGE_MESSAGE_PLACEHOLDER
                        )));
                    }
                }
            }
            if field.data_detector_types.is_some() && zone != FieldZone::Back {
                return Err(invalid(format!(
                    "data detectors are only allowed on back fields ('{}')",
                    field.key
                )));
            }
            if field.text_alignment.is_some()
                && matches!(zone, FieldZone::Primary | FieldZone::Back)
            {
                return Err(invalid(format!(
                    "text alignment is not allowed on primary or back fields ('{}')",
                    field.key
                )));
            }
        }

        if let PassStyle::BoardingPass(structure) = &self.style {
            if structure.transit_type.is_none() {
                return Err(invalid("boarding pass requires a transit type".into()));
            }
        }

        if let Some(web_service) = &self.web_service {
            if web_service.authentication_token.chars().count() < MIN_AUTHENTICATION_TOKEN_LEN {
                return Err(invalid(format!(
                    "authentication token must be at least {} characters",
                    MIN_AUTHENTICATION_TOKEN_LEN
                )));
            }
        }

        for location in self.locations.iter().flatten() {
            if !location.latitude.is_finite() || !location.longitude.is_finite() {
                return Err(invalid("location coordinates must be finite".into()));
            }
        }
        if let Some(distance) = self.max_distance {
            if !distance.is_finite() || distance < 0.0 {
                return Err(invalid("max distance must be a non-negative number".into()));
            }
        }

        Ok(())
    }

    /// Transit type of a boarding pass.
    pub fn transit_type(&self) -> Option<TransitType> {
        match &self.style {
            PassStyle::BoardingPass(structure) => structure.transit_type,
            _ => None,
        }
    }
}

fn invalid(reason: String) -> Error {
    Error::InvalidPass(reason)
}

impl Localizable for Pass {
    fn contribute(&self, table: &mut StringTable) {
        self.description.contribute(table);
        self.organization_name.contribute(table);
        self.logo_text.contribute(table);
        self.structure().contribute(table);
        self.locations.contribute(table);
        self.beacons.contribute(table);
        self.barcode.contribute(table);
        self.barcodes.contribute(table);
    }
}
