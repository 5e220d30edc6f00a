//! Pass fields and the zones that group them.

use super::date;
use super::localizable::{Localizable, LocalizableString, StringTable};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder that a change message must contain exactly once.
pub const CHANGE_MESSAGE_PLACEHOLDER: &str = "%@";

/// Value shown by a field.
///
/// Decoding yields only `Number` and `Text`: a date is written as a string
/// and reads back as text, so the caller's string is never reformatted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(serde_json::Number),
    Date(#[serde(with = "date")] DateTime<FixedOffset>),
    Text(LocalizableString),
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(serde_json::Number),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(number) => FieldValue::Number(number),
            Raw::Text(text) => FieldValue::Text(LocalizableString::Plain(text)),
        })
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.into())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text.into())
    }
}

impl From<LocalizableString> for FieldValue {
    fn from(text: LocalizableString) -> Self {
        FieldValue::Text(text)
    }
}

impl From<i64> for FieldValue {
    fn from(number: i64) -> Self {
        FieldValue::Number(number.into())
    }
}

impl From<DateTime<FixedOffset>> for FieldValue {
    fn from(date: DateTime<FixedOffset>) -> Self {
        FieldValue::Date(date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataDetector {
    #[serde(rename = "PKDataDetectorTypePhoneNumber")]
    PhoneNumber,
    #[serde(rename = "PKDataDetectorTypeLink")]
    Link,
    #[serde(rename = "PKDataDetectorTypeAddress")]
    Address,
    #[serde(rename = "PKDataDetectorTypeCalendarEvent")]
    CalendarEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlignment {
    #[serde(rename = "PKTextAlignmentLeft")]
    Left,
    #[serde(rename = "PKTextAlignmentCenter")]
    Center,
    #[serde(rename = "PKTextAlignmentRight")]
    Right,
    #[serde(rename = "PKTextAlignmentNatural")]
    Natural,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateStyle {
    #[serde(rename = "PKDateStyleNone")]
    None,
    #[serde(rename = "PKDateStyleShort")]
    Short,
    #[serde(rename = "PKDateStyleMedium")]
    Medium,
    #[serde(rename = "PKDateStyleLong")]
    Long,
    #[serde(rename = "PKDateStyleFull")]
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberStyle {
    #[serde(rename = "PKNumberStyleDecimal")]
    Decimal,
    #[serde(rename = "PKNumberStylePercent")]
    Percent,
    #[serde(rename = "PKNumberStyleScientific")]
    Scientific,
    #[serde(rename = "PKNumberStyleSpellOut")]
    SpellOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitType {
    #[serde(rename = "PKTransitTypeAir")]
    Air,
    #[serde(rename = "PKTransitTypeBoat")]
    Boat,
    #[serde(rename = "PKTransitTypeBus")]
    Bus,
    #[serde(rename = "PKTransitTypeGeneric")]
    Generic,
    #[serde(rename = "PKTransitTypeTrain")]
    Train,
}

/// A key/value display unit.
///
/// `key` must be unique across the whole pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassField {
    pub key: String,
    pub value: FieldValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<LocalizableString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributed_value: Option<LocalizableString>,
    /// Shown in a notification when the value changes; must contain `%@` once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_message: Option<LocalizableString>,
    /// Back fields only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_detector_types: Option<Vec<DataDetector>>,
    /// Not allowed on primary or back fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_alignment: Option<TextAlignment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_style: Option<DateStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_style: Option<DateStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignores_time_zone: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_relative: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_style: Option<NumberStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
}

impl PassField {
    pub fn new(key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            label: None,
            attributed_value: None,
            change_message: None,
            data_detector_types: None,
            text_alignment: None,
            date_style: None,
            time_style: None,
            ignores_time_zone: None,
            is_relative: None,
            number_style: None,
            currency_code: None,
        }
    }

    /// A field whose value is looked up under `<key>.value`.
    pub fn localized<I, L, T>(key: impl Into<String>, translations: I) -> Self
    where
        I: IntoIterator<Item = (L, T)>,
        L: Into<String>,
        T: Into<String>,
    {
        let key = key.into();
        let value = LocalizableString::localized(format!("{key}.value"), translations);
        Self::new(key, value)
    }

    pub fn with_label(mut self, label: impl Into<LocalizableString>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label looked up under `<key>.label`.
    pub fn with_localized_label<I, L, T>(mut self, translations: I) -> Self
    where
        I: IntoIterator<Item = (L, T)>,
        L: Into<String>,
        T: Into<String>,
    {
        self.label = Some(LocalizableString::localized(
            format!("{}.label", self.key),
            translations,
        ));
        self
    }

    pub fn with_change_message(mut self, message: impl Into<LocalizableString>) -> Self {
        self.change_message = Some(message.into());
        self
    }

    /// Change message looked up under `<key>.changeMessage`.
    pub fn with_localized_change_message<I, L, T>(mut self, translations: I) -> Self
    where
        I: IntoIterator<Item = (L, T)>,
        L: Into<String>,
        T: Into<String>,
    {
        self.change_message = Some(LocalizableString::localized(
            format!("{}.changeMessage", self.key),
            translations,
        ));
        self
    }

    pub fn with_data_detectors(mut self, detectors: impl Into<Vec<DataDetector>>) -> Self {
        self.data_detector_types = Some(detectors.into());
        self
    }

    pub fn with_text_alignment(mut self, alignment: TextAlignment) -> Self {
        self.text_alignment = Some(alignment);
        self
    }
}

impl Localizable for PassField {
    fn contribute(&self, table: &mut StringTable) {
        if let FieldValue::Text(text) = &self.value {
            text.contribute(table);
        }
        self.label.contribute(table);
        self.attributed_value.contribute(table);
        self.change_message.contribute(table);
    }
}

/// The zone of a [`PassStructure`] a field is placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldZone {
    Header,
    Primary,
    Secondary,
    Auxiliary,
    Back,
}

/// Fields of a pass grouped by zone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassStructure {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub header_fields: Vec<PassField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub primary_fields: Vec<PassField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secondary_fields: Vec<PassField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auxiliary_fields: Vec<PassField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub back_fields: Vec<PassField>,
    /// Required for boarding passes, ignored otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transit_type: Option<TransitType>,
}

impl PassStructure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transit_type(mut self, transit_type: TransitType) -> Self {
        self.transit_type = Some(transit_type);
        self
    }

    pub fn header(mut self, field: PassField) -> Self {
        self.header_fields.push(field);
        self
    }

    pub fn primary(mut self, field: PassField) -> Self {
        self.primary_fields.push(field);
        self
    }

    pub fn secondary(mut self, field: PassField) -> Self {
        self.secondary_fields.push(field);
        self
    }

    pub fn auxiliary(mut self, field: PassField) -> Self {
        self.auxiliary_fields.push(field);
        self
    }

    pub fn back(mut self, field: PassField) -> Self {
        self.back_fields.push(field);
        self
    }

    /// All fields in display order, tagged with their zone.
    pub fn fields(&self) -> impl Iterator<Item = (FieldZone, &PassField)> {
        tag(FieldZone::Header, &self.header_fields)
            .chain(tag(FieldZone::Primary, &self.primary_fields))
            .chain(tag(FieldZone::Secondary, &self.secondary_fields))
            .chain(tag(FieldZone::Auxiliary, &self.auxiliary_fields))
            .chain(tag(FieldZone::Back, &self.back_fields))
    }
}

fn tag(zone: FieldZone, fields: &[PassField]) -> impl Iterator<Item = (FieldZone, &PassField)> {
    fields.iter().map(move |field| (zone, field))
}

impl Localizable for PassStructure {
    fn contribute(&self, table: &mut StringTable) {
        for (_, field) in self.fields() {
            field.contribute(table);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_omits_absent_attributes() {
        let field = PassField::new("gate", "B12").with_label("Gate");
        assert_eq!(
            serde_json::to_value(&field).unwrap(),
            json!({"key": "gate", "value": "B12", "label": "Gate"})
        );
    }

    #[test]
    fn test_localized_field_uses_synthetic_keys() {
        let field = PassField::localized("seat", [("en", "Window"), ("it", "Finestrino")])
            .with_localized_label([("en", "Seat")]);

        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(value["value"], "seat.value");
        assert_eq!(value["label"], "seat.label");

        let table = field.localizations();
        assert_eq!(table["en"]["seat.value"], "Window");
        assert_eq!(table["en"]["seat.label"], "Seat");
        assert_eq!(table["it"].len(), 1);
    }

    #[test]
    fn test_field_value_variants_decode() {
        let number: FieldValue = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(number, FieldValue::from(42));

        let date: FieldValue = serde_json::from_value(json!("2024-05-01T18:30+02:00")).unwrap();
        assert_eq!(date, FieldValue::from("2024-05-01T18:30+02:00"));

        let text: FieldValue = serde_json::from_value(json!("Hello")).unwrap();
        assert_eq!(text, FieldValue::from("Hello"));
    }

    #[test]
    fn test_date_value_encodes_with_minute_precision() {
        use chrono::TimeZone;
        let date = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 1, 18, 30, 45)
            .unwrap();
        let field = PassField::new("departs", date);
        assert_eq!(serde_json::to_value(&field).unwrap()["value"], "2024-05-01T18:30+00:00");
    }

    #[test]
    fn test_structure_skips_empty_zones() {
        let structure = PassStructure::new()
            .with_transit_type(TransitType::Train)
            .primary(PassField::new("from", "Zürich"));
        assert_eq!(
            serde_json::to_value(&structure).unwrap(),
            json!({
                "primaryFields": [{"key": "from", "value": "Zürich"}],
                "transitType": "PKTransitTypeTrain"
            })
        );
    }

    #[test]
    fn test_fields_iterates_in_zone_order() {
        let structure = PassStructure::new()
            .back(PassField::new("terms", "..."))
            .header(PassField::new("date", "today"));
        let zones: Vec<_> = structure.fields().map(|(zone, f)| (zone, f.key.as_str())).collect();
        assert_eq!(zones, vec![(FieldZone::Header, "date"), (FieldZone::Back, "terms")]);
    }
}
