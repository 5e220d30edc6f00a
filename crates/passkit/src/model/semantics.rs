//! Semantic tags: machine-readable hints about what a pass represents.
//!
//! Purely descriptive; the wallet uses them for suggestions such as Siri
//! shortcuts or travel notifications. Only a representative subset of the
//! tag vocabulary is modeled here.

use super::date;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassSemantics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airline_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_airport_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_airport_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_gate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_location: Option<SemanticLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival_airport_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival_airport_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival_location: Option<SemanticLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boarding_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boarding_sequence_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "date::option")]
    pub original_departure_date: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "date::option")]
    pub current_departure_date: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transit_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seats: Option<Vec<SemanticSeat>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passenger_name: Option<PersonNameComponents>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "date::option")]
    pub event_start_date: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "date::option")]
    pub event_end_date: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performer_names: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue_location: Option<SemanticLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue_room: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue_entrance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<CurrencyAmount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<CurrencyAmount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silence_requested: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticLocation {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticSeat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seat_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seat_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seat_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seat_row: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seat_section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seat_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyAmount {
    /// Decimal amount kept as text to avoid float rounding.
    pub amount: String,
    pub currency_code: String,
}

/// Parts of a person's name.
///
/// `phonetic_representation` nests another set of components, so it is boxed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonNameComponents {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phonetic_representation: Option<Box<PersonNameComponents>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_phonetic_name() {
        let name = PersonNameComponents {
            given_name: Some("翔太".into()),
            phonetic_representation: Some(Box::new(PersonNameComponents {
                given_name: Some("Shota".into()),
                ..Default::default()
            })),
            ..Default::default()
        };
        let value = serde_json::to_value(&name).unwrap();
        assert_eq!(
            value,
            json!({"givenName": "翔太", "phoneticRepresentation": {"givenName": "Shota"}})
        );
        let decoded: PersonNameComponents = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, name);
    }

    #[test]
    fn test_empty_semantics_encode_to_empty_object() {
        assert_eq!(serde_json::to_value(PassSemantics::default()).unwrap(), json!({}));
    }
}
