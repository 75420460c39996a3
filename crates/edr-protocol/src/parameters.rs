//! Parameter metadata types for EDR collections.
//!
//! Parameters describe the observed variables a collection serves. For the
//! relational provider they are read from the parameter id, name and unit
//! columns of the observation mapping.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// UCUM vocabulary used for unit symbols.
pub const UCUM_UNIT_TYPE: &str = "http://www.opengis.net/def/uom/UCUM/";

/// A parameter (observed property) available in a collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Parameter {
    /// The type of parameter (always "Parameter").
    #[serde(rename = "type")]
    pub type_: String,

    /// Unique identifier for the parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Human-readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Multi-language description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<I18nString>,

    /// The observed property.
    #[serde(rename = "observedProperty")]
    pub observed_property: ObservedProperty,

    /// Unit of measurement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
}

impl Parameter {
    /// Create a new parameter whose observed property shares its id.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        let name = name.into();
        Self {
            type_: "Parameter".to_string(),
            id: Some(id.clone()),
            name: Some(name.clone()),
            description: None,
            observed_property: ObservedProperty::new(&name).with_id(id),
            unit: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(I18nString::english(&desc.into()));
        self
    }

    /// Set the unit.
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }
}

/// Internationalized string supporting multiple languages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum I18nString {
    /// Simple string (assumes English).
    Simple(String),
    /// Map of language codes to strings.
    Localized(HashMap<String, String>),
}

impl I18nString {
    /// Create an English-only i18n string.
    pub fn english(s: &str) -> Self {
        let mut map = HashMap::new();
        map.insert("en".to_string(), s.to_string());
        I18nString::Localized(map)
    }

    /// Get the English text, or any available text.
    pub fn text(&self) -> &str {
        match self {
            I18nString::Simple(s) => s,
            I18nString::Localized(map) => map
                .get("en")
                .or_else(|| map.values().next())
                .map(|s| s.as_str())
                .unwrap_or(""),
        }
    }
}

/// The observed property being measured.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservedProperty {
    /// Identifier for the property.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Human-readable label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<I18nString>,
}

impl ObservedProperty {
    /// Create a new observed property with a label.
    pub fn new(label: &str) -> Self {
        Self {
            id: None,
            label: Some(I18nString::english(label)),
        }
    }

    /// Set the ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Unit of measurement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Unit {
    /// Human-readable label for the unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<I18nString>,

    /// Symbol or abbreviation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<UnitSymbol>,
}

impl Unit {
    /// Create a unit from a plain symbol string.
    pub fn from_symbol(symbol: impl Into<String>) -> Self {
        Self {
            label: None,
            symbol: Some(UnitSymbol::Simple(symbol.into())),
        }
    }

    /// Create a labelled unit whose symbol is a UCUM code.
    pub fn ucum(label: &str, symbol: impl Into<String>) -> Self {
        Self {
            label: Some(I18nString::english(label)),
            symbol: Some(UnitSymbol::Detailed {
                value: symbol.into(),
                type_: UCUM_UNIT_TYPE.to_string(),
            }),
        }
    }
}

/// Unit symbol representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum UnitSymbol {
    /// Simple string symbol.
    Simple(String),
    /// Symbol with its vocabulary.
    Detailed {
        value: String,
        #[serde(rename = "type")]
        type_: String,
    },
}

impl UnitSymbol {
    /// Get the symbol value.
    pub fn value(&self) -> &str {
        match self {
            UnitSymbol::Simple(s) => s,
            UnitSymbol::Detailed { value, .. } => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_carries_id_into_observed_property() {
        let param = Parameter::new("landings", "Daily landings");
        assert_eq!(param.id.as_deref(), Some("landings"));
        assert_eq!(param.observed_property.id.as_deref(), Some("landings"));
        assert_eq!(
            param.observed_property.label.as_ref().map(|l| l.text()),
            Some("Daily landings")
        );
    }

    #[test]
    fn test_ucum_unit_serialization() {
        let param = Parameter::new("00060", "Discharge").with_unit(Unit::ucum("Discharge", "ft^3/s"));
        let json = serde_json::to_value(&param).unwrap();

        assert_eq!(json["type"], "Parameter");
        assert_eq!(json["unit"]["symbol"]["value"], "ft^3/s");
        assert_eq!(json["unit"]["symbol"]["type"], UCUM_UNIT_TYPE);
        assert_eq!(json["observedProperty"]["label"]["en"], "Discharge");
    }

    #[test]
    fn test_unit_symbol_value() {
        assert_eq!(UnitSymbol::Simple("K".to_string()).value(), "K");
        let unit = Unit::ucum("Count", "{count}");
        assert_eq!(unit.symbol.unwrap().value(), "{count}");
    }

    #[test]
    fn test_i18n_text_fallback() {
        let mut map = HashMap::new();
        map.insert("fr".to_string(), "Débit".to_string());
        assert_eq!(I18nString::Localized(map).text(), "Débit");
        assert_eq!(I18nString::Simple("Flow".to_string()).text(), "Flow");
    }

    #[test]
    fn test_unit_symbol_deserializes_both_forms() {
        let simple: UnitSymbol = serde_json::from_str("\"K\"").unwrap();
        assert_eq!(simple, UnitSymbol::Simple("K".to_string()));

        let detailed: UnitSymbol =
            serde_json::from_str(r#"{"value":"ft","type":"http://www.opengis.net/def/uom/UCUM/"}"#)
                .unwrap();
        assert_eq!(detailed.value(), "ft");
    }
}
