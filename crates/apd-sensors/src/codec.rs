//! Conversion between sensor values and their JSON-compatible form.
//!
//! Plain values pass through serde unchanged. Physical quantities use the
//! [`Quantity`] wire form so magnitude and unit survive a round trip exactly.

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Encodes a value with its serde representation.
pub fn encode<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Decodes a value from its serde representation.
pub fn decode<T: DeserializeOwned>(json: Value) -> Result<T> {
    Ok(serde_json::from_value(json)?)
}

/// Wire form of a magnitude with a unit, e.g. `{"magnitude": 21.0, "unit": "degree_Celsius"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub magnitude: f64,
    pub unit: String,
}

impl Quantity {
    pub fn new(magnitude: f64, unit: impl Into<String>) -> Self {
        Self {
            magnitude,
            unit: unit.into(),
        }
    }

    pub fn to_json(&self) -> Result<Value> {
        encode(self)
    }

    pub fn from_json(json: Value) -> Result<Self> {
        decode(json)
    }
}

/// Builds a codec error for a JSON value that has the right shape but bad content.
pub(crate) fn invalid(message: impl std::fmt::Display) -> serde_json::Error {
    <serde_json::Error as de::Error>::custom(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars_pass_through() {
        assert_eq!(encode(&true).unwrap(), json!(true));
        assert_eq!(encode(&0.42_f64).unwrap(), json!(0.42));
        assert_eq!(decode::<u64>(json!(1024)).unwrap(), 1024);
    }

    #[test]
    fn test_address_pairs_are_nested_arrays() {
        let value = vec![("AF_INET".to_string(), "127.0.0.1".to_string())];
        let json = encode(&value).unwrap();
        assert_eq!(json, json!([["AF_INET", "127.0.0.1"]]));
        assert_eq!(decode::<Vec<(String, String)>>(json).unwrap(), value);
    }

    #[test]
    fn test_quantity_wire_form() {
        let quantity = Quantity::new(-32.5, "degree_Celsius");
        let json = quantity.to_json().unwrap();
        assert_eq!(json, json!({"magnitude": -32.5, "unit": "degree_Celsius"}));
        assert_eq!(Quantity::from_json(json).unwrap(), quantity);
    }

    #[test]
    fn test_quantity_rejects_missing_unit() {
        assert!(Quantity::from_json(json!({"magnitude": 1.0})).is_err());
    }
}
