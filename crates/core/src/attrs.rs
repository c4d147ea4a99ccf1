//! Attribute maps
//!
//! Resources travel across the provider boundary as JSON objects. Handlers
//! convert them once into typed structs with [`from_attributes`] and back
//! with [`to_attributes`].

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// A resource's attribute values keyed by attribute name
pub type Attributes = Map<String, Value>;

/// True for the zero value of an attribute: null, `""`, `false`, `0` or an
/// empty collection. Zero values count as unset.
pub fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// The value of `name` if it is set to a non-zero value
pub fn get_ok<'a>(attrs: &'a Attributes, name: &str) -> Option<&'a Value> {
    attrs.get(name).filter(|v| !is_zero(v))
}

/// Drop null entries so struct defaults apply
pub fn strip_nulls(attrs: &Attributes) -> Attributes {
    attrs
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Convert an attribute map into a typed struct
pub fn from_attributes<T: DeserializeOwned>(attrs: &Attributes) -> Result<T> {
    serde_json::from_value(Value::Object(strip_nulls(attrs)))
        .map_err(|e| Error::Validation(format!("invalid attributes: {e}")))
}

/// Convert a typed struct into an attribute map
pub fn to_attributes<T: Serialize>(value: &T) -> Result<Attributes> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::General(format!(
            "expected an attribute object, got {other}"
        ))),
    }
}

/// `Some` for non-empty strings
pub fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize, Serialize, PartialEq)]
    #[serde(default)]
    struct Sample {
        bucket: String,
        force_destroy: bool,
    }

    fn attrs(value: Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_zero_values() {
        assert!(is_zero(&json!(null)));
        assert!(is_zero(&json!("")));
        assert!(is_zero(&json!(false)));
        assert!(is_zero(&json!(0)));
        assert!(is_zero(&json!([])));
        assert!(is_zero(&json!({})));
        assert!(!is_zero(&json!("private")));
        assert!(!is_zero(&json!(1000)));
    }

    #[test]
    fn test_get_ok_skips_zero_values() {
        let a = attrs(json!({"bucket": "", "bucket_prefix": "logs-"}));
        assert!(get_ok(&a, "bucket").is_none());
        assert_eq!(get_ok(&a, "bucket_prefix"), Some(&json!("logs-")));
        assert!(get_ok(&a, "missing").is_none());
    }

    #[test]
    fn test_nulls_fall_back_to_defaults() {
        let a = attrs(json!({"bucket": "b", "force_destroy": null}));
        let sample: Sample = from_attributes(&a).unwrap();
        assert_eq!(
            sample,
            Sample {
                bucket: "b".into(),
                force_destroy: false
            }
        );
        assert_eq!(to_attributes(&sample).unwrap()["bucket"], json!("b"));
    }

    #[test]
    fn test_type_mismatch_is_validation_error() {
        let a = attrs(json!({"force_destroy": "yes"}));
        let err = from_attributes::<Sample>(&a).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
