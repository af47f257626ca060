use std::collections::BTreeMap;
use std::iter::FromIterator;

use ::serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{ErrorInfo, SweepError};

fn serde_error(code: &str, err: impl ToString) -> SweepError {
    SweepError::Serde(ErrorInfo::new(code, err.to_string()))
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut ordered = BTreeMap::new();
            for (key, val) in map {
                ordered.insert(key, canonicalize(val));
            }
            Value::Object(Map::from_iter(ordered))
        }
        Value::Array(values) => {
            let canonical_values = values.into_iter().map(canonicalize).collect();
            Value::Array(canonical_values)
        }
        other => other,
    }
}

/// Serializes a value into canonical JSON bytes with deterministic ordering.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, SweepError> {
    let value = serde_json::to_value(value).map_err(|err| serde_error("json-encode", err))?;
    let canonical = canonicalize(value);
    let mut bytes = Vec::new();
    serde_json::to_writer(&mut bytes, &canonical).map_err(|err| serde_error("json-write", err))?;
    Ok(bytes)
}

/// Restores a value from canonical JSON bytes.
pub fn from_json_slice<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, SweepError> {
    serde_json::from_slice(data).map_err(|err| serde_error("json-read", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_bytes_order_keys() {
        let scrambled = json!({"b": 1, "a": {"z": 2, "y": 3}});
        let bytes = to_canonical_json_bytes(&scrambled).expect("encode");
        assert_eq!(bytes, br#"{"a":{"y":3,"z":2},"b":1}"#.to_vec());
        let restored: serde_json::Value = from_json_slice(&bytes).expect("decode");
        assert_eq!(restored, scrambled);
    }
}
