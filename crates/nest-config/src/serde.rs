//! Serialization helpers for configuration files and exports.

use std::collections::BTreeMap;
use std::fs;
use std::iter::FromIterator;
use std::path::Path;

use nest_core::{ErrorInfo, NestError};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

fn serde_error(code: &str, err: impl ToString) -> NestError {
    NestError::Serde(ErrorInfo::new(code, err.to_string()))
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered = map
                .into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect::<BTreeMap<_, _>>();
            Value::Object(Map::from_iter(ordered))
        }
        Value::Array(values) => Value::Array(values.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Serializes a value into canonical JSON bytes with deterministic key order.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, NestError> {
    let value = serde_json::to_value(value).map_err(|err| serde_error("json_serialize", err))?;
    let canonical = canonicalize(value);
    let mut bytes = Vec::new();
    serde_json::to_writer(&mut bytes, &canonical).map_err(|err| serde_error("json_write", err))?;
    Ok(bytes)
}

/// Deserializes a value from JSON bytes.
pub fn from_json_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, NestError> {
    serde_json::from_slice(data).map_err(|err| serde_error("json_deserialize", err))
}

/// Deserializes a YAML payload into the requested type.
pub fn from_yaml_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, NestError> {
    serde_yaml::from_slice(data).map_err(|err| serde_error("yaml_deserialize", err))
}

/// Reads `path` and decodes it as YAML (`.yaml`/`.yml`) or JSON (anything else).
pub fn load_path<T: DeserializeOwned>(path: &Path) -> Result<T, NestError> {
    let bytes = fs::read(path).map_err(|err| {
        NestError::Serde(
            ErrorInfo::new("config_read", err.to_string()).with_context("path", path.display()),
        )
    })?;
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );
    let decoded = if is_yaml {
        from_yaml_slice(&bytes)
    } else {
        from_json_slice(&bytes)
    };
    decoded.map_err(|err| match err {
        NestError::Serde(info) => NestError::Serde(info.with_context("path", path.display())),
        other => other,
    })
}
