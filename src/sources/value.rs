//! JSON to `config` value conversion

use config::{Value, ValueKind};
use serde_json::Value as JsonValue;

/// Convert a decoded JSON value into a `config` value tagged with `origin`.
///
/// Objects become tables and arrays stay arrays, so nested settings structs
/// deserialize straight from a secret document.
pub fn json_to_value(origin: &str, value: JsonValue) -> Value {
    let origin = origin.to_string();
    convert(Some(&origin), value)
}

fn convert(origin: Option<&String>, value: JsonValue) -> Value {
    let kind = match value {
        JsonValue::Null => ValueKind::Nil,
        JsonValue::Bool(b) => ValueKind::Boolean(b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                ValueKind::I64(i)
            } else if let Some(u) = n.as_u64() {
                ValueKind::U64(u)
            } else {
                ValueKind::Float(n.as_f64().unwrap_or_default())
            }
        }
        JsonValue::String(s) => ValueKind::String(s),
        JsonValue::Array(items) => {
            ValueKind::Array(items.into_iter().map(|item| convert(origin, item)).collect())
        }
        JsonValue::Object(entries) => ValueKind::Table(
            entries
                .into_iter()
                .map(|(key, item)| (key, convert(origin, item)))
                .collect(),
        ),
    };

    Value::new(origin, kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_document() {
        let value = json_to_value(
            "secretsmanager:my/secret",
            json!({ "roles": ["user", "admin"], "port": 5432, "ratio": 0.5, "debug": true }),
        );

        let table = value.into_table().unwrap();
        let roles = table["roles"].clone().into_array().unwrap();
        assert_eq!(roles.len(), 2);
        assert_eq!(roles[1].clone().into_string().unwrap(), "admin");
        assert_eq!(table["port"].clone().into_int().unwrap(), 5432);
        assert_eq!(table["ratio"].clone().into_float().unwrap(), 0.5);
        assert!(table["debug"].clone().into_bool().unwrap());
    }

    #[test]
    fn test_origin_is_kept() {
        let value = json_to_value("ssm", json!({ "nested": ["value"] }));
        assert_eq!(value.origin(), Some("ssm"));

        let table = value.into_table().unwrap();
        let nested = table["nested"].clone().into_array().unwrap();
        assert_eq!(nested[0].origin(), Some("ssm"));
    }

    #[test]
    fn test_null_is_nil() {
        let value = json_to_value("ssm", JsonValue::Null);
        assert!(matches!(value.kind, ValueKind::Nil));
    }
}
