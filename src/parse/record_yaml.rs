use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};

use crate::model::record::Record;
use crate::model::template::CHECKED_KEY;

/// Parse a record file. Returns the reason on failure.
///
/// Scalars that YAML types as numbers or bools come back in their string
/// form, `null` becomes an empty string. A missing `checked` key means
/// unchecked.
pub fn parse_record(text: &str) -> Result<Record, String> {
    let doc: Value = serde_yaml::from_str(text).map_err(|e| e.to_string())?;
    let mapping = match doc {
        Value::Mapping(m) => m,
        Value::Null => return Err("file is empty".into()),
        _ => return Err("top level is not a mapping".into()),
    };

    let mut fields = IndexMap::with_capacity(mapping.len());
    let mut checked = false;
    for (key, value) in mapping {
        let key = scalar_to_string(&key).ok_or("non-scalar key")?;
        if key == CHECKED_KEY {
            checked = parse_checked(&value)?;
            continue;
        }
        let value = scalar_to_string(&value)
            .ok_or_else(|| format!("field '{}' is not a plain value", key))?;
        fields.insert(key, value);
    }

    Ok(Record { fields, checked })
}

/// Serialize a record: fields in order, then `checked`.
pub fn serialize_record(record: &Record) -> String {
    let mut mapping = Mapping::with_capacity(record.fields.len() + 1);
    for (key, value) in &record.fields {
        if key == CHECKED_KEY {
            continue;
        }
        mapping.insert(Value::String(key.clone()), Value::String(value.clone()));
    }
    mapping.insert(Value::String(CHECKED_KEY.into()), Value::Bool(record.checked));
    // A mapping of plain strings and one bool cannot fail to serialize
    serde_yaml::to_string(&mapping).unwrap_or_default()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

fn parse_checked(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Null => Ok(false),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(format!("'checked' is not a bool: {:?}", other)),
    }
}
