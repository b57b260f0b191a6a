use std::fs;

use toml_edit::{DocumentMut, Item, Table, Value};

use crate::error::{StoreError, StoreResult};
use crate::io::atomic::atomic_write;
use crate::io::layout::StoreLayout;
use crate::model::config::StoreConfig;

/// Read lister.toml, returning both the parsed config and the raw
/// toml_edit document for formatting-preserving edits.
pub fn read_config(layout: &StoreLayout) -> StoreResult<(StoreConfig, DocumentMut)> {
    let config_path = layout.config_path();
    let text =
        fs::read_to_string(&config_path).map_err(|e| StoreError::io("read", &config_path, e))?;
    let config: StoreConfig = toml::from_str(&text)?;
    let doc: DocumentMut = text.parse()?;
    Ok((config, doc))
}

/// Write the document back, preserving comments and layout.
pub fn write_config(layout: &StoreLayout, doc: &DocumentMut) -> StoreResult<()> {
    let config_path = layout.config_path();
    atomic_write(&config_path, doc.to_string().as_bytes())
        .map_err(|e| StoreError::io("write", &config_path, e))
}

/// Look up a dotted `section.key` value as displayed text.
pub fn get_value(doc: &DocumentMut, key: &str) -> Option<String> {
    let (section, name) = key.split_once('.')?;
    let value = doc.get(section)?.get(name)?.as_value()?;
    Some(match value {
        Value::String(s) => s.value().clone(),
        other => other.to_string().trim().to_string(),
    })
}

/// Set a dotted `section.key`. The value is stored as a TOML integer or
/// bool when it parses as one, otherwise as a string. Returns the parsed
/// config so invalid settings are rejected before anything is written.
pub fn set_value(doc: &mut DocumentMut, key: &str, raw: &str) -> StoreResult<StoreConfig> {
    let (section, name) = key.split_once('.').ok_or_else(|| StoreError::InvalidName {
        name: key.to_string(),
        reason: "config keys look like section.key",
    })?;

    let value = if let Ok(n) = raw.parse::<i64>() {
        toml_edit::value(n)
    } else if let Ok(b) = raw.parse::<bool>() {
        toml_edit::value(b)
    } else {
        toml_edit::value(raw)
    };

    if !doc.contains_key(section) {
        doc[section] = Item::Table(Table::new());
    }
    if !doc[section].is_table_like() {
        return Err(StoreError::InvalidName {
            name: key.to_string(),
            reason: "config section is a plain value, not a table",
        });
    }
    doc[section][name] = value;

    let config: StoreConfig = toml::from_str(&doc.to_string())?;
    Ok(config)
}
