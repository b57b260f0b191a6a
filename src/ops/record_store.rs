use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use indexmap::IndexMap;

use crate::error::{StoreError, StoreResult};
use crate::io::atomic::{atomic_write, atomic_write_new};
use crate::io::layout::{RECORD_EXTENSION, StoreLayout};
use crate::model::record::{Partition, Record};
use crate::model::template::{CHECKED_KEY, Template};
use crate::ops::schema_store::read_template;
use crate::ops::timestamp::RecordStamp;
use crate::parse::{parse_record, serialize_record};

/// Same-second creations get `-1`, `-2`, ... up to this many.
const MAX_SAME_SECOND: u32 = 10_000;

/// Create a record in the list's inbox, stamped with the current local time.
pub fn create_record(
    layout: &StoreLayout,
    list_name: &str,
    values: IndexMap<String, String>,
) -> StoreResult<PathBuf> {
    create_record_at(layout, list_name, values, Local::now().naive_local())
}

/// Create a record stamped with `now`. Returns the new record's path.
pub fn create_record_at(
    layout: &StoreLayout,
    list_name: &str,
    values: IndexMap<String, String>,
    now: NaiveDateTime,
) -> StoreResult<PathBuf> {
    let template = read_template(layout, list_name)?;
    let record = Record::new(shape_values(&template, values)?);
    let content = serialize_record(&record);

    let inbox = layout.partition_dir(list_name, Partition::Inbox);
    fs::create_dir_all(&inbox).map_err(|e| StoreError::io("create", &inbox, e))?;
    let archive = layout.partition_dir(list_name, Partition::Archive);

    for seq in 0..MAX_SAME_SECOND {
        let stamp = RecordStamp { at: now, seq };
        let file_name = format!("{}.{}", stamp.file_stem(list_name), RECORD_EXTENSION);
        // A name already used in the archive would put one identity in
        // both partitions
        if archive.join(&file_name).exists() {
            continue;
        }
        let path = inbox.join(&file_name);
        match atomic_write_new(&path, content.as_bytes()) {
            Ok(()) => {
                tracing::info!(list = list_name, path = %path.display(), "created record");
                return Ok(path);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(StoreError::io("write", &path, e)),
        }
    }
    Err(StoreError::io(
        "write",
        inbox,
        io::Error::new(io::ErrorKind::AlreadyExists, "too many records in one second"),
    ))
}

/// Order values as the template declares them, fill in missing fields,
/// and validate each value against its field type.
fn shape_values(
    template: &Template,
    mut values: IndexMap<String, String>,
) -> StoreResult<IndexMap<String, String>> {
    if let Some(extra) = values
        .keys()
        .find(|k| k.as_str() == CHECKED_KEY || template.field(k).is_none())
    {
        return Err(StoreError::InvalidFieldValue {
            field: extra.clone(),
            reason: format!("not a field of template '{}'", template.name),
        });
    }

    let mut shaped = IndexMap::with_capacity(template.fields.len());
    for (i, field) in template.fields.iter().enumerate() {
        let value = values.shift_remove(&field.name).unwrap_or_default();
        if i == 0 && value.trim().is_empty() {
            return Err(StoreError::PrimaryFieldEmpty(field.name.clone()));
        }
        field
            .field_type
            .validate(&value)
            .map_err(|reason| StoreError::InvalidFieldValue {
                field: field.name.clone(),
                reason,
            })?;
        shaped.insert(field.name.clone(), value);
    }
    Ok(shaped)
}

/// Read a record in full.
pub fn read_record(path: &Path) -> StoreResult<Record> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(StoreError::RecordNotFound(path.to_path_buf()));
        }
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            return Err(StoreError::RecordCorrupt {
                path: path.to_path_buf(),
                reason: "file is not valid UTF-8".to_string(),
            });
        }
        Err(e) => return Err(StoreError::io("read", path, e)),
    };
    parse_record(&text).map_err(|reason| StoreError::RecordCorrupt {
        path: path.to_path_buf(),
        reason,
    })
}

/// Overwrite a record in full. `record.checked` is written as given.
pub fn update_record(path: &Path, record: &Record) -> StoreResult<()> {
    if !path.is_file() {
        return Err(StoreError::RecordNotFound(path.to_path_buf()));
    }
    atomic_write(path, serialize_record(record).as_bytes())
        .map_err(|e| StoreError::io("write", path, e))?;
    tracing::debug!(path = %path.display(), "updated record");
    Ok(())
}

/// Delete a record file.
pub fn delete_record(path: &Path) -> StoreResult<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "deleted record");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(StoreError::RecordNotFound(path.to_path_buf()))
        }
        Err(e) => Err(StoreError::DeletionFailed {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Flip the `checked` flag and persist it. Returns the new state.
pub fn toggle_checked(path: &Path) -> StoreResult<bool> {
    let mut record = read_record(path)?;
    record.checked = !record.checked;
    update_record(path, &record)?;
    Ok(record.checked)
}

/// Regular files directly under one partition of a list, in directory order.
/// Contents are not checked. Dot-files are skipped.
pub fn list_records(
    layout: &StoreLayout,
    list_name: &str,
    partition: Partition,
) -> StoreResult<Vec<PathBuf>> {
    let dir = layout.partition_dir(list_name, partition);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let known = layout.template_path(list_name).exists()
                || layout.partition_dir(list_name, Partition::Inbox).exists();
            return if known {
                Ok(Vec::new())
            } else {
                Err(StoreError::TemplateNotFound(list_name.to_string()))
            };
        }
        Err(e) => return Err(StoreError::io("read", &dir, e)),
    };

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io("read", &dir, e))?;
        let file_type = entry.file_type().map_err(|e| StoreError::io("read", entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        paths.push(entry.path());
    }
    Ok(paths)
}

/// Resolve a user-supplied record reference: an existing path, or a bare
/// file name (with or without `.yaml`) searched for in every list.
pub fn resolve_record(layout: &StoreLayout, reference: &str) -> StoreResult<PathBuf> {
    let direct = PathBuf::from(reference);
    if direct.is_file() {
        return Ok(direct);
    }

    let file_name = if reference.ends_with(&format!(".{}", RECORD_EXTENSION)) {
        reference.to_string()
    } else {
        format!("{}.{}", reference, RECORD_EXTENSION)
    };
    for partition in [Partition::Inbox, Partition::Archive] {
        let root = layout.partition_root(partition);
        let Ok(lists) = fs::read_dir(&root) else {
            continue;
        };
        for list in lists.flatten() {
            let candidate = list.path().join(&file_name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }
    Err(StoreError::RecordNotFound(direct))
}
