//! Template (schema) registry and the list/archive directories each
//! template owns.
//!
//! Multi-step changes run as a journal of completed steps. When a later step
//! fails, the completed steps are undone in reverse order, best effort; an
//! undo that itself fails is logged and leaves the store in a state the
//! next `read_template` or `list_names` will expose.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{StoreError, StoreResult};
use crate::io::atomic::atomic_write;
use crate::io::layout::StoreLayout;
use crate::model::record::Partition;
use crate::model::template::{FieldDef, Template, check_list_name};
use crate::parse::{parse_template, serialize_template};

/// A completed, reversible filesystem step
#[derive(Debug)]
enum Step {
    CreatedDir(PathBuf),
    WroteFile(PathBuf),
    Moved { from: PathBuf, to: PathBuf },
}

#[derive(Debug, Default)]
struct Journal {
    done: Vec<Step>,
}

impl Journal {
    fn record(&mut self, step: Step) {
        self.done.push(step);
    }

    fn rollback(self) {
        for step in self.done.into_iter().rev() {
            let result = match &step {
                Step::CreatedDir(dir) => fs::remove_dir_all(dir),
                Step::WroteFile(path) => fs::remove_file(path),
                Step::Moved { from, to } => fs::rename(to, from),
            };
            if let Err(e) = result {
                tracing::warn!(?step, error = %e, "rollback step failed");
            }
        }
    }
}

fn validated_name(name: &str) -> StoreResult<()> {
    check_list_name(name).map_err(|reason| StoreError::InvalidName {
        name: name.to_string(),
        reason,
    })
}

fn validated_fields(name: &str, fields: &[FieldDef]) -> StoreResult<Template> {
    let template = Template::new(name, fields.to_vec());
    template
        .check_fields()
        .map_err(|reason| StoreError::TemplateInvalid {
            name: name.to_string(),
            reason,
        })?;
    Ok(template)
}

/// A name is taken if a list directory or a template file already uses it.
fn name_taken(layout: &StoreLayout, name: &str) -> bool {
    layout.partition_dir(name, Partition::Inbox).exists() || layout.template_path(name).exists()
}

fn write_template(layout: &StoreLayout, template: &Template) -> StoreResult<PathBuf> {
    let path = layout.template_path(&template.name);
    let text = serialize_template(template).map_err(|e| StoreError::TemplateInvalid {
        name: template.name.clone(),
        reason: e.to_string(),
    })?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io("create", parent, e))?;
    }
    atomic_write(&path, text.as_bytes()).map_err(|e| StoreError::io("write", &path, e))?;
    Ok(path)
}

/// Create a template and its (empty) list directory.
pub fn create_template(layout: &StoreLayout, name: &str, fields: &[FieldDef]) -> StoreResult<Template> {
    validated_name(name)?;
    let template = validated_fields(name, fields)?;
    if name_taken(layout, name) {
        return Err(StoreError::TemplateExists(name.to_string()));
    }

    let mut journal = Journal::default();
    let schema = write_template(layout, &template)?;
    journal.record(Step::WroteFile(schema));

    let list_dir = layout.partition_dir(name, Partition::Inbox);
    if let Err(e) = fs::create_dir_all(&list_dir) {
        journal.rollback();
        return Err(StoreError::io("create", &list_dir, e));
    }

    tracing::info!(template = name, fields = template.fields.len(), "created template");
    Ok(template)
}

/// Read a template by name.
pub fn read_template(layout: &StoreLayout, name: &str) -> StoreResult<Template> {
    let path = layout.template_path(name);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(StoreError::TemplateNotFound(name.to_string()));
        }
        Err(e) => return Err(StoreError::io("read", &path, e)),
    };
    let template = parse_template(name, &text).map_err(|reason| StoreError::TemplateInvalid {
        name: name.to_string(),
        reason,
    })?;
    template
        .check_fields()
        .map_err(|reason| StoreError::TemplateInvalid {
            name: name.to_string(),
            reason,
        })?;
    Ok(template)
}

/// Replace the fields of an existing template. Records already written
/// keep their old shape.
pub fn update_template(layout: &StoreLayout, name: &str, fields: &[FieldDef]) -> StoreResult<Template> {
    if !layout.template_path(name).exists() {
        return Err(StoreError::TemplateNotFound(name.to_string()));
    }
    let template = validated_fields(name, fields)?;
    write_template(layout, &template)?;
    tracing::info!(template = name, "updated template");
    Ok(template)
}

/// Rename a template and move both of its partitions.
pub fn rename_template(layout: &StoreLayout, old: &str, new: &str) -> StoreResult<Template> {
    validated_name(new)?;
    let template = read_template(layout, old)?;
    if old == new {
        return Ok(template);
    }
    if name_taken(layout, new) || layout.partition_dir(new, Partition::Archive).exists() {
        return Err(StoreError::TemplateExists(new.to_string()));
    }

    let mut journal = Journal::default();
    let result = rename_steps(layout, &template, new, &mut journal);
    match result {
        Ok(renamed) => {
            tracing::info!(from = old, to = new, "renamed template");
            Ok(renamed)
        }
        Err(e) => {
            journal.rollback();
            Err(e)
        }
    }
}

fn rename_steps(
    layout: &StoreLayout,
    template: &Template,
    new: &str,
    journal: &mut Journal,
) -> StoreResult<Template> {
    let old = template.name.as_str();

    for partition in [Partition::Inbox, Partition::Archive] {
        let from = layout.partition_dir(old, partition);
        let to = layout.partition_dir(new, partition);
        if from.exists() {
            move_dir(&from, &to)?;
            journal.record(Step::Moved { from, to });
        } else if partition == Partition::Inbox {
            // Orphaned template: give the new name its list directory
            fs::create_dir_all(&to).map_err(|e| StoreError::io("create", &to, e))?;
            journal.record(Step::CreatedDir(to));
        }
    }

    let renamed = Template::new(new, template.fields.clone());
    #[cfg(test)]
    if tests::FAIL_SCHEMA_WRITE.with(|fail| fail.get()) {
        return Err(StoreError::io(
            "write",
            &layout.template_path(new),
            io::Error::other("schema write failed"),
        ));
    }
    let new_schema = write_template(layout, &renamed)?;
    journal.record(Step::WroteFile(new_schema));

    let old_schema = layout.template_path(old);
    fs::remove_file(&old_schema).map_err(|e| StoreError::io("remove", &old_schema, e))?;
    Ok(renamed)
}

fn move_dir(from: &Path, to: &Path) -> StoreResult<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io("create", parent, e))?;
    }
    fs::rename(from, to).map_err(|e| StoreError::io("move", from, e))
}

/// Delete a template and everything in both of its partitions. No rollback:
/// a failure part way leaves whatever was not yet removed.
pub fn delete_template(layout: &StoreLayout, name: &str) -> StoreResult<()> {
    let schema = layout.template_path(name);
    let inbox = layout.partition_dir(name, Partition::Inbox);
    if !schema.exists() && !inbox.exists() {
        return Err(StoreError::TemplateNotFound(name.to_string()));
    }

    for dir in [layout.partition_dir(name, Partition::Archive), inbox] {
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .map_err(|e| StoreError::DeletionFailed { path: dir.clone(), source: e })?;
        }
    }
    if schema.exists() {
        fs::remove_file(&schema)
            .map_err(|e| StoreError::DeletionFailed { path: schema.clone(), source: e })?;
    }

    tracing::info!(template = name, "deleted template and its records");
    Ok(())
}

/// Names of all lists, sorted.
pub fn list_names(layout: &StoreLayout) -> StoreResult<Vec<String>> {
    let lists_dir = layout.lists_dir();
    let entries = match fs::read_dir(&lists_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io("read", &lists_dir, e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io("read", &lists_dir, e))?;
        if !entry.path().is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str()
            && !name.starts_with('.')
        {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}
