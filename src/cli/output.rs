use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;

use crate::model::record::{Partition, Record, RecordSummary};
use crate::model::template::{FieldType, Template};
use crate::ops::loader::SummarySlot;
use crate::ops::table::Table;
use crate::util::unicode::{display_width, fit_cell};

/// Table cells wider than this are truncated
const MAX_CELL_WIDTH: usize = 40;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ListInfoJson {
    pub name: String,
    pub inbox: usize,
    pub archive: usize,
}

#[derive(Serialize)]
pub struct FieldJson {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: &'static str,
    pub input: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct TemplateJson {
    pub name: String,
    pub fields: Vec<FieldJson>,
}

#[derive(Serialize)]
pub struct RecordJson {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition: Option<Partition>,
    pub checked: bool,
    pub fields: IndexMap<String, String>,
}

#[derive(Serialize)]
pub struct CheckedJson {
    pub path: String,
    pub checked: bool,
}

#[derive(Serialize)]
pub struct MovedJson {
    pub from: String,
    pub to: String,
}

#[derive(Serialize)]
pub struct RenamedJson {
    pub from: String,
    pub template: TemplateJson,
}

#[derive(Serialize)]
pub struct DeletedJson {
    pub deleted: String,
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

pub fn template_to_json(template: &Template) -> TemplateJson {
    TemplateJson {
        name: template.name.clone(),
        fields: template
            .fields
            .iter()
            .map(|f| FieldJson {
                name: f.name.clone(),
                field_type: f.field_type.type_name(),
                input: f.field_type.input_hint(),
                categories: match &f.field_type {
                    FieldType::Category(c) => Some(c.clone()),
                    _ => None,
                },
            })
            .collect(),
    }
}

pub fn record_to_json(
    path: &Path,
    located: Option<(String, Partition)>,
    record: &Record,
) -> RecordJson {
    let (list, partition) = located.unzip();
    RecordJson {
        path: path.display().to_string(),
        list,
        partition,
        checked: record.checked,
        fields: record.fields.clone(),
    }
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

fn check_char(checked: bool) -> char {
    if checked { 'x' } else { ' ' }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// One line per summary: `[x] Title  (file name)`
pub fn format_summary_line(summary: &RecordSummary) -> String {
    format!(
        "[{}] {}  ({})",
        check_char(summary.checked),
        summary.primary_value,
        file_name(&summary.path)
    )
}

/// Like [`format_summary_line`], with placeholders for entries that did not
/// load.
pub fn format_slot_line(slot: &SummarySlot) -> String {
    match slot {
        SummarySlot::Loaded(summary) => format_summary_line(summary),
        SummarySlot::Failed { path, reason } => {
            format!("[!] <unreadable: {}>  ({})", reason, file_name(path))
        }
        SummarySlot::TimedOut { path } => format!("[?] <not loaded>  ({})", file_name(path)),
    }
}

pub fn format_record_detail(path: &Path, record: &Record) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!(
        "[{}] {}",
        check_char(record.checked),
        record.primary_value()
    ));
    let key_width = record
        .fields
        .keys()
        .map(|k| display_width(k))
        .max()
        .unwrap_or(0);
    for (key, value) in record.fields.iter().skip(1) {
        lines.push(format!("  {}: {}", fit_cell(key, key_width), value));
    }
    lines.push(format!("file: {}", path.display()));
    lines
}

pub fn format_template(template: &Template) -> Vec<String> {
    let mut lines = vec![template.name.clone()];
    for (i, field) in template.fields.iter().enumerate() {
        let marker = if i == 0 { "*" } else { " " };
        let kind = match &field.field_type {
            FieldType::Category(c) => format!("Category [{}]", c.join(", ")),
            other => other.type_name().to_string(),
        };
        lines.push(format!("{} {}: {}", marker, field.name, kind));
    }
    lines
}

/// Render a table with aligned columns and a rule under the header.
pub fn format_table(table: &Table) -> Vec<String> {
    let widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            table
                .rows
                .iter()
                .map(|r| display_width(&r[i]))
                .chain(std::iter::once(display_width(column)))
                .max()
                .unwrap_or(0)
                .min(MAX_CELL_WIDTH)
        })
        .collect();

    let render = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| fit_cell(cell, *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(table.rows.len() + 2);
    lines.push(render(&table.columns));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in &table.rows {
        lines.push(render(row));
    }
    lines
}
