use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::{ArrayRef, RecordBatch, StringArray};
use arrow_csv::WriterBuilder;
use arrow_schema::{DataType, Field, Schema};
use serde::Serialize;

use crate::error::{StoreError, StoreResult};
use crate::io::layout::StoreLayout;
use crate::model::config::ExportConfig;
use crate::model::record::{Partition, Record};
use crate::ops::record_store::{list_records, read_record};
use crate::ops::timestamp::sort_by_recency_lenient;

/// Header of the optional record path column
pub const PATH_COLUMN: &str = "File";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub delimiter: u8,
    pub include_path: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            delimiter: b',',
            include_path: false,
        }
    }
}

impl ExportOptions {
    pub fn from_config(config: &ExportConfig) -> StoreResult<Self> {
        let delimiter = u8::try_from(config.delimiter)
            .ok()
            .filter(|b| b.is_ascii() && !b.is_ascii_alphanumeric() && *b != b'"')
            .ok_or_else(|| StoreError::InvalidFieldValue {
                field: "export.delimiter".into(),
                reason: format!("'{}' cannot be used as a delimiter", config.delimiter),
            })?;
        Ok(ExportOptions {
            delimiter,
            include_path: config.include_path,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub path: PathBuf,
    pub columns: Vec<String>,
    pub rows: usize,
    pub skipped: Vec<SkippedRecord>,
}

/// Write every readable Inbox record of a list to `exports/<list>.csv`,
/// most recent first.
///
/// The header follows the record with the most fields (the first such
/// record on a tie). Fields that record lacks are left out; fields other
/// records lack are left blank.
pub fn export_list(
    layout: &StoreLayout,
    list_name: &str,
    options: &ExportOptions,
) -> StoreResult<ExportReport> {
    let paths = list_records(layout, list_name, Partition::Inbox)?;
    let (sorted, rejected) = sort_by_recency_lenient(paths);

    let mut skipped: Vec<SkippedRecord> = rejected
        .into_iter()
        .map(|path| SkippedRecord {
            path,
            reason: "no creation timestamp in file name".into(),
        })
        .collect();
    let mut loaded: Vec<(PathBuf, Record)> = Vec::with_capacity(sorted.len());
    for path in sorted {
        match read_record(&path) {
            Ok(record) => loaded.push((path, record)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping record in export");
                skipped.push(SkippedRecord {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    let Some(richest) = richest_record(&loaded) else {
        return Err(StoreError::EmptyInput);
    };
    let mut columns: Vec<String> = richest.fields.keys().cloned().collect();

    let mut arrays: Vec<ArrayRef> = columns
        .iter()
        .map(|column| {
            let values: Vec<&str> = loaded
                .iter()
                .map(|(_, r)| r.get(column).unwrap_or_default())
                .collect();
            Arc::new(StringArray::from(values)) as ArrayRef
        })
        .collect();
    if options.include_path {
        let values: Vec<String> = loaded
            .iter()
            .map(|(p, _)| p.display().to_string())
            .collect();
        arrays.push(Arc::new(StringArray::from(values)));
        columns.push(path_column_name(&columns));
    }

    let schema = Schema::new(
        columns
            .iter()
            .map(|c| Field::new(c, DataType::Utf8, false))
            .collect::<Vec<_>>(),
    );
    let target = layout.export_path(list_name);
    let export_err = |source: io::Error| StoreError::ExportFailed {
        path: target.clone(),
        source,
    };
    let batch = RecordBatch::try_new(Arc::new(schema), arrays)
        .map_err(|e| export_err(io::Error::other(e)))?;
    write_csv(&target, &batch, options).map_err(export_err)?;

    tracing::info!(
        list = list_name,
        rows = loaded.len(),
        skipped = skipped.len(),
        path = %target.display(),
        "exported list"
    );
    Ok(ExportReport {
        path: target,
        columns,
        rows: loaded.len(),
        skipped,
    })
}

/// `File`, or `File 2`, `File 3`, ... when a record field already uses it.
fn path_column_name(columns: &[String]) -> String {
    let mut name = PATH_COLUMN.to_string();
    let mut n = 2;
    while columns.iter().any(|c| *c == name) {
        name = format!("{} {}", PATH_COLUMN, n);
        n += 1;
    }
    name
}

fn richest_record(loaded: &[(PathBuf, Record)]) -> Option<&Record> {
    let mut best: Option<&Record> = None;
    for (_, record) in loaded {
        if best.is_none_or(|b| record.fields.len() > b.fields.len()) {
            best = Some(record);
        }
    }
    best
}

fn write_csv(target: &Path, batch: &RecordBatch, options: &ExportOptions) -> io::Result<()> {
    let dir = target.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::Builder::new().prefix(".tmp").tempfile_in(dir)?;
    {
        let mut writer = WriterBuilder::new()
            .with_header(true)
            .with_delimiter(options.delimiter)
            .build(&mut tmp);
        writer.write(batch).map_err(io::Error::other)?;
    }
    tmp.flush()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::template::FieldDef;
    use crate::ops::record_store::{create_record_at, update_record};
    use crate::ops::schema_store::create_template;
    use chrono::{NaiveDate, NaiveDateTime};
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn at(s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, s)
            .unwrap()
    }

    fn store() -> (TempDir, StoreLayout) {
        let tmp = TempDir::new().unwrap();
        let layout = StoreLayout::new(tmp.path());
        create_template(
            &layout,
            "groceries",
            &[FieldDef::text("Title"), FieldDef::text("Qty"), FieldDef::text("Notes")],
        )
        .unwrap();
        (tmp, layout)
    }

    fn add(layout: &StoreLayout, pairs: &[(&str, &str)], s: u32) -> PathBuf {
        let values: IndexMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        create_record_at(layout, "groceries", values, at(s)).unwrap()
    }

    /// Rewrite a record so it only carries the given fields
    fn drift(path: &Path, pairs: &[(&str, &str)]) {
        let fields = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        update_record(path, &Record::new(fields)).unwrap();
    }

    #[test]
    fn richest_record_drives_the_header() {
        let (_tmp, layout) = store();
        add(&layout, &[("Title", "Eggs"), ("Qty", "12"), ("Notes", "free range")], 0);
        let newer = add(&layout, &[("Title", "Milk")], 1);
        drift(&newer, &[("Title", "Milk"), ("Qty", "2")]);

        let report = export_list(&layout, "groceries", &ExportOptions::default()).unwrap();
        assert_eq!(report.columns, vec!["Title", "Qty", "Notes"]);
        assert_eq!(report.rows, 2);
        assert!(report.skipped.is_empty());

        let csv = fs::read_to_string(layout.export_path("groceries")).unwrap();
        assert_eq!(csv, "Title,Qty,Notes\nMilk,2,\nEggs,12,free range\n");
    }

    #[test]
    fn keys_missing_from_richest_record_are_dropped() {
        let (_tmp, layout) = store();
        let a = add(&layout, &[("Title", "A")], 0);
        let b = add(&layout, &[("Title", "B")], 1);
        drift(&a, &[("Title", "A"), ("Aisle", "4")]);
        drift(&b, &[("Title", "B"), ("Qty", "1"), ("Notes", "n")]);

        let report = export_list(&layout, "groceries", &ExportOptions::default()).unwrap();
        assert_eq!(report.columns, vec!["Title", "Qty", "Notes"]);
        let csv = fs::read_to_string(&report.path).unwrap();
        assert_eq!(csv, "Title,Qty,Notes\nB,1,n\nA,,\n");
    }

    #[test]
    fn unreadable_records_are_skipped_and_reported() {
        let (_tmp, layout) = store();
        add(&layout, &[("Title", "Good")], 0);
        let inbox = layout.partition_dir("groceries", Partition::Inbox);
        let bad = inbox.join("groceries_2024-05-01 120005.yaml");
        fs::write(&bad, "[not, a, mapping]\n").unwrap();
        fs::write(inbox.join("stray.yaml"), "Title: x\n").unwrap();

        let report = export_list(&layout, "groceries", &ExportOptions::default()).unwrap();
        assert_eq!(report.rows, 1);
        assert_eq!(report.skipped.len(), 2);
        assert!(report.skipped.iter().any(|s| s.path == bad));
    }

    #[test]
    fn empty_list_fails() {
        let (_tmp, layout) = store();
        assert!(matches!(
            export_list(&layout, "groceries", &ExportOptions::default()),
            Err(StoreError::EmptyInput)
        ));
    }

    #[test]
    fn unknown_list_fails() {
        let (_tmp, layout) = store();
        assert!(matches!(
            export_list(&layout, "books", &ExportOptions::default()),
            Err(StoreError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn delimiter_and_path_column() {
        let (_tmp, layout) = store();
        let path = add(&layout, &[("Title", "Milk"), ("Qty", "2")], 0);
        let options = ExportOptions {
            delimiter: b';',
            include_path: true,
        };
        let report = export_list(&layout, "groceries", &options).unwrap();
        assert_eq!(report.columns, vec!["Title", "Qty", "Notes", PATH_COLUMN]);

        let csv = fs::read_to_string(&report.path).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Title;Qty;Notes;File"));
        assert_eq!(lines.next(), Some(format!("Milk;2;;{}", path.display()).as_str()));
    }

    #[test]
    fn path_column_does_not_collide_with_a_file_field() {
        let tmp = TempDir::new().unwrap();
        let layout = StoreLayout::new(tmp.path());
        create_template(&layout, "scans", &[FieldDef::text("Title"), FieldDef::text("File")]).unwrap();
        let values: IndexMap<String, String> = [("Title", "Receipt"), ("File", "receipt.pdf")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let path = create_record_at(&layout, "scans", values, at(0)).unwrap();

        let options = ExportOptions {
            include_path: true,
            ..Default::default()
        };
        let report = export_list(&layout, "scans", &options).unwrap();
        assert_eq!(report.columns, vec!["Title", "File", "File 2"]);

        let csv = fs::read_to_string(&report.path).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Title,File,File 2"));
        assert_eq!(
            lines.next(),
            Some(format!("Receipt,receipt.pdf,{}", path.display()).as_str())
        );
    }

    #[test]
    fn delimiter_from_config() {
        let tab = ExportConfig {
            delimiter: '\t',
            include_path: false,
        };
        assert_eq!(ExportOptions::from_config(&tab).unwrap().delimiter, b'\t');

        let bad = ExportConfig {
            delimiter: 'é',
            include_path: false,
        };
        assert!(ExportOptions::from_config(&bad).is_err());
    }
}
