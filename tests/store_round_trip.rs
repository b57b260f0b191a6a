//! End-to-end tests of the store through the library API: file formats,
//! creation and reading, ordering, archive moves, tables and export.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use lister::error::StoreError;
use lister::io::layout::StoreLayout;
use lister::io::store_io::init_store;
use lister::model::record::Partition;
use lister::model::template::{FieldDef, FieldType};
use lister::ops::archive::{archive_record, restore_record};
use lister::ops::export::{ExportOptions, export_list};
use lister::ops::loader::{LoadOptions, SummarySlot, load_partition, load_summaries};
use lister::ops::record_store::{create_record_at, list_records, read_record};
use lister::ops::schema_store::{create_template, read_template};
use lister::ops::table::{TableSort, project};
use lister::ops::timestamp::sort_by_recency;
use lister::parse::{parse_record, parse_template, serialize_record, serialize_template};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Could not read fixture {}: {}", name, e))
}

fn at(day: u32, secs: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, day)
        .unwrap()
        .and_hms_opt(8 + secs / 3600, (secs / 60) % 60, secs % 60)
        .unwrap()
}

fn values(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn new_store() -> (TempDir, StoreLayout) {
    let tmp = TempDir::new().unwrap();
    let store = init_store(tmp.path(), "test", false).unwrap();
    (tmp, store.layout)
}

fn titles(slots: &[SummarySlot]) -> Vec<String> {
    slots
        .iter()
        .map(|s| s.summary().map(|s| s.primary_value.clone()).unwrap_or_default())
        .collect()
}

// ============================================================================
// File formats
// ============================================================================

#[test]
fn round_trip_template_fixture() {
    let source = fixture("groceries.yaml");
    let template = parse_template("groceries", &source).unwrap();
    assert_eq!(template.fields.len(), 4);
    assert_eq!(template.fields[2].field_type, FieldType::Date);
    assert_eq!(serialize_template(&template).unwrap(), source);
}

#[test]
fn round_trip_blank_record_fixture() {
    let source = fixture("record_blank_fields.yaml");
    let record = parse_record(&source).unwrap();
    assert_eq!(record.primary_value(), "Buy eggs");
    assert_eq!(record.get("Qty"), Some(""));
    assert!(!record.checked);
    assert_eq!(serialize_record(&record), source);
}

#[test]
fn checked_record_fixture_survives_rewrite() {
    let record = parse_record(&fixture("record_checked.yaml")).unwrap();
    assert!(record.checked);
    let keys: Vec<&str> = record.fields.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["Title", "Qty", "Bought", "Aisle"]);
    assert_eq!(record.get("Qty"), Some("2"));
    assert_eq!(record.get("Bought"), Some("2024-05-01"));

    let again = parse_record(&serialize_record(&record)).unwrap();
    assert_eq!(again, record);
}

#[test]
fn template_fixture_loads_from_store() {
    let (_tmp, layout) = new_store();
    fs::write(layout.template_path("groceries"), fixture("groceries.yaml")).unwrap();
    fs::create_dir_all(layout.partition_dir("groceries", Partition::Inbox)).unwrap();

    let template = read_template(&layout, "groceries").unwrap();
    assert_eq!(template.primary_field().unwrap().name, "Title");

    let path = create_record_at(
        &layout,
        "groceries",
        values(&[("Aisle", "produce"), ("Title", "Apples"), ("Bought", "2024-05-01")]),
        at(1, 0),
    )
    .unwrap();
    // Written in template order with every declared field present
    let text = fs::read_to_string(&path).unwrap();
    let keys: Vec<&str> = text.lines().filter_map(|l| l.split(':').next()).collect();
    assert_eq!(keys, vec!["Title", "Qty", "Bought", "Aisle", "checked"]);
}

// ============================================================================
// Testable properties
// ============================================================================

#[test]
fn create_then_read_returns_same_mapping_unchecked() {
    let (_tmp, layout) = new_store();
    create_template(
        &layout,
        "books",
        &[
            FieldDef::text("Title"),
            FieldDef::text("Author"),
            FieldDef::new("Pages", FieldType::Number),
        ],
    )
    .unwrap();

    let cases = [
        values(&[("Title", "Dune"), ("Author", "Herbert"), ("Pages", "412")]),
        values(&[("Title", "  padded  "), ("Author", ""), ("Pages", "")]),
        values(&[("Title", "Ünïcödé: a \"quoted\" title"), ("Author", "x: y"), ("Pages", "1.5")]),
        values(&[("Title", "true"), ("Author", "null"), ("Pages", "-3")]),
    ];
    for (i, input) in cases.into_iter().enumerate() {
        let path = create_record_at(&layout, "books", input.clone(), at(2, i as u32)).unwrap();
        let record = read_record(&path).unwrap();
        assert_eq!(record.fields, input);
        assert!(!record.checked);
    }
}

#[test]
fn blank_primary_field_writes_nothing() {
    let (_tmp, layout) = new_store();
    create_template(&layout, "books", &[FieldDef::text("Title"), FieldDef::text("Author")]).unwrap();

    for title in ["", "   ", "\t"] {
        let result = create_record_at(
            &layout,
            "books",
            values(&[("Title", title), ("Author", "someone")]),
            at(1, 0),
        );
        assert!(matches!(result, Err(StoreError::PrimaryFieldEmpty(f)) if f == "Title"));
    }
    assert!(list_records(&layout, "books", Partition::Inbox).unwrap().is_empty());
}

#[test]
fn groceries_most_recent_first() {
    let (_tmp, layout) = new_store();
    create_template(&layout, "groceries", &[FieldDef::text("Title")]).unwrap();
    create_record_at(&layout, "groceries", values(&[("Title", "Buy milk")]), at(1, 0)).unwrap();
    create_record_at(&layout, "groceries", values(&[("Title", "Buy eggs")]), at(1, 1)).unwrap();

    let paths = sort_by_recency(list_records(&layout, "groceries", Partition::Inbox).unwrap()).unwrap();
    let slots = load_summaries(&layout, &paths, &LoadOptions::default()).unwrap();
    assert_eq!(titles(&slots), vec!["Buy eggs", "Buy milk"]);
}

#[test]
fn same_second_creations_do_not_overwrite() {
    let (_tmp, layout) = new_store();
    create_template(&layout, "groceries", &[FieldDef::text("Title")]).unwrap();
    let mut paths = Vec::new();
    for title in ["one", "two", "three"] {
        paths.push(create_record_at(&layout, "groceries", values(&[("Title", title)]), at(1, 0)).unwrap());
    }
    assert_eq!(list_records(&layout, "groceries", Partition::Inbox).unwrap().len(), 3);

    let slots =
        load_partition(&layout, "groceries", Partition::Inbox, &LoadOptions::default()).unwrap();
    assert_eq!(titles(&slots), vec!["three", "two", "one"]);
}

#[test]
fn pool_size_never_changes_order() {
    let (_tmp, layout) = new_store();
    create_template(&layout, "groceries", &[FieldDef::text("Title")]).unwrap();
    for i in 0..100u32 {
        let title = format!("item {:03}", i);
        create_record_at(
            &layout,
            "groceries",
            values(&[("Title", title.as_str())]),
            at(1 + i % 3, i * 7),
        )
        .unwrap();
    }
    let paths: Vec<PathBuf> =
        sort_by_recency(list_records(&layout, "groceries", Partition::Inbox).unwrap()).unwrap();

    let baseline = load_summaries(
        &layout,
        &paths,
        &LoadOptions {
            workers: Some(1),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(baseline.len(), 100);
    for workers in [2, 4, 7, 16, 200] {
        let slots = load_summaries(
            &layout,
            &paths,
            &LoadOptions {
                workers: Some(workers),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(slots, baseline, "workers = {}", workers);
    }
}

#[test]
fn archive_then_restore_leaves_record_unchanged() {
    let (_tmp, layout) = new_store();
    create_template(&layout, "groceries", &[FieldDef::text("Title"), FieldDef::text("Notes")]).unwrap();
    let path = create_record_at(
        &layout,
        "groceries",
        values(&[("Title", "Buy milk"), ("Notes", "semi-skimmed")]),
        at(1, 0),
    )
    .unwrap();
    let before = fs::read(&path).unwrap();

    let archived = archive_record(&layout, &path).unwrap();
    assert_eq!(list_records(&layout, "groceries", Partition::Inbox).unwrap().len(), 0);
    assert_eq!(list_records(&layout, "groceries", Partition::Archive).unwrap(), vec![archived.clone()]);

    let restored = restore_record(&layout, &archived).unwrap();
    assert_eq!(restored, path);
    assert_eq!(fs::read(&restored).unwrap(), before);
    assert!(list_records(&layout, "groceries", Partition::Archive).unwrap().is_empty());
}

#[test]
fn table_headers_are_union_of_keys() {
    let (_tmp, layout) = new_store();
    create_template(&layout, "groceries", &[FieldDef::text("Title"), FieldDef::text("Qty")]).unwrap();
    create_record_at(&layout, "groceries", values(&[("Title", "Milk"), ("Qty", "2")]), at(1, 0)).unwrap();

    // Template drift: later records carry a field the first one lacks
    lister::ops::schema_store::update_template(
        &layout,
        "groceries",
        &[FieldDef::text("Title"), FieldDef::text("Notes")],
    )
    .unwrap();
    create_record_at(&layout, "groceries", values(&[("Title", "Eggs"), ("Notes", "brown")]), at(1, 1)).unwrap();

    let paths = sort_by_recency(list_records(&layout, "groceries", Partition::Inbox).unwrap()).unwrap();
    let records: Vec<_> = paths.iter().map(|p| read_record(p).unwrap()).collect();
    let table = project(&records, &TableSort::default()).unwrap();
    assert_eq!(table.columns, vec!["Title", "Notes", "Qty"]);
    assert_eq!(
        table.rows,
        vec![vec!["Eggs", "brown", ""], vec!["Milk", "", "2"]]
    );
}

#[test]
fn export_example_three_columns() {
    let (_tmp, layout) = new_store();
    create_template(
        &layout,
        "groceries",
        &[FieldDef::text("Title"), FieldDef::text("Qty"), FieldDef::text("Notes")],
    )
    .unwrap();
    create_record_at(
        &layout,
        "groceries",
        values(&[("Title", "Eggs"), ("Qty", "12"), ("Notes", "brown")]),
        at(1, 0),
    )
    .unwrap();
    // Written by hand without a Notes field
    let hand_written = layout
        .partition_dir("groceries", Partition::Inbox)
        .join("groceries_2024-05-01 080001.yaml");
    fs::write(&hand_written, "Title: Milk\nQty: '2'\nchecked: false\n").unwrap();

    let report = export_list(&layout, "groceries", &ExportOptions::default()).unwrap();
    let csv = fs::read_to_string(&report.path).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("Title,Qty,Notes"));
    assert_eq!(lines.next(), Some("Milk,2,"));
    assert_eq!(lines.next(), Some("Eggs,12,brown"));
    assert_eq!(lines.next(), None);
}
