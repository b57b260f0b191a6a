use serde::Serialize;

use crate::error::{StoreError, StoreResult};
use crate::model::record::Record;

/// Sort state held by the caller across projections
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSort {
    pub key: Option<String>,
    pub reverse: bool,
}

impl TableSort {
    pub fn by(key: impl Into<String>) -> Self {
        TableSort {
            key: Some(key.into()),
            reverse: false,
        }
    }

    /// Select a column: the same column twice flips direction, a new column
    /// starts ascending.
    pub fn select(&mut self, key: &str) {
        if self.key.as_deref() == Some(key) {
            self.reverse = !self.reverse;
        } else {
            self.key = Some(key.to_string());
            self.reverse = false;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Project records into a table. Columns are the union of all field names
/// in first-seen order; absent values are empty strings.
pub fn project(records: &[Record], sort: &TableSort) -> StoreResult<Table> {
    if records.is_empty() {
        return Err(StoreError::EmptyInput);
    }

    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for key in record.fields.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let mut rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            columns
                .iter()
                .map(|c| r.get(c).unwrap_or_default().to_string())
                .collect()
        })
        .collect();

    let mut table = Table { columns, rows: Vec::new() };
    if let Some(key) = &sort.key {
        let idx = table
            .column_index(key)
            .ok_or_else(|| StoreError::UnknownColumn(key.clone()))?;
        rows.sort_by(|a, b| {
            let ord = a[idx].cmp(&b[idx]);
            if sort.reverse { ord.reverse() } else { ord }
        });
    }
    table.rows = rows;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn rec(pairs: &[(&str, &str)]) -> Record {
        let fields: IndexMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Record::new(fields)
    }

    fn strs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn union_of_keys_in_first_seen_order() {
        let records = vec![
            rec(&[("Title", "Milk"), ("Qty", "2")]),
            rec(&[("Title", "Eggs"), ("Notes", "free range"), ("Qty", "12")]),
            rec(&[("Aisle", "4")]),
        ];
        let table = project(&records, &TableSort::default()).unwrap();
        assert_eq!(table.columns, strs(&["Title", "Qty", "Notes", "Aisle"]));
        assert_eq!(
            table.rows,
            vec![
                strs(&["Milk", "2", "", ""]),
                strs(&["Eggs", "12", "free range", ""]),
                strs(&["", "", "", "4"]),
            ]
        );
    }

    #[test]
    fn checked_is_not_a_column() {
        let mut r = rec(&[("Title", "Milk")]);
        r.checked = true;
        let table = project(&[r], &TableSort::default()).unwrap();
        assert_eq!(table.columns, strs(&["Title"]));
    }

    #[test]
    fn empty_input_fails() {
        assert!(matches!(
            project(&[], &TableSort::default()),
            Err(StoreError::EmptyInput)
        ));
    }

    #[test]
    fn sort_is_stable_and_toggles() {
        let records = vec![
            rec(&[("Title", "b"), ("Tag", "x")]),
            rec(&[("Title", "a"), ("Tag", "y")]),
            rec(&[("Title", "b"), ("Tag", "z")]),
            rec(&[("Title", "c"), ("Tag", "w")]),
        ];
        let mut sort = TableSort::default();
        sort.select("Title");
        let asc = project(&records, &sort).unwrap();
        let tags: Vec<&str> = asc.rows.iter().map(|r| r[1].as_str()).collect();
        assert_eq!(tags, vec!["y", "x", "z", "w"]);

        sort.select("Title");
        assert!(sort.reverse);
        let desc = project(&records, &sort).unwrap();
        let tags: Vec<&str> = desc.rows.iter().map(|r| r[1].as_str()).collect();
        assert_eq!(tags, vec!["w", "x", "z", "y"]);

        sort.select("Tag");
        assert_eq!(sort, TableSort::by("Tag"));
    }

    #[test]
    fn no_key_keeps_load_order() {
        let records = vec![rec(&[("Title", "z")]), rec(&[("Title", "a")])];
        let table = project(&records, &TableSort::default()).unwrap();
        assert_eq!(table.rows, vec![strs(&["z"]), strs(&["a"])]);
    }

    #[test]
    fn unknown_sort_column_fails() {
        let records = vec![rec(&[("Title", "z")])];
        assert!(matches!(
            project(&records, &TableSort::by("Qty")),
            Err(StoreError::UnknownColumn(c)) if c == "Qty"
        ));
    }
}
