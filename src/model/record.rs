use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Where a record lives within its list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Inbox,
    Archive,
}

impl Partition {
    pub fn opposite(self) -> Partition {
        match self {
            Partition::Inbox => Partition::Archive,
            Partition::Archive => Partition::Inbox,
        }
    }

    /// Whether a record with this `checked` state should leave the partition
    /// during a bulk transition: checked items get archived, unchecked
    /// archived items get restored.
    pub fn is_eligible(self, checked: bool) -> bool {
        match self {
            Partition::Inbox => checked,
            Partition::Archive => !checked,
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::Inbox => write!(f, "inbox"),
            Partition::Archive => write!(f, "archive"),
        }
    }
}

/// One stored item: ordered field values plus the completion flag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub fields: IndexMap<String, String>,
    pub checked: bool,
}

impl Record {
    pub fn new(fields: IndexMap<String, String>) -> Self {
        Record {
            fields,
            checked: false,
        }
    }

    /// Value of the first field, used as the display title
    pub fn primary_value(&self) -> &str {
        self.fields.first().map(|(_, v)| v.as_str()).unwrap_or("")
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(|s| s.as_str())
    }
}

/// Lightweight view of a record for list display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSummary {
    pub primary_value: String,
    pub path: PathBuf,
    pub checked: bool,
    pub partition: Partition,
}
