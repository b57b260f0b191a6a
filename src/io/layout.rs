use std::path::{Path, PathBuf};

use crate::model::record::Partition;

pub const CONFIG_FILE: &str = "lister.toml";
const LISTS_DIR: &str = "lists";
const ARCHIVES_DIR: &str = "archives";
const TEMPLATES_DIR: &str = "templates";
const EXPORTS_DIR: &str = "exports";
const LOCKS_DIR: &str = ".locks";

pub const RECORD_EXTENSION: &str = "yaml";

/// Directory layout of a store rooted at `root`:
///
/// ```text
/// lister.toml
/// lists/<name>/*.yaml       inbox partition
/// archives/<name>/*.yaml    archive partition (created lazily)
/// templates/<name>.yaml     schema
/// exports/<name>.csv        export target
/// .locks/<name>.lock        advisory write locks
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        StoreLayout { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn lists_dir(&self) -> PathBuf {
        self.root.join(LISTS_DIR)
    }

    pub fn archives_dir(&self) -> PathBuf {
        self.root.join(ARCHIVES_DIR)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join(TEMPLATES_DIR)
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.root.join(EXPORTS_DIR)
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.root.join(LOCKS_DIR)
    }

    /// All directories `init` creates
    pub fn base_dirs(&self) -> [PathBuf; 4] {
        [
            self.lists_dir(),
            self.templates_dir(),
            self.exports_dir(),
            self.archives_dir(),
        ]
    }

    pub fn partition_root(&self, partition: Partition) -> PathBuf {
        match partition {
            Partition::Inbox => self.lists_dir(),
            Partition::Archive => self.archives_dir(),
        }
    }

    pub fn partition_dir(&self, list_name: &str, partition: Partition) -> PathBuf {
        self.partition_root(partition).join(list_name)
    }

    pub fn template_path(&self, name: &str) -> PathBuf {
        self.templates_dir().join(format!("{}.yaml", name))
    }

    pub fn export_path(&self, name: &str) -> PathBuf {
        self.exports_dir().join(format!("{}.csv", name))
    }

    /// Work out which list and partition a record path belongs to, from its
    /// two parent directories.
    pub fn locate(&self, record: &Path) -> Option<(String, Partition)> {
        let list_dir = record.parent()?;
        let list_name = list_dir.file_name()?.to_str()?.to_string();
        let partition_root = list_dir.parent()?;
        for partition in [Partition::Inbox, Partition::Archive] {
            if same_dir(partition_root, &self.partition_root(partition)) {
                return Some((list_name, partition));
            }
        }
        None
    }

    /// Where `record` would live if it were in `partition`
    pub fn counterpart(&self, record: &Path, partition: Partition) -> Option<PathBuf> {
        let (list_name, _) = self.locate(record)?;
        let file_name = record.file_name()?;
        Some(self.partition_dir(&list_name, partition).join(file_name))
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
