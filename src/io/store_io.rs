use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{StoreError, StoreResult};
use crate::io::atomic::atomic_write;
use crate::io::layout::{CONFIG_FILE, StoreLayout};
use crate::model::config::StoreConfig;

/// An opened store: where it lives and how it is configured
#[derive(Debug, Clone)]
pub struct Store {
    pub layout: StoreLayout,
    pub config: StoreConfig,
}

const CONFIG_TEMPLATE: &str = r##"[store]
name = "{name}"

[loader]
# Threads used to read records in bulk. 0 = one per CPU.
workers = 0
# Give up on reads not started within this many milliseconds. 0 = no limit.
deadline_ms = 0
# List files without a timestamp suffix are skipped instead of failing.
skip_malformed_names = false

[export]
delimiter = ","
# Add a File column with each record's path.
include_path = false
"##;

/// Find the store root by walking up from `start`, looking for `lister.toml`.
pub fn discover_store(start: &Path) -> StoreResult<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).is_file() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(StoreError::NotAStore);
        }
    }
}

/// Open the store rooted at `root`.
pub fn open_store(root: &Path) -> StoreResult<Store> {
    let layout = StoreLayout::new(root);
    let config_path = layout.config_path();
    if !config_path.is_file() {
        return Err(StoreError::NotAStore);
    }
    let text =
        fs::read_to_string(&config_path).map_err(|e| StoreError::io("read", &config_path, e))?;
    let config: StoreConfig = toml::from_str(&text)?;
    Ok(Store { layout, config })
}

/// Create the config and base directories. An existing config is kept
/// unless `force` is set.
pub fn init_store(root: &Path, name: &str, force: bool) -> StoreResult<Store> {
    let layout = StoreLayout::new(root);
    for dir in layout.base_dirs() {
        fs::create_dir_all(&dir).map_err(|e| StoreError::io("create", &dir, e))?;
    }
    let config_path = layout.config_path();
    if force || !config_path.exists() {
        let content = CONFIG_TEMPLATE.replace("{name}", &name.replace('"', "'"));
        atomic_write(&config_path, content.as_bytes())
            .map_err(|e| StoreError::io("write", &config_path, e))?;
        tracing::info!(root = %root.display(), "initialized store");
    }
    open_store(root)
}
