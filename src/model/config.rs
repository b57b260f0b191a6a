use serde::{Deserialize, Serialize};

/// Configuration from lister.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub store: StoreInfo,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreInfo {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Worker threads for bulk loads. 0 = available parallelism.
    #[serde(default)]
    pub workers: usize,
    /// Batch deadline in milliseconds. 0 = no deadline.
    #[serde(default)]
    pub deadline_ms: u64,
    /// Skip files without a timestamp suffix instead of failing the listing
    #[serde(default)]
    pub skip_malformed_names: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Append a `File` column holding each record's path
    #[serde(default)]
    pub include_path: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            delimiter: default_delimiter(),
            include_path: false,
        }
    }
}

fn default_delimiter() -> char {
    ','
}
