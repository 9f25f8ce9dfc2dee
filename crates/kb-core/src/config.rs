//! Sync configuration
//!
//! Loads the declarative dataset list (YAML, TOML or JSON) and validates it
//! into [`SyncConfig`]. Every shape problem is reported before any dataset
//! is touched.
//!
//! ```yaml
//! settings:
//!   batch_size: 10
//! datasets:
//!   - path: knowledges/handbook
//!     dataset_name: handbook
//!     create_if_missing: true
//!     indexing_technique: economy
//!     process_rule:
//!       mode: automatic
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use kb_fs::ConfigStore;
use kb_remote::{IndexingOptions, IndexingTechnique, ProcessRule};
use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Result};

/// How a dataset spec identifies its remote dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetTarget {
    /// A fixed remote id, used as-is.
    Id(String),
    /// A dataset name resolved against the remote dataset list.
    Name {
        name: String,
        /// Create the dataset when no dataset has this name.
        create_if_missing: bool,
    },
}

/// One local directory paired with one remote dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSpec {
    pub path: PathBuf,
    pub target: DatasetTarget,
    pub indexing: IndexingOptions,
}

impl DatasetSpec {
    pub fn by_id(path: impl Into<PathBuf>, id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            target: DatasetTarget::Id(id.into()),
            indexing: IndexingOptions::default(),
        }
    }

    pub fn by_name(path: impl Into<PathBuf>, name: impl Into<String>, create_if_missing: bool) -> Self {
        Self {
            path: path.into(),
            target: DatasetTarget::Name {
                name: name.into(),
                create_if_missing,
            },
            indexing: IndexingOptions::default(),
        }
    }

    pub fn with_indexing(mut self, indexing: IndexingOptions) -> Self {
        self.indexing = indexing;
        self
    }

    /// The configured id or name, for reports and logs.
    pub fn label(&self) -> &str {
        match &self.target {
            DatasetTarget::Id(id) => id,
            DatasetTarget::Name { name, .. } => name,
        }
    }
}

/// Tuning knobs for the orchestrator and indexing monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Creates/updates applied before each indexing wait.
    pub batch_size: usize,
    pub poll_interval: Duration,
    pub indexing_timeout: Duration,
}

impl SyncSettings {
    pub const DEFAULT_BATCH_SIZE: usize = 10;
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
    pub const DEFAULT_INDEXING_TIMEOUT: Duration = Duration::from_secs(600);
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            batch_size: Self::DEFAULT_BATCH_SIZE,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            indexing_timeout: Self::DEFAULT_INDEXING_TIMEOUT,
        }
    }
}

/// Validated sync configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub settings: SyncSettings,
    pub datasets: Vec<DatasetSpec>,
}

#[derive(Debug, Deserialize)]
struct RawSyncConfig {
    #[serde(default)]
    settings: RawSettings,
    datasets: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    batch_size: Option<usize>,
    poll_interval_secs: Option<u64>,
    indexing_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawDataset {
    path: Option<String>,
    dataset_id: Option<String>,
    dataset_name: Option<String>,
    #[serde(default)]
    create_if_missing: bool,
    indexing_technique: Option<IndexingTechnique>,
    process_rule: Option<ProcessRule>,
}

impl SyncConfig {
    /// Load and validate a config file.
    ///
    /// Relative dataset paths are resolved against the config file's
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fs`] if the file is missing or unparsable and
    /// [`Error::InvalidConfig`] if its content has the wrong shape.
    pub fn load(path: &Path) -> Result<Self> {
        let raw: RawSyncConfig = ConfigStore::new().load(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        tracing::debug!(?path, "Loaded sync config");
        Self::validate(raw, path, base_dir)
    }

    fn validate(raw: RawSyncConfig, path: &Path, base_dir: &Path) -> Result<Self> {
        let invalid = |message: String| Error::InvalidConfig {
            path: path.to_path_buf(),
            message,
        };

        let Some(Value::Array(raw_datasets)) = raw.datasets else {
            return Err(invalid("'datasets' array is required".to_string()));
        };

        let defaults = SyncSettings::default();
        let settings = SyncSettings {
            batch_size: raw.settings.batch_size.unwrap_or(defaults.batch_size),
            poll_interval: raw
                .settings
                .poll_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
            indexing_timeout: raw
                .settings
                .indexing_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.indexing_timeout),
        };
        if settings.batch_size == 0 {
            return Err(invalid("settings.batch_size must be at least 1".to_string()));
        }
        if settings.poll_interval.is_zero() {
            return Err(invalid(
                "settings.poll_interval_secs must be at least 1".to_string(),
            ));
        }

        let mut datasets = Vec::with_capacity(raw_datasets.len());
        for (index, value) in raw_datasets.into_iter().enumerate() {
            let entry: RawDataset = serde_json::from_value(value)
                .map_err(|e| invalid(format!("datasets[{index}]: {e}")))?;
            let dir = entry
                .path
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| invalid(format!("datasets[{index}]: 'path' is required")))?;

            let target = match (entry.dataset_id, entry.dataset_name) {
                (Some(id), None) if !id.trim().is_empty() => {
                    if entry.create_if_missing {
                        return Err(invalid(format!(
                            "datasets[{index}]: 'create_if_missing' requires 'dataset_name'"
                        )));
                    }
                    DatasetTarget::Id(id)
                }
                (None, Some(name)) if !name.trim().is_empty() => DatasetTarget::Name {
                    name,
                    create_if_missing: entry.create_if_missing,
                },
                (Some(_), Some(_)) => {
                    return Err(invalid(format!(
                        "datasets[{index}]: set either 'dataset_id' or 'dataset_name', not both"
                    )));
                }
                _ => {
                    return Err(invalid(format!(
                        "datasets[{index}]: 'dataset_id' or 'dataset_name' is required"
                    )));
                }
            };

            datasets.push(DatasetSpec {
                path: base_dir.join(dir),
                target,
                indexing: IndexingOptions {
                    technique: entry.indexing_technique.unwrap_or_default(),
                    process_rule: entry.process_rule.unwrap_or_default(),
                },
            });
        }

        Ok(Self { settings, datasets })
    }
}
