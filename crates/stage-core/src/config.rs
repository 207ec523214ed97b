use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory holding the store and config for a stage project.
pub const STAGE_DIR: &str = ".stage";
/// SQLite store file name inside [`STAGE_DIR`].
pub const STORE_FILE: &str = "stage.sqlite3";
/// Project config file name inside [`STAGE_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectConfig {
    #[serde(default)]
    pub forking: ForkingConfig,
    #[serde(default)]
    pub trash: TrashConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForkingConfig {
    /// Item types for which forking is enabled.
    #[serde(default = "default_enabled_types")]
    pub enabled_types: Vec<String>,
    /// Page size when listing a source's archived forks.
    #[serde(default = "default_archived_page_size")]
    pub archived_page_size: u32,
}

impl Default for ForkingConfig {
    fn default() -> Self {
        Self {
            enabled_types: default_enabled_types(),
            archived_page_size: default_archived_page_size(),
        }
    }
}

impl ForkingConfig {
    /// Whether forking is enabled for an item type.
    #[must_use]
    pub fn is_enabled_for(&self, item_type: &str) -> bool {
        self.enabled_types.iter().any(|t| t == item_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrashConfig {
    /// Upper bound on forks trashed in one cascade.
    #[serde(default = "default_cascade_page_size")]
    pub cascade_page_size: u32,
}

impl Default for TrashConfig {
    fn default() -> Self {
        Self {
            cascade_page_size: default_cascade_page_size(),
        }
    }
}

fn default_enabled_types() -> Vec<String> {
    vec!["post".to_string(), "page".to_string()]
}

fn default_archived_page_size() -> u32 {
    10
}

fn default_cascade_page_size() -> u32 {
    500
}

/// `<root>/.stage`
#[must_use]
pub fn stage_dir(project_root: &Path) -> PathBuf {
    project_root.join(STAGE_DIR)
}

/// `<root>/.stage/stage.sqlite3`
#[must_use]
pub fn store_path(project_root: &Path) -> PathBuf {
    stage_dir(project_root).join(STORE_FILE)
}

/// `<root>/.stage/config.toml`
#[must_use]
pub fn config_path(project_root: &Path) -> PathBuf {
    stage_dir(project_root).join(CONFIG_FILE)
}

/// Walk up from `start` looking for a directory containing `.stage/`.
#[must_use]
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if stage_dir(dir).is_dir() {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

/// Load the project config, falling back to defaults when no file exists.
///
/// # Errors
///
/// Returns an error when the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = config_path(project_root);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write the given config to `<root>/.stage/config.toml`, creating the
/// `.stage` directory if needed.
///
/// # Errors
///
/// Returns an error when the directory or file cannot be written.
pub fn write_project_config(project_root: &Path, config: &ProjectConfig) -> Result<()> {
    let dir = stage_dir(project_root);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let path = config_path(project_root);
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))
}
