use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";
pub const DEFAULT_VIEWER_URL: &str = "https://docs.google.com/gview?embedded=true";
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub viewer_url: String,
    pub page_size: usize,
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            viewer_url: DEFAULT_VIEWER_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout_secs: None,
        }
    }
}

impl Config {
    pub fn config_path() -> anyhow::Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "filedock", "filedock")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Load the user's config file, falling back to defaults when there is none.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?
        } else {
            Config::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.page_size == 0 {
            anyhow::bail!("page_size must be at least 1");
        }
        if self.server_url.trim().is_empty() {
            anyhow::bail!("No server configured");
        }
        Ok(())
    }

    pub fn page_size(&self) -> anyhow::Result<NonZeroUsize> {
        NonZeroUsize::new(self.page_size)
            .ok_or_else(|| anyhow::anyhow!("page_size must be at least 1"))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
