use anyhow::{Context, Result};
use directories::ProjectDirs;
use fisiovem::policy::{
    SchedulingPolicy, DEFAULT_NOTICE_HOURS, MAX_NOTICE_HOURS, MAX_UPCOMING_MIN_DAYS,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_notice_hours")]
    pub notice_hours: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upcoming_min_days: Option<i64>,
}

fn default_notice_hours() -> i64 {
    DEFAULT_NOTICE_HOURS
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            notice_hours: DEFAULT_NOTICE_HOURS,
            upcoming_min_days: None,
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "fisiovem", "fisiovem")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Load from `path`, or the default location. A missing file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if !(0..=MAX_NOTICE_HOURS).contains(&config.policy.notice_hours) {
            anyhow::bail!(
                "policy.notice_hours must be between 0 and {}, got {}",
                MAX_NOTICE_HOURS,
                config.policy.notice_hours
            );
        }
        if let Some(days) = config.policy.upcoming_min_days {
            if !(0..=MAX_UPCOMING_MIN_DAYS).contains(&days) {
                anyhow::bail!(
                    "policy.upcoming_min_days must be between 0 and {}, got {}",
                    MAX_UPCOMING_MIN_DAYS,
                    days
                );
            }
        }
        Ok(config)
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.storage.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(project_dirs()?.data_dir().to_path_buf()),
        }
    }

    pub fn scheduling_policy(&self) -> SchedulingPolicy {
        SchedulingPolicy::new(self.policy.notice_hours)
            .with_upcoming_min_days(self.policy.upcoming_min_days)
    }
}
