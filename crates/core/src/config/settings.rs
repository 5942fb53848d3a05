use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAMES: [&str; 2] = [".connector-forms.json", "connector-forms.json"];
pub const ENV_POLL_INTERVAL_MS: &str = "CONNECTOR_FORMS_POLL_INTERVAL_MS";
pub const ENV_POLL_TIMEOUT_MS: &str = "CONNECTOR_FORMS_POLL_TIMEOUT_MS";

/// Timing of a discovery poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub interval_ms: u64,
    pub timeout_ms: u64,
    /// Grace period after the timeout so an in-flight probe can settle
    pub margin_ms: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            timeout_ms: 60_000,
            margin_ms: 10,
        }
    }
}

impl PollSettings {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval_ms: interval.as_millis() as u64,
            timeout_ms: timeout.as_millis() as u64,
            ..Self::default()
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn margin(&self) -> Duration {
        Duration::from_millis(self.margin_ms)
    }

    /// Point in time, relative to start, after which the poll gives up
    pub fn deadline(&self) -> Duration {
        self.timeout() + self.margin()
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(Error::ConfigError(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-kind overrides of the default poll timing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineSettings {
    #[serde(default)]
    pub poll: PollSettings,

    /// Overrides keyed by discovery kind (`spec`, `streams`, `check`)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub discovery: BTreeMap<String, PollOverride>,
}

impl EngineSettings {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&contents)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))?;
        settings.poll.validate()?;
        Ok(settings)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn find_config_file(start_path: &Path) -> Option<PathBuf> {
        let mut current = start_path;

        loop {
            for name in CONFIG_FILE_NAMES {
                let config_path = current.join(name);
                if config_path.exists() {
                    return Some(config_path);
                }
            }

            current = current.parent()?;
        }
    }

    /// Load the nearest settings file above `start_path`, or defaults
    pub fn discover(start_path: &Path) -> Result<Self> {
        match Self::find_config_file(start_path) {
            Some(path) => {
                tracing::debug!("Loading settings from {:?}", path);
                Self::load_from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply `CONNECTOR_FORMS_*` environment overrides
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ms) = parse_millis(&lookup, ENV_POLL_INTERVAL_MS)? {
            self.poll.interval_ms = ms;
        }
        if let Some(ms) = parse_millis(&lookup, ENV_POLL_TIMEOUT_MS)? {
            self.poll.timeout_ms = ms;
        }
        self.poll.validate()?;
        Ok(self)
    }

    /// Effective poll timing for a discovery kind
    pub fn poll_settings_for(&self, kind: &str) -> PollSettings {
        let mut settings = self.poll;
        if let Some(overrides) = self.discovery.get(kind) {
            if let Some(interval_ms) = overrides.interval_ms {
                settings.interval_ms = interval_ms;
            }
            if let Some(timeout_ms) = overrides.timeout_ms {
                settings.timeout_ms = timeout_ms;
            }
        }
        settings
    }
}

fn parse_millis<F>(lookup: &F, key: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|e| Error::ConfigError(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}
