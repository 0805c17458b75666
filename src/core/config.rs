// src/core/config.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use super::config_loader::{CONFIG_ENV, ConfigPaths, config_paths};

// One day; anything slower is not a temperature readout any more
pub const MAX_INTERVAL_SECS: u64 = 86_400;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SamplingSettings {
    // Whether the temperature should be sampled and published at all
    pub enabled: bool,

    // Fabricate readings instead of touching the hardware
    pub debug: bool,

    // Overrides the per-source interval (5s synthetic, 30s hardware)
    #[serde(default)]
    pub interval_secs: Option<u64>,

    // Fire the first tick right away instead of after one interval
    pub immediate_first_tick: bool,

    // Consecutive IO/command failures before the source is given up on.
    // 0 keeps retrying forever.
    pub max_consecutive_failures: u32,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        SamplingSettings {
            enabled: true,
            debug: false,
            interval_secs: None,
            immediate_first_tick: true,
            max_consecutive_failures: 3,
        }
    }
}

impl SamplingSettings {
    pub fn interval_override(&self) -> Option<Duration> {
        self.interval_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<()> {
        match self.interval_secs {
            Some(0) => anyhow::bail!("sampling.interval_secs must be at least 1"),
            Some(secs) if secs > MAX_INTERVAL_SECS => {
                anyhow::bail!("sampling.interval_secs must be at most {MAX_INTERVAL_SECS} (one day)")
            }
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NotifierConfig {
    // Key under which messages are handed to the host sink
    pub identifier: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        NotifierConfig {
            identifier: "navbartemp".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PathsConfig {
    pub cpuinfo: PathBuf,
    pub thermal_zone: PathBuf,
    pub vendor_tool: PathBuf,
    pub vendor_tool_args: Vec<String>,
    pub vendor_tool_timeout_secs: u64,
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            cpuinfo: PathBuf::from("/proc/cpuinfo"),
            thermal_zone: PathBuf::from("/sys/devices/virtual/thermal/thermal_zone0/temp"),
            vendor_tool: PathBuf::from("/opt/vc/bin/vcgencmd"),
            vendor_tool_args: vec!["measure_temp".to_string()],
            vendor_tool_timeout_secs: 10,
        }
    }
}

impl PathsConfig {
    pub fn vendor_tool_timeout(&self) -> Duration {
        Duration::from_secs(self.vendor_tool_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub sampling: SamplingSettings,

    #[serde(default)]
    pub notifier: NotifierConfig,

    #[serde(default)]
    pub paths: PathsConfig,
}

impl Config {
    // Loads system default and then overrides with user config, if present
    pub fn load() -> Result<Self> {
        Self::load_from(&config_paths())
    }

    pub fn load_from(paths: &ConfigPaths) -> Result<Self> {
        let ConfigPaths {
            system,
            user,
            explicit,
        } = paths;
        info!(system = ?system, user = ?user, explicit, "Loading configuration paths");

        // 1. Read system default, falling back to built-in values when the
        //    binary was installed without one
        let mut cfg = if system.exists() {
            info!(path = ?system, "Reading system default config");
            let base = fs::read_to_string(&system)
                .with_context(|| format!("Reading system default config at {system:?}"))?;
            Config::from_toml(&base).context("Parsing system default config")?
        } else {
            info!(path = ?system, "No system default config; using built-in defaults");
            Config::default()
        };

        // 2. If user config exists, merge/override
        if user.exists() {
            info!(path = ?user, "Overlaying user configuration");
            let overlay = fs::read_to_string(&user)
                .with_context(|| format!("Reading user config at {user:?}"))?;
            let user_cfg = Config::from_toml(&overlay).context("Parsing user config")?;

            // Simple merge: each section replaces the default one
            cfg.sampling = user_cfg.sampling;
            cfg.notifier = user_cfg.notifier;
            cfg.paths = user_cfg.paths;
        } else if *explicit {
            anyhow::bail!("Config file {user:?} named by ${CONFIG_ENV} does not exist");
        } else {
            info!(path = ?user, "No user config found; using defaults");
        }

        // 3. Validate config values
        cfg.validate()?;

        info!(?cfg, "Configuration loaded succesfully");
        Ok(cfg)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.sampling.validate()?;
        if self.notifier.identifier.trim().is_empty() {
            anyhow::bail!("notifier.identifier must not be empty");
        }
        if self.paths.vendor_tool_timeout_secs == 0 {
            anyhow::bail!("paths.vendor_tool_timeout_secs must be at least 1");
        }
        Ok(())
    }
}
