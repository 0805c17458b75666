// /src/core/config_loader.rs

use directories::BaseDirs;
use std::path::{Path, PathBuf};

// Points the daemon at one specific config file instead of the XDG one
pub const CONFIG_ENV: &str = "NAVBARTEMP_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    // Shipped defaults, optional
    pub system: PathBuf,
    // User overlay
    pub user: PathBuf,
    // Set when the overlay was named explicitly, so a missing file is an error
    pub explicit: bool,
}

pub fn config_paths() -> ConfigPaths {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()));
    let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    resolve(exe_dir.as_deref(), explicit, BaseDirs::new().map(|d| d.config_dir().to_path_buf()))
}

fn resolve(exe_dir: Option<&Path>, explicit: Option<PathBuf>, config_dir: Option<PathBuf>) -> ConfigPaths {
    // 1. Defaults installed next to the binary, else the repo's config/ in development
    let mut system = exe_dir.unwrap_or(Path::new(".")).join("default.toml");
    if !system.exists() {
        let fallback = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("config")
            .join("default.toml");
        if fallback.exists() {
            system = fallback;
        }
    }

    // 2. $NAVBARTEMP_CONFIG, else XDG_CONFIG_HOME/navbartemp-rs/config.toml
    match explicit.filter(|p| !p.as_os_str().is_empty()) {
        Some(user) => ConfigPaths {
            system,
            user,
            explicit: true,
        },
        None => ConfigPaths {
            system,
            user: config_dir
                .map(|d| d.join("navbartemp-rs").join("config.toml"))
                .unwrap_or_else(|| PathBuf::from("config/config.toml")),
            explicit: false,
        },
    }
}
