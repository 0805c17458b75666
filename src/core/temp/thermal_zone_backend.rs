// src/core/temp/thermal_zone_backend.rs

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use super::ReadError;

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+").expect("valid regex"));

pub struct ThermalZoneBackend {
    path: PathBuf,
}

impl ThermalZoneBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn read(&self) -> Result<f64, ReadError> {
        debug!(path = ?self.path, "Reading thermal zone");
        let raw = fs::read_to_string(&self.path)
            .map_err(|e| ReadError::Io(format!("reading {:?}: {e}", self.path)))?;
        parse_millidegrees(&raw)
    }
}

// The kernel reports millidegrees; take the first digit run only
fn parse_millidegrees(raw: &str) -> Result<f64, ReadError> {
    let milli: i64 = DIGIT_RUN
        .find(raw)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| ReadError::Parse(raw.trim().to_string()))?;
    Ok(milli as f64 / 1_000.0)
}
