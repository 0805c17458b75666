// src/core/probe.rs
//
// One-shot hardware classification: which board are we on, and which
// temperature sources does it expose.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::config::PathsConfig;

// Match a line like 'Hardware   : BCM2709'
static HARDWARE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^Hardware[ \t]*:[ \t]*(\w+)[ \t]*\r?$").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformFamily {
    RaspberryPi,
    Soc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareIdentity {
    pub token: String,
    pub family: PlatformFamily,
    pub model: &'static str,
}

// Boards we know how to read a temperature from
const KNOWN_HARDWARE: &[(&str, PlatformFamily, &str)] = &[
    ("BCM2708", PlatformFamily::RaspberryPi, "Raspberry Pi 1"),
    ("BCM2709", PlatformFamily::RaspberryPi, "Raspberry Pi 2"),
    ("BCM2710", PlatformFamily::RaspberryPi, "Raspberry Pi 3"),
    ("BCM2835", PlatformFamily::RaspberryPi, "Raspberry Pi"),
    ("BCM2711", PlatformFamily::RaspberryPi, "Raspberry Pi 4"),
    ("sun50iw1p1", PlatformFamily::Soc, "Pine A64"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformClassification {
    pub identity: Option<HardwareIdentity>,
    pub has_thermal_zone: bool,
    pub has_vendor_tool: bool,
}

impl PlatformClassification {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_raspberry_pi(&self) -> bool {
        matches!(&self.identity, Some(id) if id.family == PlatformFamily::RaspberryPi)
    }

    pub fn is_soc(&self) -> bool {
        matches!(&self.identity, Some(id) if id.family == PlatformFamily::Soc)
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("no known hardware identity in descriptor")]
    Inconclusive,
}

pub struct HardwareProbe {
    cpuinfo: PathBuf,
    thermal_zone: PathBuf,
    vendor_tool: PathBuf,
}

impl HardwareProbe {
    pub fn new(paths: &PathsConfig) -> Self {
        Self {
            cpuinfo: paths.cpuinfo.clone(),
            thermal_zone: paths.thermal_zone.clone(),
            vendor_tool: paths.vendor_tool.clone(),
        }
    }

    /// Classify the running machine. Never fails: anything we cannot make
    /// sense of ends up as an unknown platform with no capabilities.
    pub fn detect(&self) -> PlatformClassification {
        if !cfg!(target_os = "linux") {
            info!("Not running on Linux; hardware probe skipped");
            return PlatformClassification::unknown();
        }

        let identity = match self.identify() {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "Hardware probe inconclusive; sampling unsupported");
                return PlatformClassification::unknown();
            }
        };
        info!(hardware = %identity.token, model = identity.model, "Hardware detected");

        let classification = PlatformClassification {
            identity: Some(identity),
            has_thermal_zone: self.thermal_zone.exists(),
            has_vendor_tool: self.vendor_tool.exists(),
        };
        debug!(?classification, "Hardware probe finished");
        classification
    }

    fn identify(&self) -> Result<HardwareIdentity, ProbeError> {
        let cpuinfo = fs::read_to_string(&self.cpuinfo).map_err(|source| ProbeError::Io {
            path: self.cpuinfo.clone(),
            source,
        })?;
        let token = hardware_token(&cpuinfo).ok_or(ProbeError::Inconclusive)?;
        debug!(hardware = token, "Hardware line found");
        classify(token).ok_or(ProbeError::Inconclusive)
    }
}

fn hardware_token(cpuinfo: &str) -> Option<&str> {
    HARDWARE_LINE
        .captures(cpuinfo)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn classify(token: &str) -> Option<HardwareIdentity> {
    KNOWN_HARDWARE
        .iter()
        .find(|(known, _, _)| known.eq_ignore_ascii_case(token))
        .map(|&(_, family, model)| HardwareIdentity {
            token: token.to_string(),
            family,
            model,
        })
}
