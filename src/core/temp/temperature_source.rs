// src/core/temp/temperature_source.rs

use chrono::{DateTime, Local};
use std::time::Duration;
use thiserror::Error;

use super::{SyntheticBackend, ThermalZoneBackend, VendorToolBackend};
use crate::core::config::PathsConfig;
use crate::core::probe::PlatformClassification;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("I/O failure: {0}")]
    Io(String),
    #[error("command failure: {0}")]
    Command(String),
    #[error("unrecognised temperature format: {0:?}")]
    Parse(String),
    #[error("no temperature source available on this host")]
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Synthetic,
    ThermalZone,
    VendorTool,
}

#[derive(Debug, Clone)]
pub struct TemperatureSample {
    pub celsius: f64,
    pub source: SourceKind,
    pub taken_at: DateTime<Local>,
}

// The one place a reading comes from, picked once per startup
pub enum TemperatureSource {
    Synthetic(SyntheticBackend),
    ThermalZone(ThermalZoneBackend),
    VendorTool(VendorToolBackend),
    Unavailable,
}

const SYNTHETIC_INTERVAL: Duration = Duration::from_secs(5);
const HARDWARE_INTERVAL: Duration = Duration::from_secs(30);

impl TemperatureSource {
    /// Priority: debug override, vendor tool on a Pi, thermal zone, nothing.
    pub fn select(
        classification: &PlatformClassification,
        paths: &PathsConfig,
        debug: bool,
    ) -> Self {
        if debug {
            TemperatureSource::Synthetic(SyntheticBackend)
        } else if classification.is_raspberry_pi() && classification.has_vendor_tool {
            TemperatureSource::VendorTool(VendorToolBackend::new(
                paths.vendor_tool.clone(),
                paths.vendor_tool_args.clone(),
                paths.vendor_tool_timeout(),
            ))
        } else if classification.has_thermal_zone {
            TemperatureSource::ThermalZone(ThermalZoneBackend::new(paths.thermal_zone.clone()))
        } else {
            TemperatureSource::Unavailable
        }
    }

    pub fn kind(&self) -> Option<SourceKind> {
        match self {
            TemperatureSource::Synthetic(_) => Some(SourceKind::Synthetic),
            TemperatureSource::ThermalZone(_) => Some(SourceKind::ThermalZone),
            TemperatureSource::VendorTool(_) => Some(SourceKind::VendorTool),
            TemperatureSource::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.kind().is_some()
    }

    // Fast for fabricated readings, slow for real hardware
    pub fn default_interval(&self) -> Duration {
        match self {
            TemperatureSource::Synthetic(_) => SYNTHETIC_INTERVAL,
            _ => HARDWARE_INTERVAL,
        }
    }

    pub async fn read(&self) -> Result<f64, ReadError> {
        match self {
            TemperatureSource::Synthetic(b) => Ok(b.read()),
            TemperatureSource::ThermalZone(b) => b.read(),
            TemperatureSource::VendorTool(b) => b.read().await,
            TemperatureSource::Unavailable => Err(ReadError::Unsupported),
        }
    }

    /// Read once and stamp the value with its source and the local time.
    pub async fn sample(&self) -> Result<TemperatureSample, ReadError> {
        let celsius = self.read().await?;
        let source = self.kind().ok_or(ReadError::Unsupported)?;
        Ok(TemperatureSample {
            celsius,
            source,
            taken_at: Local::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::probe::{HardwareIdentity, PlatformFamily};

    fn classification(
        family: Option<PlatformFamily>,
        thermal: bool,
        vendor: bool,
    ) -> PlatformClassification {
        PlatformClassification {
            identity: family.map(|family| HardwareIdentity {
                token: "test".into(),
                family,
                model: "test board",
            }),
            has_thermal_zone: thermal,
            has_vendor_tool: vendor,
        }
    }

    fn kind_for(c: &PlatformClassification, debug: bool) -> Option<SourceKind> {
        TemperatureSource::select(c, &PathsConfig::default(), debug).kind()
    }

    #[test]
    fn debug_wins_over_everything() {
        let c = classification(None, false, false);
        assert_eq!(kind_for(&c, true), Some(SourceKind::Synthetic));
        let c = classification(Some(PlatformFamily::RaspberryPi), true, true);
        assert_eq!(kind_for(&c, true), Some(SourceKind::Synthetic));
    }

    #[test]
    fn pi_prefers_vendor_tool() {
        let c = classification(Some(PlatformFamily::RaspberryPi), true, true);
        assert_eq!(kind_for(&c, false), Some(SourceKind::VendorTool));
        let c = classification(Some(PlatformFamily::RaspberryPi), true, false);
        assert_eq!(kind_for(&c, false), Some(SourceKind::ThermalZone));
    }

    #[test]
    fn soc_never_uses_vendor_tool() {
        let c = classification(Some(PlatformFamily::Soc), true, true);
        assert_eq!(kind_for(&c, false), Some(SourceKind::ThermalZone));
        let c = classification(Some(PlatformFamily::Soc), false, true);
        assert_eq!(kind_for(&c, false), None);
    }

    #[test]
    fn intervals_follow_the_variant() {
        let c = classification(None, false, false);
        let debug = TemperatureSource::select(&c, &PathsConfig::default(), true);
        assert_eq!(debug.default_interval(), Duration::from_secs(5));
        let none = TemperatureSource::select(&c, &PathsConfig::default(), false);
        assert_eq!(none.default_interval(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn unavailable_always_fails() {
        let source = TemperatureSource::Unavailable;
        assert!(!source.is_available());
        assert!(matches!(source.read().await, Err(ReadError::Unsupported)));
        assert!(matches!(source.sample().await, Err(ReadError::Unsupported)));
    }

    #[tokio::test]
    async fn sample_carries_source_kind() {
        let sample = TemperatureSource::Synthetic(SyntheticBackend)
            .sample()
            .await
            .unwrap();
        assert_eq!(sample.source, SourceKind::Synthetic);
        assert!((5.0..60.0).contains(&sample.celsius));
    }
}
