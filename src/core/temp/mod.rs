// src/core/temp/mod.rs

pub mod synthetic_backend;
pub mod temperature_source;
pub mod thermal_zone_backend;
pub mod vendor_tool_backend;

pub use synthetic_backend::SyntheticBackend;
pub use temperature_source::{ReadError, SourceKind, TemperatureSample, TemperatureSource};
pub use thermal_zone_backend::ThermalZoneBackend;
pub use vendor_tool_backend::VendorToolBackend;
