// src/core/temp/synthetic_backend.rs
//
// Plausible fake readings for machines without a sensor (debug mode).

use rand::Rng;

const LOW_TENTHS: u32 = 50;
// exclusive: 60.0 itself is never produced
const HIGH_TENTHS: u32 = 600;

#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticBackend;

impl SyntheticBackend {
    pub fn read(&self) -> f64 {
        let tenths = rand::rng().random_range(LOW_TENTHS..HIGH_TENTHS);
        f64::from(tenths) / 10.0
    }
}
