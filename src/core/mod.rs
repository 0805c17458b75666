// src/core/mod.rs

pub mod config;
pub mod config_loader;
pub mod controller;
pub mod notifier;
pub mod probe;
pub mod sampler;
pub mod scheduler;
pub mod temp;
