// src/core/controller.rs
//
// Owns the probe result, the selected source and the one scheduler, and
// applies settings changes to them. Every entry point takes the state lock,
// so start/stop never race.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::config::{Config, PathsConfig, SamplingSettings};
use super::notifier::{MessageSink, Notifier};
use super::probe::{HardwareProbe, PlatformClassification};
use super::sampler::Sampler;
use super::scheduler::{FirstTick, SamplingScheduler};
use super::temp::{SourceKind, TemperatureSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingConfig {
    pub enabled: bool,
    pub interval: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerStatus {
    pub classification: Option<PlatformClassification>,
    pub source: Option<SourceKind>,
    // false when no source was found or the source was given up on
    pub supported: bool,
    pub sampling: Option<SamplingConfig>,
    pub running: bool,
}

struct ControllerState {
    settings: SamplingSettings,
    started: bool,
    classification: Option<PlatformClassification>,
    // None when the host has no usable source
    sampler: Option<Arc<Sampler>>,
    scheduler: SamplingScheduler,
}

impl ControllerState {
    fn sampling_config(&self) -> Option<SamplingConfig> {
        let sampler = self.sampler.as_ref()?;
        Some(SamplingConfig {
            enabled: self.settings.enabled,
            interval: self
                .settings
                .interval_override()
                .unwrap_or_else(|| sampler.source().default_interval()),
        })
    }

    fn first_tick(&self) -> FirstTick {
        if self.settings.immediate_first_tick {
            FirstTick::Immediate
        } else {
            FirstTick::AfterInterval
        }
    }

    async fn start_sampling(&mut self) {
        let (Some(sampler), Some(config)) = (self.sampler.clone(), self.sampling_config()) else {
            return;
        };
        let first = self.first_tick();
        info!(interval = ?config.interval, ?first, "Starting temperature sampling");
        self.scheduler.start(config.interval, first, sampler).await;
    }
}

pub struct Controller {
    paths: PathsConfig,
    probe: HardwareProbe,
    notifier: Notifier,
    state: Mutex<ControllerState>,
}

impl Controller {
    pub fn new(
        settings: SamplingSettings,
        paths: PathsConfig,
        probe: HardwareProbe,
        notifier: Notifier,
    ) -> Self {
        Self {
            paths,
            probe,
            notifier,
            state: Mutex::new(ControllerState {
                settings,
                started: false,
                classification: None,
                sampler: None,
                scheduler: SamplingScheduler::new(),
            }),
        }
    }

    pub fn from_config(config: &Config, sink: Arc<dyn MessageSink>) -> Self {
        Self::new(
            config.sampling.clone(),
            config.paths.clone(),
            HardwareProbe::new(&config.paths),
            Notifier::new(config.notifier.identifier.clone(), sink),
        )
    }

    /// Probe the hardware once, pick the source and start sampling if the
    /// host supports it and it is enabled.
    pub async fn on_startup(&self) {
        let mut state = self.state.lock().await;
        if state.started {
            warn!("Startup already handled; ignoring");
            return;
        }
        state.started = true;

        let debug_mode = state.settings.debug;
        let classification = if debug_mode {
            info!("Debug mode: readings are synthetic");
            PlatformClassification::unknown()
        } else {
            self.probe.detect()
        };

        let source = TemperatureSource::select(&classification, &self.paths, debug_mode);
        info!(source = ?source.kind(), "Temperature source selected");

        if source.is_available() {
            state.sampler = Some(Arc::new(Sampler::new(
                source,
                self.notifier.clone(),
                debug_mode || classification.is_raspberry_pi(),
                classification.is_soc(),
                state.settings.max_consecutive_failures,
            )));
        } else {
            info!("No temperature source; sampling unsupported on this host");
        }
        state.classification = Some(classification);

        if state.settings.enabled {
            state.start_sampling().await;
        } else {
            debug!("Sampling disabled in settings");
        }
    }

    /// Apply new user settings. Source selection is fixed at startup, so
    /// `debug` and `max_consecutive_failures` only take effect on restart.
    pub async fn on_settings_changed(&self, settings: SamplingSettings) -> Result<()> {
        settings.validate()?;

        let mut state = self.state.lock().await;
        let previous = std::mem::replace(&mut state.settings, settings);
        debug!(enabled = state.settings.enabled, interval_secs = ?state.settings.interval_secs, "Settings changed");

        if !state.started {
            debug!("Settings recorded; applied at startup");
            return Ok(());
        }
        if previous.debug != state.settings.debug {
            warn!("Debug mode changes take effect after a restart");
        }

        let Some(sampler) = state.sampler.clone() else {
            debug!("Sampling unsupported on this host; nothing to do");
            return Ok(());
        };

        if !state.settings.enabled {
            if previous.enabled {
                state.scheduler.stop().await;
                self.notifier.publish_empty();
                info!("Temperature sampling disabled");
            }
            return Ok(());
        }

        if sampler.is_downgraded() {
            info!("Temperature source was given up on; not restarting");
            return Ok(());
        }

        let restart = !previous.enabled
            || previous.interval_secs != state.settings.interval_secs
            || previous.immediate_first_tick != state.settings.immediate_first_tick
            || !state.scheduler.is_running();
        if restart {
            state.start_sampling().await;
        }
        Ok(())
    }

    /// Host shutdown hook.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        state.scheduler.stop().await;
        info!("Temperature sampling shut down");
    }

    pub async fn status(&self) -> ControllerStatus {
        let state = self.state.lock().await;
        let source = state.sampler.as_ref().and_then(|s| s.source().kind());
        ControllerStatus {
            classification: state.classification.clone(),
            source,
            supported: state.sampler.as_ref().is_some_and(|s| !s.is_downgraded()),
            sampling: state.sampling_config(),
            running: state.scheduler.is_running(),
        }
    }
}
