// src/core/sampler.rs
//
// Tick body: read the selected source, publish the outcome, and give up on
// a source that keeps failing.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tracing::{debug, error, info, warn};

use super::notifier::{Notifier, TemperatureMessage};
use super::scheduler::Tick;
use super::temp::{ReadError, TemperatureSource};

pub struct Sampler {
    source: TemperatureSource,
    notifier: Notifier,
    israspi: bool,
    issoc: bool,
    // 0 disables the downgrade on IO/command failures
    max_consecutive_failures: u32,
    failures: AtomicU32,
    downgraded: AtomicBool,
}

impl Sampler {
    pub fn new(
        source: TemperatureSource,
        notifier: Notifier,
        israspi: bool,
        issoc: bool,
        max_consecutive_failures: u32,
    ) -> Self {
        Self {
            source,
            notifier,
            israspi,
            issoc,
            max_consecutive_failures,
            failures: AtomicU32::new(0),
            downgraded: AtomicBool::new(false),
        }
    }

    pub fn source(&self) -> &TemperatureSource {
        &self.source
    }

    /// True once the source was judged broken and sampling halted.
    pub fn is_downgraded(&self) -> bool {
        self.downgraded.load(Ordering::SeqCst)
    }

    fn on_failure(&self, err: &ReadError) -> ControlFlow<()> {
        match err {
            ReadError::Unsupported => {
                error!("No temperature source on this host; sampling halted");
                self.downgraded.store(true, Ordering::SeqCst);
                ControlFlow::Break(())
            }
            ReadError::Parse(_) => {
                error!(error = %err, "Invalid temperature format");
                ControlFlow::Continue(())
            }
            ReadError::Io(_) | ReadError::Command(_) => {
                let failures = self.failures.fetch_add(1, Ordering::SeqCst) + 1;
                warn!(error = %err, failures, "Temperature read failed");
                if self.max_consecutive_failures > 0 && failures >= self.max_consecutive_failures {
                    error!(failures, "Temperature source keeps failing; sampling halted");
                    self.downgraded.store(true, Ordering::SeqCst);
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            }
        }
    }
}

impl Tick for Sampler {
    async fn tick(&self) -> ControlFlow<()> {
        info!("Checking internal temperature");

        let (celsius, flow) = match self.source.sample().await {
            Ok(sample) => {
                debug!(
                    celsius = sample.celsius,
                    source = ?sample.source,
                    taken_at = %sample.taken_at.to_rfc3339(),
                    "Temperature sampled"
                );
                self.failures.store(0, Ordering::SeqCst);
                (Some(sample.celsius), ControlFlow::Continue(()))
            }
            Err(e) => (None, self.on_failure(&e)),
        };

        self.notifier
            .publish(&TemperatureMessage::new(self.israspi, self.issoc, celsius));
        flow
    }
}
