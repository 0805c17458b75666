// src/core/scheduler.rs
//
// A single cancellable repeating timer. Ticks never overlap: the loop
// awaits the tick body before it waits for the next instant.

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

// Longer periods are clamped; the timer arithmetic must not overflow
const LONGEST_INTERVAL: Duration = Duration::from_secs(86_400 * 365);

fn after(instant: Instant, interval: Duration) -> Instant {
    instant
        .checked_add(interval)
        .unwrap_or_else(|| instant + LONGEST_INTERVAL)
}

/// One execution of the sample-then-publish sequence.
pub trait Tick: Send + Sync + 'static {
    /// `Break` ends the run; the scheduler then goes idle on its own.
    fn tick(&self) -> impl Future<Output = ControlFlow<()>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstTick {
    Immediate,
    AfterInterval,
}

struct RunningTimer {
    cancel: CancellationToken,
    // resolves to the instant of the last tick it fired
    task: JoinHandle<Option<Instant>>,
}

#[derive(Default)]
pub struct SamplingScheduler {
    running: Option<RunningTimer>,
    last_tick: Option<Instant>,
}

impl SamplingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start ticking every `interval`, replacing any run in progress.
    ///
    /// The first tick of the new run is never closer than one interval to
    /// the last tick of a previous run.
    pub async fn start<T: Tick>(&mut self, interval: Duration, first: FirstTick, tick: Arc<T>) {
        self.stop().await;

        let interval = interval.min(LONGEST_INTERVAL);
        let now = Instant::now();
        let mut start = match first {
            FirstTick::Immediate => now,
            FirstTick::AfterInterval => after(now, interval),
        };
        if let Some(last) = self.last_tick {
            start = start.max(after(last, interval));
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last = None;

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                last = Some(Instant::now());
                if tick.tick().await.is_break() {
                    debug!("Tick asked the scheduler to halt");
                    break;
                }
            }
            last
        });

        debug!(?interval, ?first, "Scheduler started");
        self.running = Some(RunningTimer { cancel, task });
    }

    /// Cancel the timer and wait for an in-flight tick to finish. Safe to
    /// call when idle.
    pub async fn stop(&mut self) {
        let Some(timer) = self.running.take() else {
            return;
        };
        timer.cancel.cancel();
        match timer.task.await {
            Ok(last) => {
                if last.is_some() {
                    self.last_tick = last;
                }
            }
            Err(e) => warn!(error = %e, "Scheduler task ended abnormally"),
        }
        debug!("Scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|timer| !timer.task.is_finished())
    }
}

impl Drop for SamplingScheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.running.take() {
            timer.cancel.cancel();
        }
    }
}
