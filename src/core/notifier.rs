// src/core/notifier.rs

use serde::Serialize;
use serde_json::{Value, json};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

// The host's messaging side. Delivery is fire-and-forget: a sink that
// cannot deliver logs it and moves on.
pub trait MessageSink: Send + Sync {
    fn send_plugin_message(&self, identifier: &str, payload: Value);
}

// What subscribers see on every tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureMessage {
    pub israspi: bool,
    pub issoc: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raspitemp: Option<String>,
}

impl TemperatureMessage {
    pub fn new(israspi: bool, issoc: bool, celsius: Option<f64>) -> Self {
        Self {
            israspi,
            issoc,
            raspitemp: celsius.map(|t| format!("{t:.1}")),
        }
    }
}

#[derive(Clone)]
pub struct Notifier {
    identifier: String,
    sink: Arc<dyn MessageSink>,
}

impl Notifier {
    pub fn new(identifier: impl Into<String>, sink: Arc<dyn MessageSink>) -> Self {
        Self {
            identifier: identifier.into(),
            sink,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn publish(&self, message: &TemperatureMessage) {
        match serde_json::to_value(message) {
            Ok(payload) => {
                debug!(plugin = %self.identifier, %payload, "Publishing temperature");
                self.sink.send_plugin_message(&self.identifier, payload);
            }
            Err(e) => warn!(error = %e, "Temperature message not serialisable"),
        }
    }

    /// Tells subscribers that sampling stopped.
    pub fn publish_empty(&self) {
        debug!(plugin = %self.identifier, "Publishing empty message");
        self.sink.send_plugin_message(&self.identifier, json!({}));
    }
}

/// Writes `{"plugin": .., "data": ..}` lines to stdout.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl MessageSink for StdoutSink {
    fn send_plugin_message(&self, identifier: &str, payload: Value) {
        let line = json!({ "plugin": identifier, "data": payload });
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
            warn!(error = %e, "Failed to write plugin message to stdout");
        }
    }
}

/// Forwards `(identifier, payload)` pairs into an unbounded channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<(String, Value)>,
}

impl ChannelSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<(String, Value)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl MessageSink for ChannelSink {
    fn send_plugin_message(&self, identifier: &str, payload: Value) {
        if self.tx.send((identifier.to_string(), payload)).is_err() {
            debug!(plugin = %identifier, "Message receiver gone; dropping message");
        }
    }
}
