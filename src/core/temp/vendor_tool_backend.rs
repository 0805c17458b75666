// src/core/temp/vendor_tool_backend.rs
//
// Board vendor utility (e.g. `vcgencmd measure_temp`) that prints a
// calibrated reading such as `temp=46.8'C`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::ReadError;

static PAYLOAD: Lazy<Regex> = Lazy::new(|| Regex::new(r#"=(.*)['"]"#).expect("valid regex"));

pub struct VendorToolBackend {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl VendorToolBackend {
    pub fn new(program: PathBuf, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program,
            args,
            timeout,
        }
    }

    pub async fn read(&self) -> Result<f64, ReadError> {
        debug!(program = ?self.program, args = ?self.args, "Running vendor temperature tool");

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.program)
                .args(&self.args)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| {
            ReadError::Command(format!("{:?} timed out after {:?}", self.program, self.timeout))
        })?
        .map_err(|e| ReadError::Command(format!("spawning {:?}: {e}", self.program)))?;

        if !output.status.success() {
            return Err(ReadError::Command(format!(
                "{:?} exited with {}",
                self.program, output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(output = %stdout.trim(), "Vendor tool responded");
        parse_payload(&stdout)
    }
}

fn parse_payload(output: &str) -> Result<f64, ReadError> {
    PAYLOAD
        .captures(output)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().trim().parse().ok())
        .ok_or_else(|| ReadError::Parse(output.trim().to_string()))
}
