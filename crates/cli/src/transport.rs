//! Discovery transport backed by an external command
//!
//! Each request runs the command once: the request is written to its stdin
//! as JSON and a `DiscoveryResponse` is read from its stdout.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use connector_forms_core::{DiscoveryRequest, DiscoveryResponse, DiscoveryTransport};
use std::io;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CommandTransport {
    program: String,
    args: Vec<String>,
}

impl CommandTransport {
    /// Build from a command line, honouring shell quoting
    pub fn parse(command_line: &str) -> Result<Self> {
        let parts = shell_words::split(command_line)
            .with_context(|| format!("parse discovery command: {command_line}"))?;
        let mut parts = parts.into_iter();
        let Some(program) = parts.next() else {
            bail!("discovery command is empty");
        };
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl DiscoveryTransport for CommandTransport {
    async fn discover(&self, request: &DiscoveryRequest) -> Result<DiscoveryResponse> {
        let input = serde_json::to_vec(request)?;
        debug!(
            "Running '{}' for {} of '{}'",
            self.program, request.kind, request.connector
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start '{}'", self.program))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A command that ignores its input may exit before reading it
            match stdin.write_all(&input).await {
                Err(e) if e.kind() != io::ErrorKind::BrokenPipe => {
                    return Err(e).context("Failed to send discovery request");
                }
                _ => {}
            }
        }

        let output = child
            .wait_with_output()
            .await
            .with_context(|| format!("Failed to wait for '{}'", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            );
        }

        serde_json::from_slice(&output.stdout).with_context(|| {
            format!(
                "'{}' printed an invalid discovery response: {}",
                self.program,
                String::from_utf8_lossy(&output.stdout).trim()
            )
        })
    }
}
