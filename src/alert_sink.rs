// src/alert_sink.rs
//
// Alert transport: one JSON object per line on any async writer
// (a file, stdout, a socket half).

use crate::types::{AnomalyEvent, TrackId};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlertMessage {
    Alert {
        track_id: TrackId,
        elapsed_seconds: f64,
        message: String,
    },
    Status {
        message: String,
    },
    Error {
        message: String,
    },
}

impl AlertMessage {
    pub fn alert(event: &AnomalyEvent) -> Self {
        Self::Alert {
            track_id: event.track_id,
            elapsed_seconds: event.elapsed_seconds,
            message: format!(
                "Unattended package detected! Object ID: {}",
                event.track_id
            ),
        }
    }

    pub fn finished() -> Self {
        Self::Status {
            message: "Video processing finished.".to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

pub struct JsonlAlertSink<W> {
    writer: W,
    sent: u64,
}

impl JsonlAlertSink<BufWriter<File>> {
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .await
            .with_context(|| format!("Failed to create alert log {}", path.display()))?;
        info!("Writing alerts to {}", path.display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: AsyncWrite + Unpin> JsonlAlertSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, sent: 0 }
    }

    pub async fn send(&mut self, message: &AlertMessage) -> Result<()> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');
        self.writer
            .write_all(&line)
            .await
            .context("Failed to write alert")?;
        self.sent += 1;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await.context("Failed to flush alerts")?;
        Ok(())
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }
}
