// src/replay.rs
//
// Frame source that replays recorded detector output. One JSON object per
// line:
//   {"timestamp": 0.2, "detections": [{"bbox": [x1,y1,x2,y2], "label": "person", "confidence": 0.91}]}

use crate::types::RawDetection;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplayFrame {
    /// Seconds on the capture clock
    pub timestamp: f64,
    #[serde(default)]
    pub detections: Vec<RawDetection>,
}

pub struct ReplaySource<R> {
    lines: Lines<R>,
    line_no: usize,
    last_timestamp: Option<f64>,
}

impl ReplaySource<BufReader<File>> {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .await
            .with_context(|| format!("Failed to open detections file {}", path.display()))?;
        info!("Replaying detections from {}", path.display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: AsyncBufRead + Unpin> ReplaySource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            last_timestamp: None,
        }
    }

    /// Next frame, or `None` at end of input. Blank lines are skipped.
    pub async fn next_frame(&mut self) -> Result<Option<ReplayFrame>> {
        while let Some(line) = self
            .lines
            .next_line()
            .await
            .context("Failed to read detections")?
        {
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }

            let frame: ReplayFrame = serde_json::from_str(&line)
                .with_context(|| format!("Malformed frame on line {}", self.line_no))?;

            if let Some(prev) = self.last_timestamp {
                if frame.timestamp < prev {
                    warn!(
                        "Line {}: timestamp {:.3}s goes backwards (previous {:.3}s)",
                        self.line_no, frame.timestamp, prev
                    );
                }
            }
            self.last_timestamp = Some(frame.timestamp);
            return Ok(Some(frame));
        }
        Ok(None)
    }
}
