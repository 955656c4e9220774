use super::{LANDMARK_COUNT, Landmark, PoseSample};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

/// Producer of pose samples, typically backed by a camera and a hand
/// landmark model. Runs on the capture task and may block on I/O freely.
pub trait PoseSource: Send {
    fn name(&self) -> &str;

    /// Next sample, or `None` once the source is exhausted.
    fn next_sample<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<PoseSample>>> + Send + 'a>>;
}

/// Serialized pose as produced by an external tracker, one per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseRecord {
    pub landmarks: [[f64; 3]; LANDMARK_COUNT],
    pub confidence: f64,
}

impl PoseRecord {
    /// Samples are stamped on receipt; tracker clocks are not trusted.
    pub fn into_sample(self, timestamp: Instant) -> PoseSample {
        let landmarks = self.landmarks.map(|[x, y, z]| Landmark::new(x, y, z));
        PoseSample::new(landmarks, self.confidence, timestamp)
    }
}

/// Replays JSON-lines pose records, optionally paced at a fixed frame interval.
pub struct JsonLinesPoseSource<R> {
    name: String,
    lines: Lines<R>,
    frame_interval: Option<Duration>,
    line_no: usize,
}

impl JsonLinesPoseSource<BufReader<tokio::fs::File>> {
    pub async fn open(path: &Path, frame_interval: Option<Duration>) -> Result<Self> {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open pose file {}", path.display()))?;
        Ok(Self::new(
            path.display().to_string(),
            BufReader::new(file),
            frame_interval,
        ))
    }
}

impl<R: AsyncBufRead + Unpin + Send> JsonLinesPoseSource<R> {
    pub fn new(name: impl Into<String>, reader: R, frame_interval: Option<Duration>) -> Self {
        Self {
            name: name.into(),
            lines: reader.lines(),
            frame_interval,
            line_no: 0,
        }
    }
}

impl<R: AsyncBufRead + Unpin + Send> PoseSource for JsonLinesPoseSource<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_sample<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<PoseSample>>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(interval) = self.frame_interval {
                tokio::time::sleep(interval).await;
            }
            loop {
                let Some(line) = self.lines.next_line().await? else {
                    return Ok(None);
                };
                self.line_no += 1;
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<PoseRecord>(line) {
                    Ok(record) => return Ok(Some(record.into_sample(Instant::now()))),
                    Err(error) => {
                        tracing::warn!(
                            source = self.name.as_str(),
                            line = self.line_no,
                            %error,
                            "skipping malformed pose record"
                        );
                    }
                }
            }
        })
    }
}
