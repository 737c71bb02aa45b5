// src/pipeline/orchestrator.rs
//
// Frame cycle driver. One call per frame:
//   filter → track manager → ownership → anomaly → FrameContext
//
// Frames are handled strictly in order on a single task. The only await
// points are between frames (alert delivery and a cooperative yield), and
// the stop flag is only checked once a frame's update has fully completed.

use super::event_bus::{EventBus, PipelineEvent};
use super::frame_context::{FrameContext, TrackSnapshot};
use super::metrics::PipelineMetrics;
use crate::alert_sink::{AlertMessage, JsonlAlertSink};
use crate::analysis::{AnomalyStateMachine, OwnershipChange, OwnershipResolver, TrackManager};
use crate::detection::DetectionFilter;
use crate::replay::ReplaySource;
use crate::types::{Config, RawDetection, TrackId, TrackStatus};
use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub struct PipelineOrchestrator {
    filter: DetectionFilter,
    tracker: TrackManager,
    resolver: OwnershipResolver,
    anomaly: AnomalyStateMachine,
    bus: EventBus,
    metrics: PipelineMetrics,
    frame_id: u64,
    last_timestamp: Option<f64>,
    snapshot_tx: Option<watch::Sender<Option<Arc<FrameContext>>>>,
}

impl PipelineOrchestrator {
    pub fn new(config: &Config) -> Self {
        Self {
            filter: DetectionFilter::new(&config.detection),
            tracker: TrackManager::new(config.tracking.clone()),
            resolver: OwnershipResolver::new(&config.ownership),
            anomaly: AnomalyStateMachine::new(config.anomaly.clone()),
            bus: EventBus::new(config.pipeline.event_bus_capacity),
            metrics: PipelineMetrics::new(),
            frame_id: 0,
            last_timestamp: None,
            snapshot_tx: None,
        }
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn tracker(&self) -> &TrackManager {
        &self.tracker
    }

    /// Receive every completed frame. Only finished frames are ever published.
    pub fn subscribe_snapshots(&mut self) -> watch::Receiver<Option<Arc<FrameContext>>> {
        match &self.snapshot_tx {
            Some(tx) => tx.subscribe(),
            None => {
                let (tx, rx) = watch::channel(None);
                self.snapshot_tx = Some(tx);
                rx
            }
        }
    }

    /// Run one full frame cycle.
    pub fn process_frame(&mut self, raw: &[RawDetection], now: f64) -> FrameContext {
        let started = Instant::now();
        self.frame_id += 1;

        if let Some(prev) = self.last_timestamp {
            if now < prev {
                warn!(
                    "Frame {} timestamp {:.3}s is earlier than previous {:.3}s",
                    self.frame_id, now, prev
                );
            }
        }
        self.last_timestamp = Some(now);

        // ── Filter ──
        let filtered = self.filter.filter(raw);
        self.metrics.add(
            &self.metrics.detections_accepted,
            filtered.detections.len() as u64,
        );
        self.metrics
            .add(&self.metrics.detections_rejected, filtered.rejected as u64);

        // ── Track ──
        self.tracker.update(&filtered.detections, now);
        for &track_id in self.tracker.last_created() {
            if let Some(track) = self.tracker.get_track(track_id) {
                self.bus.publish(PipelineEvent::TrackCreated {
                    track_id,
                    class_group: track.class_group,
                });
            }
        }
        for &track_id in self.tracker.last_expired() {
            self.bus.publish(PipelineEvent::TrackExpired { track_id });
        }
        self.metrics.add(
            &self.metrics.tracks_created,
            self.tracker.last_created().len() as u64,
        );
        self.metrics.add(
            &self.metrics.tracks_expired,
            self.tracker.last_expired().len() as u64,
        );

        let statuses_before: Vec<(TrackId, TrackStatus)> = self
            .tracker
            .tracks()
            .iter()
            .filter(|t| t.is_bag())
            .map(|t| (t.id, t.status))
            .collect();

        // ── Ownership ──
        for change in self.resolver.resolve(self.tracker.tracks_mut()) {
            match change {
                OwnershipChange::Assigned {
                    bag_id,
                    owner_id,
                    distance_px,
                } => {
                    self.metrics.inc(&self.metrics.owners_assigned);
                    self.bus.publish(PipelineEvent::OwnerAssigned {
                        bag_id,
                        owner_id,
                        distance_px,
                    });
                }
                OwnershipChange::Lost { bag_id, owner_id } => {
                    self.bus
                        .publish(PipelineEvent::OwnerLost { bag_id, owner_id });
                }
            }
        }

        // ── Anomaly ──
        let alerts = self.anomaly.step(self.tracker.tracks_mut(), now);

        for (track_id, from) in statuses_before {
            if let Some(track) = self.tracker.get_track(track_id) {
                if track.status != from {
                    self.bus.publish(PipelineEvent::StatusChanged {
                        track_id,
                        from,
                        to: track.status,
                    });
                }
            }
        }
        for alert in &alerts {
            self.metrics.inc(&self.metrics.anomalies_raised);
            self.bus.publish(PipelineEvent::AnomalyRaised(*alert));
        }

        // ── Snapshot ──
        let mut ctx = FrameContext::new(self.frame_id, now);
        ctx.tracks = self
            .tracker
            .tracks()
            .iter()
            .filter(|t| t.matched_in_frame)
            .map(|t| TrackSnapshot::from_track(t, now))
            .collect();
        ctx.alerts = alerts;
        ctx.events = self.bus.drain();
        let discarded = self.bus.take_discarded();
        if discarded > 0 {
            warn!(
                "Frame {}: {} events discarded (pipeline.event_bus_capacity too small)",
                self.frame_id, discarded
            );
            self.metrics.add(&self.metrics.events_discarded, discarded);
        }

        self.metrics.inc(&self.metrics.total_frames);
        self.metrics.set_timing(
            &self.metrics.frame_time_us,
            started.elapsed().as_micros() as u64,
        );

        if let Some(tx) = &self.snapshot_tx {
            tx.send_replace(Some(Arc::new(ctx.clone())));
        }

        ctx
    }

    /// Drive frames from `source` until it ends or `stop` flips to true.
    /// Returns the number of frames processed.
    pub async fn run<R, W>(
        &mut self,
        source: &mut ReplaySource<R>,
        sink: &mut JsonlAlertSink<W>,
        stop: watch::Receiver<bool>,
    ) -> Result<u64>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(
            "Frame loop started (alert policy: {:?})",
            self.anomaly.policy()
        );
        let mut processed = 0u64;

        loop {
            if *stop.borrow() {
                info!("Stop requested after {} frames", processed);
                break;
            }

            let frame = match source.next_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    sink.send(&AlertMessage::error(format!("{:#}", e))).await?;
                    sink.flush().await?;
                    return Err(e);
                }
            };

            let ctx = self.process_frame(&frame.detections, frame.timestamp);
            processed += 1;

            for event in &ctx.events {
                debug!("Frame {}: {:?}", ctx.frame_id, event);
            }
            for alert in &ctx.alerts {
                warn!(
                    "ALERT: Unattended package detected! Object ID: {} ({:.1}s)",
                    alert.track_id, alert.elapsed_seconds
                );
                sink.send(&AlertMessage::alert(alert)).await?;
                self.metrics.inc(&self.metrics.alerts_delivered);
            }
            if ctx.has_alerts() {
                sink.flush().await?;
            }

            // Let the transport and other tasks run before the next frame
            tokio::task::yield_now().await;
        }

        sink.send(&AlertMessage::finished()).await?;
        sink.flush().await?;
        info!("Alert sink wrote {} messages", sink.sent());
        Ok(processed)
    }
}

// ============================================================================
// TESTS
// ============================================================================
