// src/main.rs

mod alert_sink;
mod analysis;
mod config;
mod detection;
mod pipeline;
mod replay;
mod types;

use alert_sink::JsonlAlertSink;
use anyhow::Result;
use pipeline::PipelineOrchestrator;
use replay::ReplaySource;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use types::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::var("AEGIS_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = Config::load(&config_path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🧳 Unattended Object Detection Starting");
    info!("✓ Configuration loaded from {}", config_path);
    info!(
        "Thresholds: confidence={:.2}, match={:.0}px, owner_search={:.0}px, grace={:.1}s, unattended={:.1}s, ghost={:.1}s",
        config.detection.confidence_threshold,
        config.tracking.match_radius_px,
        config.ownership.owner_search_radius_px,
        config.anomaly.owner_grace_period_seconds,
        config.anomaly.unattended_threshold_seconds,
        config.tracking.ghost_cleanup_seconds
    );

    let mut source = ReplaySource::open(&config.io.input_path).await?;
    let mut pipeline = PipelineOrchestrator::new(&config);

    // Stand-in for an overlay renderer: reads completed frames only
    let mut snapshots = pipeline.subscribe_snapshots();
    let renderer = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let Some(ctx) = snapshots.borrow_and_update().clone() else {
                continue;
            };
            for snap in ctx.tracks.iter().filter(|t| t.status.is_unattended()) {
                debug!(
                    "[frame {}] {} bgr={:?}",
                    ctx.frame_id,
                    snap.label(),
                    snap.color().bgr()
                );
            }
        }
    });

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, finishing current frame");
            let _ = stop_tx.send(true);
        }
    });

    let result = match &config.io.alerts_path {
        Some(path) => {
            let mut sink = JsonlAlertSink::create(path).await?;
            pipeline.run(&mut source, &mut sink, stop_rx).await
        }
        None => {
            let mut sink = JsonlAlertSink::new(tokio::io::stdout());
            pipeline.run(&mut source, &mut sink, stop_rx).await
        }
    };

    // Dropping the pipeline closes the snapshot channel and ends the renderer
    let summary = pipeline.metrics().summary();
    let live_tracks = pipeline.tracker().tracks().len();
    drop(pipeline);
    let _ = renderer.await;

    match result {
        Ok(frames) => {
            info!("\n✓ Processing finished: {} frames", frames);
            info!("  Detections accepted: {}", summary.detections_accepted);
            if summary.detections_rejected > 0 {
                warn!("  Detections rejected: {}", summary.detections_rejected);
            }
            info!(
                "  Tracks created/expired: {}/{}",
                summary.tracks_created, summary.tracks_expired
            );
            info!("  Owners assigned: {}", summary.owners_assigned);
            info!("  🚨 Anomalies raised: {}", summary.anomalies_raised);
            info!("  Alerts delivered: {}", summary.alerts_delivered);
            info!("  Tracks live at end: {}", live_tracks);
            if summary.events_discarded > 0 {
                warn!("  Events discarded: {}", summary.events_discarded);
            }
            info!("  Processing speed: {:.1} FPS", summary.fps);
            debug!("{}", serde_json::to_string(&summary)?);
            Ok(())
        }
        Err(e) => {
            error!("Pipeline failed: {:#}", e);
            Err(e)
        }
    }
}
