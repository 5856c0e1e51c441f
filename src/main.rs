// src/main.rs

use anyhow::{Context, Result};
use lane_keeper::pipeline::{MetricsSummary, Session};
use lane_keeper::trace_io::TraceProcessor;
use lane_keeper::types::{Config, SteeringMode};
use std::path::Path;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

fn main() -> Result<()> {
    let config_path =
        std::env::var("LANE_KEEPER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lane_keeper={}", config.logging.level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🚗 Lane Keeper Starting");
    info!("✓ Configuration loaded from {}", config_path);
    info!(
        "Tracker: alpha={:.2}, max_lost={} | Sanity: width=({:.0}, {:.0})px, slope_diff<={:.2}",
        config.tracker.alpha,
        config.tracker.max_lost,
        config.sanity.min_lane_width_px,
        config.sanity.max_lane_width_px,
        config.sanity.max_slope_diff
    );
    match config.controller.mode {
        SteeringMode::Pid => info!(
            "Steering: PID kp={:.3} ki={:.3} kd={:.3}, bounds [{:.1}, {:.1}] deg, dt={:.3}s",
            config.controller.kp,
            config.controller.ki,
            config.controller.kd,
            config.controller.min_output,
            config.controller.max_output,
            config.controller.dt
        ),
        SteeringMode::Proportional => info!(
            "Steering: proportional, full lock at {:.2} m offset",
            config.controller.max_offset_m
        ),
    }

    let processor = TraceProcessor::new(config.io.clone());
    let trace_files = processor.find_trace_files()?;

    if trace_files.is_empty() {
        error!("No fit traces found in {}", config.io.input_dir);
        return Ok(());
    }

    info!("Found {} trace(s) to process", trace_files.len());

    for (idx, trace_path) in trace_files.iter().enumerate() {
        info!("========================================");
        info!(
            "Processing trace {}/{}: {}",
            idx + 1,
            trace_files.len(),
            trace_path.display()
        );

        match process_trace(trace_path, &processor, &config) {
            Ok(stats) => log_summary(&stats),
            Err(e) => error!("Failed to process trace: {:#}", e),
        }
    }

    Ok(())
}

fn process_trace(
    trace_path: &Path,
    processor: &TraceProcessor,
    config: &Config,
) -> Result<MetricsSummary> {
    let mut reader = processor.open_trace(trace_path)?;
    let mut writer = processor.create_writer(trace_path)?;
    let mut session = Session::new(config)?;

    while let Some(frame) = reader.read_frame()? {
        let output = session
            .process_frame(&frame)
            .with_context(|| format!("processing frame {}", frame.frame))?;

        if output.frame % 300 == 0 {
            debug!(
                "Frame {}: offset={:+.3}m steering={:+.2}deg status={}",
                output.frame,
                output.offset_m,
                output.steering_deg,
                output.confidence_label()
            );
        }

        writer.write_frame(&output)?;
    }

    writer.finish()?;
    Ok(session.metrics().summary())
}

fn log_summary(stats: &MetricsSummary) {
    info!("✓ Trace processed successfully!");
    info!("  Total frames: {}", stats.total_frames);
    info!(
        "  Accepted detections: {} ({:.1}%)",
        stats.accepted_frames,
        100.0 * stats.acceptance_rate
    );
    info!(
        "  Rejected: {} (missing: {}, width: {}, not parallel: {})",
        stats.rejected_frames, stats.rejected_missing, stats.rejected_width, stats.rejected_parallel
    );
    info!(
        "  Status frames: tracking={} coasting={} lost={}",
        stats.tracking_frames, stats.coasting_frames, stats.lost_frames
    );
    if stats.track_resets > 0 {
        warn!(
            "  📉 Boundary resets: {} | controller resets: {}",
            stats.track_resets, stats.pid_resets
        );
    }
    info!("  Processing Speed: {:.1} FPS", stats.fps);
}
