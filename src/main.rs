//! PulseFeed - live activity feed for the terminal
//!
//! Single-task pipeline: SSE ingestion, frame-batched updates and a
//! windowed list, drawn by a panel thread.

mod config;
mod event_bus;
mod functions;
mod panels;
mod services;

use config::FeedConfig;
use log::info;
use pulse_stream::SseChannel;
use services::feed::FeedPipeline;
use std::error::Error;
use std::path::PathBuf;
use std::rc::Rc;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting PulseFeed...");

    let explicit = std::env::args_os().nth(1).map(PathBuf::from);
    let mut config = FeedConfig::resolve(explicit.as_deref())?;
    config.apply_env();
    let settings = config.validate()?;
    info!("Streaming from {}", settings.endpoint);

    let _panel = panels::feed::start_panel()?;
    let commands = services::input::spawn_stdin_reader()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let channel = Rc::new(SseChannel::new(settings.connect_timeout, settings.read_timeout));
    let mut pipeline = FeedPipeline::mount(settings, channel)?;

    runtime.block_on(pipeline.run(commands));
    if pipeline.is_mounted() {
        pipeline.unmount();
    }

    let stats = pipeline.ingest().stats();
    info!(
        "PulseFeed stopped ({}) after {} frames: {} accepted, {} rejected, {} warnings",
        pipeline.indicator(),
        pipeline.last_frame().map_or(0, |f| f.frame),
        stats.accepted,
        stats.rejected,
        pipeline.warnings_emitted()
    );
    Ok(())
}
