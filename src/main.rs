//! amcpd - AMCP control daemon for a broadcast playout server.
//!
//! Listens for `\r\n`-delimited AMCP command lines, runs them through
//! per-channel FIFO queues and a timecode-driven scheduler, and answers
//! with the numeric AMCP reply codes.

mod channel;
mod command;
mod config;
mod error;
mod handlers;
mod network;
mod protocol;
mod render;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, reload};

use crate::channel::{ChannelContext, VideoFormat};
use crate::command::queue::CommandQueue;
use crate::command::repository::CommandRepository;
use crate::command::scheduler::CommandScheduler;
use crate::command::{Environment, LogControl, Shutdown};
use crate::config::Config;
use crate::network::Gateway;
use crate::network::client::ClientRegistry;
use crate::protocol::ProtocolStrategy;

/// Exit code asking the wrapper script to start a fresh instance.
const RESTART_EXIT_CODE: i32 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load(&config_path)
        .map_err(|e| anyhow::anyhow!("failed to load {config_path}: {e}"))?;

    // Initialize tracing with a reloadable filter so LOG LEVEL can
    // change it at runtime. RUST_LOG overrides the configured level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    let (filter_layer, reload_handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    info!(
        server = %config.server.name,
        channels = config.channels.len(),
        "Starting amcpd"
    );

    let log = LogControl::new(
        config.log.level.clone(),
        Box::new(move |level| {
            let filter = EnvFilter::try_new(level)?;
            reload_handle.reload(filter)?;
            Ok(())
        }),
    );

    // Build the channel list from configuration.
    let mut formats = Vec::with_capacity(config.channels.len());
    for (index, channel) in config.channels.iter().enumerate() {
        let format = VideoFormat::from_name(&channel.video_mode).ok_or_else(|| {
            anyhow::anyhow!("channel {}: unknown video mode {:?}", index + 1, channel.video_mode)
        })?;
        info!(channel = index + 1, mode = %format.name, fps = format.fps, "Channel configured");
        formats.push(format);
    }
    let channels = ChannelContext::create_all(formats);

    let mut repository = CommandRepository::new(channels.len());
    handlers::register_commands(&mut repository);

    let (shutdown_tx, mut shutdown_rx) = mpsc::unbounded_channel();
    let env = Arc::new(Environment {
        channels,
        repository: Arc::new(repository),
        scheduler: Arc::new(CommandScheduler::new(config.channels.len())),
        data_path: config.data.path.clone().into(),
        lock_clear_phrase: config.lock.clear_phrase.clone(),
        log,
        shutdown_tx,
    });

    // Queue 0 is the general queue; one more per channel.
    let queues: Vec<Arc<CommandQueue>> = std::iter::once("general".to_string())
        .chain((1..=env.channels.len()).map(|i| format!("channel{i}")))
        .map(|name| CommandQueue::spawn(name, Arc::clone(&env)))
        .collect();

    render::spawn_tick_loops(&env, &queues);

    let strategy = Arc::new(ProtocolStrategy::new(Arc::clone(&env), queues));
    let clients = Arc::new(ClientRegistry::new());
    let gateway = Gateway::bind(
        config.listen.address,
        strategy,
        Arc::clone(&clients),
    )
    .await?;

    let shutdown = tokio::select! {
        result = gateway.run() => {
            error!(error = ?result.err(), "Gateway stopped unexpectedly");
            Shutdown::Kill
        }
        request = shutdown_rx.recv() => request.unwrap_or(Shutdown::Kill),
    };

    info!(?shutdown, "Shutting down");
    clients.disconnect_all();

    match shutdown {
        Shutdown::Kill => Ok(()),
        Shutdown::Restart => std::process::exit(RESTART_EXIT_CODE),
    }
}
