use std::path::{Path, PathBuf};

use clap::Parser;
use color_eyre::eyre::eyre;
use feed_relay::{
    client::{ClientConfig, EventPoller, FeedApi, spawn_poller},
    config::{ENV_FILE, RelayConfig, default_config_path, load_config, load_env_file, save_config},
    logging::{LoggingConfig, init_logging},
    publisher::Subscription,
};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "feed-relay")]
#[command(version)]
#[command(about = "Polls the GitHub events feed and relays each new event once")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Feed root URL
    #[arg(long, value_name = "URL")]
    feed_url: Option<String>,

    /// Seconds to wait between polls
    #[arg(short, long, value_name = "SECS")]
    interval: Option<u64>,

    /// Print every new event to stdout as a JSON line; logs go to stderr
    #[arg(long)]
    print: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Write the effective configuration (without the token) and exit
    #[arg(long)]
    init_config: bool,
}

impl Cli {
    fn apply(&self, mut config: RelayConfig) -> RelayConfig {
        if let Some(feed_url) = &self.feed_url {
            config.feed_url = feed_url.as_str().into();
        }
        if let Some(interval) = self.interval {
            config.poll_interval_secs = interval;
        }
        config
    }
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = cli.apply(load_config(&config_path)?);

    if cli.init_config {
        save_config(&config_path, &config.clone().without_token())?;
        println!("Configuration written to {}", config_path.display());
        return Ok(());
    }

    let env_file_loaded = load_env_file(Path::new(ENV_FILE));
    let config = config.with_env();
    let logging_config = LoggingConfig::from_env()
        .with_relay_config(&config)
        .with_debug(cli.debug)
        .with_stderr(cli.print);
    let _log_guard = init_logging(logging_config)?;
    info!(version = env!("CARGO_PKG_VERSION"), env_file_loaded, "feed-relay starting up");

    let client_config = ClientConfig::from(config);
    let api = FeedApi::new(client_config.clone())?;
    let poller = EventPoller::new(api, client_config.feed_url, client_config.polling);

    let relay = tokio::spawn(relay_events(poller.subscribe(), cli.print));
    let (mut poller_task, shutdown) = spawn_poller(poller);

    tokio::select! {
        result = &mut poller_task => {
            result?;
            return Err(eyre!("event poller stopped without a shutdown request"));
        }
        signal = tokio::signal::ctrl_c() => signal?,
    }
    warn!("Shutdown requested, finishing current cycle. Press Ctrl+C again to force quit.");
    let _ = shutdown.send(());

    tokio::select! {
        result = poller_task => result?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Force quit");
            std::process::exit(130);
        }
    }

    relay.await?;
    info!("feed-relay stopped");
    Ok(())
}

/// Built-in subscriber: print events as JSON lines or log a one-line summary
async fn relay_events(mut subscription: Subscription, print: bool) {
    while let Some(event) = subscription.recv().await {
        if print {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(event_id = %event.id, error = %e, "Failed to serialize event"),
            }
        } else {
            info!(
                event_id = %event.id,
                event_type = event.event_type().unwrap_or("-"),
                actor = event.actor_login().unwrap_or("-"),
                repo = event.repo_name().unwrap_or("-"),
                "New event"
            );
        }
    }
}
