use std::path::PathBuf;

use clap::Parser;
use mpv_conduit::engine::LibMpv;
use mpv_conduit::metrics;
use mpv_conduit::PlaybackEnd;
use mpv_conduit::Player;
use mpv_conduit::PlayerConfig;
use mpv_conduit::Result;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

/// Play a media URL to its end through an embedded mpv engine.
#[derive(Parser, Debug)]
#[command(name = "mpv-conduit", version, about)]
struct Args {
    /// File path or stream URL to play
    url: String,

    /// Extra configuration file layered over defaults and CONFIG_PATH
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print collected metrics in Prometheus text format on exit
    #[arg(long)]
    print_metrics: bool,
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_observability();

    let mut settings = PlayerConfig::new()?;
    if let Some(path) = &args.config {
        settings = settings.with_override_config(&path.to_string_lossy())?;
    }
    let settings = settings.validate()?;

    let player = Player::new(settings);
    player.open(LibMpv::create()?)?;
    info!(url = %args.url, "starting playback. Press CTRL+C to stop");

    let playback = player.play_to_end(&args.url);
    tokio::pin!(playback);

    let outcome = tokio::select! {
        end = &mut playback => end,
        _ = shutdown_signal() => {
            if let Err(e) = player.run_command(&["quit"]).await {
                warn!(error = %e, "engine did not accept quit");
            }
            playback.await
        }
    };

    player.close();

    match &outcome {
        Ok(PlaybackEnd::Finished(end)) => info!(reason = ?end.reason, "playback finished"),
        Ok(PlaybackEnd::EngineShutdown) => info!("engine shut down before playback finished"),
        Err(e) => error!(error = %e, "playback stopped"),
    }

    if args.print_metrics {
        println!("{}", metrics::gather_text()?);
    }

    outcome.map(|_| ())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::signal;
        use tokio::signal::unix::SignalKind;

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("SIGTERM detected."),
                    _ = tokio::signal::ctrl_c() => info!("Ctrl+C detected."),
                }
                return;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    }

    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Ctrl+C detected.");
    }
}

fn init_observability() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,mpv=warn"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_thread_names(true)
        .with_filter(filter);
    tracing_subscriber::registry().with(fmt_layer).init();
}
