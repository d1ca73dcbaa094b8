use anyhow::Context;
use clap::Parser;
use cognicode_core::ConfigManager;
use cognicode_server::Server;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "cognicode", version, about = "CogniCode agent server")]
struct Args {
    /// Configuration file (defaults to ./.cognicode.toml, then ~/.cognicode/config.toml)
    #[arg(short, long, env = "COGNICODE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let manager = match &args.config {
        Some(path) => ConfigManager::load_from(path),
        None => ConfigManager::load(),
    }
    .context("failed to load configuration")?;
    let config_path = manager.config_path().map(|p| p.display().to_string());
    let mut config = manager.into_config();

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("cognicode={level},tower_http={level}", level = config.logging.level).into()
    });
    let compact = config.logging.format == "compact";
    tracing_subscriber::registry()
        .with(filter)
        .with(compact.then(|| fmt::layer().compact()))
        .with((!compact).then(|| fmt::layer().pretty()))
        .init();

    info!(
        config_file = config_path.as_deref().unwrap_or("NONE (using defaults)"),
        environment = %config.server.environment,
        "CogniCode starting"
    );

    let server = Server::new(config).context("failed to build server")?;
    server.run().await.context("server terminated with an error")?;
    Ok(())
}
