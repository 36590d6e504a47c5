use clap::Parser;
use tidy_chat_widget::{WidgetConfig, WidgetServer};
use tracing::info;

/// Command-line arguments for the chat widget server
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Host to bind the server to
    #[clap(long)]
    host: Option<String>,

    /// Port to listen on
    #[clap(long)]
    port: Option<u16>,

    /// Configuration file path (JSON format)
    #[clap(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading config from {}", path);
            WidgetConfig::from_file(path)?
        }
        None => WidgetConfig::load()?,
    };

    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    info!(
        business = %config.business_name,
        max_turn_secs = config.max_turn_secs,
        "starting chat widget server"
    );

    WidgetServer::from_config(config).start().await?;
    Ok(())
}
