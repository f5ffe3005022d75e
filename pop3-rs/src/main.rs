use clap::Parser;
use pop3_rs::config::{Config, LoggingConfig};
use pop3_rs::pop3::Pop3Server;
use pop3_rs::security::Authenticator;
use pop3_rs::storage::MaildirStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pop3d")]
#[command(about = "POP3 mail retrieval server", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./config.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address (e.g., 127.0.0.1:1110)
    #[arg(short, long)]
    listen: Option<String>,
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(cli.config.as_deref())?;

    if let Some(listen) = cli.listen {
        config.pop3.listen_addr = listen;
    }

    init_logging(&config.logging);

    info!("Starting pop3-rs server");
    info!("  POP3 listening on: {}", config.pop3.listen_addr);
    info!("  Maildir path: {}", config.storage.maildir_path);
    info!("  Greeting host: {}", config.hostname());

    let config = Arc::new(config);

    let directory = Arc::new(Authenticator::new(&config.storage.database_url).await?);
    directory.health_check().await?;
    info!("  Accounts: {} in {}", directory.count_users().await?, config.storage.database_url);
    let store = Arc::new(MaildirStore::new(config.storage.maildir_path.clone()));

    let server = Pop3Server::new(Arc::clone(&config), directory, store);

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("POP3 server error: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested, stopping POP3 server");
        }
    }

    Ok(())
}
