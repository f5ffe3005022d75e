//! Account administration for pop3d
//!
//! Accounts live in the SQLite database and each one owns a maildir of the
//! same name under `storage.maildir_path`. Paths come from the same config
//! file pop3d reads; `--db` and `--maildir` override them.
//!
//! ```bash
//! pop3-user add alice password123      # account plus empty maildir
//! pop3-user check alice                # account, maildir, message totals
//! pop3-user list
//! pop3-user delete alice               # mail on disk is kept
//! ```

use clap::{Parser, Subcommand};
use pop3_rs::config::Config;
use pop3_rs::security::Authenticator;
use pop3_rs::storage::{MailboxStore, MaildirStore};
use pop3_rs::{Pop3Error, Result};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "pop3-user")]
#[command(about = "Manage pop3d accounts and their maildirs", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./config.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override storage.database_url
    #[arg(long)]
    db: Option<String>,

    /// Override storage.maildir_path
    #[arg(long)]
    maildir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and its maildir
    Add { username: String, password: String },
    /// Remove an account; its maildir stays on disk
    Delete { username: String },
    /// List accounts with their maildrop totals
    List,
    /// Show whether an account and its maildir exist
    Check { username: String },
}

struct Admin {
    accounts: Authenticator,
    maildirs: MaildirStore,
}

impl Admin {
    async fn add(&self, username: &str, password: &str) -> Result<()> {
        // Refuse names the maildir store could never serve
        let path = self.maildirs.create(username).await?;
        self.accounts.add_user(username, password).await?;

        println!("Added {} (maildir {})", username, path.display());
        Ok(())
    }

    async fn delete(&self, username: &str) -> Result<()> {
        self.accounts.delete_user(username).await?;

        println!("Deleted {}", username);
        if self.maildirs.exists(username).await? {
            println!("Maildir for {} left in place", username);
        }
        Ok(())
    }

    async fn list(&self) -> Result<()> {
        let users = self.accounts.list_users().await?;
        if users.is_empty() {
            println!("No accounts.");
            return Ok(());
        }

        println!(
            "{:<24} {:>8} {:>12}  {}",
            "USER", "MESSAGES", "OCTETS", "LAST LOGIN"
        );
        for (username, _created_at, last_login) in &users {
            let mailbox = self.maildirs.load(username).await?;
            println!(
                "{:<24} {:>8} {:>12}  {}",
                username,
                mailbox.len(true),
                mailbox.size(true),
                last_login.as_deref().unwrap_or("-")
            );
        }
        Ok(())
    }

    async fn check(&self, username: &str) -> Result<()> {
        if !self.accounts.user_exists(username).await? {
            return Err(Pop3Error::NotFound(format!("No account for {}", username)));
        }
        if !self.maildirs.exists(username).await? {
            return Err(Pop3Error::NotFound(format!(
                "Account {} has no maildir",
                username
            )));
        }

        let mailbox = self.maildirs.load(username).await?;
        println!(
            "{}: {} messages, {} octets",
            username,
            mailbox.len(true),
            mailbox.size(true)
        );
        Ok(())
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.storage.database_url = db;
    }
    if let Some(maildir) = cli.maildir {
        config.storage.maildir_path = maildir;
    }

    let admin = Admin {
        accounts: Authenticator::new(&config.storage.database_url).await?,
        maildirs: MaildirStore::new(config.storage.maildir_path),
    };

    match cli.command {
        Commands::Add { username, password } => admin.add(&username, &password).await,
        Commands::Delete { username } => admin.delete(&username).await,
        Commands::List => admin.list().await,
        Commands::Check { username } => admin.check(&username).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pop3-user: {}", e);
            ExitCode::FAILURE
        }
    }
}
