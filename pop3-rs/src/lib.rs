//! pop3-rs: POP3 mail retrieval server
//!
//! Serves Maildir mailboxes over POP3 (RFC 1939) with accounts kept in an
//! SQLite database.
//!
//! # Features
//!
//! - **Session state machine**: AUTHORIZATION → TRANSACTION → UPDATE with
//!   strict command ordering
//! - **Commands**: USER, PASS, STAT, LIST, RETR, DELE, RSET, NOOP, QUIT
//! - **Storage**: Maildir, deletions applied only when the client QUITs
//! - **Limits**: bounded command lines and an idle autologout timer
//!
//! # Example
//!
//! ```no_run
//! use pop3_rs::config::Config;
//! use pop3_rs::pop3::Pop3Server;
//! use pop3_rs::security::Authenticator;
//! use pop3_rs::storage::MaildirStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::default());
//!     let directory = Arc::new(Authenticator::new(&config.storage.database_url).await?);
//!     let store = Arc::new(MaildirStore::new(config.storage.maildir_path.clone()));
//!
//!     let server = Pop3Server::new(config, directory, store);
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration management
//! - [`error`]: Error types and handling
//! - [`pop3`]: POP3 protocol implementation
//! - [`storage`]: Mailbox storage backends
//! - [`security`]: User accounts and password verification

pub mod config;
pub mod error;
pub mod pop3;
pub mod security;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use error::{Pop3Error, Result};
