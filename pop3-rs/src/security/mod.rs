//! Security module
//!
//! User credential handling for the authorization state:
//! - [`directory`]: the [`UserDirectory`] trait consulted by USER and PASS
//! - [`auth`]: SQLite-backed accounts with Argon2 password hashes

pub mod auth;
pub mod directory;

pub use auth::Authenticator;
pub use directory::UserDirectory;
