//! Account database
//!
//! Users who may open a POP3 maildrop are kept in an SQLite table. The
//! username doubles as the maildrop name in the mailbox store.
//!
//! # Security
//! - Passwords hashed with Argon2 and a random salt
//! - Plaintext passwords never logged
//!
//! # Usage
//! ```no_run
//! use pop3_rs::security::{Authenticator, UserDirectory};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let auth = Authenticator::new("sqlite://users.db").await?;
//!
//! auth.add_user("alice", "password123").await?;
//!
//! assert!(auth.has_user("alice").await?);
//! assert!(auth.verify("alice", "password123").await?);
//! # Ok(())
//! # }
//! ```

use crate::error::{Pop3Error, Result};
use crate::security::UserDirectory;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// SQLite user directory
#[derive(Clone)]
pub struct Authenticator {
    db: Arc<SqlitePool>,
}

impl Authenticator {
    /// Open the account database, creating it and its table if needed
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let db = SqlitePool::connect_with(options).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pop3_users (
                username TEXT PRIMARY KEY,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL,
                last_login TEXT
            )
            "#,
        )
        .execute(&db)
        .await?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Add a new user
    ///
    /// # Security
    /// Password is hashed with Argon2 before storage
    pub async fn add_user(&self, username: &str, password: &str) -> Result<()> {
        info!("Adding user: {}", username);

        if self.user_exists(username).await? {
            return Err(Pop3Error::UserExists(username.to_string()));
        }

        let password_hash = self.hash_password(password)?;

        sqlx::query(
            r#"
            INSERT INTO pop3_users (username, password_hash, created_at)
            VALUES (?, ?, datetime('now'))
            "#,
        )
        .bind(username)
        .bind(&password_hash)
        .execute(&*self.db)
        .await?;

        info!("User added: {}", username);
        Ok(())
    }

    /// Hash password with Argon2
    pub fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Pop3Error::Config(format!("Failed to hash password: {}", e)))?;

        Ok(password_hash.to_string())
    }

    /// Check if user exists
    pub async fn user_exists(&self, username: &str) -> Result<bool> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM pop3_users WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_one(&*self.db)
        .await?;

        Ok(count.0 > 0)
    }

    /// Delete user; `NotFound` when there was no such account
    pub async fn delete_user(&self, username: &str) -> Result<()> {
        info!("Deleting user: {}", username);

        let result = sqlx::query(
            r#"
            DELETE FROM pop3_users WHERE username = ?
            "#,
        )
        .bind(username)
        .execute(&*self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Pop3Error::NotFound(format!("No account for {}", username)));
        }

        Ok(())
    }

    /// List all users with last login
    ///
    /// Returns a list of (username, created_at, last_login) tuples
    pub async fn list_users(&self) -> Result<Vec<(String, String, Option<String>)>> {
        let users = sqlx::query_as::<_, (String, String, Option<String>)>(
            r#"
            SELECT username, created_at, last_login
            FROM pop3_users
            ORDER BY created_at DESC, username
            "#,
        )
        .fetch_all(&*self.db)
        .await?;

        Ok(users)
    }

    /// Count total users
    pub async fn count_users(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM pop3_users
            "#,
        )
        .fetch_one(&*self.db)
        .await?;

        Ok(count.0)
    }

    /// Check a username/password pair, recording the login on success
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<bool> {
        debug!("Authentication attempt for {}", username);

        let row = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT username, password_hash
            FROM pop3_users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&*self.db)
        .await?;

        let Some((username, stored_hash)) = row else {
            warn!("Authentication failed: user not found: {}", username);
            return Ok(false);
        };

        let parsed_hash =
            PasswordHash::new(&stored_hash).map_err(|_e| Pop3Error::AuthenticationFailed)?;

        let verified = Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok();

        if !verified {
            warn!("Authentication failed: invalid password for {}", username);
            return Ok(false);
        }

        info!("Authentication successful for {}", username);

        sqlx::query(
            r#"
            UPDATE pop3_users
            SET last_login = datetime('now')
            WHERE username = ?
            "#,
        )
        .bind(&username)
        .execute(&*self.db)
        .await?;

        Ok(true)
    }

    /// Health check - verify database connectivity
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&*self.db).await?;

        Ok(())
    }
}

#[async_trait]
impl UserDirectory for Authenticator {
    async fn has_user(&self, username: &str) -> Result<bool> {
        self.user_exists(username).await
    }

    async fn verify(&self, username: &str, password: &str) -> Result<bool> {
        self.authenticate(username, password).await
    }
}
