//! User directory seam used by USER and PASS

use crate::error::Result;
use async_trait::async_trait;

/// Source of truth for which users exist and what their passwords are
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Whether a maildrop exists for `username`, independent of any password
    async fn has_user(&self, username: &str) -> Result<bool>;

    /// Whether `password` is correct for `username`
    async fn verify(&self, username: &str, password: &str) -> Result<bool>;
}
