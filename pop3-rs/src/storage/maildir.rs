use crate::error::{Pop3Error, Result};
use crate::storage::{MailItem, Mailbox, MailboxStore, MessageReader};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::BufReader;
use tracing::{debug, info, warn};

/// Maildir subdirectories holding deliverable messages, in listing order
const MESSAGE_DIRS: [&str; 2] = ["new", "cur"];

/// Maildir-backed mailbox store
///
/// Each user owns `<base_path>/<username>/{new,cur}`. Messages are listed
/// `new/` first, then `cur/`, each sorted by file name, so ordinals are
/// reproducible between sessions as long as the directory is unchanged.
pub struct MaildirStore {
    base_path: PathBuf,
}

impl MaildirStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Resolve a user's maildir, refusing names that could leave the root
    fn user_path(&self, username: &str) -> Result<PathBuf> {
        let invalid = username.is_empty()
            || username == "."
            || username == ".."
            || username.contains(&['/', '\\', '\0'][..]);

        if invalid {
            return Err(Pop3Error::NotFound(format!(
                "Invalid maildrop name {:?}",
                username
            )));
        }

        Ok(self.base_path.join(username))
    }

    /// Create `<base_path>/<username>/{tmp,new,cur}`, leaving existing mail alone
    pub async fn create(&self, username: &str) -> Result<PathBuf> {
        let maildir = self.user_path(username)?;

        for subdir in ["tmp", "new", "cur"] {
            let dir = maildir.join(subdir);
            fs::create_dir_all(&dir).await.map_err(|e| {
                Pop3Error::Storage(format!("Failed to create directory {:?}: {}", dir, e))
            })?;
        }

        info!("Maildir ready at {}", maildir.display());
        Ok(maildir)
    }

    /// Whether the user's maildir is present on disk
    pub async fn exists(&self, username: &str) -> Result<bool> {
        let maildir = self.user_path(username)?;

        match fs::metadata(&maildir).await {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Pop3Error::Storage(format!(
                "Failed to stat {}: {}",
                maildir.display(),
                e
            ))),
        }
    }

    async fn scan(maildir: &Path, subdir: &str, items: &mut Vec<MailItem>) -> Result<()> {
        let dir = maildir.join(subdir);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(Pop3Error::Storage(format!(
                    "Failed to read directory {:?}: {}",
                    dir, e
                )))
            }
        };

        let mut found = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Pop3Error::Storage(format!("Failed to list {:?}: {}", dir, e)))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) => {
                    // Raced with another client removing it
                    warn!("Skipping {:?}: {}", entry.path(), e);
                    continue;
                }
            };

            if metadata.is_file() {
                found.push((name, metadata.len()));
            }
        }

        found.sort_by(|a, b| a.0.cmp(&b.0));
        items.extend(
            found
                .into_iter()
                .map(|(name, size)| MailItem::new(format!("{}/{}", subdir, name), size)),
        );

        Ok(())
    }
}

#[async_trait]
impl MailboxStore for MaildirStore {
    async fn load(&self, username: &str) -> Result<Mailbox> {
        let maildir = self.user_path(username)?;

        let mut items = Vec::new();
        for subdir in MESSAGE_DIRS {
            Self::scan(&maildir, subdir, &mut items).await?;
        }

        debug!(
            "Loaded {} messages for {} from {}",
            items.len(),
            username,
            maildir.display()
        );

        Ok(Mailbox::new(username, items))
    }

    async fn open(&self, mailbox: &Mailbox, item: &MailItem) -> Result<MessageReader> {
        let path = self.user_path(mailbox.owner())?.join(item.key());

        let file = fs::File::open(&path).await.map_err(|e| {
            Pop3Error::Storage(format!("Failed to open {}: {}", path.display(), e))
        })?;

        Ok(Box::new(BufReader::new(file)))
    }

    async fn commit(&self, mailbox: &Mailbox) -> Result<usize> {
        let maildir = self.user_path(mailbox.owner())?;

        let mut removed = 0;
        let mut failed = 0;
        for item in mailbox.deleted_items() {
            let path = maildir.join(item.key());
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => removed += 1,
                Err(e) => {
                    warn!("Failed to remove {}: {}", path.display(), e);
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(Pop3Error::Storage(format!(
                "{} of {} deleted messages could not be removed for {}",
                failed,
                removed + failed,
                mailbox.owner()
            )));
        }

        info!("Removed {} messages from {}", removed, maildir.display());
        Ok(removed)
    }
}
