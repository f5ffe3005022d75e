//! Mailbox storage
//!
//! A [`Mailbox`] is the per-session view of a user's maildrop: an ordered
//! list of [`MailItem`]s whose 1-based ordinals never change while the
//! session lives. Deleting an item only flags it; the flag is applied to
//! persistent storage by [`MailboxStore::commit`] when the client QUITs.
//!
//! Backends:
//! - [`maildir`]: Maildir directories (`new/` and `cur/`)

pub mod maildir;

pub use maildir::MaildirStore;

use crate::error::Result;
use async_trait::async_trait;
use tokio::io::AsyncBufRead;

/// Readable message content, consumed line by line by RETR
pub type MessageReader = Box<dyn AsyncBufRead + Send + Unpin>;

/// One message in a maildrop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailItem {
    /// Backend-specific locator (a path relative to the maildrop for Maildir)
    key: String,
    /// Size in octets
    size: u64,
    deleted: bool,
}

impl MailItem {
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
            deleted: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

/// A user's maildrop as loaded at PASS time
#[derive(Debug, Clone)]
pub struct Mailbox {
    owner: String,
    items: Vec<MailItem>,
}

impl Mailbox {
    pub fn new(owner: impl Into<String>, items: Vec<MailItem>) -> Self {
        Self {
            owner: owner.into(),
            items,
        }
    }

    /// User the maildrop belongs to
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Number of messages, optionally counting those marked deleted
    pub fn len(&self, include_deleted: bool) -> usize {
        self.items
            .iter()
            .filter(|item| include_deleted || !item.deleted)
            .count()
    }

    /// Total size in octets, optionally counting messages marked deleted
    pub fn size(&self, include_deleted: bool) -> u64 {
        self.items
            .iter()
            .filter(|item| include_deleted || !item.deleted)
            .map(|item| item.size)
            .sum()
    }

    /// Look up a message by ordinal, deleted or not
    pub fn item(&self, ordinal: usize) -> Option<&MailItem> {
        ordinal.checked_sub(1).and_then(|index| self.items.get(index))
    }

    /// Mark a message deleted
    ///
    /// Returns false if the ordinal is out of range or already deleted.
    pub fn delete(&mut self, ordinal: usize) -> bool {
        match ordinal
            .checked_sub(1)
            .and_then(|index| self.items.get_mut(index))
        {
            Some(item) if !item.deleted => {
                item.deleted = true;
                true
            }
            _ => false,
        }
    }

    /// Clear every deletion mark, returning how many were cleared
    pub fn undelete_all(&mut self) -> usize {
        let mut restored = 0;
        for item in self.items.iter_mut().filter(|item| item.deleted) {
            item.deleted = false;
            restored += 1;
        }
        restored
    }

    /// Messages not marked deleted, with their ordinals, in ascending order
    pub fn live_items(&self) -> impl Iterator<Item = (usize, &MailItem)> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.deleted)
            .map(|(index, item)| (index + 1, item))
    }

    pub fn deleted_items(&self) -> impl Iterator<Item = &MailItem> {
        self.items.iter().filter(|item| item.deleted)
    }
}

/// Mailbox persistence backend
#[async_trait]
pub trait MailboxStore: Send + Sync {
    /// Load the maildrop of `username`
    async fn load(&self, username: &str) -> Result<Mailbox>;

    /// Open the content of one message for reading
    async fn open(&self, mailbox: &Mailbox, item: &MailItem) -> Result<MessageReader>;

    /// Permanently remove the messages marked deleted, returning how many were removed
    async fn commit(&self, mailbox: &Mailbox) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mailbox() -> Mailbox {
        Mailbox::new(
            "alice",
            vec![
                MailItem::new("1", 100),
                MailItem::new("2", 200),
                MailItem::new("3", 300),
            ],
        )
    }

    #[test]
    fn test_counts_and_sizes() {
        let mut mailbox = sample_mailbox();
        assert_eq!(mailbox.len(false), 3);
        assert_eq!(mailbox.size(false), 600);

        assert!(mailbox.delete(2));
        assert_eq!(mailbox.len(false), 2);
        assert_eq!(mailbox.size(false), 400);
        assert_eq!(mailbox.len(true), 3);
        assert_eq!(mailbox.size(true), 600);
    }

    #[test]
    fn test_delete_keeps_ordinals() {
        let mut mailbox = sample_mailbox();
        assert!(mailbox.delete(1));

        let ordinals: Vec<usize> = mailbox.live_items().map(|(n, _)| n).collect();
        assert_eq!(ordinals, vec![2, 3]);
        assert!(mailbox.item(1).unwrap().is_deleted());
        assert_eq!(mailbox.item(3).unwrap().size(), 300);
    }

    #[test]
    fn test_delete_rejects_bad_ordinals() {
        let mut mailbox = sample_mailbox();
        assert!(!mailbox.delete(0));
        assert!(!mailbox.delete(4));
        assert!(mailbox.delete(3));
        assert!(!mailbox.delete(3));
    }

    #[test]
    fn test_undelete_all() {
        let mut mailbox = sample_mailbox();
        assert_eq!(mailbox.undelete_all(), 0);

        mailbox.delete(1);
        mailbox.delete(3);
        assert_eq!(mailbox.deleted_items().count(), 2);
        assert_eq!(mailbox.undelete_all(), 2);
        assert_eq!(mailbox.len(false), 3);
    }

    #[test]
    fn test_item_lookup_bounds() {
        let mailbox = sample_mailbox();
        assert!(mailbox.item(0).is_none());
        assert!(mailbox.item(4).is_none());
        assert_eq!(mailbox.item(1).unwrap().key(), "1");
    }
}
