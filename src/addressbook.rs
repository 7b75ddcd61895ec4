//! Address book: human labels for accounts
//!
//! Thread-safe, validated, persisted as JSON with atomic writes. Every change
//! bumps a revision signal so listings and label validators can react.

use crate::crypto::AccountId;
use crate::error::KittyError;
use crate::reactive::{Cell, Signal, Subscription};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

const MAX_LABEL_LENGTH: usize = 64;
const MAX_NOTES_LENGTH: usize = 512;
const MAX_ENTRIES: usize = 10_000;
const BACKUP_SUFFIX: &str = ".backup";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddressEntry {
    /// Display label (case-preserved)
    pub label: String,
    pub account: AccountId,
    pub notes: Option<String>,
    /// RFC3339
    pub created_at: String,
    /// RFC3339
    pub updated_at: String,
    pub version: u32,
}

impl AddressEntry {
    fn new(label: String, account: AccountId, notes: Option<String>) -> Result<Self, KittyError> {
        let label = label.trim().to_string();
        let notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        validate_label(&label)?;
        if let Some(ref n) = notes {
            validate_notes(n)?;
        }

        let now = chrono::Utc::now().to_rfc3339();
        Ok(AddressEntry {
            label,
            account,
            notes,
            created_at: now.clone(),
            updated_at: now,
            version: 1,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AddressBookInner {
    /// Keyed by lowercase label
    entries: HashMap<String, AddressEntry>,

    #[serde(skip)]
    account_index: HashMap<AccountId, String>,
}

impl AddressBookInner {
    fn rebuild_index(&mut self) {
        self.account_index = self
            .entries
            .iter()
            .map(|(key, entry)| (entry.account, key.clone()))
            .collect();
    }
}

#[derive(Clone)]
pub struct AddressBook {
    inner: Arc<RwLock<AddressBookInner>>,
    revision: Arc<Cell<u64>>,
}

impl AddressBook {
    pub fn new() -> Self {
        Self::from_inner(AddressBookInner::default())
    }

    fn from_inner(inner: AddressBookInner) -> Self {
        AddressBook {
            inner: Arc::new(RwLock::new(inner)),
            revision: Arc::new(Cell::with(0)),
        }
    }

    fn bump(&self) {
        let next = self.revision.get().unwrap_or(0) + 1;
        self.revision.set(next);
    }

    /// Ticks on every change to the book.
    pub fn changes(&self) -> Signal<u64> {
        self.revision.signal()
    }

    /// Add a labelled account. Labels are unique case-insensitively, and so are accounts.
    pub fn add(&self, label: &str, account: AccountId, notes: Option<String>) -> Result<(), KittyError> {
        {
            let mut inner = self.inner.write();

            if inner.entries.len() >= MAX_ENTRIES {
                return Err(KittyError::WalletError(format!(
                    "Address book is full (max {} entries)",
                    MAX_ENTRIES
                )));
            }

            let entry = AddressEntry::new(label.to_string(), account, notes)?;
            let key = entry.label.to_lowercase();

            if inner.entries.contains_key(&key) {
                return Err(KittyError::WalletError(format!(
                    "Label '{}' already exists",
                    entry.label
                )));
            }
            if let Some(existing) = inner
                .account_index
                .get(&account)
                .and_then(|k| inner.entries.get(k))
            {
                return Err(KittyError::WalletError(format!(
                    "Account already exists with label '{}'",
                    existing.label
                )));
            }

            debug!("address book: {} -> {}", entry.label, account.short());
            inner.account_index.insert(account, key.clone());
            inner.entries.insert(key, entry);
        }
        self.bump();
        Ok(())
    }

    pub fn remove(&self, label: &str) -> Result<AddressEntry, KittyError> {
        let entry = {
            let mut inner = self.inner.write();
            let entry = inner
                .entries
                .remove(&label.trim().to_lowercase())
                .ok_or_else(|| KittyError::WalletError(format!("Label '{}' not found", label)))?;
            inner.account_index.remove(&entry.account);
            entry
        };
        self.bump();
        Ok(entry)
    }

    pub fn get(&self, label: &str) -> Option<AddressEntry> {
        self.inner
            .read()
            .entries
            .get(&label.trim().to_lowercase())
            .cloned()
    }

    /// Match label, notes, or account hex.
    pub fn search(&self, query: &str) -> Vec<AddressEntry> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        let inner = self.inner.read();
        let mut results: Vec<_> = inner
            .entries
            .values()
            .filter(|entry| {
                entry.label.to_lowercase().contains(&query)
                    || entry.account.to_hex().contains(&query)
                    || entry
                        .notes
                        .as_deref()
                        .is_some_and(|n| n.to_lowercase().contains(&query))
            })
            .cloned()
            .collect();
        results.sort_by(|a, b| a.label.cmp(&b.label));
        results
    }

    /// All entries sorted by label
    pub fn list(&self) -> Vec<AddressEntry> {
        let mut entries: Vec<_> = self.inner.read().entries.values().cloned().collect();
        entries.sort_by(|a, b| a.label.cmp(&b.label));
        entries
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.inner
            .read()
            .entries
            .contains_key(&label.trim().to_lowercase())
    }

    /// Save with a `.backup` of the previous file and an atomic rename.
    pub fn save(&self, path: &Path) -> Result<(), KittyError> {
        save_inner(&self.inner, path)
    }

    /// Save to `path` after every change until the subscription is dropped.
    /// The subscription only holds the entries weakly.
    pub fn autosave(&self, path: PathBuf) -> Subscription {
        let inner = Arc::downgrade(&self.inner);
        self.revision.subscribe(move |_| {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            if let Err(e) = save_inner(&inner, &path) {
                warn!("Failed to save address book to {}: {}", path.display(), e);
            }
        })
    }

    pub fn load(path: &Path) -> Result<Self, KittyError> {
        if !path.exists() {
            return Ok(AddressBook::new());
        }
        let contents = fs::read_to_string(path)?;
        let mut inner: AddressBookInner = serde_json::from_str(&contents)
            .map_err(|e| KittyError::WalletError(format!("Failed to parse address book: {}", e)))?;
        for entry in inner.entries.values() {
            validate_label(&entry.label)?;
            if let Some(ref notes) = entry.notes {
                validate_notes(notes)?;
            }
        }
        inner.rebuild_index();
        Ok(Self::from_inner(inner))
    }

    pub fn export_csv(&self, path: &Path) -> Result<(), KittyError> {
        let mut csv = String::from("Label,Account,Notes,Created,Updated,Version\n");
        for entry in self.list() {
            let notes = entry.notes.as_deref().unwrap_or("");
            csv.push_str(&format!(
                "\"{}\",\"{}\",\"{}\",\"{}\",\"{}\",{}\n",
                entry.label.replace('"', "\"\""),
                entry.account,
                notes.replace('"', "\"\""),
                entry.created_at,
                entry.updated_at,
                entry.version
            ));
        }
        fs::write(path, csv)?;
        Ok(())
    }
}

impl Default for AddressBook {
    fn default() -> Self {
        Self::new()
    }
}

fn save_inner(inner: &RwLock<AddressBookInner>, path: &Path) -> Result<(), KittyError> {
    let json = serde_json::to_string_pretty(&*inner.read())?;
    write_atomic(path, json.as_bytes())
}

/// Write `bytes` to `path` via a temp file and rename, keeping a `.backup` of the old file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), KittyError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    if path.exists() {
        let mut backup = path.as_os_str().to_owned();
        backup.push(BACKUP_SUFFIX);
        fs::copy(path, PathBuf::from(backup))
            .map_err(|e| KittyError::WalletError(format!("Failed to create backup: {}", e)))?;
    }

    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)
        .map_err(|e| KittyError::WalletError(format!("Failed to create temp file: {}", e)))?;
    file.write_all(bytes)
        .map_err(|e| KittyError::WalletError(format!("Failed to write file: {}", e)))?;
    file.sync_all()
        .map_err(|e| KittyError::WalletError(format!("Failed to sync file: {}", e)))?;
    drop(file);

    fs::rename(&temp_path, path)
        .map_err(|e| KittyError::WalletError(format!("Failed to finalize write: {}", e)))?;
    Ok(())
}

pub(crate) fn validate_label(label: &str) -> Result<(), KittyError> {
    if label.is_empty() {
        return Err(KittyError::WalletError("Label cannot be empty".to_string()));
    }
    if label.len() > MAX_LABEL_LENGTH {
        return Err(KittyError::WalletError(format!(
            "Label too long (max {} characters)",
            MAX_LABEL_LENGTH
        )));
    }
    if !label
        .chars()
        .all(|c| c.is_alphanumeric() || c.is_whitespace() || "-_.,()[]{}/".contains(c))
    {
        return Err(KittyError::WalletError(
            "Label contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_notes(notes: &str) -> Result<(), KittyError> {
    if notes.len() > MAX_NOTES_LENGTH {
        return Err(KittyError::WalletError(format!(
            "Notes too long (max {} characters)",
            MAX_NOTES_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn acct(n: u8) -> AccountId {
        AccountId([n; 32])
    }

    #[test]
    fn test_add_and_get_case_insensitive() {
        let book = AddressBook::new();
        book.add("  Alice  ", acct(1), Some("  Friend ".to_string()))
            .unwrap();

        let entry = book.get("ALICE").unwrap();
        assert_eq!(entry.label, "Alice");
        assert_eq!(entry.account, acct(1));
        assert_eq!(entry.notes.as_deref(), Some("Friend"));
    }

    #[test]
    fn test_blank_notes_dropped() {
        let book = AddressBook::new();
        book.add("Bob", acct(2), Some("   ".into())).unwrap();
        assert!(book.get("bob").unwrap().notes.is_none());
    }

    #[test]
    fn test_duplicates_rejected() {
        let book = AddressBook::new();
        book.add("Alice", acct(1), None).unwrap();
        assert!(book.add("alice", acct(2), None).is_err());
        assert!(book.add("Bob", acct(1), None).is_err());
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_invalid_labels_rejected() {
        let book = AddressBook::new();
        assert!(book.add("", acct(1), None).is_err());
        assert!(book.add(&"a".repeat(MAX_LABEL_LENGTH + 1), acct(1), None).is_err());
        assert!(book.add("semi;colon", acct(1), None).is_err());
    }

    #[test]
    fn test_remove() {
        let book = AddressBook::new();
        book.add("Alice", acct(1), None).unwrap();

        let removed = book.remove("ALICE").unwrap();
        assert_eq!(removed.label, "Alice");
        assert!(book.is_empty());
        assert!(book.remove("alice").is_err());

        // The account is free to be labelled again.
        book.add("Alicia", acct(1), None).unwrap();
    }

    #[test]
    fn test_search() {
        let book = AddressBook::new();
        book.add("Alice", acct(0xab), Some("Friend".to_string())).unwrap();
        book.add("Bob", acct(0x11), Some("Colleague".to_string())).unwrap();

        assert_eq!(book.search("friend")[0].label, "Alice");
        assert_eq!(book.search("abab")[0].label, "Alice");
        assert!(book.search("  ").is_empty());
    }

    #[test]
    fn test_changes_signal_ticks() {
        let book = AddressBook::new();
        let changes = book.changes();
        let before = changes.get().unwrap();
        book.add("Alice", acct(1), None).unwrap();
        assert!(changes.get().unwrap() > before);
    }

    #[test]
    fn test_save_and_load_with_backup() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("book.json");

        let book = AddressBook::new();
        book.add("Alice", acct(1), None).unwrap();
        book.save(&path).unwrap();
        book.add("Bob", acct(2), None).unwrap();
        book.save(&path).unwrap();

        assert!(temp_dir.path().join("book.json.backup").exists());

        let loaded = AddressBook::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("alice").unwrap().account, acct(1));
        assert!(loaded.add("Again", acct(2), None).is_err());
    }

    #[test]
    fn test_autosave_follows_changes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("book.json");

        let book = AddressBook::new();
        let autosave = book.autosave(path.clone());
        assert_eq!(Arc::strong_count(&book.inner), 1);

        book.add("Alice", acct(1), None).unwrap();
        assert_eq!(AddressBook::load(&path).unwrap().len(), 1);

        drop(autosave);
        book.add("Bob", acct(2), None).unwrap();
        assert_eq!(AddressBook::load(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_export_csv() {
        let temp_dir = TempDir::new().unwrap();
        let csv_path = temp_dir.path().join("export.csv");

        let book = AddressBook::new();
        book.add("Alice", acct(1), Some("Says \"hi\"".to_string())).unwrap();
        book.export_csv(&csv_path).unwrap();

        let csv = fs::read_to_string(&csv_path).unwrap();
        assert!(csv.starts_with("Label,Account"));
        assert!(csv.contains("\"Says \"\"hi\"\"\""));
        assert!(csv.contains(&acct(1).to_hex()));
    }

    #[test]
    fn test_thread_safety() {
        use std::thread;

        let book = AddressBook::new();
        let book_clone = book.clone();
        let handle = thread::spawn(move || {
            book_clone.add("Alice", acct(1), None).unwrap();
        });
        book.add("Bob", acct(2), None).unwrap();
        handle.join().unwrap();
        assert_eq!(book.len(), 2);
    }
}
