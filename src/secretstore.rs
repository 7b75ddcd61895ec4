//! Named signing keys held by this front-end
//!
//! Each entry maps a human name to a seed phrase. The derived keypair is
//! cached in memory; the phrase is what gets persisted.

use crate::addressbook::{validate_label, write_atomic};
use crate::crypto::{AccountId, KeyPair};
use crate::error::KittyError;
use crate::reactive::{Cell, Signal};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Phrases the devnet endows at genesis.
pub const DEV_PHRASES: &[&str] = &["Alice", "Bob", "Charlie", "Dave", "Eve", "Ferdie"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretEntry {
    pub name: String,
    pub phrase: String,
    pub account: AccountId,
    /// RFC3339
    pub created_at: String,
}

#[derive(Default, Serialize, Deserialize)]
struct StoreInner {
    /// Keyed by lowercase name
    entries: BTreeMap<String, SecretEntry>,

    #[serde(skip)]
    keys: HashMap<AccountId, KeyPair>,
}

impl StoreInner {
    fn rebuild_keys(&mut self) -> Result<(), KittyError> {
        self.keys.clear();
        for entry in self.entries.values() {
            let keypair = KeyPair::from_phrase(&entry.phrase)?;
            if keypair.account() != entry.account {
                return Err(KittyError::WalletError(format!(
                    "Stored account for '{}' does not match its phrase",
                    entry.name
                )));
            }
            self.keys.insert(entry.account, keypair);
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct SecretStore {
    inner: Arc<RwLock<StoreInner>>,
    revision: Arc<Cell<u64>>,
    path: Option<PathBuf>,
}

impl SecretStore {
    /// An unsaved store.
    pub fn in_memory() -> Self {
        Self::from_inner(StoreInner::default(), None)
    }

    fn from_inner(inner: StoreInner, path: Option<PathBuf>) -> Self {
        SecretStore {
            inner: Arc::new(RwLock::new(inner)),
            revision: Arc::new(Cell::with(0)),
            path,
        }
    }

    /// Load from `path`, or start empty. Every change is written back.
    pub fn open(path: &Path) -> Result<Self, KittyError> {
        let mut inner = if path.exists() {
            let contents = fs::read_to_string(path)?;
            serde_json::from_str::<StoreInner>(&contents)
                .map_err(|e| KittyError::WalletError(format!("Failed to parse key store: {}", e)))?
        } else {
            StoreInner::default()
        };
        inner.rebuild_keys()?;
        info!("Opened key store at {} ({} keys)", path.display(), inner.entries.len());
        Ok(Self::from_inner(inner, Some(path.to_path_buf())))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Ticks on every change to the store.
    pub fn changes(&self) -> Signal<u64> {
        self.revision.signal()
    }

    fn changed(&self) -> Result<(), KittyError> {
        if let Some(path) = &self.path {
            let json = serde_json::to_string_pretty(&*self.inner.read())?;
            write_atomic(path, json.as_bytes())?;
        }
        let next = self.revision.get().unwrap_or(0) + 1;
        self.revision.set(next);
        Ok(())
    }

    /// Register `phrase` under `name`. Names are unique case-insensitively.
    pub fn submit(&self, phrase: &str, name: &str) -> Result<AccountId, KittyError> {
        let name = name.trim();
        validate_label(name)?;
        let phrase = phrase.trim();
        let keypair = KeyPair::from_phrase(phrase)?;
        let account = keypair.account();

        {
            let mut inner = self.inner.write();
            let key = name.to_lowercase();
            if inner.entries.contains_key(&key) {
                return Err(KittyError::WalletError(format!(
                    "A key named '{}' already exists",
                    name
                )));
            }
            if inner.keys.contains_key(&account) {
                return Err(KittyError::WalletError(
                    "This phrase is already in the key store".to_string(),
                ));
            }
            inner.entries.insert(
                key,
                SecretEntry {
                    name: name.to_string(),
                    phrase: phrase.to_string(),
                    account,
                    created_at: chrono::Utc::now().to_rfc3339(),
                },
            );
            inner.keys.insert(account, keypair);
        }

        info!("Stored key '{}' for {}", name, account.short());
        self.changed()?;
        Ok(account)
    }

    pub fn forget(&self, name: &str) -> Result<SecretEntry, KittyError> {
        let entry = {
            let mut inner = self.inner.write();
            let entry = inner
                .entries
                .remove(&name.trim().to_lowercase())
                .ok_or_else(|| KittyError::WalletError(format!("No key named '{}'", name)))?;
            inner.keys.remove(&entry.account);
            entry
        };
        info!("Forgot key '{}'", entry.name);
        self.changed()?;
        Ok(entry)
    }

    pub fn by_name(&self, name: &str) -> Option<SecretEntry> {
        self.inner
            .read()
            .entries
            .get(&name.trim().to_lowercase())
            .cloned()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.inner
            .read()
            .entries
            .contains_key(&name.trim().to_lowercase())
    }

    pub fn name_of(&self, account: &AccountId) -> Option<String> {
        self.inner
            .read()
            .entries
            .values()
            .find(|e| e.account == *account)
            .map(|e| e.name.clone())
    }

    /// The signing key for `account`, if this store holds it.
    pub fn keypair_for(&self, account: &AccountId) -> Option<KeyPair> {
        self.inner.read().keys.get(account).cloned()
    }

    pub fn can_sign(&self, account: &AccountId) -> bool {
        self.inner.read().keys.contains_key(account)
    }

    /// Entries sorted by name
    pub fn list(&self) -> Vec<SecretEntry> {
        let mut entries: Vec<_> = self.inner.read().entries.values().cloned().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add the well-known development keys that are not already present.
    pub fn import_dev_keys(&self) -> Result<usize, KittyError> {
        let mut added = 0;
        for phrase in DEV_PHRASES {
            let account = KeyPair::from_phrase(phrase)?.account();
            if self.contains_name(phrase) || self.can_sign(&account) {
                continue;
            }
            self.submit(phrase, phrase)?;
            added += 1;
        }
        Ok(added)
    }
}

impl Default for SecretStore {
    fn default() -> Self {
        Self::in_memory()
    }
}
