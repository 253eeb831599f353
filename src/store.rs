//! Abstract transactional ledger store.
//!
//! The engine is specified against a key-value store with atomic
//! read-modify-write commits, not any particular database. `MemoryStore` is
//! the in-process implementation backing the service and the tests; it uses
//! optimistic versioning so two attacks racing on one target serialize.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use crate::engine::types::Vault;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// An expected version was stale; nothing was applied.
    Conflict { owner: String },
    NotFound { owner: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Conflict { owner } => write!(f, "stale version for vault {owner}"),
            StoreError::NotFound { owner } => write!(f, "no vault for {owner}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// A record plus the version it was read at.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub version: u64,
    pub record: T,
}

/// One write in a commit: owner, the version the record was loaded at, and
/// the new record.
pub type VersionedWrite = (String, u64, Vault);

/// Durable per-player vault state. `commit` applies all writes atomically or
/// none; a stale expected version fails the whole commit with `Conflict`.
pub trait LedgerStore: Send + Sync {
    fn load(&self, owner: &str) -> Option<Versioned<Vault>>;
    fn commit(&self, writes: Vec<VersionedWrite>) -> Result<(), StoreError>;
    /// Create a vault if absent. Returns false when the owner already exists.
    fn insert(&self, vault: Vault) -> bool;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, (u64, Vault)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (u64, Vault)>> {
        match self.records.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        }
    }

    /// Test/diagnostic hook: bump a record's version without changing it,
    /// as a concurrent writer would.
    pub fn touch(&self, owner: &str) {
        let mut records = self.lock();
        if let Some((version, _)) = records.get_mut(owner) {
            *version += 1;
        }
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self, owner: &str) -> Option<Versioned<Vault>> {
        let records = self.lock();
        records.get(owner).map(|(version, vault)| Versioned {
            version: *version,
            record: vault.clone(),
        })
    }

    fn commit(&self, writes: Vec<VersionedWrite>) -> Result<(), StoreError> {
        let mut records = self.lock();
        // Validate every expected version before touching anything.
        for (owner, expected, _) in &writes {
            match records.get(owner) {
                None => {
                    return Err(StoreError::NotFound {
                        owner: owner.clone(),
                    })
                }
                Some((version, _)) if version != expected => {
                    return Err(StoreError::Conflict {
                        owner: owner.clone(),
                    })
                }
                Some(_) => {}
            }
        }
        for (owner, expected, vault) in writes {
            records.insert(owner, (expected + 1, vault));
        }
        Ok(())
    }

    fn insert(&self, vault: Vault) -> bool {
        let mut records = self.lock();
        if records.contains_key(&vault.owner_id) {
            return false;
        }
        records.insert(vault.owner_id.clone(), (0, vault));
        true
    }
}
