//! Chain storage as seen after a block
//!
//! [`RuntimeState`] mirrors the runtime's storage items (balances, nonces,
//! indices, sudo, raw storage, kitties). The devnet mutates it when executing
//! blocks; the client layer only ever reads an immutable [`ChainSnapshot`].

use super::types::{
    AccountIndex, Auction, Balance, BlockNumber, Event, Hash, Kitty, Metadata, RuntimeVersion,
    SenderRef,
};
use crate::crypto::AccountId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeState {
    pub balances: BTreeMap<AccountId, Balance>,
    pub reserved: BTreeMap<AccountId, Balance>,
    pub total_issuance: Balance,
    pub nonces: BTreeMap<AccountId, u64>,
    /// Index -> account, in order of account creation.
    pub indices: Vec<AccountId>,
    pub index_of: BTreeMap<AccountId, AccountIndex>,
    pub sudo_key: Option<AccountId>,
    pub upgrade_key: Option<AccountId>,
    pub storage: BTreeMap<Vec<u8>, Vec<u8>>,
    pub code_hash: Hash,
    pub kitties: KittyStorage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KittyStorage {
    pub kitties: BTreeMap<Hash, Kitty>,
    pub owners: BTreeMap<Hash, AccountId>,
    pub all: Vec<Hash>,
    pub all_index: BTreeMap<Hash, u64>,
    pub owned: BTreeMap<AccountId, Vec<Hash>>,
    pub owned_index: BTreeMap<Hash, u64>,
    pub auctions: BTreeMap<Hash, Auction>,
    pub expiring: BTreeMap<BlockNumber, Vec<Hash>>,
    pub nonce: u64,
}

impl RuntimeState {
    pub fn free_balance(&self, who: &AccountId) -> Balance {
        self.balances.get(who).copied().unwrap_or(0)
    }

    pub fn reserved_balance(&self, who: &AccountId) -> Balance {
        self.reserved.get(who).copied().unwrap_or(0)
    }

    pub fn account_nonce(&self, who: &AccountId) -> u64 {
        self.nonces.get(who).copied().unwrap_or(0)
    }

    pub fn index_of(&self, who: &AccountId) -> Option<AccountIndex> {
        self.index_of.get(who).copied()
    }

    pub fn lookup_index(&self, index: AccountIndex) -> Option<AccountId> {
        self.indices.get(index as usize).copied()
    }

    pub fn resolve(&self, sender: &SenderRef) -> Option<AccountId> {
        match sender {
            SenderRef::Account(account) => Some(*account),
            SenderRef::Index(index) => self.lookup_index(*index),
        }
    }

    /// The short form of `who` when it has an index, otherwise the account.
    pub fn try_index(&self, who: &AccountId) -> SenderRef {
        match self.index_of(who) {
            Some(index) => SenderRef::Index(index),
            None => SenderRef::Account(*who),
        }
    }
}

impl KittyStorage {
    pub fn kitty(&self, id: &Hash) -> Option<&Kitty> {
        self.kitties.get(id)
    }

    pub fn owner_of(&self, id: &Hash) -> Option<AccountId> {
        self.owners.get(id).copied()
    }

    pub fn all_kitties_count(&self) -> u64 {
        self.all.len() as u64
    }

    pub fn kitty_by_index(&self, index: u64) -> Option<Hash> {
        self.all.get(index as usize).copied()
    }

    pub fn owned_kitty_count(&self, owner: &AccountId) -> u64 {
        self.owned.get(owner).map_or(0, |v| v.len() as u64)
    }

    pub fn kitties_of(&self, owner: &AccountId) -> Vec<Hash> {
        self.owned.get(owner).cloned().unwrap_or_default()
    }

    pub fn auction(&self, id: &Hash) -> Option<&Auction> {
        self.auctions.get(id)
    }
}

/// Everything the client can see at the head of the chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainSnapshot {
    pub number: BlockNumber,
    pub finalized: BlockNumber,
    pub best_hash: Hash,
    pub genesis_hash: Hash,
    pub version: RuntimeVersion,
    pub metadata: Metadata,
    pub authorities: Vec<AccountId>,
    pub state: RuntimeState,
    /// Events emitted by the head block.
    pub events: Vec<Event>,
}

impl ChainSnapshot {
    pub fn lag(&self) -> BlockNumber {
        self.number.saturating_sub(self.finalized)
    }
}

pub type ChainView = Arc<ChainSnapshot>;
