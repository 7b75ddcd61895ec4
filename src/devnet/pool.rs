//! Transaction pool: checks incoming extrinsics and queues them by nonce

use crate::chain::call::EncodedCall;
use crate::chain::state::RuntimeState;
use crate::chain::types::{BlockNumber, Hash};
use crate::crypto::AccountId;
use crate::error::{KittyError, Result};
use crate::reactive::Cell;
use crate::tx::{Era, SignedExtrinsic, TxStatus};
use std::sync::Arc;

pub(super) struct PoolEntry {
    pub hash: Hash,
    pub bytes: Vec<u8>,
    pub account: AccountId,
    pub nonce: u64,
    pub era: Era,
    pub call: EncodedCall,
    /// Owned by the pool until the transaction leaves it.
    pub status: Arc<Cell<TxStatus>>,
}

#[derive(Default)]
pub(super) struct Pool {
    entries: Vec<PoolEntry>,
}

impl Pool {
    /// Check `bytes` against the head state and build a pool entry.
    pub(super) fn check(
        &self,
        bytes: Vec<u8>,
        state: &RuntimeState,
        genesis_hash: &Hash,
        next_block: BlockNumber,
        status: Arc<Cell<TxStatus>>,
    ) -> std::result::Result<PoolEntry, (KittyError, Arc<Cell<TxStatus>>)> {
        match self.validate(&bytes, state, genesis_hash, next_block) {
            Ok((xt, account)) => Ok(PoolEntry {
                hash: Hash::of(&bytes),
                bytes,
                account,
                nonce: xt.nonce,
                era: xt.era,
                call: xt.call,
                status,
            }),
            Err(e) => Err((e, status)),
        }
    }

    fn validate(
        &self,
        bytes: &[u8],
        state: &RuntimeState,
        genesis_hash: &Hash,
        next_block: BlockNumber,
    ) -> Result<(SignedExtrinsic, AccountId)> {
        let xt = SignedExtrinsic::decode(bytes)?;
        let account = state
            .resolve(&xt.signer)
            .ok_or_else(|| KittyError::InvalidTransaction("Unknown sender index".to_string()))?;
        xt.verify(&account, genesis_hash)?;

        if !xt.era.is_valid_at(next_block) {
            return Err(KittyError::InvalidTransaction(
                "Transaction is outdated".to_string(),
            ));
        }
        if xt.nonce < state.account_nonce(&account) {
            return Err(KittyError::InvalidTransaction("Stale nonce".to_string()));
        }

        let hash = Hash::of(bytes);
        if self.entries.iter().any(|e| e.hash == hash) {
            return Err(KittyError::InvalidTransaction(
                "Transaction is already in the pool".to_string(),
            ));
        }
        if self
            .entries
            .iter()
            .any(|e| e.account == account && e.nonce == xt.nonce)
        {
            return Err(KittyError::InvalidTransaction(
                "A transaction with this nonce is already pending".to_string(),
            ));
        }

        xt.call
            .decode()
            .map_err(|_| KittyError::InvalidTransaction("Unknown call".to_string()))?;
        Ok((xt, account))
    }

    pub(super) fn insert(&mut self, entry: PoolEntry) {
        self.entries.push(entry);
    }

    /// Remove the next transaction whose nonce matches its sender's on-chain nonce.
    pub(super) fn take_next(&mut self, state: &RuntimeState) -> Option<PoolEntry> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.nonce == state.account_nonce(&e.account))?;
        Some(self.entries.remove(pos))
    }

    /// Remove entries that can never be included after `number`.
    pub(super) fn prune(&mut self, state: &RuntimeState, number: BlockNumber) -> Vec<(PoolEntry, &'static str)> {
        let mut dropped = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if entry.nonce < state.account_nonce(&entry.account) {
                dropped.push((entry, "Stale nonce"));
            } else if !entry.era.is_valid_at(number + 1) {
                dropped.push((entry, "Transaction is outdated"));
            } else {
                kept.push(entry);
            }
        }
        self.entries = kept;
        dropped
    }

    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(super) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
