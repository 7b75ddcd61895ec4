//! Signing pipeline: turns descriptors into signed extrinsics and broadcasts them

use super::extrinsic::{Era, SignedExtrinsic, Submission, TransactionDescriptor, TxStatus};
use super::Submitter;
use crate::chain::Chain;
use crate::crypto::AccountId;
use crate::error::{KittyError, Result};
use crate::reactive::Signal;
use crate::secretstore::SecretStore;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{info, warn};

/// Something that accepts encoded extrinsics, typically a node.
pub trait Broadcast: Send + Sync {
    fn broadcast(&self, bytes: Vec<u8>) -> Signal<TxStatus>;
}

pub struct Pipeline<B> {
    chain: Chain,
    secrets: SecretStore,
    target: B,
    mortal_period: u64,
    /// Next nonce per account, ahead of the chain while transactions are pending.
    nonces: Mutex<HashMap<AccountId, u64>>,
}

impl<B: Broadcast> Pipeline<B> {
    pub fn new(chain: Chain, secrets: SecretStore, target: B, mortal_period: u64) -> Self {
        Pipeline {
            chain,
            secrets,
            target,
            mortal_period,
            nonces: Mutex::new(HashMap::new()),
        }
    }

    pub fn target(&self) -> &B {
        &self.target
    }

    fn sign(&self, descriptor: TransactionDescriptor) -> Result<(AccountId, u64, Vec<u8>)> {
        let view = self
            .chain
            .view()
            .get()
            .ok_or_else(|| KittyError::PreconditionNotMet("chain is not ready".to_string()))?;

        let account = view
            .state
            .resolve(&descriptor.sender)
            .ok_or(KittyError::SenderNotReady)?;
        let keypair = self
            .secrets
            .keypair_for(&account)
            .ok_or(KittyError::SenderNotReady)?;

        let signer = if descriptor.compact {
            view.state.try_index(&account)
        } else {
            descriptor.sender
        };

        let on_chain = view.state.account_nonce(&account);
        let nonce = self
            .nonces
            .lock()
            .get(&account)
            .copied()
            .map_or(on_chain, |pending| pending.max(on_chain));

        let era = if descriptor.longevity {
            Era::Mortal {
                birth: view.number,
                period: self.mortal_period,
            }
        } else {
            Era::Immortal
        };

        let xt = SignedExtrinsic::sign(
            &keypair,
            signer,
            nonce,
            era,
            descriptor.call,
            &view.genesis_hash,
        )?;
        Ok((account, nonce, xt.encode()?))
    }
}

impl<B: Broadcast> Submitter for Pipeline<B> {
    fn submit(&self, submission: Submission) -> Result<Signal<TxStatus>> {
        match submission {
            Submission::Presigned(bytes) => {
                info!("Publishing {} bytes of custom transaction data", bytes.len());
                Ok(self.target.broadcast(bytes))
            }
            Submission::Descriptor(descriptor) => {
                let (account, nonce, bytes) = self.sign(descriptor)?;
                let status = self.target.broadcast(bytes);
                match status.get() {
                    Some(TxStatus::Failed(reason)) => {
                        warn!("Transaction from {} rejected: {}", account.short(), reason);
                    }
                    _ => {
                        info!("Submitted transaction from {} with nonce {}", account.short(), nonce);
                        self.nonces.lock().insert(account, nonce + 1);
                    }
                }
                Ok(status)
            }
        }
    }
}
