//! Transaction descriptors and the signed extrinsic wire format

use crate::chain::call::{Call, EncodedCall};
use crate::chain::types::{BlockNumber, Hash, SenderRef};
use crate::crypto::{account_from_public, verify_signature, AccountId, KeyPair};
use crate::error::{KittyError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a panel hands to the pipeline: who sends which call, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDescriptor {
    pub sender: SenderRef,
    pub call: EncodedCall,
    /// Address the signer by its short-form index when it has one.
    pub compact: bool,
    /// Make the transaction mortal.
    pub longevity: bool,
}

impl TransactionDescriptor {
    pub fn new(sender: SenderRef, call: &Call, compact: bool, longevity: bool) -> Result<Self> {
        Ok(TransactionDescriptor {
            sender,
            call: call.encode()?,
            compact,
            longevity,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Descriptor(TransactionDescriptor),
    /// Already signed and encoded elsewhere.
    Presigned(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Era {
    Immortal,
    /// Valid from `birth` for `period` blocks.
    Mortal { birth: BlockNumber, period: u64 },
}

impl Era {
    pub fn is_valid_at(&self, number: BlockNumber) -> bool {
        match *self {
            Era::Immortal => true,
            Era::Mortal { birth, period } => {
                number >= birth && number < birth.saturating_add(period)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedExtrinsic {
    pub signer: SenderRef,
    pub public_key: Vec<u8>,
    pub signature: Vec<u8>,
    pub nonce: u64,
    pub era: Era,
    pub call: EncodedCall,
}

impl SignedExtrinsic {
    /// Bytes covered by the signature. Binds the transaction to one chain.
    pub fn signing_payload(
        call: &EncodedCall,
        nonce: u64,
        era: &Era,
        genesis_hash: &Hash,
    ) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&(call, nonce, era, genesis_hash))?)
    }

    pub fn sign(
        keypair: &KeyPair,
        signer: SenderRef,
        nonce: u64,
        era: Era,
        call: EncodedCall,
        genesis_hash: &Hash,
    ) -> Result<Self> {
        let payload = Self::signing_payload(&call, nonce, &era, genesis_hash)?;
        let signature = keypair.sign(&payload)?;
        Ok(SignedExtrinsic {
            signer,
            public_key: keypair.public_key_bytes().to_vec(),
            signature: signature.to_vec(),
            nonce,
            era,
            call,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| {
            KittyError::InvalidTransaction(format!("Malformed transaction bytes: {}", e))
        })
    }

    /// Check that `account` owns the key and signed this exact payload.
    pub fn verify(&self, account: &AccountId, genesis_hash: &Hash) -> Result<()> {
        if account_from_public(&self.public_key) != *account {
            return Err(KittyError::InvalidTransaction(
                "Public key does not belong to the sender".to_string(),
            ));
        }
        let payload = Self::signing_payload(&self.call, self.nonce, &self.era, genesis_hash)?;
        verify_signature(&self.public_key, &payload, &self.signature)
            .map_err(|_| KittyError::InvalidTransaction("Bad signature".to_string()))
    }
}

/// Where a submitted transaction is in its life.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    Sending,
    /// Accepted into the pool.
    Ready(Hash),
    Finalized {
        block: BlockNumber,
        hash: Hash,
        /// The dispatch error, if the call failed on chain.
        outcome: std::result::Result<(), String>,
    },
    Failed(String),
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TxStatus::Finalized { .. } | TxStatus::Failed(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TxStatus::Finalized { outcome: Ok(()), .. })
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxStatus::Sending => write!(f, "sending"),
            TxStatus::Ready(hash) => write!(f, "ready {}", hash.short()),
            TxStatus::Finalized {
                block,
                outcome: Ok(()),
                ..
            } => write!(f, "finalized in #{}", block),
            TxStatus::Finalized {
                block,
                outcome: Err(reason),
                ..
            } => write!(f, "failed in #{}: {}", block, reason),
            TxStatus::Failed(reason) => write!(f, "rejected: {}", reason),
        }
    }
}
