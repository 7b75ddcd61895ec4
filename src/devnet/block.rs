use crate::chain::types::{BlockNumber, Hash};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub number: BlockNumber,
    pub parent_hash: Hash,
    /// Milliseconds since the epoch.
    pub timestamp: u64,
    pub extrinsics_root: Hash,
    pub state_root: Hash,
}

impl BlockHeader {
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.number.to_le_bytes());
        hasher.update(self.parent_hash.0);
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(self.extrinsics_root.0);
        hasher.update(self.state_root.0);
        Hash(hasher.finalize().into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    /// Encoded signed extrinsics, in execution order.
    pub extrinsics: Vec<Vec<u8>>,
}

impl Block {
    pub fn new(
        number: BlockNumber,
        parent_hash: Hash,
        timestamp: u64,
        extrinsics: Vec<Vec<u8>>,
        state_root: Hash,
    ) -> Self {
        let extrinsics_root = Block::extrinsics_root(&extrinsics);
        Block {
            header: BlockHeader {
                number,
                parent_hash,
                timestamp,
                extrinsics_root,
                state_root,
            },
            extrinsics,
        }
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn number(&self) -> BlockNumber {
        self.header.number
    }

    pub fn extrinsics_root(extrinsics: &[Vec<u8>]) -> Hash {
        let mut hasher = Sha256::new();
        for xt in extrinsics {
            hasher.update(Sha256::digest(xt));
        }
        Hash(hasher.finalize().into())
    }
}
