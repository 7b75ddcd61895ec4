//! Primitive chain types shared by the client layer and the devnet

use crate::crypto::{decode_hex, AccountId};
use crate::error::KittyError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

pub type Balance = u128;
pub type BlockNumber = u64;
pub type AccountIndex = u32;

/// A 32-byte hash. Kitty ids and DNA are hashes too.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    pub fn of(data: &[u8]) -> Self {
        Hash(Sha256::digest(data).into())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn short(&self) -> String {
        let full = self.to_hex();
        format!("0x{}…{}", &full[..6], &full[full.len() - 4..])
    }

    pub fn from_hex(s: &str) -> Result<Self, KittyError> {
        let bytes = decode_hex(s)?;
        let array: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            KittyError::InvalidInput(format!("Hash must be 32 bytes, got {}", b.len()))
        })?;
        Ok(Hash(array))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.short())
    }
}

impl FromStr for Hash {
    type Err = KittyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hash::from_hex(s)
    }
}

/// Who sends a transaction: a full account or its short-form index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SenderRef {
    Account(AccountId),
    Index(AccountIndex),
}

impl fmt::Display for SenderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SenderRef::Account(account) => write!(f, "{}", account.short()),
            SenderRef::Index(index) => write!(f, "index {}", index),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kitty {
    pub id: Hash,
    pub dna: Hash,
    pub price: Balance,
    pub gen: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    pub kitty_id: Hash,
    pub kitty_owner: AccountId,
    pub expiry: BlockNumber,
    pub min_bid: Balance,
    pub high_bid: Balance,
    /// Starts out as the owner; a settled auction only transfers when someone else bid.
    pub high_bidder: AccountId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeVersion {
    pub spec_name: String,
    pub spec_version: u32,
    pub impl_name: String,
    pub impl_version: u32,
}

impl Default for RuntimeVersion {
    fn default() -> Self {
        RuntimeVersion {
            spec_name: "substratekitties".to_string(),
            spec_version: 1,
            impl_name: "kittyboard-devnet".to_string(),
            impl_version: 1,
        }
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} v{} ({} v{})",
            self.spec_name, self.spec_version, self.impl_name, self.impl_version
        )
    }
}

/// Names of the runtime modules the chain exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub modules: Vec<String>,
}

impl Metadata {
    pub fn has_module(&self, name: &str) -> bool {
        self.modules.iter().any(|m| m == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Transfer(AccountId, AccountId, Balance),
    NewAccountIndex(AccountId, AccountIndex),
    Created(AccountId, Hash),
    PriceSet(AccountId, Hash, Balance),
    Transferred(AccountId, AccountId, Hash),
    Bought(AccountId, AccountId, Hash, Balance),
    AuctionCreated(Hash, Balance, BlockNumber),
    Bid(Hash, AccountId, Balance),
    AuctionSettled(Hash, AccountId, Balance),
    AuctionExpired(Hash),
    CodeUpdated(Hash),
    StorageSet(usize),
    KeyChanged(AccountId),
    ExtrinsicFailed(Hash, String),
}

/// Status of the connection to the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatus {
    pub connected: bool,
    pub name: String,
    pub version: String,
    pub chain: String,
}

/// Format a balance with thousands separators.
pub fn format_balance(value: Balance) -> String {
    let digits = value.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_balance() {
        assert_eq!(format_balance(0), "0");
        assert_eq!(format_balance(999), "999");
        assert_eq!(format_balance(1000), "1,000");
        assert_eq!(format_balance(1_234_567), "1,234,567");
    }

    #[test]
    fn test_hash_parsing() {
        let hash = Hash::of(b"kitty");
        assert_eq!(Hash::from_hex(&hash.to_string()).unwrap(), hash);
        assert_eq!(Hash::from_hex(&hash.to_hex()).unwrap(), hash);
        assert!(Hash::from_hex("0x1234").is_err());
        assert!(Hash::from_hex("kitty").is_err());
    }
}
