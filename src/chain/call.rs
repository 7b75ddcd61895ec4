//! Runtime calls and their encoding
//!
//! Calls are built through the [`calls`] namespace, one function per domain
//! action, and encoded with bincode. The encoding is deterministic, so the
//! same arguments always produce the same bytes.

use super::types::{Balance, BlockNumber, Hash, SenderRef};
use crate::crypto::AccountId;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Call {
    Balances(BalancesCall),
    Kitties(KittiesCall),
    Sudo(SudoCall),
    Consensus(ConsensusCall),
    UpgradeKey(UpgradeKeyCall),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalancesCall {
    Transfer { dest: SenderRef, value: Balance },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KittiesCall {
    CreateKitty,
    SetPrice {
        kitty_id: Hash,
        new_price: Balance,
    },
    Transfer {
        to: AccountId,
        kitty_id: Hash,
    },
    BuyKitty {
        kitty_id: Hash,
        max_price: Balance,
    },
    CreateAuction {
        kitty_id: Hash,
        min_bid: Balance,
        expiry: BlockNumber,
    },
    PredefinedCreateAuction {
        kitty_id: Hash,
        min_bid: Balance,
    },
    BidAuction {
        kitty_id: Hash,
        bid: Balance,
    },
    BreedKitty {
        kitty_id_1: Hash,
        kitty_id_2: Hash,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SudoCall {
    Sudo(Box<Call>),
    SetKey(AccountId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusCall {
    SetCode(Vec<u8>),
    SetStorage(Vec<(Vec<u8>, Vec<u8>)>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpgradeKeyCall {
    Upgrade(Vec<u8>),
}

impl Call {
    pub fn encode(&self) -> Result<EncodedCall> {
        Ok(EncodedCall(bincode::serialize(self)?))
    }

    /// `module::function`, for logs and status lines.
    pub fn name(&self) -> &'static str {
        match self {
            Call::Balances(BalancesCall::Transfer { .. }) => "balances::transfer",
            Call::Kitties(call) => match call {
                KittiesCall::CreateKitty => "substratekitties::create_kitty",
                KittiesCall::SetPrice { .. } => "substratekitties::set_price",
                KittiesCall::Transfer { .. } => "substratekitties::transfer",
                KittiesCall::BuyKitty { .. } => "substratekitties::buy_kitty",
                KittiesCall::CreateAuction { .. } => "substratekitties::create_auction",
                KittiesCall::PredefinedCreateAuction { .. } => {
                    "substratekitties::predefined_create_auction"
                }
                KittiesCall::BidAuction { .. } => "substratekitties::bid_auction",
                KittiesCall::BreedKitty { .. } => "substratekitties::breed_kitty",
            },
            Call::Sudo(SudoCall::Sudo(_)) => "sudo::sudo",
            Call::Sudo(SudoCall::SetKey(_)) => "sudo::set_key",
            Call::Consensus(ConsensusCall::SetCode(_)) => "consensus::set_code",
            Call::Consensus(ConsensusCall::SetStorage(_)) => "consensus::set_storage",
            Call::UpgradeKey(UpgradeKeyCall::Upgrade(_)) => "upgrade_key::upgrade",
        }
    }
}

/// Opaque encoded call bytes as carried by a transaction.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedCall(pub Vec<u8>);

impl EncodedCall {
    pub fn decode(&self) -> Result<Call> {
        Ok(bincode::deserialize(&self.0)?)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for EncodedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncodedCall({} bytes)", self.0.len())
    }
}

/// Call constructors, grouped by runtime module.
pub mod calls {
    pub mod balances {
        use crate::chain::call::{BalancesCall, Call};
        use crate::chain::types::{Balance, SenderRef};

        pub fn transfer(dest: SenderRef, value: Balance) -> Call {
            Call::Balances(BalancesCall::Transfer { dest, value })
        }
    }

    pub mod kitties {
        use crate::chain::call::{Call, KittiesCall};
        use crate::chain::types::{Balance, BlockNumber, Hash};
        use crate::crypto::AccountId;

        pub fn create_kitty() -> Call {
            Call::Kitties(KittiesCall::CreateKitty)
        }

        pub fn set_price(kitty_id: Hash, new_price: Balance) -> Call {
            Call::Kitties(KittiesCall::SetPrice {
                kitty_id,
                new_price,
            })
        }

        pub fn transfer(to: AccountId, kitty_id: Hash) -> Call {
            Call::Kitties(KittiesCall::Transfer { to, kitty_id })
        }

        pub fn buy_kitty(kitty_id: Hash, max_price: Balance) -> Call {
            Call::Kitties(KittiesCall::BuyKitty {
                kitty_id,
                max_price,
            })
        }

        pub fn create_auction(kitty_id: Hash, min_bid: Balance, expiry: BlockNumber) -> Call {
            Call::Kitties(KittiesCall::CreateAuction {
                kitty_id,
                min_bid,
                expiry,
            })
        }

        pub fn predefined_create_auction(kitty_id: Hash, min_bid: Balance) -> Call {
            Call::Kitties(KittiesCall::PredefinedCreateAuction { kitty_id, min_bid })
        }

        pub fn bid_auction(kitty_id: Hash, bid: Balance) -> Call {
            Call::Kitties(KittiesCall::BidAuction { kitty_id, bid })
        }

        pub fn breed_kitty(kitty_id_1: Hash, kitty_id_2: Hash) -> Call {
            Call::Kitties(KittiesCall::BreedKitty {
                kitty_id_1,
                kitty_id_2,
            })
        }
    }

    pub mod sudo {
        use crate::chain::call::{Call, SudoCall};
        use crate::crypto::AccountId;

        pub fn sudo(inner: Call) -> Call {
            Call::Sudo(SudoCall::Sudo(Box::new(inner)))
        }

        pub fn set_key(new: AccountId) -> Call {
            Call::Sudo(SudoCall::SetKey(new))
        }
    }

    pub mod consensus {
        use crate::chain::call::{Call, ConsensusCall};

        pub fn set_code(code: Vec<u8>) -> Call {
            Call::Consensus(ConsensusCall::SetCode(code))
        }

        pub fn set_storage(items: Vec<(Vec<u8>, Vec<u8>)>) -> Call {
            Call::Consensus(ConsensusCall::SetStorage(items))
        }
    }

    pub mod upgrade_key {
        use crate::chain::call::{Call, UpgradeKeyCall};

        pub fn upgrade(code: Vec<u8>) -> Call {
            Call::UpgradeKey(UpgradeKeyCall::Upgrade(code))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_is_deterministic_and_decodes() {
        let kitty = Hash::of(b"tom");
        let call = calls::kitties::set_price(kitty, 500);
        let first = call.encode().unwrap();
        let second = calls::kitties::set_price(kitty, 500).encode().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.decode().unwrap(), call);
    }

    #[test]
    fn test_nested_sudo_call_roundtrip() {
        let call = calls::sudo::sudo(calls::consensus::set_code(vec![0, 97, 115, 109]));
        assert_eq!(call.name(), "sudo::sudo");
        assert_eq!(call.encode().unwrap().decode().unwrap(), call);
    }

    #[test]
    fn test_garbage_does_not_decode() {
        assert!(EncodedCall(vec![0xff; 3]).decode().is_err());
    }
}
