//! Keys, accounts and signatures
//!
//! Accounts are the SHA-256 hash of a compressed secp256k1 public key. Keys are
//! derived from a phrase: a valid BIP-39 mnemonic goes through the standard
//! seed derivation, anything else (e.g. the dev phrases `Alice`, `Bob`) is
//! hashed directly.

use crate::error::KittyError;
use bip39::Mnemonic;
use once_cell::sync::Lazy;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// A thread-safe, lazily initialized Secp256k1 context.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Entropy for a 12 word mnemonic.
const MNEMONIC_ENTROPY_BYTES: usize = 16;

/// A 32-byte account identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// `0x1234…cdef` form for narrow displays.
    pub fn short(&self) -> String {
        let full = self.to_hex();
        format!("0x{}…{}", &full[..4], &full[full.len() - 4..])
    }

    pub fn from_hex(s: &str) -> Result<Self, KittyError> {
        let bytes = decode_hex(s)?;
        let array: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            KittyError::CryptoError(format!("Account must be 32 bytes, got {}", b.len()))
        })?;
        Ok(AccountId(array))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.short())
    }
}

impl FromStr for AccountId {
    type Err = KittyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccountId::from_hex(s)
    }
}

/// Decode hex with an optional `0x` prefix.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, KittyError> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(digits).map_err(|e| KittyError::CryptoError(format!("Invalid hex: {}", e)))
}

/// Generate a fresh 12 word BIP-39 mnemonic.
pub fn generate_mnemonic() -> Result<String, KittyError> {
    let entropy: [u8; MNEMONIC_ENTROPY_BYTES] = rand::random();
    let mnemonic = Mnemonic::from_entropy(&entropy)
        .map_err(|e| KittyError::CryptoError(format!("Failed to build mnemonic: {}", e)))?;
    Ok(mnemonic.to_string())
}

/// True when `phrase` is a checksummed BIP-39 mnemonic.
pub fn is_mnemonic(phrase: &str) -> bool {
    Mnemonic::parse_normalized(phrase.trim()).is_ok()
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Creates a KeyPair from an existing SecretKey.
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// Derive the key for a seed phrase.
    pub fn from_phrase(phrase: &str) -> Result<Self, KittyError> {
        let phrase = phrase.trim();
        if phrase.is_empty() {
            return Err(KittyError::CryptoError("Seed phrase is empty".to_string()));
        }

        let secret: [u8; 32] = match Mnemonic::parse_normalized(phrase) {
            Ok(mnemonic) => Sha256::digest(mnemonic.to_seed("")).into(),
            Err(_) => Sha256::digest(phrase.as_bytes()).into(),
        };

        let secret_key = SecretKey::from_slice(&secret)
            .map_err(|e| KittyError::CryptoError(format!("Derived key is invalid: {}", e)))?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// The account controlled by this key.
    pub fn account(&self) -> AccountId {
        account_from_public(&self.public_key_bytes())
    }

    /// Returns the KeyPair's public key as a compressed byte array.
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public_key.serialize()
    }

    /// Signs a message (which is first hashed using SHA-256) and returns the compact signature bytes.
    pub fn sign(&self, message: &[u8]) -> Result<[u8; COMPACT_SIGNATURE_SIZE], KittyError> {
        let digest = Sha256::digest(message);
        let message = Message::from_digest_slice(&digest)
            .map_err(|e| KittyError::CryptoError(format!("Failed to create message: {}", e)))?;
        let signature = SECP256K1_CONTEXT.sign_ecdsa(&message, &self.secret_key);
        Ok(signature.serialize_compact())
    }
}

/// Account for a compressed public key.
pub fn account_from_public(public_key: &[u8]) -> AccountId {
    AccountId(Sha256::digest(public_key).into())
}

/// Verifies an ECDSA signature given the raw public key bytes, message, and signature bytes.
pub fn verify_signature(
    public_key_bytes: &[u8],
    message: &[u8],
    signature_bytes: &[u8],
) -> Result<(), KittyError> {
    if public_key_bytes.len() != PUBLIC_KEY_SIZE {
        return Err(KittyError::CryptoError(format!(
            "Public key must be exactly {} bytes (compressed), got {}",
            PUBLIC_KEY_SIZE,
            public_key_bytes.len()
        )));
    }
    if signature_bytes.len() != COMPACT_SIGNATURE_SIZE {
        return Err(KittyError::CryptoError(format!(
            "Signature must be exactly {} bytes (compact), got {}",
            COMPACT_SIGNATURE_SIZE,
            signature_bytes.len()
        )));
    }

    let public_key = PublicKey::from_slice(public_key_bytes)
        .map_err(|e| KittyError::CryptoError(format!("Invalid public key: {}", e)))?;

    let digest = Sha256::digest(message);
    let message = Message::from_digest_slice(&digest)
        .map_err(|e| KittyError::CryptoError(format!("Failed to create message: {}", e)))?;

    let signature = Signature::from_compact(signature_bytes)
        .map_err(|e| KittyError::CryptoError(format!("Invalid signature: {}", e)))?;

    SECP256K1_CONTEXT
        .verify_ecdsa(&message, &signature, &public_key)
        .map_err(|_| KittyError::CryptoError("Signature verification failed".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_phrase_is_deterministic() {
        let a = KeyPair::from_phrase("Alice").unwrap();
        let b = KeyPair::from_phrase("  Alice ").unwrap();
        assert_eq!(a.account(), b.account());
        assert_ne!(a.account(), KeyPair::from_phrase("Bob").unwrap().account());
    }

    #[test]
    fn test_generated_mnemonic_derives_a_key() {
        let phrase = generate_mnemonic().unwrap();
        assert_eq!(phrase.split_whitespace().count(), 12);
        assert!(is_mnemonic(&phrase));

        let first = KeyPair::from_phrase(&phrase).unwrap();
        let again = KeyPair::from_phrase(&phrase).unwrap();
        assert_eq!(first.account(), again.account());
    }

    #[test]
    fn test_empty_phrase_rejected() {
        assert!(KeyPair::from_phrase("   ").is_err());
    }

    #[test]
    fn test_account_hex_roundtrip_accepts_prefix() {
        let account = KeyPair::from_phrase("Charlie").unwrap().account();
        let parsed: AccountId = account.to_string().parse().unwrap();
        assert_eq!(parsed, account);
        assert_eq!(AccountId::from_hex(&account.to_hex()).unwrap(), account);
        assert!(AccountId::from_hex("0xdead").is_err());
    }

    #[test]
    fn test_signing_and_verification() {
        let keypair = KeyPair::from_phrase("Dave").unwrap();
        let message = b"create a kitty";

        let signature = keypair.sign(message).unwrap();
        let pubkey_bytes = keypair.public_key_bytes();

        assert!(verify_signature(&pubkey_bytes, message, &signature).is_ok());
        assert_eq!(account_from_public(&pubkey_bytes), keypair.account());
    }

    #[test]
    fn test_invalid_signature() {
        let keypair1 = KeyPair::from_phrase("Eve").unwrap();
        let keypair2 = KeyPair::from_phrase("Ferdie").unwrap();

        let message = b"Test message";
        let signature = keypair1.sign(message).unwrap();

        let result = verify_signature(&keypair2.public_key_bytes(), message, &signature);
        assert_eq!(
            result.unwrap_err().to_string(),
            "Cryptographic error: Signature verification failed"
        );
    }

    #[test]
    fn test_invalid_key_or_sig_length_check() {
        let keypair = KeyPair::from_phrase("Alice").unwrap();
        let message = b"Test";
        let signature = keypair.sign(message).unwrap();
        let pubkey_bytes = keypair.public_key_bytes();

        let result = verify_signature(&pubkey_bytes[1..], message, &signature);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Public key must be exactly"));

        let result = verify_signature(&pubkey_bytes, message, &signature[1..]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Signature must be exactly"));
    }
}
