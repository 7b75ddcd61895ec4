//! Error types for kittyboard

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KittyError {
    UnknownField(String),
    InvalidInput(String),
    SenderNotReady,
    PreconditionNotMet(String),
    CryptoError(String),
    WalletError(String),
    InvalidTransaction(String),
    Dispatch(&'static str),
    DatabaseError(String),
    ConfigError(String),
    IoError(String),
    BincodeError(String),
    JsonError(String),
}

impl fmt::Display for KittyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KittyError::UnknownField(key) => write!(f, "Unknown field: {}", key),
            KittyError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            KittyError::SenderNotReady => {
                write!(f, "Sender is not a signing-capable account in this wallet")
            }
            KittyError::PreconditionNotMet(msg) => write!(f, "Precondition not met: {}", msg),
            KittyError::CryptoError(msg) => write!(f, "Cryptographic error: {}", msg),
            KittyError::WalletError(msg) => write!(f, "Wallet error: {}", msg),
            KittyError::InvalidTransaction(msg) => write!(f, "Invalid transaction: {}", msg),
            KittyError::Dispatch(msg) => write!(f, "Dispatch failed: {}", msg),
            KittyError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            KittyError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            KittyError::IoError(msg) => write!(f, "IO error: {}", msg),
            KittyError::BincodeError(msg) => write!(f, "Bincode error: {}", msg),
            KittyError::JsonError(msg) => write!(f, "JSON error: {}", msg),
        }
    }
}

impl std::error::Error for KittyError {}

impl From<std::io::Error> for KittyError {
    fn from(err: std::io::Error) -> Self {
        KittyError::IoError(err.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for KittyError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        KittyError::BincodeError(err.to_string())
    }
}

impl From<rusqlite::Error> for KittyError {
    fn from(err: rusqlite::Error) -> Self {
        KittyError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for KittyError {
    fn from(err: serde_json::Error) -> Self {
        KittyError::JsonError(err.to_string())
    }
}

impl From<toml::de::Error> for KittyError {
    fn from(err: toml::de::Error) -> Self {
        KittyError::ConfigError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, KittyError>;

/// Fails with a dispatch error unless `cond` holds.
pub(crate) fn ensure(cond: bool, msg: &'static str) -> Result<()> {
    if cond {
        Ok(())
    } else {
        Err(KittyError::Dispatch(msg))
    }
}
