//! Kittyboard - a reactive terminal front-end for a kitties collectible chain
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Front-end
//! - [`reactive`] - Observable cells and derived signals
//! - [`validate`] - Field validators
//! - [`panel`] - Configuration-driven form panels
//! - [`panels`] - The thirteen screens
//! - [`app`] - Runtime-ready gate and heading
//! - [`tui`] - Terminal rendering and key handling
//!
//! ## Chain Client
//! - [`chain`] - Data model, calls and reactive queries
//! - [`tx`] - Transaction descriptors, signing and submission
//!
//! ## Keys & Addresses
//! - [`crypto`] - Keys, accounts and signatures (secp256k1)
//! - [`secretstore`] - Named signing keys
//! - [`addressbook`] - Named accounts
//! - [`identicon`] - Account identicons
//!
//! ## Development Node
//! - [`devnet`] - Single-authority chain running the kitties runtime
//! - [`persistence`] - Block and state storage (SQLite)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Front-end
// ============================================================================
pub mod app;
pub mod panel;
pub mod panels;
pub mod reactive;
pub mod tui;
pub mod validate;

// ============================================================================
// Chain Client
// ============================================================================
pub mod chain;
pub mod tx;

// ============================================================================
// Keys & Addresses
// ============================================================================
pub mod addressbook;
pub mod crypto;
pub mod identicon;
pub mod secretstore;

// ============================================================================
// Development Node
// ============================================================================
pub mod devnet;
pub mod persistence;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
