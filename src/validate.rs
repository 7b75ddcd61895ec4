//! Field validators
//!
//! Each input field has a [`FieldKind`]. Validation turns raw text into a
//! typed [`FieldValue`] or rejects it with `None`, which leaves the field's
//! cell not ready.

use crate::addressbook::AddressBook;
use crate::chain::types::{Balance, Hash};
use crate::crypto::{decode_hex, AccountId, KeyPair};
use crate::secretstore::SecretStore;
use std::fmt;
use std::fs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registry {
    Secrets,
    AddressBook,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A phrase that derives a signing key.
    Seed,
    /// A label not yet used in the given registry.
    NewName(Registry),
    /// An account this wallet can sign for, by key name or hex.
    Signer,
    /// Any account, by hex, key name or address book label.
    Account,
    /// An amount, optionally with an SI suffix (`1.5k`, `2M`).
    Balance,
    /// Hex bytes with an optional `0x` prefix.
    Hex,
    /// A 32-byte kitty id in hex.
    KittyId,
    /// Path to a file whose bytes become the value.
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Account(AccountId),
    Balance(Balance),
    Bytes(Vec<u8>),
    Hash(Hash),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_account(&self) -> Option<AccountId> {
        match self {
            FieldValue::Account(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_balance(&self) -> Option<Balance> {
        match self {
            FieldValue::Balance(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_hash(&self) -> Option<Hash> {
        match self {
            FieldValue::Hash(h) => Some(*h),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Account(a) => write!(f, "{}", a),
            FieldValue::Balance(b) => write!(f, "{}", b),
            FieldValue::Bytes(b) => write!(f, "{} bytes", b.len()),
            FieldValue::Hash(h) => write!(f, "{}", h),
        }
    }
}

/// The registries validators may consult.
#[derive(Clone, Default)]
pub struct ValidationCtx {
    pub secrets: SecretStore,
    pub book: AddressBook,
}

pub fn validate(kind: FieldKind, raw: &str, ctx: &ValidationCtx) -> Option<FieldValue> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    match kind {
        FieldKind::Seed => KeyPair::from_phrase(text)
            .ok()
            .map(|_| FieldValue::Text(text.to_string())),
        FieldKind::NewName(registry) => {
            if crate::addressbook::validate_label(text).is_err() {
                return None;
            }
            let taken = match registry {
                Registry::Secrets => ctx.secrets.contains_name(text),
                Registry::AddressBook => ctx.book.contains_label(text),
            };
            (!taken).then(|| FieldValue::Text(text.to_string()))
        }
        FieldKind::Signer => {
            let account = ctx
                .secrets
                .by_name(text)
                .map(|e| e.account)
                .or_else(|| AccountId::from_hex(text).ok())?;
            ctx.secrets
                .can_sign(&account)
                .then_some(FieldValue::Account(account))
        }
        FieldKind::Account => resolve_account(text, ctx).map(FieldValue::Account),
        FieldKind::Balance => parse_balance(text).map(FieldValue::Balance),
        FieldKind::Hex => decode_hex(text).ok().map(FieldValue::Bytes),
        FieldKind::KittyId => Hash::from_hex(text).ok().map(FieldValue::Hash),
        // Only read paths naming an existing regular file.
        FieldKind::File => fs::metadata(text)
            .is_ok_and(|meta| meta.is_file())
            .then(|| fs::read(text).ok().map(FieldValue::Bytes))
            .flatten(),
    }
}

fn resolve_account(text: &str, ctx: &ValidationCtx) -> Option<AccountId> {
    if let Ok(account) = AccountId::from_hex(text) {
        return Some(account);
    }
    ctx.secrets
        .by_name(text)
        .map(|e| e.account)
        .or_else(|| ctx.book.get(text).map(|e| e.account))
}

/// Parse `12`, `1.5k`, `2M`, `3G`, `1T`. The result must be a whole number.
pub fn parse_balance(text: &str) -> Option<Balance> {
    let text = text.trim().replace(['_', ','], "");
    let (number, scale) = match text.chars().last()? {
        'k' | 'K' => (&text[..text.len() - 1], 3),
        'M' => (&text[..text.len() - 1], 6),
        'G' => (&text[..text.len() - 1], 9),
        'T' => (&text[..text.len() - 1], 12),
        _ => (text.as_str(), 0u32),
    };

    let (whole, frac) = match number.split_once('.') {
        Some((w, f)) => (w, f),
        None => (number, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let frac = frac.trim_end_matches('0');
    if frac.len() as u32 > scale {
        return None;
    }

    let whole: Balance = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let frac_value: Balance = if frac.is_empty() { 0 } else { frac.parse().ok()? };
    let unit = 10u128.checked_pow(scale)?;
    let frac_unit = 10u128.checked_pow(scale - frac.len() as u32)?;

    whole
        .checked_mul(unit)?
        .checked_add(frac_value.checked_mul(frac_unit)?)
}
