//! The screens of the front-end, as panel configurations
//!
//! Every kitty call is signed by the selected signer and carries its full
//! address; the descriptor's `compact` flag alone picks the short form.
//! Kitty ids are 32-byte hashes in hex.

use crate::chain::calls;
use crate::chain::state::ChainSnapshot;
use crate::chain::types::{format_balance, SenderRef};
use crate::chain::{Call, Chain};
use crate::panel::{
    Action, ActionSpec, FieldSpec, Form, Generator, Listing, PanelConfig, Query, ViewSpec,
    Visibility,
};
use crate::reactive::Signal;
use crate::tx::{Submission, TransactionDescriptor};
use crate::validate::{FieldKind, Registry};

/// Modules that allow replacing the runtime code.
pub const UPGRADE_MODULES: &[&str] = &["sudo", "upgrade_key"];
/// Modules that allow writing raw storage.
pub const POKE_MODULES: &[&str] = &["sudo"];

const fn field(key: &'static str, label: &'static str, placeholder: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        key,
        label,
        placeholder,
        kind,
    }
}

const fn view(label: &'static str, field: &'static str, query: Query) -> ViewSpec {
    ViewSpec { label, field, query }
}

const fn transact(label: &'static str, build: fn(&Form, &ChainSnapshot) -> Option<Submission>) -> ActionSpec {
    ActionSpec {
        label,
        action: Action::Transact(build),
    }
}

fn descriptor(sender: SenderRef, call: Call, compact: bool, longevity: bool) -> Option<Submission> {
    TransactionDescriptor::new(sender, &call, compact, longevity)
        .ok()
        .map(Submission::Descriptor)
}

/// Sign `call` with the signer in `key`, as the kitty screens do.
fn signed_by(form: &Form, key: &str, call: Call) -> Option<Submission> {
    descriptor(SenderRef::Account(form.account(key)?), call, false, true)
}

const SIGNER_PLACEHOLDER: &str = "Key name or account";
const ACCOUNT_PLACEHOLDER: &str = "Account, key name or address book label";
const KITTY_PLACEHOLDER: &str = "Kitty id e.g. 0x1a2b...";
const BALANCE_PLACEHOLDER: &str = "Amount e.g. 1.5k";

pub static WALLET: PanelConfig = PanelConfig {
    title: "Wallet",
    subtitle: "Manage your secret keys",
    headline: None,
    visibility: Visibility::Always,
    fields: &[
        field("seed", "seed", "Some seed for this key", FieldKind::Seed),
        field("name", "name", "A name for this key", FieldKind::NewName(Registry::Secrets)),
    ],
    views: &[
        view("Identicon", "seed", Query::Identicon),
        view("Account", "seed", Query::Address),
    ],
    listing: Some(Listing::Keys),
    action: ActionSpec {
        label: "Create",
        action: Action::CreateKey {
            seed: "seed",
            name: "name",
        },
    },
    generator: Some(Generator {
        label: "Another",
        field: "seed",
    }),
};

pub static ADDRESS_BOOK: PanelConfig = PanelConfig {
    title: "Address Book",
    subtitle: "Inspect the status of any account and name it for later use",
    headline: None,
    visibility: Visibility::Always,
    fields: &[
        field("lookup", "lookup account", ACCOUNT_PLACEHOLDER, FieldKind::Account),
        field("name", "name", "A name for this address", FieldKind::NewName(Registry::AddressBook)),
    ],
    views: &[
        view("Balance", "lookup", Query::Balance),
        view("Nonce", "lookup", Query::Nonce),
        view("Short-form", "lookup", Query::ShortForm),
        view("Address", "lookup", Query::Address),
    ],
    listing: Some(Listing::Addresses),
    action: ActionSpec {
        label: "Add",
        action: Action::AddAddress {
            account: "lookup",
            name: "name",
        },
    },
    generator: None,
};

fn build_send_funds(form: &Form, view: &ChainSnapshot) -> Option<Submission> {
    let to = view.state.try_index(&form.account("to")?);
    signed_by(form, "from", calls::balances::transfer(to, form.balance("amount")?))
}

pub static SEND_FUNDS: PanelConfig = PanelConfig {
    title: "Send Funds",
    subtitle: "Send funds from your account to another",
    headline: None,
    visibility: Visibility::Always,
    fields: &[
        field("from", "from", SIGNER_PLACEHOLDER, FieldKind::Signer),
        field("to", "to", ACCOUNT_PLACEHOLDER, FieldKind::Account),
        field("amount", "amount", BALANCE_PLACEHOLDER, FieldKind::Balance),
    ],
    views: &[
        view("Balance", "from", Query::Balance),
        view("Nonce", "from", Query::Nonce),
        view("Destination balance", "to", Query::Balance),
    ],
    listing: None,
    action: transact("Send", build_send_funds),
    generator: None,
};

/// Sudo wraps `set_code`; without sudo the upgrade key calls `upgrade`.
fn build_upgrade(form: &Form, view: &ChainSnapshot) -> Option<Submission> {
    let code = form.bytes("code")?;
    let (sender, call) = match (view.state.sudo_key, view.state.upgrade_key) {
        (Some(key), _) => (key, calls::sudo::sudo(calls::consensus::set_code(code))),
        (None, Some(key)) => (key, calls::upgrade_key::upgrade(code)),
        (None, None) => return None,
    };
    descriptor(SenderRef::Account(sender), call, false, false)
}

pub static RUNTIME_UPGRADE: PanelConfig = PanelConfig {
    title: "Runtime Upgrade",
    subtitle: "Upgrade the runtime using the UpgradeKey module",
    headline: None,
    visibility: Visibility::AnyModule(UPGRADE_MODULES),
    fields: &[field("code", "runtime", "Path to a runtime blob", FieldKind::File)],
    views: &[],
    listing: None,
    action: transact("Upgrade", build_upgrade),
    generator: None,
};

fn build_poke(form: &Form, view: &ChainSnapshot) -> Option<Submission> {
    let key = view.state.sudo_key?;
    let item = (form.bytes("key")?, form.bytes("value")?);
    let call = calls::sudo::sudo(calls::consensus::set_storage(vec![item]));
    descriptor(SenderRef::Account(key), call, false, false)
}

pub static POKE: PanelConfig = PanelConfig {
    title: "Poke",
    subtitle: "Set a particular key of storage to a particular value",
    headline: None,
    visibility: Visibility::AnyModule(POKE_MODULES),
    fields: &[
        field("key", "storage key", "Storage key e.g. 0xf00baa", FieldKind::Hex),
        field("value", "storage value", "Storage value e.g. 0xf00baa", FieldKind::Hex),
    ],
    views: &[],
    listing: None,
    action: transact("Poke", build_poke),
    generator: None,
};

fn build_publish(form: &Form, _view: &ChainSnapshot) -> Option<Submission> {
    form.bytes("tx").map(Submission::Presigned)
}

pub static TRANSACTIONS: PanelConfig = PanelConfig {
    title: "Transactions",
    subtitle: "Send custom transactions",
    headline: None,
    visibility: Visibility::Always,
    fields: &[field("tx", "Custom Transaction Data", "0x...", FieldKind::Hex)],
    views: &[],
    listing: None,
    action: transact("Publish", build_publish),
    generator: None,
};

fn kitty_count(chain: &Chain) -> Signal<String> {
    chain
        .all_kitties_count()
        .map(|count| format!("There are {} kitties purring.", format_balance(*count as u128)))
}

fn build_create_kitty(form: &Form, _view: &ChainSnapshot) -> Option<Submission> {
    let signer = form.account("signer")?;
    descriptor(SenderRef::Account(signer), calls::kitties::create_kitty(), false, false)
}

pub static KITTIES: PanelConfig = PanelConfig {
    title: "Substrate Kitties",
    subtitle: "Create and browse kitties",
    headline: Some(kitty_count),
    visibility: Visibility::Always,
    fields: &[field("signer", "signer", SIGNER_PLACEHOLDER, FieldKind::Signer)],
    views: &[],
    listing: Some(Listing::Kitties),
    action: transact("Create Kitty", build_create_kitty),
    generator: None,
};

fn build_set_price(form: &Form, _view: &ChainSnapshot) -> Option<Submission> {
    let call = calls::kitties::set_price(form.hash("kitty_id")?, form.balance("price")?);
    signed_by(form, "owner", call)
}

pub static SET_PRICE: PanelConfig = PanelConfig {
    title: "Price",
    subtitle: "Set Sell Price for the Kitty",
    headline: None,
    visibility: Visibility::Always,
    fields: &[
        field("owner", "Owner", SIGNER_PLACEHOLDER, FieldKind::Signer),
        field("kitty_id", "kittyId", KITTY_PLACEHOLDER, FieldKind::KittyId),
        field("price", "sellPrice", BALANCE_PLACEHOLDER, FieldKind::Balance),
    ],
    views: &[],
    listing: None,
    action: transact("Send", build_set_price),
    generator: None,
};

fn build_buy(form: &Form, _view: &ChainSnapshot) -> Option<Submission> {
    let call = calls::kitties::buy_kitty(form.hash("kitty_id")?, form.balance("max_price")?);
    signed_by(form, "buyer", call)
}

pub static BUY: PanelConfig = PanelConfig {
    title: "Buy",
    subtitle: "Buy the Kitty",
    headline: None,
    visibility: Visibility::Always,
    fields: &[
        field("buyer", "buyer", SIGNER_PLACEHOLDER, FieldKind::Signer),
        field("kitty_id", "kittyId", KITTY_PLACEHOLDER, FieldKind::KittyId),
        field("max_price", "buyPrice", BALANCE_PLACEHOLDER, FieldKind::Balance),
    ],
    views: &[],
    listing: None,
    action: transact("Send", build_buy),
    generator: None,
};

fn build_transfer(form: &Form, _view: &ChainSnapshot) -> Option<Submission> {
    let call = calls::kitties::transfer(form.account("to")?, form.hash("kitty_id")?);
    signed_by(form, "from", call)
}

pub static TRANSFER: PanelConfig = PanelConfig {
    title: "Transfer",
    subtitle: "Transfer kitty from your account to another",
    headline: None,
    visibility: Visibility::Always,
    fields: &[
        field("from", "from", SIGNER_PLACEHOLDER, FieldKind::Signer),
        field("to", "to", ACCOUNT_PLACEHOLDER, FieldKind::Account),
        field("kitty_id", "kittyId", KITTY_PLACEHOLDER, FieldKind::KittyId),
    ],
    views: &[],
    listing: None,
    action: transact("Send", build_transfer),
    generator: None,
};

fn build_auction(form: &Form, _view: &ChainSnapshot) -> Option<Submission> {
    let call = calls::kitties::predefined_create_auction(form.hash("kitty_id")?, form.balance("min_bid")?);
    signed_by(form, "owner", call)
}

pub static AUCTION: PanelConfig = PanelConfig {
    title: "Auctions",
    subtitle: "Set Auctions for the Kitty",
    headline: None,
    visibility: Visibility::Always,
    fields: &[
        field("owner", "Owner", SIGNER_PLACEHOLDER, FieldKind::Signer),
        field("kitty_id", "kittyId", KITTY_PLACEHOLDER, FieldKind::KittyId),
        field("min_bid", "minBid", BALANCE_PLACEHOLDER, FieldKind::Balance),
    ],
    views: &[view("Auction", "kitty_id", Query::Auction)],
    listing: None,
    action: transact("Send", build_auction),
    generator: None,
};

fn build_bid(form: &Form, _view: &ChainSnapshot) -> Option<Submission> {
    let call = calls::kitties::bid_auction(form.hash("kitty_id")?, form.balance("bid")?);
    signed_by(form, "bidder", call)
}

pub static BID: PanelConfig = PanelConfig {
    title: "Bidding",
    subtitle: "Bid for the Kitty",
    headline: None,
    visibility: Visibility::Always,
    fields: &[
        field("bidder", "bidder", SIGNER_PLACEHOLDER, FieldKind::Signer),
        field("kitty_id", "kittyId", KITTY_PLACEHOLDER, FieldKind::KittyId),
        field("bid", "bidBalance", BALANCE_PLACEHOLDER, FieldKind::Balance),
    ],
    views: &[
        view("Auction", "kitty_id", Query::Auction),
        view("Balance", "bidder", Query::Balance),
    ],
    listing: None,
    action: transact("Send", build_bid),
    generator: None,
};

fn build_breed(form: &Form, _view: &ChainSnapshot) -> Option<Submission> {
    let call = calls::kitties::breed_kitty(form.hash("kitty_id_1")?, form.hash("kitty_id_2")?);
    signed_by(form, "owner", call)
}

pub static BREED: PanelConfig = PanelConfig {
    title: "Breed",
    subtitle: "Breed Kitty",
    headline: None,
    visibility: Visibility::Always,
    fields: &[
        field("owner", "owner", SIGNER_PLACEHOLDER, FieldKind::Signer),
        field("kitty_id_1", "kittyId1", KITTY_PLACEHOLDER, FieldKind::KittyId),
        field("kitty_id_2", "kittyId2", KITTY_PLACEHOLDER, FieldKind::KittyId),
    ],
    views: &[],
    listing: None,
    action: transact("Send", build_breed),
    generator: None,
};

/// Mount order, top to bottom.
pub static ALL: [&PanelConfig; 13] = [
    &WALLET,
    &ADDRESS_BOOK,
    &SEND_FUNDS,
    &RUNTIME_UPGRADE,
    &POKE,
    &TRANSACTIONS,
    &KITTIES,
    &SET_PRICE,
    &BUY,
    &TRANSFER,
    &AUCTION,
    &BID,
    &BREED,
];
