//! Integration tests for the panels running against an in-process devnet

use kittyboard::addressbook::AddressBook;
use kittyboard::app::App;
use kittyboard::config::{NodeConfig, UpgradeModule};
use kittyboard::crypto::{AccountId, KeyPair};
use kittyboard::devnet::DevNode;
use kittyboard::panel::{Panel, PanelContext, PanelState, ViewValue};
use kittyboard::persistence::InMemoryPersistence;
use kittyboard::secretstore::SecretStore;
use kittyboard::tx::{Pipeline, TxStatus};
use std::io::Write;
use tempfile::NamedTempFile;

type TestResult = Result<(), Box<dyn std::error::Error>>;

struct Harness {
    node: DevNode,
    app: App,
    pipeline: Pipeline<DevNode>,
}

impl Harness {
    fn panel(&self, title: &str) -> &Panel {
        self.app
            .panels()
            .iter()
            .find(|p| p.title() == title)
            .unwrap_or_else(|| panic!("no panel titled {}", title))
    }

    fn visible_titles(&self) -> Vec<&'static str> {
        self.app.visible_panels().iter().map(|p| p.title()).collect()
    }
}

fn harness_with(config: NodeConfig) -> Result<Harness, Box<dyn std::error::Error>> {
    let secrets = SecretStore::in_memory();
    secrets.import_dev_keys()?;
    harness_from(config, secrets)
}

fn harness_from(config: NodeConfig, secrets: SecretStore) -> Result<Harness, Box<dyn std::error::Error>> {
    let node = DevNode::start(&config, Box::new(InMemoryPersistence::new()))?;
    let chain = node.chain();
    let pipeline = Pipeline::new(chain.clone(), secrets.clone(), node.clone(), config.mortal_period);
    let app = App::new(PanelContext::new(chain, secrets, AddressBook::new()));
    Ok(Harness { node, app, pipeline })
}

fn harness() -> Result<Harness, Box<dyn std::error::Error>> {
    harness_with(NodeConfig::default())
}

fn account(phrase: &str) -> AccountId {
    KeyPair::from_phrase(phrase).unwrap().account()
}

fn view_text(panel: &Panel, label: &str) -> Option<String> {
    panel.views().into_iter().find_map(|(l, v)| match v {
        ViewValue::Text(text) if l == label => Some(text),
        _ => None,
    })
}

#[test]
fn test_no_panel_submits_without_input() -> TestResult {
    let h = harness()?;
    assert_eq!(h.app.panels().len(), 13);

    for panel in h.app.panels() {
        if panel.config().generator.is_some() {
            continue;
        }
        assert!(!panel.can_submit(), "{} submits with empty fields", panel.title());
        assert!(panel.submit(&h.pipeline).is_err());
        assert_eq!(panel.state(), PanelState::Idle, "{}", panel.title());
    }
    assert_eq!(h.node.pending(), 0);
    Ok(())
}

#[test]
fn test_every_field_must_be_ready() -> TestResult {
    let h = harness()?;
    let send = h.panel("Send Funds");

    assert!(send.input("from", "Alice")?);
    assert!(send.input("to", "Bob")?);
    assert!(!send.input("amount", "lots")?);
    assert_eq!(send.state(), PanelState::Editing);
    assert!(!send.can_submit());

    assert!(send.input("amount", "1.5k")?);
    assert_eq!(send.state(), PanelState::Submittable);

    // A signer this wallet holds no key for is not ready.
    assert!(!send.input("from", &account("Mallory").to_string())?);
    assert!(!send.can_submit());
    Ok(())
}

#[test]
fn test_wallet_prefills_seed_and_creates_key() -> TestResult {
    let h = harness()?;
    let wallet = h.panel("Wallet");

    let fields = wallet.fields();
    let seed = &fields[0];
    assert_eq!(seed.key, "seed");
    assert!(seed.ready);
    assert_eq!(seed.raw.split_whitespace().count(), 12);
    assert!(wallet
        .views()
        .iter()
        .any(|(label, v)| *label == "Identicon" && matches!(v, ViewValue::Identicon(_))));

    let before = seed.raw.clone();
    let first_account = view_text(wallet, "Account");
    let again = wallet.generate()?;
    assert_ne!(before, again);
    assert_eq!(
        view_text(wallet, "Account"),
        Some(KeyPair::from_phrase(&again)?.account().to_string())
    );
    assert_ne!(view_text(wallet, "Account"), first_account);

    // Names already in the wallet are refused.
    assert!(!wallet.input("name", "Alice")?);
    assert!(wallet.input("name", "savings")?);
    wallet.submit(&h.pipeline)?;

    let created = KeyPair::from_phrase(&again)?.account();
    assert!(h.app.context().secrets.can_sign(&created));
    assert!(wallet.note().unwrap().contains("savings"));
    assert!(wallet.listing().iter().any(|row| row.title == "savings"));

    // The name is now taken, so the same field no longer validates.
    assert!(!wallet.fields()[1].ready);
    Ok(())
}

#[test]
fn test_address_book_lookup_and_add() -> TestResult {
    let h = harness()?;
    let book = h.panel("Address Book");
    let charlie = account("Charlie");

    assert!(book.input("lookup", &charlie.to_string())?);
    assert_eq!(view_text(book, "Nonce").as_deref(), Some("0"));
    assert_eq!(view_text(book, "Address"), Some(charlie.to_string()));
    assert_eq!(view_text(book, "Short-form").as_deref(), Some("index 2"));
    assert!(view_text(book, "Balance").is_some());

    assert!(book.input("name", "chuck")?);
    book.submit(&h.pipeline)?;
    assert!(h.app.context().book.contains_label("chuck"));

    // Address book labels resolve in account fields elsewhere.
    let send = h.panel("Send Funds");
    assert!(send.input("to", "chuck")?);
    assert_eq!(send.value("to")?.get().and_then(|v| v.as_account()), Some(charlie));
    Ok(())
}

#[test]
fn test_send_funds_moves_balance() -> TestResult {
    let h = harness()?;
    let send = h.panel("Send Funds");
    let (alice, dave) = (account("Alice"), account("Dave"));
    let start = h.node.head().unwrap().state.free_balance(&dave);

    send.input("from", "Alice")?;
    send.input("to", "Dave")?;
    send.input("amount", "250")?;
    send.submit(&h.pipeline)?;
    assert_eq!(send.state(), PanelState::Submitting);
    assert!(!send.can_submit());

    let view = h.node.produce_block()?;
    assert!(send.status().unwrap().is_success());
    assert_eq!(view.state.free_balance(&dave), start + 250);
    assert_eq!(view.state.account_nonce(&alice), 1);
    assert_eq!(view_text(send, "Nonce").as_deref(), Some("1"));
    assert_eq!(send.state(), PanelState::Submittable);
    Ok(())
}

#[test]
fn test_dispatch_error_surfaces_on_panel() -> TestResult {
    let h = harness()?;
    let price = h.panel("Price");
    price.input("owner", "Alice")?;
    price.input("kitty_id", &format!("0x{}", "ab".repeat(32)))?;
    price.input("price", "10")?;
    price.submit(&h.pipeline)?;
    h.node.produce_block()?;

    assert_eq!(price.error().as_deref(), Some("This cat does not exist"));
    assert_eq!(price.state(), PanelState::Error);

    // Editing clears the error.
    price.input("price", "11")?;
    assert_eq!(price.state(), PanelState::Submittable);
    Ok(())
}

#[test]
fn test_sudo_chain_shows_upgrade_and_poke() -> TestResult {
    let h = harness()?;
    let titles = h.visible_titles();
    assert_eq!(titles.len(), 13);
    assert!(titles.contains(&"Runtime Upgrade"));
    assert!(titles.contains(&"Poke"));

    let poke = h.panel("Poke");
    assert!(!poke.input("key", "0xzz")?);
    poke.input("key", "0xf00baa")?;
    poke.input("value", "0x0102")?;
    poke.submit(&h.pipeline)?;
    let view = h.node.produce_block()?;
    assert!(poke.status().unwrap().is_success());
    assert_eq!(view.state.storage.get(&vec![0xf0, 0x0b, 0xaa]), Some(&vec![1, 2]));
    Ok(())
}

#[test]
fn test_upgrade_key_chain_hides_poke() -> TestResult {
    let config = NodeConfig {
        upgrade_module: UpgradeModule::UpgradeKey,
        ..NodeConfig::default()
    };
    let h = harness_with(config)?;
    let titles = h.visible_titles();
    assert_eq!(titles.len(), 12);
    assert!(titles.contains(&"Runtime Upgrade"));
    assert!(!titles.contains(&"Poke"));

    let poke = h.panel("Poke");
    poke.input("key", "0x01")?;
    poke.input("value", "0x02")?;
    assert!(!poke.can_submit());
    Ok(())
}

#[test]
fn test_runtime_upgrade_from_file() -> TestResult {
    for module in [UpgradeModule::Sudo, UpgradeModule::UpgradeKey] {
        let config = NodeConfig {
            upgrade_module: module,
            ..NodeConfig::default()
        };
        let h = harness_with(config)?;
        let upgrade = h.panel("Runtime Upgrade");

        assert!(!upgrade.input("code", "/definitely/not/a/runtime.wasm")?);

        let mut blob = NamedTempFile::new()?;
        blob.write_all(&[0x00, 0x61, 0x73, 0x6d, 0x01])?;
        assert!(upgrade.input("code", &blob.path().display().to_string())?);
        upgrade.submit(&h.pipeline)?;

        let view = h.node.produce_block()?;
        assert!(upgrade.status().unwrap().is_success(), "{:?}", module);
        assert_eq!(view.version.spec_version, 2);
    }
    Ok(())
}

#[test]
fn test_transactions_publishes_presigned_bytes() -> TestResult {
    let h = harness()?;
    let publish = h.panel("Transactions");

    assert!(!publish.input("tx", "not hex")?);
    assert!(publish.input("tx", "0xdeadbeef")?);
    publish.submit(&h.pipeline)?;
    assert!(matches!(publish.status(), Some(TxStatus::Failed(_))));
    assert_eq!(publish.state(), PanelState::Error);
    assert_eq!(h.node.pending(), 0);
    Ok(())
}

#[test]
fn test_disconnect_hides_panels() -> TestResult {
    let h = harness()?;
    assert_eq!(h.app.panels().len(), 13);
    h.node.set_connected(false);
    assert!(!h.app.is_ready());
    assert!(h.app.visible_panels().is_empty());
    assert!(!h.app.heading().unwrap().connected);

    h.node.set_connected(true);
    assert_eq!(h.app.panels().len(), 13);
    Ok(())
}

#[test]
fn test_transfer_needs_hex_kitty_id() -> TestResult {
    let h = harness()?;
    let transfer = h.panel("Transfer");
    transfer.input("from", "Alice")?;
    transfer.input("to", "Bob")?;

    assert!(!transfer.input("kitty_id", "my favourite cat")?);
    assert!(transfer.fields()[2].invalid());
    assert!(!transfer.can_submit());

    // Hex of the wrong length is not a kitty id either.
    assert!(!transfer.input("kitty_id", "0xabcd")?);
    assert!(!transfer.can_submit());

    assert!(transfer.input("kitty_id", &"cd".repeat(32))?);
    assert!(transfer.can_submit());
    Ok(())
}

#[test]
fn test_send_funds_views_need_a_source() -> TestResult {
    let h = harness()?;
    let send = h.panel("Send Funds");
    assert!(send.views().is_empty());

    send.input("from", "Mallory")?;
    assert!(view_text(send, "Balance").is_none());
    assert!(view_text(send, "Nonce").is_none());

    send.input("from", "Bob")?;
    let bob = h.node.head().unwrap().state.free_balance(&account("Bob"));
    assert_eq!(
        view_text(send, "Balance"),
        Some(kittyboard::chain::types::format_balance(bob))
    );
    assert_eq!(view_text(send, "Nonce").as_deref(), Some("0"));
    Ok(())
}

#[test]
fn test_sudo_panels_need_the_sudo_key() -> TestResult {
    let secrets = SecretStore::in_memory();
    secrets.submit("Bob", "Bob")?;
    let h = harness_from(NodeConfig::default(), secrets)?;

    let poke = h.panel("Poke");
    assert!(poke.visible());
    assert!(poke.input("key", "0x01")?);
    assert!(poke.input("value", "0x02")?);
    assert!(poke.submission().is_some());
    assert!(!poke.can_submit());
    assert_eq!(poke.state(), PanelState::Editing);
    assert!(poke.submit(&h.pipeline).is_err());
    assert_eq!(poke.state(), PanelState::Editing);

    let mut blob = NamedTempFile::new()?;
    blob.write_all(&[0x00, 0x61, 0x73, 0x6d])?;
    let upgrade = h.panel("Runtime Upgrade");
    assert!(upgrade.input("code", &blob.path().display().to_string())?);
    assert!(!upgrade.can_submit());
    assert_eq!(h.node.pending(), 0);

    // Bob still signs for himself.
    let send = h.panel("Send Funds");
    send.input("from", "Bob")?;
    send.input("to", &account("Alice").to_string())?;
    send.input("amount", "1")?;
    assert!(send.can_submit());
    Ok(())
}

#[test]
fn test_each_field_gates_submission() -> TestResult {
    let h = harness()?;
    let mut blob = NamedTempFile::new()?;
    blob.write_all(&[0x00, 0x61, 0x73, 0x6d])?;
    let code = blob.path().display().to_string();
    let kitty = format!("0x{}", "ab".repeat(32));
    let other = format!("0x{}", "cd".repeat(32));

    // (key, valid input, invalid input) for every field of every panel.
    let table: Vec<(&str, Vec<(&str, &str, &str)>)> = vec![
        ("Wallet", vec![("seed", "Eve", ""), ("name", "spare", "Alice")]),
        ("Address Book", vec![("lookup", "Charlie", "nobody"), ("name", "chuck", "bad|name")]),
        (
            "Send Funds",
            vec![("from", "Alice", "Mallory"), ("to", "Bob", "nobody"), ("amount", "10", "lots")],
        ),
        ("Runtime Upgrade", vec![("code", code.as_str(), "/no/such/runtime.wasm")]),
        ("Poke", vec![("key", "0x01", "0xzz"), ("value", "0x02", "0xzz")]),
        ("Transactions", vec![("tx", "0xdeadbeef", "0xzz")]),
        ("Substrate Kitties", vec![("signer", "Alice", "Mallory")]),
        (
            "Price",
            vec![("owner", "Alice", "Mallory"), ("kitty_id", kitty.as_str(), "0xabcd"), ("price", "10", "lots")],
        ),
        (
            "Buy",
            vec![("buyer", "Bob", "Mallory"), ("kitty_id", kitty.as_str(), "0xabcd"), ("max_price", "10", "lots")],
        ),
        (
            "Transfer",
            vec![("from", "Alice", "Mallory"), ("to", "Bob", "nobody"), ("kitty_id", kitty.as_str(), "0xabcd")],
        ),
        (
            "Auctions",
            vec![("owner", "Alice", "Mallory"), ("kitty_id", kitty.as_str(), "0xabcd"), ("min_bid", "10", "lots")],
        ),
        (
            "Bidding",
            vec![("bidder", "Bob", "Mallory"), ("kitty_id", kitty.as_str(), "0xabcd"), ("bid", "10", "lots")],
        ),
        (
            "Breed",
            vec![("owner", "Alice", "Mallory"), ("kitty_id_1", kitty.as_str(), "0xabcd"), ("kitty_id_2", other.as_str(), "0xabcd")],
        ),
    ];
    assert_eq!(table.len(), h.app.panels().len());

    for (title, fields) in &table {
        let panel = h.panel(title);
        assert_eq!(panel.fields().len(), fields.len(), "{} has untested fields", title);
        for (key, valid, _) in fields {
            assert!(panel.input(key, valid)?, "{}: '{}' rejected for {}", title, valid, key);
        }
        assert!(panel.can_submit(), "{} not submittable with valid inputs", title);

        for (key, valid, invalid) in fields {
            assert!(!panel.input(key, invalid)?, "{}: '{}' accepted for {}", title, invalid, key);
            assert!(!panel.can_submit(), "{} submittable with {} = '{}'", title, key, invalid);
            assert!(panel.input(key, valid)?);
            assert!(panel.can_submit(), "{} not submittable after restoring {}", title, key);
        }
    }
    assert_eq!(h.node.pending(), 0);
    Ok(())
}
