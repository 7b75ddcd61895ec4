//! Configuration-driven form panels
//!
//! A [`Panel`] is built from a `'static` [`PanelConfig`]. It owns one cell per
//! input field, derives its read-only views and its visibility from chain
//! queries over those cells, and turns a snapshot of the cells into a
//! [`Submission`] when the user activates its action.

use crate::addressbook::AddressBook;
use crate::chain::state::ChainSnapshot;
use crate::chain::types::{format_balance, Hash, SenderRef};
use crate::chain::Chain;
use crate::crypto::{generate_mnemonic, AccountId, KeyPair};
use crate::error::{KittyError, Result};
use crate::identicon::Identicon;
use crate::reactive::{Cell, Signal, Subscription};
use crate::secretstore::SecretStore;
use crate::tx::{Submission, Submitter, TxStatus};
use crate::validate::{validate, FieldKind, FieldValue, ValidationCtx};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// When a panel is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Always,
    /// Only while the runtime exposes at least one of these modules.
    AnyModule(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub placeholder: &'static str,
    pub kind: FieldKind,
}

/// What a view shows about the account or kitty held by its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    Balance,
    Nonce,
    /// Hidden while the account has no index.
    ShortForm,
    Address,
    Identicon,
    /// Hidden while the kitty is not up for auction.
    Auction,
}

#[derive(Debug, Clone, Copy)]
pub struct ViewSpec {
    pub label: &'static str,
    /// The field the view is about; the view is hidden until it is ready.
    pub field: &'static str,
    pub query: Query,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    Keys,
    Addresses,
    Kitties,
}

pub type BuildFn = fn(&Form, &ChainSnapshot) -> Option<Submission>;

#[derive(Clone, Copy)]
pub enum Action {
    /// Build a transaction from the form and hand it to the submitter.
    Transact(BuildFn),
    /// Store the phrase in `seed` under the name in `name`.
    CreateKey {
        seed: &'static str,
        name: &'static str,
    },
    /// Add the account in `account` to the address book as `name`.
    AddAddress {
        account: &'static str,
        name: &'static str,
    },
}

#[derive(Clone, Copy)]
pub struct ActionSpec {
    pub label: &'static str,
    pub action: Action,
}

/// A button that fills `field` with a freshly generated value.
#[derive(Debug, Clone, Copy)]
pub struct Generator {
    pub label: &'static str,
    pub field: &'static str,
}

#[derive(Clone, Copy)]
pub struct PanelConfig {
    pub title: &'static str,
    pub subtitle: &'static str,
    /// Replaces the subtitle while the chain is ready.
    pub headline: Option<fn(&Chain) -> Signal<String>>,
    pub visibility: Visibility,
    pub fields: &'static [FieldSpec],
    pub views: &'static [ViewSpec],
    pub listing: Option<Listing>,
    pub action: ActionSpec,
    pub generator: Option<Generator>,
}

/// Everything a panel talks to.
#[derive(Clone)]
pub struct PanelContext {
    pub chain: Chain,
    pub secrets: SecretStore,
    pub book: AddressBook,
}

impl PanelContext {
    pub fn new(chain: Chain, secrets: SecretStore, book: AddressBook) -> Self {
        PanelContext {
            chain,
            secrets,
            book,
        }
    }

    fn validation(&self) -> ValidationCtx {
        ValidationCtx {
            secrets: self.secrets.clone(),
            book: self.book.clone(),
        }
    }
}

/// Validated field values at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    values: HashMap<&'static str, FieldValue>,
}

impl Form {
    pub fn insert(&mut self, key: &'static str, value: FieldValue) {
        self.values.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    pub fn account(&self, key: &str) -> Option<AccountId> {
        self.get(key)?.as_account()
    }

    pub fn balance(&self, key: &str) -> Option<u128> {
        self.get(key)?.as_balance()
    }

    pub fn hash(&self, key: &str) -> Option<Hash> {
        self.get(key)?.as_hash()
    }

    pub fn bytes(&self, key: &str) -> Option<Vec<u8>> {
        self.get(key)?.as_bytes().map(<[u8]>::to_vec)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_text()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    Idle,
    Editing,
    Submittable,
    Submitting,
    Error,
}

/// Rendering data for one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldState {
    pub key: &'static str,
    pub label: &'static str,
    pub placeholder: &'static str,
    pub raw: String,
    pub ready: bool,
}

impl FieldState {
    /// Text was entered but did not validate.
    pub fn invalid(&self) -> bool {
        !self.ready && !self.raw.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewValue {
    Text(String),
    Identicon(Identicon),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRow {
    pub identicon: Option<Identicon>,
    pub title: String,
    pub detail: String,
}

struct Field {
    spec: &'static FieldSpec,
    raw: Mutex<String>,
    cell: Cell<FieldValue>,
}

impl Field {
    fn revalidate(&self, ctx: &ValidationCtx) {
        let raw = self.raw.lock().clone();
        match validate(self.spec.kind, &raw, ctx) {
            Some(value) => {
                if self.cell.get().as_ref() != Some(&value) {
                    self.cell.set(value);
                }
            }
            None => {
                if self.cell.is_ready() {
                    self.cell.reset();
                }
            }
        }
    }
}

struct View {
    label: &'static str,
    value: Signal<ViewValue>,
}

#[derive(Default)]
struct Outstanding {
    status: Option<Signal<TxStatus>>,
    watch: Option<Subscription>,
    error: Option<String>,
    note: Option<String>,
}

pub struct Panel {
    config: &'static PanelConfig,
    ctx: PanelContext,
    fields: Vec<Arc<Field>>,
    views: Vec<View>,
    visible: Signal<bool>,
    headline: Option<Signal<String>>,
    outstanding: Mutex<Outstanding>,
    _registries: Vec<Subscription>,
}

fn account_of(kind: FieldKind, value: &FieldValue) -> Option<AccountId> {
    match (kind, value) {
        (FieldKind::Seed, FieldValue::Text(phrase)) => {
            KeyPair::from_phrase(phrase).ok().map(|k| k.account())
        }
        (_, value) => value.as_account(),
    }
}

fn auction_summary(auction: &crate::chain::types::Auction) -> String {
    if auction.high_bidder == auction.kitty_owner {
        format!(
            "min bid {}, no bids, ends #{}",
            format_balance(auction.min_bid),
            auction.expiry
        )
    } else {
        format!(
            "high bid {} by {}, ends #{}",
            format_balance(auction.high_bid),
            auction.high_bidder.short(),
            auction.expiry
        )
    }
}

impl Panel {
    /// Mount a panel. Only derived signals are wired here; nothing is queried.
    pub fn new(config: &'static PanelConfig, ctx: PanelContext) -> Self {
        let fields: Vec<Arc<Field>> = config
            .fields
            .iter()
            .map(|spec| {
                Arc::new(Field {
                    spec,
                    raw: Mutex::new(String::new()),
                    cell: Cell::new(),
                })
            })
            .collect();

        let views = config
            .views
            .iter()
            .filter_map(|spec| {
                let field = fields.iter().find(|f| f.spec.key == spec.field)?;
                Some(View {
                    label: spec.label,
                    value: Self::wire_view(&ctx.chain, field, spec.query),
                })
            })
            .collect();

        let visible = match config.visibility {
            Visibility::Always => Signal::constant(true),
            Visibility::AnyModule(names) => ctx.chain.has_any_module(names),
        };
        let headline = config.headline.map(|headline| headline(&ctx.chain));

        // Names and signers depend on the registries, so re-check them when
        // a key or an address is added.
        let registry_bound: Vec<Arc<Field>> = fields
            .iter()
            .filter(|f| {
                matches!(
                    f.spec.kind,
                    FieldKind::NewName(_) | FieldKind::Signer | FieldKind::Account
                )
            })
            .cloned()
            .collect();
        let mut registries = Vec::new();
        if !registry_bound.is_empty() {
            for changes in [ctx.secrets.changes(), ctx.book.changes()] {
                let bound = registry_bound.clone();
                let vctx = ctx.validation();
                registries.push(changes.subscribe(move |_| {
                    for field in &bound {
                        field.revalidate(&vctx);
                    }
                }));
            }
        }

        let panel = Panel {
            config,
            ctx,
            fields,
            views,
            visible,
            headline,
            outstanding: Mutex::new(Outstanding::default()),
            _registries: registries,
        };
        if panel.config.generator.is_some() {
            // A fresh panel with a generator starts out with a suggestion.
            if let Err(e) = panel.generate() {
                warn!("{}: could not prefill: {}", panel.config.title, e);
            }
        }
        debug!("Mounted panel '{}'", config.title);
        panel
    }

    fn wire_view(chain: &Chain, field: &Field, query: Query) -> Signal<ViewValue> {
        let kind = field.spec.kind;
        let value = field.cell.signal();
        if query == Query::Auction {
            let kitty = value.filter_map(FieldValue::as_hash);
            return chain
                .auction(&kitty)
                .map(|a| ViewValue::Text(auction_summary(a)));
        }

        let account = value.filter_map(move |v| account_of(kind, v));
        match query {
            Query::Balance => chain
                .balance(&account)
                .map(|b| ViewValue::Text(format_balance(*b))),
            Query::Nonce => chain
                .account_nonce(&account)
                .map(|n| ViewValue::Text(n.to_string())),
            Query::ShortForm => chain
                .try_index(&account)
                .filter_map(|i| i.map(|i| ViewValue::Text(format!("index {}", i)))),
            Query::Address => account.map(|a| ViewValue::Text(a.to_string())),
            Query::Identicon => account.map(|a| ViewValue::Identicon(Identicon::for_account(a))),
            Query::Auction => Signal::pending(),
        }
    }

    pub fn config(&self) -> &'static PanelConfig {
        self.config
    }

    pub fn title(&self) -> &'static str {
        self.config.title
    }

    pub fn subtitle(&self) -> String {
        self.headline
            .as_ref()
            .and_then(|headline| headline.get())
            .unwrap_or_else(|| self.config.subtitle.to_string())
    }

    pub fn visible(&self) -> bool {
        self.visible.get() == Some(true)
    }

    pub fn visibility(&self) -> Signal<bool> {
        self.visible.clone()
    }

    fn field(&self, key: &str) -> Result<&Arc<Field>> {
        self.fields
            .iter()
            .find(|f| f.spec.key == key)
            .ok_or_else(|| KittyError::UnknownField(key.to_string()))
    }

    /// Feed raw text into a field. Returns whether the field is now ready.
    pub fn input(&self, key: &str, raw: &str) -> Result<bool> {
        let field = self.field(key)?;
        *field.raw.lock() = raw.to_string();
        let value = validate(field.spec.kind, raw, &self.ctx.validation());
        let ready = value.is_some();
        match value {
            Some(value) => field.cell.set(value),
            None => field.cell.reset(),
        }
        // Editing dismisses the outcome of the last transaction.
        let mut outstanding = self.outstanding.lock();
        outstanding.error = None;
        let finished = outstanding
            .status
            .as_ref()
            .and_then(|s| s.get())
            .is_some_and(|s| s.is_terminal());
        if finished {
            outstanding.status = None;
            outstanding.watch = None;
        }
        Ok(ready)
    }

    /// Read handle onto a field's validated value.
    pub fn value(&self, key: &str) -> Result<Signal<FieldValue>> {
        Ok(self.field(key)?.cell.signal())
    }

    /// Fill the generator's field with a fresh phrase.
    pub fn generate(&self) -> Result<String> {
        let generator = self.config.generator.ok_or_else(|| {
            KittyError::PreconditionNotMet(format!("{} has no generator", self.config.title))
        })?;
        let phrase = generate_mnemonic()?;
        self.input(generator.field, &phrase)?;
        Ok(phrase)
    }

    pub fn fields(&self) -> Vec<FieldState> {
        self.fields
            .iter()
            .map(|f| FieldState {
                key: f.spec.key,
                label: f.spec.label,
                placeholder: f.spec.placeholder,
                raw: f.raw.lock().clone(),
                ready: f.cell.is_ready(),
            })
            .collect()
    }

    /// Views whose inputs are ready, with their current values.
    pub fn views(&self) -> Vec<(&'static str, ViewValue)> {
        self.views
            .iter()
            .filter_map(|v| v.value.get().map(|value| (v.label, value)))
            .collect()
    }

    pub fn listing(&self) -> Vec<ListingRow> {
        match self.config.listing {
            None => Vec::new(),
            Some(Listing::Keys) => self
                .ctx
                .secrets
                .list()
                .into_iter()
                .map(|entry| ListingRow {
                    identicon: Some(Identicon::for_account(&entry.account)),
                    title: entry.name,
                    detail: entry.account.to_string(),
                })
                .collect(),
            Some(Listing::Addresses) => self
                .ctx
                .book
                .list()
                .into_iter()
                .map(|entry| ListingRow {
                    identicon: Some(Identicon::for_account(&entry.account)),
                    title: entry.label,
                    detail: entry.account.to_string(),
                })
                .collect(),
            Some(Listing::Kitties) => self
                .ctx
                .chain
                .kitties()
                .get()
                .unwrap_or_default()
                .into_iter()
                .map(|card| {
                    let mut detail = format!(
                        "gen {} · dna {} · {}",
                        card.kitty.gen,
                        &card.kitty.dna.to_hex()[..8],
                        if card.kitty.price == 0 {
                            "not for sale".to_string()
                        } else {
                            format!("price {}", format_balance(card.kitty.price))
                        }
                    );
                    if let Some(auction) = &card.auction {
                        detail.push_str(&format!(" · auction: {}", auction_summary(auction)));
                    }
                    ListingRow {
                        identicon: card.owner.as_ref().map(Identicon::for_account),
                        title: card.kitty.id.to_string(),
                        detail,
                    }
                })
                .collect(),
        }
    }

    fn snapshot(&self) -> Option<Form> {
        let mut form = Form::default();
        for field in &self.fields {
            form.insert(field.spec.key, field.cell.get()?);
        }
        Some(form)
    }

    /// The submission the action would send right now, if every input is ready.
    pub fn submission(&self) -> Option<Submission> {
        let Action::Transact(build) = self.config.action.action else {
            return None;
        };
        let form = self.snapshot()?;
        let view = self.ctx.chain.view().get()?;
        build(&form, &view)
    }

    /// Whether the wallet holds the key for the account behind `sender`.
    fn can_sign(&self, sender: &SenderRef) -> bool {
        self.ctx
            .chain
            .view()
            .get()
            .and_then(|view| view.state.resolve(sender))
            .is_some_and(|account| self.ctx.secrets.can_sign(&account))
    }

    fn is_outstanding(&self) -> bool {
        self.outstanding
            .lock()
            .status
            .as_ref()
            .and_then(|s| s.get())
            .is_some_and(|s| !s.is_terminal())
    }

    pub fn can_submit(&self) -> bool {
        if !self.visible() || self.is_outstanding() {
            return false;
        }
        match self.config.action.action {
            Action::Transact(_) => match self.submission() {
                Some(Submission::Descriptor(descriptor)) => self.can_sign(&descriptor.sender),
                Some(Submission::Presigned(_)) => true,
                None => false,
            },
            Action::CreateKey { .. } | Action::AddAddress { .. } => self.snapshot().is_some(),
        }
    }

    pub fn state(&self) -> PanelState {
        if self.is_outstanding() {
            return PanelState::Submitting;
        }
        if self.error().is_some() {
            return PanelState::Error;
        }
        if self.can_submit() {
            return PanelState::Submittable;
        }
        if self.fields.iter().any(|f| !f.raw.lock().trim().is_empty()) {
            PanelState::Editing
        } else {
            PanelState::Idle
        }
    }

    /// Status of the last transaction sent from this panel.
    pub fn status(&self) -> Option<TxStatus> {
        self.outstanding.lock().status.as_ref().and_then(|s| s.get())
    }

    /// The reason the last activation failed, if it did.
    pub fn error(&self) -> Option<String> {
        let outstanding = self.outstanding.lock();
        if let Some(error) = &outstanding.error {
            return Some(error.clone());
        }
        match outstanding.status.as_ref().and_then(|s| s.get()) {
            Some(TxStatus::Failed(reason)) => Some(reason),
            Some(TxStatus::Finalized {
                outcome: Err(reason),
                ..
            }) => Some(reason),
            _ => None,
        }
    }

    /// Result line of the last local action (key created, address added).
    pub fn note(&self) -> Option<String> {
        self.outstanding.lock().note.clone()
    }

    fn fail(&self, error: KittyError) -> KittyError {
        warn!("{}: {}", self.config.title, error);
        self.outstanding.lock().error = Some(error.to_string());
        error
    }

    /// Activate the panel's action.
    pub fn submit(&self, submitter: &dyn Submitter) -> Result<()> {
        if !self.can_submit() {
            return Err(KittyError::PreconditionNotMet(format!(
                "{} is not ready to submit",
                self.config.title
            )));
        }
        let form = self.snapshot().ok_or_else(|| {
            KittyError::PreconditionNotMet(format!("{} has unset fields", self.config.title))
        })?;

        match self.config.action.action {
            Action::Transact(_) => {
                let submission = self.submission().ok_or_else(|| {
                    KittyError::PreconditionNotMet("chain is not ready".to_string())
                })?;
                let status = submitter.submit(submission).map_err(|e| self.fail(e))?;
                let title = self.config.title;
                let watch = status.subscribe(move |status| match status {
                    Some(status) if status.is_success() => info!("{}: {}", title, status),
                    Some(status) if status.is_terminal() => warn!("{}: {}", title, status),
                    _ => {}
                });
                let mut outstanding = self.outstanding.lock();
                outstanding.status = Some(status);
                outstanding.watch = Some(watch);
                outstanding.error = None;
                outstanding.note = None;
            }
            Action::CreateKey { seed, name } => {
                let (phrase, label) = (
                    form.text(seed).unwrap_or_default(),
                    form.text(name).unwrap_or_default(),
                );
                let account = self
                    .ctx
                    .secrets
                    .submit(phrase, label)
                    .map_err(|e| self.fail(e))?;
                self.outstanding.lock().note = Some(format!("Created '{}' ({})", label, account.short()));
            }
            Action::AddAddress { account, name } => {
                let (who, label) = (
                    form.account(account).ok_or_else(|| {
                        KittyError::InvalidInput(format!("{} is not an account", account))
                    })?,
                    form.text(name).unwrap_or_default(),
                );
                self.ctx
                    .book
                    .add(label, who, None)
                    .map_err(|e| self.fail(e))?;
                self.outstanding.lock().note = Some(format!("Added '{}' ({})", label, who.short()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::calls;
    use crate::chain::types::{Metadata, NodeStatus};
    use crate::chain::ChainView;
    use crate::tx::TransactionDescriptor;

    fn build_send(form: &Form, view: &ChainSnapshot) -> Option<Submission> {
        let from = form.account("from")?;
        let call = calls::balances::transfer(view.state.try_index(&form.account("to")?), form.balance("amount")?);
        TransactionDescriptor::new(view.state.try_index(&from), &call, false, true)
            .ok()
            .map(Submission::Descriptor)
    }

    static SEND: PanelConfig = PanelConfig {
        title: "Test Send",
        subtitle: "test",
        headline: None,
        visibility: Visibility::Always,
        fields: &[
            FieldSpec { key: "from", label: "from", placeholder: "", kind: FieldKind::Signer },
            FieldSpec { key: "to", label: "to", placeholder: "", kind: FieldKind::Account },
            FieldSpec { key: "amount", label: "amount", placeholder: "", kind: FieldKind::Balance },
        ],
        views: &[
            ViewSpec { label: "Balance", field: "from", query: Query::Balance },
            ViewSpec { label: "Index", field: "to", query: Query::ShortForm },
        ],
        listing: None,
        action: ActionSpec { label: "Send", action: Action::Transact(build_send) },
        generator: None,
    };

    fn build_refund(form: &Form, view: &ChainSnapshot) -> Option<Submission> {
        let payer = form.account("payer")?;
        let call = calls::balances::transfer(SenderRef::Account(payer), form.balance("amount")?);
        TransactionDescriptor::new(view.state.try_index(&payer), &call, false, true)
            .ok()
            .map(Submission::Descriptor)
    }

    // Signs for an account field that any known address satisfies.
    static REFUND: PanelConfig = PanelConfig {
        title: "Test Refund",
        subtitle: "test",
        headline: None,
        visibility: Visibility::Always,
        fields: &[
            FieldSpec { key: "payer", label: "payer", placeholder: "", kind: FieldKind::Account },
            FieldSpec { key: "amount", label: "amount", placeholder: "", kind: FieldKind::Balance },
        ],
        views: &[],
        listing: None,
        action: ActionSpec { label: "Refund", action: Action::Transact(build_refund) },
        generator: None,
    };

    static GATED: PanelConfig = PanelConfig {
        title: "Gated",
        subtitle: "",
        headline: None,
        visibility: Visibility::AnyModule(&["sudo"]),
        fields: &[],
        views: &[],
        listing: None,
        action: ActionSpec { label: "Go", action: Action::AddAddress { account: "a", name: "n" } },
        generator: None,
    };

    struct Recorder(Mutex<Vec<Submission>>);

    impl Submitter for Recorder {
        fn submit(&self, submission: Submission) -> Result<Signal<TxStatus>> {
            self.0.lock().push(submission);
            Ok(Signal::constant(TxStatus::Sending))
        }
    }

    fn context(modules: &[&str]) -> (PanelContext, Cell<ChainView>, AccountId) {
        let secrets = SecretStore::in_memory();
        let alice = secrets.submit("Alice", "alice").unwrap();
        let mut snapshot = ChainSnapshot {
            metadata: Metadata {
                modules: modules.iter().map(|m| m.to_string()).collect(),
            },
            ..Default::default()
        };
        snapshot.state.balances.insert(alice, 500);
        let view = Cell::with(Arc::new(snapshot));
        let status = Signal::constant(NodeStatus {
            connected: true,
            name: "test".to_string(),
            version: "0".to_string(),
            chain: "test".to_string(),
        });
        let ctx = PanelContext::new(Chain::new(view.signal(), status), secrets, AddressBook::new());
        (ctx, view, alice)
    }

    #[test]
    fn test_unknown_field() {
        let (ctx, _view, _) = context(&[]);
        let panel = Panel::new(&SEND, ctx);
        assert!(matches!(panel.input("nope", "x"), Err(KittyError::UnknownField(_))));
    }

    #[test]
    fn test_state_machine() {
        let (ctx, _view, _) = context(&[]);
        let panel = Panel::new(&SEND, ctx);
        assert_eq!(panel.state(), PanelState::Idle);

        panel.input("from", "alice").unwrap();
        assert_eq!(panel.state(), PanelState::Editing);
        panel.input("to", "alice").unwrap();
        panel.input("amount", "1k").unwrap();
        assert_eq!(panel.state(), PanelState::Submittable);

        let recorder = Recorder(Mutex::new(Vec::new()));
        panel.submit(&recorder).unwrap();
        assert_eq!(panel.state(), PanelState::Submitting);
        assert!(!panel.can_submit());
        assert!(panel.submit(&recorder).is_err());
        assert_eq!(recorder.0.lock().len(), 1);
    }

    #[test]
    fn test_views_follow_fields() {
        let (ctx, view, alice) = context(&[]);
        let panel = Panel::new(&SEND, ctx);
        assert!(panel.views().is_empty());

        panel.input("from", "alice").unwrap();
        assert_eq!(panel.views(), vec![("Balance", ViewValue::Text("500".to_string()))]);

        let mut next = (*view.get().unwrap()).clone();
        next.state.balances.insert(alice, 1_500);
        view.set(Arc::new(next));
        assert_eq!(panel.views(), vec![("Balance", ViewValue::Text("1,500".to_string()))]);

        panel.input("from", "").unwrap();
        assert!(panel.views().is_empty());
    }

    #[test]
    fn test_short_form_hidden_without_index() {
        let (ctx, view, alice) = context(&[]);
        let panel = Panel::new(&SEND, ctx);
        panel.input("to", &alice.to_hex()).unwrap();
        assert!(panel.views().is_empty());

        let mut next = (*view.get().unwrap()).clone();
        next.state.indices.push(alice);
        next.state.index_of.insert(alice, 0);
        view.set(Arc::new(next));
        assert_eq!(panel.views(), vec![("Index", ViewValue::Text("index 0".to_string()))]);
    }

    #[test]
    fn test_visibility_follows_metadata() {
        let (ctx, view, _) = context(&[]);
        let panel = Panel::new(&GATED, ctx);
        assert!(!panel.visible());

        let mut next = (*view.get().unwrap()).clone();
        next.metadata.modules.push("sudo".to_string());
        view.set(Arc::new(next));
        assert!(panel.visible());

        view.reset();
        assert!(!panel.visible());
    }

    #[test]
    fn test_signer_revalidates_when_key_added() {
        let (ctx, _view, _) = context(&[]);
        let secrets = ctx.secrets.clone();
        let panel = Panel::new(&SEND, ctx);
        assert!(!panel.input("from", "bob").unwrap());
        assert!(panel.fields()[0].invalid());

        secrets.submit("Bob", "bob").unwrap();
        assert!(panel.fields()[0].ready);
    }

    #[test]
    fn test_sender_without_key_cannot_submit() {
        let (ctx, view, alice) = context(&[]);
        let panel = Panel::new(&REFUND, ctx);
        let stranger = KeyPair::from_phrase("Mallory").unwrap().account();

        assert!(panel.input("payer", &stranger.to_hex()).unwrap());
        assert!(panel.input("amount", "10").unwrap());
        assert!(panel.submission().is_some());
        assert!(!panel.can_submit());
        assert_eq!(panel.state(), PanelState::Editing);

        // The short form resolves to the same account.
        let mut next = (*view.get().unwrap()).clone();
        next.state.indices.push(alice);
        next.state.index_of.insert(alice, 0);
        view.set(Arc::new(next));
        panel.input("payer", &alice.to_hex()).unwrap();
        assert!(panel.can_submit());
    }
}
