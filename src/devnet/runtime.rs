//! Call dispatch for the devnet runtime
//!
//! Every extrinsic runs against a scratch copy of the state. A failed
//! dispatch leaves the state (and the events) untouched; the nonce bump
//! happens outside, so it sticks either way.

use crate::chain::call::{BalancesCall, Call, ConsensusCall, SudoCall, UpgradeKeyCall};
use crate::chain::state::RuntimeState;
use crate::chain::types::{Balance, BlockNumber, Event, Hash, SenderRef};
use crate::config::UpgradeModule;
use crate::crypto::AccountId;
use crate::error::{ensure, KittyError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Signed(AccountId),
    Root,
}

/// Per-block inputs to the runtime.
#[derive(Debug, Clone)]
pub struct BlockEnv {
    pub number: BlockNumber,
    pub random_seed: Hash,
    pub auction_period: u64,
    pub auction_period_limit: u64,
}

impl BlockEnv {
    pub fn new(number: BlockNumber, parent_hash: &Hash, auction_period: u64, auction_period_limit: u64) -> Self {
        let mut seed = parent_hash.0.to_vec();
        seed.extend_from_slice(&number.to_le_bytes());
        BlockEnv {
            number,
            random_seed: Hash::of(&seed),
            auction_period,
            auction_period_limit,
        }
    }
}

/// Mutable view of the state while executing one call.
pub struct Ext<'a> {
    pub(super) state: &'a mut RuntimeState,
    pub(super) env: &'a BlockEnv,
    pub(super) events: Vec<Event>,
}

/// Execute `call`, committing its effects only when it succeeds.
pub fn apply_call(
    state: &mut RuntimeState,
    env: &BlockEnv,
    origin: Origin,
    call: Call,
) -> (Result<()>, Vec<Event>) {
    let mut scratch = state.clone();
    let mut ext = Ext::new(&mut scratch, env);
    let result = ext.dispatch(origin, call);
    let events = std::mem::take(&mut ext.events);

    match result {
        Ok(()) => {
            *state = scratch;
            (Ok(()), events)
        }
        Err(e) => (Err(e), Vec::new()),
    }
}

/// End-of-block housekeeping: settles auctions that expire in this block.
pub fn on_finalize(state: &mut RuntimeState, env: &BlockEnv) -> Vec<Event> {
    let mut ext = Ext::new(state, env);
    ext.settle_auctions();
    ext.events
}

/// Endow `accounts` and hand the upgrade key to the first one.
pub fn build_genesis(accounts: &[AccountId], endowment: Balance, module: UpgradeModule) -> RuntimeState {
    let mut state = RuntimeState::default();
    {
        let env = BlockEnv::new(0, &Hash::default(), 1, 1);
        let mut ext = Ext::new(&mut state, &env);
        for account in accounts {
            ext.deposit(account, endowment);
        }
    }
    if let Some(first) = accounts.first() {
        match module {
            UpgradeModule::Sudo => state.sudo_key = Some(*first),
            UpgradeModule::UpgradeKey => state.upgrade_key = Some(*first),
        }
    }
    state
}

fn ensure_signed(origin: &Origin) -> Result<AccountId> {
    match origin {
        Origin::Signed(who) => Ok(*who),
        Origin::Root => Err(KittyError::Dispatch("Bad origin: expected a signed origin")),
    }
}

fn ensure_root(origin: &Origin) -> Result<()> {
    match origin {
        Origin::Root => Ok(()),
        Origin::Signed(_) => Err(KittyError::Dispatch("Bad origin: expected root")),
    }
}

impl<'a> Ext<'a> {
    pub fn new(state: &'a mut RuntimeState, env: &'a BlockEnv) -> Self {
        Ext {
            state,
            env,
            events: Vec::new(),
        }
    }

    pub(super) fn deposit_event(&mut self, event: Event) {
        self.events.push(event);
    }

    fn dispatch(&mut self, origin: Origin, call: Call) -> Result<()> {
        match call {
            Call::Balances(BalancesCall::Transfer { dest, value }) => {
                let from = ensure_signed(&origin)?;
                let to = self.lookup(&dest)?;
                self.transfer(&from, &to, value)
            }
            Call::Kitties(call) => {
                let sender = ensure_signed(&origin)?;
                self.dispatch_kitties(sender, call)
            }
            Call::Sudo(SudoCall::Sudo(inner)) => {
                let sender = ensure_signed(&origin)?;
                let key = self
                    .state
                    .sudo_key
                    .ok_or(KittyError::Dispatch("The sudo module is not present"))?;
                ensure(sender == key, "Only the sudo key can sudo")?;
                self.dispatch(Origin::Root, *inner)
            }
            Call::Sudo(SudoCall::SetKey(new)) => {
                let sender = ensure_signed(&origin)?;
                let key = self
                    .state
                    .sudo_key
                    .ok_or(KittyError::Dispatch("The sudo module is not present"))?;
                ensure(sender == key, "Only the sudo key can change the sudo key")?;
                self.state.sudo_key = Some(new);
                self.deposit_event(Event::KeyChanged(new));
                Ok(())
            }
            Call::Consensus(ConsensusCall::SetCode(code)) => {
                ensure_root(&origin)?;
                self.set_code(&code)
            }
            Call::Consensus(ConsensusCall::SetStorage(items)) => {
                ensure_root(&origin)?;
                let count = items.len();
                for (key, value) in items {
                    self.state.storage.insert(key, value);
                }
                self.deposit_event(Event::StorageSet(count));
                Ok(())
            }
            Call::UpgradeKey(UpgradeKeyCall::Upgrade(code)) => {
                let sender = ensure_signed(&origin)?;
                let key = self
                    .state
                    .upgrade_key
                    .ok_or(KittyError::Dispatch("The upgrade_key module is not present"))?;
                ensure(sender == key, "Only the upgrade key can upgrade")?;
                self.set_code(&code)
            }
        }
    }

    fn set_code(&mut self, code: &[u8]) -> Result<()> {
        ensure(!code.is_empty(), "Runtime code must not be empty")?;
        let hash = Hash::of(code);
        self.state.code_hash = hash;
        self.deposit_event(Event::CodeUpdated(hash));
        Ok(())
    }

    fn lookup(&self, who: &SenderRef) -> Result<AccountId> {
        self.state
            .resolve(who)
            .ok_or(KittyError::Dispatch("Unknown account index"))
    }

    /// Give `who` an index the first time it is seen.
    fn ensure_indexed(&mut self, who: &AccountId) {
        if self.state.index_of(who).is_none() {
            let index = self.state.indices.len() as u32;
            self.state.indices.push(*who);
            self.state.index_of.insert(*who, index);
            self.deposit_event(Event::NewAccountIndex(*who, index));
        }
    }

    /// Mint `amount` into `who`'s free balance.
    fn deposit(&mut self, who: &AccountId, amount: Balance) {
        *self.state.balances.entry(*who).or_insert(0) += amount;
        self.state.total_issuance = self.state.total_issuance.saturating_add(amount);
        self.ensure_indexed(who);
    }

    pub(super) fn transfer(&mut self, from: &AccountId, to: &AccountId, value: Balance) -> Result<()> {
        let free = self.state.free_balance(from);
        ensure(free >= value, "Balance too low to send value")?;
        if from != to {
            self.state.balances.insert(*from, free - value);
            let to_free = self.state.free_balance(to);
            let credited = to_free
                .checked_add(value)
                .ok_or(KittyError::Dispatch("Destination balance too high to receive value"))?;
            self.state.balances.insert(*to, credited);
            self.ensure_indexed(to);
        }
        self.deposit_event(Event::Transfer(*from, *to, value));
        Ok(())
    }

    pub(super) fn reserve(&mut self, who: &AccountId, amount: Balance) -> Result<()> {
        let free = self.state.free_balance(who);
        ensure(free >= amount, "Not enough free balance to reserve")?;
        self.state.balances.insert(*who, free - amount);
        *self.state.reserved.entry(*who).or_insert(0) += amount;
        Ok(())
    }

    pub(super) fn unreserve(&mut self, who: &AccountId, amount: Balance) {
        let moved = self.take_reserved(who, amount);
        *self.state.balances.entry(*who).or_insert(0) += moved;
    }

    /// Move reserved funds of `from` into the free balance of `to`.
    pub(super) fn repatriate_reserved(&mut self, from: &AccountId, to: &AccountId, amount: Balance) {
        let moved = self.take_reserved(from, amount);
        *self.state.balances.entry(*to).or_insert(0) += moved;
        self.ensure_indexed(to);
    }

    fn take_reserved(&mut self, who: &AccountId, amount: Balance) -> Balance {
        let reserved = self.state.reserved_balance(who);
        let moved = reserved.min(amount);
        if reserved == moved {
            self.state.reserved.remove(who);
        } else {
            self.state.reserved.insert(*who, reserved - moved);
        }
        moved
    }
}
