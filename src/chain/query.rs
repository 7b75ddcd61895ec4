//! Read-only reactive queries over the head of the chain
//!
//! Every query is a projection of the head snapshot signal, optionally
//! combined with a parameter signal (an account, a kitty id). Queries
//! recompute when either side changes and are not ready while either side is
//! not ready.

use super::state::ChainView;
use super::types::{
    AccountIndex, Auction, Balance, BlockNumber, Hash, Kitty, NodeStatus, RuntimeVersion,
};
use crate::crypto::AccountId;
use crate::reactive::{combine, Signal};

/// One row of the kitty listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KittyCard {
    pub kitty: Kitty,
    pub owner: Option<AccountId>,
    pub auction: Option<Auction>,
}

/// Handle to the chain as the front-end sees it.
#[derive(Clone)]
pub struct Chain {
    view: Signal<ChainView>,
    status: Signal<NodeStatus>,
}

impl Chain {
    pub fn new(view: Signal<ChainView>, status: Signal<NodeStatus>) -> Self {
        Chain { view, status }
    }

    pub fn view(&self) -> &Signal<ChainView> {
        &self.view
    }

    pub fn status(&self) -> &Signal<NodeStatus> {
        &self.status
    }

    /// True once the node is connected and a head snapshot is available.
    pub fn runtime_up(&self) -> Signal<bool> {
        combine(&self.status, &self.view.ready(), |status, has_view| {
            Some(status.connected && *has_view)
        })
    }

    /// Whether any of `names` is a module of the current runtime.
    pub fn has_any_module(&self, names: &'static [&'static str]) -> Signal<bool> {
        self.view
            .map(move |v| names.iter().any(|name| v.metadata.has_module(name)))
    }

    pub fn height(&self) -> Signal<BlockNumber> {
        self.view.map(|v| v.number)
    }

    pub fn lag(&self) -> Signal<BlockNumber> {
        self.view.map(|v| v.lag())
    }

    pub fn version(&self) -> Signal<RuntimeVersion> {
        self.view.map(|v| v.version.clone())
    }

    pub fn authorities(&self) -> Signal<Vec<AccountId>> {
        self.view.map(|v| v.authorities.clone())
    }

    pub fn total_issuance(&self) -> Signal<Balance> {
        self.view.map(|v| v.state.total_issuance)
    }

    pub fn all_kitties_count(&self) -> Signal<u64> {
        self.view.map(|v| v.state.kitties.all_kitties_count())
    }

    pub fn balance(&self, who: &Signal<AccountId>) -> Signal<Balance> {
        combine(&self.view, who, |v, who| Some(v.state.free_balance(who)))
    }

    pub fn account_nonce(&self, who: &Signal<AccountId>) -> Signal<u64> {
        combine(&self.view, who, |v, who| Some(v.state.account_nonce(who)))
    }

    /// The account's index, or a ready `None` when it has none yet.
    pub fn try_index(&self, who: &Signal<AccountId>) -> Signal<Option<AccountIndex>> {
        combine(&self.view, who, |v, who| Some(v.state.index_of(who)))
    }

    pub fn kitties(&self) -> Signal<Vec<KittyCard>> {
        self.view.map(|v| {
            v.state
                .kitties
                .all
                .iter()
                .filter_map(|id| card(v, id))
                .collect()
        })
    }

    /// Not ready when the kitty is not up for auction.
    pub fn auction(&self, kitty: &Signal<Hash>) -> Signal<Auction> {
        combine(&self.view, kitty, |v, id| v.state.kitties.auction(id).cloned())
    }
}

fn card(view: &ChainView, id: &Hash) -> Option<KittyCard> {
    let kitties = &view.state.kitties;
    Some(KittyCard {
        kitty: kitties.kitty(id)?.clone(),
        owner: kitties.owner_of(id),
        auction: kitties.auction(id).cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::state::ChainSnapshot;
    use crate::reactive::Cell;
    use std::sync::Arc;

    fn status(connected: bool) -> NodeStatus {
        NodeStatus {
            connected,
            name: "devnet".to_string(),
            version: "0.1.0".to_string(),
            chain: "Test".to_string(),
        }
    }

    #[test]
    fn test_runtime_up_needs_connection_and_view() {
        let view: Cell<ChainView> = Cell::new();
        let node = Cell::with(status(false));
        let chain = Chain::new(view.signal(), node.signal());
        let up = chain.runtime_up();

        assert_eq!(up.get(), None);
        view.set(Arc::new(ChainSnapshot::default()));
        assert_eq!(up.get(), Some(false));
        node.set(status(true));
        assert_eq!(up.get(), Some(true));
    }

    #[test]
    fn test_module_presence_follows_metadata() {
        let view: Cell<ChainView> = Cell::new();
        let node = Cell::with(status(true));
        let chain = Chain::new(view.signal(), node.signal());
        let upgradable = chain.has_any_module(&["sudo", "upgrade_key"]);

        assert_eq!(upgradable.get(), None);

        let mut snapshot = ChainSnapshot::default();
        snapshot.metadata.modules = vec!["balances".to_string()];
        view.set(Arc::new(snapshot.clone()));
        assert_eq!(upgradable.get(), Some(false));

        snapshot.metadata.modules.push("upgrade_key".to_string());
        view.set(Arc::new(snapshot));
        assert_eq!(upgradable.get(), Some(true));
    }

    #[test]
    fn test_balance_query_tracks_account_and_chain() {
        let alice = AccountId([1; 32]);
        let bob = AccountId([2; 32]);
        let mut snapshot = ChainSnapshot::default();
        snapshot.state.balances.insert(alice, 100);

        let view = Cell::with(Arc::new(snapshot.clone()));
        let node = Cell::with(status(true));
        let chain = Chain::new(view.signal(), node.signal());

        let who: Cell<AccountId> = Cell::new();
        let balance = chain.balance(&who.signal());
        assert_eq!(balance.get(), None);

        who.set(alice);
        assert_eq!(balance.get(), Some(100));
        who.set(bob);
        assert_eq!(balance.get(), Some(0));

        snapshot.state.balances.insert(bob, 7);
        view.set(Arc::new(snapshot));
        assert_eq!(balance.get(), Some(7));
    }

    #[test]
    fn test_head_queries_follow_snapshot() {
        let view: Cell<ChainView> = Cell::new();
        let node = Cell::with(status(true));
        let chain = Chain::new(view.signal(), node.signal());
        let (height, lag, issuance) = (chain.height(), chain.lag(), chain.total_issuance());
        let count = chain.all_kitties_count();
        assert_eq!(height.get(), None);
        assert_eq!(count.get(), None);

        let mut snapshot = ChainSnapshot {
            number: 12,
            finalized: 10,
            ..Default::default()
        };
        snapshot.state.total_issuance = 900;
        snapshot.state.kitties.all.push(Hash::of(b"kitty"));
        view.set(Arc::new(snapshot));

        assert_eq!(height.get(), Some(12));
        assert_eq!(lag.get(), Some(2));
        assert_eq!(issuance.get(), Some(900));
        assert_eq!(count.get(), Some(1));
        assert_eq!(chain.version().get().map(|v| v.spec_version), Some(1));
        assert_eq!(chain.authorities().get(), Some(Vec::new()));
    }
}
