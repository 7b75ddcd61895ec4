//! Single-authority development node
//!
//! Owns the chain head, the transaction pool and the cells that publish the
//! head snapshot and the connection status. Mutations happen under the node
//! lock; cells are only written after the lock is released so subscribers can
//! call back into the node.

use super::block::Block;
use super::pool::{Pool, PoolEntry};
use super::runtime::{apply_call, build_genesis, on_finalize, BlockEnv, Origin};
use crate::chain::state::{ChainSnapshot, ChainView, RuntimeState};
use crate::chain::types::{Event, Hash, Metadata, NodeStatus, RuntimeVersion};
use crate::chain::Chain;
use crate::config::NodeConfig;
use crate::crypto::{AccountId, KeyPair};
use crate::error::{KittyError, Result};
use crate::persistence::Persistence;
use crate::reactive::{Cell, Signal};
use crate::tx::{Broadcast, TxStatus};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Genesis timestamp (2023-01-01T00:00:00Z).
const GENESIS_TIMESTAMP: u64 = 1_672_531_200_000;

pub const NODE_NAME: &str = "kittyboard-devnet";

type Notices = Vec<(Arc<Cell<TxStatus>>, TxStatus)>;

struct NodeInner {
    config: NodeConfig,
    head: Block,
    state: RuntimeState,
    genesis_hash: Hash,
    version: RuntimeVersion,
    authorities: Vec<AccountId>,
    events: Vec<Event>,
    pool: Pool,
}

#[derive(Clone)]
pub struct DevNode {
    inner: Arc<Mutex<NodeInner>>,
    view: Arc<Cell<ChainView>>,
    status: Arc<Cell<NodeStatus>>,
    persistence: Arc<dyn Persistence>,
}

/// Short reason shown to the user for a failed transaction.
fn reason(err: &KittyError) -> String {
    match err {
        KittyError::Dispatch(msg) => msg.to_string(),
        KittyError::InvalidTransaction(msg) => msg.clone(),
        other => other.to_string(),
    }
}

fn state_root(state: &RuntimeState) -> Result<Hash> {
    Ok(Hash::of(&bincode::serialize(state)?))
}

fn metadata_for(state: &RuntimeState) -> Metadata {
    let mut modules: Vec<String> = ["system", "timestamp", "consensus", "balances", "indices"]
        .iter()
        .map(|m| m.to_string())
        .collect();
    if state.sudo_key.is_some() {
        modules.push("sudo".to_string());
    }
    if state.upgrade_key.is_some() {
        modules.push("upgrade_key".to_string());
    }
    modules.push("substratekitties".to_string());
    Metadata { modules }
}

impl NodeInner {
    fn snapshot(&self) -> ChainView {
        let number = self.head.number();
        Arc::new(ChainSnapshot {
            number,
            finalized: number,
            best_hash: self.head.hash(),
            genesis_hash: self.genesis_hash,
            version: self.version.clone(),
            metadata: metadata_for(&self.state),
            authorities: self.authorities.clone(),
            state: self.state.clone(),
            events: self.events.clone(),
        })
    }

    fn author_block(&mut self, persistence: &dyn Persistence) -> Result<(ChainView, Notices)> {
        let number = self.head.number() + 1;
        let parent_hash = self.head.hash();
        let env = BlockEnv::new(
            number,
            &parent_hash,
            self.config.auction_period,
            self.config.auction_period_limit,
        );

        let mut state = self.state.clone();
        let mut events = Vec::new();
        let mut included = Vec::new();
        let mut finished: Vec<(PoolEntry, std::result::Result<(), String>)> = Vec::new();
        let mut notices: Notices = Vec::new();

        while let Some(entry) = self.pool.take_next(&state) {
            if !entry.era.is_valid_at(number) {
                notices.push((entry.status, TxStatus::Failed("Transaction is outdated".to_string())));
                continue;
            }
            *state.nonces.entry(entry.account).or_insert(0) += 1;

            let (result, call_events) = match entry.call.decode() {
                Ok(call) => {
                    debug!("Applying {} from {}", call.name(), entry.account.short());
                    apply_call(&mut state, &env, Origin::Signed(entry.account), call)
                }
                Err(e) => (Err(e), Vec::new()),
            };
            events.extend(call_events);

            let outcome = result.map_err(|e| {
                let reason = reason(&e);
                warn!("Extrinsic {} failed: {}", entry.hash.short(), reason);
                events.push(Event::ExtrinsicFailed(entry.hash, reason.clone()));
                reason
            });
            included.push(entry.bytes.clone());
            finished.push((entry, outcome));
        }

        events.extend(on_finalize(&mut state, &env));

        for (entry, why) in self.pool.prune(&state, number) {
            notices.push((entry.status, TxStatus::Failed(why.to_string())));
        }

        let upgrades = events
            .iter()
            .filter(|e| matches!(e, Event::CodeUpdated(_)))
            .count() as u32;
        let mut version = self.version.clone();
        version.spec_version += upgrades;

        let timestamp = (chrono::Utc::now().timestamp_millis() as u64).max(self.head.header.timestamp + 1);
        let block = Block::new(number, parent_hash, timestamp, included, state_root(&state)?);

        if let Err(e) = persistence.save_block(&block, &state, version.spec_version) {
            warn!("Failed to persist block #{}: {}", number, e);
        }

        info!(
            "Authored block #{} ({}) with {} extrinsics, {} pending",
            number,
            block.hash().short(),
            block.extrinsics.len(),
            self.pool.len()
        );
        if upgrades > 0 {
            info!("Runtime upgraded to spec version {}", version.spec_version);
        }

        self.head = block;
        self.state = state;
        self.version = version;
        self.events = events;

        for (entry, outcome) in finished {
            notices.push((
                entry.status,
                TxStatus::Finalized {
                    block: number,
                    hash: entry.hash,
                    outcome,
                },
            ));
        }
        Ok((self.snapshot(), notices))
    }
}

impl DevNode {
    /// Resume the chain stored in `persistence`, or start a new one from `config`.
    pub fn start(config: &NodeConfig, persistence: Box<dyn Persistence>) -> Result<Self> {
        let dev_accounts = config
            .dev_accounts
            .iter()
            .filter(|p| !p.trim().is_empty())
            .map(|p| KeyPair::from_phrase(p).map(|k| k.account()))
            .collect::<Result<Vec<_>>>()?;
        let authority = dev_accounts.first().copied().ok_or_else(|| {
            KittyError::ConfigError("At least one dev account is required".to_string())
        })?;

        let persistence: Arc<dyn Persistence> = Arc::from(persistence);
        let mut version = RuntimeVersion::default();

        let (head, state, genesis_hash) = match persistence.load_head()? {
            Some(stored) => {
                let genesis_hash = persistence
                    .load_block(0)?
                    .map(|b| b.hash())
                    .unwrap_or_else(|| stored.block.hash());
                version.spec_version = stored.spec_version;
                info!(
                    "Resumed chain at block #{} (spec version {})",
                    stored.block.number(),
                    stored.spec_version
                );
                (stored.block, stored.state, genesis_hash)
            }
            None => {
                let state = build_genesis(&dev_accounts, config.endowment, config.upgrade_module);
                let genesis = Block::new(0, Hash::default(), GENESIS_TIMESTAMP, Vec::new(), state_root(&state)?);
                persistence.save_block(&genesis, &state, version.spec_version)?;
                info!(
                    "Created genesis {} for '{}' with {} endowed accounts",
                    genesis.hash().short(),
                    config.chain_name,
                    dev_accounts.len()
                );
                let hash = genesis.hash();
                (genesis, state, hash)
            }
        };

        let inner = NodeInner {
            config: config.clone(),
            head,
            state,
            genesis_hash,
            version,
            authorities: vec![authority],
            events: Vec::new(),
            pool: Pool::default(),
        };

        let view = Cell::with(inner.snapshot());
        let status = Cell::with(NodeStatus {
            connected: true,
            name: NODE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            chain: config.chain_name.clone(),
        });

        Ok(DevNode {
            inner: Arc::new(Mutex::new(inner)),
            view: Arc::new(view),
            status: Arc::new(status),
            persistence,
        })
    }

    /// Client-side handle onto this node's head and status.
    pub fn chain(&self) -> Chain {
        Chain::new(self.view.signal(), self.status.signal())
    }

    pub fn head(&self) -> Option<ChainView> {
        self.view.get()
    }

    pub fn pending(&self) -> usize {
        self.inner.lock().pool.len()
    }

    pub fn is_idle(&self) -> bool {
        self.inner.lock().pool.is_empty()
    }

    pub fn set_connected(&self, connected: bool) {
        if let Some(mut status) = self.status.get() {
            status.connected = connected;
            self.status.set(status);
        }
    }

    /// Check an encoded extrinsic and queue it for the next block.
    ///
    /// `Ready` is published under the node lock so that it can never land
    /// after the transaction's final status.
    pub fn submit_extrinsic(&self, bytes: Vec<u8>) -> Signal<TxStatus> {
        let cell = Arc::new(Cell::with(TxStatus::Sending));
        let signal = cell.signal();

        let rejected = {
            let mut inner = self.inner.lock();
            let next_block = inner.head.number() + 1;
            let checked = inner
                .pool
                .check(bytes, &inner.state, &inner.genesis_hash, next_block, cell.clone());
            match checked {
                Ok(entry) => {
                    debug!("Pooled {} (nonce {})", entry.hash.short(), entry.nonce);
                    entry.status.set(TxStatus::Ready(entry.hash));
                    inner.pool.insert(entry);
                    None
                }
                Err((e, _)) => Some(e),
            }
        };

        if let Some(e) = rejected {
            warn!("Rejected transaction: {}", e);
            cell.set(TxStatus::Failed(reason(&e)));
        }
        signal
    }

    /// Build, execute and publish the next block.
    pub fn produce_block(&self) -> Result<ChainView> {
        let (view, notices) = {
            let mut inner = self.inner.lock();
            inner.author_block(self.persistence.as_ref())?
        };
        self.view.set(view.clone());
        for (cell, status) in notices {
            cell.set(status);
        }
        Ok(view)
    }

    /// Author a block every `block_time` until `shutdown` flips to true.
    pub async fn run(self, block_time: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(block_time);
        ticker.tick().await;
        info!("Block production started ({} ms)", block_time.as_millis());
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.produce_block() {
                        error!("Block production failed: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Block production stopped");
    }
}

impl Broadcast for DevNode {
    fn broadcast(&self, bytes: Vec<u8>) -> Signal<TxStatus> {
        self.submit_extrinsic(bytes)
    }
}
