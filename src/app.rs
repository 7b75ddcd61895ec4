//! The application shell: a runtime-ready gate in front of the panel list

use crate::chain::types::{Balance, BlockNumber, RuntimeVersion};
use crate::chain::Chain;
use crate::crypto::AccountId;
use crate::panel::{Panel, PanelContext};
use crate::panels;
use crate::reactive::Signal;
use once_cell::sync::OnceCell;
use tracing::info;

/// What the heading bar shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub connected: bool,
    pub name: String,
    pub version: String,
    pub chain: String,
    pub runtime: RuntimeVersion,
    pub height: BlockNumber,
    pub lag: BlockNumber,
    pub authorities: Vec<AccountId>,
    pub total_issuance: Balance,
}

/// The chain queries behind the heading bar.
struct HeadQueries {
    height: Signal<BlockNumber>,
    lag: Signal<BlockNumber>,
    version: Signal<RuntimeVersion>,
    authorities: Signal<Vec<AccountId>>,
    total_issuance: Signal<Balance>,
}

impl HeadQueries {
    fn new(chain: &Chain) -> Self {
        HeadQueries {
            height: chain.height(),
            lag: chain.lag(),
            version: chain.version(),
            authorities: chain.authorities(),
            total_issuance: chain.total_issuance(),
        }
    }
}

pub struct App {
    ctx: PanelContext,
    ready: Signal<bool>,
    head: HeadQueries,
    panels: OnceCell<Vec<Panel>>,
}

impl App {
    pub fn new(ctx: PanelContext) -> Self {
        let ready = ctx.chain.runtime_up();
        let head = HeadQueries::new(&ctx.chain);
        App {
            ctx,
            ready,
            head,
            panels: OnceCell::new(),
        }
    }

    pub fn context(&self) -> &PanelContext {
        &self.ctx
    }

    pub fn is_ready(&self) -> bool {
        self.ready.get() == Some(true)
    }

    /// All panels in mount order; empty until the runtime is up. Panels are
    /// mounted the first time this is called on a ready runtime and kept.
    pub fn panels(&self) -> &[Panel] {
        if !self.is_ready() {
            return &[];
        }
        self.panels.get_or_init(|| {
            let mounted: Vec<Panel> = panels::ALL
                .iter()
                .map(|config| Panel::new(config, self.ctx.clone()))
                .collect();
            info!("Runtime is up, mounted {} panels", mounted.len());
            mounted
        })
    }

    pub fn visible_panels(&self) -> Vec<&Panel> {
        self.panels().iter().filter(|p| p.visible()).collect()
    }

    pub fn heading(&self) -> Option<Heading> {
        let status = self.ctx.chain.status().get()?;
        let head = &self.head;
        Some(Heading {
            connected: status.connected,
            name: status.name,
            version: status.version,
            chain: status.chain,
            runtime: head.version.get().unwrap_or_default(),
            height: head.height.get().unwrap_or_default(),
            lag: head.lag.get().unwrap_or_default(),
            authorities: head.authorities.get().unwrap_or_default(),
            total_issuance: head.total_issuance.get().unwrap_or_default(),
        })
    }
}
