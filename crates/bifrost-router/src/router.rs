use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use bifrost_placement::{NodesFinder, RecordHasher};
use bifrost_types::{
    BifrostError, RecordId, ServiceAddr, MIN_REDUNDANCY, REPLICATION_FACTOR,
};

pub struct RouterConfig {
    /// Address the router service listens at.
    pub addr: ServiceAddr,
    /// The static node set. Fixed for the lifetime of the process.
    pub nodes: Vec<ServiceAddr>,
    /// A node with no heartbeat within this window counts as down.
    pub forget_timeout: Duration,
}

/// Liveness bookkeeping and availability-filtered placement over a static
/// node set.
///
/// The liveness map's domain is exactly the configured node set and is
/// never extended at runtime; `None` means a node has never heartbeated
/// and is treated as expired.
pub struct Router<H> {
    cfg: RouterConfig,
    finder: NodesFinder<H>,
    activity: RwLock<HashMap<ServiceAddr, Option<Instant>>>,
}

impl<H: RecordHasher> Router<H> {
    /// Fails with `NotEnoughDaemons` when fewer than `REPLICATION_FACTOR`
    /// nodes are configured.
    pub fn new(cfg: RouterConfig, finder: NodesFinder<H>) -> Result<Self, BifrostError> {
        if cfg.nodes.len() < REPLICATION_FACTOR {
            return Err(BifrostError::NotEnoughDaemons);
        }
        let activity = cfg.nodes.iter().map(|node| (node.clone(), None)).collect();
        Ok(Router {
            cfg,
            finder,
            activity: RwLock::new(activity),
        })
    }

    /// Registers a liveness signal from `node`. `UnknownDaemon` for any
    /// address outside the static set.
    pub async fn heartbeat(&self, node: &ServiceAddr) -> Result<(), BifrostError> {
        let mut activity = self.activity.write().await;
        match activity.get_mut(node) {
            Some(last) => {
                *last = Some(Instant::now());
                Ok(())
            }
            None => Err(BifrostError::UnknownDaemon),
        }
    }

    /// Placement for `k` over the full static set, filtered down to nodes
    /// heard from within the forget timeout. Placement order is preserved.
    /// `NotEnoughDaemons` when fewer than `MIN_REDUNDANCY` survive.
    pub async fn nodes_find(&self, k: RecordId) -> Result<Vec<ServiceAddr>, BifrostError> {
        let placed = self.finder.nodes_find(k, &self.cfg.nodes);

        let now = Instant::now();
        let activity = self.activity.read().await;
        let available: Vec<ServiceAddr> = placed
            .into_iter()
            .filter(|node| match activity.get(node) {
                Some(Some(last)) => *last + self.cfg.forget_timeout >= now,
                _ => false,
            })
            .collect();
        drop(activity);

        if available.len() < MIN_REDUNDANCY {
            return Err(BifrostError::NotEnoughDaemons);
        }
        Ok(available)
    }

    /// The raw static node set, with no liveness filter. Front-ends seed
    /// their read-path placement universe from this exactly once and rely
    /// on quorum to mask nodes that are down.
    pub fn list(&self) -> Vec<ServiceAddr> {
        self.cfg.nodes.clone()
    }
}
