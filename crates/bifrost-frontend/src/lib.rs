use std::collections::HashMap;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::OnceCell;

use bifrost_placement::{NodesFinder, RecordHasher};
use bifrost_router::RouterClient;
use bifrost_store::StorageClient;
use bifrost_types::{
    BifrostError, RecordId, ServiceAddr, Storage, BOOTSTRAP_RETRY, MIN_REDUNDANCY,
};

pub struct FrontendConfig<NC, RC, H> {
    /// Address this front-end listens at.
    pub addr: ServiceAddr,
    /// Address of the router service.
    pub router: ServiceAddr,
    /// Client used to reach storage nodes.
    pub node_client: NC,
    /// Client used to reach the router.
    pub router_client: RC,
    /// Placement oracle for the self-directed read path.
    pub finder: NodesFinder<H>,
}

/// Stateless client-facing gateway implementing quorum writes and reads.
///
/// Writes are router-directed: the router decides which of the placed
/// replicas are currently alive. Reads are self-directed: placement runs
/// locally over a membership view fetched from the router exactly once,
/// and quorum masks whatever staleness that view accumulates.
pub struct Frontend<NC, RC, H> {
    cfg: FrontendConfig<NC, RC, H>,
    nodes: OnceCell<Vec<ServiceAddr>>,
}

impl<NC, RC, H> Frontend<NC, RC, H>
where
    NC: StorageClient,
    RC: RouterClient,
    H: RecordHasher,
{
    pub fn new(cfg: FrontendConfig<NC, RC, H>) -> Self {
        Frontend {
            cfg,
            nodes: OnceCell::new(),
        }
    }

    /// The membership view for the read path, fetched from the router on
    /// first use. `List` is issued at most once per retry tick and
    /// retried until it succeeds: a front-end with no view cannot serve
    /// reads. Concurrent first readers share a single initialization.
    async fn membership(&self) -> &[ServiceAddr] {
        self.nodes
            .get_or_init(|| async {
                loop {
                    match self.cfg.router_client.list(&self.cfg.router).await {
                        Ok(nodes) => return nodes,
                        Err(err) => {
                            tracing::warn!(
                                router = %self.cfg.router,
                                error = %err,
                                "membership bootstrap failed, retrying"
                            );
                            tokio::time::sleep(BOOTSTRAP_RETRY).await;
                        }
                    }
                }
            })
            .await
    }

    /// Nodes the router currently routes writes for `k` to. Router errors
    /// propagate unchanged; they are cluster conditions, not replica
    /// outcomes.
    async fn write_targets(&self, k: RecordId) -> Result<Vec<ServiceAddr>, BifrostError> {
        let nodes = self
            .cfg
            .router_client
            .nodes_find(&self.cfg.router, k)
            .await?;
        if nodes.len() < MIN_REDUNDANCY {
            return Err(BifrostError::NotEnoughDaemons);
        }
        Ok(nodes)
    }
}

/// Aggregate a completed write fan-out.
///
/// Success needs `MIN_REDUNDANCY` ok outcomes. Failing that, an error
/// seen from a majority of replicas is returned as the authoritative
/// outcome; errors bucket by message so heterogeneous transport failures
/// still tally. Anything else is a failed quorum.
fn check_outcomes(results: Vec<Result<(), BifrostError>>) -> Result<(), BifrostError> {
    let oks = results.iter().filter(|r| r.is_ok()).count();
    if oks >= MIN_REDUNDANCY {
        return Ok(());
    }

    let mut tally: HashMap<String, (BifrostError, usize)> = HashMap::new();
    for err in results.into_iter().filter_map(|r| r.err()) {
        let entry = tally.entry(err.to_string()).or_insert((err, 0));
        entry.1 += 1;
    }
    for (err, count) in tally.into_values() {
        if count >= MIN_REDUNDANCY {
            return Err(err);
        }
    }
    Err(BifrostError::QuorumNotReached)
}

impl<NC, RC, H> Storage for Frontend<NC, RC, H>
where
    NC: StorageClient,
    RC: RouterClient,
    H: RecordHasher,
{
    /// Quorum put. Fans out to every router-selected replica and waits
    /// for all of them: the aggregated error must reflect cluster truth
    /// (`RecordExists` comes back iff a majority already holds the key),
    /// so no early termination on the write path.
    async fn put(&self, k: RecordId, d: Vec<u8>) -> Result<(), BifrostError> {
        let nodes = self.write_targets(k).await?;

        let results = futures::future::join_all(nodes.iter().map(|node| {
            let d = d.clone();
            async move { self.cfg.node_client.put(node, k, d).await }
        }))
        .await;

        check_outcomes(results)
    }

    /// Quorum get with early termination: replies are consumed as they
    /// arrive and the first value (by byte equality) or error (by message
    /// identity) to reach `MIN_REDUNDANCY` wins. Any majority intersects
    /// any other, so later replies cannot change the outcome; in-flight
    /// requests are dropped.
    async fn get(&self, k: RecordId) -> Result<Vec<u8>, BifrostError> {
        let view = self.membership().await;

        let nodes = self.cfg.finder.nodes_find(k, view);
        if nodes.len() < MIN_REDUNDANCY {
            return Err(BifrostError::NotEnoughDaemons);
        }

        let mut in_flight: FuturesUnordered<_> = nodes
            .iter()
            .map(|node| self.cfg.node_client.get(node, k))
            .collect();

        let mut value_tally: HashMap<Vec<u8>, usize> = HashMap::new();
        let mut error_tally: HashMap<String, usize> = HashMap::new();

        while let Some(result) = in_flight.next().await {
            match result {
                Ok(data) => {
                    let count = value_tally.entry(data.clone()).or_insert(0);
                    *count += 1;
                    if *count >= MIN_REDUNDANCY {
                        return Ok(data);
                    }
                }
                Err(err) => {
                    let count = error_tally.entry(err.to_string()).or_insert(0);
                    *count += 1;
                    if *count >= MIN_REDUNDANCY {
                        return Err(err);
                    }
                }
            }
        }

        Err(BifrostError::QuorumNotReached)
    }

    /// Quorum del. Same fan-out and aggregation discipline as `put`.
    async fn del(&self, k: RecordId) -> Result<(), BifrostError> {
        let nodes = self.write_targets(k).await?;

        let results = futures::future::join_all(
            nodes
                .iter()
                .map(|node| async move { self.cfg.node_client.del(node, k).await }),
        )
        .await;

        check_outcomes(results)
    }
}
