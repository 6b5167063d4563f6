use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use bifrost_router::RouterClient;
use bifrost_types::{BifrostError, RecordId, ServiceAddr, Storage};

pub struct NodeConfig<C> {
    /// Address this node listens at; also the identity sent in heartbeats.
    pub addr: ServiceAddr,
    /// Address of the router service.
    pub router: ServiceAddr,
    /// Interval between two heartbeats.
    pub heartbeat: Duration,
    /// Client used to reach the router.
    pub client: C,
}

/// A storage node: the authoritative in-memory table for its share of the
/// key space, plus a background heartbeat loop towards the router.
///
/// The table uses reader-writer exclusion so concurrent reads do not
/// serialize. `get` hands out a copy; callers can never mutate stored
/// bytes through the return value.
pub struct Node<C> {
    cfg: NodeConfig<C>,
    store: RwLock<HashMap<RecordId, Vec<u8>>>,
    hb_stop: watch::Sender<bool>,
    hb_task: Mutex<Option<JoinHandle<()>>>,
}

impl<C: RouterClient + Clone> Node<C> {
    pub fn new(cfg: NodeConfig<C>) -> Self {
        let (hb_stop, _) = watch::channel(false);
        Node {
            cfg,
            store: RwLock::new(HashMap::new()),
            hb_stop,
            hb_task: Mutex::new(None),
        }
    }

    /// Spawns the heartbeat loop: one best-effort `Heartbeat` RPC per
    /// `cfg.heartbeat` tick, errors logged and discarded. The loop blocks
    /// on {tick, stop} only. Calling this twice is a no-op.
    pub fn start_heartbeats(&self) {
        let mut task = self.hb_task.lock().expect("heartbeat task lock poisoned");
        if task.is_some() {
            return;
        }

        let client = self.cfg.client.clone();
        let router = self.cfg.router.clone();
        let addr = self.cfg.addr.clone();
        let period = self.cfg.heartbeat;
        let mut stop = self.hb_stop.subscribe();

        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(err) = client.heartbeat(&router, &addr).await {
                            tracing::warn!(%router, error = %err, "heartbeat failed");
                        }
                    }
                    _ = stop.changed() => return,
                }
            }
        }));
    }

    /// Stops the heartbeat loop and waits for it to exit: once this
    /// returns, no further heartbeat RPC will be initiated. Idempotent.
    pub async fn stop(&self) {
        let _ = self.hb_stop.send(true);
        let task = self
            .hb_task
            .lock()
            .expect("heartbeat task lock poisoned")
            .take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

impl<C: RouterClient + Clone> Storage for Node<C> {
    async fn put(&self, k: RecordId, d: Vec<u8>) -> Result<(), BifrostError> {
        use std::collections::hash_map::Entry;
        let mut store = self.store.write().await;
        match store.entry(k) {
            Entry::Occupied(_) => Err(BifrostError::RecordExists),
            Entry::Vacant(slot) => {
                slot.insert(d);
                Ok(())
            }
        }
    }

    async fn get(&self, k: RecordId) -> Result<Vec<u8>, BifrostError> {
        let store = self.store.read().await;
        store.get(&k).cloned().ok_or(BifrostError::RecordNotFound)
    }

    async fn del(&self, k: RecordId) -> Result<(), BifrostError> {
        let mut store = self.store.write().await;
        match store.remove(&k) {
            Some(_) => Ok(()),
            None => Err(BifrostError::RecordNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    #[derive(Clone, Default)]
    struct FakeRouterClient {
        beats: Arc<Mutex<Vec<Instant>>>,
        stopped: Arc<AtomicBool>,
        fail_after_stop: bool,
    }

    impl RouterClient for FakeRouterClient {
        async fn heartbeat(
            &self,
            _router: &ServiceAddr,
            _node: &ServiceAddr,
        ) -> Result<(), BifrostError> {
            if self.fail_after_stop {
                assert!(
                    !self.stopped.load(Ordering::SeqCst),
                    "heartbeat after stop() returned"
                );
            }
            self.beats.lock().unwrap().push(Instant::now());
            Ok(())
        }

        async fn nodes_find(
            &self,
            _router: &ServiceAddr,
            _k: RecordId,
        ) -> Result<Vec<ServiceAddr>, BifrostError> {
            Ok(Vec::new())
        }

        async fn list(&self, _router: &ServiceAddr) -> Result<Vec<ServiceAddr>, BifrostError> {
            Ok(Vec::new())
        }
    }

    fn test_node(client: FakeRouterClient, heartbeat: Duration) -> Node<FakeRouterClient> {
        Node::new(NodeConfig {
            addr: "node-under-test".into(),
            router: "router".into(),
            heartbeat,
            client,
        })
    }

    #[tokio::test]
    async fn put_then_get_then_duplicate_put() {
        let node = test_node(FakeRouterClient::default(), Duration::from_secs(1));
        let key: RecordId = 1;
        let data = b"some data".to_vec();

        assert_eq!(node.get(key).await, Err(BifrostError::RecordNotFound));
        node.put(key, data.clone()).await.unwrap();
        assert_eq!(node.get(key).await.unwrap(), data);

        // A second put must fail without mutating the stored value.
        assert_eq!(
            node.put(key, b"other".to_vec()).await,
            Err(BifrostError::RecordExists)
        );
        assert_eq!(node.get(key).await.unwrap(), data);
    }

    #[tokio::test]
    async fn del_semantics() {
        let node = test_node(FakeRouterClient::default(), Duration::from_secs(1));
        let key: RecordId = 1;

        assert_eq!(node.del(key).await, Err(BifrostError::RecordNotFound));
        node.put(key, b"some data".to_vec()).await.unwrap();
        node.del(key).await.unwrap();
        assert_eq!(node.get(key).await, Err(BifrostError::RecordNotFound));
        assert_eq!(node.del(key).await, Err(BifrostError::RecordNotFound));
    }

    #[tokio::test]
    async fn get_returns_a_copy() {
        let node = test_node(FakeRouterClient::default(), Duration::from_secs(1));
        node.put(7, b"immutable".to_vec()).await.unwrap();

        let mut copy = node.get(7).await.unwrap();
        copy[0] = b'X';
        assert_eq!(node.get(7).await.unwrap(), b"immutable".to_vec());
    }

    #[tokio::test]
    async fn empty_value_is_storable() {
        let node = test_node(FakeRouterClient::default(), Duration::from_secs(1));
        node.put(3, Vec::new()).await.unwrap();
        assert_eq!(node.get(3).await.unwrap(), Vec::<u8>::new());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn parallel_ops_keep_records_consistent() {
        let node = Arc::new(test_node(FakeRouterClient::default(), Duration::from_secs(1)));
        const N: u32 = 100;

        let mut handles = Vec::new();
        for _ in 0..3 {
            let node = node.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..1000u32 {
                    let k = i % N;
                    let want = format!("data{k}").into_bytes();
                    let _ = node.put(k, want.clone()).await;
                    match node.get(k).await {
                        Ok(got) => assert_eq!(got, want),
                        Err(err) => assert_eq!(err, BifrostError::RecordNotFound),
                    }
                    match node.del(k).await {
                        Ok(()) => {}
                        Err(err) => assert_eq!(err, BifrostError::RecordNotFound),
                    }
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn heartbeats_fire_on_the_configured_interval() {
        let client = FakeRouterClient::default();
        let beats = client.beats.clone();
        let node = test_node(client, Duration::from_millis(50));

        node.start_heartbeats();
        tokio::time::sleep(Duration::from_millis(320)).await;
        node.stop().await;

        let beats = beats.lock().unwrap();
        // First tick is immediate, then one roughly every 50ms.
        assert!(beats.len() >= 4, "expected >= 4 heartbeats, got {}", beats.len());
        for pair in beats.windows(2) {
            let gap = pair[1].duration_since(pair[0]);
            assert!(gap < Duration::from_millis(150), "gap too long: {gap:?}");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_prevents_further_heartbeats() {
        let client = FakeRouterClient {
            fail_after_stop: true,
            ..FakeRouterClient::default()
        };
        let beats = client.beats.clone();
        let stopped = client.stopped.clone();
        let node = test_node(client, Duration::from_millis(50));

        node.start_heartbeats();
        tokio::time::sleep(Duration::from_millis(200)).await;
        node.stop().await;
        stopped.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(!beats.lock().unwrap().is_empty(), "no heartbeat was sent");
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_safe_without_start() {
        let node = test_node(FakeRouterClient::default(), Duration::from_millis(50));
        node.stop().await;

        node.start_heartbeats();
        node.stop().await;
        node.stop().await;
    }
}
