use bifrost_types::{RecordId, ServiceAddr, REPLICATION_FACTOR};

// ---------------------------------------------------------------------------
// RecordHasher trait
// The hash function is a seam: production code uses Md5Hasher, tests inject
// a table-driven fake to pin down the selection order.
// ---------------------------------------------------------------------------

pub trait RecordHasher: Send + Sync + 'static {
    /// Stable 64-bit score for a `(key, node)` pair. Higher wins placement.
    fn hash(&self, k: RecordId, node: &ServiceAddr) -> u64;
}

/// MD5-based scoring: digest of the 4-byte little-endian key followed by
/// the address bytes, folded to a u64 from the leading 8 digest bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Hasher;

impl Md5Hasher {
    pub fn new() -> Self {
        Md5Hasher
    }
}

impl RecordHasher for Md5Hasher {
    fn hash(&self, k: RecordId, node: &ServiceAddr) -> u64 {
        let mut buf = Vec::with_capacity(4 + node.as_bytes().len());
        buf.extend_from_slice(&k.to_le_bytes());
        buf.extend_from_slice(node.as_bytes());
        let digest = md5::compute(&buf);
        u64::from_be_bytes(digest.0[..8].try_into().expect("md5 digest is 16 bytes"))
    }
}

// ---------------------------------------------------------------------------
// NodesFinder: rendezvous (highest-random-weight) placement
// ---------------------------------------------------------------------------

/// Deterministic placement of a key onto an R-subset of a candidate set.
///
/// Rendezvous hashing: each candidate is scored independently, so removing
/// one node only remaps the keys that were placed on it. No ring, no
/// routing table.
#[derive(Debug, Clone)]
pub struct NodesFinder<H> {
    hasher: H,
}

impl<H: RecordHasher> NodesFinder<H> {
    pub fn new(hasher: H) -> Self {
        NodesFinder { hasher }
    }

    /// The `REPLICATION_FACTOR` candidates with the highest scores for `k`,
    /// ties broken by address. Candidates are sorted ascending by
    /// `(score, addr)` and the tail taken, so higher scores come last in
    /// the returned order. Fewer candidates than R → all of them.
    pub fn nodes_find(&self, k: RecordId, nodes: &[ServiceAddr]) -> Vec<ServiceAddr> {
        let mut scored: Vec<(u64, &ServiceAddr)> = nodes
            .iter()
            .map(|node| (self.hasher.hash(k, node), node))
            .collect();
        scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

        let skip = scored.len().saturating_sub(REPLICATION_FACTOR);
        scored[skip..].iter().map(|(_, node)| (*node).clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeHasher {
        hashes: HashMap<ServiceAddr, u64>,
    }

    impl FakeHasher {
        fn new(table: &[(&str, u64)]) -> Self {
            FakeHasher {
                hashes: table
                    .iter()
                    .map(|(addr, h)| (ServiceAddr::from(*addr), *h))
                    .collect(),
            }
        }
    }

    impl RecordHasher for FakeHasher {
        fn hash(&self, _k: RecordId, node: &ServiceAddr) -> u64 {
            *self.hashes.get(node).expect("unknown node in fake hasher")
        }
    }

    fn addrs(names: &[&str]) -> Vec<ServiceAddr> {
        names.iter().map(|n| ServiceAddr::from(*n)).collect()
    }

    #[test]
    fn picks_top_replication_factor() {
        let finder = NodesFinder::new(FakeHasher::new(&[
            ("node1", 1),
            ("node2", 2),
            ("node3", 3),
            ("node4", 4),
            ("node5", 5),
            ("node6", 6),
        ]));
        let nodes = addrs(&["node1", "node2", "node3", "node4", "node5", "node6"]);
        let got = finder.nodes_find(1, &nodes);
        assert_eq!(got, addrs(&["node4", "node5", "node6"]));
    }

    #[test]
    fn ties_break_by_address() {
        let finder = NodesFinder::new(FakeHasher::new(&[
            ("node1", 1),
            ("node2", 2),
            ("node3", 3),
            ("node4", 5),
            ("node5", 5),
            ("node6", 5),
        ]));
        let nodes = addrs(&["node1", "node2", "node3", "node4", "node5", "node6"]);
        let got = finder.nodes_find(1, &nodes);
        assert_eq!(got, addrs(&["node4", "node5", "node6"]));
    }

    #[test]
    fn fewer_candidates_than_replication_factor() {
        let finder = NodesFinder::new(FakeHasher::new(&[("node1", 1), ("node2", 2)]));
        let nodes = addrs(&["node1", "node2"]);
        let got = finder.nodes_find(1, &nodes);
        assert_eq!(got, addrs(&["node1", "node2"]));
    }

    #[test]
    fn input_order_is_irrelevant() {
        let table = [
            ("node1", 10),
            ("node2", 20),
            ("node3", 30),
            ("node4", 40),
            ("node5", 50),
        ];
        let finder = NodesFinder::new(FakeHasher::new(&table));
        let forward = addrs(&["node1", "node2", "node3", "node4", "node5"]);
        let reverse = addrs(&["node5", "node4", "node3", "node2", "node1"]);
        assert_eq!(finder.nodes_find(7, &forward), finder.nodes_find(7, &reverse));
    }

    #[test]
    fn md5_placement_is_deterministic() {
        let finder = NodesFinder::new(Md5Hasher::new());
        let nodes = addrs(&[
            "127.0.0.1:7321",
            "127.0.0.1:7322",
            "127.0.0.1:7323",
            "127.0.0.1:7324",
            "127.0.0.1:7325",
            "127.0.0.1:7326",
        ]);
        for k in 0..64u32 {
            let first = finder.nodes_find(k, &nodes);
            assert_eq!(first.len(), REPLICATION_FACTOR);
            for node in &first {
                assert!(nodes.contains(node));
            }
            assert_eq!(finder.nodes_find(k, &nodes), first);
        }
    }

    #[test]
    fn removing_a_node_only_remaps_its_keys() {
        let finder = NodesFinder::new(Md5Hasher::new());
        let all = addrs(&["a:1", "b:1", "c:1", "d:1", "e:1"]);
        let removed = ServiceAddr::from("c:1");
        let remaining: Vec<ServiceAddr> =
            all.iter().filter(|n| **n != removed).cloned().collect();

        for k in 0..256u32 {
            let before = finder.nodes_find(k, &all);
            let after = finder.nodes_find(k, &remaining);
            if !before.contains(&removed) {
                assert_eq!(before, after, "key {k} moved without losing a replica");
            }
        }
    }
}
