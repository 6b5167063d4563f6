use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Number of nodes a record is placed on.
pub const REPLICATION_FACTOR: usize = 3;
/// Minimum number of agreeing replica outcomes for a client-visible result.
pub const MIN_REDUNDANCY: usize = 2;
/// Per-call deadline for every outbound RPC.
pub const RPC_TIMEOUT: Duration = Duration::from_secs(3);
/// Delay between retries of the front-end's one-shot `List` bootstrap.
pub const BOOTSTRAP_RETRY: Duration = Duration::from_millis(100);

/// Key space of the store.
pub type RecordId = u32;

/// Opaque address of a service endpoint (node, router, or front-end).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ServiceAddr(String);

impl ServiceAddr {
    pub fn new(addr: impl Into<String>) -> Self {
        ServiceAddr(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for ServiceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceAddr {
    fn from(addr: &str) -> Self {
        ServiceAddr(addr.to_string())
    }
}

impl From<String> for ServiceAddr {
    fn from(addr: String) -> Self {
        ServiceAddr(addr)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BifrostError {
    #[error("quorum not reached")]
    QuorumNotReached,
    #[error("not enough daemons available")]
    NotEnoughDaemons,
    #[error("unknown daemon")]
    UnknownDaemon,
    #[error("record not found")]
    RecordNotFound,
    #[error("record already exists")]
    RecordExists,
    /// Transport or server failure carried as a free-form message. The
    /// message is the error's identity for quorum tallying.
    #[error("{0}")]
    Unknown(String),
}

/// Wire status codes. Semantic outcomes ride this field in every reply;
/// handlers never surface them as transport-level errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum StatusCode {
    Ok = 0,
    QuorumNotReached = 1,
    NotEnoughDaemons = 2,
    UnknownDaemon = 3,
    RecordNotFound = 4,
    RecordExists = 5,
    Unknown = 6,
}

impl StatusCode {
    pub fn from_i32(raw: i32) -> StatusCode {
        match raw {
            0 => StatusCode::Ok,
            1 => StatusCode::QuorumNotReached,
            2 => StatusCode::NotEnoughDaemons,
            3 => StatusCode::UnknownDaemon,
            4 => StatusCode::RecordNotFound,
            5 => StatusCode::RecordExists,
            _ => StatusCode::Unknown,
        }
    }
}

impl BifrostError {
    pub fn status(&self) -> StatusCode {
        match self {
            BifrostError::QuorumNotReached => StatusCode::QuorumNotReached,
            BifrostError::NotEnoughDaemons => StatusCode::NotEnoughDaemons,
            BifrostError::UnknownDaemon => StatusCode::UnknownDaemon,
            BifrostError::RecordNotFound => StatusCode::RecordNotFound,
            BifrostError::RecordExists => StatusCode::RecordExists,
            BifrostError::Unknown(_) => StatusCode::Unknown,
        }
    }

    /// Rebuild the typed error from a wire `(status, error)` pair.
    /// `Ok` yields `None`; an unrecognized status carries the free-form
    /// message so distinct server failures keep distinct identities.
    pub fn from_wire(status: i32, message: &str) -> Option<BifrostError> {
        match StatusCode::from_i32(status) {
            StatusCode::Ok => None,
            StatusCode::QuorumNotReached => Some(BifrostError::QuorumNotReached),
            StatusCode::NotEnoughDaemons => Some(BifrostError::NotEnoughDaemons),
            StatusCode::UnknownDaemon => Some(BifrostError::UnknownDaemon),
            StatusCode::RecordNotFound => Some(BifrostError::RecordNotFound),
            StatusCode::RecordExists => Some(BifrostError::RecordExists),
            StatusCode::Unknown => Some(BifrostError::Unknown(message.to_string())),
        }
    }
}

/// The single-key operation surface shared by a storage node and a
/// front-end: both are served over the same storage protocol.
///
/// Methods use RPITIT (`-> impl Future + Send`) so implementations stay
/// free of any `async-trait` dependency; the explicit `+ Send` bound lets
/// generic callers `.await` across thread boundaries.
pub trait Storage: Send + Sync + 'static {
    /// Install a record if no record exists for `k`; otherwise
    /// `RecordExists`.
    fn put(&self, k: RecordId, d: Vec<u8>)
        -> impl Future<Output = Result<(), BifrostError>> + Send;

    /// Return a copy of the record for `k`, or `RecordNotFound`.
    fn get(&self, k: RecordId)
        -> impl Future<Output = Result<Vec<u8>, BifrostError>> + Send;

    /// Remove the record for `k` if one exists; otherwise `RecordNotFound`.
    fn del(&self, k: RecordId)
        -> impl Future<Output = Result<(), BifrostError>> + Send;
}
