use std::future::Future;

use tonic::transport::{Channel, Endpoint};

use bifrost_proto::v1::storage_service_client::StorageServiceClient;
use bifrost_proto::v1::{DelRequest, GetRequest, PutRequest};
use bifrost_types::{BifrostError, RecordId, ServiceAddr, RPC_TIMEOUT};

/// Client surface of the storage protocol, addressed per call so one
/// client value can talk to any node or front-end. The front-end is
/// generic over this trait; tests substitute fakes.
pub trait StorageClient: Send + Sync + 'static {
    fn put(&self, node: &ServiceAddr, k: RecordId, d: Vec<u8>)
        -> impl Future<Output = Result<(), BifrostError>> + Send;

    fn get(&self, node: &ServiceAddr, k: RecordId)
        -> impl Future<Output = Result<Vec<u8>, BifrostError>> + Send;

    fn del(&self, node: &ServiceAddr, k: RecordId)
        -> impl Future<Output = Result<(), BifrostError>> + Send;
}

/// gRPC-backed storage client. Dials per call; both the connect and the
/// request are bounded by `RPC_TIMEOUT`. Transport failures surface as
/// `Unknown` with the failure text as identity, so the front-end's
/// majority-error rule can tally them.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrpcStorageClient;

impl GrpcStorageClient {
    pub fn new() -> Self {
        GrpcStorageClient
    }

    async fn connect(addr: &ServiceAddr) -> Result<StorageServiceClient<Channel>, BifrostError> {
        let endpoint = Endpoint::from_shared(format!("http://{addr}"))
            .map_err(|e| BifrostError::Unknown(format!("invalid node address {addr}: {e}")))?
            .connect_timeout(RPC_TIMEOUT)
            .timeout(RPC_TIMEOUT);
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| BifrostError::Unknown(format!("error dialing {addr}: {e}")))?;
        Ok(StorageServiceClient::new(channel))
    }
}

impl StorageClient for GrpcStorageClient {
    async fn put(
        &self,
        node: &ServiceAddr,
        k: RecordId,
        d: Vec<u8>,
    ) -> Result<(), BifrostError> {
        tracing::debug!(%node, key = k, "put request");
        let mut client = Self::connect(node).await?;
        let reply = client
            .put(PutRequest { key: k, data: d })
            .await
            .map_err(|e| BifrostError::Unknown(format!("put rpc to {node}: {e}")))?
            .into_inner();
        match BifrostError::from_wire(reply.status, &reply.error) {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    async fn get(&self, node: &ServiceAddr, k: RecordId) -> Result<Vec<u8>, BifrostError> {
        tracing::debug!(%node, key = k, "get request");
        let mut client = Self::connect(node).await?;
        let reply = client
            .get(GetRequest { key: k })
            .await
            .map_err(|e| BifrostError::Unknown(format!("get rpc to {node}: {e}")))?
            .into_inner();
        match BifrostError::from_wire(reply.status, &reply.error) {
            None => Ok(reply.data),
            Some(err) => Err(err),
        }
    }

    async fn del(&self, node: &ServiceAddr, k: RecordId) -> Result<(), BifrostError> {
        tracing::debug!(%node, key = k, "del request");
        let mut client = Self::connect(node).await?;
        let reply = client
            .del(DelRequest { key: k })
            .await
            .map_err(|e| BifrostError::Unknown(format!("del rpc to {node}: {e}")))?
            .into_inner();
        match BifrostError::from_wire(reply.status, &reply.error) {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }
}
