use std::future::Future;

use tonic::transport::{Channel, Endpoint};

use bifrost_proto::v1::router_service_client::RouterServiceClient;
use bifrost_proto::v1::{HeartbeatRequest, ListRequest, NodesFindRequest};
use bifrost_types::{BifrostError, RecordId, ServiceAddr, RPC_TIMEOUT};

/// Client surface of the router service. The trait is the seam the node
/// and front-end are generic over; tests substitute fakes.
pub trait RouterClient: Send + Sync + 'static {
    /// Register `node` as alive with the router at `router`.
    fn heartbeat(&self, router: &ServiceAddr, node: &ServiceAddr)
        -> impl Future<Output = Result<(), BifrostError>> + Send;

    /// Liveness-filtered placement for `k`.
    fn nodes_find(&self, router: &ServiceAddr, k: RecordId)
        -> impl Future<Output = Result<Vec<ServiceAddr>, BifrostError>> + Send;

    /// The router's raw static node set.
    fn list(&self, router: &ServiceAddr)
        -> impl Future<Output = Result<Vec<ServiceAddr>, BifrostError>> + Send;
}

/// gRPC-backed router client. Dials per call; both the connect and the
/// request are bounded by `RPC_TIMEOUT`. Transport failures surface as
/// `Unknown` with the failure text as identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrpcRouterClient;

impl GrpcRouterClient {
    pub fn new() -> Self {
        GrpcRouterClient
    }

    async fn connect(addr: &ServiceAddr) -> Result<RouterServiceClient<Channel>, BifrostError> {
        let endpoint = Endpoint::from_shared(format!("http://{addr}"))
            .map_err(|e| BifrostError::Unknown(format!("invalid router address {addr}: {e}")))?
            .connect_timeout(RPC_TIMEOUT)
            .timeout(RPC_TIMEOUT);
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| BifrostError::Unknown(format!("error dialing {addr}: {e}")))?;
        Ok(RouterServiceClient::new(channel))
    }
}

impl RouterClient for GrpcRouterClient {
    async fn heartbeat(
        &self,
        router: &ServiceAddr,
        node: &ServiceAddr,
    ) -> Result<(), BifrostError> {
        tracing::debug!(%router, %node, "heartbeat request");
        let mut client = Self::connect(router).await?;
        let reply = client
            .heartbeat(HeartbeatRequest { node: node.to_string() })
            .await
            .map_err(|e| BifrostError::Unknown(format!("heartbeat rpc to {router}: {e}")))?
            .into_inner();
        match BifrostError::from_wire(reply.status, &reply.error) {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    async fn nodes_find(
        &self,
        router: &ServiceAddr,
        k: RecordId,
    ) -> Result<Vec<ServiceAddr>, BifrostError> {
        tracing::debug!(%router, key = k, "nodes_find request");
        let mut client = Self::connect(router).await?;
        let reply = client
            .nodes_find(NodesFindRequest { key: k })
            .await
            .map_err(|e| BifrostError::Unknown(format!("nodes_find rpc to {router}: {e}")))?
            .into_inner();
        match BifrostError::from_wire(reply.status, &reply.error) {
            None => Ok(reply.nodes.into_iter().map(ServiceAddr::from).collect()),
            Some(err) => Err(err),
        }
    }

    async fn list(&self, router: &ServiceAddr) -> Result<Vec<ServiceAddr>, BifrostError> {
        tracing::debug!(%router, "list request");
        let mut client = Self::connect(router).await?;
        let reply = client
            .list(ListRequest {})
            .await
            .map_err(|e| BifrostError::Unknown(format!("list rpc to {router}: {e}")))?
            .into_inner();
        match BifrostError::from_wire(reply.status, &reply.error) {
            None => Ok(reply.nodes.into_iter().map(ServiceAddr::from).collect()),
            Some(err) => Err(err),
        }
    }
}
