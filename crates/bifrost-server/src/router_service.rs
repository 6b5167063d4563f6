use std::sync::Arc;

use tonic::{Request, Response, Status};

use bifrost_placement::RecordHasher;
use bifrost_proto::v1::router_service_server::RouterService;
use bifrost_proto::v1::{
    HeartbeatReply, HeartbeatRequest, ListReply, ListRequest, NodesFindReply, NodesFindRequest,
};
use bifrost_router::Router;
use bifrost_types::{ServiceAddr, StatusCode};

use crate::storage_service::wire_parts;

pub struct RouterServiceImpl<H> {
    router: Arc<Router<H>>,
}

impl<H: RecordHasher> RouterServiceImpl<H> {
    pub fn new(router: Arc<Router<H>>) -> Self {
        RouterServiceImpl { router }
    }
}

#[tonic::async_trait]
impl<H: RecordHasher> RouterService for RouterServiceImpl<H> {
    async fn heartbeat(
        &self,
        request: Request<HeartbeatRequest>,
    ) -> Result<Response<HeartbeatReply>, Status> {
        let req = request.into_inner();
        tracing::debug!(node = %req.node, "heartbeat request");

        let result = self.router.heartbeat(&ServiceAddr::from(req.node)).await;
        let (status, error) = wire_parts(result.err().as_ref());
        Ok(Response::new(HeartbeatReply { status, error }))
    }

    async fn nodes_find(
        &self,
        request: Request<NodesFindRequest>,
    ) -> Result<Response<NodesFindReply>, Status> {
        let req = request.into_inner();
        tracing::debug!(key = req.key, "nodes_find request");

        let (nodes, err) = match self.router.nodes_find(req.key).await {
            Ok(nodes) => (nodes, None),
            Err(err) => (Vec::new(), Some(err)),
        };
        let (status, error) = wire_parts(err.as_ref());
        Ok(Response::new(NodesFindReply {
            status,
            nodes: nodes.into_iter().map(|n| n.to_string()).collect(),
            error,
        }))
    }

    async fn list(&self, _request: Request<ListRequest>) -> Result<Response<ListReply>, Status> {
        tracing::debug!("list request");

        let nodes = self.router.list();
        Ok(Response::new(ListReply {
            status: StatusCode::Ok as i32,
            nodes: nodes.into_iter().map(|n| n.to_string()).collect(),
            error: String::new(),
        }))
    }
}
