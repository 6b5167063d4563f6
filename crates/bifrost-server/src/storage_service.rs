use std::sync::Arc;

use tonic::{Request, Response, Status};

use bifrost_proto::v1::storage_service_server::StorageService;
use bifrost_proto::v1::{DelReply, DelRequest, GetReply, GetRequest, PutReply, PutRequest};
use bifrost_types::{BifrostError, StatusCode, Storage};

/// Serves the storage protocol over any `Storage` implementation: a node's
/// local table or a front-end's quorum fan-out.
pub struct StorageServiceImpl<S> {
    storage: Arc<S>,
}

impl<S: Storage> StorageServiceImpl<S> {
    pub fn new(storage: Arc<S>) -> Self {
        StorageServiceImpl { storage }
    }
}

/// Split an outcome into the in-band `(status, error)` reply fields.
/// Only `Unknown` carries its message; every other kind is fully
/// identified by the code.
pub(crate) fn wire_parts(err: Option<&BifrostError>) -> (i32, String) {
    match err {
        None => (StatusCode::Ok as i32, String::new()),
        Some(err) => {
            let status = err.status();
            let message = if status == StatusCode::Unknown {
                err.to_string()
            } else {
                String::new()
            };
            (status as i32, message)
        }
    }
}

#[tonic::async_trait]
impl<S: Storage> StorageService for StorageServiceImpl<S> {
    async fn put(&self, request: Request<PutRequest>) -> Result<Response<PutReply>, Status> {
        let req = request.into_inner();
        tracing::debug!(key = req.key, "put request");

        let result = self.storage.put(req.key, req.data).await;
        let (status, error) = wire_parts(result.err().as_ref());
        Ok(Response::new(PutReply { status, error }))
    }

    async fn get(&self, request: Request<GetRequest>) -> Result<Response<GetReply>, Status> {
        let req = request.into_inner();
        tracing::debug!(key = req.key, "get request");

        let (data, err) = match self.storage.get(req.key).await {
            Ok(data) => (data, None),
            Err(err) => (Vec::new(), Some(err)),
        };
        let (status, error) = wire_parts(err.as_ref());
        Ok(Response::new(GetReply { status, data, error }))
    }

    async fn del(&self, request: Request<DelRequest>) -> Result<Response<DelReply>, Status> {
        let req = request.into_inner();
        tracing::debug!(key = req.key, "del request");

        let result = self.storage.del(req.key).await;
        let (status, error) = wire_parts(result.err().as_ref());
        Ok(Response::new(DelReply { status, error }))
    }
}
