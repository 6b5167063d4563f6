mod router_service;
mod storage_service;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic_reflection::server::Builder as ReflectionBuilder;

use bifrost_placement::RecordHasher;
use bifrost_proto::v1::router_service_server::RouterServiceServer;
use bifrost_proto::v1::storage_service_server::StorageServiceServer;
use bifrost_router::Router;
use bifrost_types::Storage;

use router_service::RouterServiceImpl;
use storage_service::StorageServiceImpl;

/// Serve the storage protocol at `addr` over any `Storage` implementation
/// (a node's table or a front-end's quorum core).
pub async fn serve_storage<S: Storage>(addr: SocketAddr, storage: Arc<S>) -> anyhow::Result<()> {
    let reflection = ReflectionBuilder::configure()
        .register_encoded_file_descriptor_set(bifrost_proto::FILE_DESCRIPTOR_SET)
        .build_v1()
        .expect("failed to build reflection service");
    tracing::info!(%addr, "storage gRPC server starting");
    tonic::transport::Server::builder()
        .add_service(StorageServiceServer::new(StorageServiceImpl::new(storage)))
        .add_service(reflection)
        .serve(addr)
        .await
        .map_err(Into::into)
}

/// Serve the storage protocol on an already-bound listener. Used by the
/// integration harness to run on ephemeral ports.
pub async fn serve_storage_on<S: Storage>(
    listener: TcpListener,
    storage: Arc<S>,
) -> anyhow::Result<()> {
    tonic::transport::Server::builder()
        .add_service(StorageServiceServer::new(StorageServiceImpl::new(storage)))
        .serve_with_incoming(TcpListenerStream::new(listener))
        .await
        .map_err(Into::into)
}

/// Serve the router protocol at `addr`.
pub async fn serve_router<H: RecordHasher>(
    addr: SocketAddr,
    router: Arc<Router<H>>,
) -> anyhow::Result<()> {
    let reflection = ReflectionBuilder::configure()
        .register_encoded_file_descriptor_set(bifrost_proto::FILE_DESCRIPTOR_SET)
        .build_v1()
        .expect("failed to build reflection service");
    tracing::info!(%addr, "router gRPC server starting");
    tonic::transport::Server::builder()
        .add_service(RouterServiceServer::new(RouterServiceImpl::new(router)))
        .add_service(reflection)
        .serve(addr)
        .await
        .map_err(Into::into)
}

/// Serve the router protocol on an already-bound listener.
pub async fn serve_router_on<H: RecordHasher>(
    listener: TcpListener,
    router: Arc<Router<H>>,
) -> anyhow::Result<()> {
    tonic::transport::Server::builder()
        .add_service(RouterServiceServer::new(RouterServiceImpl::new(router)))
        .serve_with_incoming(TcpListenerStream::new(listener))
        .await
        .map_err(Into::into)
}
