pub mod client;
pub mod node;

pub use client::{GrpcStorageClient, StorageClient};
pub use node::{Node, NodeConfig};
