//! Generated wire types for the `bifrost.v1` protocol.

pub mod v1 {
    tonic::include_proto!("bifrost.v1");
}

/// Encoded file descriptor set, registered with the gRPC reflection
/// service by `bifrost-server`.
pub const FILE_DESCRIPTOR_SET: &[u8] =
    include_bytes!(concat!(env!("OUT_DIR"), "/descriptor.bin"));
