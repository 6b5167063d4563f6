pub mod client;
pub mod router;

pub use client::{GrpcRouterClient, RouterClient};
pub use router::{Router, RouterConfig};
