use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use bifrost_frontend::{Frontend, FrontendConfig};
use bifrost_placement::{Md5Hasher, NodesFinder};
use bifrost_router::{GrpcRouterClient, Router, RouterConfig};
use bifrost_server::{serve_router, serve_storage};
use bifrost_store::{GrpcStorageClient, Node, NodeConfig};
use bifrost_types::ServiceAddr;

#[derive(clap::Parser, Debug)]
#[command(name = "bifrostd", about = "Bifrost replicated KV daemon")]
struct Cli {
    /// Optional config file merged over the baked-in defaults.
    #[arg(long)]
    config: Option<std::path::PathBuf>,
    /// Override the listen address of the selected role.
    #[arg(long)]
    listen: Option<String>,
    #[command(subcommand)]
    role: Role,
}

#[derive(clap::Subcommand, Debug)]
enum Role {
    /// Run a storage node: in-memory table plus heartbeats to the router.
    Node,
    /// Run the router: liveness tracking and placement queries.
    Router,
    /// Run a front-end: quorum gateway speaking the storage protocol.
    Frontend,
}

#[derive(Debug, Deserialize)]
struct NodeSection {
    listen: String,
    router: String,
    heartbeat_ms: u64,
}

#[derive(Debug, Deserialize)]
struct RouterSection {
    listen: String,
    nodes: Vec<String>,
    forget_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
struct FrontendSection {
    listen: String,
    router: String,
}

#[derive(Debug, Deserialize)]
struct ObservabilityConfig {
    log_level: String,
    log_format: String,
}

#[derive(Debug, Deserialize)]
struct Config {
    node: NodeSection,
    router: RouterSection,
    frontend: FrontendSection,
    observability: ObservabilityConfig,
}

fn parse_listen(listen: &str) -> anyhow::Result<SocketAddr> {
    listen
        .parse()
        .with_context(|| format!("invalid listen address: {listen}"))
}

async fn run_node(cfg: NodeSection, listen: Option<String>) -> anyhow::Result<()> {
    let listen = listen.unwrap_or(cfg.listen);
    let addr = parse_listen(&listen)?;

    let node = Arc::new(Node::new(NodeConfig {
        addr: ServiceAddr::new(listen),
        router: ServiceAddr::new(cfg.router),
        heartbeat: Duration::from_millis(cfg.heartbeat_ms),
        client: GrpcRouterClient::new(),
    }));
    node.start_heartbeats();

    serve_storage(addr, node).await
}

async fn run_router(cfg: RouterSection, listen: Option<String>) -> anyhow::Result<()> {
    let listen = listen.unwrap_or(cfg.listen);
    let addr = parse_listen(&listen)?;

    let router = Router::new(
        RouterConfig {
            addr: ServiceAddr::new(listen),
            nodes: cfg.nodes.into_iter().map(ServiceAddr::from).collect(),
            forget_timeout: Duration::from_millis(cfg.forget_timeout_ms),
        },
        NodesFinder::new(Md5Hasher::new()),
    )
    .map_err(|err| anyhow::anyhow!("router construction failed: {err}"))?;

    serve_router(addr, Arc::new(router)).await
}

async fn run_frontend(cfg: FrontendSection, listen: Option<String>) -> anyhow::Result<()> {
    let listen = listen.unwrap_or(cfg.listen);
    let addr = parse_listen(&listen)?;

    let frontend = Arc::new(Frontend::new(FrontendConfig {
        addr: ServiceAddr::new(listen),
        router: ServiceAddr::new(cfg.router),
        node_client: GrpcStorageClient::new(),
        router_client: GrpcRouterClient::new(),
        finder: NodesFinder::new(Md5Hasher::new()),
    }));

    serve_storage(addr, frontend).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use clap::Parser;
    let cli = Cli::parse();

    let mut figment =
        Figment::new().merge(Toml::string(include_str!("../../../config/default.toml")));
    if let Some(ref config_path) = cli.config {
        figment = figment.merge(Toml::file_exact(config_path));
    }
    let config: Config = figment
        .merge(Env::prefixed("BIFROST_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    let filter = tracing_subscriber::EnvFilter::new(&config.observability.log_level);
    match config.observability.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt().json().with_env_filter(filter).init();
        }
        _ => {
            tracing_subscriber::fmt().pretty().with_env_filter(filter).init();
        }
    }

    tracing::info!(role = ?cli.role, "bifrostd starting");

    match cli.role {
        Role::Node => run_node(config.node, cli.listen).await,
        Role::Router => run_router(config.router, cli.listen).await,
        Role::Frontend => run_frontend(config.frontend, cli.listen).await,
    }
}
