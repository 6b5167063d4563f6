use std::io::Write;

use bifrost_store::{GrpcStorageClient, StorageClient};
use bifrost_types::ServiceAddr;

#[derive(clap::Args, Debug)]
struct Target {
    /// Address to send the request to (e.g. 127.0.0.1:7319).
    #[arg(short = 's', value_name = "addr")]
    addr: String,
    /// Record key.
    #[arg(short = 'k', value_name = "key")]
    key: u32,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Store a value under a key that does not exist yet.
    Put {
        #[command(flatten)]
        target: Target,
        /// Value to store.
        #[arg(short = 'v', value_name = "val", default_value = "")]
        value: String,
    },
    /// Retrieve the value for a key and print it to stdout.
    Get {
        #[command(flatten)]
        target: Target,
    },
    /// Delete the record for a key.
    Del {
        #[command(flatten)]
        target: Target,
    },
}

#[derive(clap::Parser, Debug)]
#[command(name = "bkv", about = "Single-command client for the Bifrost KV store")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() {
    use clap::Parser;
    let cli = Cli::parse();
    let client = GrpcStorageClient::new();

    let result = match cli.command {
        Command::Put { target, value } => {
            let addr = ServiceAddr::new(target.addr);
            client
                .put(&addr, target.key, value.into_bytes())
                .await
                .map_err(|err| format!("error putting record: {err}"))
        }
        Command::Get { target } => {
            let addr = ServiceAddr::new(target.addr);
            match client.get(&addr, target.key).await {
                Ok(data) => {
                    let mut stdout = std::io::stdout();
                    stdout.write_all(&data).and_then(|_| stdout.write_all(b"\n")).ok();
                    Ok(())
                }
                Err(err) => Err(format!("error getting record: {err}")),
            }
        }
        Command::Del { target } => {
            let addr = ServiceAddr::new(target.addr);
            client
                .del(&addr, target.key)
                .await
                .map_err(|err| format!("error deleting record: {err}"))
        }
    };

    if let Err(message) = result {
        eprintln!("{message}");
        std::process::exit(1);
    }
}
