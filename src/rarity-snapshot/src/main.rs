use std::time::Duration;

use clap::Parser;
use eth_rpc_client::reqwest::ReqwestClient;
use eth_rpc_client::EthJsonRpcClient;
use rarity_snapshot::contract::{parse_address, RarityContract};
use rarity_snapshot::fetcher::{QueryRange, RarityFetcher};
use rarity_snapshot::report::{self, RarityCatalog};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const PACKAGE: &str = env!("CARGO_PKG_NAME");

/// Simple CLI program for snapshotting per-token rarities
#[derive(Parser, Debug)]
#[clap(
    version = VERSION,
    about = "A tool to read per-token rarities from a tiers contract and prepare a batched write"
)]
struct Args {
    /// The JSON-RPC URL of the network endpoint
    #[arg(long = "rpc-url", short('u'))]
    rpc_url: String,

    /// Address of the rarity tiers contract
    #[arg(long = "contract", short('c'))]
    contract: String,

    /// First token id to query
    #[arg(long, short('s'), default_value = "1")]
    start_token: u64,

    /// Last token id to query (inclusive)
    #[arg(long, short('e'), default_value = "500")]
    end_token: u64,

    /// Max number of in-flight reads per batch
    #[arg(long, default_value = "50")]
    batch_size: usize,

    /// Per-read timeout in seconds
    #[arg(long, default_value = "10")]
    read_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    init_logger()?;
    let args = Args::parse();

    log::info!("{PACKAGE}");
    log::info!("----------------------");
    log::info!("- rpc-url: {}", args.rpc_url);
    log::info!("- contract: {}", args.contract);
    log::info!("- start-token: {}", args.start_token);
    log::info!("- end-token: {}", args.end_token);
    log::info!("- batch-size: {}", args.batch_size);
    log::info!("- read-timeout-secs: {}", args.read_timeout_secs);
    log::info!("----------------------");

    let contract_address = parse_address(&args.contract)?;
    let range = QueryRange::new(args.start_token, args.end_token, args.batch_size)?;

    let client = EthJsonRpcClient::new(ReqwestClient::new(args.rpc_url.clone()));
    let chain_id = client.get_chain_id().await?;
    log::info!("connected to chain {chain_id}");

    let contract = RarityContract::new(client, contract_address);
    let fetcher = RarityFetcher::new(contract, Duration::from_secs(args.read_timeout_secs));

    let results = fetcher.collect(&range).await;

    report::print_report(&results, &range, &RarityCatalog::default());

    Ok(())
}

fn init_logger() -> anyhow::Result<()> {
    env_logger::init();

    Ok(())
}
