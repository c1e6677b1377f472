use crate::client::ChainClient;
use crate::config::ConnectionConfig;
use clap::Parser;
use std::io::Write;

#[derive(Parser)]
#[command(name = "fetch-metadata", version, about = "Print the runtime metadata at some block as JSON.", long_about = None)]
pub struct Opts {
    /// URL of the node to connect to.
    /// Defaults to a public Polkadot RPC node if not given.
    #[arg(short, long)]
    url: Option<String>,

    /// Block number to fetch metadata from.
    #[arg(short, long)]
    block: u64,
}

pub async fn run(opts: Opts) -> anyhow::Result<()> {
    let config = ConnectionConfig::from_url(opts.url.as_deref());
    let client = ChainClient::connect(&config).await?;

    let block_hash = client.existing_block_hash(opts.block).await?;
    let metadata = client.metadata(block_hash).await?;

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &metadata)?;
    writeln!(stdout)?;
    Ok(())
}
