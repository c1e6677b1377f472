use crate::binary_chopper::{BinaryChopper, Step};
use crate::client::ChainClient;
use crate::config::ConnectionConfig;
use clap::Parser;
use std::future::Future;
use std::io::Write;

#[derive(Parser)]
#[command(name = "find-spec-changes", version, about = "Find the blocks at which the runtime spec version changes.", long_about = None)]
pub struct Opts {
    /// URL of the node to connect to.
    /// Defaults to a public Polkadot RPC node if not given.
    #[arg(short, long)]
    url: Option<String>,
}

pub async fn run(opts: Opts) -> anyhow::Result<()> {
    let config = ConnectionConfig::from_url(opts.url.as_deref());
    let client = ChainClient::connect(&config).await?;

    let latest_block_number = client.latest_block_number().await?;
    let changes = spec_version_changes(latest_block_number, |n| spec_version(&client, n)).await?;

    let mut stdout = std::io::stdout().lock();
    for (block_number, spec_version) in changes {
        writeln!(stdout, "{block_number} {spec_version}")?;
    }
    Ok(())
}

async fn spec_version(client: &ChainClient, block_number: u64) -> anyhow::Result<u32> {
    let block_hash = client.existing_block_hash(block_number).await?;
    Ok(client.runtime_version(block_hash).await?.spec_version)
}

/// Every `(block_number, spec_version)` at which the spec version differs from the block
/// before it, between genesis and `latest_block_number`.
pub async fn spec_version_changes<F, Fut>(
    latest_block_number: u64,
    mut spec_version_at: F,
) -> anyhow::Result<Vec<(u64, u32)>>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = anyhow::Result<u32>>,
{
    let mut low = (0, spec_version_at(0).await?);
    let high = (latest_block_number, spec_version_at(latest_block_number).await?);
    tracing::info!(
        genesis_spec_version = low.1,
        latest_block_number,
        latest_spec_version = high.1,
        "searching for spec version changes"
    );

    let mut changes = vec![];
    while low.1 != high.1 {
        let mut chopper = BinaryChopper::new(low, high);
        let (before, after) = loop {
            match chopper.step() {
                Step::Probe(n) => chopper.record(spec_version_at(n).await?),
                Step::Done { before, after } => break (before, after),
            }
        };

        tracing::info!(
            block_number = after.0,
            from = before.1,
            to = after.1,
            "found spec version change"
        );
        changes.push(after);
        low = after;
    }

    Ok(changes)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::RefCell;

    #[tokio::test]
    async fn finds_each_block_where_the_version_changes() {
        let versions = [0, 0, 0, 0, 9, 9, 9, 10, 14, 14, 14, 14, 14, 15];
        let changes = spec_version_changes(versions.len() as u64 - 1, |n| {
            let v = versions[n as usize];
            async move { Ok(v) }
        })
        .await
        .unwrap();
        assert_eq!(changes, vec![(4, 9), (7, 10), (8, 14), (13, 15)]);
    }

    #[tokio::test]
    async fn unchanged_version_only_looks_at_both_ends() {
        let probed = RefCell::new(vec![]);
        let changes = spec_version_changes(1_000_000, |n| {
            probed.borrow_mut().push(n);
            async move { Ok(1) }
        })
        .await
        .unwrap();
        assert!(changes.is_empty());
        assert_eq!(*probed.borrow(), vec![0, 1_000_000]);
    }

    #[tokio::test]
    async fn lookup_errors_are_returned() {
        let err = spec_version_changes(100, |n| async move {
            if n == 50 {
                anyhow::bail!("Couldn't find block {n}")
            }
            Ok(if n < 70 { 1 } else { 2 })
        })
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Couldn't find block 50");
    }
}
