use crate::chain::{Chain, RpcChain};
use crate::config::ConnectionConfig;
use crate::decoding::load_historic_types;
use crate::decoding::storage_decoder::write_storage_keys;
use crate::decoding::storage_entries_list::{StorageEntry, StorageEntryKind};
use crate::entry::EntryName;
use crate::error::UsageError;
use crate::utils;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "decode-storage-items", version, about = "Decode a storage entry at some block: its value, or every key and value if it's a map.", long_about = None)]
pub struct Opts {
    /// URL of the node to connect to.
    /// Defaults to a public Polkadot RPC node if not given.
    #[arg(short, long)]
    url: Option<String>,

    /// Number of the block whose state we'll look at.
    #[arg(short, long)]
    block: u64,

    /// The storage entry to decode, eg `Babe.Authorities` or `System.Account`.
    #[arg(short, long)]
    entry: String,

    /// Historic type definitions, needed for blocks using pre-V14 metadata.
    #[arg(short, long)]
    types: Option<PathBuf>,
}

pub async fn run(opts: Opts) -> anyhow::Result<()> {
    // A badly formed entry never needs a connection to find out about.
    let name = EntryName::parse(&opts.entry)?;

    let historic_types = opts
        .types
        .as_deref()
        .map(load_historic_types)
        .transpose()?;
    let config = ConnectionConfig::from_url(opts.url.as_deref());
    let chain = RpcChain::connect(&config, historic_types).await?;

    let stdout = std::io::stdout().lock();
    decode_storage_item(&chain, opts.block, &name, stdout).await
}

/// Look up the named storage entry at some block and write it out. Maps print a line with
/// each key followed by a line with its value; plain entries print a single value line.
pub async fn decode_storage_item<C: Chain, W: Write>(
    chain: &C,
    block_number: u64,
    name: &EntryName,
    mut w: W,
) -> anyhow::Result<()> {
    let block_hash = chain.block_hash(block_number).await?;
    let entries = chain.storage_entries(block_hash).await?;
    let entry = find_entry(&entries, name)?;
    tracing::debug!(%entry, kind = ?entry.kind, "resolved storage entry");

    match entry.kind {
        StorageEntryKind::Map => {
            // Pairs are written out as they arrive rather than once the whole map is fetched.
            let count = chain
                .storage_map(entry, block_hash, |keys, value| {
                    write_storage_keys(&mut w, &keys)?;
                    writeln!(w)?;
                    utils::write_value(&mut w, &value)?;
                    writeln!(w)?;
                    Ok(())
                })
                .await?;
            tracing::debug!(%entry, count, "wrote storage map");
        }
        StorageEntryKind::Plain => match chain.storage_value(entry, block_hash).await? {
            Some(value) => {
                utils::write_value(&mut w, &value)?;
                writeln!(w)?;
            }
            None => writeln!(w, "None")?,
        },
    }

    w.flush()?;
    Ok(())
}

fn find_entry<'a>(entries: &'a [StorageEntry], name: &EntryName) -> Result<&'a StorageEntry, UsageError> {
    let mut pallet_entries = entries
        .iter()
        .filter(|e| name.matches_pallet(&e.pallet))
        .peekable();

    if pallet_entries.peek().is_none() {
        return Err(UsageError::UnknownPallet(name.pallet.clone()));
    }

    pallet_entries
        .find(|e| name.matches_entry(&e.entry))
        .ok_or_else(|| UsageError::UnknownEntry {
            pallet: name.pallet.clone(),
            entry: name.entry.clone(),
        })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::chain::mock::MockChain;
    use crate::decoding::storage_decoder::StorageKey;
    use frame_decode::storage::StorageHasher;
    use scale_value::Value;
    use subxt::utils::H256;

    fn value(v: Value<()>) -> Value<String> {
        v.map_context(|_| String::new())
    }

    fn entry(pallet: &str, name: &str, kind: StorageEntryKind) -> StorageEntry {
        StorageEntry {
            pallet: pallet.to_owned(),
            prefix: pallet.to_owned(),
            entry: name.to_owned(),
            kind,
            default_value: None,
        }
    }

    fn chain() -> MockChain {
        let mut chain = MockChain::default();
        chain.blocks.insert(10, (H256::repeat_byte(10), vec![]));
        chain.entries = vec![
            entry("Babe", "Authorities", StorageEntryKind::Plain),
            entry("Babe", "NextRandomness", StorageEntryKind::Plain),
            entry("Babe", "UnderConstruction", StorageEntryKind::Map),
            entry("TransactionPayment", "NextFeeMultiplier", StorageEntryKind::Plain),
        ];
        chain
    }

    fn account_key(n: u128) -> Vec<StorageKey> {
        vec![StorageKey {
            hash: vec![0; 8],
            value: Some(value(Value::u128(n))),
            hasher: StorageHasher::Twox64Concat,
        }]
    }

    async fn decode(chain: &MockChain, raw: &str) -> anyhow::Result<String> {
        let name = EntryName::parse(raw)?;
        let mut out = Vec::new();
        decode_storage_item(chain, 10, &name, &mut out).await?;
        Ok(String::from_utf8(out)?)
    }

    #[tokio::test]
    async fn singleton_prints_one_value_line() {
        let mut chain = chain();
        chain
            .values
            .insert("Babe.Authorities".to_owned(), value(Value::u128(1234)));

        let out = decode(&chain, "Babe.Authorities").await.unwrap();
        assert_eq!(out, "1234\n");
        assert_eq!(
            chain.calls(),
            vec![
                "block_hash 10".to_owned(),
                format!("storage_entries {:?}", H256::repeat_byte(10)),
                "storage_value Babe.Authorities".to_owned(),
            ]
        );
    }

    #[tokio::test]
    async fn missing_singleton_without_default_prints_none() {
        let chain = chain();
        let out = decode(&chain, "Babe.NextRandomness").await.unwrap();
        assert_eq!(out, "None\n");
    }

    #[tokio::test]
    async fn map_prints_every_key_and_value() {
        let mut chain = chain();
        let pairs: Vec<_> = (0..1500u128)
            .map(|n| (account_key(n), value(Value::u128(n * 2))))
            .collect();
        chain
            .maps
            .insert("Babe.UnderConstruction".to_owned(), pairs);

        let out = decode(&chain, "babe.underConstruction").await.unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 3000);
        assert_eq!(&lines[..4], &["twox64_concat: 0", "0", "twox64_concat: 1", "2"]);
        assert_eq!(&lines[2998..], &["twox64_concat: 1499", "2998"]);
        assert_eq!(
            chain.calls().last().map(String::as_str),
            Some("storage_map Babe.UnderConstruction")
        );
    }

    #[tokio::test]
    async fn empty_map_prints_nothing() {
        let chain = chain();
        let out = decode(&chain, "Babe.UnderConstruction").await.unwrap();
        assert_eq!(out, "");
    }

    #[tokio::test]
    async fn multi_word_names_resolve() {
        let mut chain = chain();
        chain.values.insert(
            "TransactionPayment.NextFeeMultiplier".to_owned(),
            value(Value::u128(1_000_000_000_000_000_000)),
        );
        let out = decode(&chain, "TransactionPayment.NextFeeMultiplier").await.unwrap();
        assert_eq!(out, "1000000000000000000\n");
    }

    #[tokio::test]
    async fn unknown_pallet_is_a_usage_error() {
        let chain = chain();
        let err = decode(&chain, "Staking.Ledger").await.unwrap_err();
        let err = err.downcast::<UsageError>().unwrap();
        assert!(matches!(&err, UsageError::UnknownPallet(p) if p == "staking"));
        assert!(err.to_string().contains("camelCase"));
    }

    #[tokio::test]
    async fn unknown_entry_is_a_usage_error() {
        let chain = chain();
        let err = decode(&chain, "Babe.Epoch").await.unwrap_err();
        let err = err.downcast::<UsageError>().unwrap();
        assert!(matches!(
            &err,
            UsageError::UnknownEntry { pallet, entry } if pallet == "babe" && entry == "epoch"
        ));
        assert!(err.to_string().contains("camelCase"));
        // Nothing is fetched for an entry we couldn't find.
        assert_eq!(chain.calls().len(), 2);
    }

    #[tokio::test]
    async fn unknown_block_is_an_error() {
        let chain = chain();
        let err = decode_storage_item(
            &chain,
            11,
            &EntryName::parse("Babe.Authorities").unwrap(),
            Vec::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Couldn't find block 11");
    }
}
