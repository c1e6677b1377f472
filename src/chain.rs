use crate::client::{ChainClient, Header};
use crate::config::ConnectionConfig;
use crate::decoding::extrinsic_decoder::{decode_extrinsic, Extrinsic};
use crate::decoding::storage_decoder::{
    decode_storage_keys, decode_storage_value, storage_prefix, StorageKeys, StorageValue,
};
use crate::decoding::storage_entries_list::{storage_entries, StorageEntry};
use crate::decoding::Runtime;
use anyhow::{anyhow, Context};
use scale_info_legacy::ChainTypeRegistry;
use std::sync::Arc;
use subxt::utils::H256;
use tokio::sync::Mutex;

/// How many storage keys to ask for in each `state_getKeysPaged` call.
const KEYS_PAGE_SIZE: u32 = 1000;

/// An extrinsic as found in a block, alongside the bytes it was decoded from.
#[derive(Debug, Clone)]
pub struct BlockExtrinsic {
    pub bytes: Vec<u8>,
    pub decoded: Extrinsic,
}

/// What the retrieval flows need from a node: blocks, and storage at a given block,
/// already decoded.
#[allow(async_fn_in_trait)]
pub trait Chain {
    /// The hash of the block with the given number. A block that doesn't exist is an error.
    async fn block_hash(&self, block_number: u64) -> anyhow::Result<H256>;

    /// Every extrinsic in the block, decoded, in the order they appear on chain.
    async fn block_extrinsics(&self, at: H256) -> anyhow::Result<Vec<BlockExtrinsic>>;

    /// All of the storage entries known to the runtime at the given block.
    async fn storage_entries(&self, at: H256) -> anyhow::Result<Vec<StorageEntry>>;

    /// The value of a plain storage entry, falling back to its default if nothing is stored.
    /// `None` means nothing is stored and the entry has no default.
    async fn storage_value(
        &self,
        entry: &StorageEntry,
        at: H256,
    ) -> anyhow::Result<Option<StorageValue>>;

    /// Hand every key and value stored under a map entry to `on_pair` as soon as it's
    /// decoded, returning how many there were.
    async fn storage_map<F>(&self, entry: &StorageEntry, at: H256, on_pair: F) -> anyhow::Result<usize>
    where
        F: FnMut(StorageKeys, StorageValue) -> anyhow::Result<()>;
}

/// The raw storage calls the storage flow is built on.
#[allow(async_fn_in_trait)]
pub trait StorageRpc {
    async fn storage(&self, key: &[u8], at: H256) -> anyhow::Result<Option<Vec<u8>>>;

    async fn storage_keys_paged(
        &self,
        prefix: &[u8],
        count: u32,
        start_key: Option<&[u8]>,
        at: H256,
    ) -> anyhow::Result<Vec<Vec<u8>>>;
}

impl StorageRpc for ChainClient {
    async fn storage(&self, key: &[u8], at: H256) -> anyhow::Result<Option<Vec<u8>>> {
        ChainClient::storage(self, key, at).await
    }

    async fn storage_keys_paged(
        &self,
        prefix: &[u8],
        count: u32,
        start_key: Option<&[u8]>,
        at: H256,
    ) -> anyhow::Result<Vec<Vec<u8>>> {
        ChainClient::storage_keys_paged(self, prefix, count, start_key, at).await
    }
}

/// The bytes stored at the entry's key, or its metadata default if nothing is stored.
pub async fn stored_or_default<S: StorageRpc>(
    rpc: &S,
    entry: &StorageEntry,
    at: H256,
) -> anyhow::Result<Option<Vec<u8>>> {
    let stored = rpc.storage(&storage_prefix(entry), at).await?;
    Ok(stored.or_else(|| entry.default_value.clone()))
}

/// Walk every key under `prefix`, `page_size` keys at a time, handing each key and its
/// value to `on_pair`. Paging stops at the first page shorter than `page_size`.
pub async fn for_each_stored_pair<S, F>(
    rpc: &S,
    prefix: &[u8],
    page_size: u32,
    at: H256,
    mut on_pair: F,
) -> anyhow::Result<usize>
where
    S: StorageRpc,
    F: FnMut(&[u8], Vec<u8>) -> anyhow::Result<()>,
{
    let mut count = 0;
    let mut start_key: Option<Vec<u8>> = None;
    loop {
        let page = rpc
            .storage_keys_paged(prefix, page_size, start_key.as_deref(), at)
            .await?;
        tracing::debug!(keys = page.len(), total = count, "fetched storage key page");

        for key in &page {
            let value = rpc.storage(key, at).await?.ok_or_else(|| {
                anyhow!("No value found at listed storage key 0x{}", hex::encode(key))
            })?;
            on_pair(key, value)?;
            count += 1;
        }

        if page.len() < page_size as usize {
            return Ok(count);
        }
        start_key = page.last().cloned();
    }
}

/// The block whose runtime decodes the given block's extrinsics. Runtime updates take
/// effect the block after they are applied, so this is the parent; genesis is its own.
pub fn runtime_block(header: &Header, at: H256) -> H256 {
    if header.number == 0 {
        at
    } else {
        header.parent_hash
    }
}

/// A [`Chain`] backed by a live RPC connection. Metadata is fetched at whichever block
/// we're asked about, so historic blocks decode with the runtime they were produced by.
pub struct RpcChain {
    client: ChainClient,
    historic_types: Option<ChainTypeRegistry>,
    last_runtime: Mutex<Option<(H256, Arc<Runtime>)>>,
}

impl RpcChain {
    pub async fn connect(
        config: &ConnectionConfig,
        historic_types: Option<ChainTypeRegistry>,
    ) -> anyhow::Result<Self> {
        let client = ChainClient::connect(config).await?;
        Ok(RpcChain::new(client, historic_types))
    }

    pub fn new(client: ChainClient, historic_types: Option<ChainTypeRegistry>) -> Self {
        RpcChain {
            client,
            historic_types,
            last_runtime: Mutex::new(None),
        }
    }

    /// The runtime in effect for the state at the given block.
    async fn runtime_at(&self, at: H256) -> anyhow::Result<Arc<Runtime>> {
        let mut last_runtime = self.last_runtime.lock().await;
        if let Some((hash, runtime)) = &*last_runtime {
            if *hash == at {
                return Ok(runtime.clone());
            }
        }

        let spec_version = self.client.runtime_version(at).await?.spec_version;
        let metadata = self.client.metadata(at).await?;
        tracing::debug!(%at, spec_version, "fetched runtime metadata");

        let runtime = Arc::new(Runtime::new(
            spec_version,
            metadata,
            self.historic_types.as_ref(),
        )?);
        *last_runtime = Some((at, runtime.clone()));
        Ok(runtime)
    }
}

impl Chain for RpcChain {
    async fn block_hash(&self, block_number: u64) -> anyhow::Result<H256> {
        self.client.existing_block_hash(block_number).await
    }

    async fn block_extrinsics(&self, at: H256) -> anyhow::Result<Vec<BlockExtrinsic>> {
        let block = self.client.block(at).await?;
        let runtime = self.runtime_at(runtime_block(&block.header, at)).await?;

        block
            .extrinsics
            .into_iter()
            .enumerate()
            .map(|(idx, ext)| {
                let decoded = decode_extrinsic(&ext.0, &runtime)
                    .with_context(|| format!("Could not decode extrinsic {idx}"))?;
                Ok(BlockExtrinsic {
                    bytes: ext.0,
                    decoded,
                })
            })
            .collect()
    }

    async fn storage_entries(&self, at: H256) -> anyhow::Result<Vec<StorageEntry>> {
        let runtime = self.runtime_at(at).await?;
        storage_entries(&runtime.metadata)
    }

    async fn storage_value(
        &self,
        entry: &StorageEntry,
        at: H256,
    ) -> anyhow::Result<Option<StorageValue>> {
        let runtime = self.runtime_at(at).await?;
        let Some(bytes) = stored_or_default(&self.client, entry, at).await? else {
            return Ok(None);
        };
        let value = decode_storage_value(entry, &bytes, &runtime)
            .with_context(|| format!("Could not decode {entry}"))?;
        Ok(Some(value))
    }

    async fn storage_map<F>(&self, entry: &StorageEntry, at: H256, mut on_pair: F) -> anyhow::Result<usize>
    where
        F: FnMut(StorageKeys, StorageValue) -> anyhow::Result<()>,
    {
        let runtime = self.runtime_at(at).await?;
        let prefix = storage_prefix(entry);

        let count = for_each_stored_pair(&self.client, &prefix, KEYS_PAGE_SIZE, at, |key, bytes| {
            let decoded_key = decode_storage_keys(entry, key, &runtime).with_context(|| {
                format!("Could not decode storage key 0x{}", hex::encode(key))
            })?;
            let decoded_value = decode_storage_value(entry, &bytes, &runtime).with_context(|| {
                format!("Could not decode storage value at key 0x{}", hex::encode(key))
            })?;
            on_pair(decoded_key, decoded_value)
        })
        .await?;

        tracing::info!(%entry, count, "decoded storage map");
        Ok(count)
    }
}


#[cfg(test)]
pub mod mock {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// An in-memory [`Chain`] which records each call made to it.
    #[derive(Default)]
    pub struct MockChain {
        pub blocks: HashMap<u64, (H256, Vec<BlockExtrinsic>)>,
        pub entries: Vec<StorageEntry>,
        pub values: HashMap<String, StorageValue>,
        pub maps: HashMap<String, Vec<(StorageKeys, StorageValue)>>,
        pub calls: RefCell<Vec<String>>,
    }

    impl MockChain {
        fn record(&self, call: String) {
            self.calls.borrow_mut().push(call);
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl Chain for MockChain {
        async fn block_hash(&self, block_number: u64) -> anyhow::Result<H256> {
            self.record(format!("block_hash {block_number}"));
            self.blocks
                .get(&block_number)
                .map(|(hash, _)| *hash)
                .ok_or_else(|| anyhow!("Couldn't find block {block_number}"))
        }

        async fn block_extrinsics(&self, at: H256) -> anyhow::Result<Vec<BlockExtrinsic>> {
            self.record(format!("block_extrinsics {at:?}"));
            self.blocks
                .values()
                .find(|(hash, _)| *hash == at)
                .map(|(_, exts)| exts.clone())
                .ok_or_else(|| anyhow!("No block body found for {at:?}"))
        }

        async fn storage_entries(&self, at: H256) -> anyhow::Result<Vec<StorageEntry>> {
            self.record(format!("storage_entries {at:?}"));
            Ok(self.entries.clone())
        }

        async fn storage_value(
            &self,
            entry: &StorageEntry,
            _at: H256,
        ) -> anyhow::Result<Option<StorageValue>> {
            self.record(format!("storage_value {entry}"));
            Ok(self.values.get(&entry.to_string()).cloned())
        }

        async fn storage_map<F>(&self, entry: &StorageEntry, _at: H256, mut on_pair: F) -> anyhow::Result<usize>
        where
            F: FnMut(StorageKeys, StorageValue) -> anyhow::Result<()>,
        {
            self.record(format!("storage_map {entry}"));
            let pairs = self.maps.get(&entry.to_string()).cloned().unwrap_or_default();
            let count = pairs.len();
            for (keys, value) in pairs {
                on_pair(keys, value)?;
            }
            Ok(count)
        }
    }
}
