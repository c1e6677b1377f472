use crate::config::ConnectionConfig;
use anyhow::{anyhow, Context};
use parity_scale_codec::Decode;
use serde::{Deserialize, Deserializer};
use subxt::backend::legacy::rpc_methods::Bytes;
use subxt::backend::rpc::RpcClient;
use subxt::ext::subxt_rpcs::rpc_params;
use subxt::utils::H256;

/// A single connection to a node, and the handful of RPC methods we need from it.
/// The connection closes when this is dropped.
pub struct ChainClient {
    rpc_client: RpcClient,
}

/// The bits of `chain_getBlock` that we care about.
#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    pub header: Header,
    pub extrinsics: Vec<Bytes>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub parent_hash: H256,
    #[serde(deserialize_with = "deserialize_hex_number")]
    pub number: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeVersion {
    pub spec_version: u32,
}

#[derive(Deserialize)]
struct SignedBlock {
    block: Block,
}

impl ChainClient {
    /// Connect to the node given in the config. Failing to connect is not retried.
    pub async fn connect(config: &ConnectionConfig) -> anyhow::Result<Self> {
        tracing::info!(url = %config.url, "connecting to node");
        let rpc_client = RpcClient::from_insecure_url(&config.url)
            .await
            .with_context(|| format!("Could not connect to {}", config.url))?;
        Ok(ChainClient { rpc_client })
    }

    /// The hash of the block with the given number, if it exists.
    pub async fn block_hash(&self, block_number: u64) -> anyhow::Result<Option<H256>> {
        tracing::debug!(block_number, "chain_getBlockHash");
        let block_hash = self
            .rpc_client
            .request("chain_getBlockHash", rpc_params![block_number])
            .await
            .with_context(|| "Could not fetch block hash")?;
        Ok(block_hash)
    }

    /// Like [`Self::block_hash`], but a missing block is an error.
    pub async fn existing_block_hash(&self, block_number: u64) -> anyhow::Result<H256> {
        self.block_hash(block_number)
            .await?
            .ok_or_else(|| anyhow!("Couldn't find block {block_number}"))
    }

    pub async fn block(&self, block_hash: H256) -> anyhow::Result<Block> {
        tracing::debug!(%block_hash, "chain_getBlock");
        let block: Option<SignedBlock> = self
            .rpc_client
            .request("chain_getBlock", rpc_params![block_hash])
            .await
            .with_context(|| "Could not fetch block body")?;
        let block = block.ok_or_else(|| anyhow!("No block body found for {block_hash}"))?;
        Ok(block.block)
    }

    /// The number of the current best block.
    pub async fn latest_block_number(&self) -> anyhow::Result<u64> {
        tracing::debug!("chain_getHeader");
        let header: Option<Header> = self
            .rpc_client
            .request("chain_getHeader", rpc_params![])
            .await
            .with_context(|| "Could not fetch latest header")?;
        let header = header.ok_or_else(|| anyhow!("Node did not return a latest header"))?;
        Ok(header.number)
    }

    pub async fn runtime_version(&self, at: H256) -> anyhow::Result<RuntimeVersion> {
        tracing::debug!(%at, "state_getRuntimeVersion");
        let version = self
            .rpc_client
            .request("state_getRuntimeVersion", rpc_params![at])
            .await
            .with_context(|| format!("Could not fetch runtime version at {at}"))?;
        Ok(version)
    }

    /// Fetch metadata via `state_getMetadata`, which works for historic blocks too.
    pub async fn metadata(&self, at: H256) -> anyhow::Result<frame_metadata::RuntimeMetadata> {
        tracing::debug!(%at, "state_getMetadata");
        let bytes: Bytes = self
            .rpc_client
            .request("state_getMetadata", rpc_params![at])
            .await
            .with_context(|| "Could not fetch metadata")?;
        let metadata = frame_metadata::RuntimeMetadataPrefixed::decode(&mut &bytes[..])
            .with_context(|| "Could not decode metadata")?;
        Ok(metadata.1)
    }

    pub async fn storage(&self, key: &[u8], at: H256) -> anyhow::Result<Option<Vec<u8>>> {
        let value: Option<Bytes> = self
            .rpc_client
            .request("state_getStorage", rpc_params![Bytes(key.to_vec()), at])
            .await
            .with_context(|| format!("Could not fetch storage value at key 0x{}", hex::encode(key)))?;
        Ok(value.map(|v| v.0))
    }

    /// Up to `count` keys starting with `prefix`, beginning after `start_key` if given.
    pub async fn storage_keys_paged(
        &self,
        prefix: &[u8],
        count: u32,
        start_key: Option<&[u8]>,
        at: H256,
    ) -> anyhow::Result<Vec<Vec<u8>>> {
        tracing::debug!(prefix = %hex::encode(prefix), count, "state_getKeysPaged");
        let keys: Vec<Bytes> = self
            .rpc_client
            .request(
                "state_getKeysPaged",
                rpc_params![
                    Bytes(prefix.to_vec()),
                    count,
                    start_key.map(|k| Bytes(k.to_vec())),
                    at
                ],
            )
            .await
            .with_context(|| "Could not fetch storage keys")?;
        Ok(keys.into_iter().map(|k| k.0).collect())
    }
}

fn deserialize_hex_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let s = String::deserialize(deserializer)?;
    let digits = s.strip_prefix("0x").unwrap_or(&s);
    u64::from_str_radix(digits, 16).map_err(serde::de::Error::custom)
}
