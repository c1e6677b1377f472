use crate::chain::{BlockExtrinsic, Chain, RpcChain};
use crate::config::ConnectionConfig;
use crate::decoding::extrinsic_decoder::Extrinsic;
use crate::decoding::load_historic_types;
use crate::utils::{self, NamedArgs};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "decode-blocks", version, about = "Decode a block, printing each extrinsic and its arguments.", long_about = None)]
pub struct Opts {
    /// URL of the node to connect to.
    /// Defaults to a public Polkadot RPC node if not given.
    #[arg(short, long)]
    url: Option<String>,

    /// Number of the block to decode.
    #[arg(short, long)]
    block: u64,

    /// Historic type definitions, needed for blocks using pre-V14 metadata.
    #[arg(short, long)]
    types: Option<PathBuf>,

    /// Also print the address, signature and transaction extensions of each extrinsic.
    #[arg(long)]
    signatures: bool,

    /// Also print the hex encoded bytes of each extrinsic.
    #[arg(long)]
    print_bytes: bool,
}

/// What to print for each extrinsic beyond its call name and arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct Details {
    pub signatures: bool,
    pub bytes: bool,
}

pub async fn run(opts: Opts) -> anyhow::Result<()> {
    let historic_types = opts
        .types
        .as_deref()
        .map(load_historic_types)
        .transpose()?;
    let config = ConnectionConfig::from_url(opts.url.as_deref());
    let chain = RpcChain::connect(&config, historic_types).await?;

    let stdout = std::io::stdout().lock();
    let details = Details {
        signatures: opts.signatures,
        bytes: opts.print_bytes,
    };
    decode_block(&chain, opts.block, details, stdout).await
}

/// Fetch a block and write out every extrinsic in it: the `Pallet.call` name on one line,
/// followed by the call arguments as pretty JSON.
pub async fn decode_block<C: Chain, W: Write>(
    chain: &C,
    block_number: u64,
    details: Details,
    mut w: W,
) -> anyhow::Result<()> {
    let block_hash = chain.block_hash(block_number).await?;
    let extrinsics = chain.block_extrinsics(block_hash).await?;
    tracing::info!(
        block_number,
        block_hash = %subxt::utils::to_hex(block_hash),
        count = extrinsics.len(),
        "decoded block"
    );

    for BlockExtrinsic { bytes, decoded } in &extrinsics {
        let call_data = decoded.call_data();
        writeln!(w, "{}", call_data.qualified_name())?;
        serde_json::to_writer_pretty(&mut w, &NamedArgs(&call_data.args))?;
        writeln!(w)?;

        if details.signatures {
            print_signature_details(&mut w, decoded)?;
        }
        if details.bytes {
            writeln!(w, "  Bytes: {}", subxt::utils::to_hex(bytes))?;
        }
    }

    w.flush()?;
    Ok(())
}

fn print_signature_details<W: Write>(mut w: W, ext: &Extrinsic) -> anyhow::Result<()> {
    match ext {
        Extrinsic::Unsigned { .. } => {}
        Extrinsic::Signed {
            address,
            signature,
            signed_exts,
            ..
        } => {
            writeln!(w, "  Address: {address}")?;
            writeln!(w, "  Signature: {signature}")?;
            print_transaction_extensions(&mut w, signed_exts)?;
        }
        Extrinsic::General { signed_exts, .. } => {
            print_transaction_extensions(&mut w, signed_exts)?;
        }
    }
    Ok(())
}

fn print_transaction_extensions<W: Write>(
    mut w: W,
    exts: &[(String, scale_value::Value<String>)],
) -> anyhow::Result<()> {
    writeln!(w, "  Transaction extensions:")?;
    for (name, value) in exts {
        write!(w, "    {name}: ")?;
        utils::write_value(utils::IndentedWriter::<4, _>(&mut w), value)?;
        writeln!(w)?;
    }
    Ok(())
}
