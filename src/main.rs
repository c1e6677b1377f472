//! Decode blocks and storage entries from a Substrate based chain over RPC.

mod binary_chopper;
mod chain;
mod client;
mod command;
mod commands;
mod config;
mod decoding;
mod entry;
mod error;
mod utils;

use error::UsageError;
use std::path::Path;
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so that stdout only ever contains decoded output.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Arguments that aren't valid UTF-8 are converted lossily, so they fail to parse
    // as a usage error instead of a panic.
    let args: Vec<String> = std::env::args_os()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let program = args
        .first()
        .and_then(|arg| Path::new(arg).file_name())
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_owned();
    let parsed = command::parse_command(args, &[program.as_str()]);

    // The connection is owned by whichever command ran, so it's closed by the time we get here.
    match commands::dispatch(parsed).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<UsageError>() {
                Some(usage) => eprintln!("{usage}"),
                None => eprintln!("Error: {err:?}"),
            }
            ExitCode::FAILURE
        }
    }
}
