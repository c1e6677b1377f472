pub mod decode_blocks;
pub mod decode_storage_items;
pub mod fetch_metadata;
pub mod find_spec_changes;

use crate::command::ParsedCommand;
use crate::error::UsageError;

/// Every command we understand, as typed on the command line.
pub const COMMAND_NAMES: [&str; 4] = [
    CommandKind::DecodeBlocks.name(),
    CommandKind::DecodeStorageItems.name(),
    CommandKind::FetchMetadata.name(),
    CommandKind::FindSpecChanges.name(),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Decode a block, printing each extrinsic.
    DecodeBlocks,
    /// Decode a storage entry, printing its value or every key and value in a map.
    DecodeStorageItems,
    /// Fetch the metadata at a given block as JSON.
    FetchMetadata,
    /// Find the block numbers where spec version changes happen.
    FindSpecChanges,
}

impl CommandKind {
    pub const fn name(self) -> &'static str {
        match self {
            CommandKind::DecodeBlocks => "decode-blocks",
            CommandKind::DecodeStorageItems => "decode-storage-items",
            CommandKind::FetchMetadata => "fetch-metadata",
            CommandKind::FindSpecChanges => "find-spec-changes",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            CommandKind::DecodeBlocks,
            CommandKind::DecodeStorageItems,
            CommandKind::FetchMetadata,
            CommandKind::FindSpecChanges,
        ]
        .into_iter()
        .find(|kind| kind.name() == name)
    }
}

/// Run whichever command was asked for. Usage mistakes come back as [`UsageError`]s.
pub async fn dispatch(parsed: ParsedCommand) -> anyhow::Result<()> {
    let Some(command) = parsed.command else {
        return Err(UsageError::NoCommand.into());
    };
    let kind = CommandKind::from_name(&command).ok_or(UsageError::UnknownCommand(command))?;
    tracing::debug!(command = kind.name(), "dispatching");

    match kind {
        CommandKind::DecodeBlocks => {
            if let Some(opts) = parse_opts::<decode_blocks::Opts>(kind, &parsed.args)? {
                decode_blocks::run(opts).await?;
            }
        }
        CommandKind::DecodeStorageItems => {
            if let Some(opts) = parse_opts::<decode_storage_items::Opts>(kind, &parsed.args)? {
                decode_storage_items::run(opts).await?;
            }
        }
        CommandKind::FetchMetadata => {
            if let Some(opts) = parse_opts::<fetch_metadata::Opts>(kind, &parsed.args)? {
                fetch_metadata::run(opts).await?;
            }
        }
        CommandKind::FindSpecChanges => {
            if let Some(opts) = parse_opts::<find_spec_changes::Opts>(kind, &parsed.args)? {
                find_spec_changes::run(opts).await?;
            }
        }
    }

    Ok(())
}

/// Parse the flags given to a command. `None` means clap has printed help or version
/// info and there's nothing left to do.
fn parse_opts<T: clap::Parser>(kind: CommandKind, args: &[String]) -> anyhow::Result<Option<T>> {
    let argv = std::iter::once(kind.name()).chain(args.iter().map(String::as_str));
    match T::try_parse_from(argv) {
        Ok(opts) => Ok(Some(opts)),
        Err(e) if !e.use_stderr() => {
            e.print()?;
            Ok(None)
        }
        Err(e) => Err(UsageError::Flags(e).into()),
    }
}
