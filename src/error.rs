use thiserror::Error;

const CAMEL_CASE_HINT: &str =
    "names are matched in camelCase, eg `system.account` or `babe.authorities`";

/// Mistakes in how the tool was invoked. These are reported without a backtrace
/// and always end the process with exit code 1.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error(
        "No command given. Run with one of: {commands}. Use `<command> --help` to see its options.",
        commands = command_list()
    )]
    NoCommand,
    #[error("Unknown command '{0}'. Valid commands are: {commands}.", commands = command_list())]
    UnknownCommand(String),
    #[error("{0}")]
    Flags(#[from] clap::Error),
    #[error("Cannot parse storage entry '{0}'; expected the form Pallet.Entry, eg Babe.Authorities")]
    InvalidEntry(String),
    #[error("Pallet '{0}' has no storage at this block; {hint}", hint = CAMEL_CASE_HINT)]
    UnknownPallet(String),
    #[error(
        "Pallet '{pallet}' has no storage entry '{entry}'; {hint}",
        hint = CAMEL_CASE_HINT
    )]
    UnknownEntry { pallet: String, entry: String },
}

fn command_list() -> String {
    crate::commands::COMMAND_NAMES.join(", ")
}
