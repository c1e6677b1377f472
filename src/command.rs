use std::path::Path;

/// The sub-command (if any) picked out of the process arguments, along with
/// everything that followed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: Option<String>,
    pub args: Vec<String>,
}

/// Split process arguments into a command and the flags that belong to it.
///
/// `prefix` names the launcher tokens that may precede the command (usually
/// just the program itself). They are stripped only if every one of them
/// matches the trailing path segment of the corresponding argument.
pub fn parse_command<I, S>(args: I, prefix: &[&str]) -> ParsedCommand
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut args: Vec<String> = args.into_iter().map(Into::into).collect();

    let has_prefix = !prefix.is_empty()
        && args.len() >= prefix.len()
        && args
            .iter()
            .zip(prefix)
            .all(|(arg, name)| trailing_segment_matches(arg, name));
    if has_prefix {
        args.drain(..prefix.len());
    }

    match args.first() {
        Some(first) if !first.starts_with('-') => {
            let command = args.remove(0);
            ParsedCommand {
                command: Some(command),
                args,
            }
        }
        _ => ParsedCommand {
            command: None,
            args,
        },
    }
}

fn trailing_segment_matches(arg: &str, name: &str) -> bool {
    let path = Path::new(arg);
    let file_name = path.file_name().and_then(|n| n.to_str());
    // Windows binaries are invoked with an extension that isn't part of the name.
    let file_stem = path.file_stem().and_then(|n| n.to_str());
    file_name == Some(name) || file_stem == Some(name)
}
