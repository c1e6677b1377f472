use crate::error::UsageError;

/// A storage item named the way the runtime API exposes it: `pallet.entry`, both camelCase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryName {
    pub pallet: String,
    pub entry: String,
}

impl EntryName {
    /// Parse something like `Babe.Authorities` into `babe` and `authorities`.
    pub fn parse(raw: &str) -> Result<EntryName, UsageError> {
        let invalid = || UsageError::InvalidEntry(raw.to_owned());

        let (pallet, entry) = raw.split_once('.').ok_or_else(invalid)?;
        if pallet.is_empty() || entry.is_empty() || entry.contains('.') {
            return Err(invalid());
        }

        Ok(EntryName {
            pallet: lower_first(pallet),
            entry: lower_first(entry),
        })
    }

    /// Does the given metadata pallet name refer to our pallet?
    pub fn matches_pallet(&self, pallet_name: &str) -> bool {
        lower_first(pallet_name) == self.pallet
    }

    /// Does the given metadata storage entry name refer to our entry?
    pub fn matches_entry(&self, entry_name: &str) -> bool {
        lower_first(entry_name) == self.entry
    }
}

impl std::fmt::Display for EntryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.pallet, self.entry)
    }
}

/// Lower-case the first character, leaving the rest untouched.
pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
