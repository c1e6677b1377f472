use super::as_decoded;
use anyhow::bail;
use frame_metadata::RuntimeMetadata;

pub trait StorageEntriesList {
    /// List all of the storage entries available in some metadata.
    fn storage_entries_list(&self) -> Vec<StorageEntry>;
}

/// A storage entry as named in the metadata, eg `Babe` / `Authorities`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEntry {
    pub pallet: String,
    /// The name storage keys are hashed from. Usually the pallet name, but older runtimes
    /// can store a pallet's data under a different one.
    pub prefix: String,
    pub entry: String,
    pub kind: StorageEntryKind,
    /// SCALE encoded value to use when nothing is stored. `None` for optional entries.
    pub default_value: Option<Vec<u8>>,
}

impl std::fmt::Display for StorageEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.pallet, self.entry)
    }
}

/// Whether a storage entry holds one value or can be iterated over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageEntryKind {
    Plain,
    Map,
}

/// List the storage entries for whichever metadata version we're given.
pub fn storage_entries(metadata: &RuntimeMetadata) -> anyhow::Result<Vec<StorageEntry>> {
    let entries = match metadata {
        RuntimeMetadata::V8(m) => m.storage_entries_list(),
        RuntimeMetadata::V9(m) => m.storage_entries_list(),
        RuntimeMetadata::V10(m) => m.storage_entries_list(),
        RuntimeMetadata::V11(m) => m.storage_entries_list(),
        RuntimeMetadata::V12(m) => m.storage_entries_list(),
        RuntimeMetadata::V13(m) => m.storage_entries_list(),
        RuntimeMetadata::V14(m) => m.storage_entries_list(),
        RuntimeMetadata::V15(m) => m.storage_entries_list(),
        _ => bail!("Only metadata V8 - V15 is supported"),
    };
    Ok(entries)
}

macro_rules! impl_storage_entries_list_for_v8_to_v13 {
    ($path:path, $name:ident) => {
        const _: () = {
            use $path as path;
            impl StorageEntriesList for path::$name {
                fn storage_entries_list(&self) -> Vec<StorageEntry> {
                    let mut output = vec![];

                    for module in as_decoded(&self.modules) {
                        let Some(storage) = &module.storage else { continue };
                        let pallet = as_decoded(&module.name);
                        let storage = as_decoded(storage);
                        let prefix = as_decoded(&storage.prefix);

                        for entry_meta in as_decoded(&storage.entries) {
                            // Everything other than a plain entry is some flavour of map.
                            let kind = match &entry_meta.ty {
                                path::StorageEntryType::Plain(_) => StorageEntryKind::Plain,
                                _ => StorageEntryKind::Map,
                            };
                            output.push(StorageEntry {
                                pallet: pallet.clone(),
                                prefix: prefix.clone(),
                                entry: as_decoded(&entry_meta.name).clone(),
                                kind,
                                default_value: match &entry_meta.modifier {
                                    path::StorageEntryModifier::Optional => None,
                                    path::StorageEntryModifier::Default => {
                                        Some(as_decoded(&entry_meta.default).clone())
                                    }
                                },
                            })
                        }
                    }
                    output
                }
            }
        };
    };
}

impl_storage_entries_list_for_v8_to_v13!(frame_metadata::v8, RuntimeMetadataV8);
impl_storage_entries_list_for_v8_to_v13!(frame_metadata::v9, RuntimeMetadataV9);
impl_storage_entries_list_for_v8_to_v13!(frame_metadata::v10, RuntimeMetadataV10);
impl_storage_entries_list_for_v8_to_v13!(frame_metadata::v11, RuntimeMetadataV11);
impl_storage_entries_list_for_v8_to_v13!(frame_metadata::v12, RuntimeMetadataV12);
impl_storage_entries_list_for_v8_to_v13!(frame_metadata::v13, RuntimeMetadataV13);

macro_rules! impl_storage_entries_list_for_v14_to_v15 {
    ($path:path, $name:ident) => {
        const _: () = {
            use $path as path;
            impl StorageEntriesList for path::$name {
                fn storage_entries_list(&self) -> Vec<StorageEntry> {
                    let mut output = vec![];

                    for pallet in &self.pallets {
                        let Some(storage) = &pallet.storage else { continue };

                        for entry_meta in &storage.entries {
                            let kind = match &entry_meta.ty {
                                path::StorageEntryType::Plain(_) => StorageEntryKind::Plain,
                                path::StorageEntryType::Map { .. } => StorageEntryKind::Map,
                            };
                            output.push(StorageEntry {
                                pallet: pallet.name.clone(),
                                prefix: storage.prefix.clone(),
                                entry: entry_meta.name.clone(),
                                kind,
                                default_value: match &entry_meta.modifier {
                                    path::StorageEntryModifier::Optional => None,
                                    path::StorageEntryModifier::Default => {
                                        Some(entry_meta.default.clone())
                                    }
                                },
                            })
                        }
                    }
                    output
                }
            }
        };
    };
}

impl_storage_entries_list_for_v14_to_v15!(frame_metadata::v14, RuntimeMetadataV14);
impl_storage_entries_list_for_v14_to_v15!(frame_metadata::v15, RuntimeMetadataV15);
