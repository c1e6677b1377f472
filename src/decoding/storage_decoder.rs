use super::storage_entries_list::StorageEntry;
use super::Runtime;
use anyhow::bail;
use frame_decode::storage::StorageHasher;
use frame_metadata::RuntimeMetadata;
use scale_type_resolver::TypeResolver;

pub type StorageValue = scale_value::Value<String>;
pub type StorageKeys = Vec<StorageKey>;

/// The decoded representation of one part of a storage key.
#[derive(Debug, Clone)]
pub struct StorageKey {
    pub hash: Vec<u8>,
    pub value: Option<scale_value::Value<String>>,
    pub hasher: StorageHasher,
}

/// The bytes every key of the given entry starts with: `twox128(prefix) ++ twox128(entry)`.
pub fn storage_prefix(entry: &StorageEntry) -> Vec<u8> {
    let mut v = Vec::<u8>::with_capacity(32);
    v.extend(&sp_crypto_hashing::twox_128(entry.prefix.as_bytes()));
    v.extend(&sp_crypto_hashing::twox_128(entry.entry.as_bytes()));
    v
}

/// Decode the bytes representing some storage key. Here, we expect all of the key bytes
/// including the hashed pallet name and storage entry.
pub fn decode_storage_keys(
    entry: &StorageEntry,
    bytes: &[u8],
    runtime: &Runtime,
) -> anyhow::Result<StorageKeys> {
    let (pallet_name, storage_entry) = (entry.pallet.as_str(), entry.entry.as_str());
    match &runtime.metadata {
        RuntimeMetadata::V8(m) => decode_storage_keys_inner(pallet_name, storage_entry, bytes, m, runtime.legacy_types()?),
        RuntimeMetadata::V9(m) => decode_storage_keys_inner(pallet_name, storage_entry, bytes, m, runtime.legacy_types()?),
        RuntimeMetadata::V10(m) => decode_storage_keys_inner(pallet_name, storage_entry, bytes, m, runtime.legacy_types()?),
        RuntimeMetadata::V11(m) => decode_storage_keys_inner(pallet_name, storage_entry, bytes, m, runtime.legacy_types()?),
        RuntimeMetadata::V12(m) => decode_storage_keys_inner(pallet_name, storage_entry, bytes, m, runtime.legacy_types()?),
        RuntimeMetadata::V13(m) => decode_storage_keys_inner(pallet_name, storage_entry, bytes, m, runtime.legacy_types()?),
        RuntimeMetadata::V14(m) => decode_storage_keys_inner(pallet_name, storage_entry, bytes, m, &m.types),
        RuntimeMetadata::V15(m) => decode_storage_keys_inner(pallet_name, storage_entry, bytes, m, &m.types),
        _ => bail!("Only metadata V8 - V15 is supported"),
    }
}

/// Decode the bytes representing some storage value.
pub fn decode_storage_value(
    entry: &StorageEntry,
    bytes: &[u8],
    runtime: &Runtime,
) -> anyhow::Result<StorageValue> {
    let (pallet_name, storage_entry) = (entry.pallet.as_str(), entry.entry.as_str());
    match &runtime.metadata {
        RuntimeMetadata::V8(m) => decode_storage_value_inner(pallet_name, storage_entry, bytes, m, runtime.legacy_types()?),
        RuntimeMetadata::V9(m) => decode_storage_value_inner(pallet_name, storage_entry, bytes, m, runtime.legacy_types()?),
        RuntimeMetadata::V10(m) => decode_storage_value_inner(pallet_name, storage_entry, bytes, m, runtime.legacy_types()?),
        RuntimeMetadata::V11(m) => decode_storage_value_inner(pallet_name, storage_entry, bytes, m, runtime.legacy_types()?),
        RuntimeMetadata::V12(m) => decode_storage_value_inner(pallet_name, storage_entry, bytes, m, runtime.legacy_types()?),
        RuntimeMetadata::V13(m) => decode_storage_value_inner(pallet_name, storage_entry, bytes, m, runtime.legacy_types()?),
        RuntimeMetadata::V14(m) => decode_storage_value_inner(pallet_name, storage_entry, bytes, m, &m.types),
        RuntimeMetadata::V15(m) => decode_storage_value_inner(pallet_name, storage_entry, bytes, m, &m.types),
        _ => bail!("Only metadata V8 - V15 is supported"),
    }
}

fn decode_storage_keys_inner<Info, Resolver>(
    pallet_name: &str,
    storage_entry: &str,
    bytes: &[u8],
    info: &Info,
    type_resolver: &Resolver,
) -> anyhow::Result<StorageKeys>
where
    Info: frame_decode::storage::StorageTypeInfo,
    Info::TypeId: Clone + core::fmt::Display + core::fmt::Debug + Send + Sync + 'static,
    Resolver: TypeResolver<TypeId = Info::TypeId>,
{
    let cursor = &mut &*bytes;
    let key_info = frame_decode::storage::decode_storage_key(
        pallet_name,
        storage_entry,
        cursor,
        info,
        type_resolver,
    )?;

    let decoded: anyhow::Result<StorageKeys> = key_info
        .parts()
        .map(|part| {
            let hash = bytes[part.hash_range()].to_vec();
            let hasher = part.hasher();
            let value = part
                .value()
                .map(|val_info| {
                    let value = scale_value::scale::decode_as_type(
                        &mut &bytes[val_info.range()],
                        val_info.ty().clone(),
                        type_resolver,
                    )?
                    .map_context(|id| id.to_string());
                    anyhow::Result::<scale_value::Value<String>>::Ok(value)
                })
                .transpose()?;

            Ok(StorageKey {
                hash,
                value,
                hasher,
            })
        })
        .collect();

    if !cursor.is_empty() {
        if let Ok(keys) = &decoded {
            let mut s = String::new();
            write_storage_keys_fmt(&mut s, keys)?;
            bail!(
                "{} leftover bytes decoding storage keys: {cursor:?}. decoded: {s}",
                cursor.len()
            );
        }
    }

    decoded
}

fn decode_storage_value_inner<Info, Resolver>(
    pallet_name: &str,
    storage_entry: &str,
    bytes: &[u8],
    info: &Info,
    type_resolver: &Resolver,
) -> anyhow::Result<StorageValue>
where
    Info: frame_decode::storage::StorageTypeInfo,
    Info::TypeId: Clone + core::fmt::Display + core::fmt::Debug + Send + Sync + 'static,
    Resolver: TypeResolver<TypeId = Info::TypeId>,
{
    let cursor = &mut &*bytes;
    let value = frame_decode::storage::decode_storage_value(
        pallet_name,
        storage_entry,
        cursor,
        info,
        type_resolver,
        scale_value::scale::ValueVisitor::new(),
    )?
    .map_context(|id| id.to_string());

    if !cursor.is_empty() {
        let mut value_string = String::new();
        crate::utils::write_value_fmt(&mut value_string, &value)?;
        bail!(
            "{} leftover bytes decoding storage value: {cursor:?}. decoded:\n\n{value_string}",
            cursor.len()
        );
    }

    Ok(value)
}

pub fn write_storage_keys<W: std::io::Write>(writer: W, keys: &[StorageKey]) -> anyhow::Result<()> {
    let writer = crate::utils::ToFmtWrite(writer);
    write_storage_keys_fmt(writer, keys)
}

pub fn write_storage_keys_fmt<W: std::fmt::Write>(
    mut writer: W,
    keys: &[StorageKey],
) -> anyhow::Result<()> {
    // Plain entries have no keys:
    if keys.is_empty() {
        write!(&mut writer, "plain")?;
        return Ok(());
    }

    // blake2_128: 0x23edbfe + twox64_concat: 123
    for (idx, key) in keys.iter().enumerate() {
        if idx != 0 {
            write!(&mut writer, " + ")?;
        }

        match (key.hasher, &key.value) {
            (StorageHasher::Blake2_128, None) => {
                write!(&mut writer, "blake2_128: 0x{}", hex::encode(&key.hash))?;
            }
            (StorageHasher::Blake2_256, None) => {
                write!(&mut writer, "blake2_256: 0x{}", hex::encode(&key.hash))?;
            }
            (StorageHasher::Blake2_128Concat, Some(value)) => {
                write!(&mut writer, "blake2_128_concat: ")?;
                crate::utils::write_compact_value_fmt(&mut writer, value)?;
            }
            (StorageHasher::Twox128, None) => {
                write!(&mut writer, "twox_128: 0x{}", hex::encode(&key.hash))?;
            }
            (StorageHasher::Twox256, None) => {
                write!(&mut writer, "twox_256: 0x{}", hex::encode(&key.hash))?;
            }
            (StorageHasher::Twox64Concat, Some(value)) => {
                write!(&mut writer, "twox64_concat: ")?;
                crate::utils::write_compact_value_fmt(&mut writer, value)?;
            }
            (StorageHasher::Identity, Some(value)) => {
                write!(&mut writer, "ident: ")?;
                crate::utils::write_compact_value_fmt(&mut writer, value)?;
            }
            _ => {
                bail!("Invalid storage hasher/value pair")
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use super::super::storage_entries_list::StorageEntryKind;
    use scale_value::Value;

    fn entry(pallet: &str, entry: &str) -> StorageEntry {
        StorageEntry {
            pallet: pallet.to_owned(),
            prefix: pallet.to_owned(),
            entry: entry.to_owned(),
            kind: StorageEntryKind::Map,
            default_value: None,
        }
    }

    #[test]
    fn prefix_is_hashed_pallet_and_entry() {
        // Well known prefix for System.Account.
        let prefix = storage_prefix(&entry("System", "Account"));
        assert_eq!(
            hex::encode(prefix),
            "26aa394eea5630e07c48ae0c9558cef7b99d880ec681799c0cf30e8886371da9"
        );
    }

    #[test]
    fn prefix_is_hashed_from_storage_prefix_not_pallet_name() {
        let mut members = entry("ElectionsPhragmen", "Members");
        members.prefix = "PhragmenElection".to_owned();

        let prefix = storage_prefix(&members);
        assert_eq!(&prefix[..16], &sp_crypto_hashing::twox_128(b"PhragmenElection"));
        assert_eq!(&prefix[16..], &sp_crypto_hashing::twox_128(b"Members"));
        assert_ne!(prefix, storage_prefix(&entry("ElectionsPhragmen", "Members")));
    }

    #[test]
    fn writes_keys_in_order() {
        let keys = vec![
            StorageKey {
                hash: vec![0xab, 0xcd],
                value: None,
                hasher: StorageHasher::Blake2_128,
            },
            StorageKey {
                hash: vec![1, 2, 3, 4, 5, 6, 7, 8],
                value: Some(Value::u128(42).map_context(|_| String::new())),
                hasher: StorageHasher::Twox64Concat,
            },
        ];

        let mut s = String::new();
        write_storage_keys_fmt(&mut s, &keys).unwrap();
        assert_eq!(s, "blake2_128: 0xabcd + twox64_concat: 42");
    }

    #[test]
    fn plain_entries_have_no_keys() {
        let mut s = String::new();
        write_storage_keys_fmt(&mut s, &[]).unwrap();
        assert_eq!(s, "plain");
    }

    #[test]
    fn mismatched_hasher_and_value_is_an_error() {
        let keys = vec![StorageKey {
            hash: vec![],
            value: None,
            hasher: StorageHasher::Identity,
        }];
        let mut s = String::new();
        assert!(write_storage_keys_fmt(&mut s, &keys).is_err());
    }
}
