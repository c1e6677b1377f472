pub mod extrinsic_decoder;
pub mod storage_decoder;
pub mod storage_entries_list;

use anyhow::{anyhow, Context};
use frame_metadata::decode_different::DecodeDifferent;
use frame_metadata::RuntimeMetadata;
use scale_info_legacy::{ChainTypeRegistry, TypeRegistrySet};
use std::path::Path;

/// Everything needed to decode data produced by one runtime.
pub struct Runtime {
    pub spec_version: u32,
    pub metadata: RuntimeMetadata,
    /// Only present for pre-V14 metadata, and only if historic types were provided.
    legacy_types: Option<TypeRegistrySet<'static>>,
}

impl Runtime {
    pub fn new(
        spec_version: u32,
        metadata: RuntimeMetadata,
        historic_types: Option<&ChainTypeRegistry>,
    ) -> anyhow::Result<Self> {
        let legacy_types = match historic_types {
            Some(historic_types) if is_legacy(&metadata) => {
                // Extend the type info with Call types from the metadata so that things
                // like utility.batch "Just Work".
                let mut types_for_spec = historic_types
                    .for_spec_version(spec_version as u64)
                    .to_owned();
                let metadata_types =
                    frame_decode::helpers::type_registry_from_metadata_any(&metadata)?;
                types_for_spec.prepend(metadata_types);
                Some(types_for_spec)
            }
            _ => None,
        };

        Ok(Runtime {
            spec_version,
            metadata,
            legacy_types,
        })
    }

    /// The historic types to decode pre-V14 data with.
    pub fn legacy_types(&self) -> anyhow::Result<&TypeRegistrySet<'static>> {
        self.legacy_types.as_ref().ok_or_else(|| {
            anyhow!(
                "Spec version {} uses pre-V14 metadata; pass --types with historic type definitions to decode it",
                self.spec_version
            )
        })
    }
}

/// Load historic type definitions from a YAML file.
pub fn load_historic_types(path: &Path) -> anyhow::Result<ChainTypeRegistry> {
    let historic_types_str =
        std::fs::read_to_string(path).with_context(|| "Could not load historic types")?;
    let historic_types = serde_yaml::from_str(&historic_types_str)
        .with_context(|| "Can't parse historic types from YAML")?;
    Ok(historic_types)
}

fn is_legacy(metadata: &RuntimeMetadata) -> bool {
    matches!(
        metadata,
        RuntimeMetadata::V8(_)
            | RuntimeMetadata::V9(_)
            | RuntimeMetadata::V10(_)
            | RuntimeMetadata::V11(_)
            | RuntimeMetadata::V12(_)
            | RuntimeMetadata::V13(_)
    )
}

/// Metadata decoded from bytes only ever contains the decoded variant.
pub(crate) fn as_decoded<A, B>(item: &DecodeDifferent<A, B>) -> &B {
    match item {
        DecodeDifferent::Encode(_a) => panic!("Expecting decoded data"),
        DecodeDifferent::Decoded(b) => b,
    }
}
