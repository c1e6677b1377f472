use super::Runtime;
use anyhow::bail;
use frame_metadata::RuntimeMetadata;
use scale_type_resolver::TypeResolver;
use subxt::utils::{to_hex, AccountId32};

pub type ExtrinsicArgs = Vec<(String, scale_value::Value<String>)>;

#[derive(Debug, Clone)]
pub enum Extrinsic {
    Unsigned {
        call_data: ExtrinsicCallData,
    },
    Signed {
        address: String,
        signature: String,
        signed_exts: ExtrinsicArgs,
        call_data: ExtrinsicCallData,
    },
    General {
        signed_exts: ExtrinsicArgs,
        call_data: ExtrinsicCallData,
    },
}

impl Extrinsic {
    pub fn call_data(&self) -> &ExtrinsicCallData {
        match self {
            Extrinsic::Unsigned { call_data }
            | Extrinsic::Signed { call_data, .. }
            | Extrinsic::General { call_data, .. } => call_data,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtrinsicCallData {
    pub pallet_name: String,
    pub call_name: String,
    pub args: ExtrinsicArgs,
}

impl ExtrinsicCallData {
    /// `Pallet.call`, eg `Timestamp.set`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.pallet_name, self.call_name)
    }
}

/// Decode an extrinsic using the runtime it was included under.
pub fn decode_extrinsic(bytes: &[u8], runtime: &Runtime) -> anyhow::Result<Extrinsic> {
    match &runtime.metadata {
        RuntimeMetadata::V8(m) => decode_extrinsic_inner(bytes, m, runtime.legacy_types()?),
        RuntimeMetadata::V9(m) => decode_extrinsic_inner(bytes, m, runtime.legacy_types()?),
        RuntimeMetadata::V10(m) => decode_extrinsic_inner(bytes, m, runtime.legacy_types()?),
        RuntimeMetadata::V11(m) => decode_extrinsic_inner(bytes, m, runtime.legacy_types()?),
        RuntimeMetadata::V12(m) => decode_extrinsic_inner(bytes, m, runtime.legacy_types()?),
        RuntimeMetadata::V13(m) => decode_extrinsic_inner(bytes, m, runtime.legacy_types()?),
        RuntimeMetadata::V14(m) => decode_extrinsic_inner(bytes, m, &m.types),
        RuntimeMetadata::V15(m) => decode_extrinsic_inner(bytes, m, &m.types),
        _ => bail!("Only metadata V8 - V15 is supported"),
    }
}

fn decode_extrinsic_inner<Info, Resolver>(
    bytes: &[u8],
    args_info: &Info,
    type_resolver: &Resolver,
) -> anyhow::Result<Extrinsic>
where
    Info: frame_decode::extrinsics::ExtrinsicTypeInfo,
    Info::TypeId: Clone + core::fmt::Display + core::fmt::Debug + Send + Sync + 'static,
    Resolver: TypeResolver<TypeId = Info::TypeId>,
{
    let cursor = &mut &*bytes;
    let info = frame_decode::extrinsics::decode_extrinsic(cursor, args_info, type_resolver)?;

    let decode_at = |range: std::ops::Range<usize>, ty: &Info::TypeId| {
        let value = scale_value::scale::decode_as_type(&mut &bytes[range], ty.clone(), type_resolver)?;
        anyhow::Ok(value.map_context(|id| id.to_string()))
    };

    let mut args = ExtrinsicArgs::new();
    for arg in info.call_data() {
        args.push((arg.name().to_owned(), decode_at(arg.range(), arg.ty())?));
    }
    let call_data = ExtrinsicCallData {
        pallet_name: info.pallet_name().to_owned(),
        call_name: info.call_name().to_owned(),
        args,
    };

    if !cursor.is_empty() {
        bail!(leftover_bytes_report(&call_data, cursor)?);
    }

    let Some(exts) = info.transaction_extension_payload() else {
        return Ok(Extrinsic::Unsigned { call_data });
    };
    let mut signed_exts = ExtrinsicArgs::new();
    for ext in exts.iter() {
        signed_exts.push((ext.name().to_owned(), decode_at(ext.range(), ext.ty())?));
    }

    Ok(match info.signature_payload() {
        Some(sig) => Extrinsic::Signed {
            address: format_address(&bytes[sig.address_range()]),
            signature: to_hex(&bytes[sig.signature_range()]),
            signed_exts,
            call_data,
        },
        None => Extrinsic::General {
            signed_exts,
            call_data,
        },
    })
}

/// 32 byte addresses are shown as SS58 account IDs, anything else as hex.
fn format_address(address_bytes: &[u8]) -> String {
    match <[u8; 32]>::try_from(address_bytes) {
        Ok(account) => AccountId32(account).to_string(),
        Err(_) => to_hex(address_bytes),
    }
}

/// Describe what was decoded when bytes are left over, which usually means the
/// types we decoded with don't match the runtime.
fn leftover_bytes_report(call_data: &ExtrinsicCallData, leftover: &[u8]) -> Result<String, std::fmt::Error> {
    use std::fmt::Write;
    let mut s = String::new();

    writeln!(
        s,
        "{} leftover bytes found when trying to decode {} with args:",
        leftover.len(),
        call_data.qualified_name()
    )?;
    for (arg_name, arg_value) in &call_data.args {
        write!(s, "  {arg_name}: ")?;
        crate::utils::write_value_fmt(&mut s, arg_value)?;
        writeln!(s)?;
    }
    write!(s, "leftover bytes: {}", to_hex(leftover))?;
    Ok(s)
}

#[cfg(test)]
mod test {
    use super::*;
    use scale_value::Value;

    #[test]
    fn account_sized_addresses_are_ss58() {
        let address = format_address(&[0u8; 32]);
        assert_eq!(address, AccountId32([0u8; 32]).to_string());
        assert!(!address.starts_with("0x"));
    }

    #[test]
    fn other_addresses_are_hex() {
        assert_eq!(format_address(&[0xde, 0xad, 0xbe, 0xef]), "0xdeadbeef");
        assert_eq!(format_address(&[]), "0x");
    }

    #[test]
    fn leftover_report_names_the_call_and_the_bytes() {
        let call_data = ExtrinsicCallData {
            pallet_name: "Timestamp".to_owned(),
            call_name: "set".to_owned(),
            args: vec![("now".to_owned(), Value::u128(5).map_context(|_| String::new()))],
        };
        let report = leftover_bytes_report(&call_data, &[1, 2]).unwrap();
        assert_eq!(
            report,
            "2 leftover bytes found when trying to decode Timestamp.set with args:\n  now: 5\nleftover bytes: 0x0102"
        );
    }
}
