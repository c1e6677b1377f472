use scale_value::{Composite, Value, ValueDef};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Our stdout lock is io::Write but we need fmt::Write for scale_value writing.
/// Ideally we'd change scale_value, but io::Write is std-only among other things,
/// so scale-value uses fmt::Write to be no-std.
pub struct ToFmtWrite<W>(pub W);
impl<W: std::io::Write> std::fmt::Write for ToFmtWrite<W> {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.0.write_all(s.as_bytes()).map_err(|_| std::fmt::Error)
    }
}

/// Write out a pretty Value using `std::io::Write`.
pub fn write_value<W: std::io::Write, T: std::fmt::Display>(
    w: W,
    value: &Value<T>,
) -> core::fmt::Result {
    write_value_fmt(ToFmtWrite(w), value)
}

/// Write out a pretty Value using `std::fmt::Write`.
pub fn write_value_fmt<W: std::fmt::Write, T: std::fmt::Display>(
    w: W,
    value: &Value<T>,
) -> core::fmt::Result {
    scale_value::stringify::to_writer_custom()
        .pretty()
        .format_context(|type_id, w: &mut W| write!(w, "{type_id}"))
        .add_custom_formatter(|v, w: &mut W| {
            scale_value::stringify::custom_formatters::format_hex(v, w)
        })
        .add_custom_formatter(|v, w: &mut W| {
            // don't space unnamed composites over multiple lines if lots of primitive values.
            if let ValueDef::Composite(Composite::Unnamed(vals)) = &v.value {
                let are_primitive = vals
                    .iter()
                    .all(|val| matches!(val.value, ValueDef::Primitive(_)));
                if are_primitive {
                    return Some(write!(w, "{v}"));
                }
            }
            None
        })
        .write(value, w)
}

/// Write out a Value on a single line; used for storage keys.
pub fn write_compact_value_fmt<W: std::fmt::Write>(
    writer: W,
    value: &Value<String>,
) -> anyhow::Result<()> {
    scale_value::stringify::to_writer_custom()
        .compact()
        .format_context(|type_id, w: &mut W| write!(w, "{type_id}"))
        .add_custom_formatter(|v, w: &mut W| {
            scale_value::stringify::custom_formatters::format_hex(v, w)
        })
        .write(value, writer)?;
    Ok(())
}

/// Serializes named values as a JSON-like map, keeping the order they were given in.
pub struct NamedArgs<'a, T>(pub &'a [(String, Value<T>)]);

impl<T> Serialize for NamedArgs<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Wrap a writer to indent any newlines by some amount.
pub struct IndentedWriter<const U: usize, W>(pub W);

impl<const U: usize, W: std::io::Write> std::io::Write for IndentedWriter<U, W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        for &byte in buf {
            self.0.write_all(&[byte])?;
            if byte == b'\n' {
                self.0.write_all(&[b' '; U])?;
            }
        }
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        self.0.flush()
    }
}
