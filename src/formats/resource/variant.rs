//! Tagged variant values inside property lists
//!
//! Every property value is a 32-bit type code followed by a
//! format-defined payload. The translation use case only ever looks at a
//! handful of kinds; those are materialized. Everything else is consumed
//! field-by-field so the cursor stays aligned, with the payload bytes
//! captured verbatim so encoding can mirror the original stream.

use super::cursor::{Reader, Writer};
use super::FORMAT_VERSION_NO_NODEPATH_PROPERTY;
use crate::error::{Error, Result};

pub(crate) const VARIANT_NIL: u32 = 1;
pub(crate) const VARIANT_BOOL: u32 = 2;
pub(crate) const VARIANT_INT: u32 = 3;
pub(crate) const VARIANT_FLOAT: u32 = 4;
pub(crate) const VARIANT_STRING: u32 = 5;
pub(crate) const VARIANT_VECTOR2: u32 = 10;
pub(crate) const VARIANT_RECT2: u32 = 11;
pub(crate) const VARIANT_VECTOR3: u32 = 12;
pub(crate) const VARIANT_PLANE: u32 = 13;
pub(crate) const VARIANT_QUATERNION: u32 = 14;
pub(crate) const VARIANT_AABB: u32 = 15;
pub(crate) const VARIANT_BASIS: u32 = 16;
pub(crate) const VARIANT_TRANSFORM3D: u32 = 17;
pub(crate) const VARIANT_TRANSFORM2D: u32 = 18;
pub(crate) const VARIANT_COLOR: u32 = 20;
pub(crate) const VARIANT_NODE_PATH: u32 = 22;
pub(crate) const VARIANT_RID: u32 = 23;
pub(crate) const VARIANT_OBJECT: u32 = 24;
pub(crate) const VARIANT_INPUT_EVENT: u32 = 25;
pub(crate) const VARIANT_DICTIONARY: u32 = 26;
pub(crate) const VARIANT_ARRAY: u32 = 30;
pub(crate) const VARIANT_PACKED_BYTE_ARRAY: u32 = 31;
pub(crate) const VARIANT_PACKED_INT32_ARRAY: u32 = 32;
pub(crate) const VARIANT_PACKED_FLOAT32_ARRAY: u32 = 33;
pub(crate) const VARIANT_PACKED_STRING_ARRAY: u32 = 34;
pub(crate) const VARIANT_PACKED_VECTOR3_ARRAY: u32 = 35;
pub(crate) const VARIANT_PACKED_COLOR_ARRAY: u32 = 36;
pub(crate) const VARIANT_PACKED_VECTOR2_ARRAY: u32 = 37;
pub(crate) const VARIANT_INT64: u32 = 40;
pub(crate) const VARIANT_DOUBLE: u32 = 41;
pub(crate) const VARIANT_CALLABLE: u32 = 42;
pub(crate) const VARIANT_SIGNAL: u32 = 43;
pub(crate) const VARIANT_STRING_NAME: u32 = 44;
pub(crate) const VARIANT_VECTOR2I: u32 = 45;
pub(crate) const VARIANT_RECT2I: u32 = 46;
pub(crate) const VARIANT_VECTOR3I: u32 = 47;
pub(crate) const VARIANT_PACKED_INT64_ARRAY: u32 = 48;
pub(crate) const VARIANT_PACKED_FLOAT64_ARRAY: u32 = 49;
pub(crate) const VARIANT_VECTOR4: u32 = 50;
pub(crate) const VARIANT_VECTOR4I: u32 = 51;
pub(crate) const VARIANT_PROJECTION: u32 = 52;

// Object reference sub-forms
pub(crate) const OBJECT_EMPTY: u32 = 0;
pub(crate) const OBJECT_EXTERNAL_RESOURCE: u32 = 1;
pub(crate) const OBJECT_INTERNAL_RESOURCE: u32 = 2;
pub(crate) const OBJECT_EXTERNAL_RESOURCE_INDEX: u32 = 3;

/// Container and array lengths carry a reserved high bit.
const LENGTH_MASK: u32 = 0x7FFFFFFF;

/// High bit of a name reference selects an inline name over an interned one.
const NAME_INLINE_BIT: u32 = 0x80000000;

/// A decoded property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Nil,
    Bool(bool),
    Int(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    String(String),
    PackedByteArray(Vec<u8>),
    PackedInt32Array(Vec<i32>),
    /// A kind consumed for cursor alignment only. `raw` holds the
    /// payload bytes after the type code so encoding can mirror the
    /// original stream without materializing the value.
    Opaque { kind: u32, raw: Vec<u8> },
}

impl Variant {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int32_array(&self) -> Option<&[i32]> {
        match self {
            Variant::PackedInt32Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_byte_array(&self) -> Option<&[u8]> {
        match self {
            Variant::PackedByteArray(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Decoder for variant values, parameterized by the container's format
/// version and string intern table.
pub(crate) struct VariantReader<'a> {
    format_version: i32,
    string_map: &'a [String],
    dict_keys: Vec<String>,
}

impl<'a> VariantReader<'a> {
    pub fn new(format_version: i32, string_map: &'a [String]) -> Self {
        Self {
            format_version,
            string_map,
            dict_keys: Vec::new(),
        }
    }

    /// Resolve a 32-bit name reference: an intern-table index, or (high
    /// bit set) an inline length-prefixed name that is not interned.
    pub fn read_name(&self, r: &mut Reader) -> Result<String> {
        let id = r.get_u32()?;
        if id & NAME_INLINE_BIT != 0 {
            let len = (id & LENGTH_MASK) as usize;
            if len == 0 {
                return Ok(String::new());
            }
            let buf = r.get_bytes(len)?;
            Ok(String::from_utf8_lossy(&buf[..len - 1]).into_owned())
        } else {
            self.string_map
                .get(id as usize)
                .cloned()
                .ok_or(Error::InvalidStringIndex(id))
        }
    }

    /// String keys at the top level of the most recently decoded
    /// dictionary (used for the `_skip_save_` marker).
    pub fn last_dict_keys(&self) -> &[String] {
        &self.dict_keys
    }

    pub fn decode(&mut self, r: &mut Reader) -> Result<Variant> {
        let kind = r.get_u32()?;
        match kind {
            VARIANT_NIL => Ok(Variant::Nil),
            VARIANT_BOOL => Ok(Variant::Bool(r.get_u32()? != 0)),
            VARIANT_INT => Ok(Variant::Int(r.get_i32()?)),
            VARIANT_INT64 => Ok(Variant::Int64(r.get_i64()?)),
            VARIANT_FLOAT => Ok(Variant::Float(r.get_f32()?)),
            VARIANT_DOUBLE => Ok(Variant::Double(r.get_f64()?)),
            VARIANT_STRING => Ok(Variant::String(r.get_unicode()?)),
            VARIANT_PACKED_BYTE_ARRAY => {
                let len = r.get_u32()? as usize;
                let bytes = r.get_bytes(len)?;
                r.skip(pad_to_word(len));
                Ok(Variant::PackedByteArray(bytes))
            }
            VARIANT_PACKED_INT32_ARRAY => {
                let len = r.get_u32()? as usize;
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    values.push(r.get_i32()?);
                }
                Ok(Variant::PackedInt32Array(values))
            }
            _ => {
                let start = r.position();
                self.skip_value(r, kind)?;
                Ok(Variant::Opaque {
                    kind,
                    raw: r.span(start).to_vec(),
                })
            }
        }
    }

    /// Consume the exact payload of a non-materialized kind.
    fn skip_value(&mut self, r: &mut Reader, kind: u32) -> Result<()> {
        match kind {
            VARIANT_VECTOR2 => skip_reals(r, 2),
            VARIANT_VECTOR3 => skip_reals(r, 3),
            VARIANT_VECTOR4 | VARIANT_RECT2 | VARIANT_PLANE | VARIANT_QUATERNION => {
                skip_reals(r, 4)
            }
            VARIANT_AABB | VARIANT_TRANSFORM2D => skip_reals(r, 6),
            VARIANT_BASIS => skip_reals(r, 9),
            VARIANT_TRANSFORM3D => skip_reals(r, 12),
            VARIANT_PROJECTION => skip_reals(r, 16),
            VARIANT_VECTOR2I => skip_ints(r, 2),
            VARIANT_VECTOR3I => skip_ints(r, 3),
            VARIANT_VECTOR4I | VARIANT_RECT2I => skip_ints(r, 4),
            // Colors are four single-precision floats regardless of real width
            VARIANT_COLOR => skip_f32s(r, 4),
            VARIANT_STRING_NAME => {
                r.get_unicode()?;
                Ok(())
            }
            VARIANT_NODE_PATH => self.skip_node_path(r),
            VARIANT_RID => {
                r.get_u32()?;
                Ok(())
            }
            VARIANT_OBJECT => skip_object(r),
            VARIANT_INPUT_EVENT | VARIANT_CALLABLE | VARIANT_SIGNAL => Ok(()),
            VARIANT_DICTIONARY => self.skip_dictionary(r),
            VARIANT_ARRAY => {
                let count = r.get_u32()? & LENGTH_MASK;
                for _ in 0..count {
                    self.decode(r)?;
                }
                Ok(())
            }
            VARIANT_PACKED_STRING_ARRAY => {
                let count = r.get_u32()?;
                for _ in 0..count {
                    r.get_unicode()?;
                }
                Ok(())
            }
            VARIANT_PACKED_FLOAT32_ARRAY => {
                let count = r.get_u32()? as i64;
                r.skip(count * 4);
                Ok(())
            }
            VARIANT_PACKED_FLOAT64_ARRAY | VARIANT_PACKED_INT64_ARRAY => {
                let count = r.get_u32()? as i64;
                r.skip(count * 8);
                Ok(())
            }
            VARIANT_PACKED_VECTOR2_ARRAY => {
                let count = r.get_u32()? as usize;
                skip_reals(r, count * 2)
            }
            VARIANT_PACKED_VECTOR3_ARRAY => {
                let count = r.get_u32()? as usize;
                skip_reals(r, count * 3)
            }
            VARIANT_PACKED_COLOR_ARRAY => {
                let count = r.get_u32()? as usize;
                skip_f32s(r, count * 4)
            }
            _ => {
                // Best-effort compatibility: an unknown code consumes
                // nothing; later reads will surface any misalignment.
                tracing::warn!(kind, "unknown variant type code, treating as empty");
                Ok(())
            }
        }
    }

    fn skip_node_path(&self, r: &mut Reader) -> Result<()> {
        let name_count = u32::from(r.get_u16()?);
        // Bit 15 is the absolute-path flag
        let mut subname_count = u32::from(r.get_u16()?) & 0x7FFF;
        if self.format_version < FORMAT_VERSION_NO_NODEPATH_PROPERTY {
            // Older formats stored the property as an implicit extra subname
            subname_count += 1;
        }
        for _ in 0..name_count + subname_count {
            self.read_name(r)?;
        }
        Ok(())
    }

    fn skip_dictionary(&mut self, r: &mut Reader) -> Result<()> {
        let count = r.get_u32()? & LENGTH_MASK;
        let mut keys = Vec::new();
        for _ in 0..count {
            if let Variant::String(key) = self.decode(r)? {
                keys.push(key);
            }
            self.decode(r)?;
        }
        // Assigned last so the outermost dictionary's keys win
        self.dict_keys = keys;
        Ok(())
    }
}

fn skip_reals(r: &mut Reader, count: usize) -> Result<()> {
    let width = if r.real_is_double { 8 } else { 4 };
    r.skip(count as i64 * width);
    Ok(())
}

fn skip_f32s(r: &mut Reader, count: usize) -> Result<()> {
    r.skip(count as i64 * 4);
    Ok(())
}

fn skip_ints(r: &mut Reader, count: usize) -> Result<()> {
    r.skip(count as i64 * 4);
    Ok(())
}

fn skip_object(r: &mut Reader) -> Result<()> {
    match r.get_u32()? {
        OBJECT_EMPTY => Ok(()),
        OBJECT_EXTERNAL_RESOURCE => {
            r.get_unicode()?;
            r.get_unicode()?;
            Ok(())
        }
        OBJECT_INTERNAL_RESOURCE | OBJECT_EXTERNAL_RESOURCE_INDEX => {
            r.get_u32()?;
            Ok(())
        }
        other => {
            tracing::warn!(form = other, "unknown object reference sub-form");
            Ok(())
        }
    }
}

/// Padding after a byte blob to the next 4-byte boundary.
pub(crate) fn pad_to_word(len: usize) -> i64 {
    ((4 - len % 4) % 4) as i64
}

/// Encode a name, preferring the intern table.
pub(crate) fn write_name(w: &mut Writer, name: &str, string_map: &[String]) -> Result<()> {
    if let Some(index) = string_map.iter().position(|s| s == name) {
        w.store_u32(index as u32)
    } else {
        w.store_u32(NAME_INLINE_BIT | (name.len() as u32 + 1))?;
        w.write(name.as_bytes())?;
        w.store_u8(0)
    }
}

/// Serialize a variant, mirroring the decoder's byte layout.
pub(crate) fn encode(value: &Variant, w: &mut Writer) -> Result<()> {
    match value {
        Variant::Nil => w.store_u32(VARIANT_NIL),
        Variant::Bool(b) => {
            w.store_u32(VARIANT_BOOL)?;
            w.store_u32(u32::from(*b))
        }
        Variant::Int(v) => {
            w.store_u32(VARIANT_INT)?;
            w.store_i32(*v)
        }
        Variant::Int64(v) => {
            w.store_u32(VARIANT_INT64)?;
            w.store_i64(*v)
        }
        Variant::Float(v) => {
            w.store_u32(VARIANT_FLOAT)?;
            w.store_f32(*v)
        }
        Variant::Double(v) => {
            w.store_u32(VARIANT_DOUBLE)?;
            w.store_f64(*v)
        }
        Variant::String(s) => {
            w.store_u32(VARIANT_STRING)?;
            w.store_unicode(s)
        }
        Variant::PackedByteArray(bytes) => {
            w.store_u32(VARIANT_PACKED_BYTE_ARRAY)?;
            w.store_u32(bytes.len() as u32)?;
            w.write(bytes)?;
            for _ in 0..pad_to_word(bytes.len()) {
                w.store_u8(0)?;
            }
            Ok(())
        }
        Variant::PackedInt32Array(values) => {
            w.store_u32(VARIANT_PACKED_INT32_ARRAY)?;
            w.store_u32(values.len() as u32)?;
            for v in values {
                w.store_i32(*v)?;
            }
            Ok(())
        }
        Variant::Opaque { kind, raw } => {
            w.store_u32(*kind)?;
            w.write(raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn decode_one(bytes: &[u8], format_version: i32, strings: &[String]) -> (Variant, usize) {
        let mut r = Reader::new(bytes);
        let mut vr = VariantReader::new(format_version, strings);
        let value = vr.decode(&mut r).unwrap();
        (value, r.position())
    }

    fn encode_value(kind: u32, payload: &[u8]) -> Vec<u8> {
        let mut w = Writer::new();
        w.store_u32(kind).unwrap();
        w.write(payload).unwrap();
        w.into_bytes()
    }

    #[test]
    fn test_materialized_scalars() {
        let (value, _) = decode_one(&encode_value(VARIANT_BOOL, &[1, 0, 0, 0]), 5, &[]);
        assert_eq!(value, Variant::Bool(true));

        let (value, _) = decode_one(&encode_value(VARIANT_INT, &(-7i32).to_le_bytes()), 5, &[]);
        assert_eq!(value, Variant::Int(-7));

        let (value, consumed) =
            decode_one(&encode_value(VARIANT_DOUBLE, &2.5f64.to_le_bytes()), 5, &[]);
        assert_eq!(value, Variant::Double(2.5));
        assert_eq!(consumed, 12);
    }

    #[test]
    fn test_byte_array_padding() {
        // 5 payload bytes are padded to 8
        let mut w = Writer::new();
        w.store_u32(VARIANT_PACKED_BYTE_ARRAY).unwrap();
        w.store_u32(5).unwrap();
        w.write(&[1, 2, 3, 4, 5, 0, 0, 0]).unwrap();
        let bytes = w.into_bytes();

        let (value, consumed) = decode_one(&bytes, 5, &[]);
        assert_eq!(value, Variant::PackedByteArray(vec![1, 2, 3, 4, 5]));
        assert_eq!(consumed, bytes.len());

        let mut out = Writer::new();
        encode(&value, &mut out).unwrap();
        assert_eq!(out.into_bytes(), bytes);
    }

    #[test]
    fn test_int32_array_roundtrip() {
        let mut w = Writer::new();
        w.store_u32(VARIANT_PACKED_INT32_ARRAY).unwrap();
        w.store_u32(3).unwrap();
        for v in [-1i32, 0, 7] {
            w.store_i32(v).unwrap();
        }
        let bytes = w.into_bytes();

        let (value, _) = decode_one(&bytes, 5, &[]);
        assert_eq!(value, Variant::PackedInt32Array(vec![-1, 0, 7]));

        let mut out = Writer::new();
        encode(&value, &mut out).unwrap();
        assert_eq!(out.into_bytes(), bytes);
    }

    #[test]
    fn test_opaque_captures_raw_bytes() {
        let payload: Vec<u8> = (0..8).flat_map(|i| (i as f32).to_le_bytes()).collect();
        let bytes = encode_value(VARIANT_TRANSFORM2D, &payload[..24]);
        let (value, consumed) = decode_one(&bytes, 5, &[]);
        assert_eq!(consumed, bytes.len());
        assert_eq!(
            value,
            Variant::Opaque {
                kind: VARIANT_TRANSFORM2D,
                raw: payload[..24].to_vec()
            }
        );

        let mut out = Writer::new();
        encode(&value, &mut out).unwrap();
        assert_eq!(out.into_bytes(), bytes);
    }

    #[test]
    fn test_real_width_in_aggregates() {
        // A vector3 is 12 bytes at f32 width, 24 at f64 width
        let bytes = encode_value(VARIANT_VECTOR3, &[0u8; 24]);
        let mut r = Reader::new(&bytes);
        let mut vr = VariantReader::new(5, &[]);
        vr.decode(&mut r).unwrap();
        assert_eq!(r.position(), 4 + 12);

        let mut r = Reader::new(&bytes);
        r.real_is_double = true;
        vr.decode(&mut r).unwrap();
        assert_eq!(r.position(), 4 + 24);
    }

    #[test]
    fn test_node_path_subname_count_by_version() {
        let strings = vec!["root".to_string(), "child".to_string(), "prop".to_string()];
        let mut w = Writer::new();
        w.store_u32(VARIANT_NODE_PATH).unwrap();
        w.store_u16(1).unwrap(); // name_count
        w.store_u16(1 | 0x8000).unwrap(); // subname_count, absolute flag set
        for index in [0u32, 1, 2] {
            w.store_u32(index).unwrap();
        }
        let bytes = w.into_bytes();

        // format < 3: implicit extra subname, consumes all 3 references
        let (_, consumed) = decode_one(&bytes, 2, &strings);
        assert_eq!(consumed, bytes.len());

        // format >= 3: exactly name_count + subname_count references
        let (_, consumed) = decode_one(&bytes, 3, &strings);
        assert_eq!(consumed, bytes.len() - 4);
    }

    #[test]
    fn test_dictionary_masks_length_high_bit() {
        let mut w = Writer::new();
        w.store_u32(VARIANT_DICTIONARY).unwrap();
        w.store_u32(1 | 0x80000000).unwrap(); // shared flag must be masked off
        // key "_skip_save_", value nil
        w.store_u32(VARIANT_STRING).unwrap();
        w.store_unicode("_skip_save_").unwrap();
        w.store_u32(VARIANT_NIL).unwrap();
        let bytes = w.into_bytes();

        let mut r = Reader::new(&bytes);
        let mut vr = VariantReader::new(5, &[]);
        let value = vr.decode(&mut r).unwrap();
        assert_eq!(r.position(), bytes.len());
        assert!(matches!(
            value,
            Variant::Opaque {
                kind: VARIANT_DICTIONARY,
                ..
            }
        ));
        assert_eq!(vr.last_dict_keys(), ["_skip_save_"]);
    }

    #[test]
    fn test_unknown_type_code_consumes_nothing() {
        let bytes = encode_value(999, &[1, 2, 3, 4]);
        let (value, consumed) = decode_one(&bytes, 5, &[]);
        assert_eq!(consumed, 4);
        assert_eq!(
            value,
            Variant::Opaque {
                kind: 999,
                raw: Vec::new()
            }
        );
    }

    #[test]
    fn test_name_resolution() {
        let strings = vec!["locale".to_string()];
        let vr = VariantReader::new(5, &strings);

        let mut r = Reader::new(&[0, 0, 0, 0]);
        assert_eq!(vr.read_name(&mut r).unwrap(), "locale");

        // Inline name: high bit set, low bits are the NUL-inclusive length
        let mut w = Writer::new();
        w.store_u32(0x80000000 | 6).unwrap();
        w.write(b"hello\0").unwrap();
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        assert_eq!(vr.read_name(&mut r).unwrap(), "hello");

        // Out-of-range intern index
        let mut r = Reader::new(&[9, 0, 0, 0]);
        assert!(matches!(
            vr.read_name(&mut r),
            Err(Error::InvalidStringIndex(9))
        ));
    }

    #[test]
    fn test_write_name_prefers_intern_table() {
        let strings = vec!["hash_table".to_string()];
        let mut w = Writer::new();
        write_name(&mut w, "hash_table", &strings).unwrap();
        write_name(&mut w, "other", &strings).unwrap();
        let bytes = w.into_bytes();

        let vr = VariantReader::new(5, &strings);
        let mut r = Reader::new(&bytes);
        assert_eq!(vr.read_name(&mut r).unwrap(), "hash_table");
        assert_eq!(r.position(), 4);
        assert_eq!(vr.read_name(&mut r).unwrap(), "other");
    }
}
