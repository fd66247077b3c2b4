//! Resource container decoding

use std::path::Path;

use indexmap::IndexMap;

use super::compressed::{self, CompressionInfo};
use super::cursor::Reader;
use super::variant::{VARIANT_DICTIONARY, Variant, VariantReader};
use super::{
    ExternalResource, FLAG_HAS_SCRIPT_CLASS, FLAG_UIDS, FORMAT_VERSION_MAX, HeaderExtra,
    InternalPayload, InternalResource, LEGACY_RESERVED_FIELDS, RESERVED_FIELDS, RESOURCE_MAGIC,
    ResourceContainer, ResourceHeader,
};
use crate::error::{Error, Result};

/// Read a resource container from disk.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read, [`Error::InvalidMagic`]
/// if it is neither a plain, compressed, nor headless container, and
/// [`Error::TruncatedInput`] if the stream ends mid-field.
///
/// [`Error::Io`]: crate::Error::Io
/// [`Error::InvalidMagic`]: crate::Error::InvalidMagic
/// [`Error::TruncatedInput`]: crate::Error::TruncatedInput
pub fn read_resource<P: AsRef<Path>>(path: P) -> Result<ResourceContainer> {
    let buffer = std::fs::read(path)?;
    parse_resource_bytes(&buffer)
}

/// Parse resource container data from bytes, unwrapping the compressed
/// framing when present.
pub fn parse_resource_bytes(data: &[u8]) -> Result<ResourceContainer> {
    let (plain, compression) = compressed::unwrap_container(data)?;
    parse_plain(&plain, compression)
}

fn parse_plain(data: &[u8], compression: Option<CompressionInfo>) -> Result<ResourceContainer> {
    if data.len() < 4 {
        return Err(Error::TruncatedInput);
    }

    let headless = if data[..4] == RESOURCE_MAGIC {
        false
    } else if looks_headless(data) {
        tracing::debug!("no container magic, parsing as headless");
        true
    } else {
        return Err(Error::InvalidMagic([data[0], data[1], data[2], data[3]]));
    };

    let mut r = Reader::new(data);
    if !headless {
        r.skip(4);
    }

    // The endianness words themselves are always little-endian
    let big_endian = r.get_u32()? == 1;
    let use_real64 = r.get_u32()? == 1;
    r.big_endian = big_endian;

    let version_major = r.get_i32()?;
    let version_minor = r.get_i32()?;
    let format_version = r.get_i32()?;
    let class_name = r.get_unicode()?;
    let import_metadata_offset = r.get_i64()?;

    let extra = if version_major >= 4 {
        let flags = r.get_u32()?;
        let uid = if flags & FLAG_UIDS != 0 {
            Some(r.get_u64()?)
        } else {
            r.skip(8);
            None
        };
        let script_class = if flags & FLAG_HAS_SCRIPT_CLASS != 0 {
            Some(r.get_unicode()?)
        } else {
            None
        };
        r.skip(4 * RESERVED_FIELDS as i64);
        HeaderExtra::Modern {
            flags,
            uid,
            script_class,
        }
    } else {
        r.skip(4 * LEGACY_RESERVED_FIELDS as i64);
        HeaderExtra::Legacy
    };

    let header = ResourceHeader {
        big_endian,
        use_real64,
        version_major,
        version_minor,
        format_version,
        class_name,
        import_metadata_offset,
        extra,
    };
    r.real_is_double = header.real_is_double();
    let using_uids = header.using_uids();

    let string_table_size = r.get_u32()? as usize;
    let mut string_map = Vec::with_capacity(string_table_size.min(data.len() / 4));
    for _ in 0..string_table_size {
        string_map.push(r.get_unicode()?);
    }

    let external_count = r.get_u32()? as usize;
    let mut external_resources = Vec::with_capacity(external_count.min(data.len() / 4));
    for _ in 0..external_count {
        let kind = r.get_unicode()?;
        let path = r.get_unicode()?;
        let uid = if using_uids { Some(r.get_u64()?) } else { None };
        external_resources.push(ExternalResource { kind, path, uid });
    }

    let internal_count = r.get_u32()? as usize;
    let mut internal_refs = Vec::with_capacity(internal_count.min(data.len() / 4));
    for _ in 0..internal_count {
        let path = r.get_unicode()?;
        let offset = r.get_u64()?;
        internal_refs.push((path, offset));
    }

    // Decode every internal resource to validate the format; only the
    // main one is materialized, the rest keep their raw bytes.
    let mut vr = VariantReader::new(format_version, &string_map);
    let mut decoded = Vec::with_capacity(internal_refs.len());
    for (path, offset) in internal_refs {
        r.seek(offset);
        let class_name = r.get_unicode()?;
        let property_count = r.get_i32()?;
        let mut properties = IndexMap::new();
        let mut skip_save = false;
        for _ in 0..property_count {
            let name = vr.read_name(&mut r)?;
            let value = vr.decode(&mut r)?;
            if name == "__meta__"
                && matches!(
                    value,
                    Variant::Opaque {
                        kind: VARIANT_DICTIONARY,
                        ..
                    }
                )
                && vr.last_dict_keys().iter().any(|key| key == "_skip_save_")
            {
                skip_save = true;
            }
            properties.insert(name, value);
        }
        let end = r.position();
        decoded.push((path, offset, skip_save, class_name, properties, end));
    }

    // The main resource is the last one not marked skip-on-save
    let main_index = decoded
        .iter()
        .rposition(|(_, _, skip_save, ..)| !skip_save)
        .ok_or(Error::MissingMainResource)?;

    let internal_resources = decoded
        .into_iter()
        .enumerate()
        .map(
            |(index, (path, offset, skip_save, class_name, properties, end))| {
                let payload = if index == main_index {
                    InternalPayload::Properties {
                        class_name,
                        properties,
                    }
                } else {
                    InternalPayload::Raw(data[offset as usize..end].to_vec())
                };
                InternalResource {
                    path,
                    offset,
                    skip_save,
                    payload,
                }
            },
        )
        .collect();

    Ok(ResourceContainer {
        header,
        string_map,
        external_resources,
        internal_resources,
        main_index,
        headless,
        compression,
    })
}

/// Heuristic for containers that carry no magic: the first two words
/// must be the 0/1 endianness and real-width flags and the third a
/// plausible version.
fn looks_headless(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let mut r = Reader::new(data);
    let Ok(word0) = r.get_u32() else { return false };
    let Ok(word1) = r.get_u32() else { return false };
    let Ok(word2) = r.get_i32() else { return false };
    word0 <= 1 && word1 <= 1 && (1..=FORMAT_VERSION_MAX).contains(&word2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_magic() {
        let data = *b"NOPE\x00\x00\x00\x00\x00\x00\x00\x00";
        assert!(matches!(
            parse_resource_bytes(&data),
            Err(Error::InvalidMagic([b'N', b'O', b'P', b'E']))
        ));
    }

    #[test]
    fn test_truncated_input() {
        assert!(matches!(
            parse_resource_bytes(b"RS"),
            Err(Error::TruncatedInput)
        ));
        assert!(matches!(
            parse_resource_bytes(b"RSRC\x00\x00"),
            Err(Error::TruncatedInput)
        ));
    }

    #[test]
    fn test_headless_shape_detection() {
        // endian flag, real64 flag, then a word outside the version range
        let mut bad = Vec::new();
        bad.extend_from_slice(&0u32.to_le_bytes());
        bad.extend_from_slice(&0u32.to_le_bytes());
        bad.extend_from_slice(&99u32.to_le_bytes());
        assert!(!looks_headless(&bad));

        let mut good = Vec::new();
        good.extend_from_slice(&0u32.to_le_bytes());
        good.extend_from_slice(&1u32.to_le_bytes());
        good.extend_from_slice(&4u32.to_le_bytes());
        assert!(looks_headless(&good));
    }
}
