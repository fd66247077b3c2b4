//! Resource container encoding
//!
//! Serialization mirrors the decode order field for field; decoding a
//! container and immediately re-encoding it reproduces the plain stream
//! byte for byte. Internal-resource offsets are recomputed by patching
//! their table slots once the body positions are known.

use std::io::Write as _;
use std::path::Path;

use super::compressed;
use super::cursor::Writer;
use super::variant;
use super::{
    FLAG_HAS_SCRIPT_CLASS, HeaderExtra, InternalPayload, LEGACY_RESERVED_FIELDS, RESERVED_FIELDS,
    RESOURCE_MAGIC, ResourceContainer,
};
use crate::error::{Error, Result};

/// Write a resource container to disk.
///
/// The bytes are staged in a temporary file next to the destination and
/// persisted atomically, so a failed save never leaves a partial file.
pub fn write_resource<P: AsRef<Path>>(path: P, container: &ResourceContainer) -> Result<()> {
    let path = path.as_ref();
    let bytes = serialize_resource(container)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    staged.write_all(&bytes)?;
    staged.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Serialize a container to bytes, re-wrapping the compression framing
/// it arrived in when that framing has write support.
pub fn serialize_resource(container: &ResourceContainer) -> Result<Vec<u8>> {
    let plain = serialize_plain(container)?;
    match &container.compression {
        Some(info) if compressed::can_rewrap(info) => compressed::rewrap_container(&plain, info),
        Some(info) => {
            tracing::warn!(
                mode = info.mode,
                "no write support for original compression mode, saving uncompressed"
            );
            Ok(plain)
        }
        None => Ok(plain),
    }
}

fn serialize_plain(container: &ResourceContainer) -> Result<Vec<u8>> {
    let header = &container.header;
    let mut w = Writer::new();

    if !container.headless {
        w.write(&RESOURCE_MAGIC)?;
    }

    // The endianness words themselves are always little-endian
    w.store_u32(u32::from(header.big_endian))?;
    w.store_u32(u32::from(header.use_real64))?;
    w.big_endian = header.big_endian;

    w.store_i32(header.version_major)?;
    w.store_i32(header.version_minor)?;
    w.store_i32(header.format_version)?;
    w.store_unicode(&header.class_name)?;
    w.store_i64(header.import_metadata_offset)?;

    match &header.extra {
        HeaderExtra::Modern {
            flags,
            uid,
            script_class,
        } => {
            w.store_u32(*flags)?;
            w.store_u64(uid.unwrap_or(0))?;
            if flags & FLAG_HAS_SCRIPT_CLASS != 0 {
                w.store_unicode(script_class.as_deref().unwrap_or_default())?;
            }
            for _ in 0..RESERVED_FIELDS {
                w.store_u32(0)?;
            }
        }
        HeaderExtra::Legacy => {
            for _ in 0..LEGACY_RESERVED_FIELDS {
                w.store_u32(0)?;
            }
        }
    }
    w.real_is_double = header.real_is_double();

    w.store_u32(container.string_map.len() as u32)?;
    for entry in &container.string_map {
        w.store_unicode(entry)?;
    }

    let using_uids = header.using_uids();
    w.store_u32(container.external_resources.len() as u32)?;
    for external in &container.external_resources {
        w.store_unicode(&external.kind)?;
        w.store_unicode(&external.path)?;
        if using_uids {
            w.store_u64(external.uid.unwrap_or(0))?;
        }
    }

    // Reference table first, with placeholder offsets to patch once the
    // bodies have been laid out
    w.store_u32(container.internal_resources.len() as u32)?;
    let mut offset_slots = Vec::with_capacity(container.internal_resources.len());
    for internal in &container.internal_resources {
        w.store_unicode(&internal.path)?;
        offset_slots.push(w.position());
        w.store_u64(0)?;
    }

    for (internal, slot) in container.internal_resources.iter().zip(offset_slots) {
        w.patch_u64(slot, w.position() as u64);
        match &internal.payload {
            InternalPayload::Raw(bytes) => w.write(bytes)?,
            InternalPayload::Properties {
                class_name,
                properties,
            } => {
                w.store_unicode(class_name)?;
                w.store_i32(properties.len() as i32)?;
                for (name, value) in properties {
                    variant::write_name(&mut w, name, &container.string_map)?;
                    variant::encode(value, &mut w)?;
                }
            }
        }
    }

    if !container.headless {
        w.write(&RESOURCE_MAGIC)?;
    }
    Ok(w.into_bytes())
}
