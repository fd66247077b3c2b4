//! Optimized translation tables
//!
//! `PHashTranslation`/`OptimizedTranslation` resources store their
//! messages in a perfect-hash table spread across three properties: a
//! slot array (`hash_table`), a flat bucket/element area
//! (`bucket_table`), and a packed byte blob of possibly-compressed
//! NUL-terminated strings (`strings`). Replacing messages rewrites the
//! blob and each element's offset/size fields while leaving every hash
//! decision (slot mapping, bucket sizes, probe seeds, keys) untouched,
//! so the engine keeps finding the right bucket.

mod interchange;
mod smaz;

pub use interchange::{MessageRow, export_messages, import_messages};
pub use smaz::{CodebookDecompressor, MessageDecompressor, SmazDecompressor};

use std::path::Path;

use crate::error::{Error, Result};
use crate::formats::resource::{
    ResourceContainer, Variant, parse_resource_bytes, read_resource, serialize_resource,
    write_resource,
};

/// Class names recognized as localization tables.
pub const TRANSLATION_CLASSES: [&str; 3] = ["PHashTranslation", "Translation", "OptimizedTranslation"];

/// Empty slots in the hash table.
const EMPTY_SLOT: i32 = -1;

/// Integer fields per bucket element: key, offset, compressed size,
/// uncompressed size.
const ELEMENT_WORDS: usize = 4;

/// A decoded translation resource with its perfect-hash string table.
#[derive(Debug, Clone)]
pub struct TranslationResource {
    container: ResourceContainer,
    hash_table: Vec<i32>,
    bucket_table: Vec<i32>,
    strings: Vec<u8>,
    locale: String,
}

impl TranslationResource {
    /// Read a `.translation` file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedClass`] if the container's main
    /// resource is not a recognized localization class, and
    /// [`Error::MissingProperty`] if its table properties are absent.
    ///
    /// [`Error::UnsupportedClass`]: crate::Error::UnsupportedClass
    /// [`Error::MissingProperty`]: crate::Error::MissingProperty
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_container(read_resource(path)?)
    }

    /// Parse a `.translation` resource from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_container(parse_resource_bytes(data)?)
    }

    /// Adopt an already decoded container.
    pub fn from_container(container: ResourceContainer) -> Result<Self> {
        let Some(class_name) = container.main_class_name() else {
            return Err(Error::MissingMainResource);
        };
        if !TRANSLATION_CLASSES.contains(&class_name) {
            return Err(Error::UnsupportedClass {
                class_name: class_name.to_string(),
            });
        }

        let properties = container
            .main_properties()
            .ok_or(Error::MissingMainResource)?;
        let hash_table = properties
            .get("hash_table")
            .and_then(Variant::as_int32_array)
            .ok_or(Error::MissingProperty { name: "hash_table" })?
            .to_vec();
        let bucket_table = properties
            .get("bucket_table")
            .and_then(Variant::as_int32_array)
            .ok_or(Error::MissingProperty {
                name: "bucket_table",
            })?
            .to_vec();
        let strings = properties
            .get("strings")
            .and_then(Variant::as_byte_array)
            .ok_or(Error::MissingProperty { name: "strings" })?
            .to_vec();
        let locale = properties
            .get("locale")
            .and_then(Variant::as_str)
            .unwrap_or("en")
            .to_string();

        Ok(Self {
            container,
            hash_table,
            bucket_table,
            strings,
            locale,
        })
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn set_locale(&mut self, locale: impl Into<String>) {
        self.locale = locale.into();
    }

    pub fn hash_table(&self) -> &[i32] {
        &self.hash_table
    }

    pub fn bucket_table(&self) -> &[i32] {
        &self.bucket_table
    }

    /// The packed string blob, without serialization padding.
    pub fn strings(&self) -> &[u8] {
        &self.strings
    }

    /// Number of messages in canonical order.
    pub fn message_count(&self) -> Result<usize> {
        Ok(self.element_slots()?.len())
    }

    /// Extract all messages using the bundled smaz codec for compressed
    /// elements.
    pub fn get_messages(&self) -> Result<Vec<String>> {
        self.get_messages_with(&SmazDecompressor)
    }

    /// Extract all messages in canonical order: hash-table slot order,
    /// then element order within each bucket. This ordering is what
    /// [`replace`](Self::replace) expects back.
    pub fn get_messages_with(&self, decompressor: &dyn MessageDecompressor) -> Result<Vec<String>> {
        let mut messages = Vec::new();
        for slot in self.element_slots()? {
            let offset = to_index(self.bucket_table[slot + 1], "string offset")?;
            let comp_size = to_index(self.bucket_table[slot + 2], "compressed size")?;
            let uncomp_size = self.bucket_table[slot + 3];

            let end = offset
                .checked_add(comp_size)
                .filter(|&end| end <= self.strings.len())
                .ok_or_else(|| Error::MalformedHashTable {
                    message: format!(
                        "string slice {offset}+{comp_size} outside blob of {}",
                        self.strings.len()
                    ),
                })?;
            let slice = &self.strings[offset..end];

            let bytes = if self.bucket_table[slot + 2] == uncomp_size {
                slice.to_vec()
            } else {
                decompressor.decompress(slice)?
            };
            messages.push(trim_nul(&bytes));
        }
        Ok(messages)
    }

    /// Replace every message, in the canonical order produced by
    /// [`get_messages`](Self::get_messages). Rebuilds the string blob and
    /// each element's offset/size fields; hash layout is preserved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] unless exactly one replacement
    /// is supplied per decoded message.
    ///
    /// [`Error::LengthMismatch`]: crate::Error::LengthMismatch
    pub fn replace(&mut self, messages: &[String]) -> Result<()> {
        let slots = self.element_slots()?;
        if messages.len() != slots.len() {
            return Err(Error::LengthMismatch {
                expected: slots.len(),
                actual: messages.len(),
            });
        }

        let mut strings = Vec::new();
        let mut offsets = Vec::with_capacity(messages.len());
        for message in messages {
            offsets.push(strings.len());
            strings.extend_from_slice(message.as_bytes());
            strings.push(0);
        }

        for ((slot, message), offset) in slots.into_iter().zip(messages).zip(offsets) {
            // Replacements are stored uncompressed: both sizes become the
            // NUL-terminated byte length
            let stored_len = message.len() as i32 + 1;
            self.bucket_table[slot + 1] = offset as i32;
            self.bucket_table[slot + 2] = stored_len;
            self.bucket_table[slot + 3] = stored_len;
        }
        self.strings = strings;
        Ok(())
    }

    /// Serialize back to container bytes, re-wrapping compression as
    /// needed.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.sync_properties()?;
        serialize_resource(&self.container)
    }

    /// Write the (possibly patched) resource to disk atomically.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.sync_properties()?;
        write_resource(path, &self.container)
    }

    /// The underlying container.
    pub fn container(&self) -> &ResourceContainer {
        &self.container
    }

    /// Push the table state back into the container's property list.
    fn sync_properties(&mut self) -> Result<()> {
        let locale = self.locale.clone();
        let hash_table = self.hash_table.clone();
        let bucket_table = self.bucket_table.clone();
        let strings = self.strings.clone();

        let properties = self
            .container
            .main_properties_mut()
            .ok_or(Error::MissingMainResource)?;
        properties.insert("locale".to_string(), Variant::String(locale));
        properties.insert(
            "hash_table".to_string(),
            Variant::PackedInt32Array(hash_table),
        );
        properties.insert(
            "bucket_table".to_string(),
            Variant::PackedInt32Array(bucket_table),
        );
        properties.insert("strings".to_string(), Variant::PackedByteArray(strings));
        Ok(())
    }

    /// Bucket-table indices of every element record, in canonical order.
    fn element_slots(&self) -> Result<Vec<usize>> {
        let mut slots = Vec::new();
        for &bucket_index in &self.hash_table {
            if bucket_index == EMPTY_SLOT {
                continue;
            }
            let base = to_index(bucket_index, "bucket index")?;
            let size = *self
                .bucket_table
                .get(base)
                .ok_or_else(|| Error::MalformedHashTable {
                    message: format!(
                        "bucket index {base} outside table of {}",
                        self.bucket_table.len()
                    ),
                })?;
            let size = to_index(size, "bucket size")?;

            // Bucket layout: size, func, then the element records
            let end = base + 2 + size * ELEMENT_WORDS;
            if end > self.bucket_table.len() {
                return Err(Error::MalformedHashTable {
                    message: format!(
                        "bucket at {base} with {size} elements overruns table of {}",
                        self.bucket_table.len()
                    ),
                });
            }
            for element in 0..size {
                slots.push(base + 2 + element * ELEMENT_WORDS);
            }
        }
        Ok(slots)
    }
}

fn to_index(value: i32, what: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::MalformedHashTable {
        message: format!("negative {what}: {value}"),
    })
}

/// Decode bytes as UTF-8 with trailing NULs trimmed.
fn trim_nul(bytes: &[u8]) -> String {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
