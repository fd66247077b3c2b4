//! Godot binary resource container format
//!
//! Binary `RSRC` containers hold a versioned header, a string intern
//! table, external/internal reference tables, and per-resource property
//! lists of tagged variant values. Containers may additionally be wrapped
//! in the block-compressed `RSCC` framing, and a few in the wild carry no
//! magic at all ("headless").

mod compressed;
mod cursor;
mod reader;
mod variant;
mod writer;

pub use compressed::{CompressedHeader, CompressionInfo};
pub use cursor::{Reader, Writer};
pub use reader::{parse_resource_bytes, read_resource};
pub use variant::Variant;
pub use writer::{serialize_resource, write_resource};

use indexmap::IndexMap;

/// Plain-container magic
pub const RESOURCE_MAGIC: [u8; 4] = *b"RSRC";

/// Compressed-container magic
pub const COMPRESSED_MAGIC: [u8; 4] = *b"RSCC";

/// Newest binary format version this codec understands
pub const FORMAT_VERSION_MAX: i32 = 5;

/// Format versions below this carry an implicit extra node-path subname
pub const FORMAT_VERSION_NO_NODEPATH_PROPERTY: i32 = 3;

// Header flag bits (4.x containers only)
pub const FLAG_NAMED_SCENE_IDS: u32 = 1;
pub const FLAG_UIDS: u32 = 2;
pub const FLAG_REAL_T_IS_DOUBLE: u32 = 4;
pub const FLAG_HAS_SCRIPT_CLASS: u32 = 8;

/// Reserved u32 words after the 4.x flag block
pub const RESERVED_FIELDS: usize = 11;

/// Reserved u32 words standing in for the whole flag block in pre-4.x layouts
pub const LEGACY_RESERVED_FIELDS: usize = 14;

/// Top-level container header.
#[derive(Debug, Clone)]
pub struct ResourceHeader {
    pub big_endian: bool,
    pub use_real64: bool,
    pub version_major: i32,
    pub version_minor: i32,
    pub format_version: i32,
    /// Class name of the root resource, as stated in the header.
    pub class_name: String,
    pub import_metadata_offset: i64,
    pub extra: HeaderExtra,
}

/// The version-gated part of the header, selected once after
/// `version_major` is known.
#[derive(Debug, Clone)]
pub enum HeaderExtra {
    /// 4.x layout: flag bitfield, uid slot, optional script class, then
    /// the reserved words.
    Modern {
        flags: u32,
        /// Present only when [`FLAG_UIDS`] is set; the 8-byte slot is
        /// consumed either way.
        uid: Option<u64>,
        /// Present only when [`FLAG_HAS_SCRIPT_CLASS`] is set.
        script_class: Option<String>,
    },
    /// Pre-4.x layout: a fixed 14-word reserved block, no flags.
    Legacy,
}

impl ResourceHeader {
    /// Flag bitfield; pre-4.x headers have none.
    pub fn flags(&self) -> u32 {
        match self.extra {
            HeaderExtra::Modern { flags, .. } => flags,
            HeaderExtra::Legacy => 0,
        }
    }

    pub fn using_uids(&self) -> bool {
        self.flags() & FLAG_UIDS != 0
    }

    /// Width of "real" values in this container.
    pub fn real_is_double(&self) -> bool {
        self.use_real64 || self.flags() & FLAG_REAL_T_IS_DOUBLE != 0
    }
}

/// An entry in the external reference table.
#[derive(Debug, Clone)]
pub struct ExternalResource {
    pub kind: String,
    pub path: String,
    /// Present only in containers with the UIDs flag.
    pub uid: Option<u64>,
}

/// An entry in the internal reference table, plus its decoded body.
#[derive(Debug, Clone)]
pub struct InternalResource {
    pub path: String,
    /// Absolute offset of the body in the plain stream, as decoded.
    /// Recomputed on encode.
    pub offset: u64,
    /// Whether the decoded `__meta__` dictionary carries `_skip_save_`.
    pub skip_save: bool,
    pub payload: InternalPayload,
}

/// Body of an internal resource.
#[derive(Debug, Clone)]
pub enum InternalPayload {
    /// The chosen main resource, fully materialized. Insertion-ordered;
    /// duplicate property names overwrite.
    Properties {
        class_name: String,
        properties: IndexMap<String, Variant>,
    },
    /// Any other internal resource: structurally validated at decode
    /// time, kept as raw bytes so encode reproduces it exactly.
    Raw(Vec<u8>),
}

/// A fully decoded resource container.
#[derive(Debug, Clone)]
pub struct ResourceContainer {
    pub header: ResourceHeader,
    /// String intern table referenced by name references.
    pub string_map: Vec<String>,
    pub external_resources: Vec<ExternalResource>,
    pub internal_resources: Vec<InternalResource>,
    /// Index of the main resource: the last internal resource not marked
    /// skip-on-save.
    pub main_index: usize,
    /// True when the stream carried no leading/trailing magic.
    pub headless: bool,
    /// The compression framing the container arrived in, if any.
    pub compression: Option<CompressionInfo>,
}

impl ResourceContainer {
    /// The main internal resource.
    pub fn main(&self) -> &InternalResource {
        &self.internal_resources[self.main_index]
    }

    /// Class name of the main resource.
    pub fn main_class_name(&self) -> Option<&str> {
        match &self.main().payload {
            InternalPayload::Properties { class_name, .. } => Some(class_name),
            InternalPayload::Raw(_) => None,
        }
    }

    /// Property list of the main resource.
    pub fn main_properties(&self) -> Option<&IndexMap<String, Variant>> {
        match &self.main().payload {
            InternalPayload::Properties { properties, .. } => Some(properties),
            InternalPayload::Raw(_) => None,
        }
    }

    /// Mutable property list of the main resource.
    pub fn main_properties_mut(&mut self) -> Option<&mut IndexMap<String, Variant>> {
        let main_index = self.main_index;
        match &mut self.internal_resources[main_index].payload {
            InternalPayload::Properties { properties, .. } => Some(properties),
            InternalPayload::Raw(_) => None,
        }
    }
}
