//! # gdtrans
//!
//! A pure-Rust library for reading, patching, and re-writing Godot
//! translation resources.
//!
//! ## Supported Formats
//!
//! - **RSRC containers** - The engine's binary resource format, plain or
//!   wrapped in the block-compressed `RSCC` framing
//! - **Optimized translations** - The perfect-hash string table stored by
//!   `PHashTranslation`/`OptimizedTranslation` resources
//! - **CSV interchange** - `index,original,translated` rows for translators
//! - **PCK members** - extraction and re-insertion via the external
//!   `godotpcktool` executable
//!
//! ## Quick Start
//!
//! ```no_run
//! use gdtrans::formats::translation::TranslationResource;
//!
//! // Pull the message table out of a .translation file
//! let mut resource = TranslationResource::open("text.en.translation")?;
//! let messages = resource.get_messages()?;
//!
//! // Swap every message for a new one and write the patched file back
//! let replacements: Vec<String> = messages.iter().rev().cloned().collect();
//! resource.replace(&replacements)?;
//! resource.save("text.en.translation")?;
//! # Ok::<(), gdtrans::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `gdtrans` command-line binary
//! - `zstd` - Enables the zstd block codec (compression mode 2)

pub mod error;
pub mod formats;
pub mod pck;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::formats::resource::{
        ResourceContainer, ResourceHeader, Variant, parse_resource_bytes, read_resource,
        serialize_resource, write_resource,
    };
    pub use crate::formats::translation::{
        MessageDecompressor, TranslationResource, export_messages, import_messages,
    };
    pub use crate::pck::PckTool;
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
