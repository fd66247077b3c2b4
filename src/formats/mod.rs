//! File format handlers for Godot resource files

pub mod resource;
pub mod translation;

// Re-export main types for convenience
pub use resource::{ResourceContainer, ResourceHeader, Variant, read_resource, write_resource};
pub use translation::TranslationResource;
