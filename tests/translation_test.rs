use gdtrans::formats::resource::{
    HeaderExtra, InternalPayload, InternalResource, ResourceContainer, ResourceHeader,
};
use gdtrans::prelude::*;
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

/// A minimal 4.x translation container: two single-element buckets
/// holding "Hello" and "World".
fn sample_container() -> ResourceContainer {
    let mut properties = IndexMap::new();
    properties.insert("locale".to_string(), Variant::String("en".to_string()));
    properties.insert(
        "hash_table".to_string(),
        Variant::PackedInt32Array(vec![-1, 0, -1, 6]),
    );
    properties.insert(
        "bucket_table".to_string(),
        Variant::PackedInt32Array(vec![
            1, 0x11, 100, 0, 6, 6, // bucket for "Hello"
            1, 0x22, 200, 6, 6, 6, // bucket for "World"
        ]),
    );
    properties.insert(
        "strings".to_string(),
        Variant::PackedByteArray(b"Hello\0World\0".to_vec()),
    );

    ResourceContainer {
        header: ResourceHeader {
            big_endian: false,
            use_real64: false,
            version_major: 4,
            version_minor: 2,
            format_version: 5,
            class_name: "OptimizedTranslation".to_string(),
            import_metadata_offset: 0,
            extra: HeaderExtra::Modern {
                flags: 0,
                uid: None,
                script_class: None,
            },
        },
        string_map: vec![
            "locale".to_string(),
            "hash_table".to_string(),
            "bucket_table".to_string(),
            "strings".to_string(),
        ],
        external_resources: Vec::new(),
        internal_resources: vec![InternalResource {
            path: "local://0".to_string(),
            offset: 0,
            skip_save: false,
            payload: InternalPayload::Properties {
                class_name: "OptimizedTranslation".to_string(),
                properties,
            },
        }],
        main_index: 0,
        headless: false,
        compression: None,
    }
}

#[test]
fn test_file_roundtrip_is_byte_identical() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("text.en.translation");

    let bytes = serialize_resource(&sample_container()).unwrap();
    std::fs::write(&path, &bytes).unwrap();

    let container = read_resource(&path).unwrap();
    assert_eq!(serialize_resource(&container).unwrap(), bytes);
}

#[test]
fn test_replace_and_reload_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("text.en.translation");

    let bytes = serialize_resource(&sample_container()).unwrap();
    std::fs::write(&path, &bytes).unwrap();

    let mut resource = TranslationResource::open(&path).unwrap();
    assert_eq!(resource.get_messages().unwrap(), ["Hello", "World"]);

    resource
        .replace(&["Hi".to_string(), "Earth".to_string()])
        .unwrap();
    resource.set_locale("fr");
    resource.save(&path).unwrap();

    let reread = TranslationResource::open(&path).unwrap();
    assert_eq!(reread.get_messages().unwrap(), ["Hi", "Earth"]);
    assert_eq!(reread.strings(), b"Hi\0Earth\0");
    assert_eq!(reread.locale(), "fr");
    // Hash layout survives the rewrite
    assert_eq!(reread.hash_table(), [-1, 0, -1, 6]);
}

#[test]
fn test_export_translate_import_cycle() {
    let dir = tempdir().unwrap();
    let translation_path = dir.path().join("text.en.translation");
    let csv_path = dir.path().join("text.en.translation.csv");

    let bytes = serialize_resource(&sample_container()).unwrap();
    std::fs::write(&translation_path, &bytes).unwrap();

    // Export for the translator
    let mut resource = TranslationResource::open(&translation_path).unwrap();
    let messages = resource.get_messages().unwrap();
    assert_eq!(export_messages(&messages, &csv_path).unwrap(), 2);

    // The translator fills in one row and leaves the other blank
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    let translated = csv.replacen("\"\"", "\"Bonjour\"", 1);
    std::fs::write(&csv_path, translated).unwrap();

    // Import: translated column when present, original otherwise
    let replacements = import_messages(&csv_path).unwrap();
    assert_eq!(replacements, ["Bonjour", "World"]);

    resource.replace(&replacements).unwrap();
    resource.save(&translation_path).unwrap();

    let reread = TranslationResource::open(&translation_path).unwrap();
    assert_eq!(reread.get_messages().unwrap(), ["Bonjour", "World"]);
}

#[test]
fn test_wrong_length_import_is_rejected() {
    let mut resource =
        TranslationResource::from_bytes(&serialize_resource(&sample_container()).unwrap()).unwrap();
    assert!(matches!(
        resource.replace(&["just one".to_string()]),
        Err(Error::LengthMismatch {
            expected: 2,
            actual: 1
        })
    ));
}

#[cfg(feature = "zstd")]
#[test]
fn test_compressed_container_end_to_end() {
    use gdtrans::formats::resource::{CompressedHeader, CompressionInfo};

    let dir = tempdir().unwrap();
    let path = dir.path().join("text.en.translation");

    let mut container = sample_container();
    container.compression = Some(CompressionInfo {
        header: CompressedHeader::Standard { version: 0 },
        mode: 2,
        block_size: 4096,
    });
    std::fs::write(&path, serialize_resource(&container).unwrap()).unwrap();
    assert_eq!(&std::fs::read(&path).unwrap()[..4], b"RSCC");

    let mut resource = TranslationResource::open(&path).unwrap();
    assert_eq!(resource.get_messages().unwrap(), ["Hello", "World"]);

    resource
        .replace(&["Salut".to_string(), "Monde".to_string()])
        .unwrap();
    resource.save(&path).unwrap();

    // Still wrapped the same way after the save
    assert_eq!(&std::fs::read(&path).unwrap()[..4], b"RSCC");
    let reread = TranslationResource::open(&path).unwrap();
    assert_eq!(reread.get_messages().unwrap(), ["Salut", "Monde"]);
}
