use super::*;
use crate::core::RawSize;
use crate::error::SchemaError;
use crate::test_support::schema;

const NESTED: &str = r#"{
    "name": "Root",
    "parameter_types": [
        { "name": "U8", "engineering": { "kind": "integer", "signed": false },
          "encoding": { "kind": "unsigned", "size_in_bits": { "fixed": 8 } } },
        { "name": "Sized", "engineering": { "kind": "string" },
          "encoding": { "kind": "utf8", "size_in_bits": { "dynamic": { "parameter_ref": "Len" } } } },
        { "name": "Pair", "engineering": { "kind": "aggregate", "members": [
            { "name": "lo", "type_ref": "U8" },
            { "name": "hi", "type_ref": "U8", "initial_value": "1" } ] } },
        { "name": "Row", "engineering": { "kind": "array", "array_type_ref": "U8" } }
    ],
    "parameters": [
        { "name": "Len", "type_ref": "U8" },
        { "name": "Name", "type_ref": "Sized" },
        { "name": "Word", "type_ref": "Pair" },
        { "name": "Table", "type_ref": "Row" }
    ],
    "space_systems": [
        { "name": "Payload",
          "parameters": [ { "name": "Local", "type_ref": "U8", "initial_value": "4" } ],
          "containers": [ { "name": "Frame" } ],
          "space_systems": [ { "name": "Camera",
              "parameters": [ { "name": "Shutter", "type_ref": "../../U8" } ] } ] }
    ]
}"#;

#[test]
/// Absolute, relative and `..` references land on the same item.
fn test_path_forms() {
    let schema = schema(NESTED);
    let absolute = schema.resolve_parameter("/Root/Payload/Local", "/").unwrap();
    let relative = schema.resolve_parameter("Payload/Local", "/Root").unwrap();
    let parent = schema
        .resolve_parameter("../Local", "/Root/Payload/Camera")
        .unwrap();
    assert_eq!(absolute.path(), "/Root/Payload/Local");
    assert_eq!(relative.path(), absolute.path());
    assert_eq!(parent.path(), absolute.path());
    assert_eq!(absolute.initial_value(), Some("4"));
    assert_eq!(absolute.type_space_system(), "/Root");
}

#[test]
/// Unqualified names climb to enclosing space systems; qualified ones do not.
fn test_ancestor_fallback() {
    let schema = schema(NESTED);
    let len = schema
        .resolve_parameter("Len", "/Root/Payload/Camera")
        .unwrap();
    assert_eq!(len.path(), "/Root/Len");
    assert!(matches!(
        schema.resolve_parameter("Payload/Len", "/Root/Payload"),
        Err(SchemaError::UnresolvedReference { .. })
    ));
    let shutter = schema
        .resolve_parameter("Shutter", "/Root/Payload/Camera")
        .unwrap();
    assert_eq!(shutter.data_type().name, "U8");
    assert_eq!(
        schema.resolve_container("Frame", "/Root/Payload").unwrap().path,
        "/Root/Payload/Frame"
    );
}

#[test]
/// A `.member` suffix resolves into the aggregate.
fn test_member_suffix() {
    let schema = schema(NESTED);
    let word = schema.resolve_parameter("/Root/Word", "/").unwrap();
    assert!(word.is_aggregate());
    assert_eq!(word.raw_size(), RawSize::Empty);

    let hi = schema.resolve_parameter("Word.hi", "/Root").unwrap();
    assert_eq!(hi.path(), "/Root/Word.hi");
    assert_eq!(hi.raw_size(), RawSize::Fixed(8));
    assert_eq!(hi.initial_value(), Some("1"));
    assert!(matches!(
        schema.resolve_parameter("Word.mid", "/Root"),
        Err(SchemaError::UnknownMember { .. })
    ));
}

#[test]
/// Array types lead to their element type, keeping the array path.
fn test_array_element() {
    let schema = schema(NESTED);
    let table = schema.resolve_parameter("/Root/Table", "/").unwrap();
    assert!(table.is_array());
    let element = schema.array_element(&table).unwrap();
    assert_eq!(element.path(), "/Root/Table");
    assert_eq!(element.raw_size(), RawSize::Fixed(8));
    assert!(matches!(
        schema.array_element(&element),
        Err(SchemaError::NotAnArray { .. })
    ));
}

#[test]
/// Dynamic sizes are reported as such until the walk resolves them.
fn test_dynamic_size() {
    let schema = schema(NESTED);
    let name = schema.resolve_parameter("/Root/Name", "/").unwrap();
    assert_eq!(name.raw_size(), RawSize::Dynamic);
    assert_eq!(name.engineering_type().tag(), "STRING");
}

#[test]
fn test_unresolved_reference() {
    let schema = schema(NESTED);
    let err = schema.resolve_parameter("Missing", "/Root/Payload").err();
    assert_eq!(
        err,
        Some(SchemaError::UnresolvedReference {
            reference: "Missing".into(),
            context: "/Root/Payload".into(),
        })
    );
}
