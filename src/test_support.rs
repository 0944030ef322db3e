//! Builders shared by the unit tests.
use alloc::vec;

use crate::schema::{Schema, SpaceSystem, TypedObject};

/// Schema made of a single root space system written as JSON.
pub(crate) fn schema(json: &str) -> Schema {
    let root: SpaceSystem = serde_json::from_str(json).unwrap();
    Schema::new(vec![root])
}

/// Typed view of the parameter at absolute `path`.
pub(crate) fn parameter<'s>(schema: &'s Schema, path: &str) -> TypedObject<'s> {
    schema.resolve_parameter(path, "/").unwrap()
}

/// One parameter per encoding flavour, used by the codec and value tests.
pub(crate) const CODEC_SCHEMA: &str = r#"{
    "name": "Codec",
    "parameter_types": [
        { "name": "U8", "engineering": { "kind": "integer", "signed": false },
          "encoding": { "kind": "unsigned", "size_in_bits": { "fixed": 8 } } },
        { "name": "S12", "engineering": { "kind": "integer" },
          "encoding": { "kind": "twos_complement", "size_in_bits": { "fixed": 12 } } },
        { "name": "SM8", "engineering": { "kind": "integer" },
          "encoding": { "kind": "sign_magnitude", "size_in_bits": { "fixed": 8 } } },
        { "name": "OC8", "engineering": { "kind": "integer" },
          "encoding": { "kind": "ones_complement", "size_in_bits": { "fixed": 8 } } },
        { "name": "Bcd16", "engineering": { "kind": "integer", "signed": false },
          "encoding": { "kind": "bcd", "size_in_bits": { "fixed": 16 } } },
        { "name": "F32", "engineering": { "kind": "float" },
          "encoding": { "kind": "ieee754", "size_in_bits": { "fixed": 32 } } },
        { "name": "Text32", "engineering": { "kind": "string" },
          "encoding": { "kind": "utf8", "size_in_bits": { "fixed": 32 } } },
        { "name": "Blob12", "engineering": { "kind": "binary" },
          "encoding": { "kind": "binary", "size_in_bits": { "fixed": 12 } } },
        { "name": "Temp", "engineering": { "kind": "float" }, "units": "degC",
          "encoding": { "kind": "unsigned", "size_in_bits": { "fixed": 16 },
            "default_calibrator": { "kind": "polynomial", "terms": [
                { "coefficient": -40.0, "exponent": 0 },
                { "coefficient": 0.5, "exponent": 1 } ] } } },
        { "name": "Mode", "engineering": { "kind": "enumerated", "enumerations": [
                { "value": 0, "label": "OFF" },
                { "value": 1, "label": "ON" },
                { "value": 2, "max_value": 7, "label": "SPECIAL" } ] },
          "encoding": { "kind": "unsigned", "size_in_bits": { "fixed": 3 } } },
        { "name": "Flag", "engineering": { "kind": "boolean" },
          "encoding": { "kind": "unsigned", "size_in_bits": { "fixed": 1 } } },
        { "name": "Ticks", "engineering": { "kind": "relative_time", "scale": 0.25, "offset": 10.0 },
          "encoding": { "kind": "unsigned", "size_in_bits": { "fixed": 8 } } }
    ],
    "parameters": [
        { "name": "u8", "type_ref": "U8" },
        { "name": "s12", "type_ref": "S12" },
        { "name": "sm8", "type_ref": "SM8" },
        { "name": "oc8", "type_ref": "OC8" },
        { "name": "bcd", "type_ref": "Bcd16" },
        { "name": "f32", "type_ref": "F32" },
        { "name": "text", "type_ref": "Text32" },
        { "name": "blob", "type_ref": "Blob12" },
        { "name": "temp", "type_ref": "Temp" },
        { "name": "mode", "type_ref": "Mode" },
        { "name": "flag", "type_ref": "Flag" },
        { "name": "ticks", "type_ref": "Ticks" }
    ]
}"#;

/// Containers and commands exercising the walk, used by the model tests.
pub(crate) const MODEL_SCHEMA: &str = r#"{
    "name": "SC",
    "parameter_types": [
        { "name": "U8", "engineering": { "kind": "integer", "signed": false },
          "encoding": { "kind": "unsigned", "size_in_bits": { "fixed": 8 } } },
        { "name": "U16", "engineering": { "kind": "integer", "signed": false },
          "encoding": { "kind": "unsigned", "size_in_bits": { "fixed": 16 } } },
        { "name": "Gain", "engineering": { "kind": "float" },
          "encoding": { "kind": "unsigned", "size_in_bits": { "fixed": 8 },
            "default_calibrator": { "kind": "polynomial", "terms": [
                { "coefficient": 1.0, "exponent": 1 } ] },
            "context_calibrators": [
                { "context": { "comparison": { "parameter_ref": "X", "value": "2" } },
                  "calibrator": { "kind": "polynomial", "terms": [
                    { "coefficient": 10.0, "exponent": 1 } ] } } ] } },
        { "name": "Point", "engineering": { "kind": "aggregate", "members": [
            { "name": "x", "type_ref": "U8" },
            { "name": "y", "type_ref": "U8" } ] } },
        { "name": "Vector", "engineering": { "kind": "array", "array_type_ref": "U8",
            "dimensions": [ { "starting_index": { "fixed": 0 }, "ending_index": { "fixed": 2 } } ] } },
        { "name": "Broken", "engineering": { "kind": "array", "array_type_ref": "Nowhere" } }
    ],
    "parameters": [
        { "name": "X", "type_ref": "U8" },
        { "name": "Y", "type_ref": "U16" },
        { "name": "A", "type_ref": "U8", "initial_value": "7" },
        { "name": "B", "type_ref": "U8" },
        { "name": "Count", "type_ref": "U8" },
        { "name": "Flag", "type_ref": "U8" },
        { "name": "Level", "type_ref": "Gain" },
        { "name": "Pos", "type_ref": "Point" },
        { "name": "Vec", "type_ref": "Vector" },
        { "name": "Bad", "type_ref": "Broken" }
    ],
    "argument_types": [
        { "name": "U8", "engineering": { "kind": "integer", "signed": false },
          "encoding": { "kind": "unsigned", "size_in_bits": { "fixed": 8 } } },
        { "name": "U16", "engineering": { "kind": "integer", "signed": false },
          "encoding": { "kind": "unsigned", "size_in_bits": { "fixed": 16 } } }
    ],
    "containers": [
        { "name": "B", "is_abstract": true, "entries": [
            { "item": { "type": "parameter_ref", "parameter_ref": "X" } } ] },
        { "name": "D", "base_container": { "container_ref": "B" }, "entries": [
            { "item": { "type": "parameter_ref", "parameter_ref": "Y" } } ] },
        { "name": "R", "base_container": { "container_ref": "B",
            "restriction": { "comparison": { "parameter_ref": "X", "value": "5" } } },
          "entries": [ { "item": { "type": "parameter_ref", "parameter_ref": "Y" } } ] },
        { "name": "Clash", "entries": [
            { "item": { "type": "parameter_ref", "parameter_ref": "X" },
              "location": { "reference_location": "containerStart", "location": { "fixed": 0 } } },
            { "item": { "type": "parameter_ref", "parameter_ref": "A" },
              "location": { "reference_location": "containerStart", "location": { "fixed": 0 } } } ] },
        { "name": "Cond", "entries": [
            { "item": { "type": "parameter_ref", "parameter_ref": "Flag" } },
            { "item": { "type": "parameter_ref", "parameter_ref": "Pos" },
              "include_condition": { "comparison": { "parameter_ref": "Flag", "value": "1" } } },
            { "item": { "type": "parameter_ref", "parameter_ref": "B" } } ] },
        { "name": "Rep", "entries": [
            { "item": { "type": "parameter_ref", "parameter_ref": "Count" } },
            { "item": { "type": "parameter_ref", "parameter_ref": "A" },
              "repeat": { "count": { "dynamic": { "parameter_ref": "Count" } } } } ] },
        { "name": "RepUnknown", "entries": [
            { "item": { "type": "parameter_ref", "parameter_ref": "A" },
              "repeat": { "count": { "dynamic": { "parameter_ref": "Count" } } } } ] },
        { "name": "Arr", "entries": [
            { "item": { "type": "parameter_ref", "parameter_ref": "Count" } },
            { "item": { "type": "array_parameter_ref", "parameter_ref": "Vec", "dimensions": [
                { "starting_index": { "fixed": 0 },
                  "ending_index": { "dynamic": { "parameter_ref": "Count",
                    "linear_adjustment": { "intercept": -1.0 } } } } ] } },
            { "item": { "type": "array_parameter_ref", "parameter_ref": "Bad" } },
            { "item": { "type": "parameter_ref", "parameter_ref": "B" } } ] },
        { "name": "Tail", "entries": [
            { "item": { "type": "parameter_ref", "parameter_ref": "X" } },
            { "item": { "type": "parameter_ref", "parameter_ref": "B" },
              "location": { "reference_location": "containerEnd", "location": { "fixed": 0 } } },
            { "item": { "type": "parameter_ref", "parameter_ref": "A" } } ] },
        { "name": "Sub", "entries": [
            { "item": { "type": "parameter_ref", "parameter_ref": "A" } },
            { "item": { "type": "parameter_ref", "parameter_ref": "B" } } ] },
        { "name": "Inc", "entries": [
            { "item": { "type": "parameter_ref", "parameter_ref": "X" } },
            { "item": { "type": "container_ref", "container_ref": "Sub" } } ] },
        { "name": "Calib", "entries": [
            { "item": { "type": "parameter_ref", "parameter_ref": "X" } },
            { "item": { "type": "parameter_ref", "parameter_ref": "Level" } } ] },
        { "name": "Loop", "entries": [
            { "item": { "type": "parameter_ref", "parameter_ref": "X" } },
            { "item": { "type": "container_ref", "container_ref": "Loop" } } ] },
        { "name": "Ouroboros", "base_container": { "container_ref": "Ouroboros" } }
    ],
    "meta_commands": [
        { "name": "Base", "is_abstract": true,
          "arguments": [
            { "name": "opcode", "type_ref": "U8" },
            { "name": "value", "type_ref": "U16", "initial_value": "0" } ],
          "command_container": { "name": "BaseCC", "entries": [
            { "item": { "type": "fixed_value", "name": "sync", "size_in_bits": 8, "binary_value": "EB" } },
            { "item": { "type": "argument_ref", "argument_ref": "opcode" } },
            { "item": { "type": "argument_ref", "argument_ref": "value" } } ] } },
        { "name": "Set",
          "base_meta_command": { "command_ref": "Base", "argument_assignments": [
            { "argument_name": "opcode", "argument_value": "3" } ] },
          "arguments": [ { "name": "extra", "type_ref": "U8" } ],
          "command_container": { "name": "SetCC", "entries": [
            { "item": { "type": "argument_ref", "argument_ref": "extra" } } ] } },
        { "name": "Wrong",
          "base_meta_command": { "command_ref": "Base", "argument_assignments": [
            { "argument_name": "extra", "argument_value": "1" } ] } }
    ]
}"#;
