mod helpers;

use helpers::{calibrated, layout, spacecraft};
use xtce_content_model::{
    ContentModel, ContentModelError, EntryKind, ItemValue, ModelOptions, RawBits, SchemaError,
    TelecommandContentModel,
};

/// Switch command with power ON: header with APID 300 and sequence flags 3,
/// function code 0x2A, power 1.
const SWITCH_ON: [u8; 8] = [0x01, 0x2C, 0xC0, 0x00, 0x00, 0x00, 0x2A, 0x01];

fn switch<'s>(
    schema: &'s xtce_content_model::Schema,
    values: Vec<ItemValue>,
    binary: Option<&RawBits>,
) -> TelecommandContentModel<'s> {
    TelecommandContentModel::new(schema, "/Spacecraft/Switch", values, binary, ModelOptions::default())
        .unwrap()
}

#[test]
/// The command container's base container supplies the packet header.
fn test_switch_layout() {
    let schema = spacecraft();
    let model = switch(&schema, vec![ItemValue::calibrated("power", "ON")], None);

    assert_eq!(model.entries()[0].kind(), EntryKind::Container);
    assert_eq!(model.entries()[0].name(), "/Spacecraft/Header");
    assert_eq!(model.entries()[0].holding(), "/Spacecraft/Switch");
    let tail: Vec<(String, String)> = layout(&model).split_off(7);
    assert_eq!(
        tail,
        [
            (String::from("/Spacecraft/Switch/function"), String::from("48")),
            (String::from("/Spacecraft/Switch/power"), String::from("56")),
        ]
    );
    assert_eq!(model.total_size(), 64);
    assert!(model.warnings().is_empty(), "{:?}", model.warnings());
}

#[test]
/// Enumerated arguments, fixed values and the header restriction reach the
/// encoded command.
fn test_switch_encode() {
    let schema = spacecraft();
    let model = switch(&schema, vec![ItemValue::calibrated("power", "ON")], None);
    assert!(model.is_valid());
    let encoded = model.encode().unwrap();
    assert_eq!(encoded, RawBits::from_bytes(&SWITCH_ON));
    assert!(model.is_compatible(&encoded));
}

#[test]
/// A recorded command decodes back to its argument labels.
fn test_switch_decode() {
    let schema = spacecraft();
    let bits = RawBits::from_bytes(&SWITCH_ON);
    let model = switch(&schema, Vec::new(), Some(&bits));

    assert!(model.is_valid());
    assert_eq!(calibrated(&model, "/Spacecraft/Switch/power").as_deref(), Some("ON"));
    assert_eq!(calibrated(&model, "/Spacecraft/APID").as_deref(), Some("300"));
    assert_eq!(model.encode().unwrap(), bits);
}

#[test]
/// A wrong function code is a conflict and breaks compatibility.
fn test_switch_wrong_function() {
    let schema = spacecraft();
    let mut bytes = SWITCH_ON;
    bytes[6] = 0x2B;
    let bits = RawBits::from_bytes(&bytes);
    let model = switch(&schema, Vec::new(), Some(&bits));

    assert!(!model.is_valid());
    assert!(model.warnings()[0].starts_with("Conflicting values for /Spacecraft/Switch/function"));
    assert!(!model.is_compatible(&bits));
}

#[test]
/// Unknown commands fail construction.
fn test_unknown_command() {
    let schema = spacecraft();
    let err = TelecommandContentModel::new(
        &schema,
        "/Spacecraft/Reboot",
        Vec::new(),
        None,
        ModelOptions::default(),
    )
    .err();
    assert!(matches!(
        err,
        Some(ContentModelError::Schema(SchemaError::UnresolvedReference { .. }))
    ));
}
