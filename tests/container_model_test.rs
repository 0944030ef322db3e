mod helpers;

use helpers::{calibrated, compose, decode, layout, spacecraft};
use xtce_content_model::{
    ContainerContentModel, ContentModel, EntryKind, ModelOptions, RawBits, StartBit,
};

/// Housekeeping packet: APID 100, sequence count 5, battery 12.34 V,
/// temperature -5, mode NOMINAL, name "OK", checksum 0xBEEF.
const HOUSEKEEPING: [u8; 15] = [
    0x00, 0x64, 0xC0, 0x05, 0x00, 0x09, 0x04, 0xD2, 0xFB, 0x01, 0x02, 0x4F, 0x4B, 0xBE, 0xEF,
];

/// Event packet: APID 200, event 0x1234.
const EVENT: [u8; 8] = [0x00, 0xC8, 0xC0, 0x01, 0x00, 0x02, 0x12, 0x34];

//==================================================================================DECODE
#[test]
/// Every field of the housekeeping packet decodes to its engineering value.
fn test_decode_housekeeping() {
    let schema = spacecraft();
    let model = decode(&schema, "/Spacecraft/Housekeeping", &HOUSEKEEPING);

    assert!(model.is_valid());
    assert!(model.warnings().is_empty(), "{:?}", model.warnings());
    assert_eq!(model.total_size(), 120);
    assert_eq!(calibrated(&model, "/Spacecraft/APID").as_deref(), Some("100"));
    assert_eq!(calibrated(&model, "/Spacecraft/SequenceFlags").as_deref(), Some("3"));
    assert_eq!(calibrated(&model, "/Spacecraft/SequenceCount").as_deref(), Some("5"));
    assert_eq!(calibrated(&model, "/Spacecraft/Battery").as_deref(), Some("12.34"));
    assert_eq!(calibrated(&model, "/Spacecraft/Temperature").as_deref(), Some("-5"));
    assert_eq!(calibrated(&model, "/Spacecraft/Mode").as_deref(), Some("NOMINAL"));
    assert_eq!(calibrated(&model, "/Spacecraft/Name").as_deref(), Some("OK"));
    assert_eq!(calibrated(&model, "/Spacecraft/Checksum").as_deref(), Some("48879"));

    let battery = model.entry("/Spacecraft/Battery").unwrap();
    assert_eq!(battery.value().unwrap().uncalibrated(), Some("1234"));
    assert_eq!(battery.typed().unwrap().units(), Some("V"));
}

#[test]
/// The header comes first behind its marker, the checksum sits at the end.
fn test_housekeeping_layout() {
    let schema = spacecraft();
    let model = decode(&schema, "/Spacecraft/Housekeeping", &HOUSEKEEPING);

    let marker = &model.entries()[0];
    assert_eq!(marker.kind(), EntryKind::Container);
    assert_eq!(marker.name(), "/Spacecraft/Header");
    assert_eq!(marker.holding(), "/Spacecraft/Housekeeping");

    let starts: Vec<(String, String)> = layout(&model);
    let expected = [
        ("/Spacecraft/Version", "0"),
        ("/Spacecraft/Type", "3"),
        ("/Spacecraft/SecondaryHeader", "4"),
        ("/Spacecraft/APID", "5"),
        ("/Spacecraft/SequenceFlags", "16"),
        ("/Spacecraft/SequenceCount", "18"),
        ("/Spacecraft/PacketLength", "32"),
        ("/Spacecraft/Battery", "48"),
        ("/Spacecraft/Temperature", "64"),
        ("/Spacecraft/Mode", "72"),
        ("/Spacecraft/NameLength", "80"),
        ("/Spacecraft/Name", "88"),
        ("/Spacecraft/Checksum", "104"),
    ]
    .map(|(name, start)| (String::from(name), String::from(start)));
    assert_eq!(starts, expected);
    assert_eq!(
        model.entry("/Spacecraft/Name").unwrap().end_bit(),
        Some(104)
    );
}

//==================================================================================ROUND_TRIP
#[test]
/// A decoded packet encodes back to the same bits and is compatible with them.
fn test_decode_encode_round_trip() {
    let schema = spacecraft();
    let model = decode(&schema, "/Spacecraft/Housekeeping", &HOUSEKEEPING);
    let input = RawBits::from_bytes(&HOUSEKEEPING);

    assert_eq!(model.encode().unwrap(), input);
    assert!(model.is_compatible(&input));
}

#[test]
/// Engineering values, the restriction and initial values rebuild the packet.
fn test_compose_from_user_values() {
    let schema = spacecraft();
    let model = compose(
        &schema,
        "/Spacecraft/Housekeeping",
        &[
            ("SequenceCount", "5"),
            ("PacketLength", "9"),
            ("Battery", "12.34"),
            ("Temperature", "-5"),
            ("Mode", "NOMINAL"),
            ("NameLength", "2"),
            ("Name", "OK"),
            ("/Spacecraft/Checksum", "48879"),
        ],
    );
    assert!(model.is_valid());
    assert!(model.warnings().is_empty(), "{:?}", model.warnings());
    let encoded = model.encode().unwrap();
    assert_eq!(encoded, RawBits::from_bytes(&HOUSEKEEPING));

    let decoded = decode(&schema, "/Spacecraft/Housekeeping", encoded.as_bytes());
    assert_eq!(calibrated(&decoded, "/Spacecraft/Battery").as_deref(), Some("12.34"));
    assert_eq!(calibrated(&decoded, "/Spacecraft/Name").as_deref(), Some("OK"));
}

//==================================================================================RESTRICTIONS
#[test]
/// A packet of another APID conflicts with the housekeeping restriction.
fn test_restriction_rejects_other_packet() {
    let schema = spacecraft();
    let housekeeping = decode(&schema, "/Spacecraft/Housekeeping", &HOUSEKEEPING);
    assert!(!housekeeping.is_compatible(&RawBits::from_bytes(&EVENT)));

    let mismatch = decode(&schema, "/Spacecraft/Housekeeping", &EVENT);
    assert!(!mismatch.is_valid());
    assert!(mismatch
        .warnings()
        .iter()
        .any(|w| w.starts_with("Conflicting values for /Spacecraft/APID")));
    assert_eq!(calibrated(&mismatch, "/Spacecraft/APID").as_deref(), Some("200"));
}

#[test]
/// Comparison lists restrict every field they name; unsupported entries are
/// reported and skipped.
fn test_event_packet() {
    let schema = spacecraft();
    let model = decode(&schema, "/Spacecraft/Event", &EVENT);

    assert!(model.is_valid());
    assert_eq!(calibrated(&model, "/Spacecraft/EventId").as_deref(), Some("4660"));
    assert_eq!(
        model.entry("/Spacecraft/SecondaryHeader").unwrap().expected(),
        Some(&RawBits::from_u64(0, 1))
    );
    assert_eq!(model.warnings().len(), 1);
    assert!(model.warnings()[0].starts_with("StreamSegmentEntry is not supported"));
    assert_eq!(model.total_size(), 64);
}

//==================================================================================SHORT_INPUT
#[test]
/// A buffer one bit short loses only the checksum, with a single warning.
fn test_truncated_packet() {
    let schema = spacecraft();
    let bits = RawBits::from_bytes_with_len(&HOUSEKEEPING, 119);
    let model = ContainerContentModel::new(
        &schema,
        "/Spacecraft/Housekeeping",
        Vec::new(),
        Some(&bits),
        ModelOptions::default(),
    )
    .unwrap();

    assert_eq!(model.warnings().len(), 1);
    assert!(model.warnings()[0].starts_with("Binary data too small for /Spacecraft/Checksum"));
    let checksum = model.entry("/Spacecraft/Checksum").unwrap();
    assert!(checksum.value().is_none());
    assert_eq!(checksum.start_bit(), StartBit::Resolved(104));
    assert_eq!(calibrated(&model, "/Spacecraft/Name").as_deref(), Some("OK"));
    assert_eq!(model.total_size(), 120);
}

#[test]
/// The abstract header resolves on its own, without restriction.
fn test_abstract_header() {
    let schema = spacecraft();
    let model = decode(&schema, "/Spacecraft/Header", &EVENT[..6]);
    assert!(model.is_valid());
    assert_eq!(model.total_size(), 48);
    assert!(model
        .entries()
        .iter()
        .all(|e| e.kind() == EntryKind::Parameter && e.expected().is_none()));
}
