//! End-to-end patch scenarios on whole project files.

mod common;

use std::collections::BTreeSet;

use cmakedit_catalog::SlotCatalog;
use cmakedit_core::{
    PatchPolicy, SettingsMap, apply_patch, dump_variable_map, render,
};
use cmakedit_diagnostics::codes;
use common::{BLINK_LF, blink_crlf, parse};

fn settings(pairs: &[(&str, &str)]) -> SettingsMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn changing_one_slot_touches_one_line() {
    let mut doc = parse(BLINK_LF);
    apply_patch(
        &mut doc,
        &settings(&[("SET_BOARD", "mega")]),
        &PatchPolicy::default(),
        &SlotCatalog::arduino(),
    )
    .unwrap();
    let out = render(&doc);
    let expected = BLINK_LF.replace(
        "set(${CMAKE_PROJECT_NAME}_BOARD uno)",
        "set(${CMAKE_PROJECT_NAME}_BOARD mega)",
    );
    assert_eq!(out, expected);
}

#[test]
fn crlf_file_keeps_crlf_everywhere() {
    let input = blink_crlf();
    let mut doc = parse(&input);
    apply_patch(
        &mut doc,
        &settings(&[("SET_BOARD", "mega"), ("SET_CPU", "atmega328")]),
        &PatchPolicy::default(),
        &SlotCatalog::arduino(),
    )
    .unwrap();
    let out = render(&doc);
    assert!(!out.replace("\r\n", "").contains('\n'));
    assert!(out.contains("set(${CMAKE_PROJECT_NAME}_BOARD mega)\r\n"));
    // The commented-out CPU line stays commented; a fresh active one is
    // inserted in the board group.
    assert!(out.contains("# set(ARDUINO_CPU atmega328)\r\n"));
    assert!(out.contains("set(ARDUINO_CPU atmega328)\r\n"));
}

#[test]
fn inserted_command_lands_inside_its_group() {
    let mut doc = parse(BLINK_LF);
    apply_patch(
        &mut doc,
        &settings(&[("SET_CPU", "atmega2560")]),
        &PatchPolicy::default(),
        &SlotCatalog::arduino(),
    )
    .unwrap();
    let out = render(&doc);
    let board = out.find("set(${CMAKE_PROJECT_NAME}_BOARD uno)").unwrap();
    let cpu = out.find("set(ARDUINO_CPU atmega2560)").unwrap();
    let sketch = out.find("set(${CMAKE_PROJECT_NAME}_SKETCH").unwrap();
    assert!(board < cpu && cpu < sketch, "cpu must sit in the board group:\n{out}");
}

#[test]
fn reset_to_defaults_comments_out_unlisted() {
    let mut doc = parse(BLINK_LF);
    let policy = PatchPolicy {
        reset_to_defaults: true,
        ..PatchPolicy::default()
    };
    let keep = settings(&[
        ("CMAKE_MINIMUM_REQUIRED_VERSION", "2.8.4"),
        ("SET_CMAKE_TOOLCHAIN_FILE", "${ARDUINO_SDK}/ArduinoToolchain.cmake"),
        ("SET_CMAKE_CXX_STANDARD", "98"),
        ("SET_PROJECT_NAME", "blink"),
        ("PROJECT", "${PROJECT_NAME}"),
        ("SET_BOARD", "uno"),
        ("SET_SKETCH", "blink.ino"),
        ("GENERATE_ARDUINO_FIRMWARE", "${CMAKE_PROJECT_NAME}"),
    ]);
    let diags = apply_patch(&mut doc, &keep, &policy, &SlotCatalog::arduino()).unwrap();
    let out = render(&doc);
    // The port slot was not listed, so its command is commented out in place.
    assert!(out.contains("# set(${CMAKE_PROJECT_NAME}_PORT /dev/ttyACM0)\n"));
    // Listed slots keep their original bytes.
    assert!(out.contains("set(${CMAKE_PROJECT_NAME}_BOARD uno)\n"));
    assert!(diags.iter().any(|d| d.id == codes::PATCH_COMMENTED_OUT));
}

#[test]
fn suppress_set_removes_rather_than_comments() {
    let mut doc = parse(BLINK_LF);
    let policy = PatchPolicy {
        reset_to_defaults: true,
        suppress_commented: BTreeSet::from(["SET_PORT".to_string()]),
        ..PatchPolicy::default()
    };
    let keep = settings(&[
        ("CMAKE_MINIMUM_REQUIRED_VERSION", "2.8.4"),
        ("SET_CMAKE_TOOLCHAIN_FILE", "${ARDUINO_SDK}/ArduinoToolchain.cmake"),
        ("SET_CMAKE_CXX_STANDARD", "98"),
        ("SET_PROJECT_NAME", "blink"),
        ("PROJECT", "${PROJECT_NAME}"),
        ("SET_BOARD", "uno"),
        ("SET_SKETCH", "blink.ino"),
        ("GENERATE_ARDUINO_FIRMWARE", "${CMAKE_PROJECT_NAME}"),
    ]);
    let diags = apply_patch(&mut doc, &keep, &policy, &SlotCatalog::arduino()).unwrap();
    let out = render(&doc);
    assert!(!out.contains("_PORT"));
    assert!(diags.iter().any(|d| d.id == codes::PATCH_REMOVED));
}

#[test]
fn unmodified_original_policy_is_a_bypass() {
    let mut doc = parse(BLINK_LF);
    let policy = PatchPolicy {
        use_unmodified_original: true,
        ..PatchPolicy::default()
    };
    let diags = apply_patch(
        &mut doc,
        &settings(&[("SET_BOARD", "mega")]),
        &policy,
        &SlotCatalog::arduino(),
    )
    .unwrap();
    assert!(diags.is_empty());
    assert_eq!(render(&doc), BLINK_LF);
}

#[test]
fn variable_map_reflects_patched_values() {
    let mut doc = parse(BLINK_LF);
    apply_patch(
        &mut doc,
        &settings(&[("SET_BOARD", "mega")]),
        &PatchPolicy::default(),
        &SlotCatalog::arduino(),
    )
    .unwrap();
    let map = dump_variable_map(&doc, &SlotCatalog::arduino());
    assert_eq!(map.get("SET_BOARD").unwrap(), "mega");
    assert_eq!(map.get("SET_SKETCH").unwrap(), "blink.ino");
}

#[test]
fn patched_document_round_trips_through_reparse() {
    let mut doc = parse(BLINK_LF);
    apply_patch(
        &mut doc,
        &settings(&[("SET_BOARD", "mega"), ("SET_CPU", "atmega328")]),
        &PatchPolicy::default(),
        &SlotCatalog::arduino(),
    )
    .unwrap();
    let out = render(&doc);
    // A second parse+render of the patched output is byte-stable.
    assert_eq!(render(&parse(&out)), out);
}

#[test]
fn second_patch_with_same_settings_is_idempotent() {
    let mut doc = parse(BLINK_LF);
    let s = settings(&[("SET_BOARD", "mega")]);
    let catalog = SlotCatalog::arduino();
    apply_patch(&mut doc, &s, &PatchPolicy::default(), &catalog).unwrap();
    let first = render(&doc);
    let mut doc2 = parse(&first);
    apply_patch(&mut doc2, &s, &PatchPolicy::default(), &catalog).unwrap();
    assert_eq!(render(&doc2), first);
}
