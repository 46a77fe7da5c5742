//! Integration tests for the interception framework.
//!
//! These tests exercise the framework end to end against hand-built
//! export tables: delegation to genuine implementations, canned and
//! custom overrides, restoration on guard drop, guard independence, and
//! the fatal paths for unresolved modules and exports.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use svcfault::define_api;
use svcfault::mock::{last_error, set_last_error, ExportTable, MockRegistry, OverrideGuard};

define_api! {
    /// Test API with two inputs and a non-trivial genuine behavior.
    pub ComputeChecksum in "probe": fn(u32, u32) -> u32,
    convention: System,
    failure: 0xFFFF_FFFF,
    error_code: 87,
}

define_api! {
    /// Test API whose canned failure leaves the last-error untouched.
    pub QueryTicks in "probe": fn() -> u64,
    convention: System,
    failure: 0,
    error_code: 0,
}

define_api! {
    /// Declared but never exported by the probe module.
    pub MissingExport in "probe": fn() -> u32,
    convention: System,
    failure: 0,
    error_code: 6,
}

define_api! {
    /// Declared against a module no registry in this suite loads.
    pub UnknownModuleApi in "nosuchmodule": fn() -> u32,
    convention: System,
    failure: 0,
    error_code: 6,
}

fn probe_module() -> ExportTable {
    ExportTable::new("probe")
        .export::<ComputeChecksum>(|(a, b)| a.wrapping_mul(31).wrapping_add(b))
        .export::<QueryTicks>(|()| 1024)
}

fn registry() -> MockRegistry {
    MockRegistry::new([probe_module()])
}

#[test]
fn calls_delegate_to_the_genuine_export() {
    let registry = registry();
    let cell = registry.cell::<ComputeChecksum>();

    assert_eq!(cell.invoke((7, 5)), 7u32.wrapping_mul(31) + 5);
    assert_eq!(cell.invoke((0, 0)), 0);
}

#[test]
fn default_override_returns_sentinel_and_sets_last_error() {
    let registry = registry();
    let cell = registry.cell::<ComputeChecksum>();

    set_last_error(0);
    let _guard = OverrideGuard::<ComputeChecksum>::failing(&cell);

    assert_eq!(cell.invoke((7, 5)), 0xFFFF_FFFF);
    assert_eq!(last_error(), 87);
}

#[test]
fn unconfigured_error_code_leaves_last_error_alone() {
    let registry = registry();
    let cell = registry.cell::<QueryTicks>();

    set_last_error(555);
    let _guard = OverrideGuard::<QueryTicks>::failing(&cell);

    assert_eq!(cell.invoke(()), 0);
    assert_eq!(last_error(), 555);
}

#[test]
fn custom_override_sees_every_call_unfiltered() {
    let registry = registry();
    let cell = registry.cell::<ComputeChecksum>();

    let calls = Arc::new(AtomicU32::new(0));
    let seen = calls.clone();
    let _guard = OverrideGuard::<ComputeChecksum>::with(&cell, move |(a, b)| {
        seen.fetch_add(1, Ordering::SeqCst);
        a + b
    });

    assert_eq!(cell.invoke((2, 3)), 5);
    assert_eq!(cell.invoke((10, 1)), 11);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn dropping_the_guard_restores_the_genuine_behavior() {
    let registry = registry();
    let cell = registry.cell::<ComputeChecksum>();
    let genuine = cell.invoke((3, 4));

    {
        let _guard = OverrideGuard::<ComputeChecksum>::failing(&cell);
        assert_eq!(cell.invoke((3, 4)), 0xFFFF_FFFF);
    }

    assert_eq!(cell.invoke((3, 4)), genuine);
}

#[test]
fn sequential_guards_are_independent() {
    let registry = registry();
    let cell = registry.cell::<ComputeChecksum>();

    {
        let _guard = OverrideGuard::<ComputeChecksum>::with(&cell, |_| 1);
        assert_eq!(cell.invoke((0, 0)), 1);
    }
    assert_ne!(cell.invoke((9, 9)), 1);
    {
        let _guard = OverrideGuard::<ComputeChecksum>::with(&cell, |_| 2);
        assert_eq!(cell.invoke((0, 0)), 2);
    }
    assert_ne!(cell.invoke((9, 9)), 2);
}

#[test]
fn guards_on_different_apis_do_not_interact() {
    let registry = registry();
    let checksum = registry.cell::<ComputeChecksum>();
    let ticks = registry.cell::<QueryTicks>();

    let _guard = OverrideGuard::<ComputeChecksum>::failing(&checksum);

    // The other API still runs its genuine export.
    assert_eq!(ticks.invoke(()), 1024);
}

#[test]
fn registries_hold_disjoint_cells() {
    let first = registry();
    let second = registry();

    let _guard = OverrideGuard::<ComputeChecksum>::failing(&first.cell::<ComputeChecksum>());

    assert_eq!(first.cell::<ComputeChecksum>().invoke((7, 5)), 0xFFFF_FFFF);
    assert_eq!(
        second.cell::<ComputeChecksum>().invoke((7, 5)),
        7u32.wrapping_mul(31) + 5
    );
}

#[test]
#[should_panic(expected = "unresolved export")]
fn missing_export_is_fatal_at_first_use() {
    let registry = registry();
    let _ = registry.cell::<MissingExport>();
}

#[test]
#[should_panic(expected = "not loaded")]
fn missing_module_is_fatal_at_first_use() {
    let registry = registry();
    let _ = registry.cell::<UnknownModuleApi>();
}
