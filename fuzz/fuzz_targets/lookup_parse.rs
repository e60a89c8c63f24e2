#![no_main]

//! Fuzz target for reference lookup files.

use libfuzzer_sys::fuzz_target;
use projfix_lookup::{LookupStore, RemapRule};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(store) = LookupStore::from_json(s, "fuzz") else {
        return;
    };

    let reloaded = LookupStore::from_json(&store.to_json(), "fuzz").expect("persisted form loads");
    assert_eq!(reloaded, store);

    let remapped = store.remap_path_pattern(&RemapRule::package_lib());
    assert!(remapped.len() <= store.len());
});
