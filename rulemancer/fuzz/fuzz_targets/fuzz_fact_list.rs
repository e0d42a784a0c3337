#![no_main]

use libfuzzer_sys::fuzz_target;
use rulemancer::{fact_list_to_maps, split_fields};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = split_fields(s);
        let _ = fact_list_to_maps("cell", s);
    }
});
