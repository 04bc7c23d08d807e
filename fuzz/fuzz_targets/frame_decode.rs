//! Fuzz the inbound frame decoder: arbitrary bytes must never panic, only
//! decode or fail.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sotto_proto::{ClientFrame, ServerFrame};

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = serde_json::from_str::<ClientFrame>(text);
        let _ = serde_json::from_str::<ServerFrame>(text);
    }
});
