//! Fuzz the sealed-envelope decoder: arbitrary blobs must fail cleanly, and
//! a blob that opens must have come from `seal`.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sotto_crypto::{derive_shared_key, open, PrivateKey};

fuzz_target!(|data: &[u8]| {
    let a = PrivateKey::from_slice(&[0x11; 32]).expect("seed length");
    let b = PrivateKey::from_slice(&[0x22; 32]).expect("seed length");
    let key = derive_shared_key(&a, &b.public_key()).expect("fixed-seed derivation");

    if let Ok(blob) = std::str::from_utf8(data) {
        // Forged input must never authenticate, and must never panic.
        let _ = open(blob, &key);
    }
});
