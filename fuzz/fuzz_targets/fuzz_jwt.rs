#![no_main]

use libfuzzer_sys::fuzz_target;
use lumen_core::DecodedJwt;

fuzz_target!(|data: &[u8]| {
    if let Ok(token) = std::str::from_utf8(data) {
        // Parsing must never panic on arbitrary input
        if let Ok(jwt) = DecodedJwt::parse(token) {
            // A parseable token may still lack claims; accessors must
            // error, not panic
            let _ = jwt.claims.subject();
            let _ = jwt.claims.issuer();
            let _ = jwt.claims.normalized_audience();
            let _ = jwt.issuer_details();
        }
    }
});
