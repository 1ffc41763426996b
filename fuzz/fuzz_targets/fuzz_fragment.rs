#![no_main]

use libfuzzer_sys::fuzz_target;
use lumen_auth::redirect::parse_fragment;

fuzz_target!(|data: &[u8]| {
    if let Ok(fragment) = std::str::from_utf8(data) {
        // Must never panic; tokens and error are mutually exclusive
        let outcome = parse_fragment(fragment);
        assert!(!(outcome.tokens.is_some() && outcome.error.is_some()));
    }
});
