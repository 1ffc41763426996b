#![no_main]

use libfuzzer_sys::fuzz_target;
use lumen_vault::EncryptedObject;

fuzz_target!(|data: &[u8]| {
    // Decoding arbitrary bytes must never panic
    if let Ok(object) = EncryptedObject::decode(data) {
        // Anything that decodes must re-encode to the same object
        let bytes = object.encode().unwrap();
        let again = EncryptedObject::decode(&bytes).unwrap();
        assert_eq!(object, again);
    }
});
