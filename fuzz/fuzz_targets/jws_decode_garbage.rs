#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(token) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(decoded) = tbdex::crypto::jws::decode(token) {
        // a decoded token always has exactly three segments
        assert_eq!(token.split('.').count(), 3);
        let _ = decoded.payload();
    }
});
