#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    match tbdex::message::decode_unverified(data) {
        Ok(decoded) => {
            let json = decoded.to_json_string().unwrap();
            let redecoded = tbdex::message::decode_unverified(json.as_bytes()).unwrap();

            assert_eq!(decoded, redecoded)
        }
        Err(_) => {
            // ignore errors, this fuzzer is looking for panics
        }
    }
});
