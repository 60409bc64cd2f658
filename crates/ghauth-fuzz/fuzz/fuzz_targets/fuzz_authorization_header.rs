#![no_main]

use libfuzzer_sys::fuzz_target;
use mock_ghauth::server::flow::bearer_credential;

fuzz_target!(|header: &str| {
    if let Some(value) = bearer_credential(header) {
        assert!(!value.is_empty());
        assert!(!value.contains(char::is_whitespace));
    }
});
