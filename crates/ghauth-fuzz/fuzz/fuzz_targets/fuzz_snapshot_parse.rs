#![no_main]

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use libfuzzer_sys::fuzz_target;
use mock_ghauth::store::Client;

fuzz_target!(|data: &[u8]| {
    // Snapshot documents for every store; parsing may fail but never panic
    let _ = serde_json::from_slice::<HashMap<String, Client>>(data);
    let _ = serde_json::from_slice::<HashMap<String, DateTime<Utc>>>(data);
});
