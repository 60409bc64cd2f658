#![no_main]

use axum::http::{HeaderMap, HeaderValue, header};
use libfuzzer_sys::fuzz_target;
use mock_ghauth::server::handlers::decode_token_request;

fuzz_target!(|data: &[u8]| {
    let _ = decode_token_request(&HeaderMap::new(), data);

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let _ = decode_token_request(&headers, data);
});
