//! Fuzzing library for mock-ghauth.
//!
//! This crate provides fuzzing targets for the inputs the mock server parses
//! from outside: snapshot files, `Authorization` headers and token request
//! bodies.
//!
//! # Usage
//!
//! ```bash
//! cd crates/ghauth-fuzz
//! cargo +nightly fuzz run fuzz_snapshot_parse -- -max_total_time=60
//! ```

pub use mock_ghauth::server::flow::bearer_credential;
pub use mock_ghauth::server::handlers::decode_token_request;
pub use mock_ghauth::store::Client;
