//! Integration test crate for the cadence workspace.
//!
//! This crate has no library code. It only contains integration tests
//! that exercise end-to-end oracle and sentry flows across workspace crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p cadence-integration-tests
//! ```
