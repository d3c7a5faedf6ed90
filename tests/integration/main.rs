//! Integration tests
//!
//! These tests use wiremock to stand in for the catalog, item detail, store and
//! export services, and exercise each pipeline end-to-end.

mod fetcher_tests;
mod sync_tests;
