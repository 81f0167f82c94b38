//! Integration tests for the listing harvester
//!
//! These tests use wiremock to stand in for the catalog's sitemaps and
//! listings API and run full harvests into temporary directories.

mod common;
mod discovery_tests;
mod harvest_tests;
