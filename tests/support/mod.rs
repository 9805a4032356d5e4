//! Shared fixtures for integration tests.

pub mod catalog_site;
