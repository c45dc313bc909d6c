pub mod aggregator;
pub mod cli;
pub mod comparison;
pub mod config;
pub mod data;
pub mod defaults;
pub mod error;
pub mod executor;
pub mod filter;
pub mod git;
pub mod history;
pub mod inline;
pub mod registry;
pub mod reporting;
pub mod run_key;
pub mod sample_store;
pub mod spreadsheet;

// Test helpers module - made public for use in unit tests, integration tests, and benchmarks
// This is conditionally compiled to avoid including test code in release builds
#[doc(hidden)]
#[cfg(any(test, doctest, feature = "test-helpers"))]
pub mod test_helpers;
