//! Shared test utilities for the sql-edr workspace.
//!
//! This crate provides common testing infrastructure including:
//! - The airport landing fixture (schema, seed data, provider config, rows)
//! - A recording executor that scripts results and counts calls
//! - Skip macros for tests that need a database
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{require_database, fixtures, RecordingExecutor};
//! ```

pub mod database;
pub mod executor;
pub mod fixtures;

pub use database::{connect_seeded, DATABASE_URL_ENV};
pub use executor::RecordingExecutor;

/// Macro to skip a test if no test database is configured.
///
/// Evaluates to the database URL from `EDR_TEST_DATABASE_URL`.
///
/// # Usage
///
/// ```ignore
/// use test_utils::require_database;
///
/// #[tokio::test]
/// async fn test_against_postgis() {
///     let url = require_database!();
///     // Test code using url...
/// }
/// ```
///
/// If the variable is unset, the test prints a skip message and returns early.
#[macro_export]
macro_rules! require_database {
    () => {{
        match std::env::var($crate::DATABASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => url,
            _ => {
                eprintln!(
                    "SKIPPED: {} not set. Point it at a PostGIS database to run this test.",
                    $crate::DATABASE_URL_ENV
                );
                return;
            }
        }
    }};
}

/// Assert two floats are within `epsilon`, e.g. a radius converted to degrees.
///
/// ```ignore
/// assert_approx_eq!(radius, 50_000.0 / 111_320.0, 1e-9);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        assert!(
            (left - right).abs() <= epsilon,
            "assertion failed: {} is not within {} of {}",
            left,
            epsilon,
            right
        );
    }};
}
