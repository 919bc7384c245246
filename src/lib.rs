//! # Refcheck
//!
//! Batch validation pipeline for referral-program CSV extracts.
//!
//! Loads the seven entity tables of an extract directory, normalizes them,
//! joins every referral to its reward, status, transaction, referrer and
//! lead records, classifies each one against the referral business rules,
//! and writes an auditable CSV report.
//!
//! ## Usage
//!
//! ```bash
//! refcheck validate --input extracts/ --output report.csv
//! refcheck profile --input extracts/
//! ```
//!
//! ## Modules
//!
//! - `loader` - CSV discovery and loading into raw tables
//! - `cleaner` - header normalization, typed coercion, schema validation
//! - `model` - the seven entity types and the cleaned dataset
//! - `pipeline` - join, timezone resolution, temporal normalization,
//!   rule classification, report assembly
//! - `profiler` - per-column table profiling
//! - `console` - text formatting for console output
//! - `error` - run-level error taxonomy

pub mod cleaner;
pub mod console;
pub mod error;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod profiler;
