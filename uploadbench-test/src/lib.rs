//! Test utilities for the upload benchmarks.
//!
//! This crate provides utilities to facilitate testing the benchmark drivers without a real
//! storage service. See the modules for all available utilities.

pub mod storage;
pub mod tracing;
