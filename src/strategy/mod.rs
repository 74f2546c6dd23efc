//! Mining Strategy Module
//!
//! - Sequential: `mdr::run` (default, one similarity cache)
//! - Parallel: per-node region search on Rayon (for large trees)

pub mod parallel;

pub use parallel::{detect_regions_parallel, run_parallel, run_records_parallel};
