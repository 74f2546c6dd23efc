//! MDR (Mining Data Records) engine
//!
//! Layered so each stage only uses the ones before it:
//! similarity -> region -> record -> orphan, driven by `engine`.

pub mod engine;
pub mod orphan;
pub mod record;
pub mod region;
pub mod similarity;

pub use engine::{records_to_paths, run, run_records, Miner};
pub use record::{DataRecord, RecordGroup};
pub use region::{DataRegion, RegionMap};
pub use similarity::{distance, StructuralSimilarity};
