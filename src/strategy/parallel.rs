//! Parallel region search
//!
//! Uses Rayon to search each node's children for regions concurrently.
//! Every worker gets its own similarity engine through `map_init`, so no
//! cache is shared between threads. Promotion and record identification
//! stay sequential, which keeps the output identical to a sequential run.

use log::debug;
use rayon::prelude::*;

use crate::config::MinerConfig;
use crate::dom::{NodeId, TagTree};
use crate::error::Result;
use crate::mdr::region::{identify_regions, promote, DataRegion, RegionMap};
use crate::mdr::similarity::StructuralSimilarity;
use crate::mdr::{records_to_paths, DataRecord, Miner};

/// Regions for every node, own-region searches run in parallel
pub fn detect_regions_parallel(tree: &TagTree, config: &MinerConfig) -> RegionMap {
    let own: Vec<Vec<DataRegion>> = (0..tree.node_count() as NodeId)
        .into_par_iter()
        .map_init(
            || StructuralSimilarity::new(tree, config.cache_capacity),
            |sim, id| identify_regions(sim, id, config.max_gn_size, config.threshold),
        )
        .collect();

    promote(tree, own)
}

/// Parallel counterpart of `mdr::run_records`
pub fn run_records_parallel(tree: &TagTree, config: &MinerConfig) -> Result<Vec<DataRecord>> {
    let mut miner = Miner::new(tree, config)?;
    debug!(
        "parallel mining of {} node(s) on {} thread(s)",
        tree.node_count(),
        rayon::current_num_threads()
    );
    let map = detect_regions_parallel(tree, miner.config());
    Ok(miner.mine_with_regions(&map))
}

/// Parallel counterpart of `mdr::run`
pub fn run_parallel(tree: &TagTree, config: &MinerConfig) -> Result<Vec<Vec<String>>> {
    let records = run_records_parallel(tree, config)?;
    Ok(records_to_paths(tree, &records))
}
