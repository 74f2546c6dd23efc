//! MDR orchestration
//!
//! A `Miner` owns everything one run needs: the tree borrow, the validated
//! parameters and the similarity engine with its cache. Dropping the miner
//! drops the cache, so nothing leaks from one document to the next.

use std::collections::HashSet;

use log::{debug, trace};

use super::orphan;
use super::record::{self, DataRecord, RecordGroup};
use super::region::{self, DataRegion, RegionMap};
use super::similarity::StructuralSimilarity;
use crate::config::MinerConfig;
use crate::dom::TagTree;
use crate::error::{MineError, Result};

/// One mining run over one tree
pub struct Miner<'t> {
    tree: &'t TagTree,
    config: MinerConfig,
    similarity: StructuralSimilarity<'t>,
}

impl<'t> Miner<'t> {
    /// Validate parameters and tree, then set up the run
    ///
    /// Nothing is traversed when either check fails.
    pub fn new(tree: &'t TagTree, config: &MinerConfig) -> Result<Self> {
        config.validate()?;
        tree.validate()?;
        if tree.children(TagTree::DOCUMENT).is_empty() {
            return Err(MineError::invalid_input("tree is empty"));
        }

        Ok(Miner {
            tree,
            config: config.clone(),
            similarity: StructuralSimilarity::new(tree, config.cache_capacity),
        })
    }

    pub fn tree(&self) -> &'t TagTree {
        self.tree
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    pub fn similarity(&self) -> &StructuralSimilarity<'t> {
        &self.similarity
    }

    /// Regions for every node, bottom-up
    pub fn detect_regions(&mut self) -> RegionMap {
        region::detect_regions(
            &mut self.similarity,
            self.config.max_gn_size,
            self.config.threshold,
        )
    }

    /// Records for regions given in document order
    pub fn identify_records(&mut self, regions: &[DataRegion]) -> Vec<RecordGroup> {
        record::identify_records(&mut self.similarity, regions, self.config.threshold)
    }

    /// Records recovered from children no region covers
    ///
    /// `known_paths` is extended with the paths of every recovered record.
    pub fn recover_orphans(
        &mut self,
        regions: &[DataRegion],
        known_paths: &mut HashSet<String>,
    ) -> Vec<DataRecord> {
        orphan::recover_orphans(&mut self.similarity, regions, known_paths, self.config.threshold)
    }

    /// Identify, recover and deduplicate records from a finished region map
    pub fn mine_with_regions(&mut self, map: &RegionMap) -> Vec<DataRecord> {
        let regions = map.document_regions();
        let groups = self.identify_records(regions);

        let mut known_paths = HashSet::new();
        let mut records = Vec::new();
        for record in groups.iter().flat_map(|g| g.records.iter()) {
            let paths = record.paths(self.tree);
            if paths.iter().any(|p| known_paths.contains(p)) {
                trace!("dropping record overlapping earlier output: {:?}", paths);
                continue;
            }
            known_paths.extend(paths);
            records.push(record.clone());
        }

        let recovered = self.recover_orphans(regions, &mut known_paths);
        records.extend(recovered);

        debug!(
            "{} region(s), {} group(s), {} record(s); cache {} hit(s) {} miss(es)",
            regions.len(),
            groups.len(),
            records.len(),
            self.similarity.cache().hits(),
            self.similarity.cache().misses()
        );
        records
    }

    /// Full pipeline: detect, identify, recover
    pub fn mine(&mut self) -> Vec<DataRecord> {
        debug!(
            "mining {} node(s) with K={} T={}",
            self.tree.node_count(),
            self.config.max_gn_size,
            self.config.threshold
        );
        let map = self.detect_regions();
        self.mine_with_regions(&map)
    }
}

/// Mine `tree` and return the records as path lists
pub fn run(tree: &TagTree, config: &MinerConfig) -> Result<Vec<Vec<String>>> {
    let records = run_records(tree, config)?;
    Ok(records_to_paths(tree, &records))
}

/// Mine `tree` and return the records as node ids
pub fn run_records(tree: &TagTree, config: &MinerConfig) -> Result<Vec<DataRecord>> {
    let mut miner = Miner::new(tree, config)?;
    Ok(miner.mine())
}

/// Serialize records as one path list each
pub fn records_to_paths(tree: &TagTree, records: &[DataRecord]) -> Vec<Vec<String>> {
    records.iter().map(|r| r.paths(tree)).collect()
}
