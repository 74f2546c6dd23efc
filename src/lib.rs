//! RustyMDR - Mining Data Records from HTML tag trees
//!
//! Finds repeating substructures (lists, tables, result grids) in a tag
//! tree without supervision and reports each record as its node paths.
//!
//! Strategies:
//! A: Sequential miner (mine_records, mine_markup, mine_loaded)
//! B: Parallel region search (mine_records_parallel)

use rustler::{Binary, Env, NifResult, ResourceArc, Term};

pub mod config;
pub mod dom;
pub mod error;
pub mod mdr;
pub mod resource;
pub mod strategy;
pub mod term;

use config::MinerConfig;
use error::Result;
use resource::{TagTreeRef, TagTreeResource};
use term::{decode_threshold, decode_tree, region_rows, result_to_term};

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Build a config from NIF arguments; range checks happen in `validate`
fn config_from(k: i64, t: Term<'_>) -> Result<MinerConfig> {
    let threshold = decode_threshold(t)?;
    // Negative K maps to 0, which validation rejects
    let max_gn_size = usize::try_from(k).unwrap_or(0);
    let config = MinerConfig::new(max_gn_size, threshold);
    config.validate()?;
    Ok(config)
}

// ============================================================================
// Strategy A: Sequential Miner
// ============================================================================

/// Mine a tree term: {:ok, [[path]]} or {:error, reason}
#[rustler::nif(schedule = "DirtyCpu")]
fn mine_records<'a>(env: Env<'a>, tree: Term<'a>, k: i64, t: Term<'a>) -> NifResult<Term<'a>> {
    let result = config_from(k, t).and_then(|config| {
        let tree = decode_tree(tree)?;
        mdr::run(&tree, &config)
    });
    Ok(result_to_term(env, result))
}

/// Parse a markup fragment, then mine it
#[rustler::nif(schedule = "DirtyCpu")]
fn mine_markup<'a>(env: Env<'a>, input: Binary<'a>, k: i64, t: Term<'a>) -> NifResult<Term<'a>> {
    let result = config_from(k, t).and_then(|config| {
        let tree = dom::parse_markup(input.as_slice())?;
        mdr::run(&tree, &config)
    });
    Ok(result_to_term(env, result))
}

/// Regions only: {:ok, [{parent_path, g, start, count}]}
#[rustler::nif(schedule = "DirtyCpu")]
fn detect_regions<'a>(env: Env<'a>, tree: Term<'a>, k: i64, t: Term<'a>) -> NifResult<Term<'a>> {
    let result = config_from(k, t).and_then(|config| {
        let tree = decode_tree(tree)?;
        let mut miner = mdr::Miner::new(&tree, &config)?;
        let map = miner.detect_regions();
        Ok(region_rows(&tree, &map))
    });
    Ok(result_to_term(env, result))
}

/// Structural distance between the contents of two tree terms
#[rustler::nif(schedule = "DirtyCpu")]
fn structural_distance<'a>(env: Env<'a>, a: Term<'a>, b: Term<'a>) -> NifResult<Term<'a>> {
    let result = decode_tree(a).and_then(|a| {
        let b = decode_tree(b)?;
        Ok(mdr::similarity::tree_distance(&a, &b))
    });
    Ok(result_to_term(env, result))
}

// ============================================================================
// Loaded trees (decode once, mine many times)
// ============================================================================

/// Decode and validate a tree term into a resource: {:ok, ref}
#[rustler::nif(schedule = "DirtyCpu")]
fn load_tree<'a>(env: Env<'a>, tree: Term<'a>) -> NifResult<Term<'a>> {
    let result = decode_tree(tree).map(|tree| ResourceArc::new(TagTreeResource::new(tree)));
    Ok(result_to_term(env, result))
}

/// Mine a loaded tree
#[rustler::nif(schedule = "DirtyCpu")]
fn mine_loaded<'a>(env: Env<'a>, tree_ref: TagTreeRef, k: i64, t: Term<'a>) -> NifResult<Term<'a>> {
    let result = config_from(k, t).and_then(|config| mdr::run(&tree_ref.tree, &config));
    Ok(result_to_term(env, result))
}

/// Node count of a loaded tree
#[rustler::nif]
fn loaded_node_count(tree_ref: TagTreeRef) -> usize {
    tree_ref.node_count()
}

// ============================================================================
// Strategy B: Parallel Region Search
// ============================================================================

/// Same output as mine_records, with per-node region search on Rayon
#[rustler::nif(schedule = "DirtyCpu")]
fn mine_records_parallel<'a>(
    env: Env<'a>,
    tree: Term<'a>,
    k: i64,
    t: Term<'a>,
) -> NifResult<Term<'a>> {
    let result = config_from(k, t).and_then(|config| {
        let tree = decode_tree(tree)?;
        strategy::run_parallel(&tree, &config)
    });
    Ok(result_to_term(env, result))
}

// ============================================================================
// NIF Initialization
// ============================================================================

rustler::init!("Elixir.RustyMDR.Native");
