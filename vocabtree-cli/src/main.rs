//! # vocabtree CLI
//!
//! Benchmark harness: builds a vocabulary tree or forest over random
//! descriptors, matches perturbed copies of them, and reports recall against
//! exhaustive search.
//!
//! Run with: `cargo run --release --bin vocabtree -- bench --candidates 100000`

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vocabtree_core::{Config, DistanceValue, Match, MatchingMode};
use vocabtree_index::{
    executor_from_config, BinaryMajorityMean, ClusterMean, DescriptorDistance, Executor, FlatMatcher,
    FloatAverageMean, Hamming, SquaredEuclidean, VocabularyForest, VocabularyIndex,
};

#[derive(Parser)]
#[command(name = "vocabtree")]
#[command(about = "Vocabulary tree descriptor matching - build, match, measure recall")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build over random descriptors and measure matching recall
    Bench(BenchArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(clap::Args)]
struct BenchArgs {
    /// Descriptor type
    #[arg(long, value_enum, default_value_t = Kind::Binary)]
    kind: Kind,
    /// Number of candidate descriptors
    #[arg(long, default_value_t = 20_000)]
    candidates: usize,
    /// Number of queries
    #[arg(long, default_value_t = 2_000)]
    queries: usize,
    /// Perturbation of a query: flipped bits (binary) or noise amplitude x100 (float)
    #[arg(long, default_value_t = 10)]
    noise: u32,
    /// Matching mode, overrides the configuration
    #[arg(long)]
    mode: Option<MatchingMode>,
    /// Number of trees, overrides the configuration
    #[arg(long)]
    trees: Option<usize>,
    /// RNG seed, overrides the configuration
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    /// 256-bit binary descriptors, Hamming distance
    Binary,
    /// 64-dimensional float descriptors, squared Euclidean distance
    Float,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.as_str().to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&level).context("invalid log level")?)
        .init();

    match cli.command {
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
        }
        Commands::Bench(args) => {
            if let Some(mode) = args.mode {
                config.matching.mode = mode;
            }
            if let Some(trees) = args.trees {
                config.forest.trees = trees;
            }
            if args.seed.is_some() {
                config.forest.seed = args.seed;
            }
            config.validate()?;
            bench(&config, &args)?;
        }
    }

    Ok(())
}

fn bench(config: &Config, args: &BenchArgs) -> Result<()> {
    let seed = config.forest.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    let executor = executor_from_config(&config.workers)?;

    info!(
        "Benchmark: {} candidates, {} queries, noise {}, mode {}, {} tree(s), seed {}",
        args.candidates, args.queries, args.noise, config.matching.mode, config.forest.trees, seed
    );

    match args.kind {
        Kind::Binary => {
            let candidates: Vec<[u8; 32]> = (0..args.candidates).map(|_| rng.gen()).collect();
            let queries = pick_queries(&candidates, args.queries, &mut rng, |d, rng| {
                let mut out = *d;
                for _ in 0..args.noise {
                    let bit = rng.gen_range(0..256);
                    out[bit / 8] ^= 1 << (bit % 8);
                }
                out
            });
            let max_distance = config.matching.max_distance.map_or(u32::MAX, |d| d as u32);
            run(config, &candidates, &queries, Hamming, &BinaryMajorityMean, max_distance, executor.as_ref(), &mut rng)
        }
        Kind::Float => {
            let candidates: Vec<[f32; 64]> = (0..args.candidates).map(|_| random_float(&mut rng)).collect();
            let amplitude = args.noise as f32 / 100.0;
            let queries = pick_queries(&candidates, args.queries, &mut rng, |d, rng| {
                let mut out = *d;
                for x in out.iter_mut() {
                    *x += rng.gen_range(-1.0..=1.0) * amplitude;
                }
                out
            });
            let max_distance = config.matching.max_distance.map_or(f32::MAX, |d| d as f32);
            run(config, &candidates, &queries, SquaredEuclidean, &FloatAverageMean, max_distance, executor.as_ref(), &mut rng)
        }
    }
}

fn random_float(rng: &mut StdRng) -> [f32; 64] {
    let mut v = [0.0f32; 64];
    for x in v.iter_mut() {
        *x = rng.gen_range(0.0..1.0);
    }
    v
}

/// Perturbed copies of randomly chosen candidates
fn pick_queries<D, F>(candidates: &[D], count: usize, rng: &mut StdRng, perturb: F) -> Vec<D>
where
    F: Fn(&D, &mut StdRng) -> D,
{
    if candidates.is_empty() {
        return Vec::new();
    }
    (0..count)
        .map(|_| {
            let source = &candidates[rng.gen_range(0..candidates.len())];
            perturb(source, rng)
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn run<D, M, C>(
    config: &Config,
    candidates: &[D],
    queries: &[D],
    metric: M,
    mean: &C,
    max_distance: M::Distance,
    executor: &dyn Executor,
    rng: &mut StdRng,
) -> Result<()>
where
    D: Clone + Send + Sync,
    M: DescriptorDistance<D> + Clone,
    C: ClusterMean<D>,
{
    let mode = config.matching.mode;

    let start = Instant::now();
    let forest = VocabularyForest::try_new(
        config.forest.trees,
        candidates,
        metric.clone(),
        mean,
        config.tree,
        executor,
        rng,
    )?;
    let build_time = start.elapsed();

    for (i, tree) in forest.trees().iter().enumerate() {
        let stats = tree.stats();
        info!(
            "Tree {}: {} nodes, {} leaves, depth {}, leaf size {}..={} (mean {:.1})",
            i,
            stats.nodes,
            stats.leaves,
            stats.depth,
            stats.min_leaf_size,
            stats.max_leaf_size,
            stats.mean_leaf_size()
        );
    }

    let start = Instant::now();
    let matches = forest.match_descriptors(queries, max_distance, mode, executor);
    let match_time = start.elapsed();

    let exact = FlatMatcher::new(candidates, metric);
    let start = Instant::now();
    let truth = exact.match_descriptors(queries, max_distance, mode, executor);
    let exact_time = start.elapsed();

    let recall_rate = recall(&matches, &truth, queries.len());
    if matches.len() < truth.len() / 2 {
        warn!("Fewer than half of the exact matches were found; consider a wider matching mode");
    }

    println!();
    println!("=== vocabtree benchmark ===");
    println!("candidates:      {}", candidates.len());
    println!("queries:         {}", queries.len());
    println!("mode:            {}", mode);
    println!("trees:           {}", forest.trees().len());
    println!("build:           {:?}", build_time);
    println!("match:           {:?} ({:.1} us/query)", match_time, per_query_us(match_time, queries.len()));
    println!("exhaustive:      {:?} ({:.1} us/query)", exact_time, per_query_us(exact_time, queries.len()));
    println!("matches:         {} / {}", matches.len(), truth.len());
    println!("recall:          {:.2}%", recall_rate * 100.0);

    Ok(())
}

/// Fraction of exact matches whose distance the approximate search reproduced
fn recall<T: DistanceValue>(
    approximate: &[Match<T>],
    exact: &[Match<T>],
    queries: usize,
) -> f64 {
    if exact.is_empty() {
        return 1.0;
    }
    let mut best = vec![T::MAX; queries];
    for m in approximate {
        best[m.query_index as usize] = m.distance;
    }
    let hits = exact
        .iter()
        .filter(|m| best[m.query_index as usize] <= m.distance)
        .count();
    hits as f64 / exact.len() as f64
}

fn per_query_us(elapsed: std::time::Duration, queries: usize) -> f64 {
    elapsed.as_secs_f64() * 1e6 / queries.max(1) as f64
}
