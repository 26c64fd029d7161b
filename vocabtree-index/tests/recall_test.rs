//! # Recall Tests
//!
//! Compare vocabulary trees and forests against the flat matcher (ground truth).
//! Metric: Recall = fraction of queries whose approximate match distance
//! equals the exact nearest distance.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use vocabtree_core::{InitializationStrategy, MatchingMode, Parameters};
use vocabtree_index::{
    BinaryMajorityMean, FlatMatcher, FloatAverageMean, Hamming, ReusableData, SerialExecutor,
    SquaredEuclidean, VocabularyForest, VocabularyIndex, VocabularyTree,
};

/// Descriptors scattered around random prototypes
fn clustered_binary(prototypes: usize, per_prototype: usize, flips: usize, rng: &mut StdRng) -> Vec<[u8; 32]> {
    let centers: Vec<[u8; 32]> = (0..prototypes).map(|_| rng.gen()).collect();
    let mut out = Vec::with_capacity(prototypes * per_prototype);
    for center in &centers {
        for _ in 0..per_prototype {
            out.push(flip_bits(center, flips, rng));
        }
    }
    out
}

fn flip_bits(descriptor: &[u8; 32], flips: usize, rng: &mut StdRng) -> [u8; 32] {
    let mut out = *descriptor;
    for _ in 0..flips {
        let bit = rng.gen_range(0..256);
        out[bit / 8] ^= 1 << (bit % 8);
    }
    out
}

fn recall<I: VocabularyIndex<[u8; 32], Distance = u32>>(
    index: &I,
    exact: &FlatMatcher<'_, [u8; 32], Hamming>,
    queries: &[[u8; 32]],
    mode: MatchingMode,
) -> f32 {
    let mut reusable = ReusableData::new();
    let hits = queries
        .iter()
        .filter(|q| index.match_descriptor(q, mode, &mut reusable).distance == exact.nearest(q).distance)
        .count();
    hits as f32 / queries.len() as f32
}

#[test]
fn test_recall_by_matching_mode() {
    let mut rng = StdRng::seed_from_u64(2024);
    let candidates = clustered_binary(50, 40, 20, &mut rng);
    let queries: Vec<[u8; 32]> = (0..200)
        .map(|_| {
            let i = rng.gen_range(0..candidates.len());
            flip_bits(&candidates[i], 5, &mut rng)
        })
        .collect();

    println!("\n=== Recall Test: {} candidates, {} queries ===\n", candidates.len(), queries.len());

    let exact = FlatMatcher::new(&candidates, Hamming);
    let tree = VocabularyTree::new(
        &candidates,
        Hamming,
        &BinaryMajorityMean,
        Parameters::default(),
        &SerialExecutor,
        &mut rng,
    );

    let mut recalls = Vec::new();
    for mode in MatchingMode::ALL {
        let r = recall(&tree, &exact, &queries, mode);
        println!("{:>18}: recall {:.1}%", mode.as_str(), r * 100.0);
        recalls.push(r);
    }

    // Wider modes explore supersets of leaves
    for pair in recalls.windows(2) {
        assert!(pair[1] >= pair[0], "recall must not drop: {:?}", recalls);
    }
    assert!(recalls[0] >= 0.5, "first-best-leaf recall too low: {:?}", recalls);
}

#[test]
fn test_monotonic_distances_per_query() {
    let mut rng = StdRng::seed_from_u64(77);
    let candidates: Vec<[u8; 32]> = (0..3000).map(|_| rng.gen()).collect();
    let queries: Vec<[u8; 32]> = (0..300).map(|_| rng.gen()).collect();
    let tree = VocabularyTree::new(
        &candidates,
        Hamming,
        &BinaryMajorityMean,
        Parameters::new(8, 30, u32::MAX, InitializationStrategy::LargestDistance),
        &SerialExecutor,
        &mut rng,
    );

    let mut reusable = ReusableData::new();
    for query in &queries {
        let d: Vec<u32> = MatchingMode::ALL
            .iter()
            .map(|&mode| tree.match_descriptor(query, mode, &mut reusable).distance)
            .collect();
        assert!(d[3] <= d[2] && d[2] <= d[1] && d[1] <= d[0], "distances {:?}", d);
    }
}

#[test]
fn test_forest_recall_dominates_first_tree() {
    let mut rng = StdRng::seed_from_u64(99);
    let candidates: Vec<[u8; 32]> = (0..4000).map(|_| rng.gen()).collect();
    let queries: Vec<[u8; 32]> = candidates
        .iter()
        .step_by(20)
        .map(|c| flip_bits(c, 12, &mut rng))
        .collect();

    let exact = FlatMatcher::new(&candidates, Hamming);
    let forest = VocabularyForest::new(
        4,
        &candidates,
        Hamming,
        &BinaryMajorityMean,
        Parameters::default(),
        &SerialExecutor,
        &mut rng,
    );

    let first_tree = recall(&forest.trees()[0], &exact, &queries, MatchingMode::FirstBestLeaf);
    let whole = recall(&forest, &exact, &queries, MatchingMode::FirstBestLeaf);
    println!("single tree: {:.1}%, forest of 4: {:.1}%", first_tree * 100.0, whole * 100.0);

    assert!(whole >= first_tree);
}

#[test]
fn test_float_self_recall() {
    let mut rng = StdRng::seed_from_u64(5);
    let candidates: Vec<[f32; 32]> = (0..2000)
        .map(|_| {
            let mut v = [0.0f32; 32];
            for x in v.iter_mut() {
                *x = rng.gen_range(0.0..1.0);
            }
            v
        })
        .collect();

    let tree = VocabularyTree::new(
        &candidates,
        SquaredEuclidean,
        &FloatAverageMean,
        Parameters::default(),
        &SerialExecutor,
        &mut rng,
    );

    let mut reusable = ReusableData::new();
    for (i, candidate) in candidates.iter().enumerate().step_by(37) {
        let found = tree.match_descriptor(candidate, MatchingMode::FirstBestLeaf, &mut reusable);
        assert_eq!(found.candidate_index, i as u32);
        assert_eq!(found.distance, 0.0);
    }
}
