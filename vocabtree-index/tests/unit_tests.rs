//! Unit tests for vocabtree-index: structural invariants of built trees.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use vocabtree_core::{InitializationStrategy, MatchingMode, Parameters};
use vocabtree_index::{
    BinaryMajorityMean, ClusterMean, FloatAverageMean, Hamming, Node, ReusableData, SerialExecutor,
    SquaredEuclidean, VocabularyTree,
};

// ============================================================================
// Test Utilities
// ============================================================================

fn random_binary(n: usize, rng: &mut StdRng) -> Vec<[u8; 32]> {
    (0..n).map(|_| rng.gen()).collect()
}

fn random_float(n: usize, rng: &mut StdRng) -> Vec<[f32; 16]> {
    (0..n)
        .map(|_| {
            let mut v = [0.0f32; 16];
            for x in v.iter_mut() {
                *x = rng.gen_range(-1.0..1.0);
            }
            v
        })
        .collect()
}

fn sorted_leaf_indices<D>(root: &Node<D>) -> Vec<u32> {
    let mut all = Vec::new();
    root.collect_leaf_indices(&mut all);
    all.sort_unstable();
    all
}

/// Every node is either a non-empty leaf or has at least two children one level down
fn assert_well_formed<D>(node: &Node<D>) {
    if node.is_leaf() {
        assert!(!node.descriptor_indices().is_empty());
    } else {
        assert!(node.descriptor_indices().is_empty());
        assert!(node.children().len() >= 2);
        for child in node.children() {
            assert_eq!(child.level(), node.level() + 1);
            assert_well_formed(child);
        }
    }
}

fn build_binary<'a>(candidates: &'a [[u8; 32]], params: Parameters, seed: u64) -> VocabularyTree<'a, [u8; 32], Hamming> {
    let mut rng = StdRng::seed_from_u64(seed);
    VocabularyTree::new(candidates, Hamming, &BinaryMajorityMean, params, &SerialExecutor, &mut rng)
}

// ============================================================================
// Partition Invariant
// ============================================================================

mod partition_tests {
    use super::*;

    #[test]
    fn test_scenario_1000_binary_descriptors() {
        let mut rng = StdRng::seed_from_u64(1000);
        let candidates = random_binary(1000, &mut rng);
        let params = Parameters::new(10, 40, 5, InitializationStrategy::LargestDistance);
        let tree = build_binary(&candidates, params, 7);

        assert_eq!(sorted_leaf_indices(tree.root()), (0..1000).collect::<Vec<u32>>());
        assert_well_formed(tree.root());

        let stats = tree.stats();
        assert!(stats.depth <= 5);
        assert_eq!(stats.indexed_descriptors, 1000);
        assert!(stats.min_leaf_size >= 1);

        // Only leaves forced by the level limit may exceed the leaf size
        let mut stack = vec![tree.root()];
        while let Some(node) = stack.pop() {
            if node.is_leaf() && node.level() + 1 < 5 {
                assert!(node.descriptor_indices().len() <= 40);
            }
            stack.extend(node.children());
        }
    }

    #[test]
    fn test_partition_with_pure_random() {
        let mut rng = StdRng::seed_from_u64(3);
        let candidates = random_float(700, &mut rng);
        let params = Parameters::new(4, 10, u32::MAX, InitializationStrategy::PureRandom);
        let tree = VocabularyTree::new(
            &candidates,
            SquaredEuclidean,
            &FloatAverageMean,
            params,
            &SerialExecutor,
            &mut rng,
        );

        assert_eq!(sorted_leaf_indices(tree.root()), (0..700).collect::<Vec<u32>>());
        assert_well_formed(tree.root());
    }

    #[test]
    fn test_max_levels_bounds_depth() {
        let mut rng = StdRng::seed_from_u64(8);
        let candidates = random_binary(600, &mut rng);
        let params = Parameters::new(2, 1, 3, InitializationStrategy::LargestDistance);
        let tree = build_binary(&candidates, params, 8);

        assert!(tree.stats().depth <= 3);
        assert_eq!(sorted_leaf_indices(tree.root()).len(), 600);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_leaves_partition_input(
            n in 1usize..300,
            clusters in 2u32..8,
            per_leaf in 1u32..30,
            levels in 1u32..8,
            pure_random in any::<bool>(),
            seed in any::<u64>(),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            // Short descriptors make duplicates likely
            let candidates: Vec<[u8; 2]> = (0..n).map(|_| [rng.gen::<u8>() & 0x0F, rng.gen()]).collect();
            let strategy = if pure_random {
                InitializationStrategy::PureRandom
            } else {
                InitializationStrategy::LargestDistance
            };
            let params = Parameters::new(clusters, per_leaf, levels, strategy);
            let tree = VocabularyTree::new(&candidates, Hamming, &BinaryMajorityMean, params, &SerialExecutor, &mut rng);

            prop_assert_eq!(sorted_leaf_indices(tree.root()), (0..n as u32).collect::<Vec<u32>>());
            prop_assert!(tree.stats().depth <= levels);
            assert_well_formed(tree.root());
        }
    }
}

// ============================================================================
// Degenerate Inputs
// ============================================================================

mod degenerate_tests {
    use super::*;

    #[test]
    fn test_fewer_candidates_than_clusters() {
        let mut rng = StdRng::seed_from_u64(4);
        let candidates = random_binary(9, &mut rng);
        let tree = build_binary(&candidates, Parameters::default(), 4);

        assert!(tree.root().is_leaf());
        assert_eq!(tree.root().descriptor_indices(), (0..9).collect::<Vec<u32>>().as_slice());
    }

    #[test]
    fn test_single_candidate() {
        let candidates = [[0xABu8; 32]];
        let tree = build_binary(&candidates, Parameters::default(), 0);
        let mut reusable = ReusableData::new();

        for mode in MatchingMode::ALL {
            let found = tree.match_descriptor(&[0u8; 32], mode, &mut reusable);
            assert_eq!(found.candidate_index, 0);
            assert_eq!(found.distance, 5 * 32);
        }
    }

    #[test]
    fn test_identical_descriptors_collapse() {
        let candidates = vec![[0x5Au8; 32]; 500];
        for strategy in [InitializationStrategy::LargestDistance, InitializationStrategy::PureRandom] {
            let params = Parameters::new(10, 40, 5, strategy);
            let tree = build_binary(&candidates, params, 12);

            assert!(tree.root().is_leaf(), "{:?} should collapse", strategy);
            assert_eq!(tree.root().descriptor_indices().len(), 500);
        }
    }

    #[test]
    fn test_two_distinct_values() {
        let mut candidates = vec![[0x00u8; 32]; 100];
        candidates.extend(vec![[0xFFu8; 32]; 100]);
        let tree = build_binary(&candidates, Parameters::new(10, 40, 5, InitializationStrategy::LargestDistance), 2);

        // Two groups of duplicates end up as two oversized leaves
        assert_eq!(tree.root().children().len(), 2);
        for child in tree.root().children() {
            assert!(child.is_leaf());
            assert_eq!(child.descriptor_indices().len(), 100);
        }
    }
}

// ============================================================================
// Cluster Means
// ============================================================================

mod mean_tests {
    use super::*;

    #[test]
    fn test_singleton_mean_identity() {
        let mut rng = StdRng::seed_from_u64(17);
        let binary = random_binary(5, &mut rng);
        let float = random_float(5, &mut rng);
        let indices = [3u32];

        let binary_means = BinaryMajorityMean.cluster_means(1, &binary, &indices, &[0]);
        assert_eq!(binary_means[0], binary[3]);

        let float_means = FloatAverageMean.cluster_means(1, &float, &indices, &[0]);
        assert_eq!(float_means[0], float[3]);
    }
}
