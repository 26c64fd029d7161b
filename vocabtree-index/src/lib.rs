//! # vocabtree Index
//!
//! Approximate nearest-neighbor matching of feature descriptors with
//! vocabulary trees and forests.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Vocabulary Index Layer                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │  Distance   │    │   Cluster   │    │  Executor   │     │
//! │  │  Hamming,   │    │    Means    │    │ serial or   │     │
//! │  │  L2², Fn    │    │ (bit vote,  │    │   rayon     │     │
//! │  └─────────────┘    │  average)   │    └─────────────┘     │
//! │         │           └─────────────┘           │              │
//! │         └──────────────────┬──────────────────┘              │
//! │                            │                                 │
//! │        seeding ─▶ assign ─▶ builder ─▶ Node tree             │
//! │                            │                                 │
//! │        ┌───────────────────┼───────────────────┐             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │    Tree     │    │   Forest    │    │    Flat     │     │
//! │  │   (ANN)     │    │ (ANN, N×)   │    │  (Exact)    │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                            │                                 │
//! │                  VocabularyIndex Trait                       │
//! │                                                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use rand::{rngs::StdRng, Rng, SeedableRng};
//! use vocabtree_core::{MatchingMode, Parameters};
//! use vocabtree_index::{BinaryMajorityMean, Hamming, ReusableData, SerialExecutor, VocabularyTree};
//!
//! let mut rng = StdRng::seed_from_u64(1);
//! let candidates: Vec<[u8; 32]> = (0..500).map(|_| rng.gen()).collect();
//!
//! let tree = VocabularyTree::new(
//!     &candidates,
//!     Hamming,
//!     &BinaryMajorityMean,
//!     Parameters::default(),
//!     &SerialExecutor,
//!     &mut rng,
//! );
//!
//! let mut reusable = ReusableData::new();
//! let found = tree.match_descriptor(&candidates[7], MatchingMode::FirstBestLeaf, &mut reusable);
//! assert_eq!((found.candidate_index, found.distance), (7, 0));
//! ```
//!
//! ## Modules
//!
//! - `distance`: descriptor distance metrics
//! - `mean`: cluster mean strategies
//! - `executor`: serial and rayon parallel-for
//! - `assign` / `seeding` / `builder`: hierarchical clustering
//! - `tree` / `forest`: approximate matchers
//! - `flat`: exhaustive matcher (ground truth)
//! - `traits`: common `VocabularyIndex` trait with batch matching

pub mod assign;
mod builder;
pub mod distance;
pub mod executor;
pub mod flat;
pub mod forest;
pub mod matching;
pub mod mean;
pub mod node;
pub mod seeding;
pub mod traits;
pub mod tree;

pub use assign::{assign_to_clusters, ClusterAssignment};
pub use distance::{hamming_distance, l2_distance_squared, DescriptorDistance, FnDistance, Hamming, SquaredEuclidean};
pub use executor::{executor_from_config, Executor, RayonExecutor, SerialExecutor};
pub use flat::FlatMatcher;
pub use forest::VocabularyForest;
pub use matching::{MultiDescriptor, MultiDescriptorGroup, ReusableData};
pub use mean::{BinaryMajorityMean, ClusterMean, FloatAverageMean};
pub use node::{Node, TreeStats};
pub use traits::VocabularyIndex;
pub use tree::VocabularyTree;
