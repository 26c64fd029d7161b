//! # Core Types
//!
//! Value types shared by every vocabulary structure.
//!
//! ## Type Design
//!
//! - `Match` is a plain value; "no match" is the `INVALID_MATCH_INDEX`
//!   sentinel, never an `Option` or an error.
//! - `Parameters` is validated once, before construction.
//! - `DistanceValue` abstracts over the scalar returned by a distance
//!   function (`u32` for Hamming, `f32` for squared Euclidean, ...).

use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Index marking an invalid match.
pub const INVALID_MATCH_INDEX: u32 = u32::MAX;

/// Scalar distance between two descriptors.
///
/// `Sum` is the wider type used to accumulate clustering costs so that
/// summing many `u32` Hamming distances cannot overflow.
pub trait DistanceValue:
    Copy + PartialOrd + Default + fmt::Debug + Send + Sync + 'static
{
    /// Accumulator type for sums of distances
    type Sum: Copy + PartialOrd + Add<Output = Self::Sum> + fmt::Debug + Send + Sync;

    /// Largest representable distance, used as "nothing found yet"
    const MAX: Self;
    /// Zero distance
    const ZERO: Self;
    /// Zero accumulator
    const SUM_ZERO: Self::Sum;

    /// Convert into the accumulator type
    fn widen(self) -> Self::Sum;

    /// Addition that clamps at `MAX` instead of overflowing
    fn saturating_add(self, other: Self) -> Self;
}

macro_rules! impl_integer_distance {
    ($t:ty, $sum:ty) => {
        impl DistanceValue for $t {
            type Sum = $sum;
            const MAX: Self = <$t>::MAX;
            const ZERO: Self = 0;
            const SUM_ZERO: Self::Sum = 0;

            #[inline]
            fn widen(self) -> Self::Sum {
                self as $sum
            }

            #[inline]
            fn saturating_add(self, other: Self) -> Self {
                <$t>::saturating_add(self, other)
            }
        }
    };
}

macro_rules! impl_float_distance {
    ($t:ty, $sum:ty) => {
        impl DistanceValue for $t {
            type Sum = $sum;
            const MAX: Self = <$t>::MAX;
            const ZERO: Self = 0.0;
            const SUM_ZERO: Self::Sum = 0.0;

            #[inline]
            fn widen(self) -> Self::Sum {
                self as $sum
            }

            #[inline]
            fn saturating_add(self, other: Self) -> Self {
                (self + other).min(<$t>::MAX)
            }
        }
    };
}

impl_integer_distance!(u16, u64);
impl_integer_distance!(u32, u64);
impl_integer_distance!(u64, u128);
impl_float_distance!(f32, f64);
impl_float_distance!(f64, f64);

/// A matched pair of candidate and query descriptor with their distance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Match<T> {
    pub candidate_index: u32,
    pub query_index: u32,
    pub distance: T,
}

/// Vector of matches
pub type Matches<T> = Vec<Match<T>>;

impl<T: DistanceValue> Match<T> {
    pub fn new(candidate_index: u32, query_index: u32, distance: T) -> Self {
        Self {
            candidate_index,
            query_index,
            distance,
        }
    }

    /// The "no match" value: both indices invalid, distance `T::MAX`
    pub fn invalid() -> Self {
        Self {
            candidate_index: INVALID_MATCH_INDEX,
            query_index: INVALID_MATCH_INDEX,
            distance: T::MAX,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.candidate_index != INVALID_MATCH_INDEX && self.query_index != INVALID_MATCH_INDEX
    }

    /// Returns this match if its distance is within `max_distance`, otherwise an invalid match
    pub fn within(self, max_distance: T) -> Self {
        if self.is_valid() && self.distance <= max_distance {
            self
        } else {
            Self::invalid()
        }
    }

    /// Same match, attributed to another query
    pub fn with_query_index(self, query_index: u32) -> Self {
        Self { query_index, ..self }
    }
}

impl<T: DistanceValue> Default for Match<T> {
    fn default() -> Self {
        Self::invalid()
    }
}

/// How initial cluster centers of each node are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitializationStrategy {
    /// All initial centers are drawn at random
    PureRandom,
    /// First center random, then farthest-point selection
    LargestDistance,
}

impl Default for InitializationStrategy {
    fn default() -> Self {
        InitializationStrategy::LargestDistance
    }
}

impl FromStr for InitializationStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pure_random" | "pure-random" => Ok(InitializationStrategy::PureRandom),
            "largest_distance" | "largest-distance" => Ok(InitializationStrategy::LargestDistance),
            other => Err(Error::Configuration {
                message: format!("Unknown initialization strategy: {}", other),
            }),
        }
    }
}

/// How many leaves a query explores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingMode {
    /// Only the first best leaf (greedy descent)
    FirstBestLeaf,
    /// Every leaf reached through children tied with the best distance
    AllBestLeafs,
    /// Every leaf within 1% of the descriptor's distance range of the best path
    #[serde(rename = "all_good_leafs_1")]
    AllGoodLeafs1,
    /// Every leaf within 2% of the descriptor's distance range of the best path
    #[serde(rename = "all_good_leafs_2")]
    AllGoodLeafs2,
}

impl MatchingMode {
    pub const ALL: [MatchingMode; 4] = [
        MatchingMode::FirstBestLeaf,
        MatchingMode::AllBestLeafs,
        MatchingMode::AllGoodLeafs1,
        MatchingMode::AllGoodLeafs2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchingMode::FirstBestLeaf => "first_best_leaf",
            MatchingMode::AllBestLeafs => "all_best_leafs",
            MatchingMode::AllGoodLeafs1 => "all_good_leafs_1",
            MatchingMode::AllGoodLeafs2 => "all_good_leafs_2",
        }
    }
}

impl Default for MatchingMode {
    fn default() -> Self {
        MatchingMode::FirstBestLeaf
    }
}

impl fmt::Display for MatchingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.replace('-', "_");
        MatchingMode::ALL
            .iter()
            .copied()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| Error::Configuration {
                message: format!("Unknown matching mode: {}", s),
            })
    }
}

/// Construction parameters of a vocabulary tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Maximal number of clusters per node, range [2, infinity)
    pub max_clusters_per_level: u32,
    /// Maximal number of descriptors per leaf, range [1, infinity)
    pub max_descriptors_per_leaf: u32,
    /// Maximal number of tree levels, range [1, infinity)
    pub max_levels: u32,
    pub initialization_strategy: InitializationStrategy,
}

impl Parameters {
    pub fn new(
        max_clusters_per_level: u32,
        max_descriptors_per_leaf: u32,
        max_levels: u32,
        initialization_strategy: InitializationStrategy,
    ) -> Self {
        Self {
            max_clusters_per_level,
            max_descriptors_per_leaf,
            max_levels,
            initialization_strategy,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.max_clusters_per_level >= 2 && self.max_descriptors_per_leaf >= 1 && self.max_levels >= 1
    }

    /// Validate, describing the first violated bound
    pub fn validate(&self) -> Result<()> {
        if self.max_clusters_per_level < 2 {
            return Err(Error::InvalidParameters {
                message: format!(
                    "max_clusters_per_level must be at least 2, got {}",
                    self.max_clusters_per_level
                ),
            });
        }
        if self.max_descriptors_per_leaf < 1 {
            return Err(Error::InvalidParameters {
                message: "max_descriptors_per_leaf must be at least 1".to_string(),
            });
        }
        if self.max_levels < 1 {
            return Err(Error::InvalidParameters {
                message: "max_levels must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Number of initial clusters for a node holding `descriptors` indices
    pub fn initial_cluster_count(&self, descriptors: usize) -> usize {
        let per_leaf = self.max_descriptors_per_leaf as usize;
        let needed = (descriptors + per_leaf - 1) / per_leaf;
        needed.min(self.max_clusters_per_level as usize)
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            max_clusters_per_level: 10,
            max_descriptors_per_leaf: 40,
            max_levels: u32::MAX,
            initialization_strategy: InitializationStrategy::LargestDistance,
        }
    }
}
