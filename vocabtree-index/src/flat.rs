//! # Flat Matcher (Brute-Force Exact Search)
//!
//! The "dumb" index that compares a query with every candidate. Used for:
//! 1. Ground truth when measuring the recall of trees and forests
//! 2. Tiny candidate sets where building a tree isn't worth it
//!
//! Implements `VocabularyIndex` so the batch operations work unchanged; the
//! matching mode is ignored.

use vocabtree_core::{Match, MatchingMode};

use crate::distance::DescriptorDistance;
use crate::matching::ReusableData;
use crate::traits::VocabularyIndex;

/// Exhaustive matcher over a borrowed candidate set
#[derive(Debug, Clone)]
pub struct FlatMatcher<'a, D, M> {
    candidates: &'a [D],
    metric: M,
}

impl<'a, D, M> FlatMatcher<'a, D, M>
where
    D: Sync,
    M: DescriptorDistance<D>,
{
    pub fn new(candidates: &'a [D], metric: M) -> Self {
        Self { candidates, metric }
    }

    pub fn candidates(&self) -> &'a [D] {
        self.candidates
    }

    /// Exact nearest candidate; the lowest index wins ties
    pub fn nearest(&self, query: &D) -> Match<M::Distance> {
        let mut best = Match::invalid();
        for (index, candidate) in self.candidates.iter().enumerate() {
            let d = self.metric.distance(query, candidate);
            if d < best.distance {
                best = Match::new(index as u32, 0, d);
            }
        }
        best
    }
}

impl<'a, D, M> VocabularyIndex<D> for FlatMatcher<'a, D, M>
where
    D: Sync,
    M: DescriptorDistance<D>,
{
    type Distance = M::Distance;

    fn match_descriptor<'t>(
        &'t self,
        query: &D,
        _mode: MatchingMode,
        _reusable: &mut ReusableData<'t>,
    ) -> Match<M::Distance> {
        self.nearest(query)
    }
}
