//! # Vocabulary Tree
//!
//! Hierarchical k-means tree over a borrowed candidate set.
//!
//! ## Matching
//!
//! ```text
//!            root
//!      ┌──────┼──────┐
//!     c0     c1     c2        descend by distance to representatives
//!    ┌─┴─┐  ┌─┴─┐
//!   l0  l1 l2  l3             scan candidate indices of reached leaves
//! ```
//!
//! - `FirstBestLeaf`: follow the nearest child at every level
//! - `AllBestLeafs`: follow every child tied with the nearest
//! - `AllGoodLeafs1/2`: follow every child within a metric-specific
//!   tolerance of the nearest

use std::time::Instant;

use rand::Rng;
use tracing::info;

use vocabtree_core::error::{Error, Result};
use vocabtree_core::{DistanceValue, Match, MatchingMode, Parameters};

use crate::builder::TreeBuilder;
use crate::distance::DescriptorDistance;
use crate::executor::Executor;
use crate::matching::ReusableData;
use crate::mean::ClusterMean;
use crate::node::{Node, TreeStats};
use crate::traits::VocabularyIndex;

/// Vocabulary tree borrowing its candidate descriptors for `'a`
pub struct VocabularyTree<'a, D, M> {
    root: Node<D>,
    metric: M,
    candidates: &'a [D],
    params: Parameters,
}

impl<'a, D, M> VocabularyTree<'a, D, M>
where
    D: Clone + Send + Sync,
    M: DescriptorDistance<D>,
{
    /// Build a tree over `candidates`.
    ///
    /// # Panics
    ///
    /// Panics if `candidates` is empty or holds more than `u32::MAX - 1`
    /// descriptors. Invalid parameters are caught by debug assertions only;
    /// use [`VocabularyTree::try_new`] for untrusted input.
    pub fn new<C, R>(
        candidates: &'a [D],
        metric: M,
        mean: &C,
        params: Parameters,
        executor: &dyn Executor,
        rng: &mut R,
    ) -> Self
    where
        C: ClusterMean<D>,
        R: Rng + ?Sized,
    {
        assert!(!candidates.is_empty(), "vocabulary tree needs at least one candidate");
        assert!(candidates.len() < u32::MAX as usize, "too many candidates for 32-bit indices");
        debug_assert!(params.is_valid(), "invalid parameters: {:?}", params);

        let start = Instant::now();
        let root = TreeBuilder::new(candidates, &metric, mean, params).build(executor, rng);
        let tree = Self {
            root,
            metric,
            candidates,
            params,
        };

        let stats = tree.stats();
        info!(
            "Built vocabulary tree: {} descriptors, {} nodes, {} leaves, depth {} in {:?}",
            candidates.len(),
            stats.nodes,
            stats.leaves,
            stats.depth,
            start.elapsed()
        );

        tree
    }

    /// Validate the input, then build a tree
    pub fn try_new<C, R>(
        candidates: &'a [D],
        metric: M,
        mean: &C,
        params: Parameters,
        executor: &dyn Executor,
        rng: &mut R,
    ) -> Result<Self>
    where
        C: ClusterMean<D>,
        R: Rng + ?Sized,
    {
        validate_input(candidates.len(), &params)?;
        Ok(Self::new(candidates, metric, mean, params, executor, rng))
    }

    pub fn root(&self) -> &Node<D> {
        &self.root
    }

    pub fn candidates(&self) -> &'a [D] {
        self.candidates
    }

    pub fn metric(&self) -> &M {
        &self.metric
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn stats(&self) -> TreeStats {
        self.root.stats()
    }

    /// Candidate indices of the leaf reached by greedy descent
    pub fn determine_best_leaf(&self, query: &D) -> &[u32] {
        let mut node = &self.root;

        while !node.is_leaf() {
            let children = node.children();
            let mut best = &children[0];
            let mut best_distance = self.metric.distance(query, best.representative());

            for child in &children[1..] {
                let d = self.metric.distance(query, child.representative());
                if d < best_distance {
                    best_distance = d;
                    best = child;
                }
            }
            node = best;
        }

        node.descriptor_indices()
    }

    /// Append the candidate indices of every leaf reachable through children
    /// within `epsilon` of the nearest child at each level.
    ///
    /// Leaves are appended in depth-first child order.
    pub fn determine_best_leafs<'t>(&'t self, query: &D, epsilon: M::Distance, leafs: &mut Vec<&'t [u32]>) {
        let mut stack = vec![&self.root];
        let mut distances: Vec<M::Distance> = Vec::new();

        while let Some(node) = stack.pop() {
            if node.is_leaf() {
                leafs.push(node.descriptor_indices());
                continue;
            }

            distances.clear();
            distances.extend(
                node.children()
                    .iter()
                    .map(|child| self.metric.distance(query, child.representative())),
            );

            let mut best = <M::Distance as DistanceValue>::MAX;
            for &d in &distances {
                if d < best {
                    best = d;
                }
            }
            let bound = best.saturating_add(epsilon);

            // Reversed so the first kept child is popped first
            for (child, &d) in node.children().iter().zip(&distances).rev() {
                if d <= bound {
                    stack.push(child);
                }
            }
        }
    }

    /// Best candidate within the leaves selected by `mode`
    pub fn match_descriptor<'t>(
        &'t self,
        query: &D,
        mode: MatchingMode,
        reusable: &mut ReusableData<'t>,
    ) -> Match<M::Distance> {
        let mut best = Match::invalid();

        match mode {
            MatchingMode::FirstBestLeaf => {
                self.scan_leaf(query, self.determine_best_leaf(query), &mut best);
            }
            MatchingMode::AllBestLeafs | MatchingMode::AllGoodLeafs1 | MatchingMode::AllGoodLeafs2 => {
                let epsilon = self.metric.good_leafs_epsilon(mode);
                reusable.leafs.clear();
                self.determine_best_leafs(query, epsilon, &mut reusable.leafs);
                for leaf in &reusable.leafs {
                    self.scan_leaf(query, leaf, &mut best);
                }
            }
        }

        best
    }

    fn scan_leaf(&self, query: &D, indices: &[u32], best: &mut Match<M::Distance>) {
        for &index in indices {
            let d = self.metric.distance(query, &self.candidates[index as usize]);
            if d < best.distance {
                *best = Match::new(index, 0, d);
            }
        }
    }
}

impl<'a, D, M> VocabularyIndex<D> for VocabularyTree<'a, D, M>
where
    D: Clone + Send + Sync,
    M: DescriptorDistance<D>,
{
    type Distance = M::Distance;

    fn match_descriptor<'t>(
        &'t self,
        query: &D,
        mode: MatchingMode,
        reusable: &mut ReusableData<'t>,
    ) -> Match<M::Distance> {
        VocabularyTree::match_descriptor(self, query, mode, reusable)
    }
}

impl<'a, D: std::fmt::Debug, M: std::fmt::Debug> std::fmt::Debug for VocabularyTree<'a, D, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VocabularyTree")
            .field("candidates", &self.candidates.len())
            .field("metric", &self.metric)
            .field("params", &self.params)
            .finish()
    }
}

/// Reject inputs `new` would only catch with debug assertions
pub(crate) fn validate_input(candidates: usize, params: &Parameters) -> Result<()> {
    params.validate()?;
    if candidates == 0 {
        return Err(Error::EmptyCandidateSet);
    }
    if candidates >= u32::MAX as usize {
        return Err(Error::CandidateSetTooLarge { count: candidates });
    }
    Ok(())
}
