//! # Tree Construction
//!
//! Recursive hierarchical clustering of the candidate set.
//!
//! ## Algorithm
//!
//! ```text
//! build(node, indices):
//!   leaf if |indices| <= max_descriptors_per_leaf or level + 1 >= max_levels
//!   seed k = min(max_clusters_per_level, ceil(|indices| / max_descriptors_per_leaf)) centers
//!   repeat { means -> assign } while the total cost strictly decreases
//!   drop empty clusters; leaf if a single cluster remains
//!   stable partition of indices by cluster
//!   build(child, run) for every cluster
//! ```
//!
//! Children receive RNG seeds drawn from the parent before any of them is
//! built, so the resulting tree depends only on the caller's RNG state and
//! not on how children are scheduled. Children of the root are built in
//! parallel on the executor; everything below runs serially.

use std::cmp::Ordering;
use std::ops::Range;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use vocabtree_core::{DistanceValue, Parameters};

use crate::assign::{assign_to_clusters, ClusterAssignment};
use crate::distance::DescriptorDistance;
use crate::executor::{Executor, SerialExecutor};
use crate::mean::ClusterMean;
use crate::node::Node;
use crate::seeding::initial_centers;

/// Result of clustering one node
struct Clustering<D> {
    centers: Vec<D>,
    /// `indices` reordered so that every cluster is one contiguous run
    ordered: Vec<u32>,
    /// Run boundaries, `runs[c]..runs[c + 1]` belongs to cluster `c`
    runs: Vec<usize>,
    iterations: usize,
}

pub(crate) struct TreeBuilder<'b, D, M, C> {
    candidates: &'b [D],
    metric: &'b M,
    mean: &'b C,
    params: Parameters,
}

impl<'b, D, M, C> TreeBuilder<'b, D, M, C>
where
    D: Clone + Send + Sync,
    M: DescriptorDistance<D>,
    C: ClusterMean<D>,
{
    pub(crate) fn new(candidates: &'b [D], metric: &'b M, mean: &'b C, params: Parameters) -> Self {
        debug_assert!(!candidates.is_empty());
        debug_assert!(params.is_valid());
        Self {
            candidates,
            metric,
            mean,
            params,
        }
    }

    /// Build the root node over the whole candidate set
    pub(crate) fn build<R>(&self, executor: &dyn Executor, rng: &mut R) -> Node<D>
    where
        R: Rng + ?Sized,
    {
        let indices: Vec<u32> = (0..self.candidates.len() as u32).collect();
        let representative = self.candidates[0].clone();

        if self.candidates.len() < self.params.max_clusters_per_level as usize {
            return Node::leaf(0, representative, indices);
        }

        self.build_node(0, representative, &indices, executor, rng)
    }

    fn build_node<R>(
        &self,
        level: u32,
        representative: D,
        indices: &[u32],
        executor: &dyn Executor,
        rng: &mut R,
    ) -> Node<D>
    where
        R: Rng + ?Sized,
    {
        if self.is_terminal(level, indices.len()) {
            return Node::leaf(level, representative, indices.to_vec());
        }

        let clustering = match self.cluster(indices, executor, rng) {
            Some(clustering) => clustering,
            None => return Node::leaf(level, representative, indices.to_vec()),
        };

        let clusters = clustering.centers.len();
        if level == 0 {
            debug!(
                "Root clustering: {} descriptors into {} clusters after {} iterations",
                indices.len(),
                clusters,
                clustering.iterations
            );
        }

        let seeds: Vec<u64> = (0..clusters).map(|_| rng.gen()).collect();

        let build_child = |c: usize| {
            let mut child_rng = StdRng::seed_from_u64(seeds[c]);
            let run = &clustering.ordered[clustering.runs[c]..clustering.runs[c + 1]];
            self.build_node(
                level + 1,
                clustering.centers[c].clone(),
                run,
                &SerialExecutor,
                &mut child_rng,
            )
        };

        let children = if level == 0 && executor.is_parallel() {
            let built = Mutex::new(Vec::with_capacity(clusters));
            executor.execute(0..clusters, 1, &|range: Range<usize>| {
                for c in range {
                    let child = build_child(c);
                    built.lock().push((c, child));
                }
            });
            let mut built = built.into_inner();
            built.sort_by_key(|(c, _)| *c);
            built.into_iter().map(|(_, child)| child).collect()
        } else {
            (0..clusters).map(build_child).collect()
        };

        Node::internal(level, representative, children)
    }

    fn is_terminal(&self, level: u32, descriptors: usize) -> bool {
        descriptors <= self.params.max_descriptors_per_leaf as usize
            || level.saturating_add(1) >= self.params.max_levels
    }

    /// Cluster `indices`; `None` when everything collapses into one cluster
    fn cluster<R>(&self, indices: &[u32], executor: &dyn Executor, rng: &mut R) -> Option<Clustering<D>>
    where
        R: Rng + ?Sized,
    {
        let k = self.params.initial_cluster_count(indices.len());
        if k <= 1 {
            return None;
        }

        let mut centers = initial_centers(
            self.params.initialization_strategy,
            k,
            self.candidates,
            indices,
            self.metric,
            rng,
        );
        if centers.len() <= 1 {
            return None;
        }

        let mut assignment = self.assign(&centers, indices, executor);
        let mut iterations = 1;

        // Refine while the cost improves; keep the last improving state
        loop {
            let next_centers = self.mean.cluster_means(
                centers.len(),
                self.candidates,
                indices,
                &assignment.cluster_of,
            );
            let next = self.assign(&next_centers, indices, executor);
            iterations += 1;

            if next.cost.partial_cmp(&assignment.cost) != Some(Ordering::Less) {
                break;
            }
            centers = next_centers;
            assignment = next;
        }

        trace!(
            "Clustered {} descriptors into {} centers in {} iterations",
            indices.len(),
            centers.len(),
            iterations
        );

        let (centers, ordered, runs) = partition(centers, indices, &assignment);
        if centers.len() <= 1 {
            return None;
        }

        Some(Clustering {
            centers,
            ordered,
            runs,
            iterations,
        })
    }

    fn assign(
        &self,
        centers: &[D],
        indices: &[u32],
        executor: &dyn Executor,
    ) -> ClusterAssignment<<M::Distance as DistanceValue>::Sum> {
        assign_to_clusters(centers, self.candidates, indices, self.metric, executor)
    }
}

/// Drop empty clusters and stably reorder `indices` into one run per
/// surviving cluster (counting sort).
fn partition<D, S>(
    centers: Vec<D>,
    indices: &[u32],
    assignment: &ClusterAssignment<S>,
) -> (Vec<D>, Vec<u32>, Vec<usize>) {
    let mut remap = vec![u32::MAX; centers.len()];
    let mut kept_centers = Vec::with_capacity(centers.len());
    let mut runs = vec![0usize];

    for (c, (center, &size)) in centers.into_iter().zip(&assignment.sizes).enumerate() {
        if size == 0 {
            continue;
        }
        remap[c] = kept_centers.len() as u32;
        kept_centers.push(center);
        let end = runs[runs.len() - 1] + size as usize;
        runs.push(end);
    }

    let mut cursor: Vec<usize> = runs[..runs.len() - 1].to_vec();
    let mut ordered = vec![0u32; indices.len()];
    for (&index, &cluster) in indices.iter().zip(&assignment.cluster_of) {
        let slot = &mut cursor[remap[cluster as usize] as usize];
        ordered[*slot] = index;
        *slot += 1;
    }

    (kept_centers, ordered, runs)
}
