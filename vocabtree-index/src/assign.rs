//! # Cluster Assignment
//!
//! Assigns every descriptor of a node to its nearest cluster center.
//!
//! Large assignments (descriptors × centers ≥ `PARALLEL_ASSIGNMENT_THRESHOLD`)
//! are split into disjoint ranges on a parallel executor. Each task works on
//! private buffers and merges them under a single lock when it is done, so
//! the result does not depend on the number of threads.

use std::ops::Range;

use parking_lot::Mutex;

use vocabtree_core::DistanceValue;

use crate::distance::DescriptorDistance;
use crate::executor::Executor;

/// Minimal descriptors × centers product before assignment runs in parallel
pub const PARALLEL_ASSIGNMENT_THRESHOLD: usize = 50_000;

/// Result of one assignment pass
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment<S> {
    /// Cluster of `indices[i]`
    pub cluster_of: Vec<u32>,
    /// Number of descriptors per cluster
    pub sizes: Vec<u32>,
    /// Sum of distances between descriptors and their centers
    pub cost: S,
}

/// Assign `candidates[indices[i]]` to the nearest of `centers`.
///
/// Ties go to the lowest cluster index. Distances are taken in the same
/// argument order as during descent, descriptor first.
pub fn assign_to_clusters<D, M>(
    centers: &[D],
    candidates: &[D],
    indices: &[u32],
    metric: &M,
    executor: &dyn Executor,
) -> ClusterAssignment<<M::Distance as DistanceValue>::Sum>
where
    D: Sync,
    M: DescriptorDistance<D>,
{
    debug_assert!(!centers.is_empty());

    let parallel = executor.is_parallel()
        && indices.len() * centers.len() >= PARALLEL_ASSIGNMENT_THRESHOLD;

    if !parallel {
        let mut cluster_of = vec![0u32; indices.len()];
        let mut sizes = vec![0u32; centers.len()];
        let cost = assign_range(centers, candidates, indices, metric, &mut cluster_of, &mut sizes);
        return ClusterAssignment { cluster_of, sizes, cost };
    }

    let merged = Mutex::new(ClusterAssignment {
        cluster_of: vec![0u32; indices.len()],
        sizes: vec![0u32; centers.len()],
        cost: <M::Distance as DistanceValue>::SUM_ZERO,
    });

    // Enough work per task to amortize the merge
    let min_chunk = (PARALLEL_ASSIGNMENT_THRESHOLD / centers.len()).max(1);

    executor.execute(0..indices.len(), min_chunk, &|range: Range<usize>| {
        let mut local_cluster_of = vec![0u32; range.len()];
        let mut local_sizes = vec![0u32; centers.len()];
        let local_cost = assign_range(
            centers,
            candidates,
            &indices[range.clone()],
            metric,
            &mut local_cluster_of,
            &mut local_sizes,
        );

        let mut merged = merged.lock();
        merged.cluster_of[range].copy_from_slice(&local_cluster_of);
        for (size, local) in merged.sizes.iter_mut().zip(&local_sizes) {
            *size += local;
        }
        merged.cost = merged.cost + local_cost;
    });

    merged.into_inner()
}

fn assign_range<D, M>(
    centers: &[D],
    candidates: &[D],
    indices: &[u32],
    metric: &M,
    cluster_of: &mut [u32],
    sizes: &mut [u32],
) -> <M::Distance as DistanceValue>::Sum
where
    M: DescriptorDistance<D>,
{
    let mut cost = <M::Distance as DistanceValue>::SUM_ZERO;

    for (&index, cluster) in indices.iter().zip(cluster_of.iter_mut()) {
        let descriptor = &candidates[index as usize];

        let mut best_cluster = 0usize;
        let mut best_distance = metric.distance(descriptor, &centers[0]);
        for (c, center) in centers.iter().enumerate().skip(1) {
            let d = metric.distance(descriptor, center);
            if d < best_distance {
                best_distance = d;
                best_cluster = c;
            }
        }

        *cluster = best_cluster as u32;
        sizes[best_cluster] += 1;
        cost = cost + best_distance.widen();
    }

    cost
}
