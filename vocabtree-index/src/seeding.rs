//! Initial cluster centers.

use rand::seq::index;
use rand::Rng;

use vocabtree_core::{DistanceValue, InitializationStrategy};

use crate::distance::DescriptorDistance;

/// Choose up to `clusters` initial centers among `candidates[indices[..]]`.
///
/// `LargestDistance` may return fewer centers than requested when the
/// remaining descriptors coincide with the chosen ones.
pub fn initial_centers<D, M, R>(
    strategy: InitializationStrategy,
    clusters: usize,
    candidates: &[D],
    indices: &[u32],
    metric: &M,
    rng: &mut R,
) -> Vec<D>
where
    D: Clone,
    M: DescriptorDistance<D>,
    R: Rng + ?Sized,
{
    debug_assert!(clusters >= 1 && clusters <= indices.len());

    match strategy {
        InitializationStrategy::PureRandom => pure_random(clusters, candidates, indices, rng),
        InitializationStrategy::LargestDistance => {
            largest_distance(clusters, candidates, indices, metric, rng)
        }
    }
}

fn pure_random<D, R>(clusters: usize, candidates: &[D], indices: &[u32], rng: &mut R) -> Vec<D>
where
    D: Clone,
    R: Rng + ?Sized,
{
    index::sample(rng, indices.len(), clusters)
        .into_iter()
        .map(|position| candidates[indices[position] as usize].clone())
        .collect()
}

/// Farthest-point seeding: every new center is the descriptor farthest from
/// all centers chosen so far, ties broken at random.
fn largest_distance<D, M, R>(
    clusters: usize,
    candidates: &[D],
    indices: &[u32],
    metric: &M,
    rng: &mut R,
) -> Vec<D>
where
    D: Clone,
    M: DescriptorDistance<D>,
    R: Rng + ?Sized,
{
    let mut centers = Vec::with_capacity(clusters);

    let first = rng.gen_range(0..indices.len());
    centers.push(candidates[indices[first] as usize].clone());

    // Distance of every descriptor to its nearest chosen center
    let mut nearest: Vec<M::Distance> = indices
        .iter()
        .map(|&i| metric.distance(&centers[0], &candidates[i as usize]))
        .collect();

    let mut farthest = Vec::new();

    while centers.len() < clusters {
        let mut worst = <M::Distance as DistanceValue>::ZERO;
        farthest.clear();

        for (position, &d) in nearest.iter().enumerate() {
            if d > worst {
                worst = d;
                farthest.clear();
                farthest.push(position);
            } else if d == worst && !farthest.is_empty() {
                farthest.push(position);
            }
        }

        if farthest.is_empty() {
            break;
        }

        let position = farthest[rng.gen_range(0..farthest.len())];
        let center = candidates[indices[position] as usize].clone();

        for (d, &i) in nearest.iter_mut().zip(indices) {
            let to_center = metric.distance(&center, &candidates[i as usize]);
            if to_center < *d {
                *d = to_center;
            }
        }

        centers.push(center);
    }

    centers
}
