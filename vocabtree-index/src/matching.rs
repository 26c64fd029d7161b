//! # Matching Helpers
//!
//! Query-side types shared by trees and forests: multi-descriptor access,
//! the caller-owned scratch buffer, and the batch dispatcher.

use std::ops::Range;

use parking_lot::Mutex;

use vocabtree_core::{DistanceValue, Match, Matches};

use crate::executor::Executor;

/// Minimal number of queries per task when batch matching in parallel
pub const MIN_QUERIES_PER_TASK: usize = 50;

/// Scratch space reused across queries against the same index.
///
/// Holds the leaves gathered by the multi-leaf matching modes. Keep one per
/// thread; matching takes it by `&mut` so it cannot be shared.
#[derive(Debug, Default)]
pub struct ReusableData<'t> {
    pub(crate) leafs: Vec<&'t [u32]>,
}

impl<'t> ReusableData<'t> {
    pub fn new() -> Self {
        Self { leafs: Vec::new() }
    }
}

/// Several descriptors describing one logical feature
pub trait MultiDescriptor<D> {
    /// The `index`-th descriptor, `None` past the end
    fn descriptor(&self, index: usize) -> Option<&D>;
}

impl<D> MultiDescriptor<D> for [D] {
    fn descriptor(&self, index: usize) -> Option<&D> {
        self.get(index)
    }
}

impl<D> MultiDescriptor<D> for Vec<D> {
    fn descriptor(&self, index: usize) -> Option<&D> {
        self.get(index)
    }
}

impl<D, const N: usize> MultiDescriptor<D> for [D; N] {
    fn descriptor(&self, index: usize) -> Option<&D> {
        self.get(index)
    }
}

/// Several multi-descriptors describing one logical feature
pub trait MultiDescriptorGroup<D> {
    type Multi: MultiDescriptor<D> + ?Sized;

    /// The `index`-th multi-descriptor, `None` past the end
    fn multi_descriptor(&self, index: usize) -> Option<&Self::Multi>;
}

impl<D, G: MultiDescriptor<D>> MultiDescriptorGroup<D> for [G] {
    type Multi = G;

    fn multi_descriptor(&self, index: usize) -> Option<&G> {
        self.get(index)
    }
}

impl<D, G: MultiDescriptor<D>> MultiDescriptorGroup<D> for Vec<G> {
    type Multi = G;

    fn multi_descriptor(&self, index: usize) -> Option<&G> {
        self.get(index)
    }
}

/// Iterate the descriptors of a multi-descriptor in order
pub(crate) fn descriptors<'a, D: 'a, Q>(multi: &'a Q) -> impl Iterator<Item = &'a D>
where
    Q: MultiDescriptor<D> + ?Sized,
{
    (0..).map_while(move |i| multi.descriptor(i))
}

/// Keep `candidate` if it is strictly better than `best`
#[inline]
pub(crate) fn keep_better<T: DistanceValue>(best: &mut Match<T>, candidate: Match<T>) {
    if candidate.distance < best.distance {
        *best = candidate;
    }
}

/// Match `count` queries, reporting those within `max_distance`.
///
/// Runs on the calling thread for small batches or a serial executor.
/// Otherwise every task owns its scratch data and result buffer and merges
/// into the shared result under one lock.
pub(crate) fn batch_match<'t, T, F>(
    count: usize,
    max_distance: T,
    executor: &dyn Executor,
    match_one: F,
) -> Matches<T>
where
    T: DistanceValue,
    F: Fn(usize, &mut ReusableData<'t>) -> Match<T> + Sync,
{
    let match_range = |range: Range<usize>, out: &mut Matches<T>| {
        let mut reusable = ReusableData::new();
        for query in range {
            let found = match_one(query, &mut reusable);
            if found.is_valid() && found.distance <= max_distance {
                out.push(found.with_query_index(query as u32));
            }
        }
    };

    if count < MIN_QUERIES_PER_TASK || !executor.is_parallel() {
        let mut matches = Vec::with_capacity(count);
        match_range(0..count, &mut matches);
        return matches;
    }

    let matches = Mutex::new(Vec::with_capacity(count));
    executor.execute(0..count, MIN_QUERIES_PER_TASK, &|range: Range<usize>| {
        let mut local = Vec::with_capacity(range.len());
        match_range(range, &mut local);
        matches.lock().extend(local);
    });
    matches.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{RayonExecutor, SerialExecutor};

    #[test]
    fn test_multi_descriptor_impls() {
        let array = [1u8, 2, 3];
        let vec = vec![4u8, 5];
        let slice: &[u8] = &array[1..];

        assert_eq!(descriptors(&array).copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(descriptors(&vec).copied().collect::<Vec<_>>(), vec![4, 5]);
        assert_eq!(descriptors(slice).copied().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(MultiDescriptor::<u8>::descriptor(&vec, 2), None);
    }

    #[test]
    fn test_group_impls() {
        let group = vec![vec![1u8], vec![2, 3]];
        let second = MultiDescriptorGroup::<u8>::multi_descriptor(&group, 1).unwrap();
        assert_eq!(second.descriptor(1), Some(&3));
        assert!(MultiDescriptorGroup::<u8>::multi_descriptor(&group, 2).is_none());
    }

    fn fake_match(query: usize, _: &mut ReusableData<'_>) -> Match<u32> {
        if query % 3 == 0 {
            Match::invalid()
        } else {
            Match::new(query as u32 * 2, 0, (query % 10) as u32)
        }
    }

    #[test]
    fn test_batch_filters_and_tags_queries() {
        let matches = batch_match(10, 5u32, &SerialExecutor, fake_match);
        let queries: Vec<u32> = matches.iter().map(|m| m.query_index).collect();
        assert_eq!(queries, vec![1, 2, 4, 5]);
        assert!(matches.iter().all(|m| m.candidate_index == m.query_index * 2));
    }

    #[test]
    fn test_batch_parallel_same_set() {
        let serial = batch_match(1000, 7u32, &SerialExecutor, fake_match);
        let pool = RayonExecutor::with_threads(4).unwrap();
        let mut parallel = batch_match(1000, 7u32, &pool, fake_match);
        parallel.sort_by_key(|m| m.query_index);
        assert_eq!(serial, parallel);
    }
}
