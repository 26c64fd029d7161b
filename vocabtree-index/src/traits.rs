//! # Vocabulary Index Trait
//!
//! Common interface for trees, forests and the exhaustive matcher.
//! Implementors provide single-descriptor matching; multi-descriptor and
//! batch matching are built on top of it.

use vocabtree_core::{Match, Matches, MatchingMode};

use crate::executor::Executor;
use crate::matching::{batch_match, descriptors, keep_better, MultiDescriptor, MultiDescriptorGroup, ReusableData};

/// Index answering best-match queries against a fixed candidate set
pub trait VocabularyIndex<D>: Sync
where
    D: Sync,
{
    /// Scalar distance type of the index's metric
    type Distance: vocabtree_core::DistanceValue;

    /// Best candidate for `query`; the invalid match if nothing was scanned.
    ///
    /// The returned match has query index 0.
    fn match_descriptor<'t>(
        &'t self,
        query: &D,
        mode: MatchingMode,
        reusable: &mut ReusableData<'t>,
    ) -> Match<Self::Distance>;

    /// Best candidate over all descriptors of a multi-descriptor
    fn match_multi_descriptor<'t, Q>(
        &'t self,
        multi: &Q,
        mode: MatchingMode,
        reusable: &mut ReusableData<'t>,
    ) -> Match<Self::Distance>
    where
        Q: MultiDescriptor<D> + ?Sized,
    {
        let mut best = Match::invalid();
        for descriptor in descriptors(multi) {
            keep_better(&mut best, self.match_descriptor(descriptor, mode, reusable));
        }
        best
    }

    /// Best candidate over all multi-descriptors of a group
    fn match_multi_descriptor_group<'t, G>(
        &'t self,
        group: &G,
        mode: MatchingMode,
        reusable: &mut ReusableData<'t>,
    ) -> Match<Self::Distance>
    where
        G: MultiDescriptorGroup<D> + ?Sized,
    {
        let mut best = Match::invalid();
        let mut index = 0;
        while let Some(multi) = group.multi_descriptor(index) {
            keep_better(&mut best, self.match_multi_descriptor(multi, mode, reusable));
            index += 1;
        }
        best
    }

    /// Match every query, reporting those within `max_distance`.
    ///
    /// The order of the result is unspecified when run in parallel.
    fn match_descriptors(
        &self,
        queries: &[D],
        max_distance: Self::Distance,
        mode: MatchingMode,
        executor: &dyn Executor,
    ) -> Matches<Self::Distance> {
        batch_match(queries.len(), max_distance, executor, |i, reusable| {
            self.match_descriptor(&queries[i], mode, reusable)
        })
    }

    /// Match every multi-descriptor, reporting those within `max_distance`
    fn match_multi_descriptors<Q>(
        &self,
        queries: &[Q],
        max_distance: Self::Distance,
        mode: MatchingMode,
        executor: &dyn Executor,
    ) -> Matches<Self::Distance>
    where
        Q: MultiDescriptor<D> + Sync,
    {
        batch_match(queries.len(), max_distance, executor, |i, reusable| {
            self.match_multi_descriptor(&queries[i], mode, reusable)
        })
    }

    /// Match every multi-descriptor group, reporting those within `max_distance`
    fn match_multi_descriptor_groups<G>(
        &self,
        groups: &[G],
        max_distance: Self::Distance,
        mode: MatchingMode,
        executor: &dyn Executor,
    ) -> Matches<Self::Distance>
    where
        G: MultiDescriptorGroup<D> + Sync,
    {
        batch_match(groups.len(), max_distance, executor, |i, reusable| {
            self.match_multi_descriptor_group(&groups[i], mode, reusable)
        })
    }
}
