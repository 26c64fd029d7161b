//! # Vocabulary Forest
//!
//! Several independently clustered trees over the same candidate set.
//! A query is matched against every tree and the overall best match wins,
//! trading query time for recall.

use std::time::Instant;

use rand::Rng;
use tracing::info;

use vocabtree_core::error::{Error, Result};
use vocabtree_core::{Match, MatchingMode, Parameters};

use crate::distance::DescriptorDistance;
use crate::executor::Executor;
use crate::matching::{keep_better, ReusableData};
use crate::mean::ClusterMean;
use crate::traits::VocabularyIndex;
use crate::tree::{validate_input, VocabularyTree};

/// Ensemble of vocabulary trees borrowing the same candidates for `'a`
pub struct VocabularyForest<'a, D, M> {
    trees: Vec<VocabularyTree<'a, D, M>>,
}

impl<'a, D, M> VocabularyForest<'a, D, M>
where
    D: Clone + Send + Sync,
    M: DescriptorDistance<D> + Clone,
{
    /// Build `number_trees` trees one after another.
    ///
    /// Every tree consumes randomness from `rng`, so the trees differ even
    /// though they share parameters.
    ///
    /// # Panics
    ///
    /// Panics if `number_trees` is zero or `candidates` is empty.
    pub fn new<C, R>(
        number_trees: usize,
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
        assert!(number_trees >= 1, "vocabulary forest needs at least one tree");

        let start = Instant::now();
        let trees = (0..number_trees)
            .map(|_| VocabularyTree::new(candidates, metric.clone(), mean, params, executor, rng))
            .collect();

        info!(
            "Built vocabulary forest: {} trees over {} descriptors in {:?}",
            number_trees,
            candidates.len(),
            start.elapsed()
        );

        Self { trees }
    }

    /// Validate the input, then build a forest
    pub fn try_new<C, R>(
        number_trees: usize,
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
        if number_trees == 0 {
            return Err(Error::EmptyForest);
        }
        validate_input(candidates.len(), &params)?;
        Ok(Self::new(number_trees, candidates, metric, mean, params, executor, rng))
    }

    pub fn trees(&self) -> &[VocabularyTree<'a, D, M>] {
        &self.trees
    }

    pub fn candidates(&self) -> &'a [D] {
        self.trees[0].candidates()
    }

    /// Best match over all trees; the first tree wins ties
    pub fn match_descriptor<'t>(
        &'t self,
        query: &D,
        mode: MatchingMode,
        reusable: &mut ReusableData<'t>,
    ) -> Match<M::Distance> {
        let mut best = Match::invalid();
        for tree in &self.trees {
            keep_better(&mut best, tree.match_descriptor(query, mode, reusable));
        }
        best
    }
}

impl<'a, D, M> VocabularyIndex<D> for VocabularyForest<'a, D, M>
where
    D: Clone + Send + Sync,
    M: DescriptorDistance<D> + Clone,
{
    type Distance = M::Distance;

    fn match_descriptor<'t>(
        &'t self,
        query: &D,
        mode: MatchingMode,
        reusable: &mut ReusableData<'t>,
    ) -> Match<M::Distance> {
        VocabularyForest::match_descriptor(self, query, mode, reusable)
    }
}

impl<'a, D: std::fmt::Debug, M: std::fmt::Debug> std::fmt::Debug for VocabularyForest<'a, D, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VocabularyForest").field("trees", &self.trees).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Hamming;
    use crate::executor::SerialExecutor;
    use crate::mean::BinaryMajorityMean;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn random_descriptors(count: usize, rng: &mut StdRng) -> Vec<[u8; 32]> {
        (0..count).map(|_| rng.gen()).collect()
    }

    #[test]
    fn test_forest_dominates_trees() {
        let mut rng = StdRng::seed_from_u64(21);
        let candidates = random_descriptors(800, &mut rng);
        let queries = random_descriptors(50, &mut rng);

        let forest = VocabularyForest::new(
            3,
            &candidates,
            Hamming,
            &BinaryMajorityMean,
            Parameters::default(),
            &SerialExecutor,
            &mut rng,
        );
        assert_eq!(forest.trees().len(), 3);

        let mut reusable = ReusableData::new();
        for query in &queries {
            let best = forest.match_descriptor(query, MatchingMode::FirstBestLeaf, &mut reusable);
            assert!(best.is_valid());
            for tree in forest.trees() {
                let single = tree.match_descriptor(query, MatchingMode::FirstBestLeaf, &mut reusable);
                assert!(best.distance <= single.distance);
            }
        }
    }

    #[test]
    fn test_try_new_rejects_zero_trees() {
        let candidates = [[0u8; 32]; 4];
        let mut rng = StdRng::seed_from_u64(0);
        let err = VocabularyForest::try_new(
            0,
            &candidates,
            Hamming,
            &BinaryMajorityMean,
            Parameters::default(),
            &SerialExecutor,
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, Error::EmptyForest));
    }
}
