//! # Cluster Means
//!
//! Computes the center of every cluster after an assignment pass.
//!
//! - `BinaryMajorityMean`: per bit position, the majority vote of the members
//!   (ties round up)
//! - `FloatAverageMean`: element-wise arithmetic mean
//!
//! An empty cluster yields the all-zero descriptor. A singleton cluster
//! reproduces its only member exactly.

/// Strategy computing one mean descriptor per cluster.
pub trait ClusterMean<D>: Send + Sync {
    /// Mean of every cluster.
    ///
    /// `cluster_of[i]` is the cluster of `candidates[indices[i]]`; the result
    /// has exactly `clusters` entries.
    fn cluster_means(
        &self,
        clusters: usize,
        candidates: &[D],
        indices: &[u32],
        cluster_of: &[u32],
    ) -> Vec<D>;
}

/// Bit `k` of byte `v` is `BIT_SEPARATION[v][k]`
static BIT_SEPARATION: [[u8; 8]; 256] = build_bit_separation();

const fn build_bit_separation() -> [[u8; 8]; 256] {
    let mut table = [[0u8; 8]; 256];
    let mut value = 0;
    while value < 256 {
        let mut bit = 0;
        while bit < 8 {
            table[value][bit] = ((value >> bit) & 1) as u8;
            bit += 1;
        }
        value += 1;
    }
    table
}

/// Majority-vote mean for binary descriptors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinaryMajorityMean;

impl<const N: usize> ClusterMean<[u8; N]> for BinaryMajorityMean {
    fn cluster_means(
        &self,
        clusters: usize,
        candidates: &[[u8; N]],
        indices: &[u32],
        cluster_of: &[u32],
    ) -> Vec<[u8; N]> {
        debug_assert_eq!(indices.len(), cluster_of.len());

        let bits = N * 8;
        let mut bit_sums = vec![0u32; clusters * bits];
        let mut counts = vec![0u32; clusters];

        for (&index, &cluster) in indices.iter().zip(cluster_of) {
            let cluster = cluster as usize;
            let descriptor = &candidates[index as usize];
            let sums = &mut bit_sums[cluster * bits..(cluster + 1) * bits];

            for (byte, byte_sums) in descriptor.iter().zip(sums.chunks_exact_mut(8)) {
                for (sum, &bit) in byte_sums.iter_mut().zip(&BIT_SEPARATION[*byte as usize]) {
                    *sum += bit as u32;
                }
            }
            counts[cluster] += 1;
        }

        counts
            .iter()
            .zip(bit_sums.chunks_exact(bits.max(1)))
            .map(|(&count, sums)| {
                let mut mean = [0u8; N];
                if count == 0 {
                    return mean;
                }
                let half = count / 2;
                for (byte, byte_sums) in mean.iter_mut().zip(sums.chunks_exact(8)) {
                    for (bit, &sum) in byte_sums.iter().enumerate() {
                        if (sum + half) / count != 0 {
                            *byte |= 1 << bit;
                        }
                    }
                }
                mean
            })
            .collect()
    }
}

/// Arithmetic mean for float descriptors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FloatAverageMean;

impl<const N: usize> ClusterMean<[f32; N]> for FloatAverageMean {
    fn cluster_means(
        &self,
        clusters: usize,
        candidates: &[[f32; N]],
        indices: &[u32],
        cluster_of: &[u32],
    ) -> Vec<[f32; N]> {
        debug_assert_eq!(indices.len(), cluster_of.len());

        let mut means = vec![[0.0f32; N]; clusters];
        let mut counts = vec![0u32; clusters];

        for (&index, &cluster) in indices.iter().zip(cluster_of) {
            let mean = &mut means[cluster as usize];
            for (m, v) in mean.iter_mut().zip(&candidates[index as usize]) {
                *m += v;
            }
            counts[cluster as usize] += 1;
        }

        for (mean, &count) in means.iter_mut().zip(&counts) {
            if count != 0 {
                let inv = 1.0 / count as f32;
                for m in mean.iter_mut() {
                    *m *= inv;
                }
            }
        }

        means
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_separation_table() {
        assert_eq!(BIT_SEPARATION[0], [0; 8]);
        assert_eq!(BIT_SEPARATION[255], [1; 8]);
        assert_eq!(BIT_SEPARATION[0b1000_0101], [1, 0, 1, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_binary_majority() {
        let candidates = [[0b0000_0111u8, 0xFF], [0b0000_0011, 0x00], [0b0000_0001, 0x00]];
        let means = BinaryMajorityMean.cluster_means(1, &candidates, &[0, 1, 2], &[0, 0, 0]);
        assert_eq!(means, vec![[0b0000_0011, 0x00]]);
    }

    #[test]
    fn test_binary_tie_rounds_up() {
        let candidates = [[0xF0u8], [0x0F]];
        let means = BinaryMajorityMean.cluster_means(1, &candidates, &[0, 1], &[0, 0]);
        assert_eq!(means, vec![[0xFF]]);
    }

    #[test]
    fn test_binary_singleton_and_empty() {
        let candidates = [[0xA5u8, 0x3C, 0x01], [0x00, 0x00, 0x00]];
        let means = BinaryMajorityMean.cluster_means(3, &candidates, &[0], &[1]);
        assert_eq!(means[0], [0, 0, 0]);
        assert_eq!(means[1], candidates[0]);
        assert_eq!(means[2], [0, 0, 0]);
    }

    #[test]
    fn test_float_average() {
        let candidates = [[1.0f32, 2.0], [3.0, 6.0], [10.0, -1.0]];
        let means = FloatAverageMean.cluster_means(2, &candidates, &[0, 1, 2], &[0, 0, 1]);
        assert_eq!(means[0], [2.0, 4.0]);
        assert_eq!(means[1], [10.0, -1.0]);
    }

    #[test]
    fn test_float_singleton_identity() {
        let candidates = [[0.1f32, -7.3, 1e-9, 123.456]];
        let means = FloatAverageMean.cluster_means(2, &candidates, &[0], &[0]);
        assert_eq!(means[0], candidates[0]);
        assert_eq!(means[1], [0.0; 4]);
    }
}
