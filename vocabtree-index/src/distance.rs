//! # Descriptor Distance Functions
//!
//! Distance metrics between descriptors, resolved at compile time through
//! the `DescriptorDistance` trait bound.
//!
//! ## Supported Metrics
//! - `Hamming`: number of differing bits between binary descriptors
//! - `SquaredEuclidean`: sum of squared differences between float descriptors
//! - `FnDistance`: any caller-provided closure
//!
//! ## Implementation Strategy
//! Hamming distances are computed eight bytes at a time with `count_ones`.
//! Squared Euclidean distances dispatch at runtime to AVX2+FMA when the CPU
//! supports it and fall back to a scalar loop otherwise.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use vocabtree_core::{DistanceValue, MatchingMode};

/// Distance between two descriptors of type `D`.
///
/// Implementations must be cheap to call and free of side effects; the tree
/// calls them from several threads at once.
pub trait DescriptorDistance<D>: Send + Sync {
    /// Scalar type of the distance
    type Distance: DistanceValue;

    /// Distance between two descriptors
    fn distance(&self, a: &D, b: &D) -> Self::Distance;

    /// Tolerance used by the good-leafs matching modes.
    ///
    /// Returns zero for every other mode.
    fn good_leafs_epsilon(&self, mode: MatchingMode) -> Self::Distance;
}

/// Hamming distance for binary descriptors stored as byte arrays
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hamming;

impl<const N: usize> DescriptorDistance<[u8; N]> for Hamming {
    type Distance = u32;

    #[inline]
    fn distance(&self, a: &[u8; N], b: &[u8; N]) -> u32 {
        hamming_distance(a, b)
    }

    fn good_leafs_epsilon(&self, mode: MatchingMode) -> u32 {
        let bits = (N * 8) as u32;
        match mode {
            // 1% and 2% of the descriptor's bit count, rounded
            MatchingMode::AllGoodLeafs1 => (bits + 50) / 100,
            MatchingMode::AllGoodLeafs2 => (bits * 2 + 50) / 100,
            MatchingMode::FirstBestLeaf | MatchingMode::AllBestLeafs => 0,
        }
    }
}

/// Squared Euclidean (L2²) distance for float descriptors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SquaredEuclidean;

impl<const N: usize> DescriptorDistance<[f32; N]> for SquaredEuclidean {
    type Distance = f32;

    #[inline]
    fn distance(&self, a: &[f32; N], b: &[f32; N]) -> f32 {
        l2_distance_squared(a, b)
    }

    fn good_leafs_epsilon(&self, mode: MatchingMode) -> f32 {
        match mode {
            MatchingMode::AllGoodLeafs1 => 0.25,
            MatchingMode::AllGoodLeafs2 => 0.5,
            MatchingMode::FirstBestLeaf | MatchingMode::AllBestLeafs => 0.0,
        }
    }
}

/// Distance backed by a caller-provided function.
///
/// ```
/// use vocabtree_index::{DescriptorDistance, FnDistance};
///
/// let manhattan = FnDistance::new(|a: &[i32; 2], b: &[i32; 2]| {
///     a.iter().zip(b).map(|(x, y)| x.abs_diff(*y)).sum::<u32>()
/// });
/// let d = DescriptorDistance::<[i32; 2]>::distance(&manhattan, &[0, 0], &[3, -4]);
/// assert_eq!(d, 7);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FnDistance<F, T> {
    func: F,
    good_leafs: [T; 2],
}

impl<F, T: DistanceValue> FnDistance<F, T> {
    /// Wrap `func`; the good-leafs tolerances default to zero
    pub fn new(func: F) -> Self {
        Self {
            func,
            good_leafs: [T::ZERO; 2],
        }
    }

    /// Set the tolerances used by `AllGoodLeafs1` and `AllGoodLeafs2`
    pub fn with_good_leafs_epsilons(mut self, one_percent: T, two_percent: T) -> Self {
        self.good_leafs = [one_percent, two_percent];
        self
    }
}

impl<D, F, T> DescriptorDistance<D> for FnDistance<F, T>
where
    F: Fn(&D, &D) -> T + Send + Sync,
    T: DistanceValue,
{
    type Distance = T;

    #[inline]
    fn distance(&self, a: &D, b: &D) -> T {
        (self.func)(a, b)
    }

    fn good_leafs_epsilon(&self, mode: MatchingMode) -> T {
        match mode {
            MatchingMode::AllGoodLeafs1 => self.good_leafs[0],
            MatchingMode::AllGoodLeafs2 => self.good_leafs[1],
            MatchingMode::FirstBestLeaf | MatchingMode::AllBestLeafs => T::ZERO,
        }
    }
}

/// Number of differing bits between two byte strings of equal length
#[inline]
pub fn hamming_distance(a: &[u8], b: &[u8]) -> u32 {
    debug_assert_eq!(a.len(), b.len());

    let mut distance = 0u32;
    let mut a_chunks = a.chunks_exact(8);
    let mut b_chunks = b.chunks_exact(8);

    for (x, y) in (&mut a_chunks).zip(&mut b_chunks) {
        distance += (load_u64(x) ^ load_u64(y)).count_ones();
    }

    for (x, y) in a_chunks.remainder().iter().zip(b_chunks.remainder()) {
        distance += (x ^ y).count_ones();
    }

    distance
}

#[inline]
fn load_u64(bytes: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(bytes);
    u64::from_ne_bytes(word)
}

/// Compute L2 (Euclidean) distance squared
#[inline]
pub fn l2_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    #[cfg(target_arch = "x86_64")]
    {
        if a.len() >= 8 && is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
            return unsafe { l2_squared_avx2_fma(a, b) };
        }
    }

    l2_squared_scalar(a, b)
}

#[inline]
fn l2_squared_scalar(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

// ============================================================================
// AVX2 + FMA implementation (256-bit, 8 floats at a time)
// ============================================================================

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn l2_squared_avx2_fma(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    let chunks = n / 8;

    let mut sum = _mm256_setzero_ps();

    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    for i in 0..chunks {
        let offset = i * 8;
        let va = _mm256_loadu_ps(a_ptr.add(offset));
        let vb = _mm256_loadu_ps(b_ptr.add(offset));
        let diff = _mm256_sub_ps(va, vb);
        sum = _mm256_fmadd_ps(diff, diff, sum);
    }

    // Horizontal sum: fold high lane onto low, then 4 -> 1
    let high = _mm256_extractf128_ps(sum, 1);
    let low = _mm256_castps256_ps128(sum);
    let sum128 = _mm_add_ps(high, low);
    let shuf = _mm_movehdup_ps(sum128);
    let sums = _mm_add_ps(sum128, shuf);
    let shuf = _mm_movehl_ps(sums, sums);
    let sums = _mm_add_ss(sums, shuf);
    let mut result = _mm_cvtss_f32(sums);

    let base = chunks * 8;
    for i in base..n {
        let d = a[i] - b[i];
        result += d * d;
    }

    result
}
