// kernel.rs — Gaussian offset/weight tables for the blur passes.
//
// A table lists one-sided taps: entry 0 is the centre, entries 1.. are
// applied mirrored (+offset and −offset share the weight). The offsets are
// non-integer on purpose: with bilinear filtering a single fetch at a
// fractional offset blends two texels, so five fetches cover a much wider
// footprint than five integer taps would.
//
//   5-tap:  0   1.43   3.35   5.26   7.17
//            ●    ●      ●      ●      ●        (×2 mirrored, minus centre)
//
//   9-tap:  0 .72 1.43 2 3.35 4 5.26 6 7.17
//
// Both tables satisfy  w[0] + 2·Σ w[1..] ≈ 1  so a blur preserves the mean.

use serde::{Deserialize, Serialize};

/// Quality tier of the directional blurs. Selects the kernel table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GaussQuality {
    /// 5 taps per side.
    Original,
    /// 9 taps per side: the 5-tap footprint with interleaved midpoints.
    #[default]
    Extended,
}

/// An immutable (offsets, weights) pair. Mirrored taps share `weights[i]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelTable {
    pub offsets: &'static [f32],
    pub weights: &'static [f32],
}

pub const KERNEL_5: KernelTable = KernelTable {
    offsets: &[0.0, 1.4347826, 3.3478260, 5.2608695, 7.1739130],
    weights: &[0.16818994, 0.27276957, 0.11690125, 0.024067905, 0.0021112196],
};

// Each non-centre 5-tap weight is split evenly across the two 9-tap entries
// that straddle it, which keeps the table normalized. Giving all nine
// entries the full 5-tap weights would sum to ~1.83 and brighten the blurred
// flare by about 1.8x, so the halved values here are intentional.
pub const KERNEL_9: KernelTable = KernelTable {
    offsets: &[0.0, 0.7173913, 1.4347826, 2.0, 3.3478260, 4.0, 5.2608695, 6.0, 7.1739130],
    weights: &[
        0.16818994,
        0.136384785,
        0.136384785,
        0.058450625,
        0.058450625,
        0.0120339525,
        0.0120339525,
        0.0010556098,
        0.0010556098,
    ],
};

impl KernelTable {
    /// Table for a quality tier.
    pub const fn for_quality(quality: GaussQuality) -> KernelTable {
        match quality {
            GaussQuality::Original => KERNEL_5,
            GaussQuality::Extended => KERNEL_9,
        }
    }

    /// Number of entries (centre included).
    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Sum over the full mirrored footprint: `w[0] + 2·Σ w[1..]`.
    pub fn total_weight(&self) -> f32 {
        self.weights[0] + 2.0 * self.weights[1..].iter().sum::<f32>()
    }

    /// Iterate `(offset, weight)` over the first `taps` entries.
    pub fn taps(&self, taps: usize) -> impl Iterator<Item = (f32, f32)> + '_ {
        let n = taps.min(self.len());
        self.offsets[..n].iter().copied().zip(self.weights[..n].iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_normalized() {
        for t in [KERNEL_5, KERNEL_9] {
            assert_eq!(t.offsets.len(), t.weights.len());
            assert!((t.total_weight() - 1.0).abs() < 1e-3, "sum = {}", t.total_weight());
        }
    }

    #[test]
    fn test_extended_pairs_sum_to_original() {
        assert_eq!(KERNEL_9.weights[0], KERNEL_5.weights[0]);
        for k in 1..KERNEL_5.len() {
            let pair = KERNEL_9.weights[2 * k - 1] + KERNEL_9.weights[2 * k];
            assert!((pair - KERNEL_5.weights[k]).abs() < 1e-7, "k = {k}: {pair}");
        }
    }

    #[test]
    fn test_offsets_increasing() {
        for t in [KERNEL_5, KERNEL_9] {
            assert_eq!(t.offsets[0], 0.0);
            assert!(t.offsets.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_quality_lookup() {
        assert_eq!(KernelTable::for_quality(GaussQuality::Original).len(), 5);
        assert_eq!(KernelTable::for_quality(GaussQuality::Extended).len(), 9);
        assert_eq!(GaussQuality::default(), GaussQuality::Extended);
    }

    #[test]
    fn test_taps_truncates() {
        let v: Vec<_> = KERNEL_5.taps(2).collect();
        assert_eq!(v, vec![(0.0, 0.16818994), (1.4347826, 0.27276957)]);
        assert_eq!(KERNEL_5.taps(99).count(), 5);
    }
}
