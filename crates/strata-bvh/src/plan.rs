//! The ordered list of data-parallel passes an LBVH build dispatches.
//!
//! Every pass reads only what earlier passes wrote, so a full barrier separates
//! each pair of consecutive passes.

use crate::{BvhError, morton};

/// Builder tuning.
#[derive(Clone, Debug, PartialEq)]
pub struct BvhConfig {
    /// AABBs folded per group in each reduction pass.
    pub reduction_group_size: u32,
    /// Segment length of the radix phase; power of two.
    pub sort_group_size: u32,
    /// Morton quantization per axis, 1 to 10.
    pub morton_bits_per_axis: u32,
    /// Check intermediate invariants (sorted codes) and fail with an error.
    pub validate: bool,
}

impl Default for BvhConfig {
    fn default() -> Self {
        Self {
            reduction_group_size: 512,
            sort_group_size: 512,
            morton_bits_per_axis: morton::MAX_BITS_PER_AXIS,
            validate: cfg!(debug_assertions),
        }
    }
}

impl BvhConfig {
    pub fn validate_config(&self) -> Result<(), BvhError> {
        if self.reduction_group_size < 2 {
            return Err(BvhError::InvalidConfig("reduction_group_size must be at least 2"));
        }
        if self.sort_group_size < 2 || !self.sort_group_size.is_power_of_two() {
            return Err(BvhError::InvalidConfig(
                "sort_group_size must be a power of two and at least 2",
            ));
        }
        if !(1..=morton::MAX_BITS_PER_AXIS).contains(&self.morton_bits_per_axis) {
            return Err(BvhError::InvalidConfig("morton_bits_per_axis must be in 1..=10"));
        }
        Ok(())
    }

    /// Radix passes of the segment sort, derived from the widest code.
    pub fn sort_bits(&self) -> u32 {
        morton::sort_pass_count(morton::max_code(self.morton_bits_per_axis))
    }
}

/// One dispatch. `threads` is the number of kernel invocations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pass {
    /// AABB and centroid per primitive.
    PrimitiveBounds { threads: u32 },
    /// Fold `input` boxes into `groups` boxes, one thread per group.
    ReduceBounds { input: u32, groups: u32 },
    /// Morton code per padded slot; padding slots get `u32::MAX`.
    MortonCodes { threads: u32 },
    /// Stable split on `bit` inside each sort segment.
    SegmentSort { bit: u32, threads: u32 },
    /// One compare-exchange step of merging runs into sorted `window`s.
    /// The first step of a window (`stride == window / 2`) compares mirrored pairs.
    BitonicMerge { window: u32, stride: u32, threads: u32 },
    /// One leaf per sorted primitive.
    InitLeaves { threads: u32 },
    /// Karras split search, one thread per internal node.
    BuildInternal { threads: u32 },
    /// Leaf-to-root bounds propagation gated by per-node arrival counters.
    PropagateBounds { threads: u32 },
}

/// Pass sequence for a given primitive count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassPlan {
    primitive_count: u32,
    padded_count: u32,
    passes: Vec<Pass>,
}

impl PassPlan {
    pub fn new(primitive_count: u32, config: &BvhConfig) -> Self {
        let p = primitive_count;
        let padded = p.max(1).next_power_of_two();
        let mut passes = vec![Pass::PrimitiveBounds { threads: p }];

        let group = config.reduction_group_size.max(2);
        let mut input = p;
        loop {
            let groups = input.div_ceil(group);
            passes.push(Pass::ReduceBounds { input, groups });
            input = groups;
            if groups <= 1 {
                break;
            }
        }

        passes.push(Pass::MortonCodes { threads: padded });
        for bit in 0..config.sort_bits() {
            passes.push(Pass::SegmentSort {
                bit,
                threads: padded,
            });
        }
        let mut window = config.sort_group_size.saturating_mul(2);
        while window <= padded {
            let mut stride = window / 2;
            while stride >= 1 {
                passes.push(Pass::BitonicMerge {
                    window,
                    stride,
                    threads: padded / 2,
                });
                stride /= 2;
            }
            let Some(next) = window.checked_mul(2) else {
                break;
            };
            window = next;
        }

        passes.push(Pass::InitLeaves { threads: p });
        if p > 1 {
            passes.push(Pass::BuildInternal { threads: p - 1 });
        }
        passes.push(Pass::PropagateBounds { threads: p });

        Self {
            primitive_count: p,
            padded_count: padded,
            passes,
        }
    }

    pub fn primitive_count(&self) -> u32 {
        self.primitive_count
    }

    /// Length of the sort buffers: the primitive count rounded up to a power of two.
    pub fn padded_count(&self) -> u32 {
        self.padded_count
    }

    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    /// Barriers between consecutive passes.
    pub fn barrier_count(&self) -> usize {
        self.passes.len().saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(reduction: u32, sort: u32) -> BvhConfig {
        BvhConfig {
            reduction_group_size: reduction,
            sort_group_size: sort,
            ..Default::default()
        }
    }

    fn count(plan: &PassPlan, f: impl Fn(&Pass) -> bool) -> usize {
        plan.passes().iter().filter(|p| f(*p)).count()
    }

    #[test]
    fn test_reduction_group_counts() {
        let plan = PassPlan::new(300_000, &config(512, 512));
        let reductions: Vec<_> = plan
            .passes()
            .iter()
            .filter_map(|p| match p {
                Pass::ReduceBounds { input, groups } => Some((*input, *groups)),
                _ => None,
            })
            .collect();
        // 300000 -> 586 -> 2 -> 1
        assert_eq!(reductions, vec![(300_000, 586), (586, 2), (2, 1)]);
    }

    #[test]
    fn test_single_group_reduces_once() {
        let plan = PassPlan::new(7, &config(512, 512));
        assert_eq!(count(&plan, |p| matches!(p, Pass::ReduceBounds { .. })), 1);
    }

    #[test]
    fn test_segment_sort_pass_count() {
        let plan = PassPlan::new(100, &BvhConfig::default());
        assert_eq!(count(&plan, |p| matches!(p, Pass::SegmentSort { .. })), 30);
        let coarse = BvhConfig {
            morton_bits_per_axis: 5,
            ..Default::default()
        };
        let plan = PassPlan::new(100, &coarse);
        assert_eq!(count(&plan, |p| matches!(p, Pass::SegmentSort { .. })), 15);
    }

    #[test]
    fn test_bitonic_windows_and_strides() {
        // 20 primitives pad to 32; segments of 4 merge through windows 8, 16, 32.
        let plan = PassPlan::new(20, &config(512, 4));
        assert_eq!(plan.padded_count(), 32);
        let merges: Vec<_> = plan
            .passes()
            .iter()
            .filter_map(|p| match p {
                Pass::BitonicMerge { window, stride, threads } => {
                    assert_eq!(*threads, 16);
                    Some((*window, *stride))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            merges,
            vec![
                (8, 4),
                (8, 2),
                (8, 1),
                (16, 8),
                (16, 4),
                (16, 2),
                (16, 1),
                (32, 16),
                (32, 8),
                (32, 4),
                (32, 2),
                (32, 1)
            ]
        );
    }

    #[test]
    fn test_no_merge_when_one_segment() {
        let plan = PassPlan::new(300, &config(512, 512));
        assert_eq!(count(&plan, |p| matches!(p, Pass::BitonicMerge { .. })), 0);
    }

    #[test]
    fn test_internal_threads_and_ordering() {
        let plan = PassPlan::new(10, &BvhConfig::default());
        let tail = &plan.passes()[plan.passes().len() - 3..];
        assert_eq!(
            tail,
            &[
                Pass::InitLeaves { threads: 10 },
                Pass::BuildInternal { threads: 9 },
                Pass::PropagateBounds { threads: 10 },
            ]
        );
        assert_eq!(plan.passes()[0], Pass::PrimitiveBounds { threads: 10 });
        assert_eq!(plan.barrier_count(), plan.passes().len() - 1);
    }

    #[test]
    fn test_single_primitive_skips_internal_pass() {
        let plan = PassPlan::new(1, &BvhConfig::default());
        assert_eq!(count(&plan, |p| matches!(p, Pass::BuildInternal { .. })), 0);
    }

    #[test]
    fn test_config_validation() {
        assert!(BvhConfig::default().validate_config().is_ok());
        assert!(config(1, 512).validate_config().is_err());
        assert!(config(512, 100).validate_config().is_err());
        let bad_bits = BvhConfig {
            morton_bits_per_axis: 11,
            ..Default::default()
        };
        assert!(bad_bits.validate_config().is_err());
    }
}
