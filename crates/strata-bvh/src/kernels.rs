//! Per-thread kernel bodies shared by compute devices.
//!
//! Each function computes what one invocation of a pass writes, given read-only
//! views of its inputs.

use std::sync::atomic::{AtomicU32, Ordering};

use glam::Vec3;
use strata_math::Aabb;

/// Sort key: Morton code, ties broken by primitive index.
pub fn sort_key(code: u32, index: u32) -> u64 {
    ((code as u64) << 32) | index as u64
}

/// Length of the common prefix of the keys at `i` and `j`, or -1 when `j` is out
/// of range. Equal codes fall back to comparing indices so every key is distinct.
pub fn common_prefix(codes: &[u32], i: usize, j: i64) -> i32 {
    if j < 0 || j >= codes.len() as i64 {
        return -1;
    }
    let j = j as usize;
    let (a, b) = (codes[i], codes[j]);
    if a == b {
        32 + (i as u32 ^ j as u32).leading_zeros() as i32
    } else {
        (a ^ b).leading_zeros() as i32
    }
}

/// Children of internal node `i` over `codes` (sorted, one per leaf).
///
/// Returned indices use the node layout: internal nodes `[0, n - 1)`, leaves
/// `[n - 1, 2n - 1)`.
pub fn internal_children(codes: &[u32], i: usize) -> (u32, u32) {
    let n = codes.len() as i64;
    let ii = i as i64;
    let delta = |j: i64| common_prefix(codes, i, j);

    // Direction of the range: toward the neighbor sharing the longer prefix.
    let d: i64 = if delta(ii + 1) > delta(ii - 1) { 1 } else { -1 };
    let delta_min = delta(ii - d);

    let mut l_max: i64 = 2;
    while delta(ii + l_max * d) > delta_min {
        l_max *= 2;
    }
    let mut l = 0;
    let mut t = l_max / 2;
    while t >= 1 {
        if delta(ii + (l + t) * d) > delta_min {
            l += t;
        }
        t /= 2;
    }
    let j = ii + l * d;

    let delta_node = delta(j);
    let mut s = 0;
    let mut div = 2;
    loop {
        let t = (l + div - 1) / div;
        if delta(ii + (s + t) * d) > delta_node {
            s += t;
        }
        if t <= 1 {
            break;
        }
        div *= 2;
    }
    let gamma = ii + s * d + d.min(0);

    let leaf_base = n - 1;
    let left = if ii.min(j) == gamma {
        leaf_base + gamma
    } else {
        gamma
    };
    let right = if ii.max(j) == gamma + 1 {
        leaf_base + gamma + 1
    } else {
        gamma + 1
    };
    (left as u32, right as u32)
}

/// Stable partition of one segment on `bit`: clear bits first.
pub fn split_on_bit(
    bit: u32,
    src_codes: &[u32],
    src_indices: &[u32],
    dst_codes: &mut [u32],
    dst_indices: &mut [u32],
) {
    let zeros = src_codes.iter().filter(|&&c| (c >> bit) & 1 == 0).count();
    let (mut lo, mut hi) = (0, zeros);
    for (&code, &index) in src_codes.iter().zip(src_indices) {
        let slot = if (code >> bit) & 1 == 0 {
            lo += 1;
            lo - 1
        } else {
            hi += 1;
            hi - 1
        };
        dst_codes[slot] = code;
        dst_indices[slot] = index;
    }
}

/// Order `codes[a]`/`codes[b]` (with their indices) ascending by [`sort_key`].
pub fn compare_exchange(codes: &mut [u32], indices: &mut [u32], a: usize, b: usize) {
    if sort_key(codes[a], indices[a]) > sort_key(codes[b], indices[b]) {
        codes.swap(a, b);
        indices.swap(a, b);
    }
}

/// One bitonic step over a single `window`-long block whose two halves are sorted
/// (first step) or over a `2 * stride` block (later steps).
pub fn bitonic_step(codes: &mut [u32], indices: &mut [u32], window: usize, stride: usize) {
    if stride == window / 2 {
        for k in 0..stride {
            compare_exchange(codes, indices, k, window - 1 - k);
        }
    } else {
        for k in 0..stride {
            compare_exchange(codes, indices, k, k + stride);
        }
    }
}

/// Mean of the three corners.
pub fn centroid(triangle: &[Vec3; 3]) -> Vec3 {
    (triangle[0] + triangle[1] + triangle[2]) / 3.0
}

/// An [`Aabb`] in atomically accessible f32 bit patterns.
pub struct AtomicAabb {
    bits: [AtomicU32; 6],
}

impl AtomicAabb {
    pub fn new(aabb: &Aabb) -> Self {
        let [a, b, c] = aabb.min.to_array().map(f32::to_bits);
        let [d, e, f] = aabb.max.to_array().map(f32::to_bits);
        Self {
            bits: [a, b, c, d, e, f].map(AtomicU32::new),
        }
    }

    pub fn load(&self, order: Ordering) -> Aabb {
        let v = |i: usize| f32::from_bits(self.bits[i].load(order));
        Aabb {
            min: Vec3::new(v(0), v(1), v(2)),
            max: Vec3::new(v(3), v(4), v(5)),
        }
    }

    pub fn store(&self, aabb: &Aabb, order: Ordering) {
        let values = [
            aabb.min.x, aabb.min.y, aabb.min.z, aabb.max.x, aabb.max.y, aabb.max.z,
        ];
        for (cell, v) in self.bits.iter().zip(values) {
            cell.store(v.to_bits(), order);
        }
    }
}
