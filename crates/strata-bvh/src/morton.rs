//! 3D Morton (Z-order) codes over a bounding box.

use glam::Vec3;
use strata_math::Aabb;

/// Widest per-axis quantization that still fits three axes into a `u32`.
pub const MAX_BITS_PER_AXIS: u32 = 10;

/// Spread the low 10 bits of `v` so two zero bits follow each one.
fn expand_bits(v: u32) -> u32 {
    let mut v = v & 0x3ff;
    v = v.wrapping_mul(0x0001_0001) & 0xff00_00ff;
    v = v.wrapping_mul(0x0000_0101) & 0x0f00_f00f;
    v = v.wrapping_mul(0x0000_0011) & 0xc30c_30c3;
    v = v.wrapping_mul(0x0000_0005) & 0x4924_9249;
    v
}

/// Interleave three quantized coordinates as `x₂y₂z₂…x₀y₀z₀`.
pub fn interleave(x: u32, y: u32, z: u32) -> u32 {
    (expand_bits(x) << 2) | (expand_bits(y) << 1) | expand_bits(z)
}

/// Morton code of `point` inside `bounds`, with `bits_per_axis` bits of resolution.
///
/// Points outside `bounds` clamp to its faces. Flat axes quantize to 0.
pub fn encode(point: Vec3, bounds: &Aabb, bits_per_axis: u32) -> u32 {
    let bits = bits_per_axis.clamp(1, MAX_BITS_PER_AXIS);
    let cells = (1u32 << bits) as f32;
    let extent = bounds.size();
    let quantize = |v: f32, lo: f32, len: f32| {
        if len > 0.0 {
            let t = ((v - lo) / len).clamp(0.0, 1.0);
            ((t * cells) as u32).min((1 << bits) - 1)
        } else {
            0
        }
    };
    interleave(
        quantize(point.x, bounds.min.x, extent.x),
        quantize(point.y, bounds.min.y, extent.y),
        quantize(point.z, bounds.min.z, extent.z),
    )
}

/// Largest code [`encode`] can produce at `bits_per_axis`.
pub fn max_code(bits_per_axis: u32) -> u32 {
    let bits = bits_per_axis.clamp(1, MAX_BITS_PER_AXIS);
    (1u32 << (3 * bits)) - 1
}

/// Number of one-bit radix passes needed to order codes up to `max_code`:
/// `ceil(log2(max_code + 1))`.
pub fn sort_pass_count(max_code: u32) -> u32 {
    u32::BITS - max_code.leading_zeros()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleave_bit_positions() {
        assert_eq!(interleave(1, 0, 0), 0b100);
        assert_eq!(interleave(0, 1, 0), 0b010);
        assert_eq!(interleave(0, 0, 1), 0b001);
        assert_eq!(interleave(2, 0, 0), 0b100_000);
        assert_eq!(interleave(0x3ff, 0x3ff, 0x3ff), (1 << 30) - 1);
    }

    #[test]
    fn test_encode_corners() {
        let b = Aabb::new(Vec3::ZERO, Vec3::splat(2.0));
        assert_eq!(encode(Vec3::ZERO, &b, 10), 0);
        assert_eq!(encode(Vec3::splat(2.0), &b, 10), max_code(10));
        assert_eq!(encode(Vec3::splat(-5.0), &b, 10), 0);
    }

    #[test]
    fn test_encode_flat_axis() {
        let b = Aabb::new(Vec3::new(0.0, 3.0, 0.0), Vec3::new(1.0, 3.0, 1.0));
        let code = encode(Vec3::new(1.0, 3.0, 0.0), &b, 10);
        assert_eq!(code, interleave(0x3ff, 0, 0));
    }

    #[test]
    fn test_sort_pass_count_derived_from_max() {
        assert_eq!(sort_pass_count(max_code(10)), 30);
        assert_eq!(sort_pass_count(max_code(4)), 12);
        assert_eq!(sort_pass_count(0), 0);
        assert_eq!(sort_pass_count(1), 1);
        assert_eq!(sort_pass_count(u32::MAX), 32);
    }
}
