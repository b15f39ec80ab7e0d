//! Procedural heightmap synthesis using multi-octave fractal Brownian motion.
//!
//! Used when no heightmap file is configured: the fBm field is sampled once per
//! raster cell and quantized to 8 bits.

use noise::{NoiseFn, Simplex};

use crate::{HeightRaster, RasterError};

/// Configuration for multi-octave fBm noise.
#[derive(Clone, Debug)]
pub struct HeightmapParams {
    /// Seed for deterministic generation.
    pub seed: u64,
    /// Number of noise octaves to composite.
    pub octaves: u32,
    /// Frequency multiplier between successive octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between successive octaves.
    pub persistence: f64,
    /// Frequency of the first octave, in cycles per raster sample.
    pub base_frequency: f64,
    /// Amplitude of the first octave.
    pub amplitude: f64,
}

impl Default for HeightmapParams {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 6,
            lacunarity: 2.0,
            persistence: 0.5,
            base_frequency: 1.0 / 256.0,
            amplitude: 1.0,
        }
    }
}

/// Samples fractal Brownian motion over simplex noise.
pub struct HeightmapSampler {
    noise: Simplex,
    params: HeightmapParams,
}

impl HeightmapSampler {
    pub fn new(params: HeightmapParams) -> Self {
        let noise = Simplex::new(params.seed as u32);
        Self { noise, params }
    }

    /// Sample the field at a 2D coordinate. Output lies in
    /// `[-max_amplitude, +max_amplitude]`.
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let mut total = 0.0;
        let mut frequency = self.params.base_frequency;
        let mut amplitude = self.params.amplitude;

        for _ in 0..self.params.octaves {
            total += self.noise.get([x * frequency, y * frequency]) * amplitude;
            frequency *= self.params.lacunarity;
            amplitude *= self.params.persistence;
        }

        total
    }

    /// Geometric sum of all octave amplitudes.
    pub fn max_amplitude(&self) -> f64 {
        let mut sum = 0.0;
        let mut amp = self.params.amplitude;
        for _ in 0..self.params.octaves {
            sum += amp;
            amp *= self.params.persistence;
        }
        sum
    }

    pub fn params(&self) -> &HeightmapParams {
        &self.params
    }
}

/// Fill a `width × height` raster from the fBm field, mapping
/// `[-max_amplitude, +max_amplitude]` onto `[0, 255]`.
pub fn synthesize_raster(
    sampler: &HeightmapSampler,
    width: u32,
    height: u32,
) -> Result<HeightRaster, RasterError> {
    let max_amp = sampler.max_amplitude();
    let raster = HeightRaster::from_fn(width, height, |x, y| {
        let raw = sampler.sample(x as f64, y as f64);
        let normalized = if max_amp > 0.0 {
            ((raw / max_amp) + 1.0) * 0.5
        } else {
            0.5
        };
        (normalized.clamp(0.0, 1.0) * 255.0).round() as u8
    })?;
    tracing::debug!(
        width,
        height,
        seed = sampler.params().seed,
        "Synthesized heightmap"
    );
    Ok(raster)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_raster() {
        let a = HeightmapSampler::new(HeightmapParams {
            seed: 42,
            ..Default::default()
        });
        let b = HeightmapSampler::new(HeightmapParams {
            seed: 42,
            ..Default::default()
        });
        assert_eq!(
            synthesize_raster(&a, 32, 32).unwrap(),
            synthesize_raster(&b, 32, 32).unwrap()
        );
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = HeightmapSampler::new(HeightmapParams {
            seed: 1,
            ..Default::default()
        });
        let b = HeightmapSampler::new(HeightmapParams {
            seed: 999,
            ..Default::default()
        });
        assert_ne!(
            synthesize_raster(&a, 64, 64).unwrap(),
            synthesize_raster(&b, 64, 64).unwrap()
        );
    }

    #[test]
    fn test_sample_within_max_amplitude() {
        let sampler = HeightmapSampler::new(HeightmapParams::default());
        let max_amp = sampler.max_amplitude();
        for x in 0..50 {
            for y in 0..50 {
                let h = sampler.sample(x as f64 * 7.0, y as f64 * 7.0);
                assert!(h.abs() <= max_amp + 1e-9, "{h} exceeds {max_amp}");
            }
        }
    }

    #[test]
    fn test_max_amplitude_calculation() {
        let sampler = HeightmapSampler::new(HeightmapParams {
            amplitude: 1000.0,
            persistence: 0.5,
            octaves: 4,
            ..Default::default()
        });
        assert!((sampler.max_amplitude() - 1875.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_amplitude_gives_mid_gray() {
        let sampler = HeightmapSampler::new(HeightmapParams {
            amplitude: 0.0,
            ..Default::default()
        });
        let raster = synthesize_raster(&sampler, 4, 4).unwrap();
        assert!(raster.samples().iter().all(|&s| s == 128));
    }

    #[test]
    fn test_synthesized_raster_has_variation() {
        let sampler = HeightmapSampler::new(HeightmapParams {
            seed: 7,
            ..Default::default()
        });
        let raster = synthesize_raster(&sampler, 128, 128).unwrap();
        let min = raster.samples().iter().min().unwrap();
        let max = raster.samples().iter().max().unwrap();
        assert!(max > min, "expected elevation variation, got flat {min}");
    }
}
