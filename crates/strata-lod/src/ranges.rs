//! Distance bands per LOD level and the morph intervals derived from them.

use crate::CdlodSettings;

/// Pulls the morph end slightly toward the start so morphing completes just
/// before the band boundary.
const ERROR_FUDGE: f32 = 0.01;

/// Smallest morph interval handed to the morph-factor division.
const MIN_MORPH_SPAN: f32 = 1e-4;

/// LOD distance bands and morph intervals, indexed by LOD level (0 = coarsest).
///
/// The bands split `[near, far]` in a geometric progression: the finest level gets
/// the narrowest band closest to the camera and each coarser band is
/// `lod_distance_ratio` times wider. Tables are only recomputed when `near`/`far`
/// change.
#[derive(Clone, Debug)]
pub struct LodRanges {
    lod_distance_ratio: f32,
    morph_start_ratio: f32,
    near: f32,
    far: f32,
    lod_range: Vec<f32>,
    morph_start: Vec<f32>,
    morph_end: Vec<f32>,
}

impl LodRanges {
    /// Empty tables; the first [`LodRanges::update`] fills them.
    pub fn new(settings: &CdlodSettings) -> Self {
        let count = settings.lod_count as usize;
        Self {
            lod_distance_ratio: settings.lod_distance_ratio,
            morph_start_ratio: settings.morph_start_ratio,
            near: f32::NAN,
            far: f32::NAN,
            lod_range: vec![0.0; count],
            morph_start: vec![0.0; count],
            morph_end: vec![0.0; count],
        }
    }

    /// Recompute the tables if `near`/`far` differ from the last call.
    ///
    /// Returns `true` when the tables were rebuilt. Invalid planes (non-finite,
    /// negative, or `far <= near`) leave the previous tables in place.
    pub fn update(&mut self, near: f32, far: f32) -> bool {
        if near == self.near && far == self.far {
            return false;
        }
        if !near.is_finite() || !far.is_finite() || near < 0.0 || far <= near {
            tracing::warn!(near, far, "Ignoring invalid clip distances for LOD ranges");
            return false;
        }

        let count = self.lod_range.len();
        let ratio = self.lod_distance_ratio;

        let mut total = 0.0;
        let mut detail = 1.0;
        for _ in 0..count {
            total += detail;
            detail *= ratio;
        }
        let section = (far - near) / total;

        let mut prev = near;
        let mut detail = 1.0;
        for level in (0..count).rev() {
            self.lod_range[level] = prev + section * detail;
            prev = self.lod_range[level];
            detail *= ratio;
        }
        // Accumulated rounding must not move the outermost band off the far plane.
        self.lod_range[0] = far;

        let mut prev = near;
        for level in (0..count).rev() {
            let end = self.lod_range[level];
            let start = prev + (end - prev) * self.morph_start_ratio;
            self.morph_end[level] = end;
            self.morph_start[level] = start;
            prev = start;
        }

        self.near = near;
        self.far = far;
        tracing::debug!(near, far, ranges = ?self.lod_range, "Recomputed LOD ranges");
        true
    }

    pub fn lod_count(&self) -> usize {
        self.lod_range.len()
    }

    /// Outer distance at which `level` hands over to its parent.
    pub fn lod_range(&self, level: usize) -> f32 {
        self.lod_range[level]
    }

    /// All bands, coarsest first.
    pub fn lod_ranges(&self) -> &[f32] {
        &self.lod_range
    }

    /// `(morph_start, morph_end)` for `level`.
    pub fn morph_range(&self, level: usize) -> (f32, f32) {
        (self.morph_start[level], self.morph_end[level])
    }

    /// `(end / (end - start), 1 / (end - start))` for `level`, the two constants of
    /// the linear vertex-morph blend. Always finite.
    pub fn morph_factors(&self, level: usize) -> (f32, f32) {
        let start = self.morph_start[level];
        let end = self.morph_end[level];
        let end = end + (start - end) * ERROR_FUDGE;
        let span = (end - start).max(MIN_MORPH_SPAN);
        (end / span, 1.0 / span)
    }

    /// The `(near, far)` pair the tables were last built for.
    pub fn clip_distances(&self) -> (f32, f32) {
        (self.near, self.far)
    }
}
