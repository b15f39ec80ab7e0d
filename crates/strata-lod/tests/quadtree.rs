use glam::Vec3;
use strata_lod::{CdlodSettings, CdlodTree, LodRanges, Quadrant};
use strata_terrain::{HeightRaster, TerrainDimension};

fn hashed_raster(width: u32, height: u32) -> HeightRaster {
    HeightRaster::from_fn(width, height, |x, y| {
        let h = x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663);
        (h.wrapping_mul(2_654_435_761) >> 24) as u8
    })
    .unwrap()
}

fn build(width: u32, height: u32, leaf_size: u32, lod_count: u32) -> CdlodTree {
    let raster = hashed_raster(width, height);
    let dim = TerrainDimension::new(
        Vec3::ZERO,
        Vec3::new((width - 1) as f32, 50.0, (height - 1) as f32),
    );
    let settings = CdlodSettings {
        leaf_size,
        lod_count,
        ..Default::default()
    };
    CdlodTree::build(raster, dim, settings).unwrap()
}

#[test]
fn test_elevation_ranges_fold_children() {
    for &(w, h, leaf, lods) in &[(16, 16, 4, 3), (37, 21, 4, 4), (9, 70, 2, 5)] {
        let tree = build(w, h, leaf, lods);
        for node in tree.nodes() {
            if node.is_leaf() {
                let expected = tree.raster().elevation_range(node.rx, node.ry, node.size + 1);
                assert_eq!((node.min_z, node.max_z), expected);
            } else {
                let min = node.children().map(|c| tree.node(c).min_z).min().unwrap();
                let max = node.children().map(|c| tree.node(c).max_z).max().unwrap();
                assert_eq!((node.min_z, node.max_z), (min, max));
            }
        }
    }
}

#[test]
fn test_node_count_matches_closed_form() {
    for &(w, h, leaf, lods) in &[
        (16, 16, 8, 2),
        (20, 12, 4, 3),
        (100, 3, 2, 6),
        (1, 1, 2, 1),
        (129, 129, 8, 5),
    ] {
        let tree = build(w, h, leaf, lods);
        let settings = tree.settings();
        assert_eq!(tree.nodes().len(), settings.node_count(w, h), "{w}x{h}");
    }
}

#[test]
fn test_leaves_sit_at_finest_level() {
    let tree = build(48, 33, 4, 4);
    for node in tree.nodes() {
        assert_eq!(node.is_leaf(), node.lod_level == 3);
        assert_eq!(node.size, 4 << (3 - node.lod_level));
        for q in Quadrant::ALL {
            if let Some(child) = node.child(q) {
                let (x, y, half) = node.quadrant_rect(q);
                let c = tree.node(child);
                assert_eq!((c.rx, c.ry, c.size), (x, y, half));
            }
        }
    }
}

#[test]
fn test_lod_ranges_monotonic_for_positive_planes() {
    let settings = CdlodSettings::default();
    let mut ranges = LodRanges::new(&settings);
    for &(near, far) in &[(0.01, 0.02), (0.5, 10.0), (1.0, 4000.0), (100.0, 1.0e6)] {
        ranges.update(near, far);
        let r = ranges.lod_ranges();
        assert!(r.windows(2).all(|w| w[0] > w[1]), "{r:?}");
        for level in 0..settings.lod_count as usize {
            let (k0, k1) = ranges.morph_factors(level);
            assert!(k0.is_finite() && k1.is_finite());
        }
    }
}
