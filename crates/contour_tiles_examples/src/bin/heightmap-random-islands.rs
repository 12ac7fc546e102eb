use std::sync::Arc;

use contour_tiles::prelude::*;
use contour_tiles_examples::{init_tracing, render_heights_to_png, RenderConfig};
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use tracing::info;

/// Wobbly closed contour around `center`.
fn blob(rng: &mut StdRng, center: Vec2, radius: f32, height: f32) -> Contour {
    let points = 10;
    let control_points = (0..points)
        .map(|i| {
            let a = i as f32 / points as f32 * std::f32::consts::TAU;
            let r = radius * (0.8 + 0.35 * rng.random::<f32>());
            center + Vec2::new(a.cos(), a.sin()) * r
        })
        .collect();
    Contour::new(control_points, height)
}

/// Islands with three to five nested levels each, rising 4 units per level.
fn random_archipelago(rng: &mut StdRng, islands: usize, extent: f32) -> TerrainDefinition {
    let mut definition = TerrainDefinition::new(-10.0);
    for _ in 0..islands {
        let center = Vec2::new(
            (rng.random::<f32>() - 0.5) * extent,
            (rng.random::<f32>() - 0.5) * extent,
        );
        let radius = 60.0 + 80.0 * rng.random::<f32>();
        let levels = 3 + (rng.random::<f32>() * 3.0) as usize;
        for level in 0..levels {
            let shrink = 1.0 - level as f32 / levels as f32;
            let offset = Vec2::new(rng.random::<f32>() - 0.5, rng.random::<f32>() - 0.5) * 10.0;
            definition.push(blob(
                rng,
                center + offset * level as f32,
                radius * shrink,
                level as f32 * 4.0,
            ));
        }
    }
    definition
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(7);
    let extent = 1000.0;
    let definition = random_archipelago(&mut rng, 6, extent * 0.7);

    let config = CacheConfig::new().with_height(
        HeightParams::default()
            .with_transition_distance(40.0)
            .with_hill_noise(Some(HillNoise::new(7, 1.5, 0.02))),
    );
    let mut cache = HeightFieldCache::new(config, Arc::new(InlineDevice::new()))?;
    let version = cache.set_field_definition(definition)?;
    let report = cache.validation_report();
    info!(
        "Terrain v{} with {} contours; clean: {}",
        version,
        cache.definition().len(),
        report.is_clean()
    );

    let domain = Aabb::from_center_extent(Vec2::ZERO, Vec2::splat(extent));
    let rc = RenderConfig::new((800, 800), domain).with_isolines(4.0);
    render_heights_to_png(
        |p| cache.height_at_point(p),
        &rc,
        "heightmap-random-islands.png",
    )?;
    Ok(())
}
