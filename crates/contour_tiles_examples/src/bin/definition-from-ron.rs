use std::sync::Arc;

use contour_tiles::prelude::*;
use contour_tiles_examples::{init_tracing, render_heights_to_png, HeightRamp, RenderConfig};
use glam::Vec2;
use tracing::{info, warn};

const DEFINITION: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/lagoon.ron");
const CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/cache.ron");

fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = CacheConfig::from_ron_str(&std::fs::read_to_string(CONFIG)?)?;
    let definition = TerrainDefinition::from_ron_file(DEFINITION)?;
    info!("Loaded {} contours from {}", definition.len(), DEFINITION);

    let mut cache = HeightFieldCache::new(config, Arc::new(UnavailableDevice::new()))?;
    cache.set_field_definition(definition)?;
    if !cache.validation_report().is_clean() {
        warn!("Definition has issues: {:?}", cache.validation_report());
    }

    // No compute device: every query runs on the CPU evaluator.
    let dispatched = cache.tick(&FrameInput::new(
        Aabb::from_center_extent(Vec2::ZERO, Vec2::splat(400.0)),
        1.0,
    ));
    info!("Dispatched {} tiles without a device", dispatched);

    let domain = Aabb::from_center_extent(Vec2::ZERO, Vec2::splat(400.0));
    let rc = RenderConfig::new((600, 600), domain)
        .with_ramp(HeightRamp {
            deepest: -6.0,
            highest: 12.0,
        })
        .with_isolines(2.0);
    render_heights_to_png(|p| cache.height_at_point(p), &rc, "definition-from-ron.png")?;
    Ok(())
}
