use std::sync::Arc;
use std::time::Duration;

use contour_tiles::prelude::*;
use contour_tiles_examples::{init_tracing, render_heights_to_png, RenderConfig};
use glam::Vec2;
use tracing::info;

/// A unit walking in a circle; it announces the area it will query soon.
struct Walker {
    center: Vec2,
    radius: f32,
    angle: f32,
}

impl Walker {
    fn position(&self) -> Vec2 {
        self.center + Vec2::new(self.angle.cos(), self.angle.sin()) * self.radius
    }
}

impl ForecastSource for Walker {
    fn query_forecast(&self) -> Option<QueryForecast> {
        let ahead = self.center
            + Vec2::new((self.angle + 0.3).cos(), (self.angle + 0.3).sin()) * self.radius;
        let area = Aabb::from_points(&[self.position(), ahead])?.expanded(16.0);
        Some(QueryForecast::new(area, 200.0))
    }
}

fn terrain() -> TerrainDefinition {
    let mut definition = TerrainDefinition::new(-10.0);
    let centers = [
        Vec2::new(-300.0, 0.0),
        Vec2::new(250.0, 150.0),
        Vec2::new(0.0, -350.0),
    ];
    for (i, center) in centers.into_iter().enumerate() {
        for level in 0..4 {
            let radius = 180.0 - level as f32 * 40.0 - i as f32 * 10.0;
            definition.push(Contour::circle(center, radius, 14, level as f32 * 5.0));
        }
    }
    definition
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let device = Arc::new(ParallelDevice::new(4)?);
    let mut cache = HeightFieldCache::new(CacheConfig::default(), device)?;
    cache.set_field_definition(terrain())?;

    let mut walkers = vec![
        Walker {
            center: Vec2::new(-300.0, 0.0),
            radius: 120.0,
            angle: 0.0,
        },
        Walker {
            center: Vec2::new(250.0, 150.0),
            radius: 90.0,
            angle: 1.0,
        },
    ];

    let frames = 240;
    for frame in 0..frames {
        let t = frame as f32 / frames as f32;
        // Zoom in, then back out, while panning across the map.
        let zoom = 0.5 + 5.0 * (t * std::f32::consts::PI).sin();
        let center = Vec2::new(-400.0 + 800.0 * t, 100.0 * (t * 6.0).sin());
        let viewport = Aabb::from_center_extent(center, Vec2::splat(600.0 / zoom));

        for walker in &mut walkers {
            walker.angle += 0.05;
        }
        let sources: Vec<&dyn ForecastSource> =
            walkers.iter().map(|w| w as &dyn ForecastSource).collect();
        let input = FrameInput::new(viewport, zoom)
            .with_time(frame as f32 / 60.0)
            .with_forecasts(HeightFieldCache::gather_forecasts(&sources));
        let dispatched = cache.tick(&input);

        for walker in &walkers {
            let _ = cache.height_at_point(walker.position());
        }

        if frame == frames / 2 {
            cache.add_contour(Contour::circle(Vec2::new(400.0, -300.0), 80.0, 10, 12.0))?;
            info!("Frame {}: added a contour, terrain now v{}", frame, cache.version());
        }
        if frame % 40 == 0 {
            let stats = cache.stats();
            info!(
                "Frame {}: zoom {:.2}, level {}, dispatched {}, ready {}, in flight {}, discarded {}",
                frame,
                zoom,
                cache.lod().active_level(),
                dispatched,
                stats.ready,
                stats.in_flight,
                stats.discarded
            );
        }
        std::thread::sleep(Duration::from_millis(2));
    }

    // Tile samples where available; CPU fallback shows through elsewhere.
    let domain = Aabb::from_center_extent(Vec2::ZERO, Vec2::splat(1200.0));
    let rc = RenderConfig::new((600, 600), domain).with_isolines(5.0);
    render_heights_to_png(
        |p| cache.tile_sample(p).unwrap_or(f32::NAN),
        &rc,
        "tiles-camera-flythrough-tiles.png",
    )?;
    render_heights_to_png(
        |p| cache.height_at_point(p),
        &rc,
        "tiles-camera-flythrough.png",
    )?;
    Ok(())
}
