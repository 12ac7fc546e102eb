use std::path::Path;

use contour_tiles::geometry::Aabb;
use glam::Vec2;
use image::{ImageBuffer, Rgb, RgbImage};
use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber; `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Maps heights to colors: water below zero, land from lowland green to snow.
#[derive(Clone, Copy, Debug)]
pub struct HeightRamp {
    pub deepest: f32,
    pub highest: f32,
}

impl Default for HeightRamp {
    fn default() -> Self {
        Self {
            deepest: -10.0,
            highest: 20.0,
        }
    }
}

impl HeightRamp {
    /// Magenta marks non-finite heights.
    pub fn color(&self, h: f32) -> [u8; 3] {
        if !h.is_finite() {
            return [255, 0, 255];
        }
        if h < 0.0 {
            let t = (h / self.deepest.min(-f32::EPSILON)).clamp(0.0, 1.0);
            return mix([90, 160, 220], [10, 40, 110], t);
        }
        let t = (h / self.highest.max(f32::EPSILON)).clamp(0.0, 1.0);
        if t < 0.5 {
            mix([70, 150, 70], [150, 120, 70], t * 2.0)
        } else {
            mix([150, 120, 70], [245, 245, 245], (t - 0.5) * 2.0)
        }
    }
}

fn mix(a: [u8; 3], b: [u8; 3], t: f32) -> [u8; 3] {
    let lerp = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    [lerp(a[0], b[0]), lerp(a[1], b[1]), lerp(a[2], b[2])]
}

#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub image_size: (u32, u32),
    /// World rectangle mapped onto the image; +y points up.
    pub domain: Aabb,
    pub ramp: HeightRamp,
    /// Draw dark isolines every `n` height units.
    pub isoline_interval: Option<f32>,
}

impl RenderConfig {
    pub fn new(image_size: (u32, u32), domain: Aabb) -> Self {
        Self {
            image_size,
            domain,
            ramp: HeightRamp::default(),
            isoline_interval: None,
        }
    }

    pub fn with_ramp(mut self, ramp: HeightRamp) -> Self {
        self.ramp = ramp;
        self
    }

    pub fn with_isolines(mut self, interval: f32) -> Self {
        self.isoline_interval = Some(interval);
        self
    }

    fn world_at(&self, x: u32, y: u32) -> Vec2 {
        let (w, h) = self.image_size;
        let u = (x as f32 + 0.5) / w as f32;
        let v = 1.0 - (y as f32 + 0.5) / h as f32;
        self.domain.min + Vec2::new(u, v) * self.domain.size()
    }
}

/// Render `height(p)` over `config.domain` and write it as a PNG.
pub fn render_heights_to_png(
    height: impl Fn(Vec2) -> f32,
    config: &RenderConfig,
    path: impl AsRef<Path>,
) -> anyhow::Result<()> {
    let (w, h) = config.image_size;
    let heights: Vec<f32> = (0..h)
        .flat_map(|y| (0..w).map(move |x| (x, y)))
        .map(|(x, y)| height(config.world_at(x, y)))
        .collect();
    let at = |x: u32, y: u32| heights[(y * w + x) as usize];

    let img: RgbImage = ImageBuffer::from_fn(w, h, |x, y| {
        let value = at(x, y);
        if let Some(interval) = config.isoline_interval.filter(|_| value.is_finite()) {
            let band = |v: f32| (v / interval).floor();
            let right = at((x + 1).min(w - 1), y);
            let below = at(x, (y + 1).min(h - 1));
            if (right.is_finite() && band(value) != band(right))
                || (below.is_finite() && band(value) != band(below))
            {
                return Rgb([30, 30, 30]);
            }
        }
        Rgb(config.ramp.color(value))
    });

    img.save(path.as_ref())?;
    tracing::info!("Wrote {}", path.as_ref().display());
    Ok(())
}
