#![allow(dead_code)]
use std::time::Duration;

use contour_tiles::prelude::{Contour, TerrainDefinition};
use criterion::{Criterion, Throughput};
use glam::Vec2;

pub const SAMPLE_SIZE: usize = 20;
pub const WARM_UP: Duration = Duration::from_secs(1);
pub const MEASUREMENT_TIME: Duration = Duration::from_secs(2);

pub fn default_criterion() -> Criterion {
    Criterion::default()
        .configure_from_args()
        .sample_size(SAMPLE_SIZE)
        .warm_up_time(WARM_UP)
        .measurement_time(MEASUREMENT_TIME)
}

pub fn elements_throughput(elements: usize) -> Throughput {
    Throughput::Elements(elements.max(1) as u64)
}

/// `islands` hills on a row, each made of `rings` concentric contours.
pub fn island_chain(islands: usize, rings: usize) -> TerrainDefinition {
    let mut definition = TerrainDefinition::new(-10.0);
    for i in 0..islands {
        let center = Vec2::new(i as f32 * 250.0, 0.0);
        for r in 0..rings {
            let radius = 100.0 * (rings - r) as f32 / rings as f32;
            definition.push(Contour::circle(center, radius, 12, r as f32 * 5.0));
        }
    }
    definition
}
