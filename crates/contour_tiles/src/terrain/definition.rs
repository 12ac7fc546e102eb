//! Terrain definitions: the persisted list of contours plus a default depth.
//!
//! With the `serde` feature a definition serializes as
//! `{ contours: [{ controlPoints: [[x, y], ...], height }], defaultDepth }`; the `ron`
//! feature adds loading from RON text or files.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::geometry::polygon;
use crate::terrain::contour::{Contour, SampledContour};

/// Contours and the value used far away from all of them.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TerrainDefinition {
    pub contours: Vec<Contour>,
    pub default_depth: f32,
}

impl TerrainDefinition {
    pub fn new(default_depth: f32) -> Self {
        Self {
            contours: Vec::new(),
            default_depth,
        }
    }

    /// Append a contour, builder style.
    pub fn with_contour(mut self, contour: Contour) -> Self {
        self.contours.push(contour);
        self
    }

    pub fn push(&mut self, contour: Contour) -> &mut Self {
        self.contours.push(contour);
        self
    }

    pub fn len(&self) -> usize {
        self.contours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    /// Parse a definition from RON text.
    #[cfg(feature = "ron")]
    pub fn from_ron_str(text: &str) -> crate::error::Result<Self> {
        ron::from_str(text).map_err(|e| crate::error::Error::Parse(e.to_string()))
    }

    /// Read and parse a RON definition file.
    #[cfg(feature = "ron")]
    pub fn from_ron_file(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }
}

/// Problems found by the one-time validation pass over a definition.
///
/// None of these block tree construction; containment between intersecting
/// contours is best effort.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Contours with fewer than three control points.
    pub degenerate: Vec<usize>,
    /// Contours whose sampled boundary crosses itself.
    pub self_intersecting: Vec<usize>,
    /// Pairs `(a, b)` with `a < b` whose sampled boundaries cross.
    pub intersecting_pairs: Vec<(usize, usize)>,
}

impl ValidationReport {
    /// Inspect sampled contours for degenerate, self-intersecting and crossing boundaries.
    pub fn inspect(contours: &[SampledContour]) -> Self {
        let mut report = Self::default();

        for (i, c) in contours.iter().enumerate() {
            if c.degenerate {
                report.degenerate.push(i);
            } else if polygon::self_intersects(&c.points) {
                report.self_intersecting.push(i);
            }
        }

        for a in 0..contours.len() {
            let ca = &contours[a];
            let Some(bounds_a) = ca.bounds.filter(|_| !ca.degenerate) else {
                continue;
            };
            for (b, cb) in contours.iter().enumerate().skip(a + 1) {
                if cb.degenerate {
                    continue;
                }
                let Some(bounds_b) = cb.bounds else {
                    continue;
                };
                if !bounds_a.intersects(&bounds_b) {
                    continue;
                }
                if polygon::polygons_intersect(&ca.points, &cb.points) {
                    report.intersecting_pairs.push((a, b));
                }
            }
        }

        report
    }

    pub fn is_clean(&self) -> bool {
        self.degenerate.is_empty()
            && self.self_intersecting.is_empty()
            && self.intersecting_pairs.is_empty()
    }

    /// Emit one warning per issue.
    pub fn log(&self) {
        for i in &self.degenerate {
            warn!("Contour {} has fewer than 3 control points.", i);
        }
        for i in &self.self_intersecting {
            warn!("Contour {} intersects itself; containment is best effort.", i);
        }
        for (a, b) in &self.intersecting_pairs {
            warn!(
                "Contours {} and {} intersect; their containment is undefined.",
                a, b
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::terrain::contour::SamplingConfig;

    fn sampled(def: &TerrainDefinition) -> Vec<SampledContour> {
        let sampling = SamplingConfig::default();
        def.contours
            .iter()
            .map(|c| SampledContour::from_contour(c, &sampling))
            .collect()
    }

    #[test]
    fn nested_definition_is_clean() {
        let def = TerrainDefinition::new(-10.0)
            .with_contour(Contour::circle(Vec2::ZERO, 100.0, 16, 0.0))
            .with_contour(Contour::circle(Vec2::ZERO, 40.0, 16, 5.0));
        let report = ValidationReport::inspect(&sampled(&def));
        assert!(report.is_clean(), "{report:?}");
    }

    #[test]
    fn reports_every_kind_of_issue() {
        // Control points visited in pentagram order; the smooth curve crosses itself.
        let star = Contour::new(
            (0..5)
                .map(|k| {
                    let a = (k * 2) as f32 / 5.0 * std::f32::consts::TAU;
                    Vec2::new(200.0, 200.0) + Vec2::new(a.cos(), a.sin()) * 20.0
                })
                .collect(),
            1.0,
        );
        let def = TerrainDefinition::new(0.0)
            .with_contour(Contour::circle(Vec2::ZERO, 10.0, 12, 1.0))
            .with_contour(Contour::circle(Vec2::new(12.0, 0.0), 10.0, 12, 2.0))
            .with_contour(Contour::new(vec![Vec2::ZERO], 3.0))
            .with_contour(star);

        let report = ValidationReport::inspect(&sampled(&def));
        assert_eq!(report.degenerate, vec![2]);
        assert_eq!(report.self_intersecting, vec![3]);
        assert_eq!(report.intersecting_pairs, vec![(0, 1)]);
        assert!(!report.is_clean());
    }

    #[cfg(feature = "ron")]
    #[test]
    fn loads_camel_case_ron() {
        let text = r#"(
            contours: [
                (controlPoints: [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)], height: 4.0),
            ],
            defaultDepth: -3.0,
        )"#;
        let def = TerrainDefinition::from_ron_str(text).expect("parses");
        assert_eq!(def.len(), 1);
        assert_eq!(def.default_depth, -3.0);
        assert_eq!(def.contours[0].control_points[1], Vec2::new(10.0, 0.0));
    }
}
