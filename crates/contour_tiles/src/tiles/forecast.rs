//! Per-frame hints about where queries will land.
use crate::geometry::Aabb;

/// Expected number of point queries inside `aabb` this frame.
///
/// Advisory only: forecasts steer which tiles are materialized and are forgotten
/// after the frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueryForecast {
    pub aabb: Aabb,
    pub expected_query_count: f32,
}

impl QueryForecast {
    pub fn new(aabb: Aabb, expected_query_count: f32) -> Self {
        Self {
            aabb,
            expected_query_count,
        }
    }

    /// Forecasts with an empty area or no expected queries carry no information.
    pub fn is_meaningful(&self) -> bool {
        !self.aabb.is_degenerate()
            && self.expected_query_count.is_finite()
            && self.expected_query_count > 0.0
    }
}

/// Capability of a query consumer to announce its upcoming queries.
pub trait ForecastSource {
    /// This frame's forecast, or `None` when the consumer has nothing to announce.
    fn query_forecast(&self) -> Option<QueryForecast>;
}

impl<F: Fn() -> Option<QueryForecast>> ForecastSource for F {
    fn query_forecast(&self) -> Option<QueryForecast> {
        self()
    }
}

/// Collect forecasts from every consumer that provides one.
pub fn gather_forecasts(sources: &[&dyn ForecastSource]) -> Vec<QueryForecast> {
    sources
        .iter()
        .filter_map(|s| s.query_forecast())
        .collect()
}
