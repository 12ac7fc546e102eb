//! Closed Catmull-Rom curves through contour control points.
//!
//! A contour boundary is the uniform Catmull-Rom spline passing through every control
//! point, closed by wrapping indices. [`sample_closed_curve`] turns it into the dense
//! polygon used by containment tests and distance queries.
use glam::Vec2;

/// Evaluate the uniform Catmull-Rom segment between `p1` and `p2` at `t` in `[0, 1]`.
#[inline]
pub fn catmull_rom(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, t: f32) -> Vec2 {
    let t2 = t * t;
    let t3 = t2 * t;

    let h0 = -0.5 * t3 + t2 - 0.5 * t;
    let h1 = 1.5 * t3 - 2.5 * t2 + 1.0;
    let h2 = -1.5 * t3 + 2.0 * t2 + 0.5 * t;
    let h3 = 0.5 * t3 - 0.5 * t2;

    p0 * h0 + p1 * h1 + p2 * h2 + p3 * h3
}

/// Sample the closed curve through `control_points` with `samples_per_segment` points
/// per control segment.
///
/// Every control point appears in the output exactly (at `t = 0` of its segment).
/// Fewer than three control points cannot form a closed curve; they are returned as-is.
pub fn sample_closed_curve(control_points: &[Vec2], samples_per_segment: usize) -> Vec<Vec2> {
    let n = control_points.len();
    if n < 3 {
        return control_points.to_vec();
    }

    let per_segment = samples_per_segment.max(1);
    let mut out = Vec::with_capacity(n * per_segment);
    for i in 0..n {
        let p0 = control_points[(i + n - 1) % n];
        let p1 = control_points[i];
        let p2 = control_points[(i + 1) % n];
        let p3 = control_points[(i + 2) % n];
        out.push(p1);
        for s in 1..per_segment {
            let t = s as f32 / per_segment as f32;
            out.push(catmull_rom(p0, p1, p2, p3, t));
        }
    }
    out
}
