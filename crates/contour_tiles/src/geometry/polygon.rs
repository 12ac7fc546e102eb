//! Polygon primitives over sampled contour boundaries.
//!
//! Polygons are closed implicitly: the last point connects back to the first.
//! Containment uses the non-zero winding rule, distances are unsigned minimum
//! point-to-segment distances, and [`signed_distance`] is negative inside.
use glam::Vec2;

/// Signed crossing test of `p` against the infinite line through `a` and `b`.
/// Positive when `p` is left of `a -> b`.
#[inline]
fn is_left(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b - a).perp_dot(p - a)
}

/// Winding number of `polygon` around `p`. Zero means outside.
pub fn winding_number(polygon: &[Vec2], p: Vec2) -> i32 {
    let n = polygon.len();
    if n < 3 {
        return 0;
    }

    let mut wn = 0;
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];
        if a.y <= p.y {
            if b.y > p.y && is_left(a, b, p) > 0.0 {
                wn += 1;
            }
        } else if b.y <= p.y && is_left(a, b, p) < 0.0 {
            wn -= 1;
        }
    }
    wn
}

/// `true` if `p` lies inside `polygon` under the non-zero winding rule.
#[inline]
pub fn contains_point(polygon: &[Vec2], p: Vec2) -> bool {
    winding_number(polygon, p) != 0
}

/// Distance from `p` to the segment `a..b`.
#[inline]
pub fn point_segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Minimum distance from `p` to the closed boundary of `polygon`.
///
/// Polygons with fewer than three points are measured as open polylines
/// (a single point measures as point distance). Empty input yields infinity.
pub fn boundary_distance(polygon: &[Vec2], p: Vec2) -> f32 {
    match polygon.len() {
        0 => f32::INFINITY,
        1 => p.distance(polygon[0]),
        2 => point_segment_distance(p, polygon[0], polygon[1]),
        n => {
            let mut best = f32::INFINITY;
            for i in 0..n {
                let d = point_segment_distance(p, polygon[i], polygon[(i + 1) % n]);
                if d < best {
                    best = d;
                }
            }
            best
        }
    }
}

/// Boundary distance of `p`, negated when `p` is inside `polygon`.
pub fn signed_distance(polygon: &[Vec2], p: Vec2) -> f32 {
    let d = boundary_distance(polygon, p);
    if contains_point(polygon, p) {
        -d
    } else {
        d
    }
}

/// Shoelace signed area; positive for counter-clockwise polygons.
pub fn signed_area(polygon: &[Vec2]) -> f32 {
    let n = polygon.len();
    if n < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    for i in 0..n {
        acc += polygon[i].perp_dot(polygon[(i + 1) % n]);
    }
    acc * 0.5
}

/// Absolute enclosed area.
pub fn area(polygon: &[Vec2]) -> f32 {
    signed_area(polygon).abs()
}

fn on_segment(a: Vec2, b: Vec2, p: Vec2) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// `true` if the closed segments `a1..a2` and `b1..b2` share at least one point.
pub fn segments_intersect(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> bool {
    let d1 = is_left(b1, b2, a1);
    let d2 = is_left(b1, b2, a2);
    let d3 = is_left(a1, a2, b1);
    let d4 = is_left(a1, a2, b2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(b1, b2, a1))
        || (d2 == 0.0 && on_segment(b1, b2, a2))
        || (d3 == 0.0 && on_segment(a1, a2, b1))
        || (d4 == 0.0 && on_segment(a1, a2, b2))
}

/// `true` if any edge of closed polygon `a` touches any edge of closed polygon `b`.
pub fn polygons_intersect(a: &[Vec2], b: &[Vec2]) -> bool {
    let (na, nb) = (a.len(), b.len());
    if na < 2 || nb < 2 {
        return false;
    }
    for i in 0..na {
        let (a1, a2) = (a[i], a[(i + 1) % na]);
        let (amin, amax) = (a1.min(a2), a1.max(a2));
        for j in 0..nb {
            let (b1, b2) = (b[j], b[(j + 1) % nb]);
            if b1.max(b2).x < amin.x
                || b1.min(b2).x > amax.x
                || b1.max(b2).y < amin.y
                || b1.min(b2).y > amax.y
            {
                continue;
            }
            if segments_intersect(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    false
}

/// `true` if two non-adjacent edges of the closed polygon cross or touch.
pub fn self_intersects(polygon: &[Vec2]) -> bool {
    let n = polygon.len();
    if n < 4 {
        return false;
    }
    for i in 0..n {
        let (a1, a2) = (polygon[i], polygon[(i + 1) % n]);
        for j in (i + 2)..n {
            // The last edge is adjacent to the first one.
            if i == 0 && j == n - 1 {
                continue;
            }
            let (b1, b2) = (polygon[j], polygon[(j + 1) % n]);
            if segments_intersect(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    false
}
