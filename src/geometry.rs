//! Shared 2D geometry kernel
//!
//! Points, segments, rectangles, polygon operations and the epsilon-tolerant
//! predicates every higher component relies on for coincidence tests. All
//! predicates are total: degenerate input yields a well-defined result, never
//! a panic. Callers reject zero-length segments before intersection tests.

use serde::{Deserialize, Serialize};

/// Default coincidence tolerance in scene units.
pub const DEFAULT_EPSILON: f64 = 1e-4;

/// Epsilon-tolerant scalar comparison.
pub fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() <= epsilon
}

/// A 2D point (also used as a vector).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// True when the two points are within `epsilon` of each other.
    pub fn coincident(&self, other: &Point, epsilon: f64) -> bool {
        self.distance(other) <= epsilon
    }
}

impl std::ops::Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// 2D cross product (z component of the 3D cross).
fn cross(a: Point, b: Point) -> f64 {
    a.x * b.y - a.y * b.x
}

/// A line segment between two points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub a: Point,
    pub b: Point,
}

impl Segment {
    pub fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }

    pub fn length(&self) -> f64 {
        self.a.distance(&self.b)
    }

    /// Point at parametric position `t` (0 = a, 1 = b).
    pub fn point_at(&self, t: f64) -> Point {
        self.a + (self.b - self.a) * t
    }

    pub fn is_degenerate(&self, epsilon: f64) -> bool {
        self.length() <= epsilon
    }
}

/// An axis-aligned rectangle, origin at the lower-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Corners in counter-clockwise order starting at the origin corner.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.x, self.y),
            Point::new(self.x + self.width, self.y),
            Point::new(self.x + self.width, self.y + self.height),
            Point::new(self.x, self.y + self.height),
        ]
    }
}

/// Result of a segment-segment intersection test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SegmentIntersection {
    /// No common point.
    None,
    /// Proper crossing: both parametric positions lie strictly inside (0, 1).
    Crossing { point: Point, t: f64, u: f64 },
    /// The segments touch at a single point with at least one endpoint
    /// involved (T-junction or shared endpoint).
    Touching { point: Point, t: f64, u: f64 },
    /// Collinear segments sharing more than a single point.
    CollinearOverlap,
}

/// Intersect two segments with an epsilon tolerance.
///
/// Parameter-space tolerances are scaled by segment length so that the same
/// scene-unit epsilon applies to segments of any size. Degenerate segments
/// must be rejected by the caller; here they report `None`.
pub fn intersect_segments(s1: &Segment, s2: &Segment, epsilon: f64) -> SegmentIntersection {
    let len1 = s1.length();
    let len2 = s2.length();
    if len1 <= epsilon || len2 <= epsilon {
        return SegmentIntersection::None;
    }

    let d1 = s1.b - s1.a;
    let d2 = s2.b - s2.a;
    let offset = s2.a - s1.a;
    let denom = cross(d1, d2);

    // Parallel when the normalized cross product vanishes.
    if denom.abs() <= epsilon * len1 * len2 {
        // Not collinear: parallel but offset, no intersection.
        if cross(d1, offset).abs() > epsilon * len1 {
            return SegmentIntersection::None;
        }
        // Collinear: project s2's endpoints onto s1's parameter space.
        let inv = 1.0 / (len1 * len1);
        let end_offset = s2.b - s1.a;
        let ta = (offset.x * d1.x + offset.y * d1.y) * inv;
        let tb = (end_offset.x * d1.x + end_offset.y * d1.y) * inv;
        let (lo, hi) = if ta < tb { (ta, tb) } else { (tb, ta) };
        let eps_t = epsilon / len1;
        if hi < -eps_t || lo > 1.0 + eps_t {
            return SegmentIntersection::None;
        }
        let overlap = hi.min(1.0) - lo.max(0.0);
        if overlap > eps_t {
            return SegmentIntersection::CollinearOverlap;
        }
        // Single shared point at one end.
        let t = lo.max(0.0).clamp(0.0, 1.0);
        let point = s1.point_at(t);
        let u = if point.coincident(&s2.a, epsilon) { 0.0 } else { 1.0 };
        return SegmentIntersection::Touching { point, t, u };
    }

    let t = cross(offset, d2) / denom;
    let u = cross(offset, d1) / denom;
    let eps_t = epsilon / len1;
    let eps_u = epsilon / len2;

    if t < -eps_t || t > 1.0 + eps_t || u < -eps_u || u > 1.0 + eps_u {
        return SegmentIntersection::None;
    }

    let point = s1.point_at(t.clamp(0.0, 1.0));
    let t_interior = t > eps_t && t < 1.0 - eps_t;
    let u_interior = u > eps_u && u < 1.0 - eps_u;

    if t_interior && u_interior {
        SegmentIntersection::Crossing { point, t, u }
    } else {
        SegmentIntersection::Touching {
            point,
            t: t.clamp(0.0, 1.0),
            u: u.clamp(0.0, 1.0),
        }
    }
}

/// Signed shoelace area of a closed polygon (positive for counter-clockwise).
pub fn polygon_signed_area(polygon: &[Point]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..polygon.len() {
        let a = polygon[i];
        let b = polygon[(i + 1) % polygon.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}

/// Absolute polygon area.
pub fn polygon_area(polygon: &[Point]) -> f64 {
    polygon_signed_area(polygon).abs()
}

/// Ray-cast point-in-polygon test. Points within `epsilon` of an edge count
/// as inside, so the predicate is stable under coordinate jitter.
pub fn point_in_polygon(point: &Point, polygon: &[Point], epsilon: f64) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    // Boundary check first.
    for i in 0..polygon.len() {
        let edge = Segment::new(polygon[i], polygon[(i + 1) % polygon.len()]);
        if edge.is_degenerate(epsilon) {
            if point.coincident(&edge.a, epsilon) {
                return true;
            }
            continue;
        }
        let d = edge.b - edge.a;
        let len = edge.length();
        let t = ((point.x - edge.a.x) * d.x + (point.y - edge.a.y) * d.y) / (len * len);
        if (0.0..=1.0).contains(&t) && point.coincident(&edge.point_at(t), epsilon) {
            return true;
        }
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let pi = polygon[i];
        let pj = polygon[j];
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = pj.x + (point.y - pj.y) / (pi.y - pj.y) * (pi.x - pj.x);
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proper_crossing() {
        let s1 = Segment::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        let s2 = Segment::new(Point::new(5.0, -5.0), Point::new(5.0, 5.0));
        match intersect_segments(&s1, &s2, DEFAULT_EPSILON) {
            SegmentIntersection::Crossing { point, t, u } => {
                assert!(point.coincident(&Point::new(5.0, 0.0), DEFAULT_EPSILON));
                assert!(approx_eq(t, 0.5, 1e-9));
                assert!(approx_eq(u, 0.5, 1e-9));
            }
            other => panic!("expected crossing, got {:?}", other),
        }
    }

    #[test]
    fn test_t_junction_is_touching() {
        let s1 = Segment::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        let s2 = Segment::new(Point::new(4.0, 0.0), Point::new(4.0, 6.0));
        match intersect_segments(&s1, &s2, DEFAULT_EPSILON) {
            SegmentIntersection::Touching { point, t, u } => {
                assert!(point.coincident(&Point::new(4.0, 0.0), DEFAULT_EPSILON));
                assert!(approx_eq(t, 0.4, 1e-9));
                assert!(approx_eq(u, 0.0, 1e-9));
            }
            other => panic!("expected touching, got {:?}", other),
        }
    }

    #[test]
    fn test_parallel_no_intersection() {
        let s1 = Segment::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        let s2 = Segment::new(Point::new(0.0, 1.0), Point::new(10.0, 1.0));
        assert_eq!(intersect_segments(&s1, &s2, DEFAULT_EPSILON), SegmentIntersection::None);
    }

    #[test]
    fn test_collinear_overlap() {
        let s1 = Segment::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        let s2 = Segment::new(Point::new(5.0, 0.0), Point::new(15.0, 0.0));
        assert_eq!(
            intersect_segments(&s1, &s2, DEFAULT_EPSILON),
            SegmentIntersection::CollinearOverlap
        );
    }

    #[test]
    fn test_collinear_endpoint_touch() {
        let s1 = Segment::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        let s2 = Segment::new(Point::new(10.0, 0.0), Point::new(20.0, 0.0));
        match intersect_segments(&s1, &s2, DEFAULT_EPSILON) {
            SegmentIntersection::Touching { point, .. } => {
                assert!(point.coincident(&Point::new(10.0, 0.0), DEFAULT_EPSILON));
            }
            other => panic!("expected touching, got {:?}", other),
        }
    }

    #[test]
    fn test_disjoint_segments() {
        let s1 = Segment::new(Point::new(0.0, 0.0), Point::new(1.0, 0.0));
        let s2 = Segment::new(Point::new(5.0, 5.0), Point::new(6.0, 7.0));
        assert_eq!(intersect_segments(&s1, &s2, DEFAULT_EPSILON), SegmentIntersection::None);
    }

    #[test]
    fn test_degenerate_segment_reports_none() {
        let s1 = Segment::new(Point::new(3.0, 3.0), Point::new(3.0, 3.0));
        let s2 = Segment::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        assert_eq!(intersect_segments(&s1, &s2, DEFAULT_EPSILON), SegmentIntersection::None);
    }

    #[test]
    fn test_polygon_area() {
        let rect = Rect::new(2.0, 3.0, 4.0, 5.0);
        assert!(approx_eq(polygon_area(&rect.corners()), 20.0, 1e-9));
    }

    #[test]
    fn test_point_in_polygon() {
        let poly = Rect::new(0.0, 0.0, 10.0, 10.0).corners();
        assert!(point_in_polygon(&Point::new(5.0, 5.0), &poly, DEFAULT_EPSILON));
        assert!(point_in_polygon(&Point::new(0.0, 5.0), &poly, DEFAULT_EPSILON)); // boundary
        assert!(!point_in_polygon(&Point::new(11.0, 5.0), &poly, DEFAULT_EPSILON));
    }

    #[test]
    fn test_rect_corners_ccw() {
        let corners = Rect::new(0.0, 0.0, 2.0, 1.0).corners();
        assert!(polygon_signed_area(&corners) > 0.0);
    }
}
