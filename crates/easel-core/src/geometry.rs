//! Geometric primitives for the diagram model.
//!
//! This module provides the fundamental geometric types used throughout Easel
//! for positioning elements and answering hit-test queries.
//!
//! # Overview
//!
//! - [`Point`] - A 2D integer coordinate in diagram space
//! - [`Size`] - Width and height dimensions
//! - [`Bounds`] - A rectangular bounding box with ratio-anchored edge snapping
//! - [`Edge`] - One of the four sides of a bounding box
//!
//! # Coordinate System
//!
//! Easel uses a screen-style coordinate system: origin at the top-left,
//! X increasing rightward, Y increasing downward. All model coordinates are
//! integer pixels; anchor ratios in `[0, 1]` are resolved to pixels at the
//! bounding-box seam and rounded to the nearest integer.

use serde::{Deserialize, Serialize};

/// A 2D point with integer pixel coordinates.
///
/// # Examples
///
/// ```
/// # use easel_core::geometry::Point;
/// let p1 = Point::new(10, 20);
/// let p2 = Point::new(5, 5);
///
/// let sum = p1.add_point(p2);
/// assert_eq!(sum.x(), 15);
/// assert_eq!(sum.y(), 25);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    x: i32,
    y: i32,
}

impl Point {
    /// Creates a new point with the specified coordinates
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the x-coordinate of the point
    pub fn x(self) -> i32 {
        self.x
    }

    /// Returns the y-coordinate of the point
    pub fn y(self) -> i32 {
        self.y
    }

    /// Creates a new point with the specified x-coordinate
    pub fn with_x(mut self, x: i32) -> Self {
        self.x = x;
        self
    }

    /// Creates a new point with the specified y-coordinate
    pub fn with_y(mut self, y: i32) -> Self {
        self.y = y;
        self
    }

    /// Adds another point to this point, returning a new point
    pub fn add_point(self, other: Point) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    /// Subtracts another point from this point, returning a new point
    pub fn sub_point(self, other: Point) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    /// Euclidean distance from the origin
    pub fn magnitude(self) -> f64 {
        f64::from(self.x).hypot(f64::from(self.y))
    }

    /// Euclidean distance to another point
    pub fn distance_to(self, other: Point) -> f64 {
        self.sub_point(other).magnitude()
    }

    /// Distance from this point to the segment between `a` and `b`.
    ///
    /// Falls back to point distance when the segment is degenerate.
    pub fn distance_to_segment(self, a: Point, b: Point) -> f64 {
        let (px, py) = (f64::from(self.x), f64::from(self.y));
        let (ax, ay) = (f64::from(a.x), f64::from(a.y));
        let (bx, by) = (f64::from(b.x), f64::from(b.y));

        let (dx, dy) = (bx - ax, by - ay);
        let len_sq = dx * dx + dy * dy;
        if len_sq == 0.0 {
            return self.distance_to(a);
        }

        let t = (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0);
        let (cx, cy) = (ax + t * dx, ay + t * dy);
        (px - cx).hypot(py - cy)
    }
}

/// Represents the dimensions of an element with integer width and height
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    width: i32,
    height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Returns the width dimension of this size
    pub fn width(self) -> i32 {
        self.width
    }

    /// Returns the height dimension of this size
    pub fn height(self) -> i32 {
        self.height
    }

    /// Returns a new Size with the maximum width and height between this size and another
    pub fn max(self, other: Size) -> Self {
        Self {
            width: self.width.max(other.width),
            height: self.height.max(other.height),
        }
    }

    /// Merges two sizes vertically by adding heights and taking the maximum width
    pub fn merge_vertical(self, other: Size) -> Self {
        Self {
            width: self.width.max(other.width),
            height: self.height + other.height,
        }
    }

    /// Returns a new Size grown by `amount` on every side
    pub fn grow(self, amount: i32) -> Self {
        Self {
            width: self.width + 2 * amount,
            height: self.height + 2 * amount,
        }
    }
}

/// One of the four sides of a bounding box.
///
/// Used when snapping a ratio anchor onto the box outline: the chosen edge
/// determines which coordinate is pinned and, for self-loop routing, which
/// direction the loop is offset toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

impl Edge {
    /// True for the edges on the low-coordinate side of the box (left, top)
    pub fn is_low(self) -> bool {
        matches!(self, Edge::Left | Edge::Top)
    }

    /// Sign of the routing offset pointing away from the box through this edge:
    /// negative toward the low side, positive toward the high side.
    pub fn offset_sign(self) -> i32 {
        if self.is_low() { -1 } else { 1 }
    }

    /// True when the pinned coordinate is x (left/right edges)
    pub fn is_vertical(self) -> bool {
        matches!(self, Edge::Left | Edge::Right)
    }
}

/// A rectangular bounding box defined by a top-left corner and a size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
}

impl Bounds {
    /// Creates a new bounds from a top-left point and a size
    pub fn new_from_top_left(top_left: Point, size: Size) -> Self {
        Self {
            min_x: top_left.x,
            min_y: top_left.y,
            max_x: top_left.x + size.width(),
            max_y: top_left.y + size.height(),
        }
    }

    /// Returns the minimum x-coordinate of the bounds
    pub fn min_x(self) -> i32 {
        self.min_x
    }

    /// Returns the minimum y-coordinate of the bounds
    pub fn min_y(self) -> i32 {
        self.min_y
    }

    /// Returns the maximum x-coordinate of the bounds
    pub fn max_x(self) -> i32 {
        self.max_x
    }

    /// Returns the maximum y-coordinate of the bounds
    pub fn max_y(self) -> i32 {
        self.max_y
    }

    /// Returns the width of the bounds
    pub fn width(self) -> i32 {
        self.max_x - self.min_x
    }

    /// Returns the height of the bounds
    pub fn height(self) -> i32 {
        self.max_y - self.min_y
    }

    /// Inclusive point-in-rectangle test
    pub fn contains(self, point: Point) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    /// Resolves a ratio pair in `[0, 1]²` to the interior point it addresses.
    pub fn anchor(self, ratio_x: f64, ratio_y: f64) -> Point {
        Point {
            x: self.min_x + (ratio_x * f64::from(self.width())).round() as i32,
            y: self.min_y + (ratio_y * f64::from(self.height())).round() as i32,
        }
    }

    /// Snaps a ratio anchor onto the nearest edge of the box outline.
    ///
    /// The ratio pair implies four distances (to the left, right, top and
    /// bottom edges); the smallest wins and that coordinate is pinned to the
    /// edge while the other keeps its ratio-resolved value. Ties resolve in
    /// left, right, top, bottom order.
    pub fn snap_to_edge(self, ratio_x: f64, ratio_y: f64) -> (Point, Edge) {
        let interior = self.anchor(ratio_x, ratio_y);

        let width = f64::from(self.width());
        let height = f64::from(self.height());
        let distances = [
            (Edge::Left, ratio_x * width),
            (Edge::Right, (1.0 - ratio_x) * width),
            (Edge::Top, ratio_y * height),
            (Edge::Bottom, (1.0 - ratio_y) * height),
        ];

        let mut nearest = distances[0];
        for candidate in &distances[1..] {
            if candidate.1 < nearest.1 {
                nearest = *candidate;
            }
        }

        let point = match nearest.0 {
            Edge::Left => interior.with_x(self.min_x),
            Edge::Right => interior.with_x(self.max_x),
            Edge::Top => interior.with_y(self.min_y),
            Edge::Bottom => interior.with_y(self.max_y),
        };
        (point, nearest.0)
    }
}


#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    fn ratio_strategy() -> impl Strategy<Value = f64> {
        0.0f64..=1.0
    }

    fn bounds_strategy() -> impl Strategy<Value = Bounds> {
        (-500i32..500, -500i32..500, 2i32..400, 2i32..400).prop_map(|(x, y, w, h)| {
            Bounds::new_from_top_left(Point::new(x, y), Size::new(w, h))
        })
    }

    /// A snapped anchor must land exactly on the box outline.
    fn check_snap_lands_on_outline(
        bounds: Bounds,
        rx: f64,
        ry: f64,
    ) -> Result<(), TestCaseError> {
        let (point, edge) = bounds.snap_to_edge(rx, ry);

        match edge {
            Edge::Left => prop_assert_eq!(point.x(), bounds.min_x()),
            Edge::Right => prop_assert_eq!(point.x(), bounds.max_x()),
            Edge::Top => prop_assert_eq!(point.y(), bounds.min_y()),
            Edge::Bottom => prop_assert_eq!(point.y(), bounds.max_y()),
        }
        prop_assert!(bounds.contains(point));
        Ok(())
    }

    /// An anchored interior point always stays inside the bounds.
    fn check_anchor_stays_inside(bounds: Bounds, rx: f64, ry: f64) -> Result<(), TestCaseError> {
        let point = bounds.anchor(rx, ry);
        prop_assert!(bounds.contains(point));
        Ok(())
    }

    /// Segment distance is never greater than the distance to either endpoint.
    fn check_segment_distance_bound(p: Point, a: Point, b: Point) -> Result<(), TestCaseError> {
        let d = p.distance_to_segment(a, b);
        prop_assert!(d <= p.distance_to(a) + 1e-9);
        prop_assert!(d <= p.distance_to(b) + 1e-9);
        Ok(())
    }

    fn point_strategy() -> impl Strategy<Value = Point> {
        (-1000i32..1000, -1000i32..1000).prop_map(|(x, y)| Point::new(x, y))
    }

    proptest! {
        #[test]
        fn snap_lands_on_outline(bounds in bounds_strategy(), rx in ratio_strategy(), ry in ratio_strategy()) {
            check_snap_lands_on_outline(bounds, rx, ry)?;
        }

        #[test]
        fn anchor_stays_inside(bounds in bounds_strategy(), rx in ratio_strategy(), ry in ratio_strategy()) {
            check_anchor_stays_inside(bounds, rx, ry)?;
        }

        #[test]
        fn segment_distance_bound(p in point_strategy(), a in point_strategy(), b in point_strategy()) {
            check_segment_distance_bound(p, a, b)?;
        }
    }
}
