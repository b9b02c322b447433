//! Render-ready draw records.
//!
//! These are the derived, presentation-facing snapshots of model state. The
//! model recomputes them synchronously on every relevant mutation, so a
//! consumer reading a draw record always sees the state as of the last
//! committed change. Nothing in this module renders; a presentation layer
//! consumes the tree rooted at [`DiagramDrawData`].

use crate::{
    color::Color,
    geometry::{Point, Size},
    style::{AssociationKind, GadgetKind, TextStyle},
};

/// Measured snapshot of a single text attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDrawData {
    pub content: String,
    /// Measured text height in pixels
    pub height: i32,
    /// Measured text width in pixels
    pub width: i32,
    /// Font size in points
    pub size: u16,
    pub style: TextStyle,
    pub font_file: String,
}

/// Snapshot of a gadget: absolute position, derived size, layer, fill color
/// and the measured records of every attribute, in group order.
#[derive(Debug, Clone, PartialEq)]
pub struct GadgetDrawData {
    pub kind: GadgetKind,
    pub point: Point,
    pub size: Size,
    pub layer: i32,
    pub color: Color,
    pub attributes: Vec<AttributeDrawData>,
}

/// An association attribute snapshot together with its position along the path.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchoredAttributeDrawData {
    /// Position along the association path in `[0, 1]`
    pub ratio: f64,
    pub attribute: AttributeDrawData,
}

/// Snapshot of an association edge.
///
/// `start` and `end` are absolute pixel points on the parents' outlines. For a
/// self-loop the two points share one coordinate axis and `loop_offset` is the
/// signed perpendicular displacement of the routed loop along that shared
/// axis; for an edge between distinct parents it is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationDrawData {
    pub kind: AssociationKind,
    pub start: Point,
    pub end: Point,
    pub loop_offset: i32,
    pub layer: i32,
    pub selected: bool,
    pub attributes: Vec<AnchoredAttributeDrawData>,
}

impl AssociationDrawData {
    /// The logical segments a renderer draws and hit-testing follows.
    ///
    /// A plain edge is a single start-end segment. A self-loop is routed as
    /// two perpendicular stubs joined by a connector parallel to the snapped
    /// edge, displaced by `loop_offset`.
    pub fn segments(&self) -> Vec<(Point, Point)> {
        if self.loop_offset == 0 {
            return vec![(self.start, self.end)];
        }

        let offset = if self.start.x() == self.end.x() {
            Point::new(self.loop_offset, 0)
        } else {
            Point::new(0, self.loop_offset)
        };
        let out_start = self.start.add_point(offset);
        let out_end = self.end.add_point(offset);
        vec![
            (self.start, out_start),
            (out_start, out_end),
            (out_end, self.end),
        ]
    }
}

/// The full renderable tree handed to a presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramDrawData {
    pub background: Color,
    /// Outer margin in pixels around the diagram contents
    pub margin: i32,
    /// Stroke width in pixels for association edges and gadget outlines
    pub line_width: i32,
    pub gadgets: Vec<GadgetDrawData>,
    pub associations: Vec<AssociationDrawData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(start: Point, end: Point, loop_offset: i32) -> AssociationDrawData {
        AssociationDrawData {
            kind: AssociationKind::Dependency,
            start,
            end,
            loop_offset,
            layer: 0,
            selected: false,
            attributes: Vec::new(),
        }
    }

    #[test]
    fn test_plain_edge_is_one_segment() {
        let data = edge(Point::new(0, 0), Point::new(10, 10), 0);
        assert_eq!(data.segments(), vec![(Point::new(0, 0), Point::new(10, 10))]);
    }

    #[test]
    fn test_self_loop_routes_three_segments() {
        // Both endpoints on a left edge (shared x), loop displaced leftward.
        let data = edge(Point::new(0, 10), Point::new(0, 40), -15);
        let segments = data.segments();

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], (Point::new(0, 10), Point::new(-15, 10)));
        assert_eq!(segments[1], (Point::new(-15, 10), Point::new(-15, 40)));
        assert_eq!(segments[2], (Point::new(-15, 40), Point::new(0, 40)));
    }

    #[test]
    fn test_self_loop_on_horizontal_edge_offsets_in_y() {
        let data = edge(Point::new(10, 0), Point::new(40, 0), -15);
        let segments = data.segments();

        assert_eq!(segments[0], (Point::new(10, 0), Point::new(10, -15)));
        assert_eq!(segments[1], (Point::new(10, -15), Point::new(40, -15)));
        assert_eq!(segments[2], (Point::new(40, -15), Point::new(40, 0)));
    }
}
