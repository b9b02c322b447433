//! Association: an edge between two gadget endpoints with derived geometry.
//!
//! An association never owns its parent gadgets; it holds weak back-references
//! plus the parents' stable ids, and subscribes to both parents' geometry
//! changes at construction. Whenever a parent moves or resizes, the
//! association recomputes its own draw record synchronously inside the
//! parent's notification pass.
//!
//! Endpoint pixel points are derived from anchor ratios: each ratio pair in
//! `[0, 1]²` addresses a point of the parent's bounding box, which is snapped
//! onto the nearest box edge. A self-loop (both endpoints on the same gadget)
//! is routed with a perpendicular offset so it stays visible instead of
//! collapsing to a degenerate segment.

use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use log::trace;

use easel_core::{
    draw::{AnchoredAttributeDrawData, AssociationDrawData},
    geometry::Point,
    style::AssociationKind,
};

use crate::{
    attribute::{AnchoredAttribute, Attribute, TextContext, validate_ratio},
    error::ModelError,
    gadget::{Gadget, ObserverCallback, WeakGadget},
    identifier::{AssociationId, GadgetId, ObserverId},
};

/// Maximum perpendicular distance at which a point still hits the edge
const COVER_DISTANCE: f64 = 5.0;

/// One end of an association: the parent back-reference and its anchor ratio.
#[derive(Debug, Clone)]
struct Endpoint {
    gadget: WeakGadget,
    ratio: (f64, f64),
}

impl Endpoint {
    fn upgrade(&self) -> Result<Gadget, ModelError> {
        self.gadget.upgrade().ok_or(ModelError::DetachedEndpoint)
    }
}

struct AssociationInner {
    kind: AssociationKind,
    layer: i32,
    start: Endpoint,
    end: Endpoint,
    selected: bool,
    attributes: Vec<AnchoredAttribute>,
    context: Rc<TextContext>,
    draw_data: AssociationDrawData,
}

impl AssociationInner {
    /// Computes endpoint pixels and loop offset from current parent geometry.
    fn compute_geometry(&self) -> Result<(Point, Point, i32), ModelError> {
        let start_parent = self.start.upgrade()?;
        let end_parent = self.end.upgrade()?;

        let (start, end, offset) = if start_parent.id() == end_parent.id() {
            let bounds = start_parent.bounds();
            let (start, edge) = bounds.snap_to_edge(self.start.ratio.0, self.start.ratio.1);
            let interior = bounds.anchor(self.end.ratio.0, self.end.ratio.1);

            // The end point shares the snapped coordinate axis with the
            // start; the loop is pushed outward by half the span between the
            // two free coordinates, signed toward the snapped edge's side.
            if edge.is_vertical() {
                let end = interior.with_x(start.x());
                let span = (end.y() - start.y()).abs();
                (start, end, edge.offset_sign() * span / 2)
            } else {
                let end = interior.with_y(start.y());
                let span = (end.x() - start.x()).abs();
                (start, end, edge.offset_sign() * span / 2)
            }
        } else {
            let (start, _) = start_parent
                .bounds()
                .snap_to_edge(self.start.ratio.0, self.start.ratio.1);
            let (end, _) = end_parent
                .bounds()
                .snap_to_edge(self.end.ratio.0, self.end.ratio.1);
            (start, end, 0)
        };

        if start == end {
            return Err(ModelError::DegenerateGeometry(start));
        }
        Ok((start, end, offset))
    }

    /// Recomputes the draw record; on failure the previous record is kept.
    fn refresh_draw_data(&mut self) -> Result<(), ModelError> {
        let (start, end, loop_offset) = self.compute_geometry()?;
        self.draw_data = AssociationDrawData {
            kind: self.kind,
            start,
            end,
            loop_offset,
            layer: self.layer,
            selected: self.selected,
            attributes: self
                .attributes
                .iter()
                .map(|anchored| AnchoredAttributeDrawData {
                    ratio: anchored.ratio(),
                    attribute: anchored.attribute().draw_data().clone(),
                })
                .collect(),
        };
        Ok(())
    }
}

/// Shared handle to an association edge.
///
/// Identity is the generated [`AssociationId`]; cloning shares the edge.
#[derive(Clone)]
pub struct Association {
    id: AssociationId,
    /// Key under which this association is registered on its parents
    observer_key: ObserverId,
    inner: Rc<RefCell<AssociationInner>>,
    /// Optional downstream subscriber, notified after each successful
    /// recompute. Kept in its own cell so the hook can read the association.
    update_hook: Rc<RefCell<Option<ObserverCallback>>>,
}

impl Association {
    /// Creates an association between two gadgets.
    ///
    /// Validates the anchor ratios and the derived geometry before any state
    /// is created: if the two resolved endpoint pixels coincide, no
    /// association exists and no observer was registered. On success the
    /// association is already subscribed to both parents (once, for a
    /// self-loop).
    pub fn new(
        kind: AssociationKind,
        layer: i32,
        start: &Gadget,
        start_ratio: (f64, f64),
        end: &Gadget,
        end_ratio: (f64, f64),
        context: Rc<TextContext>,
    ) -> Result<Self, ModelError> {
        validate_anchor(start_ratio)?;
        validate_anchor(end_ratio)?;

        let mut inner = AssociationInner {
            kind,
            layer,
            start: Endpoint {
                gadget: start.downgrade(),
                ratio: start_ratio,
            },
            end: Endpoint {
                gadget: end.downgrade(),
                ratio: end_ratio,
            },
            selected: false,
            attributes: Vec::new(),
            context,
            draw_data: AssociationDrawData {
                kind,
                start: Point::new(0, 0),
                end: Point::new(0, 0),
                loop_offset: 0,
                layer,
                selected: false,
                attributes: Vec::new(),
            },
        };
        inner.refresh_draw_data()?;

        let association = Self {
            id: AssociationId::next(),
            observer_key: ObserverId::next(),
            inner: Rc::new(RefCell::new(inner)),
            update_hook: Rc::new(RefCell::new(None)),
        };
        association.register_observers()?;
        Ok(association)
    }

    pub fn id(&self) -> AssociationId {
        self.id
    }

    pub fn kind(&self) -> AssociationKind {
        self.inner.borrow().kind
    }

    pub fn layer(&self) -> i32 {
        self.inner.borrow().layer
    }

    pub fn selected(&self) -> bool {
        self.inner.borrow().selected
    }

    /// Current start parent's id (the gadget itself may already be gone)
    pub fn start_id(&self) -> GadgetId {
        self.inner.borrow().start.gadget.id()
    }

    pub fn end_id(&self) -> GadgetId {
        self.inner.borrow().end.gadget.id()
    }

    pub fn start_ratio(&self) -> (f64, f64) {
        self.inner.borrow().start.ratio
    }

    pub fn end_ratio(&self) -> (f64, f64) {
        self.inner.borrow().end.ratio
    }

    pub fn attribute_count(&self) -> usize {
        self.inner.borrow().attributes.len()
    }

    /// Snapshot of the current draw record
    pub fn draw_data(&self) -> AssociationDrawData {
        self.inner.borrow().draw_data.clone()
    }

    /// Registers a downstream subscriber notified after each successful
    /// recompute. Absence of a hook is the common case and not an error.
    pub fn set_update_hook(&self, hook: ObserverCallback) {
        *self.update_hook.borrow_mut() = Some(hook);
    }

    // --- mutators ---------------------------------------------------------

    pub fn set_kind(&self, kind: AssociationKind) -> Result<(), ModelError> {
        self.inner.borrow_mut().kind = kind;
        self.update_draw_data()
    }

    /// Sets the kind from its persisted bit value; anything but exactly one
    /// supported bit is rejected.
    pub fn set_kind_bits(&self, bits: u8) -> Result<(), ModelError> {
        let kind =
            AssociationKind::from_bits(bits).ok_or(ModelError::UnsupportedAssociationKind(bits))?;
        self.set_kind(kind)
    }

    pub fn set_layer(&self, layer: i32) -> Result<(), ModelError> {
        self.inner.borrow_mut().layer = layer;
        self.update_draw_data()
    }

    pub fn set_selected(&self, selected: bool) -> Result<(), ModelError> {
        self.inner.borrow_mut().selected = selected;
        self.update_draw_data()
    }

    /// Recomputes the draw record from current parent geometry and anchor
    /// ratios, then notifies the update hook. With no intervening state
    /// change this is idempotent.
    pub fn update_draw_data(&self) -> Result<(), ModelError> {
        self.inner.borrow_mut().refresh_draw_data()?;
        trace!(association:% = self.id; "Draw data recomputed");
        if let Some(hook) = self.update_hook.borrow_mut().as_mut() {
            hook()?;
        }
        Ok(())
    }

    /// Re-anchors the start endpoint onto `gadget` at `ratio`.
    ///
    /// The observer registration moves with the endpoint, except that the
    /// old gadget keeps its registration while the other endpoint still
    /// anchors there (a self-loop being split). The caller owns the
    /// association-index update that must follow a successful re-anchor.
    pub fn set_parent_start(&self, gadget: &Gadget, ratio: (f64, f64)) -> Result<(), ModelError> {
        validate_anchor(ratio)?;
        {
            let mut inner = self.inner.borrow_mut();
            let old_id = inner.start.gadget.id();
            if old_id != gadget.id() {
                let end_id = inner.end.gadget.id();
                if old_id != end_id
                    && let Some(old) = inner.start.gadget.upgrade()
                {
                    old.remove_observer(self.observer_key);
                }
                gadget.add_observer(self.observer_key, self.observer_callback());
                inner.start.gadget = gadget.downgrade();
            }
            inner.start.ratio = ratio;
        }
        self.update_draw_data()
    }

    /// Re-anchors the end endpoint; mirror of [`Self::set_parent_start`].
    pub fn set_parent_end(&self, gadget: &Gadget, ratio: (f64, f64)) -> Result<(), ModelError> {
        validate_anchor(ratio)?;
        {
            let mut inner = self.inner.borrow_mut();
            let old_id = inner.end.gadget.id();
            if old_id != gadget.id() {
                let start_id = inner.start.gadget.id();
                if old_id != start_id
                    && let Some(old) = inner.end.gadget.upgrade()
                {
                    old.remove_observer(self.observer_key);
                }
                gadget.add_observer(self.observer_key, self.observer_callback());
                inner.end.gadget = gadget.downgrade();
            }
            inner.end.ratio = ratio;
        }
        self.update_draw_data()
    }

    /// Inserts an attribute at `index` along the path.
    ///
    /// `index` must lie in `[-1, len]`; `-1` and `len` both append. The ratio
    /// is validated by the anchored-attribute constructor before anything is
    /// inserted.
    pub fn add_attribute(&self, index: isize, ratio: f64, content: &str) -> Result<(), ModelError> {
        {
            let mut inner = self.inner.borrow_mut();
            let len = inner.attributes.len();
            let position = resolve_insert_index(index, len)?;
            let attribute = Attribute::new(inner.context.clone(), content)?;
            let anchored = AnchoredAttribute::new(attribute, ratio)?;
            inner.attributes.insert(position, anchored);
        }
        self.update_draw_data()
    }

    /// Removes the attribute at `index`
    pub fn remove_attribute(&self, index: usize) -> Result<AnchoredAttribute, ModelError> {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            let len = inner.attributes.len();
            if index >= len {
                return Err(ModelError::IndexOutOfBounds {
                    index: index as isize,
                    len,
                });
            }
            inner.attributes.remove(index)
        };
        self.update_draw_data()?;
        Ok(removed)
    }

    /// Applies a mutation to the attribute at `index`, then recomputes.
    pub fn update_attribute(
        &self,
        index: usize,
        f: impl FnOnce(&mut Attribute) -> Result<(), ModelError>,
    ) -> Result<(), ModelError> {
        {
            let mut inner = self.inner.borrow_mut();
            let len = inner.attributes.len();
            let anchored =
                inner
                    .attributes
                    .get_mut(index)
                    .ok_or(ModelError::IndexOutOfBounds {
                        index: index as isize,
                        len,
                    })?;
            f(anchored.attribute_mut())?;
        }
        self.update_draw_data()
    }

    /// Moves the attribute at `index` to a new path ratio; range validation
    /// is delegated to the ratio setter.
    pub fn move_attribute(&self, index: usize, ratio: f64) -> Result<(), ModelError> {
        {
            let mut inner = self.inner.borrow_mut();
            let len = inner.attributes.len();
            let anchored =
                inner
                    .attributes
                    .get_mut(index)
                    .ok_or(ModelError::IndexOutOfBounds {
                        index: index as isize,
                        len,
                    })?;
            anchored.set_ratio(ratio)?;
        }
        self.update_draw_data()
    }

    /// True if the point lies within a fixed perpendicular distance of any
    /// routed segment of the edge.
    pub fn covers(&self, point: Point) -> bool {
        self.inner
            .borrow()
            .draw_data
            .segments()
            .iter()
            .any(|(a, b)| point.distance_to_segment(*a, *b) <= COVER_DISTANCE)
    }

    // --- observer lifecycle -----------------------------------------------

    /// The callback registered on parent gadgets: recompute own draw data.
    /// Holds only weak references, so a stale registration left behind by a
    /// dropped association is inert rather than dangling.
    fn observer_callback(&self) -> ObserverCallback {
        let inner = Rc::downgrade(&self.inner);
        let hook = Rc::downgrade(&self.update_hook);
        Box::new(move || refresh_weak(&inner, &hook))
    }

    /// Subscribes to both parents (once when they are the same gadget).
    /// Used at construction and when re-attaching an undone removal.
    pub(crate) fn register_observers(&self) -> Result<(), ModelError> {
        let (start, end) = {
            let inner = self.inner.borrow();
            (inner.start.clone(), inner.end.clone())
        };
        let start_parent = start.upgrade()?;
        start_parent.add_observer(self.observer_key, self.observer_callback());
        if end.gadget.id() != start_parent.id() {
            let end_parent = end.upgrade()?;
            end_parent.add_observer(self.observer_key, self.observer_callback());
        }
        Ok(())
    }

    /// Unsubscribes from both parents. Must be called when the association
    /// is removed from the model; parents that are already gone are skipped.
    pub(crate) fn unregister_observers(&self) {
        let inner = self.inner.borrow();
        if let Some(start) = inner.start.gadget.upgrade() {
            start.remove_observer(self.observer_key);
        }
        if let Some(end) = inner.end.gadget.upgrade() {
            end.remove_observer(self.observer_key);
        }
    }

    #[cfg(test)]
    pub(crate) fn observer_key(&self) -> ObserverId {
        self.observer_key
    }
}

/// Recompute-and-propagate through weak references; a dropped association
/// leaves the registration inert.
fn refresh_weak(
    inner: &Weak<RefCell<AssociationInner>>,
    hook: &Weak<RefCell<Option<ObserverCallback>>>,
) -> Result<(), ModelError> {
    let Some(inner) = inner.upgrade() else {
        return Ok(());
    };
    inner.borrow_mut().refresh_draw_data()?;
    if let Some(hook) = hook.upgrade()
        && let Some(callback) = hook.borrow_mut().as_mut()
    {
        callback()?;
    }
    Ok(())
}

impl PartialEq for Association {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Association {}

impl fmt::Debug for Association {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Association")
            .field("id", &self.id)
            .field("kind", &inner.kind)
            .field("start", &inner.start.gadget.id())
            .field("end", &inner.end.gadget.id())
            .finish_non_exhaustive()
    }
}

/// Validates an anchor ratio pair; both components must lie in `[0, 1]`.
fn validate_anchor(ratio: (f64, f64)) -> Result<(), ModelError> {
    validate_ratio(ratio.0)?;
    validate_ratio(ratio.1)
}

/// Maps an insertion index in `[-1, len]` onto a list position; `-1` and
/// `len` both append.
fn resolve_insert_index(index: isize, len: usize) -> Result<usize, ModelError> {
    if index == -1 {
        return Ok(len);
    }
    if index >= 0 && index as usize <= len {
        return Ok(index as usize);
    }
    Err(ModelError::IndexOutOfBounds { index, len })
}
