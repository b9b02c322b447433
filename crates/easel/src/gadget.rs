//! Gadget: a positioned, layered diagram node that owns its draw data.
//!
//! A gadget is the publisher half of the model's invalidation pipeline. Every
//! mutation commits state, re-derives the gadget's own draw record, and then
//! synchronously notifies every registered observer (in practice: the
//! associations anchored to it) before the call returns. There is no dirty
//! flag and no deferred recompute; a read of draw data is always fresh as of
//! the last committed mutation.
//!
//! Observers are keyed by opaque [`ObserverId`]s. Registering an existing key
//! replaces its callback; callbacks run in registration order and the first
//! failure aborts the remainder of the notification pass. State already
//! committed is deliberately not rolled back in that case.

use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use indexmap::IndexMap;
use log::debug;

use easel_core::{
    color::Color,
    draw::{AttributeDrawData, GadgetDrawData},
    geometry::{Bounds, Point, Size},
    style::GadgetKind,
};

use crate::{
    attribute::Attribute,
    error::ModelError,
    identifier::{GadgetId, ObserverId},
};

/// Inner padding between a gadget's outline and its attribute text
const PADDING: i32 = 10;
/// Floor for the derived size, so an empty gadget is still visible and
/// anchorable
const MIN_WIDTH: i32 = 40;
const MIN_HEIGHT: i32 = 30;

/// A zero-argument, fallible geometry-change subscriber.
pub type ObserverCallback = Box<dyn FnMut() -> Result<(), ModelError>>;

struct GadgetInner {
    kind: GadgetKind,
    point: Point,
    layer: i32,
    color: Color,
    /// Attribute groups, e.g. name / fields / methods for a class box
    groups: Vec<Vec<Attribute>>,
    draw_data: GadgetDrawData,
}

impl GadgetInner {
    /// Derives the outline size from the measured attribute records.
    fn derived_size(&self) -> Size {
        let mut content = Size::new(0, 0);
        for attribute in self.groups.iter().flatten() {
            let data = attribute.draw_data();
            content = content.merge_vertical(Size::new(data.width, data.height));
        }
        content.grow(PADDING).max(Size::new(MIN_WIDTH, MIN_HEIGHT))
    }

    /// Rebuilds the draw record from current state. Attribute records are
    /// already measured, so this never fails.
    fn refresh_draw_data(&mut self) {
        self.draw_data = GadgetDrawData {
            kind: self.kind,
            point: self.point,
            size: self.derived_size(),
            layer: self.layer,
            color: self.color,
            attributes: self
                .groups
                .iter()
                .flatten()
                .map(|attribute| attribute.draw_data().clone())
                .collect(),
        };
    }

    fn attribute(&self, group: usize, index: usize) -> Result<&Attribute, ModelError> {
        let group_list = self.groups.get(group).ok_or(ModelError::IndexOutOfBounds {
            index: group as isize,
            len: self.groups.len(),
        })?;
        group_list.get(index).ok_or(ModelError::IndexOutOfBounds {
            index: index as isize,
            len: group_list.len(),
        })
    }

    fn attribute_mut(&mut self, group: usize, index: usize) -> Result<&mut Attribute, ModelError> {
        let groups_len = self.groups.len();
        let group_list = self
            .groups
            .get_mut(group)
            .ok_or(ModelError::IndexOutOfBounds {
                index: group as isize,
                len: groups_len,
            })?;
        let len = group_list.len();
        group_list
            .get_mut(index)
            .ok_or(ModelError::IndexOutOfBounds {
                index: index as isize,
                len,
            })
    }
}

/// Shared handle to a diagram node.
///
/// Cloning the handle shares the underlying gadget; identity is the generated
/// [`GadgetId`]. The container owns gadgets through these handles, while
/// associations hold [`WeakGadget`] back-references that never extend the
/// gadget's lifetime.
#[derive(Clone)]
pub struct Gadget {
    id: GadgetId,
    inner: Rc<RefCell<GadgetInner>>,
    // Kept in its own cell so callbacks may read geometry (borrowing `inner`)
    // while the registry itself is borrowed for the notification pass.
    observers: Rc<RefCell<IndexMap<ObserverId, ObserverCallback>>>,
}

impl Gadget {
    pub fn new(kind: GadgetKind, point: Point, layer: i32, color: Color) -> Self {
        let mut inner = GadgetInner {
            kind,
            point,
            layer,
            color,
            groups: Vec::new(),
            draw_data: GadgetDrawData {
                kind,
                point,
                size: Size::new(MIN_WIDTH, MIN_HEIGHT),
                layer,
                color,
                attributes: Vec::new(),
            },
        };
        inner.refresh_draw_data();
        Self {
            id: GadgetId::next(),
            inner: Rc::new(RefCell::new(inner)),
            observers: Rc::new(RefCell::new(IndexMap::new())),
        }
    }

    pub fn id(&self) -> GadgetId {
        self.id
    }

    pub fn kind(&self) -> GadgetKind {
        self.inner.borrow().kind
    }

    pub fn point(&self) -> Point {
        self.inner.borrow().point
    }

    pub fn layer(&self) -> i32 {
        self.inner.borrow().layer
    }

    pub fn color(&self) -> Color {
        self.inner.borrow().color
    }

    /// Derived outline size; never set directly
    pub fn size(&self) -> Size {
        self.inner.borrow().draw_data.size
    }

    /// Current bounding box (anchor point is the top-left corner)
    pub fn bounds(&self) -> Bounds {
        let inner = self.inner.borrow();
        Bounds::new_from_top_left(inner.point, inner.draw_data.size)
    }

    /// Point-in-bounding-box test
    pub fn covers(&self, point: Point) -> bool {
        self.bounds().contains(point)
    }

    /// Snapshot of the current draw record
    pub fn draw_data(&self) -> GadgetDrawData {
        self.inner.borrow().draw_data.clone()
    }

    /// Creates a weak back-reference for observers and index bookkeeping
    pub fn downgrade(&self) -> WeakGadget {
        WeakGadget {
            id: self.id,
            inner: Rc::downgrade(&self.inner),
            observers: Rc::downgrade(&self.observers),
        }
    }

    // --- mutators: commit, re-derive, then notify -------------------------

    pub fn set_point(&self, point: Point) -> Result<(), ModelError> {
        {
            let mut inner = self.inner.borrow_mut();
            inner.point = point;
            inner.refresh_draw_data();
        }
        self.notify_observers()
    }

    pub fn set_layer(&self, layer: i32) -> Result<(), ModelError> {
        {
            let mut inner = self.inner.borrow_mut();
            inner.layer = layer;
            inner.refresh_draw_data();
        }
        self.notify_observers()
    }

    pub fn set_color(&self, color: Color) -> Result<(), ModelError> {
        {
            let mut inner = self.inner.borrow_mut();
            inner.color = color;
            inner.refresh_draw_data();
        }
        self.notify_observers()
    }

    /// Appends an empty attribute group and returns its index
    pub fn add_group(&self) -> Result<usize, ModelError> {
        let group = {
            let mut inner = self.inner.borrow_mut();
            inner.groups.push(Vec::new());
            inner.refresh_draw_data();
            inner.groups.len() - 1
        };
        self.notify_observers()?;
        Ok(group)
    }

    /// Appends an attribute to an existing group
    pub fn push_attribute(&self, group: usize, attribute: Attribute) -> Result<(), ModelError> {
        {
            let mut inner = self.inner.borrow_mut();
            let groups_len = inner.groups.len();
            let group_list =
                inner
                    .groups
                    .get_mut(group)
                    .ok_or(ModelError::IndexOutOfBounds {
                        index: group as isize,
                        len: groups_len,
                    })?;
            group_list.push(attribute);
            inner.refresh_draw_data();
        }
        self.notify_observers()
    }

    /// Removes an attribute from a group
    pub fn remove_attribute(&self, group: usize, index: usize) -> Result<Attribute, ModelError> {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            inner.attribute(group, index)?;
            let removed = inner.groups[group].remove(index);
            inner.refresh_draw_data();
            removed
        };
        self.notify_observers()?;
        Ok(removed)
    }

    /// Applies a mutation to one attribute, then re-derives and notifies.
    ///
    /// If the mutation itself fails the gadget's draw record is left as it
    /// was and no notification is sent; whatever the closure already changed
    /// on the attribute is not rolled back.
    pub fn update_attribute(
        &self,
        group: usize,
        index: usize,
        f: impl FnOnce(&mut Attribute) -> Result<(), ModelError>,
    ) -> Result<(), ModelError> {
        {
            let mut inner = self.inner.borrow_mut();
            f(inner.attribute_mut(group, index)?)?;
            inner.refresh_draw_data();
        }
        self.notify_observers()
    }

    /// Replaces the text content of one attribute
    pub fn set_attribute_content(
        &self,
        group: usize,
        index: usize,
        content: &str,
    ) -> Result<(), ModelError> {
        self.update_attribute(group, index, |attribute| attribute.set_content(content))
    }

    pub fn attribute_content(&self, group: usize, index: usize) -> Result<String, ModelError> {
        let inner = self.inner.borrow();
        Ok(inner.attribute(group, index)?.content().to_string())
    }

    /// Measured attribute records with the group structure preserved (the
    /// draw record flattens groups)
    pub fn grouped_attributes(&self) -> Vec<Vec<AttributeDrawData>> {
        self.inner
            .borrow()
            .groups
            .iter()
            .map(|group| {
                group
                    .iter()
                    .map(|attribute| attribute.draw_data().clone())
                    .collect()
            })
            .collect()
    }

    pub fn group_count(&self) -> usize {
        self.inner.borrow().groups.len()
    }

    pub fn attribute_count(&self, group: usize) -> Result<usize, ModelError> {
        let inner = self.inner.borrow();
        inner
            .groups
            .get(group)
            .map(Vec::len)
            .ok_or(ModelError::IndexOutOfBounds {
                index: group as isize,
                len: inner.groups.len(),
            })
    }

    // --- observer registry ------------------------------------------------

    /// Registers a geometry-change observer. Re-registering the same key
    /// replaces its callback in place, keeping the original position in the
    /// notification order.
    pub fn add_observer(&self, key: ObserverId, callback: ObserverCallback) {
        debug!(gadget:% = self.id, observer:% = key; "Registering observer");
        self.observers.borrow_mut().insert(key, callback);
    }

    /// Unregisters an observer; an absent key is a no-op.
    pub fn remove_observer(&self, key: ObserverId) {
        self.observers.borrow_mut().shift_remove(&key);
    }

    /// True if the key is currently registered
    pub fn has_observer(&self, key: ObserverId) -> bool {
        self.observers.borrow().contains_key(&key)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    /// Runs every observer callback in registration order.
    ///
    /// The first failure aborts the pass and is surfaced to the caller; the
    /// mutation that triggered the notification stays committed. Callbacks
    /// may read this gadget's state but must not touch its observer registry.
    fn notify_observers(&self) -> Result<(), ModelError> {
        let mut observers = self.observers.borrow_mut();
        for (_, callback) in observers.iter_mut() {
            callback()?;
        }
        Ok(())
    }
}

impl PartialEq for Gadget {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Gadget {}

impl fmt::Debug for Gadget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Gadget")
            .field("id", &self.id)
            .field("kind", &inner.kind)
            .field("point", &inner.point)
            .field("layer", &inner.layer)
            .finish_non_exhaustive()
    }
}

/// Weak back-reference to a gadget.
///
/// Held by associations for geometry reads and observer bookkeeping; never
/// keeps the gadget alive. `upgrade` fails once the container dropped it.
#[derive(Clone)]
pub struct WeakGadget {
    id: GadgetId,
    inner: Weak<RefCell<GadgetInner>>,
    observers: Weak<RefCell<IndexMap<ObserverId, ObserverCallback>>>,
}

impl WeakGadget {
    /// The identity this reference points at, valid even after the gadget
    /// is gone
    pub fn id(&self) -> GadgetId {
        self.id
    }

    pub fn upgrade(&self) -> Option<Gadget> {
        Some(Gadget {
            id: self.id,
            inner: self.inner.upgrade()?,
            observers: self.observers.upgrade()?,
        })
    }
}

impl fmt::Debug for WeakGadget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WeakGadget").field(&self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::attribute::TextContext;
    use crate::config::AppConfig;
    use crate::testing::FixedMeasurer;

    fn context() -> Rc<TextContext> {
        Rc::new(TextContext::new(
            Rc::new(FixedMeasurer),
            &AppConfig::default(),
        ))
    }

    fn gadget() -> Gadget {
        Gadget::new(
            GadgetKind::Class,
            Point::new(100, 100),
            0,
            Color::default(),
        )
    }

    #[test]
    fn test_new_gadget_has_minimum_size() {
        let gadget = gadget();
        assert_eq!(gadget.size(), Size::new(MIN_WIDTH, MIN_HEIGHT));
        assert_eq!(gadget.draw_data().size, gadget.size());
    }

    #[test]
    fn test_size_derives_from_attributes() {
        let gadget = gadget();
        let ctx = context();
        let group = gadget.add_group().unwrap();

        gadget
            .push_attribute(group, Attribute::new(ctx.clone(), "WidePublicName").unwrap())
            .unwrap();
        gadget
            .push_attribute(group, Attribute::new(ctx, "x").unwrap())
            .unwrap();

        let expected_width = FixedMeasurer::width_of("WidePublicName", 12) + 2 * PADDING;
        let expected_height = 2 * FixedMeasurer::height_of(12) + 2 * PADDING;
        assert_eq!(gadget.size(), Size::new(expected_width, expected_height));
    }

    #[test]
    fn test_covers_uses_derived_bounds() {
        let gadget = gadget();
        assert!(gadget.covers(Point::new(100, 100)));
        assert!(gadget.covers(Point::new(100 + MIN_WIDTH, 100 + MIN_HEIGHT)));
        assert!(!gadget.covers(Point::new(99, 100)));
        assert!(!gadget.covers(Point::new(100 + MIN_WIDTH + 1, 100)));
    }

    #[test]
    fn test_set_point_refreshes_draw_data_before_notifying() {
        let gadget = gadget();
        let observed = Rc::new(RefCell::new(Vec::new()));

        let key = ObserverId::next();
        let inner = gadget.clone();
        let seen = observed.clone();
        gadget.add_observer(
            key,
            Box::new(move || {
                // The draw record must already be fresh when observers run.
                seen.borrow_mut().push(inner.draw_data().point);
                Ok(())
            }),
        );

        gadget.set_point(Point::new(7, 9)).unwrap();
        assert_eq!(observed.borrow().as_slice(), &[Point::new(7, 9)]);
    }

    #[test]
    fn test_observers_called_in_registration_order() {
        let gadget = gadget();
        let order = Rc::new(RefCell::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = order.clone();
            gadget.add_observer(
                ObserverId::next(),
                Box::new(move || {
                    order.borrow_mut().push(tag);
                    Ok(())
                }),
            );
        }

        gadget.set_layer(3).unwrap();
        assert_eq!(order.borrow().as_slice(), &["first", "second", "third"]);
    }

    #[test]
    fn test_reregistering_key_replaces_callback() {
        let gadget = gadget();
        let hits = Rc::new(RefCell::new((0, 0)));
        let key = ObserverId::next();

        let h = hits.clone();
        gadget.add_observer(
            key,
            Box::new(move || {
                h.borrow_mut().0 += 1;
                Ok(())
            }),
        );
        let h = hits.clone();
        gadget.add_observer(
            key,
            Box::new(move || {
                h.borrow_mut().1 += 1;
                Ok(())
            }),
        );

        assert_eq!(gadget.observer_count(), 1);
        gadget.set_layer(1).unwrap();
        assert_eq!(*hits.borrow(), (0, 1));
    }

    #[test]
    fn test_remove_observer_absent_key_is_noop() {
        let gadget = gadget();
        gadget.remove_observer(ObserverId::next());
        assert_eq!(gadget.observer_count(), 0);
    }

    #[test]
    fn test_first_observer_failure_aborts_without_rollback() {
        let gadget = gadget();
        let later_called = Rc::new(RefCell::new(false));

        gadget.add_observer(
            ObserverId::next(),
            Box::new(|| Err(ModelError::DetachedEndpoint)),
        );
        let flag = later_called.clone();
        gadget.add_observer(
            ObserverId::next(),
            Box::new(move || {
                *flag.borrow_mut() = true;
                Ok(())
            }),
        );

        let err = gadget.set_point(Point::new(1, 2)).unwrap_err();
        assert!(matches!(err, ModelError::DetachedEndpoint));
        // Notification aborted at the failing observer...
        assert!(!*later_called.borrow());
        // ...but the mutation stayed committed.
        assert_eq!(gadget.point(), Point::new(1, 2));
        assert_eq!(gadget.draw_data().point, Point::new(1, 2));
    }

    #[test]
    fn test_attribute_mutation_flows_through_draw_data() {
        let gadget = gadget();
        let group = gadget.add_group().unwrap();
        gadget
            .push_attribute(group, Attribute::new(context(), "old").unwrap())
            .unwrap();

        gadget.set_attribute_content(group, 0, "renamed").unwrap();
        assert_eq!(gadget.attribute_content(group, 0).unwrap(), "renamed");
        assert_eq!(gadget.draw_data().attributes[0].content, "renamed");
    }

    #[test]
    fn test_attribute_index_errors() {
        let gadget = gadget();
        assert!(matches!(
            gadget.set_attribute_content(0, 0, "x"),
            Err(ModelError::IndexOutOfBounds { .. })
        ));

        let group = gadget.add_group().unwrap();
        assert!(matches!(
            gadget.remove_attribute(group, 0),
            Err(ModelError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_weak_gadget_upgrade_after_drop() {
        let gadget = gadget();
        let weak = gadget.downgrade();
        let id = gadget.id();

        assert!(weak.upgrade().is_some());
        drop(gadget);
        assert!(weak.upgrade().is_none());
        assert_eq!(weak.id(), id);
    }
}
