//! The component container: flat, ordered storage of everything on a diagram.
//!
//! Gadgets and associations share one container behind the [`Component`] sum
//! type, so hit-testing and enumeration treat them uniformly. The container
//! knows nothing about connectivity; that is the association index's job.

use log::debug;

use easel_core::geometry::Point;

use crate::{
    association::Association,
    error::ModelError,
    gadget::Gadget,
    identifier::{AssociationId, GadgetId},
};

/// Identity of a component, independent of its concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    Gadget(GadgetId),
    Association(AssociationId),
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentId::Gadget(id) => id.fmt(f),
            ComponentId::Association(id) => id.fmt(f),
        }
    }
}

/// A diagram element: either a gadget node or an association edge.
#[derive(Debug, Clone)]
pub enum Component {
    Gadget(Gadget),
    Association(Association),
}

impl Component {
    pub fn id(&self) -> ComponentId {
        match self {
            Component::Gadget(gadget) => ComponentId::Gadget(gadget.id()),
            Component::Association(association) => ComponentId::Association(association.id()),
        }
    }

    /// Drawing layer used to rank overlapping hits
    pub fn layer(&self) -> i32 {
        match self {
            Component::Gadget(gadget) => gadget.layer(),
            Component::Association(association) => association.layer(),
        }
    }

    /// Hit test: inside the gadget's bounding box, or within the pick
    /// distance of the association's routed segments.
    pub fn covers(&self, point: Point) -> bool {
        match self {
            Component::Gadget(gadget) => gadget.covers(point),
            Component::Association(association) => association.covers(point),
        }
    }

    pub fn as_gadget(&self) -> Option<&Gadget> {
        match self {
            Component::Gadget(gadget) => Some(gadget),
            Component::Association(_) => None,
        }
    }

    pub fn as_association(&self) -> Option<&Association> {
        match self {
            Component::Gadget(_) => None,
            Component::Association(association) => Some(association),
        }
    }
}

impl From<Gadget> for Component {
    fn from(gadget: Gadget) -> Self {
        Component::Gadget(gadget)
    }
}

impl From<Association> for Component {
    fn from(association: Association) -> Self {
        Component::Association(association)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Component {}

/// Ordered set of every component on a diagram.
#[derive(Debug, Default)]
pub struct ComponentContainer {
    components: Vec<Component>,
}

impl ComponentContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Adds a component; each identity may be present at most once.
    pub fn insert(&mut self, component: Component) -> Result<(), ModelError> {
        if self.components.contains(&component) {
            return Err(ModelError::DuplicateComponent);
        }
        debug!(component:% = component.id(); "Inserting component");
        self.components.push(component);
        Ok(())
    }

    /// Removes and returns the component with the given identity.
    pub fn remove(&mut self, id: ComponentId) -> Result<Component, ModelError> {
        let position = self
            .components
            .iter()
            .position(|component| component.id() == id)
            .ok_or(ModelError::UnknownComponent)?;
        debug!(component:% = id; "Removing component");
        Ok(self.components.remove(position))
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.components.iter().any(|component| component.id() == id)
    }

    pub fn get(&self, id: ComponentId) -> Option<&Component> {
        self.components.iter().find(|component| component.id() == id)
    }

    /// The topmost component covering `point`: the highest layer wins, and
    /// among equal layers the most recently inserted one.
    pub fn search(&self, point: Point) -> Option<&Component> {
        let mut best: Option<&Component> = None;
        for component in &self.components {
            if component.covers(point)
                && best.is_none_or(|current| component.layer() >= current.layer())
            {
                best = Some(component);
            }
        }
        best
    }

    /// All components in insertion order
    pub fn get_all(&self) -> &[Component] {
        &self.components
    }

    pub fn gadgets(&self) -> impl Iterator<Item = &Gadget> {
        self.components.iter().filter_map(Component::as_gadget)
    }

    pub fn associations(&self) -> impl Iterator<Item = &Association> {
        self.components.iter().filter_map(Component::as_association)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use easel_core::{
        color::Color,
        style::{AssociationKind, GadgetKind},
    };

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

    fn gadget(x: i32, y: i32, layer: i32) -> Gadget {
        Gadget::new(GadgetKind::Class, Point::new(x, y), layer, Color::default())
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let g = gadget(0, 0, 0);
        let mut container = ComponentContainer::new();

        container.insert(g.clone().into()).unwrap();
        let result = container.insert(g.into());
        assert!(matches!(result, Err(ModelError::DuplicateComponent)));
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_remove_returns_component() {
        let g = gadget(0, 0, 0);
        let id = ComponentId::Gadget(g.id());
        let mut container = ComponentContainer::new();
        container.insert(g.into()).unwrap();

        let removed = container.remove(id).unwrap();
        assert_eq!(removed.id(), id);
        assert!(container.is_empty());

        assert!(matches!(
            container.remove(id),
            Err(ModelError::UnknownComponent)
        ));
    }

    #[test]
    fn test_search_prefers_highest_layer() {
        // Two overlapping gadgets at the same position.
        let below = gadget(0, 0, 1);
        let above = gadget(0, 0, 5);
        let mut container = ComponentContainer::new();
        container.insert(above.clone().into()).unwrap();
        container.insert(below.into()).unwrap();

        let hit = container.search(Point::new(10, 10)).unwrap();
        assert_eq!(hit.id(), ComponentId::Gadget(above.id()));
    }

    #[test]
    fn test_search_tie_breaks_on_insertion_recency() {
        let first = gadget(0, 0, 3);
        let second = gadget(0, 0, 3);
        let mut container = ComponentContainer::new();
        container.insert(first.into()).unwrap();
        container.insert(second.clone().into()).unwrap();

        let hit = container.search(Point::new(10, 10)).unwrap();
        assert_eq!(hit.id(), ComponentId::Gadget(second.id()));
    }

    #[test]
    fn test_search_misses_return_none() {
        let g = gadget(0, 0, 0);
        let mut container = ComponentContainer::new();
        container.insert(g.into()).unwrap();

        assert!(container.search(Point::new(500, 500)).is_none());
    }

    #[test]
    fn test_search_hits_associations() {
        let a = gadget(0, 0, 0);
        let b = gadget(200, 0, 0);
        let association = Association::new(
            AssociationKind::Dependency,
            2,
            &a,
            (1.0, 0.5),
            &b,
            (0.0, 0.5),
            context(),
        )
        .unwrap();

        let mut container = ComponentContainer::new();
        container.insert(a.into()).unwrap();
        container.insert(b.into()).unwrap();
        container.insert(association.clone().into()).unwrap();

        // On the edge between the gadgets, away from both boxes.
        let hit = container.search(Point::new(120, 15)).unwrap();
        assert_eq!(hit.id(), ComponentId::Association(association.id()));
    }

    #[test]
    fn test_typed_iterators_split_components() {
        let a = gadget(0, 0, 0);
        let b = gadget(200, 200, 0);
        let association = Association::new(
            AssociationKind::Extension,
            0,
            &a,
            (0.0, 0.0),
            &b,
            (1.0, 1.0),
            context(),
        )
        .unwrap();

        let mut container = ComponentContainer::new();
        container.insert(a.into()).unwrap();
        container.insert(b.into()).unwrap();
        container.insert(association.into()).unwrap();

        assert_eq!(container.gadgets().count(), 2);
        assert_eq!(container.associations().count(), 1);
        assert_eq!(container.get_all().len(), 3);
    }
}
