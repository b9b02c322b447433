//! Concrete undoable operations over the container and the association index.
//!
//! Commands hold shared handles to the container and index rather than to the
//! diagram facade, so the history can outlive any particular call stack. Each
//! command captures enough state at construction (or on first execute) to
//! reverse itself exactly; cascades triggered by a removal are part of that
//! captured state and are restored wholesale on undo.

use std::cell::RefCell;
use std::rc::Rc;

use easel_core::geometry::Point;

use crate::{
    association::Association,
    command::Command,
    container::{Component, ComponentContainer, ComponentId},
    error::ModelError,
    gadget::Gadget,
    graph::AssociationIndex,
};

pub type SharedContainer = Rc<RefCell<ComponentContainer>>;
pub type SharedIndex = Rc<RefCell<AssociationIndex>>;

/// Which end of an association a re-anchor targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointRole {
    Start,
    End,
}

/// Adds a gadget to the container.
pub struct AddGadget {
    container: SharedContainer,
    gadget: Gadget,
}

impl AddGadget {
    pub fn new(container: SharedContainer, gadget: Gadget) -> Self {
        Self { container, gadget }
    }
}

impl Command for AddGadget {
    fn execute(&mut self) -> Result<(), ModelError> {
        self.container.borrow_mut().insert(self.gadget.clone().into())
    }

    fn unexecute(&mut self) -> Result<(), ModelError> {
        self.container
            .borrow_mut()
            .remove(ComponentId::Gadget(self.gadget.id()))?;
        Ok(())
    }

    fn label(&self) -> &'static str {
        "add-gadget"
    }
}

/// Adds an association to the container and files it in the index.
///
/// The association is already constructed (and therefore already observing
/// its parents) when the command first runs; re-executing after an undo
/// re-establishes the subscriptions and recomputes the draw record before
/// the edge becomes reachable again.
pub struct AddAssociation {
    container: SharedContainer,
    index: SharedIndex,
    association: Association,
}

impl AddAssociation {
    pub fn new(container: SharedContainer, index: SharedIndex, association: Association) -> Self {
        Self {
            container,
            index,
            association,
        }
    }
}

impl Command for AddAssociation {
    fn execute(&mut self) -> Result<(), ModelError> {
        self.association.register_observers()?;
        self.association.update_draw_data()?;
        self.container
            .borrow_mut()
            .insert(self.association.clone().into())?;
        self.index.borrow_mut().insert(&self.association);
        Ok(())
    }

    fn unexecute(&mut self) -> Result<(), ModelError> {
        self.index.borrow_mut().remove(&self.association);
        self.container
            .borrow_mut()
            .remove(ComponentId::Association(self.association.id()))?;
        self.association.unregister_observers();
        Ok(())
    }

    fn label(&self) -> &'static str {
        "add-association"
    }
}

/// What a removal actually took out of the model, kept for undo.
struct RemovedState {
    component: Component,
    /// Associations cascaded away with a removed gadget
    cascaded: Vec<Association>,
}

/// Removes a component; removing a gadget cascades to every association
/// touching it, as reported by the index.
pub struct RemoveComponent {
    container: SharedContainer,
    index: SharedIndex,
    id: ComponentId,
    removed: Option<RemovedState>,
}

impl RemoveComponent {
    pub fn new(container: SharedContainer, index: SharedIndex, id: ComponentId) -> Self {
        Self {
            container,
            index,
            id,
            removed: None,
        }
    }

    fn detach(&self, association: &Association) -> Result<(), ModelError> {
        self.container
            .borrow_mut()
            .remove(ComponentId::Association(association.id()))?;
        association.unregister_observers();
        Ok(())
    }

    fn reattach(&self, association: &Association) -> Result<(), ModelError> {
        association.register_observers()?;
        association.update_draw_data()?;
        self.container
            .borrow_mut()
            .insert(association.clone().into())?;
        self.index.borrow_mut().insert(association);
        Ok(())
    }
}

impl Command for RemoveComponent {
    fn execute(&mut self) -> Result<(), ModelError> {
        match self.id {
            ComponentId::Gadget(gadget_id) => {
                let cascaded = self.index.borrow_mut().remove_gadget(gadget_id);
                for association in &cascaded {
                    self.detach(association)?;
                }
                let component = self.container.borrow_mut().remove(self.id)?;
                self.removed = Some(RemovedState {
                    component,
                    cascaded,
                });
            }
            ComponentId::Association(_) => {
                let component = self.container.borrow_mut().remove(self.id)?;
                if let Some(association) = component.as_association() {
                    self.index.borrow_mut().remove(association);
                    association.unregister_observers();
                }
                self.removed = Some(RemovedState {
                    component,
                    cascaded: Vec::new(),
                });
            }
        }
        Ok(())
    }

    fn unexecute(&mut self) -> Result<(), ModelError> {
        let state = self.removed.take().ok_or(ModelError::UnknownComponent)?;

        match &state.component {
            Component::Gadget(_) => {
                self.container.borrow_mut().insert(state.component.clone())?;
                for association in &state.cascaded {
                    self.reattach(association)?;
                }
            }
            Component::Association(association) => {
                self.reattach(association)?;
            }
        }
        self.removed = Some(state);
        Ok(())
    }

    fn label(&self) -> &'static str {
        "remove-component"
    }
}

/// Moves a gadget between two absolute positions.
pub struct MoveGadget {
    gadget: Gadget,
    from: Point,
    to: Point,
}

impl MoveGadget {
    /// Captures the current position as the undo target.
    pub fn new(gadget: Gadget, to: Point) -> Self {
        let from = gadget.point();
        Self { gadget, from, to }
    }
}

impl Command for MoveGadget {
    fn execute(&mut self) -> Result<(), ModelError> {
        self.gadget.set_point(self.to)
    }

    fn unexecute(&mut self) -> Result<(), ModelError> {
        self.gadget.set_point(self.from)
    }

    fn label(&self) -> &'static str {
        "move-gadget"
    }
}

/// Rewrites the content of one gadget attribute.
pub struct EditAttribute {
    gadget: Gadget,
    group: usize,
    index: usize,
    old_content: String,
    new_content: String,
}

impl EditAttribute {
    /// Captures the current content as the undo target; fails when the
    /// attribute does not exist.
    pub fn new(
        gadget: Gadget,
        group: usize,
        index: usize,
        new_content: &str,
    ) -> Result<Self, ModelError> {
        let old_content = gadget.attribute_content(group, index)?;
        Ok(Self {
            gadget,
            group,
            index,
            old_content,
            new_content: new_content.to_string(),
        })
    }
}

impl Command for EditAttribute {
    fn execute(&mut self) -> Result<(), ModelError> {
        self.gadget
            .set_attribute_content(self.group, self.index, &self.new_content)
    }

    fn unexecute(&mut self) -> Result<(), ModelError> {
        self.gadget
            .set_attribute_content(self.group, self.index, &self.old_content)
    }

    fn label(&self) -> &'static str {
        "edit-attribute"
    }
}

/// Re-anchors one endpoint of an association onto another gadget (or another
/// ratio on the same gadget), keeping the index bucket in step.
pub struct ReanchorAssociation {
    index: SharedIndex,
    association: Association,
    role: EndpointRole,
    old_parent: Gadget,
    old_ratio: (f64, f64),
    new_parent: Gadget,
    new_ratio: (f64, f64),
}

impl ReanchorAssociation {
    /// Captures the current endpoint as the undo target. `old_parent` must be
    /// the gadget the endpoint currently anchors to; it is held strongly so
    /// undo can re-anchor even if nothing else kept it alive.
    pub fn new(
        index: SharedIndex,
        association: Association,
        role: EndpointRole,
        old_parent: Gadget,
        new_parent: Gadget,
        new_ratio: (f64, f64),
    ) -> Self {
        let old_ratio = match role {
            EndpointRole::Start => association.start_ratio(),
            EndpointRole::End => association.end_ratio(),
        };
        Self {
            index,
            association,
            role,
            old_parent,
            old_ratio,
            new_parent,
            new_ratio,
        }
    }

    fn reanchor(&self, parent: &Gadget, ratio: (f64, f64)) -> Result<(), ModelError> {
        let old_start = self.association.start_id();
        let old_end = self.association.end_id();
        match self.role {
            EndpointRole::Start => self.association.set_parent_start(parent, ratio)?,
            EndpointRole::End => self.association.set_parent_end(parent, ratio)?,
        }
        self.index
            .borrow_mut()
            .update(&self.association, old_start, old_end)
    }
}

impl Command for ReanchorAssociation {
    fn execute(&mut self) -> Result<(), ModelError> {
        let parent = self.new_parent.clone();
        self.reanchor(&parent, self.new_ratio)
    }

    fn unexecute(&mut self) -> Result<(), ModelError> {
        let parent = self.old_parent.clone();
        self.reanchor(&parent, self.old_ratio)
    }

    fn label(&self) -> &'static str {
        "reanchor-association"
    }
}

#[cfg(test)]
mod tests {
    use easel_core::{
        color::Color,
        style::{AssociationKind, GadgetKind},
    };

    use super::*;
    use crate::attribute::{Attribute, TextContext};
    use crate::command::CommandManager;
    use crate::config::AppConfig;
    use crate::testing::FixedMeasurer;

    struct World {
        container: SharedContainer,
        index: SharedIndex,
        context: Rc<TextContext>,
        manager: CommandManager,
    }

    impl World {
        fn new() -> Self {
            Self {
                container: Rc::new(RefCell::new(ComponentContainer::new())),
                index: Rc::new(RefCell::new(AssociationIndex::new())),
                context: Rc::new(TextContext::new(
                    Rc::new(FixedMeasurer),
                    &AppConfig::default(),
                )),
                manager: CommandManager::new(20),
            }
        }

        fn add_gadget(&mut self, x: i32, y: i32) -> Gadget {
            let gadget = Gadget::new(GadgetKind::Class, Point::new(x, y), 0, Color::default());
            self.manager
                .execute(Box::new(AddGadget::new(
                    self.container.clone(),
                    gadget.clone(),
                )))
                .unwrap();
            gadget
        }

        fn add_association(&mut self, start: &Gadget, end: &Gadget) -> Association {
            let association = Association::new(
                AssociationKind::Dependency,
                0,
                start,
                (0.0, 0.0),
                end,
                (1.0, 1.0),
                self.context.clone(),
            )
            .unwrap();
            self.manager
                .execute(Box::new(AddAssociation::new(
                    self.container.clone(),
                    self.index.clone(),
                    association.clone(),
                )))
                .unwrap();
            association
        }
    }

    #[test]
    fn test_add_gadget_round_trip() {
        let mut world = World::new();
        let gadget = world.add_gadget(0, 0);
        assert_eq!(world.container.borrow().len(), 1);

        world.manager.undo().unwrap();
        assert!(world.container.borrow().is_empty());

        world.manager.redo().unwrap();
        assert!(
            world
                .container
                .borrow()
                .contains(ComponentId::Gadget(gadget.id()))
        );
    }

    #[test]
    fn test_add_association_files_in_index() {
        let mut world = World::new();
        let a = world.add_gadget(0, 0);
        let b = world.add_gadget(200, 200);
        let association = world.add_association(&a, &b);

        assert_eq!(world.index.borrow().len(), 1);
        assert_eq!(world.container.borrow().len(), 3);

        world.manager.undo().unwrap();
        assert!(world.index.borrow().is_empty());
        assert_eq!(a.observer_count(), 0);

        world.manager.redo().unwrap();
        assert_eq!(world.index.borrow().len(), 1);
        assert!(a.has_observer(association.observer_key()));
    }

    #[test]
    fn test_remove_gadget_cascades_and_undo_restores() {
        let mut world = World::new();
        let a = world.add_gadget(0, 0);
        let b = world.add_gadget(200, 200);
        let c = world.add_gadget(400, 0);
        let ab = world.add_association(&a, &b);
        let bc = world.add_association(&b, &c);
        world.add_association(&a, &c);

        world
            .manager
            .execute(Box::new(RemoveComponent::new(
                world.container.clone(),
                world.index.clone(),
                ComponentId::Gadget(b.id()),
            )))
            .unwrap();

        // Gadget b and both touching edges are gone; a-c survives.
        assert_eq!(world.container.borrow().len(), 3);
        assert_eq!(world.index.borrow().len(), 1);
        assert!(!world.container.borrow().contains(ComponentId::Gadget(b.id())));
        assert_eq!(b.observer_count(), 0);

        world.manager.undo().unwrap();
        assert_eq!(world.container.borrow().len(), 6);
        assert_eq!(world.index.borrow().len(), 3);
        assert!(b.has_observer(ab.observer_key()));
        assert!(b.has_observer(bc.observer_key()));

        // Restored edges track the restored gadget again.
        b.set_point(Point::new(250, 250)).unwrap();
        assert_eq!(ab.draw_data().end, Point::new(290, 280));
    }

    #[test]
    fn test_remove_association_alone() {
        let mut world = World::new();
        let a = world.add_gadget(0, 0);
        let b = world.add_gadget(200, 200);
        let association = world.add_association(&a, &b);

        world
            .manager
            .execute(Box::new(RemoveComponent::new(
                world.container.clone(),
                world.index.clone(),
                ComponentId::Association(association.id()),
            )))
            .unwrap();

        assert_eq!(world.container.borrow().len(), 2);
        assert!(world.index.borrow().is_empty());
        assert_eq!(a.observer_count(), 0);

        world.manager.undo().unwrap();
        assert_eq!(world.container.borrow().len(), 3);
        assert_eq!(world.index.borrow().len(), 1);
    }

    #[test]
    fn test_remove_unknown_component_fails() {
        let mut world = World::new();
        let orphan = Gadget::new(GadgetKind::Actor, Point::new(0, 0), 0, Color::default());

        let result = world.manager.execute(Box::new(RemoveComponent::new(
            world.container.clone(),
            world.index.clone(),
            ComponentId::Gadget(orphan.id()),
        )));
        assert!(matches!(result, Err(ModelError::UnknownComponent)));
        assert!(!world.manager.can_undo());
    }

    #[test]
    fn test_move_gadget_round_trip() {
        let mut world = World::new();
        let gadget = world.add_gadget(10, 20);

        world
            .manager
            .execute(Box::new(MoveGadget::new(
                gadget.clone(),
                Point::new(100, 200),
            )))
            .unwrap();
        assert_eq!(gadget.point(), Point::new(100, 200));

        world.manager.undo().unwrap();
        assert_eq!(gadget.point(), Point::new(10, 20));

        world.manager.redo().unwrap();
        assert_eq!(gadget.point(), Point::new(100, 200));
    }

    #[test]
    fn test_edit_attribute_round_trip() {
        let mut world = World::new();
        let gadget = world.add_gadget(0, 0);
        gadget.add_group().unwrap();
        gadget
            .push_attribute(0, Attribute::new(world.context.clone(), "old").unwrap())
            .unwrap();

        let command = EditAttribute::new(gadget.clone(), 0, 0, "new").unwrap();
        world.manager.execute(Box::new(command)).unwrap();
        assert_eq!(gadget.attribute_content(0, 0).unwrap(), "new");

        world.manager.undo().unwrap();
        assert_eq!(gadget.attribute_content(0, 0).unwrap(), "old");
    }

    #[test]
    fn test_edit_missing_attribute_fails_at_construction() {
        let gadget = Gadget::new(GadgetKind::Class, Point::new(0, 0), 0, Color::default());
        assert!(EditAttribute::new(gadget, 0, 0, "x").is_err());
    }

    #[test]
    fn test_reanchor_updates_index_bucket() {
        let mut world = World::new();
        let a = world.add_gadget(0, 0);
        let b = world.add_gadget(200, 200);
        let c = world.add_gadget(400, 0);
        let association = world.add_association(&a, &b);

        world
            .manager
            .execute(Box::new(ReanchorAssociation::new(
                world.index.clone(),
                association.clone(),
                EndpointRole::Start,
                a.clone(),
                c.clone(),
                (0.0, 0.5),
            )))
            .unwrap();

        assert_eq!(association.start_id(), c.id());
        assert!(world.index.borrow().find_start(a.id()).is_empty());
        assert_eq!(
            world.index.borrow().find_start_end(c.id(), b.id()),
            vec![association.clone()]
        );

        world.manager.undo().unwrap();
        assert_eq!(association.start_id(), a.id());
        assert_eq!(
            world.index.borrow().find_start_end(a.id(), b.id()),
            vec![association]
        );
    }
}
