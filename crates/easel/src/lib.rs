//! The Easel diagram model.
//!
//! This crate owns the editable state of a diagram: gadget nodes, association
//! edges, their text attributes, the hit-testable component container, the
//! association index and the bounded undo history. Rendering and input
//! handling live in the host; the model hands out render-ready draw records
//! (see `easel_core::draw`) that are recomputed synchronously on every
//! mutation.
//!
//! [`Diagram`] is the intended entry point. It wires a text measurer and an
//! [`config::AppConfig`] into a shared [`attribute::TextContext`], routes
//! reversible mutations through [`command::CommandManager`], and keeps the
//! container and index consistent across removal cascades and undo.
//!
//! The lower-level pieces are public for hosts that need finer control:
//! entities can be created and composed directly, at the price of doing the
//! container/index bookkeeping by hand.

pub mod association;
pub mod attribute;
pub mod command;
pub mod commands;
pub mod config;
pub mod container;
pub mod error;
pub mod gadget;
pub mod graph;
pub mod identifier;
pub mod persist;
pub mod testing;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::SystemTime;

use easel_core::{
    color::Color,
    draw::DiagramDrawData,
    geometry::Point,
    style::{AssociationKind, GadgetKind},
    text::TextMeasurer,
};
use log::info;

use crate::{
    association::Association,
    attribute::TextContext,
    command::CommandManager,
    commands::{
        AddAssociation, AddGadget, EditAttribute, EndpointRole, MoveGadget, ReanchorAssociation,
        RemoveComponent, SharedContainer, SharedIndex,
    },
    config::AppConfig,
    container::{Component, ComponentContainer, ComponentId},
    error::ModelError,
    gadget::Gadget,
    graph::AssociationIndex,
    persist::DiagramRecord,
};

/// Undo depth kept by default
const DEFAULT_HISTORY_LIMIT: usize = 30;

/// An editable diagram: the container, index and history behind one canvas.
pub struct Diagram {
    background: Color,
    margin: i32,
    line_width: i32,
    history_limit: usize,
    context: Rc<TextContext>,
    container: SharedContainer,
    index: SharedIndex,
    manager: CommandManager,
}

impl Diagram {
    /// Creates an empty diagram. Fails when the configured background color
    /// does not parse; an absent background defaults to white.
    pub fn new(config: &AppConfig, measurer: Rc<dyn TextMeasurer>) -> Result<Self, ModelError> {
        Self::with_history_limit(config, measurer, DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(
        config: &AppConfig,
        measurer: Rc<dyn TextMeasurer>,
        history_limit: usize,
    ) -> Result<Self, ModelError> {
        let background = config
            .style
            .background_color()
            .map_err(ModelError::Parse)?
            .map_or_else(|| Color::new("white").map_err(ModelError::Parse), Ok)?;

        Ok(Self {
            background,
            margin: config.style.margin,
            line_width: config.style.line_width,
            history_limit,
            context: Rc::new(TextContext::new(measurer, config)),
            container: Rc::new(RefCell::new(ComponentContainer::new())),
            index: Rc::new(RefCell::new(AssociationIndex::new())),
            manager: CommandManager::new(history_limit),
        })
    }

    /// The measurement context shared with every attribute on this diagram
    pub fn context(&self) -> Rc<TextContext> {
        self.context.clone()
    }

    pub fn component_count(&self) -> usize {
        self.container.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.container.borrow().is_empty()
    }

    // --- reversible mutations ---------------------------------------------

    /// Adds a gadget at `point` on layer 0 with the default fill.
    pub fn add_gadget(&mut self, kind: GadgetKind, point: Point) -> Result<Gadget, ModelError> {
        self.add_gadget_with(kind, point, 0, Color::default())
    }

    pub fn add_gadget_with(
        &mut self,
        kind: GadgetKind,
        point: Point,
        layer: i32,
        color: Color,
    ) -> Result<Gadget, ModelError> {
        let gadget = Gadget::new(kind, point, layer, color);
        self.manager.execute(Box::new(AddGadget::new(
            self.container.clone(),
            gadget.clone(),
        )))?;
        Ok(gadget)
    }

    /// Creates an association between two gadgets already on the diagram and
    /// files it in the index.
    pub fn add_association(
        &mut self,
        kind: AssociationKind,
        start: &Gadget,
        start_ratio: (f64, f64),
        end: &Gadget,
        end_ratio: (f64, f64),
    ) -> Result<Association, ModelError> {
        let association = Association::new(
            kind,
            0,
            start,
            start_ratio,
            end,
            end_ratio,
            self.context.clone(),
        )?;
        self.manager.execute(Box::new(AddAssociation::new(
            self.container.clone(),
            self.index.clone(),
            association.clone(),
        )))?;
        Ok(association)
    }

    /// Removes a component. Removing a gadget cascades to every association
    /// touching it; one undo restores the whole cascade.
    pub fn remove_component(&mut self, id: ComponentId) -> Result<(), ModelError> {
        self.manager.execute(Box::new(RemoveComponent::new(
            self.container.clone(),
            self.index.clone(),
            id,
        )))
    }

    pub fn move_gadget(&mut self, gadget: &Gadget, to: Point) -> Result<(), ModelError> {
        self.manager
            .execute(Box::new(MoveGadget::new(gadget.clone(), to)))
    }

    /// Rewrites one gadget attribute's content.
    pub fn edit_attribute(
        &mut self,
        gadget: &Gadget,
        group: usize,
        index: usize,
        content: &str,
    ) -> Result<(), ModelError> {
        let command = EditAttribute::new(gadget.clone(), group, index, content)?;
        self.manager.execute(Box::new(command))
    }

    /// Re-anchors one end of an association onto `new_parent` at `ratio`.
    ///
    /// The current parent must still be on the diagram; it becomes the undo
    /// target.
    pub fn reanchor_association(
        &mut self,
        association: &Association,
        role: EndpointRole,
        new_parent: &Gadget,
        ratio: (f64, f64),
    ) -> Result<(), ModelError> {
        let old_id = match role {
            EndpointRole::Start => association.start_id(),
            EndpointRole::End => association.end_id(),
        };
        let old_parent = self
            .container
            .borrow()
            .get(ComponentId::Gadget(old_id))
            .and_then(Component::as_gadget)
            .cloned()
            .ok_or(ModelError::DetachedEndpoint)?;

        self.manager.execute(Box::new(ReanchorAssociation::new(
            self.index.clone(),
            association.clone(),
            role,
            old_parent,
            new_parent.clone(),
            ratio,
        )))
    }

    // --- history ----------------------------------------------------------

    pub fn undo(&mut self) -> Result<(), ModelError> {
        self.manager.undo()
    }

    pub fn redo(&mut self) -> Result<(), ModelError> {
        self.manager.redo()
    }

    pub fn can_undo(&self) -> bool {
        self.manager.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.manager.can_redo()
    }

    /// Timestamp of the last applied change; undo rolls it back
    pub fn last_modified(&self) -> SystemTime {
        self.manager.last_modified()
    }

    // --- queries ----------------------------------------------------------

    /// The topmost component covering `point`
    pub fn search(&self, point: Point) -> Option<Component> {
        self.container.borrow().search(point).cloned()
    }

    /// Associations touching the gadget at either end
    pub fn associations_of(&self, gadget: &Gadget) -> Vec<Association> {
        self.index.borrow().find_either(gadget.id())
    }

    /// Toggles the selection flag of the association under `point`; returns
    /// whether a hit was toggled. Selection is presentation state and is not
    /// recorded in the undo history.
    pub fn toggle_selection(&mut self, point: Point) -> Result<bool, ModelError> {
        let hit = self
            .search(point)
            .and_then(|component| component.as_association().cloned());
        match hit {
            Some(association) => {
                association.set_selected(!association.selected())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Assembles the full renderable tree, components in insertion order.
    pub fn draw_data(&self) -> DiagramDrawData {
        let container = self.container.borrow();
        DiagramDrawData {
            background: self.background,
            margin: self.margin,
            line_width: self.line_width,
            gadgets: container.gadgets().map(Gadget::draw_data).collect(),
            associations: container
                .associations()
                .map(Association::draw_data)
                .collect(),
        }
    }

    // --- persistence ------------------------------------------------------

    /// Snapshots the diagram contents into a persistable record.
    pub fn snapshot(&self) -> Result<DiagramRecord, ModelError> {
        persist::snapshot_diagram(&self.container.borrow())
    }

    /// Replaces the diagram contents with a materialized record.
    ///
    /// The record is materialized in full before anything is replaced, so a
    /// failed load leaves the diagram untouched. The undo history is
    /// discarded on success.
    pub fn load(&mut self, record: &DiagramRecord) -> Result<(), ModelError> {
        let (gadgets, associations) = persist::materialize_diagram(record, &self.context)?;

        *self.container.borrow_mut() = ComponentContainer::new();
        *self.index.borrow_mut() = AssociationIndex::new();
        self.manager = CommandManager::new(self.history_limit);

        {
            let mut container = self.container.borrow_mut();
            for gadget in gadgets {
                container.insert(gadget.into())?;
            }
            let mut index = self.index.borrow_mut();
            for association in associations {
                index.insert(&association);
                container.insert(association.into())?;
            }
        }
        info!(components = self.container.borrow().len(); "Loaded diagram");
        Ok(())
    }
}

impl std::fmt::Debug for Diagram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagram")
            .field("components", &self.container.borrow().len())
            .field("indexed", &self.index.borrow().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixedMeasurer;

    fn diagram() -> Diagram {
        Diagram::new(&AppConfig::default(), Rc::new(FixedMeasurer)).unwrap()
    }

    #[test]
    fn test_empty_diagram_draw_data() {
        let diagram = diagram();
        let data = diagram.draw_data();

        assert_eq!(data.margin, 20);
        assert_eq!(data.line_width, 1);
        assert_eq!(data.background, Color::new("white").unwrap());
        assert!(data.gadgets.is_empty());
        assert!(data.associations.is_empty());
    }

    #[test]
    fn test_invalid_background_rejected_at_construction() {
        let config: AppConfig = toml::from_str(
            r#"
            [style]
            background_color = "no-such-color"
            "#,
        )
        .unwrap();
        let result = Diagram::new(&config, Rc::new(FixedMeasurer));
        assert!(matches!(result, Err(ModelError::Parse(_))));
    }

    #[test]
    fn test_add_and_search() {
        let mut diagram = diagram();
        let gadget = diagram
            .add_gadget(GadgetKind::Class, Point::new(50, 50))
            .unwrap();

        let hit = diagram.search(Point::new(60, 60)).unwrap();
        assert_eq!(hit.id(), ComponentId::Gadget(gadget.id()));
        assert!(diagram.search(Point::new(500, 500)).is_none());
    }

    #[test]
    fn test_draw_data_reflects_association() {
        let mut diagram = diagram();
        let a = diagram
            .add_gadget(GadgetKind::Class, Point::new(0, 0))
            .unwrap();
        let b = diagram
            .add_gadget(GadgetKind::Class, Point::new(200, 0))
            .unwrap();
        diagram
            .add_association(AssociationKind::Extension, &a, (1.0, 0.5), &b, (0.0, 0.5))
            .unwrap();

        let data = diagram.draw_data();
        assert_eq!(data.gadgets.len(), 2);
        assert_eq!(data.associations.len(), 1);
        assert_eq!(data.associations[0].start, Point::new(40, 15));
    }

    #[test]
    fn test_toggle_selection_on_association_hit() {
        let mut diagram = diagram();
        let a = diagram
            .add_gadget(GadgetKind::Class, Point::new(0, 0))
            .unwrap();
        let b = diagram
            .add_gadget(GadgetKind::Class, Point::new(200, 0))
            .unwrap();
        let association = diagram
            .add_association(AssociationKind::Dependency, &a, (1.0, 0.5), &b, (0.0, 0.5))
            .unwrap();

        assert!(diagram.toggle_selection(Point::new(120, 15)).unwrap());
        assert!(association.selected());
        assert!(diagram.toggle_selection(Point::new(120, 15)).unwrap());
        assert!(!association.selected());

        // A miss toggles nothing.
        assert!(!diagram.toggle_selection(Point::new(500, 500)).unwrap());
    }

    #[test]
    fn test_reanchor_requires_old_parent_on_diagram() {
        let mut diagram = diagram();
        let a = diagram
            .add_gadget(GadgetKind::Class, Point::new(0, 0))
            .unwrap();
        let b = diagram
            .add_gadget(GadgetKind::Class, Point::new(200, 200))
            .unwrap();
        let c = diagram
            .add_gadget(GadgetKind::Class, Point::new(400, 0))
            .unwrap();
        let association = diagram
            .add_association(AssociationKind::Dependency, &a, (0.0, 0.0), &b, (1.0, 1.0))
            .unwrap();

        diagram
            .reanchor_association(&association, EndpointRole::Start, &c, (0.0, 0.5))
            .unwrap();
        assert_eq!(association.start_id(), c.id());

        diagram.undo().unwrap();
        assert_eq!(association.start_id(), a.id());
    }
}
