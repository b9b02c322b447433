//! Persisted record types and the bridge between records and live entities.
//!
//! Records are plain serde data: no ids, no back-references. Associations
//! refer to their parents by position in the gadget list, so a record set is
//! self-contained and stable across processes where generated ids are not.
//!
//! Materialization is gadget-first: every gadget is rebuilt before any
//! association resolves its parent indices, so edges can reference gadgets
//! in any order. Kind tags and style bits are validated at this seam; a
//! record that names an unknown tag fails the whole load.

use std::rc::Rc;

use log::info;
use serde::{Deserialize, Serialize};

use easel_core::{
    color::Color,
    draw::AttributeDrawData,
    geometry::Point,
    style::{AssociationKind, GadgetKind, TextStyle},
};

use crate::{
    association::Association,
    attribute::{Attribute, TextContext},
    container::ComponentContainer,
    error::ModelError,
    gadget::Gadget,
    identifier::GadgetId,
};

/// A named project holding any number of diagrams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub name: String,
    pub diagrams: Vec<DiagramRecord>,
}

/// One diagram's full contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagramRecord {
    pub gadgets: Vec<GadgetRecord>,
    pub associations: Vec<AssociationRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GadgetRecord {
    /// Kind name tag, e.g. `class`
    pub kind: String,
    pub x: i32,
    pub y: i32,
    pub layer: i32,
    /// CSS color string
    pub color: String,
    pub groups: Vec<Vec<AttributeRecord>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub content: String,
    pub size: u16,
    /// Text style bit set
    pub style: u8,
    pub font_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchoredAttributeRecord {
    pub ratio: f64,
    #[serde(flatten)]
    pub attribute: AttributeRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationRecord {
    /// Kind bit value
    pub kind: u8,
    pub layer: i32,
    /// Position of the start parent in the gadget list
    pub start: usize,
    pub start_ratio: (f64, f64),
    /// Position of the end parent in the gadget list
    pub end: usize,
    pub end_ratio: (f64, f64),
    pub attributes: Vec<AnchoredAttributeRecord>,
}

impl AttributeRecord {
    fn from_draw_data(data: &AttributeDrawData) -> Self {
        Self {
            content: data.content.clone(),
            size: data.size,
            style: data.style.bits(),
            font_file: data.font_file.clone(),
        }
    }

    /// Applies the persisted fields onto a freshly created attribute.
    fn apply(&self, attribute: &mut Attribute) -> Result<(), ModelError> {
        attribute.set_size(self.size)?;
        let style =
            TextStyle::from_bits(self.style).ok_or(ModelError::UnsupportedTextStyle(self.style))?;
        attribute.set_style(style)?;
        attribute.set_font_file(&self.font_file)
    }
}

/// Snapshots the container into a diagram record.
///
/// Fails with [`ModelError::DetachedEndpoint`] if an association references a
/// gadget that is not in the container.
pub fn snapshot_diagram(container: &ComponentContainer) -> Result<DiagramRecord, ModelError> {
    let gadgets: Vec<&Gadget> = container.gadgets().collect();
    let position_of = |id: GadgetId| -> Result<usize, ModelError> {
        gadgets
            .iter()
            .position(|gadget| gadget.id() == id)
            .ok_or(ModelError::DetachedEndpoint)
    };

    let mut record = DiagramRecord::default();
    for gadget in &gadgets {
        record.gadgets.push(snapshot_gadget(gadget));
    }
    for association in container.associations() {
        let data = association.draw_data();
        record.associations.push(AssociationRecord {
            kind: association.kind().bits(),
            layer: association.layer(),
            start: position_of(association.start_id())?,
            start_ratio: association.start_ratio(),
            end: position_of(association.end_id())?,
            end_ratio: association.end_ratio(),
            attributes: data
                .attributes
                .iter()
                .map(|anchored| AnchoredAttributeRecord {
                    ratio: anchored.ratio,
                    attribute: AttributeRecord::from_draw_data(&anchored.attribute),
                })
                .collect(),
        });
    }
    Ok(record)
}

fn snapshot_gadget(gadget: &Gadget) -> GadgetRecord {
    let point = gadget.point();
    GadgetRecord {
        kind: gadget.kind().as_str().to_string(),
        x: point.x(),
        y: point.y(),
        layer: gadget.layer(),
        color: gadget.color().to_string(),
        groups: gadget
            .grouped_attributes()
            .iter()
            .map(|group| group.iter().map(AttributeRecord::from_draw_data).collect())
            .collect(),
    }
}

/// Rebuilds live entities from a diagram record.
///
/// Gadgets come back in record order; associations resolve their parent
/// indices against that order. The returned entities are not yet inserted
/// into any container or index.
pub fn materialize_diagram(
    record: &DiagramRecord,
    context: &Rc<TextContext>,
) -> Result<(Vec<Gadget>, Vec<Association>), ModelError> {
    let mut gadgets = Vec::with_capacity(record.gadgets.len());
    for gadget_record in &record.gadgets {
        gadgets.push(materialize_gadget(gadget_record, context)?);
    }

    let mut associations = Vec::with_capacity(record.associations.len());
    for association_record in &record.associations {
        let kind = AssociationKind::from_bits(association_record.kind)
            .ok_or(ModelError::UnsupportedAssociationKind(association_record.kind))?;
        let start = gadget_at(&gadgets, association_record.start)?;
        let end = gadget_at(&gadgets, association_record.end)?;

        let association = Association::new(
            kind,
            association_record.layer,
            start,
            association_record.start_ratio,
            end,
            association_record.end_ratio,
            context.clone(),
        )?;
        for (position, anchored) in association_record.attributes.iter().enumerate() {
            association.add_attribute(-1, anchored.ratio, &anchored.attribute.content)?;
            association.update_attribute(position, |attribute| anchored.attribute.apply(attribute))?;
        }
        associations.push(association);
    }

    info!(
        gadgets = gadgets.len(),
        associations = associations.len();
        "Materialized diagram"
    );
    Ok((gadgets, associations))
}

fn materialize_gadget(
    record: &GadgetRecord,
    context: &Rc<TextContext>,
) -> Result<Gadget, ModelError> {
    let kind: GadgetKind = record
        .kind
        .parse()
        .map_err(|_| ModelError::Parse(format!("unknown gadget kind `{}`", record.kind)))?;
    let color = Color::new(&record.color).map_err(ModelError::Parse)?;

    let gadget = Gadget::new(kind, Point::new(record.x, record.y), record.layer, color);
    for group_record in &record.groups {
        let group = gadget.add_group()?;
        for attribute_record in group_record {
            let mut attribute = Attribute::new(context.clone(), &attribute_record.content)?;
            attribute_record.apply(&mut attribute)?;
            gadget.push_attribute(group, attribute)?;
        }
    }
    Ok(gadget)
}

fn gadget_at(gadgets: &[Gadget], position: usize) -> Result<&Gadget, ModelError> {
    gadgets.get(position).ok_or_else(|| {
        ModelError::Parse(format!(
            "association references gadget {position} of {}",
            gadgets.len()
        ))
    })
}
