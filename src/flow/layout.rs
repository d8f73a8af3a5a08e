//! Circular layout: entity `i` of `N` sits at angle `i · 2π / N` on a ring of
//! fixed radius around the canvas center.
//!
//! Positions are a pure function of the ordered entity list and the
//! [`Geometry`]. [`FlowFrame`] is the one place that writes them back onto the
//! entities, so hit-testing always sees the positions of the last layout pass.

use std::f64::consts::TAU;

use crate::domain::{FlowEntity, FlowRelation, Position};

use super::geometry::Point;
use super::style::StyleRegistry;

/// Canvas dimensions and ring radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub width: f64,
    pub height: f64,
    pub ring_radius: f64,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            ring_radius: 150.0,
        }
    }
}

impl Geometry {
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Angle in radians of slot `index` among `count` slots.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn slot_angle(index: usize, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    index as f64 * (TAU / count as f64)
}

/// Compute one position per entity, in input order.
#[must_use]
pub fn layout(entities: &[FlowEntity], geometry: &Geometry, styles: StyleRegistry) -> Vec<Position> {
    let center = geometry.center();
    let count = entities.len();
    entities
        .iter()
        .enumerate()
        .map(|(index, entity)| {
            let angle = slot_angle(index, count);
            Position {
                x: geometry.ring_radius.mul_add(angle.cos(), center.x),
                y: geometry.ring_radius.mul_add(angle.sin(), center.y),
                radius: styles.radius(entity.entity_type),
            }
        })
        .collect()
}

/// Entities (with computed positions) and relations of one fetch cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowFrame {
    entities: Vec<FlowEntity>,
    relations: Vec<FlowRelation>,
}

impl FlowFrame {
    /// Lay out `entities` and store each position on its entity.
    ///
    /// With `sort_by_id` the entities are ordered by id first so that
    /// unchanged data keeps its slots across refreshes.
    #[must_use]
    pub fn build(
        mut entities: Vec<FlowEntity>,
        relations: Vec<FlowRelation>,
        geometry: &Geometry,
        styles: StyleRegistry,
        sort_by_id: bool,
    ) -> Self {
        if sort_by_id {
            entities.sort_by(|a, b| a.id.cmp(&b.id));
        }
        let positions = layout(&entities, geometry, styles);
        for (entity, position) in entities.iter_mut().zip(positions) {
            entity.position = Some(position);
        }
        Self {
            entities,
            relations,
        }
    }

    /// Entities in render order.
    #[must_use]
    pub fn entities(&self) -> &[FlowEntity] {
        &self.entities
    }

    #[must_use]
    pub fn relations(&self) -> &[FlowRelation] {
        &self.relations
    }

    #[must_use]
    pub fn entity(&self, id: &str) -> Option<&FlowEntity> {
        self.entities.iter().find(|e| e.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entity(id).is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
