//! Pure rendering of a [`FlowFrame`] into an ordered list of draw commands.
//!
//! Order is part of the contract: ring, then every entity (circle, label,
//! update count), then every relation (edge, flow-rate label, conflict badge).
//! Edges come after nodes so their gradients read from one endpoint color to
//! the other on top of the node fills.

use serde::Serialize;

use crate::domain::{FlowEntity, FlowRelation};

use super::geometry::{Point, Rgb};
use super::layout::{FlowFrame, Geometry};
use super::style::{PALETTE, StyleRegistry};

/// Caption drawn in place of nodes when a frame has no entities.
pub const EMPTY_CAPTION: &str = "No entity data available";

/// Radius of the conflict badge drawn at an edge midpoint.
pub const BADGE_RADIUS: f64 = 8.0;

/// Outline of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stroke {
    pub color: Rgb,
    pub width: f64,
}

/// How a line is colored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Paint {
    Solid(Rgb),
    /// Linear gradient from `start` at the line origin to `end` at its tip.
    Gradient { start: Rgb, end: Rgb },
}

/// Horizontal alignment of text relative to its anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    Start,
    Middle,
}

/// Font and color of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TextStyle {
    pub color: Rgb,
    pub size: f64,
    pub bold: bool,
    pub align: TextAlign,
}

impl TextStyle {
    const fn centered(color: Rgb, size: f64, bold: bool) -> Self {
        Self {
            color,
            size,
            bold,
            align: TextAlign::Middle,
        }
    }
}

/// One drawing primitive for a [`super::surface::Surface`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Circle {
        center: Point,
        radius: f64,
        fill: Option<Rgb>,
        stroke: Option<Stroke>,
    },
    Line {
        from: Point,
        to: Point,
        width: f64,
        paint: Paint,
    },
    Text {
        at: Point,
        text: String,
        style: TextStyle,
    },
}

/// Knobs the renderer reads besides the frame itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub geometry: Geometry,
    pub min_edge_width: f64,
    pub max_edge_width: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            geometry: Geometry::default(),
            min_edge_width: 1.0,
            max_edge_width: 8.0,
        }
    }
}

/// Render `frame` with `selected` (an entity id) highlighted.
#[must_use]
pub fn render(
    frame: &FlowFrame,
    selected: Option<&str>,
    options: &RenderOptions,
    styles: StyleRegistry,
) -> Vec<DrawCommand> {
    let center = options.geometry.center();
    let mut commands = vec![DrawCommand::Circle {
        center,
        radius: options.geometry.ring_radius,
        fill: None,
        stroke: Some(Stroke {
            color: PALETTE.ring,
            width: 1.0,
        }),
    }];

    if frame.is_empty() {
        commands.push(DrawCommand::Text {
            at: center,
            text: EMPTY_CAPTION.to_string(),
            style: TextStyle::centered(PALETTE.muted_text, 14.0, false),
        });
        return commands;
    }

    for entity in frame.entities() {
        let is_selected = selected == Some(entity.id.as_str());
        push_entity(&mut commands, entity, is_selected, styles);
    }

    for relation in frame.relations() {
        let (Some(source), Some(target)) = (
            frame.entity(&relation.source_id),
            frame.entity(&relation.target_id),
        ) else {
            continue;
        };
        push_relation(&mut commands, relation, source, target, options, styles);
    }

    commands
}

fn anchor(entity: &FlowEntity) -> Option<(Point, f64)> {
    entity
        .position
        .map(|p| (Point::new(p.x, p.y), p.radius))
}

fn push_entity(
    commands: &mut Vec<DrawCommand>,
    entity: &FlowEntity,
    selected: bool,
    styles: StyleRegistry,
) {
    let Some((center, radius)) = anchor(entity) else {
        return;
    };
    let style = styles.style(entity.entity_type);

    let (fill, stroke) = if selected {
        (
            PALETTE.highlight_fill,
            Some(Stroke {
                color: PALETTE.highlight_stroke,
                width: 3.0,
            }),
        )
    } else {
        (style.color, None)
    };
    commands.push(DrawCommand::Circle {
        center,
        radius,
        fill: Some(fill),
        stroke,
    });

    commands.push(DrawCommand::Text {
        at: center.offset(0.0, radius + 14.0),
        text: entity.name.clone(),
        style: TextStyle::centered(PALETTE.text, 12.0, selected),
    });

    if entity.update_count > 0 {
        commands.push(DrawCommand::Text {
            at: center.offset(0.0, radius + 28.0),
            text: format!("{} updates", entity.update_count),
            style: TextStyle::centered(PALETTE.muted_text, 10.0, false),
        });
    }
}

fn push_relation(
    commands: &mut Vec<DrawCommand>,
    relation: &FlowRelation,
    source: &FlowEntity,
    target: &FlowEntity,
    options: &RenderOptions,
    styles: StyleRegistry,
) {
    let (Some((from, _)), Some((to, _))) = (anchor(source), anchor(target)) else {
        return;
    };
    let width = relation
        .strength
        .clamp(options.min_edge_width, options.max_edge_width);
    commands.push(DrawCommand::Line {
        from,
        to,
        width: if width.is_nan() {
            options.min_edge_width
        } else {
            width
        },
        paint: Paint::Gradient {
            start: styles.style(source.entity_type).color,
            end: styles.style(target.entity_type).color,
        },
    });

    let mid = from.midpoint(to);
    if let Some(rate) = relation.flow_rate {
        commands.push(DrawCommand::Text {
            at: mid.offset(0.0, -12.0),
            text: format!("{rate:.1}/min"),
            style: TextStyle::centered(PALETTE.text, 10.0, false),
        });
    }

    if relation.has_conflict {
        commands.push(DrawCommand::Circle {
            center: mid,
            radius: BADGE_RADIUS,
            fill: Some(PALETTE.conflict_badge),
            stroke: None,
        });
        commands.push(DrawCommand::Text {
            at: mid.offset(0.0, 4.0),
            text: "!".to_string(),
            style: TextStyle::centered(PALETTE.badge_glyph, 12.0, true),
        });
    }
}
