//! Static per-entity-type styling: fill color, node radius, display label.

#![allow(missing_docs)]

use crate::domain::EntityType;

use super::geometry::Rgb;

/// Visual style of one entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityStyle {
    pub color: Rgb,
    /// Node radius in canvas units.
    pub radius: u16,
    pub label: &'static str,
}

/// Fixed colors used by the renderer outside the per-type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub ring: Rgb,
    pub text: Rgb,
    pub muted_text: Rgb,
    pub highlight_fill: Rgb,
    pub highlight_stroke: Rgb,
    pub conflict_badge: Rgb,
    pub badge_glyph: Rgb,
}

pub const PALETTE: Palette = Palette {
    ring: Rgb(0xe0, 0xe0, 0xe0),
    text: Rgb(0x33, 0x33, 0x33),
    muted_text: Rgb(0x75, 0x75, 0x75),
    highlight_fill: Rgb(0xff, 0xd5, 0x4f),
    highlight_stroke: Rgb(0xff, 0x57, 0x22),
    conflict_badge: Rgb(0xf4, 0x43, 0x36),
    badge_glyph: Rgb(0xff, 0xff, 0xff),
};

/// Exhaustive lookup from [`EntityType`] to its [`EntityStyle`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleRegistry;

impl StyleRegistry {
    #[must_use]
    pub const fn style(self, entity_type: EntityType) -> EntityStyle {
        match entity_type {
            EntityType::Client => EntityStyle {
                color: Rgb(0x4c, 0xaf, 0x50),
                radius: 30,
                label: "Client",
            },
            EntityType::Caregiver => EntityStyle {
                color: Rgb(0x21, 0x96, 0xf3),
                radius: 30,
                label: "Caregiver",
            },
            EntityType::Schedule => EntityStyle {
                color: Rgb(0xff, 0x98, 0x00),
                radius: 25,
                label: "Schedule",
            },
            EntityType::Notification => EntityStyle {
                color: Rgb(0x9c, 0x27, 0xb0),
                radius: 20,
                label: "Notification",
            },
            EntityType::Agent => EntityStyle {
                color: Rgb(0x60, 0x7d, 0x8b),
                radius: 28,
                label: "AI Agent",
            },
        }
    }

    /// Node radius as a float, for geometry.
    #[must_use]
    pub fn radius(self, entity_type: EntityType) -> f64 {
        f64::from(self.style(entity_type).radius)
    }
}
