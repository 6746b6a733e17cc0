//! Zoom/pan, hit testing and hover spotlighting over a layout snapshot.

use std::collections::HashMap;

use serde::Serialize;

use super::{LayoutSnapshot, LinkPosition};

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 4.0;

/// Opacity of nodes outside the spotlight.
const DIMMED_NODE: f64 = 0.1;
const DIMMED_LINK: f64 = 0.05;
const BASE_LINK_OPACITY: f64 = 0.4;
const BASE_ARROW_OPACITY: f64 = 0.6;
const BASE_LINK_COLOR: &str = "#64b5f6";
const HIGHLIGHT_LINK_COLOR: &str = "#fbbf24";

/// Text shown on the hover card when no persona is known for a user.
pub const PERSONA_PLACEHOLDER: &str = "No AI summary available yet (Run AI Analysis first).";

/// Screen transform: `screen = world * scale + translate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
        }
    }
}

impl Viewport {
    /// A viewport from untrusted values: the scale is clamped to 0.1..=4 and
    /// non-finite components fall back to the identity.
    #[must_use]
    pub fn new(scale: f64, translate_x: f64, translate_y: f64) -> Self {
        let finite_or = |v: f64, fallback: f64| if v.is_finite() { v } else { fallback };
        let scale = if scale.is_finite() && scale > 0.0 {
            scale.clamp(MIN_SCALE, MAX_SCALE)
        } else {
            1.0
        };
        Self {
            scale,
            translate_x: finite_or(translate_x, 0.0),
            translate_y: finite_or(translate_y, 0.0),
        }
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub fn to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        (
            (sx - self.translate_x) / self.scale,
            (sy - self.translate_y) / self.scale,
        )
    }

    #[must_use]
    pub fn to_screen(&self, wx: f64, wy: f64) -> (f64, f64) {
        (
            wx * self.scale + self.translate_x,
            wy * self.scale + self.translate_y,
        )
    }

    /// Multiply the scale by `factor`, keeping the world point under the
    /// screen pointer `(sx, sy)` fixed. The scale stays within 0.1..=4.
    pub fn zoom_at(&mut self, factor: f64, sx: f64, sy: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let (wx, wy) = self.to_world(sx, sy);
        self.scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        self.translate_x = sx - wx * self.scale;
        self.translate_y = sy - wy * self.scale;
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.translate_x += dx;
        self.translate_y += dy;
    }
}

/// A node held at a world position, written `id,x,y` in page links.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pin {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

impl Pin {
    /// Parse `id,x,y`. The id may itself contain commas.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let mut parts = input.trim().rsplitn(3, ',');
        let y = parts.next()?.trim().parse::<f64>().ok()?;
        let x = parts.next()?.trim().parse::<f64>().ok()?;
        let id = parts.next()?.trim();
        if id.is_empty() || !x.is_finite() || !y.is_finite() {
            return None;
        }
        Some(Self {
            id: id.to_string(),
            x,
            y,
        })
    }

    /// Parse a `;`-separated list, skipping malformed entries. A later pin
    /// of the same node replaces an earlier one.
    #[must_use]
    pub fn parse_list(input: &str) -> Vec<Self> {
        let mut pins: Vec<Self> = Vec::new();
        for pin in input.split(';').filter_map(Self::parse) {
            pins.retain(|p| p.id != pin.id);
            pins.push(pin);
        }
        pins
    }

    #[must_use]
    pub fn encode_list(pins: &[Self]) -> String {
        pins.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl std::fmt::Display for Pin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{:.0},{:.0}", self.id, self.x, self.y)
    }
}

/// The node under world point `(x, y)`. Later nodes are drawn on top, so
/// they win ties.
#[must_use]
pub fn hit_test(snapshot: &LayoutSnapshot, x: f64, y: f64) -> Option<&str> {
    snapshot
        .nodes
        .iter()
        .rev()
        .find(|n| (n.x - x).hypot(n.y - y) <= n.radius)
        .map(|n| n.id.as_str())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkStyle {
    pub color: &'static str,
    pub opacity: f64,
    /// Opacity of the direction marker drawn at the link's midpoint.
    pub arrow_opacity: f64,
}

/// Per-node and per-link emphasis for the current hover.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spotlight {
    /// Indexed like the snapshot's nodes.
    pub node_opacity: Vec<f64>,
    /// Indexed like the snapshot's links.
    pub links: Vec<LinkStyle>,
}

/// Emphasise the hovered node and everyone who liked it.
///
/// A node stays lit if it is the hovered node or has a link into it; only
/// links ending at the hovered node are highlighted. Outgoing likes of the
/// hovered user are dimmed like everything else.
#[must_use]
pub fn spotlight(snapshot: &LayoutSnapshot, hovered: Option<&str>) -> Spotlight {
    let hovered_index = hovered.and_then(|id| snapshot.nodes.iter().position(|n| n.id == id));
    let Some(h) = hovered_index else {
        return Spotlight {
            node_opacity: vec![1.0; snapshot.nodes.len()],
            links: snapshot
                .links
                .iter()
                .map(|_| LinkStyle {
                    color: BASE_LINK_COLOR,
                    opacity: BASE_LINK_OPACITY,
                    arrow_opacity: BASE_ARROW_OPACITY,
                })
                .collect(),
        };
    };

    let incoming = |l: &&LinkPosition| l.target == h;
    let mut node_opacity = vec![DIMMED_NODE; snapshot.nodes.len()];
    node_opacity[h] = 1.0;
    for link in snapshot.links.iter().filter(incoming) {
        node_opacity[link.source] = 1.0;
    }

    let links = snapshot
        .links
        .iter()
        .map(|l| {
            if l.target == h {
                LinkStyle {
                    color: HIGHLIGHT_LINK_COLOR,
                    opacity: 1.0,
                    arrow_opacity: 1.0,
                }
            } else {
                LinkStyle {
                    color: BASE_LINK_COLOR,
                    opacity: DIMMED_LINK,
                    arrow_opacity: DIMMED_LINK,
                }
            }
        })
        .collect();

    Spotlight {
        node_opacity,
        links,
    }
}

/// What the host shows next to a hovered node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoverCard {
    pub user: String,
    pub persona: String,
    pub has_persona: bool,
}

impl HoverCard {
    #[must_use]
    pub fn new(user: &str, personas: &HashMap<String, String>) -> Self {
        match personas.get(user) {
            Some(persona) => Self {
                user: user.to_string(),
                persona: persona.clone(),
                has_persona: true,
            },
            None => Self {
                user: user.to_string(),
                persona: PERSONA_PLACEHOLDER.to_string(),
                has_persona: false,
            },
        }
    }
}
