//! Visual classification of graph nodes.

use serde::Serialize;

use super::UserNode;

const BASE_RADIUS: f64 = 8.0;
const RADIUS_CAP: u64 = 20;
const COLLISION_BASE: f64 = 15.0;
const COLLISION_CAP: u64 = 30;

/// Role class of a node, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeClass {
    Admin,
    Mod,
    /// Trust level 3 or higher.
    Senior,
    Member,
    Basic,
    Visitor,
}

/// Whether nodes are coloured by role or all drawn the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Palette {
    #[default]
    Roles,
    Uniform,
}

impl NodeClass {
    /// Classify a node: Admin > Mod > LV3+ > LV2 > LV1 > LV0.
    #[must_use]
    pub fn of(node: &UserNode) -> Self {
        if node.is_admin {
            Self::Admin
        } else if node.is_mod {
            Self::Mod
        } else {
            match node.trust_level {
                0 => Self::Visitor,
                1 => Self::Basic,
                2 => Self::Member,
                _ => Self::Senior,
            }
        }
    }

    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Admin => "#ef4444",
            Self::Mod => "#22c55e",
            Self::Senior => "#facc15",
            Self::Member => "#3b82f6",
            Self::Basic => "#94a3b8",
            Self::Visitor => "#475569",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Mod => "Mod",
            Self::Senior => "LV3+",
            Self::Member => "LV2",
            Self::Basic => "LV1",
            Self::Visitor => "LV0",
        }
    }
}

impl Palette {
    const UNIFORM_COLOR: &'static str = "#60a5fa";

    #[must_use]
    pub fn color_for(self, node: &UserNode) -> &'static str {
        match self {
            Self::Roles => NodeClass::of(node).color(),
            Self::Uniform => Self::UNIFORM_COLOR,
        }
    }
}

fn engagement(node: &UserNode) -> u64 {
    node.post_count * 2 + node.received_like_count
}

/// Rendered radius, growing with engagement up to a cap.
#[must_use]
pub fn node_radius(node: &UserNode) -> f64 {
    BASE_RADIUS + engagement(node).min(RADIUS_CAP) as f64
}

/// Radius used for collision avoidance; leaves room for the label.
#[must_use]
pub fn collision_radius(node: &UserNode) -> f64 {
    COLLISION_BASE + engagement(node).min(COLLISION_CAP) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(admin: bool, moderator: bool, trust: u32) -> UserNode {
        UserNode {
            is_admin: admin,
            is_mod: moderator,
            trust_level: trust,
            ..UserNode::new("n")
        }
    }

    #[test]
    fn test_class_precedence() {
        assert_eq!(NodeClass::of(&node(true, true, 4)), NodeClass::Admin);
        assert_eq!(NodeClass::of(&node(false, true, 4)), NodeClass::Mod);
        assert_eq!(NodeClass::of(&node(false, false, 3)), NodeClass::Senior);
        assert_eq!(NodeClass::of(&node(false, false, 4)), NodeClass::Senior);
        assert_eq!(NodeClass::of(&node(false, false, 2)), NodeClass::Member);
        assert_eq!(NodeClass::of(&node(false, false, 1)), NodeClass::Basic);
        assert_eq!(NodeClass::of(&node(false, false, 0)), NodeClass::Visitor);
    }

    #[test]
    fn test_palettes() {
        let admin = node(true, false, 0);
        assert_eq!(Palette::Roles.color_for(&admin), "#ef4444");
        assert_eq!(Palette::Uniform.color_for(&admin), "#60a5fa");
        assert_eq!(NodeClass::Visitor.label(), "LV0");
    }

    #[test]
    fn test_radius_is_monotonic_and_capped() {
        let mut n = UserNode::new("r");
        assert!((node_radius(&n) - 8.0).abs() < f64::EPSILON);

        let mut previous = node_radius(&n);
        for _ in 0..20 {
            n.post_count += 1;
            let r = node_radius(&n);
            assert!(r >= previous);
            previous = r;
        }
        assert!((node_radius(&n) - 28.0).abs() < f64::EPSILON);

        n.received_like_count = 10_000;
        assert!((node_radius(&n) - 28.0).abs() < f64::EPSILON);
        assert!((collision_radius(&n) - 45.0).abs() < f64::EPSILON);
    }
}
