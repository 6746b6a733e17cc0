//! Social graph derived from who liked whose posts.

mod builder;
pub mod style;

pub use builder::{build_graph, merge_role, AggregatedLink, Link, SocialGraph, UserNode};
pub use style::{collision_radius, node_radius, NodeClass, Palette};
