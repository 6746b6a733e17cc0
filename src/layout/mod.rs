//! Force-directed layout of the social graph and pointer interaction on top
//! of it.

mod forces;
pub mod interaction;
mod quadtree;
mod simulation;

pub use interaction::{hit_test, spotlight, HoverCard, LinkStyle, Pin, Spotlight, Viewport};
pub use simulation::{
    LayoutNode, LayoutSettings, LayoutSnapshot, LayoutState, LinkPosition, NodePosition,
    Simulation,
};
