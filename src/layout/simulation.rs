use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::debug;

use super::forces::{apply_center, apply_charge, apply_collision, LinkForce};
use crate::graph::{collision_radius, node_radius, SocialGraph, UserNode};

/// Tunables of the force simulation.
#[derive(Debug, Clone)]
pub struct LayoutSettings {
    pub width: f64,
    pub height: f64,
    /// Target separation of linked nodes.
    pub link_distance: f64,
    /// Many-body strength; negative repels.
    pub charge_strength: f64,
    /// Barnes-Hut opening angle.
    pub theta: f64,
    pub center_strength: f64,
    pub collide_strength: f64,
    pub alpha_min: f64,
    pub alpha_decay: f64,
    pub velocity_decay: f64,
    /// Alpha target while a node is held.
    pub drag_alpha_target: f64,
    /// Nodes are kept this far inside the canvas edges.
    pub margin: f64,
    /// Mean kinetic energy per node below which the layout counts as settled.
    pub settle_threshold: f64,
    pub seed: u64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 500.0,
            link_distance: 120.0,
            charge_strength: -400.0,
            theta: 0.9,
            center_strength: 1.0,
            collide_strength: 1.0,
            alpha_min: 0.001,
            // Reaches alpha_min from 1 in 300 ticks.
            alpha_decay: 1.0 - 0.001_f64.powf(1.0 / 300.0),
            velocity_decay: 0.4,
            drag_alpha_target: 0.3,
            margin: 20.0,
            settle_threshold: 0.01,
            seed: 0x5eed,
        }
    }
}

impl LayoutSettings {
    #[must_use]
    pub fn with_canvas(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LayoutState {
    /// No graph loaded.
    Idle,
    Running,
    /// Energy has decayed; stepping is a no-op until something moves.
    Settled,
    /// At least one node is held by a drag.
    PinnedDrag,
}

/// A graph node with its simulation state.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutNode {
    pub user: UserNode,
    pub radius: f64,
    pub collision_radius: f64,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub fx: Option<f64>,
    pub fy: Option<f64>,
}

impl LayoutNode {
    #[must_use]
    pub fn new(user: UserNode, x: f64, y: f64) -> Self {
        Self {
            radius: node_radius(&user),
            collision_radius: collision_radius(&user),
            user,
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            fx: None,
            fy: None,
        }
    }

    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.fx.is_some() || self.fy.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodePosition {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub pinned: bool,
}

/// A drawn edge: indices into [`LayoutSnapshot::nodes`] plus the number of
/// likes it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkPosition {
    pub source: usize,
    pub target: usize,
    pub count: u64,
}

/// Read-only view of the layout after a step.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutSnapshot {
    pub tick: u64,
    pub alpha: f64,
    pub kinetic_energy: f64,
    pub state: LayoutState,
    pub width: f64,
    pub height: f64,
    pub nodes: Vec<NodePosition>,
    pub links: Vec<LinkPosition>,
}

impl LayoutSnapshot {
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&NodePosition> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Force-directed layout over a [`SocialGraph`], advanced one tick at a
/// time by the host's redraw loop.
#[derive(Debug)]
pub struct Simulation {
    settings: LayoutSettings,
    nodes: Vec<LayoutNode>,
    link_force: LinkForce,
    drawn_links: Vec<LinkPosition>,
    alpha: f64,
    alpha_target: f64,
    tick: u64,
    state: LayoutState,
    rng: StdRng,
}

impl Simulation {
    #[must_use]
    pub fn new(settings: LayoutSettings) -> Self {
        let rng = StdRng::seed_from_u64(settings.seed);
        Self {
            settings,
            nodes: Vec::new(),
            link_force: LinkForce::default(),
            drawn_links: Vec::new(),
            alpha: 0.0,
            alpha_target: 0.0,
            tick: 0,
            state: LayoutState::Idle,
            rng,
        }
    }

    /// Replace whatever is loaded with `graph` and start a fresh run.
    pub fn load(&mut self, graph: &SocialGraph) {
        self.clear();
        if graph.nodes.is_empty() {
            return;
        }

        let (cx, cy) = self.center();
        // Phyllotaxis spiral: even initial spread without randomness.
        let golden_angle = PI * (3.0 - 5.0_f64.sqrt());
        self.nodes = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(i, user)| {
                let radius = 10.0 * (0.5 + i as f64).sqrt();
                let angle = i as f64 * golden_angle;
                LayoutNode::new(
                    user.clone(),
                    cx + radius * angle.cos(),
                    cy + radius * angle.sin(),
                )
            })
            .collect();

        let links: Vec<(usize, usize)> = graph
            .links
            .iter()
            .filter_map(|l| Some((graph.node_index(&l.source)?, graph.node_index(&l.target)?)))
            .filter(|(s, t)| s != t)
            .collect();
        self.link_force = LinkForce::new(links, self.nodes.len(), self.settings.link_distance);

        self.drawn_links = graph
            .aggregated_links()
            .into_iter()
            .filter_map(|l| {
                Some(LinkPosition {
                    source: graph.node_index(&l.source)?,
                    target: graph.node_index(&l.target)?,
                    count: l.count,
                })
            })
            .collect();

        self.alpha = 1.0;
        self.state = LayoutState::Running;
        debug!(
            nodes = self.nodes.len(),
            links = self.link_force.links().len(),
            "Layout loaded"
        );
    }

    /// Tear down the loaded graph.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.link_force = LinkForce::default();
        self.drawn_links.clear();
        self.alpha = 0.0;
        self.alpha_target = 0.0;
        self.tick = 0;
        self.state = LayoutState::Idle;
        self.rng = StdRng::seed_from_u64(self.settings.seed);
    }

    #[must_use]
    pub fn state(&self) -> LayoutState {
        self.state
    }

    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    #[must_use]
    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    #[must_use]
    pub fn nodes(&self) -> &[LayoutNode] {
        &self.nodes
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&LayoutNode> {
        self.nodes.iter().find(|n| n.user.id == id)
    }

    /// Total kinetic energy of free nodes.
    #[must_use]
    pub fn kinetic_energy(&self) -> f64 {
        self.nodes
            .iter()
            .filter(|n| !n.is_pinned())
            .map(|n| 0.5 * (n.vx * n.vx + n.vy * n.vy))
            .sum()
    }

    /// Advance one tick (unless idle or settled) and report positions.
    pub fn step(&mut self) -> LayoutSnapshot {
        if matches!(self.state, LayoutState::Running | LayoutState::PinnedDrag) {
            self.tick_once();
            self.update_state();
        }
        self.snapshot()
    }

    /// Step until settled or `max_ticks` have run.
    pub fn run_until_settled(&mut self, max_ticks: u64) -> LayoutSnapshot {
        for _ in 0..max_ticks {
            if !matches!(self.state, LayoutState::Running | LayoutState::PinnedDrag) {
                break;
            }
            self.tick_once();
            self.update_state();
        }
        self.snapshot()
    }

    /// Hold node `id` at `(x, y)` (clamped to the canvas) and reheat.
    ///
    /// Returns `false` if no such node exists.
    pub fn pin(&mut self, id: &str, x: f64, y: f64) -> bool {
        let (x, y) = self.clamp_point(x, y);
        let Some(node) = self.nodes.iter_mut().find(|n| n.user.id == id) else {
            return false;
        };
        node.fx = Some(x);
        node.fy = Some(y);
        node.x = x;
        node.y = y;
        node.vx = 0.0;
        node.vy = 0.0;

        self.alpha_target = self.settings.drag_alpha_target;
        self.state = LayoutState::PinnedDrag;
        true
    }

    /// Release node `id`. Once nothing is held, energy decays toward rest.
    pub fn unpin(&mut self, id: &str) -> bool {
        let Some(node) = self.nodes.iter_mut().find(|n| n.user.id == id) else {
            return false;
        };
        node.fx = None;
        node.fy = None;

        if !self.nodes.iter().any(LayoutNode::is_pinned) {
            self.alpha_target = 0.0;
            if self.state == LayoutState::PinnedDrag {
                self.state = LayoutState::Running;
            }
        }
        true
    }

    /// Grab a node at its current position.
    pub fn begin_drag(&mut self, id: &str) -> bool {
        match self.node(id).map(|n| (n.x, n.y)) {
            Some((x, y)) => self.pin(id, x, y),
            None => false,
        }
    }

    /// Move a grabbed node to the pointer.
    pub fn drag_to(&mut self, id: &str, x: f64, y: f64) -> bool {
        self.pin(id, x, y)
    }

    pub fn end_drag(&mut self, id: &str) -> bool {
        self.unpin(id)
    }

    fn center(&self) -> (f64, f64) {
        (self.settings.width / 2.0, self.settings.height / 2.0)
    }

    fn clamp_point(&self, x: f64, y: f64) -> (f64, f64) {
        let m = self.settings.margin;
        (
            x.clamp(m, (self.settings.width - m).max(m)),
            y.clamp(m, (self.settings.height - m).max(m)),
        )
    }

    fn tick_once(&mut self) {
        self.alpha += (self.alpha_target - self.alpha) * self.settings.alpha_decay;
        let alpha = self.alpha;
        let (cx, cy) = self.center();

        self.link_force.apply(&mut self.nodes, alpha, &mut self.rng);
        apply_charge(
            &mut self.nodes,
            self.settings.charge_strength,
            self.settings.theta,
            alpha,
            &mut self.rng,
        );
        apply_center(&mut self.nodes, cx, cy, self.settings.center_strength);
        apply_collision(&mut self.nodes, self.settings.collide_strength, &mut self.rng);

        let keep = 1.0 - self.settings.velocity_decay;
        for i in 0..self.nodes.len() {
            let node = &mut self.nodes[i];
            if let Some(fx) = node.fx {
                node.x = fx;
                node.vx = 0.0;
            } else {
                node.vx *= keep;
                node.x += node.vx;
            }
            if let Some(fy) = node.fy {
                node.y = fy;
                node.vy = 0.0;
            } else {
                node.vy *= keep;
                node.y += node.vy;
            }
            let (x, y) = (node.x, node.y);
            let (x, y) = self.clamp_point(x, y);
            self.nodes[i].x = x;
            self.nodes[i].y = y;
        }

        self.tick += 1;
    }

    fn update_state(&mut self) {
        if self.nodes.iter().any(LayoutNode::is_pinned) {
            self.state = LayoutState::PinnedDrag;
            return;
        }
        let mean_energy = self.kinetic_energy() / self.nodes.len().max(1) as f64;
        if self.alpha < self.settings.alpha_min || mean_energy < self.settings.settle_threshold {
            self.state = LayoutState::Settled;
            debug!(tick = self.tick, alpha = self.alpha, "Layout settled");
        } else {
            self.state = LayoutState::Running;
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            tick: self.tick,
            alpha: self.alpha,
            kinetic_energy: self.kinetic_energy(),
            state: self.state,
            width: self.settings.width,
            height: self.settings.height,
            nodes: self
                .nodes
                .iter()
                .map(|n| NodePosition {
                    id: n.user.id.clone(),
                    x: n.x,
                    y: n.y,
                    radius: n.radius,
                    pinned: n.is_pinned(),
                })
                .collect(),
            links: self.drawn_links.clone(),
        }
    }
}
