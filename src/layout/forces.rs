//! Force contributions applied once per tick.
//!
//! Link, charge and collision forces add to node velocities; centering
//! translates positions directly.

use rand::rngs::StdRng;
use rand::Rng;

use super::quadtree::{Point, QuadNode};
use super::LayoutNode;

/// Distances below this (squared) are softened to avoid blow-ups.
const DISTANCE_MIN_SQ: f64 = 1.0;

fn jiggle(rng: &mut StdRng) -> f64 {
    (rng.gen::<f64>() - 0.5) * 1e-6
}

/// Spring force along links.
///
/// Strength defaults to `1 / min(degree(source), degree(target))` so hubs
/// are not yanked around by their many neighbours, and each correction is
/// split between the endpoints in proportion to their degree.
#[derive(Debug, Clone, Default)]
pub(super) struct LinkForce {
    links: Vec<(usize, usize)>,
    strengths: Vec<f64>,
    biases: Vec<f64>,
    distance: f64,
}

impl LinkForce {
    pub(super) fn new(links: Vec<(usize, usize)>, node_count: usize, distance: f64) -> Self {
        let mut degree = vec![0usize; node_count];
        for &(s, t) in &links {
            degree[s] += 1;
            degree[t] += 1;
        }

        let strengths = links
            .iter()
            .map(|&(s, t)| 1.0 / degree[s].min(degree[t]).max(1) as f64)
            .collect();
        let biases = links
            .iter()
            .map(|&(s, t)| degree[s] as f64 / (degree[s] + degree[t]) as f64)
            .collect();

        Self {
            links,
            strengths,
            biases,
            distance,
        }
    }

    pub(super) fn links(&self) -> &[(usize, usize)] {
        &self.links
    }

    pub(super) fn apply(&self, nodes: &mut [LayoutNode], alpha: f64, rng: &mut StdRng) {
        for (i, &(s, t)) in self.links.iter().enumerate() {
            let mut dx = nodes[t].x + nodes[t].vx - nodes[s].x - nodes[s].vx;
            let mut dy = nodes[t].y + nodes[t].vy - nodes[s].y - nodes[s].vy;
            if dx == 0.0 {
                dx = jiggle(rng);
            }
            if dy == 0.0 {
                dy = jiggle(rng);
            }

            let length = dx.hypot(dy);
            let scale = (length - self.distance) / length * alpha * self.strengths[i];
            dx *= scale;
            dy *= scale;

            let bias = self.biases[i];
            nodes[t].vx -= dx * bias;
            nodes[t].vy -= dy * bias;
            nodes[s].vx += dx * (1.0 - bias);
            nodes[s].vy += dy * (1.0 - bias);
        }
    }
}

/// Many-body repulsion, inverse-square in distance, approximated with a
/// quadtree for far-away cells.
pub(super) fn apply_charge(
    nodes: &mut [LayoutNode],
    strength: f64,
    theta: f64,
    alpha: f64,
    rng: &mut StdRng,
) {
    let points: Vec<Point> = nodes.iter().map(|n| Point { x: n.x, y: n.y }).collect();
    let Some(tree) = QuadNode::build(&points) else {
        return;
    };

    let theta_sq = theta * theta;
    for (index, node) in nodes.iter_mut().enumerate() {
        let (fx, fy) = charge_on(&tree, index, &points, strength * alpha, theta_sq, rng);
        node.vx += fx;
        node.vy += fy;
    }
}

fn charge_on(
    cell: &QuadNode,
    index: usize,
    points: &[Point],
    scaled_strength: f64,
    theta_sq: f64,
    rng: &mut StdRng,
) -> (f64, f64) {
    if cell.mass <= 0.0 {
        return (0.0, 0.0);
    }
    let p = points[index];

    if cell.is_leaf() {
        let (mut fx, mut fy) = (0.0, 0.0);
        for &other in &cell.indices {
            if other == index {
                continue;
            }
            let (dx, dy) = (points[other].x - p.x, points[other].y - p.y);
            let (w, dx, dy) = inverse_square(dx, dy, scaled_strength, rng);
            fx += dx * w;
            fy += dy * w;
        }
        return (fx, fy);
    }

    let dx = cell.center_of_mass.x - p.x;
    let dy = cell.center_of_mass.y - p.y;
    let width = cell.bounds.side_length();
    let far = !cell.bounds.contains(p) && width * width / theta_sq < dx * dx + dy * dy;
    if far {
        let (w, dx, dy) = inverse_square(dx, dy, scaled_strength * cell.mass, rng);
        return (dx * w, dy * w);
    }

    cell.children().fold((0.0, 0.0), |(fx, fy), child| {
        let (cx, cy) = charge_on(child, index, points, scaled_strength, theta_sq, rng);
        (fx + cx, fy + cy)
    })
}

/// Weight for a displacement `(dx, dy)` under an inverse-square law, with
/// coincident points nudged apart.
fn inverse_square(mut dx: f64, mut dy: f64, strength: f64, rng: &mut StdRng) -> (f64, f64, f64) {
    if dx == 0.0 {
        dx = jiggle(rng);
    }
    if dy == 0.0 {
        dy = jiggle(rng);
    }
    let mut l = dx * dx + dy * dy;
    if l < DISTANCE_MIN_SQ {
        l = (DISTANCE_MIN_SQ * l).sqrt();
    }
    (strength / l, dx, dy)
}

/// Translate all nodes so their centroid moves toward `(cx, cy)`.
pub(super) fn apply_center(nodes: &mut [LayoutNode], cx: f64, cy: f64, strength: f64) {
    if nodes.is_empty() {
        return;
    }
    let n = nodes.len() as f64;
    let (sx, sy) = nodes
        .iter()
        .fold((0.0, 0.0), |(sx, sy), node| (sx + node.x, sy + node.y));
    let shift_x = (sx / n - cx) * strength;
    let shift_y = (sy / n - cy) * strength;
    for node in nodes {
        node.x -= shift_x;
        node.y -= shift_y;
    }
}

/// Push apart nodes whose collision disks overlap, using positions
/// predicted from current velocities.
pub(super) fn apply_collision(nodes: &mut [LayoutNode], strength: f64, rng: &mut StdRng) {
    let count = nodes.len();
    for i in 0..count {
        let ri = nodes[i].collision_radius;
        let ri_sq = ri * ri;
        let xi = nodes[i].x + nodes[i].vx;
        let yi = nodes[i].y + nodes[i].vy;

        for j in (i + 1)..count {
            let rj = nodes[j].collision_radius;
            let r = ri + rj;
            let mut dx = xi - (nodes[j].x + nodes[j].vx);
            let mut dy = yi - (nodes[j].y + nodes[j].vy);
            let mut l = dx * dx + dy * dy;
            if l >= r * r {
                continue;
            }

            if dx == 0.0 {
                dx = jiggle(rng);
                l += dx * dx;
            }
            if dy == 0.0 {
                dy = jiggle(rng);
                l += dy * dy;
            }
            let l = l.sqrt();
            let push = (r - l) / l * strength;
            dx *= push;
            dy *= push;

            let rj_sq = rj * rj;
            let share = rj_sq / (ri_sq + rj_sq);
            nodes[i].vx += dx * share;
            nodes[i].vy += dy * share;
            nodes[j].vx -= dx * (1.0 - share);
            nodes[j].vy -= dy * (1.0 - share);
        }
    }
}
