//! Quadtree used for Barnes-Hut approximation of the charge force.

const LEAF_CAPACITY: usize = 4;
const MAX_DEPTH: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Point {
    pub(super) x: f64,
    pub(super) y: f64,
}

#[derive(Debug, Clone, Copy)]
pub(super) struct QuadBounds {
    pub(super) cx: f64,
    pub(super) cy: f64,
    pub(super) half_extent: f64,
}

impl QuadBounds {
    fn from_points(points: &[Point]) -> Option<Self> {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        if !min_x.is_finite() || !min_y.is_finite() || !max_x.is_finite() || !max_y.is_finite() {
            return None;
        }

        let span = (max_x - min_x).max(max_y - min_y).max(1.0);
        Some(Self {
            cx: (min_x + max_x) * 0.5,
            cy: (min_y + max_y) * 0.5,
            half_extent: span * 0.5 + 1.0,
        })
    }

    pub(super) fn contains(self, p: Point) -> bool {
        (p.x - self.cx).abs() <= self.half_extent && (p.y - self.cy).abs() <= self.half_extent
    }

    pub(super) fn side_length(self) -> f64 {
        self.half_extent * 2.0
    }

    fn child(self, quadrant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let (dx, dy) = match quadrant {
            0 => (-quarter, -quarter),
            1 => (quarter, -quarter),
            2 => (-quarter, quarter),
            _ => (quarter, quarter),
        };
        Self {
            cx: self.cx + dx,
            cy: self.cy + dy,
            half_extent: quarter,
        }
    }

    fn quadrant_for(self, p: Point) -> usize {
        match (p.x >= self.cx, p.y >= self.cy) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        }
    }
}

pub(super) struct QuadNode {
    pub(super) bounds: QuadBounds,
    pub(super) center_of_mass: Point,
    /// Number of points below this cell.
    pub(super) mass: f64,
    /// Point indices; only populated on leaves.
    pub(super) indices: Vec<usize>,
    pub(super) children: [Option<Box<QuadNode>>; 4],
}

impl QuadNode {
    pub(super) fn build(points: &[Point]) -> Option<Self> {
        let bounds = QuadBounds::from_points(points)?;
        let indices = (0..points.len()).collect();
        Some(Self::build_node(bounds, indices, points, 0))
    }

    fn build_node(bounds: QuadBounds, indices: Vec<usize>, points: &[Point], depth: usize) -> Self {
        let mass = indices.len() as f64;
        let (mut sx, mut sy) = (0.0, 0.0);
        for &i in &indices {
            sx += points[i].x;
            sy += points[i].y;
        }
        let center_of_mass = if mass > 0.0 {
            Point {
                x: sx / mass,
                y: sy / mass,
            }
        } else {
            Point {
                x: bounds.cx,
                y: bounds.cy,
            }
        };

        let mut node = Self {
            bounds,
            center_of_mass,
            mass,
            indices,
            children: std::array::from_fn(|_| None),
        };

        if depth >= MAX_DEPTH || node.indices.len() <= LEAF_CAPACITY {
            return node;
        }

        let mut buckets: [Vec<usize>; 4] = std::array::from_fn(|_| Vec::new());
        for &i in &node.indices {
            buckets[bounds.quadrant_for(points[i])].push(i);
        }

        // Coincident points never separate; keep them in one leaf.
        if buckets.iter().filter(|b| !b.is_empty()).count() <= 1 {
            return node;
        }

        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }
            node.children[quadrant] = Some(Box::new(Self::build_node(
                bounds.child(quadrant),
                bucket,
                points,
                depth + 1,
            )));
        }
        node.indices.clear();
        node
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    pub(super) fn children(&self) -> impl Iterator<Item = &QuadNode> {
        self.children.iter().filter_map(|c| c.as_deref())
    }
}
