//! Road network builder
//!
//! Interprets an expanded L-system symbol sequence with turtle semantics into
//! candidate line segments, then resolves every pairwise crossing into a
//! planar node/edge graph. Coincident endpoints are unified transitively with
//! a disjoint-set pass over all emitted endpoints, so the final network never
//! contains two nodes within the merge epsilon of each other.

use std::collections::{HashMap, HashSet};

use crate::config::TurtleConfig;
use crate::error::LayoutError;
use crate::geometry::{intersect_segments, Point, Segment, SegmentIntersection};
use crate::lsystem::Symbol;

/// Classification of a road node by its final degree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Degree 1: a dead end.
    Terminus,
    /// Degree 2: a bend or pass-through point.
    Corner,
    /// Degree 3: a T-junction.
    ThreeWay,
    /// Degree 4: a full crossing.
    FourWay,
    /// Degree 5 or more.
    Multi,
}

impl NodeKind {
    pub fn from_degree(degree: usize) -> NodeKind {
        match degree {
            0 | 1 => NodeKind::Terminus,
            2 => NodeKind::Corner,
            3 => NodeKind::ThreeWay,
            4 => NodeKind::FourWay,
            _ => NodeKind::Multi,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Terminus => "terminus",
            NodeKind::Corner => "corner",
            NodeKind::ThreeWay => "three_way",
            NodeKind::FourWay => "four_way",
            NodeKind::Multi => "multi",
        }
    }

    pub fn parse(s: &str) -> Option<NodeKind> {
        match s {
            "terminus" => Some(NodeKind::Terminus),
            "corner" => Some(NodeKind::Corner),
            "three_way" => Some(NodeKind::ThreeWay),
            "four_way" => Some(NodeKind::FourWay),
            "multi" => Some(NodeKind::Multi),
            _ => None,
        }
    }
}

/// A junction or endpoint of the road network.
#[derive(Clone, Debug, PartialEq)]
pub struct RoadNode {
    pub id: String,
    pub position: Point,
    pub kind: NodeKind,
}

/// A road between two nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct RoadEdge {
    pub id: String,
    pub from: String,
    pub to: String,
    /// Ordered control points, at least two.
    pub curve: Vec<Point>,
    pub lanes: u32,
    pub width: f64,
    pub markings: Vec<String>,
}

/// A planar road graph.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct RoadNetwork {
    pub nodes: Vec<RoadNode>,
    pub edges: Vec<RoadEdge>,
}

/// Interpret a symbol sequence into a resolved road network.
///
/// The draw-forward count is checked against `max_segments` before any
/// geometry is produced, mirroring the grammar engine's symbol bound.
pub fn interpret(symbols: &[Symbol], config: &TurtleConfig) -> Result<RoadNetwork, LayoutError> {
    config.validate()?;

    let forward_count = symbols.iter().filter(|&&s| s == Symbol::Forward).count();
    if forward_count > config.max_segments {
        return Err(LayoutError::Generation(format!(
            "symbol sequence draws {} segments, exceeding the {} segment bound",
            forward_count, config.max_segments
        )));
    }

    let segments = turtle_segments(symbols, config);
    resolve_segments(&segments, config)
}

/// Turtle pass: walk the symbol sequence, emitting one candidate segment per
/// draw-forward. The branch stack is an explicit vector of (position,
/// heading) pairs; a pop on an empty stack leaves the state unchanged.
/// Exactly retraced segments are deduplicated here.
fn turtle_segments(symbols: &[Symbol], config: &TurtleConfig) -> Vec<Segment> {
    let mut position = Point::new(0.0, 0.0);
    let mut heading = std::f64::consts::FRAC_PI_2; // start pointing +y
    let mut stack: Vec<(Point, f64)> = Vec::new();
    let angle = config.angle_increment.to_radians();

    let mut segments = Vec::new();
    let mut seen: HashSet<((i64, i64), (i64, i64))> = HashSet::new();
    let quantize = |p: &Point| {
        (
            (p.x / config.epsilon).round() as i64,
            (p.y / config.epsilon).round() as i64,
        )
    };

    for &symbol in symbols {
        match symbol {
            Symbol::Forward => {
                let next = position
                    + Point::new(heading.cos(), heading.sin()) * config.step_length;
                let segment = Segment::new(position, next);
                if !segment.is_degenerate(config.epsilon) {
                    let (qa, qb) = (quantize(&position), quantize(&next));
                    let key = if qa <= qb { (qa, qb) } else { (qb, qa) };
                    if seen.insert(key) {
                        segments.push(segment);
                    }
                }
                position = next;
            }
            Symbol::Left => heading += angle,
            Symbol::Right => heading -= angle,
            Symbol::Push => stack.push((position, heading)),
            Symbol::Pop => {
                if let Some((p, h)) = stack.pop() {
                    position = p;
                    heading = h;
                }
            }
            Symbol::Variable(_) => {}
        }
    }
    segments
}

/// Resolve candidate segments into a planar graph: split every crossing,
/// unify coincident endpoints, then classify nodes by final degree.
pub fn resolve_segments(
    segments: &[Segment],
    config: &TurtleConfig,
) -> Result<RoadNetwork, LayoutError> {
    let epsilon = config.epsilon;

    // Pairwise intersection pass: collect interior split parameters.
    let mut splits: Vec<Vec<f64>> = vec![Vec::new(); segments.len()];
    for i in 0..segments.len() {
        for j in (i + 1)..segments.len() {
            match intersect_segments(&segments[i], &segments[j], epsilon) {
                SegmentIntersection::Crossing { t, u, .. } => {
                    splits[i].push(t);
                    splits[j].push(u);
                }
                SegmentIntersection::Touching { t, u, .. } => {
                    // T-junction: only the touched segment is split.
                    if is_interior(t, &segments[i], epsilon) {
                        splits[i].push(t);
                    }
                    if is_interior(u, &segments[j], epsilon) {
                        splits[j].push(u);
                    }
                }
                SegmentIntersection::CollinearOverlap => {
                    collect_projection_splits(&segments[i], &segments[j], epsilon, &mut splits[i]);
                    collect_projection_splits(&segments[j], &segments[i], epsilon, &mut splits[j]);
                }
                SegmentIntersection::None => {}
            }
        }
    }

    // Split each segment at its sorted parameters.
    let mut pieces: Vec<Segment> = Vec::new();
    for (segment, mut ts) in segments.iter().zip(splits.into_iter()) {
        ts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let eps_t = epsilon / segment.length();
        let mut cuts = vec![0.0];
        for t in ts {
            if t - cuts.last().unwrap() > eps_t && t < 1.0 - eps_t {
                cuts.push(t);
            }
        }
        cuts.push(1.0);
        for window in cuts.windows(2) {
            let piece = Segment::new(segment.point_at(window[0]), segment.point_at(window[1]));
            if !piece.is_degenerate(epsilon) {
                pieces.push(piece);
            }
        }
    }

    let endpoints: Vec<Point> = pieces
        .iter()
        .flat_map(|s| [s.a, s.b])
        .collect();
    let cluster = unify_endpoints(&endpoints, config)?;

    build_network(&pieces, &endpoints, &cluster, config)
}

fn is_interior(t: f64, segment: &Segment, epsilon: f64) -> bool {
    let eps_t = epsilon / segment.length();
    t > eps_t && t < 1.0 - eps_t
}

/// For collinear overlaps, split `target` where `other`'s endpoints project
/// into its interior.
fn collect_projection_splits(target: &Segment, other: &Segment, epsilon: f64, out: &mut Vec<f64>) {
    let d = target.b - target.a;
    let len = target.length();
    for p in [other.a, other.b] {
        let t = ((p.x - target.a.x) * d.x + (p.y - target.a.y) * d.y) / (len * len);
        if is_interior(t, target, epsilon) {
            out.push(t);
        }
    }
}

/// Disjoint-set over endpoint indices, merged by a union of every pair
/// within epsilon. A spatial hash keeps the pass near-linear.
fn unify_endpoints(endpoints: &[Point], config: &TurtleConfig) -> Result<Vec<usize>, LayoutError> {
    let epsilon = config.epsilon;
    let mut set = DisjointSet::new(endpoints.len());

    let cell = |p: &Point| {
        (
            (p.x / epsilon).floor() as i64,
            (p.y / epsilon).floor() as i64,
        )
    };
    let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (i, p) in endpoints.iter().enumerate() {
        grid.entry(cell(p)).or_default().push(i);
    }

    // Points within epsilon are at most one cell apart on each axis.
    for (i, p) in endpoints.iter().enumerate() {
        let (cx, cy) = cell(p);
        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(neighbors) = grid.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                for &j in neighbors {
                    if j > i && endpoints[i].coincident(&endpoints[j], epsilon) {
                        set.union(i, j);
                    }
                }
            }
        }
    }

    // Collect members per cluster root for the ambiguity check.
    let mut members: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut roots = vec![0usize; endpoints.len()];
    for i in 0..endpoints.len() {
        let root = set.find(i);
        roots[i] = root;
        members.entry(root).or_default().push(i);
    }

    // A cluster wider than epsilon is ambiguous: chained merges pulled in
    // points that are mutually farther apart than the tolerance. Widen the
    // epsilon once for that cluster; persisting ambiguity is an error.
    let widened = epsilon * config.epsilon_widen_factor;
    for member_list in members.values() {
        if member_list.len() < 2 {
            continue;
        }
        let mut worst = 0.0f64;
        let mut worst_pair = (member_list[0], member_list[0]);
        for (k, &i) in member_list.iter().enumerate() {
            for &j in &member_list[k + 1..] {
                let d = endpoints[i].distance(&endpoints[j]);
                if d > worst {
                    worst = d;
                    worst_pair = (i, j);
                }
            }
        }
        if worst > epsilon && worst > widened {
            let p = endpoints[worst_pair.0];
            let q = endpoints[worst_pair.1];
            return Err(LayoutError::Geometry {
                message: format!(
                    "merge cluster spans {} even after widening the epsilon to {} \
                     (other point at ({}, {}))",
                    worst, widened, q.x, q.y
                ),
                x: p.x,
                y: p.y,
            });
        }
    }

    Ok(roots)
}

/// Assemble nodes and edges from the split pieces and endpoint clusters.
/// Node ids are assigned in first-appearance order over edge emission; node
/// positions are cluster centroids; degree is computed from the final edge
/// set.
fn build_network(
    pieces: &[Segment],
    endpoints: &[Point],
    cluster: &[usize],
    config: &TurtleConfig,
) -> Result<RoadNetwork, LayoutError> {
    // Centroid per cluster root.
    let mut sums: HashMap<usize, (f64, f64, usize)> = HashMap::new();
    for (i, p) in endpoints.iter().enumerate() {
        let entry = sums.entry(cluster[i]).or_insert((0.0, 0.0, 0));
        entry.0 += p.x;
        entry.1 += p.y;
        entry.2 += 1;
    }

    let mut node_index: HashMap<usize, usize> = HashMap::new();
    let mut nodes: Vec<RoadNode> = Vec::new();
    let mut edges: Vec<RoadEdge> = Vec::new();
    let mut edge_seen: HashSet<(usize, usize)> = HashSet::new();

    let mut node_for = |root: usize, nodes: &mut Vec<RoadNode>| -> usize {
        if let Some(&index) = node_index.get(&root) {
            return index;
        }
        let (sx, sy, count) = sums[&root];
        let index = nodes.len();
        nodes.push(RoadNode {
            id: format!("node-{}", index),
            position: Point::new(sx / count as f64, sy / count as f64),
            kind: NodeKind::Terminus, // reclassified below
        });
        node_index.insert(root, index);
        index
    };

    let width = config.lanes as f64 * config.lane_width;
    let markings: Vec<String> = if config.lanes >= 2 {
        vec!["centerline".to_string()]
    } else {
        Vec::new()
    };

    for (piece_index, _piece) in pieces.iter().enumerate() {
        let root_a = cluster[piece_index * 2];
        let root_b = cluster[piece_index * 2 + 1];
        if root_a == root_b {
            // Both ends merged into one node: the piece collapsed.
            continue;
        }
        let from = node_for(root_a, &mut nodes);
        let to = node_for(root_b, &mut nodes);

        let key = if from <= to { (from, to) } else { (to, from) };
        if !edge_seen.insert(key) {
            continue;
        }

        edges.push(RoadEdge {
            id: format!("edge-{}", edges.len()),
            from: nodes[from].id.clone(),
            to: nodes[to].id.clone(),
            curve: vec![nodes[from].position, nodes[to].position],
            lanes: config.lanes,
            width,
            markings: markings.clone(),
        });
    }

    // Final degree count over the resolved edge set.
    let mut degree = vec![0usize; nodes.len()];
    for edge in &edges {
        let from = nodes.iter().position(|n| n.id == edge.from).unwrap_or(0);
        let to = nodes.iter().position(|n| n.id == edge.to).unwrap_or(0);
        degree[from] += 1;
        degree[to] += 1;
    }
    for (node, &d) in nodes.iter_mut().zip(degree.iter()) {
        node.kind = NodeKind::from_degree(d);
    }

    Ok(RoadNetwork { nodes, edges })
}

/// Disjoint-set with path halving. Unions attach the larger root index to
/// the smaller, keeping representatives deterministic.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        let (small, large) = if ra < rb { (ra, rb) } else { (rb, ra) };
        self.parent[large] = small;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lsystem::parse_symbols;

    fn config() -> TurtleConfig {
        TurtleConfig {
            step_length: 10.0,
            angle_increment: 25.0,
            ..TurtleConfig::default()
        }
    }

    fn segment(ax: f64, ay: f64, bx: f64, by: f64) -> Segment {
        Segment::new(Point::new(ax, ay), Point::new(bx, by))
    }

    fn degree(network: &RoadNetwork, node_id: &str) -> usize {
        network
            .edges
            .iter()
            .filter(|e| e.from == node_id || e.to == node_id)
            .count()
    }

    #[test]
    fn test_perpendicular_cross_resolves_to_four_edges() {
        let segments = [segment(0.0, 0.0, 10.0, 0.0), segment(5.0, -5.0, 5.0, 5.0)];
        let network = resolve_segments(&segments, &config()).unwrap();

        assert_eq!(network.nodes.len(), 5);
        assert_eq!(network.edges.len(), 4);

        let crossing = network
            .nodes
            .iter()
            .find(|n| n.position.coincident(&Point::new(5.0, 0.0), 1e-6))
            .expect("crossing node at (5, 0)");
        assert_eq!(crossing.kind, NodeKind::FourWay);
        assert_eq!(degree(&network, &crossing.id), 4);
    }

    #[test]
    fn test_t_junction_reuses_endpoint_node() {
        let segments = [segment(0.0, 0.0, 10.0, 0.0), segment(4.0, 0.0, 4.0, 6.0)];
        let network = resolve_segments(&segments, &config()).unwrap();

        // Horizontal split in two, vertical untouched.
        assert_eq!(network.edges.len(), 3);
        assert_eq!(network.nodes.len(), 4);

        let junction = network
            .nodes
            .iter()
            .find(|n| n.position.coincident(&Point::new(4.0, 0.0), 1e-6))
            .expect("junction node at (4, 0)");
        assert_eq!(junction.kind, NodeKind::ThreeWay);
    }

    #[test]
    fn test_interpret_branching_string() {
        let symbols = parse_symbols("F[+F]F[-F]F").unwrap();
        let network = interpret(&symbols, &config()).unwrap();

        // Trunk of three steps with two side branches.
        assert_eq!(network.edges.len(), 5);
        assert_eq!(network.nodes.len(), 6);

        let three_ways = network
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::ThreeWay)
            .count();
        let termini = network
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Terminus)
            .count();
        assert_eq!(three_ways, 2);
        assert_eq!(termini, 4);
    }

    #[test]
    fn test_interpret_is_deterministic() {
        let symbols = parse_symbols("F[+F[-F]]F[-F]F[+F]").unwrap();
        let a = interpret(&symbols, &config()).unwrap();
        let b = interpret(&symbols, &config()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_retraced_segment_is_deduplicated() {
        // The bracketed F draws the same line the trailing F retraces.
        let symbols = parse_symbols("F[F]F").unwrap();
        let network = interpret(&symbols, &config()).unwrap();

        assert_eq!(network.edges.len(), 2);
        assert_eq!(network.nodes.len(), 3);
    }

    #[test]
    fn test_segment_bound_is_enforced() {
        let symbols = parse_symbols("FFFFF").unwrap();
        let cfg = TurtleConfig {
            max_segments: 4,
            ..config()
        };
        assert!(matches!(
            interpret(&symbols, &cfg),
            Err(LayoutError::Generation(_))
        ));
    }

    #[test]
    fn test_no_duplicate_nodes_in_resolved_network() {
        let symbols = parse_symbols("F[+F][-F]F[+F[-F]]F").unwrap();
        let cfg = config();
        let network = interpret(&symbols, &cfg).unwrap();

        for (i, a) in network.nodes.iter().enumerate() {
            for b in network.nodes.iter().skip(i + 1) {
                assert!(
                    a.position.distance(&b.position) > cfg.epsilon,
                    "nodes {} and {} coincide",
                    a.id,
                    b.id
                );
            }
        }
    }

    #[test]
    fn test_resolved_network_is_planar() {
        // 90 degree turns force genuine crossings between branches.
        let symbols = parse_symbols("F[+F[+F]]F[-F[-F[-F]]]F[+F]").unwrap();
        let cfg = TurtleConfig {
            angle_increment: 90.0,
            ..config()
        };
        let network = interpret(&symbols, &cfg).unwrap();

        for (i, a) in network.edges.iter().enumerate() {
            for b in network.edges.iter().skip(i + 1) {
                if a.from == b.from || a.from == b.to || a.to == b.from || a.to == b.to {
                    continue;
                }
                let sa = Segment::new(a.curve[0], *a.curve.last().unwrap());
                let sb = Segment::new(b.curve[0], *b.curve.last().unwrap());
                assert!(
                    !matches!(
                        intersect_segments(&sa, &sb, cfg.epsilon),
                        SegmentIntersection::Crossing { .. }
                    ),
                    "edges {} and {} cross without a shared node",
                    a.id,
                    b.id
                );
            }
        }
    }

    #[test]
    fn test_chained_merge_within_widened_epsilon() {
        // Bottom endpoints 0.09 apart chain-merge under epsilon 0.1; the
        // cluster spans 0.18, inside the widened epsilon of 0.4.
        let cfg = TurtleConfig {
            epsilon: 0.1,
            epsilon_widen_factor: 4.0,
            ..config()
        };
        let segments = [
            segment(0.0, 0.0, 0.0, 5.0),
            segment(0.09, 0.0, 2.0, 5.0),
            segment(0.18, 0.0, 4.0, 5.0),
        ];
        let network = resolve_segments(&segments, &cfg).unwrap();

        let merged = network
            .nodes
            .iter()
            .filter(|n| n.position.y < 1.0)
            .collect::<Vec<_>>();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].kind, NodeKind::ThreeWay);
    }

    #[test]
    fn test_ambiguous_merge_is_geometry_error() {
        // Six chained endpoints span 0.45, beyond the widened epsilon 0.2.
        let cfg = TurtleConfig {
            epsilon: 0.1,
            epsilon_widen_factor: 2.0,
            ..config()
        };
        let segments: Vec<Segment> = (0..6)
            .map(|i| {
                let x = i as f64 * 0.09;
                segment(x, 0.0, x * 3.0 + 1.0, 5.0)
            })
            .collect();
        let result = resolve_segments(&segments, &cfg);
        assert!(matches!(result, Err(LayoutError::Geometry { .. })));
    }

    #[test]
    fn test_edge_attributes_follow_config() {
        let cfg = TurtleConfig {
            lanes: 2,
            lane_width: 3.5,
            ..config()
        };
        let symbols = parse_symbols("FF").unwrap();
        let network = interpret(&symbols, &cfg).unwrap();

        for edge in &network.edges {
            assert_eq!(edge.lanes, 2);
            assert!((edge.width - 7.0).abs() < 1e-9);
            assert_eq!(edge.markings, vec!["centerline".to_string()]);
            assert!(edge.curve.len() >= 2);
        }
    }
}
