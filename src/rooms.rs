//! Room graph builder
//!
//! Converts BSP leaves into typed rooms, derives shared walls between
//! adjacent leaves, places doors and windows, and guarantees the room
//! adjacency graph is connected. Room and door ids are stable functions of
//! the leaf traversal order, so a fixed (config, seed) pair always produces
//! the same plan.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::bsp::Leaf;
use crate::config::RoomConfig;
use crate::error::LayoutError;
use crate::geometry::{approx_eq, polygon_area, Point, Rect};

/// Functional type of a room, assigned by the deterministic rule table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoomKind {
    Living,
    Bedroom,
    Kitchen,
    Bath,
    Hall,
    Storage,
}

impl RoomKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomKind::Living => "living",
            RoomKind::Bedroom => "bedroom",
            RoomKind::Kitchen => "kitchen",
            RoomKind::Bath => "bath",
            RoomKind::Hall => "hall",
            RoomKind::Storage => "storage",
        }
    }

    pub fn parse(s: &str) -> Option<RoomKind> {
        match s {
            "living" => Some(RoomKind::Living),
            "bedroom" => Some(RoomKind::Bedroom),
            "kitchen" => Some(RoomKind::Kitchen),
            "bath" => Some(RoomKind::Bath),
            "hall" => Some(RoomKind::Hall),
            "storage" => Some(RoomKind::Storage),
            _ => None,
        }
    }
}

/// A door or window in a room wall.
///
/// `wall` indexes the room polygon edge (vertex i to i+1); `position` is the
/// opening center as a fraction of that wall's length.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Opening {
    pub wall: usize,
    pub position: f64,
    pub width: f64,
}

/// A generated room.
#[derive(Clone, Debug, PartialEq)]
pub struct Room {
    pub id: String,
    pub kind: RoomKind,
    /// Closed counter-clockwise polygon (rectangular for BSP leaves).
    pub polygon: Vec<Point>,
    pub doors: Vec<Opening>,
    pub windows: Vec<Opening>,
}

impl Room {
    pub fn area(&self) -> f64 {
        polygon_area(&self.polygon)
    }
}

/// An edge of the room adjacency graph, through a specific door.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
    pub via: String,
}

/// A complete floor plan.
#[derive(Clone, Debug, PartialEq)]
pub struct FloorPlan {
    pub width: f64,
    pub height: f64,
    pub rooms: Vec<Room>,
    pub connections: Vec<Connection>,
}

/// A wall segment shared by two leaves, in boundary coordinates.
#[derive(Clone, Copy, Debug)]
struct SharedWall {
    a: usize,
    b: usize,
    /// True when the wall is vertical (left/right adjacency).
    vertical: bool,
    /// Fixed coordinate of the wall line (x for vertical, y for horizontal).
    line: f64,
    /// Overlap interval along the wall.
    span: (f64, f64),
}

impl SharedWall {
    fn span_length(&self) -> f64 {
        self.span.1 - self.span.0
    }
}

/// Build a floor plan from partition leaves.
///
/// Leaves must tile the boundary (as `bsp::partition` guarantees); arbitrary
/// leaf sets are accepted but an unconnectable set is a `Generation` error.
pub fn build_floor_plan(
    boundary: Rect,
    leaves: &[Leaf],
    config: &RoomConfig,
    rng: &mut ChaCha8Rng,
) -> Result<FloorPlan, LayoutError> {
    config.validate()?;
    if leaves.is_empty() {
        return Err(LayoutError::Generation(
            "cannot build a floor plan from zero leaves".to_string(),
        ));
    }

    let kinds = assign_kinds(boundary, leaves, config.epsilon);
    let mut rooms: Vec<Room> = leaves
        .iter()
        .enumerate()
        .map(|(i, leaf)| Room {
            id: format!("room-{}", i),
            kind: kinds[i],
            polygon: leaf.rect.corners().to_vec(),
            doors: Vec::new(),
            windows: Vec::new(),
        })
        .collect();

    let walls = shared_walls(leaves, config.epsilon);

    // Every adjacent pair gets a door; ids follow placement order.
    let mut connections = Vec::new();
    let mut door_count = 0usize;
    for wall in &walls {
        place_door(&mut rooms, leaves, wall, config, rng);
        connections.push(Connection {
            from: rooms[wall.a].id.clone(),
            to: rooms[wall.b].id.clone(),
            via: format!("door-{}", door_count),
        });
        door_count += 1;
    }

    place_windows(&mut rooms, leaves, boundary, config, rng);

    ensure_connected(&mut rooms, leaves, &walls, &mut connections, config, rng, &mut door_count)?;

    Ok(FloorPlan {
        width: boundary.width,
        height: boundary.height,
        rooms,
        connections,
    })
}

/// Deterministic typing rule table: the largest leaf becomes the living room
/// and the smallest the bath; remaining perimeter leaves alternate between
/// bedroom and kitchen, interior leaves between hall and storage. Ties break
/// by leaf traversal order.
fn assign_kinds(boundary: Rect, leaves: &[Leaf], epsilon: f64) -> Vec<RoomKind> {
    let mut order: Vec<usize> = (0..leaves.len()).collect();
    order.sort_by(|&a, &b| {
        leaves[b]
            .rect
            .area()
            .partial_cmp(&leaves[a].rect.area())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    let largest = order[0];
    let smallest = *order.last().unwrap();

    let mut kinds = vec![RoomKind::Hall; leaves.len()];
    let mut perimeter_count = 0usize;
    let mut interior_count = 0usize;
    for (i, leaf) in leaves.iter().enumerate() {
        if i == largest {
            kinds[i] = RoomKind::Living;
        } else if i == smallest && leaves.len() > 1 {
            kinds[i] = RoomKind::Bath;
        } else if touches_perimeter(&leaf.rect, &boundary, epsilon) {
            kinds[i] = if perimeter_count % 2 == 0 { RoomKind::Bedroom } else { RoomKind::Kitchen };
            perimeter_count += 1;
        } else {
            kinds[i] = if interior_count % 2 == 0 { RoomKind::Hall } else { RoomKind::Storage };
            interior_count += 1;
        }
    }
    kinds
}

fn touches_perimeter(rect: &Rect, boundary: &Rect, epsilon: f64) -> bool {
    approx_eq(rect.x, boundary.x, epsilon)
        || approx_eq(rect.y, boundary.y, epsilon)
        || approx_eq(rect.x + rect.width, boundary.x + boundary.width, epsilon)
        || approx_eq(rect.y + rect.height, boundary.y + boundary.height, epsilon)
}

/// Find every wall segment of nonzero length shared by two leaves.
/// Pairs are scanned in traversal order, so the result is deterministic.
fn shared_walls(leaves: &[Leaf], epsilon: f64) -> Vec<SharedWall> {
    let mut walls = Vec::new();
    for a in 0..leaves.len() {
        for b in (a + 1)..leaves.len() {
            let ra = leaves[a].rect;
            let rb = leaves[b].rect;

            // Vertical adjacency: a's right edge on b's left edge or vice versa.
            for (left, right, ia, ib) in
                [(ra, rb, a, b), (rb, ra, b, a)]
            {
                if approx_eq(left.x + left.width, right.x, epsilon) {
                    let lo = left.y.max(right.y);
                    let hi = (left.y + left.height).min(right.y + right.height);
                    if hi - lo > epsilon {
                        walls.push(SharedWall {
                            a: ia,
                            b: ib,
                            vertical: true,
                            line: right.x,
                            span: (lo, hi),
                        });
                    }
                }
            }

            // Horizontal adjacency: one leaf's top edge on the other's bottom.
            for (below, above, ia, ib) in
                [(ra, rb, a, b), (rb, ra, b, a)]
            {
                if approx_eq(below.y + below.height, above.y, epsilon) {
                    let lo = below.x.max(above.x);
                    let hi = (below.x + below.width).min(above.x + above.width);
                    if hi - lo > epsilon {
                        walls.push(SharedWall {
                            a: ia,
                            b: ib,
                            vertical: false,
                            line: above.y,
                            span: (lo, hi),
                        });
                    }
                }
            }
        }
    }
    walls
}

/// Pick an opening center inside `span`, inset from both ends by the
/// clearance plus half the opening width. A span too short for the inset
/// degrades to its midpoint so placement stays total.
fn opening_center(span: (f64, f64), width: f64, clearance: f64, rng: &mut ChaCha8Rng) -> f64 {
    let lo = span.0 + clearance + width / 2.0;
    let hi = span.1 - clearance - width / 2.0;
    if lo < hi {
        rng.gen_range(lo..hi)
    } else {
        (span.0 + span.1) / 2.0
    }
}

/// Add a door through `wall` to both adjoining rooms.
fn place_door(
    rooms: &mut [Room],
    leaves: &[Leaf],
    wall: &SharedWall,
    config: &RoomConfig,
    rng: &mut ChaCha8Rng,
) {
    let center = opening_center(wall.span, config.door_width, config.min_clearance, rng);
    for &(room_index, _other) in &[(wall.a, wall.b), (wall.b, wall.a)] {
        let rect = leaves[room_index].rect;
        let (wall_index, position) = wall_coordinates(&rect, wall, center);
        rooms[room_index].doors.push(Opening {
            wall: wall_index,
            position,
            width: config.door_width,
        });
    }
}

/// Map a point on a shared wall line to (wall index, fractional position)
/// of one room's polygon. Polygon walls run counter-clockwise from the
/// origin corner: 0 bottom, 1 right, 2 top, 3 left.
fn wall_coordinates(rect: &Rect, wall: &SharedWall, center: f64) -> (usize, f64) {
    if wall.vertical {
        if approx_eq(rect.x + rect.width, wall.line, 1e-6) {
            // Right wall, running upward.
            (1, (center - rect.y) / rect.height)
        } else {
            // Left wall, running downward.
            (3, (rect.y + rect.height - center) / rect.height)
        }
    } else if approx_eq(rect.y + rect.height, wall.line, 1e-6) {
        // Top wall, running in -x.
        (2, (rect.x + rect.width - center) / rect.width)
    } else {
        // Bottom wall, running in +x.
        (0, (center - rect.x) / rect.width)
    }
}

/// Put one window on every exterior wall of every room.
fn place_windows(
    rooms: &mut [Room],
    leaves: &[Leaf],
    boundary: Rect,
    config: &RoomConfig,
    rng: &mut ChaCha8Rng,
) {
    for (i, leaf) in leaves.iter().enumerate() {
        let rect = leaf.rect;
        // (wall index, on-perimeter test, span along the wall direction, reversed)
        let sides = [
            (0usize, approx_eq(rect.y, boundary.y, config.epsilon), (rect.x, rect.x + rect.width), false),
            (1, approx_eq(rect.x + rect.width, boundary.x + boundary.width, config.epsilon), (rect.y, rect.y + rect.height), false),
            (2, approx_eq(rect.y + rect.height, boundary.y + boundary.height, config.epsilon), (rect.x, rect.x + rect.width), true),
            (3, approx_eq(rect.x, boundary.x, config.epsilon), (rect.y, rect.y + rect.height), true),
        ];
        for (wall, exterior, span, reversed) in sides {
            if !exterior {
                continue;
            }
            let center = opening_center(span, config.window_width, config.min_clearance, rng);
            let length = span.1 - span.0;
            let fraction = (center - span.0) / length;
            let position = if reversed { 1.0 - fraction } else { fraction };
            rooms[i].windows.push(Opening {
                wall,
                position,
                width: config.window_width,
            });
        }
    }
}

/// Verify the door graph is connected; add doors on unused shared walls
/// joining separate components (longest shared span first, ties by room
/// index) until it is, or fail with a `Generation` error.
#[allow(clippy::too_many_arguments)]
fn ensure_connected(
    rooms: &mut [Room],
    leaves: &[Leaf],
    walls: &[SharedWall],
    connections: &mut Vec<Connection>,
    config: &RoomConfig,
    rng: &mut ChaCha8Rng,
    door_count: &mut usize,
) -> Result<(), LayoutError> {
    loop {
        let component = components(rooms.len(), connections, rooms);
        let component_total = component.iter().copied().max().map(|m| m + 1).unwrap_or(0);
        if component_total <= 1 {
            return Ok(());
        }

        // Candidate walls that bridge two components, best span first.
        let mut candidates: Vec<&SharedWall> = walls
            .iter()
            .filter(|w| component[w.a] != component[w.b])
            .collect();
        candidates.sort_by(|x, y| {
            y.span_length()
                .partial_cmp(&x.span_length())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(x.a.cmp(&y.a))
                .then(x.b.cmp(&y.b))
        });

        let Some(wall) = candidates.first() else {
            return Err(LayoutError::Generation(format!(
                "room adjacency graph has {} components and no shared wall joins them",
                component_total
            )));
        };

        place_door(rooms, leaves, wall, config, rng);
        connections.push(Connection {
            from: rooms[wall.a].id.clone(),
            to: rooms[wall.b].id.clone(),
            via: format!("door-{}", door_count),
        });
        *door_count += 1;
    }
}

/// Label each room with a component index via breadth-first search.
fn components(count: usize, connections: &[Connection], rooms: &[Room]) -> Vec<usize> {
    let index_of = |id: &str| rooms.iter().position(|r| r.id == id);
    let mut adjacency = vec![Vec::new(); count];
    for connection in connections {
        if let (Some(a), Some(b)) = (index_of(&connection.from), index_of(&connection.to)) {
            adjacency[a].push(b);
            adjacency[b].push(a);
        }
    }

    let mut component = vec![usize::MAX; count];
    let mut next = 0usize;
    for start in 0..count {
        if component[start] != usize::MAX {
            continue;
        }
        let mut queue = std::collections::VecDeque::from([start]);
        component[start] = next;
        while let Some(node) = queue.pop_front() {
            for &neighbor in &adjacency[node] {
                if component[neighbor] == usize::MAX {
                    component[neighbor] = next;
                    queue.push_back(neighbor);
                }
            }
        }
        next += 1;
    }
    component
}
