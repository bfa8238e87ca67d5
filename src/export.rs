//! Layout serialization to the canonical JSON contract.
//!
//! Converts floor plans and road networks to/from the fixed JSON field layout
//! consumed by the downstream 3D content engine. The round trip is lossless
//! for every field; floating-point values survive exactly through serde_json.
//! Documents carry a schema version checked on read.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::geometry::Point;
use crate::roads::{NodeKind, RoadEdge, RoadNetwork, RoadNode};
use crate::rooms::{Connection, FloorPlan, Opening, Room, RoomKind};

/// Schema version written to every document and required on read.
pub const SCHEMA_VERSION: &str = "1.0";

#[derive(Serialize, Deserialize)]
struct FloorPlanDoc {
    version: String,
    dimensions: DimensionsDoc,
    rooms: Vec<RoomDoc>,
    connections: Vec<ConnectionDoc>,
}

#[derive(Serialize, Deserialize)]
struct DimensionsDoc {
    width: f64,
    height: f64,
}

#[derive(Serialize, Deserialize)]
struct RoomDoc {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    polygon: Vec<[f64; 2]>,
    doors: Vec<OpeningDoc>,
    windows: Vec<OpeningDoc>,
}

#[derive(Serialize, Deserialize)]
struct OpeningDoc {
    wall: usize,
    position: f64,
    width: f64,
}

#[derive(Serialize, Deserialize)]
struct ConnectionDoc {
    from: String,
    to: String,
    via: String,
}

#[derive(Serialize, Deserialize)]
struct RoadNetworkDoc {
    version: String,
    nodes: Vec<NodeDoc>,
    edges: Vec<EdgeDoc>,
}

#[derive(Serialize, Deserialize)]
struct NodeDoc {
    id: String,
    position: [f64; 2],
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Serialize, Deserialize)]
struct EdgeDoc {
    id: String,
    from: String,
    to: String,
    curve: Vec<[f64; 2]>,
    lanes: u32,
    width: f64,
    markings: Vec<String>,
}

fn check_version(version: &str) -> Result<(), LayoutError> {
    if version != SCHEMA_VERSION {
        return Err(LayoutError::Serialization(format!(
            "document version '{}' does not match supported version '{}'",
            version, SCHEMA_VERSION
        )));
    }
    Ok(())
}

/// Serialize a floor plan to the canonical JSON document.
pub fn floor_plan_to_json(plan: &FloorPlan) -> Result<String, LayoutError> {
    let doc = FloorPlanDoc {
        version: SCHEMA_VERSION.to_string(),
        dimensions: DimensionsDoc {
            width: plan.width,
            height: plan.height,
        },
        rooms: plan
            .rooms
            .iter()
            .map(|room| RoomDoc {
                id: room.id.clone(),
                kind: room.kind.as_str().to_string(),
                polygon: room.polygon.iter().map(|p| [p.x, p.y]).collect(),
                doors: room.doors.iter().map(opening_doc).collect(),
                windows: room.windows.iter().map(opening_doc).collect(),
            })
            .collect(),
        connections: plan
            .connections
            .iter()
            .map(|c| ConnectionDoc {
                from: c.from.clone(),
                to: c.to.clone(),
                via: c.via.clone(),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

fn opening_doc(opening: &Opening) -> OpeningDoc {
    OpeningDoc {
        wall: opening.wall,
        position: opening.position,
        width: opening.width,
    }
}

/// Parse a floor plan from its canonical JSON document.
pub fn floor_plan_from_json(json: &str) -> Result<FloorPlan, LayoutError> {
    let doc: FloorPlanDoc = serde_json::from_str(json)?;
    check_version(&doc.version)?;

    let mut rooms = Vec::with_capacity(doc.rooms.len());
    for room in doc.rooms {
        let kind = RoomKind::parse(&room.kind).ok_or_else(|| {
            LayoutError::Serialization(format!("unknown room type '{}'", room.kind))
        })?;
        rooms.push(Room {
            id: room.id,
            kind,
            polygon: room.polygon.iter().map(|[x, y]| Point::new(*x, *y)).collect(),
            doors: room.doors.iter().map(opening_from_doc).collect(),
            windows: room.windows.iter().map(opening_from_doc).collect(),
        });
    }

    Ok(FloorPlan {
        width: doc.dimensions.width,
        height: doc.dimensions.height,
        rooms,
        connections: doc
            .connections
            .into_iter()
            .map(|c| Connection {
                from: c.from,
                to: c.to,
                via: c.via,
            })
            .collect(),
    })
}

fn opening_from_doc(doc: &OpeningDoc) -> Opening {
    Opening {
        wall: doc.wall,
        position: doc.position,
        width: doc.width,
    }
}

/// Serialize a road network to the canonical JSON document.
pub fn road_network_to_json(network: &RoadNetwork) -> Result<String, LayoutError> {
    let doc = RoadNetworkDoc {
        version: SCHEMA_VERSION.to_string(),
        nodes: network
            .nodes
            .iter()
            .map(|node| NodeDoc {
                id: node.id.clone(),
                position: [node.position.x, node.position.y],
                kind: node.kind.as_str().to_string(),
            })
            .collect(),
        edges: network
            .edges
            .iter()
            .map(|edge| EdgeDoc {
                id: edge.id.clone(),
                from: edge.from.clone(),
                to: edge.to.clone(),
                curve: edge.curve.iter().map(|p| [p.x, p.y]).collect(),
                lanes: edge.lanes,
                width: edge.width,
                markings: edge.markings.clone(),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Parse a road network from its canonical JSON document.
///
/// Referential integrity is checked on read: every edge must reference two
/// existing nodes and carry at least two curve points.
pub fn road_network_from_json(json: &str) -> Result<RoadNetwork, LayoutError> {
    let doc: RoadNetworkDoc = serde_json::from_str(json)?;
    check_version(&doc.version)?;

    let mut nodes = Vec::with_capacity(doc.nodes.len());
    for node in doc.nodes {
        let kind = NodeKind::parse(&node.kind).ok_or_else(|| {
            LayoutError::Serialization(format!("unknown node type '{}'", node.kind))
        })?;
        nodes.push(RoadNode {
            id: node.id,
            position: Point::new(node.position[0], node.position[1]),
            kind,
        });
    }

    let mut edges = Vec::with_capacity(doc.edges.len());
    for edge in doc.edges {
        for endpoint in [&edge.from, &edge.to] {
            if !nodes.iter().any(|n| n.id == *endpoint) {
                return Err(LayoutError::Serialization(format!(
                    "edge '{}' references missing node '{}'",
                    edge.id, endpoint
                )));
            }
        }
        if edge.curve.len() < 2 {
            return Err(LayoutError::Serialization(format!(
                "edge '{}' has fewer than two curve points",
                edge.id
            )));
        }
        edges.push(RoadEdge {
            id: edge.id,
            from: edge.from,
            to: edge.to,
            curve: edge.curve.iter().map(|[x, y]| Point::new(*x, *y)).collect(),
            lanes: edge.lanes,
            width: edge.width,
            markings: edge.markings,
        });
    }

    Ok(RoadNetwork { nodes, edges })
}

/// Write a floor plan document to a file.
pub fn write_floor_plan_file(plan: &FloorPlan, path: &Path) -> Result<(), LayoutError> {
    let json = floor_plan_to_json(plan)?;
    fs::write(path, json).map_err(|e| LayoutError::Serialization(e.to_string()))
}

/// Read a floor plan document from a file.
pub fn read_floor_plan_file(path: &Path) -> Result<FloorPlan, LayoutError> {
    let json = fs::read_to_string(path).map_err(|e| LayoutError::Serialization(e.to_string()))?;
    floor_plan_from_json(&json)
}

/// Write a road network document to a file.
pub fn write_road_network_file(network: &RoadNetwork, path: &Path) -> Result<(), LayoutError> {
    let json = road_network_to_json(network)?;
    fs::write(path, json).map_err(|e| LayoutError::Serialization(e.to_string()))
}

/// Read a road network document from a file.
pub fn read_road_network_file(path: &Path) -> Result<RoadNetwork, LayoutError> {
    let json = fs::read_to_string(path).map_err(|e| LayoutError::Serialization(e.to_string()))?;
    road_network_from_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsp::partition;
    use crate::config::{BspConfig, RoomConfig, TurtleConfig};
    use crate::geometry::Rect;
    use crate::lsystem::parse_symbols;
    use crate::roads::interpret;
    use crate::rooms::build_floor_plan;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sample_plan() -> FloorPlan {
        let boundary = Rect::new(0.0, 0.0, 24.0, 18.0);
        let config = BspConfig {
            min_room_area: 9.0,
            max_room_area: 60.0,
            ..BspConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let leaves = partition(boundary, &config, &mut rng).unwrap();
        build_floor_plan(boundary, &leaves, &RoomConfig::default(), &mut rng).unwrap()
    }

    fn sample_network() -> RoadNetwork {
        let symbols = parse_symbols("F[+F]F[-F]F").unwrap();
        interpret(&symbols, &TurtleConfig::default()).unwrap()
    }

    #[test]
    fn test_floor_plan_round_trip() {
        let plan = sample_plan();
        let json = floor_plan_to_json(&plan).unwrap();
        let back = floor_plan_from_json(&json).unwrap();
        assert_eq!(back, plan);
    }

    #[test]
    fn test_road_network_round_trip() {
        let network = sample_network();
        let json = road_network_to_json(&network).unwrap();
        let back = road_network_from_json(&json).unwrap();
        assert_eq!(back, network);
    }

    #[test]
    fn test_canonical_field_names() {
        let json = floor_plan_to_json(&sample_plan()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["version"], "1.0");
        assert!(value["dimensions"]["width"].is_number());
        let room = &value["rooms"][0];
        assert!(room["id"].is_string());
        assert!(room["type"].is_string());
        assert!(room["polygon"][0].is_array());

        let json = road_network_to_json(&sample_network()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], "1.0");
        let node = &value["nodes"][0];
        assert!(node["position"].is_array());
        assert!(node["type"].is_string());
        let edge = &value["edges"][0];
        assert!(edge["curve"].is_array());
        assert!(edge["lanes"].is_number());
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let json = floor_plan_to_json(&sample_plan())
            .unwrap()
            .replace("\"1.0\"", "\"2.0\"");
        assert!(matches!(
            floor_plan_from_json(&json),
            Err(LayoutError::Serialization(_))
        ));
    }

    #[test]
    fn test_unknown_room_type_rejected() {
        let json = floor_plan_to_json(&sample_plan())
            .unwrap()
            .replace("\"living\"", "\"ballroom\"");
        assert!(matches!(
            floor_plan_from_json(&json),
            Err(LayoutError::Serialization(_))
        ));
    }

    #[test]
    fn test_dangling_edge_reference_rejected() {
        let json = road_network_to_json(&sample_network())
            .unwrap()
            .replace("\"from\": \"node-0\"", "\"from\": \"node-99\"");
        assert!(matches!(
            road_network_from_json(&json),
            Err(LayoutError::Serialization(_))
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let plan = sample_plan();
        let tmp = std::env::temp_dir().join("layout_gen_test_plan.json");

        write_floor_plan_file(&plan, &tmp).expect("write failed");
        let back = read_floor_plan_file(&tmp).expect("read failed");
        assert_eq!(back, plan);

        let _ = fs::remove_file(&tmp);
    }
}
