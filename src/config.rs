//! Configuration for the layout generation engine.
//!
//! All configs are serde-friendly so the CLI can load them from JSON files,
//! carry documented defaults, and validate themselves before any generation
//! starts. Validation failures are `LayoutError::Config` and fail fast.

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::geometry::DEFAULT_EPSILON;

/// Configuration for the BSP partitioner.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BspConfig {
    /// Minimum area a room may have, in square scene units.
    pub min_room_area: f64,

    /// Maximum area a room may have. Rectangles above this keep splitting.
    pub max_room_area: f64,

    /// Fraction range of the split dimension kept for the first child.
    pub split_ratio_range: (f64, f64),

    /// Maximum recursion depth of the partition tree.
    pub max_depth: u32,

    /// Ratio redraws allowed before a rectangle gives up and becomes a leaf.
    pub split_retries: u32,

    /// Default room height handed to the downstream content engine.
    pub room_height_default: f64,
}

impl Default for BspConfig {
    fn default() -> Self {
        Self {
            min_room_area: 9.0,
            max_room_area: 40.0,
            split_ratio_range: (0.35, 0.65),
            max_depth: 8,
            split_retries: 5,
            room_height_default: 2.7,
        }
    }
}

impl BspConfig {
    /// Check parameter ranges. Called before partitioning begins.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.min_room_area <= 0.0 {
            return Err(LayoutError::Config(format!(
                "min_room_area must be positive, got {}",
                self.min_room_area
            )));
        }
        if self.min_room_area > self.max_room_area {
            return Err(LayoutError::Config(format!(
                "min_room_area ({}) exceeds max_room_area ({})",
                self.min_room_area, self.max_room_area
            )));
        }
        let (lo, hi) = self.split_ratio_range;
        if !(0.0 < lo && lo < hi && hi < 1.0) {
            return Err(LayoutError::Config(format!(
                "split_ratio_range ({}, {}) must satisfy 0 < lo < hi < 1",
                lo, hi
            )));
        }
        Ok(())
    }
}

/// Configuration for the room graph builder.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Width of a placed door, in scene units.
    pub door_width: f64,

    /// Width of a placed window, in scene units.
    pub window_width: f64,

    /// Minimum inset of an opening from the wall corners.
    pub min_clearance: f64,

    /// Coincidence tolerance used for wall adjacency tests.
    pub epsilon: f64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            door_width: 0.9,
            window_width: 1.2,
            min_clearance: 0.3,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl RoomConfig {
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.door_width <= 0.0 || self.window_width <= 0.0 {
            return Err(LayoutError::Config(
                "door_width and window_width must be positive".to_string(),
            ));
        }
        if self.min_clearance < 0.0 {
            return Err(LayoutError::Config(
                "min_clearance must not be negative".to_string(),
            ));
        }
        if self.epsilon <= 0.0 {
            return Err(LayoutError::Config("epsilon must be positive".to_string()));
        }
        Ok(())
    }
}

/// One weighted production of an L-system rule, in textual symbol form.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Symbol being rewritten (e.g. 'F' or a caller-defined non-terminal).
    pub symbol: char,
    /// Replacement sequence (e.g. "F[+F]F[-F]F").
    pub replacement: String,
    /// Selection probability. Probabilities per symbol must sum to 1.
    pub probability: f64,
}

/// Configuration for the L-system grammar engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LSystemConfig {
    /// Starting symbol string.
    pub axiom: String,

    /// Production rules. Multiple entries per symbol form a stochastic rule.
    pub rules: Vec<RuleSpec>,

    /// Number of rewriting generations.
    pub iterations: u32,

    /// Length of one draw-forward step, in scene units.
    pub step_length: f64,

    /// Turn angle per turn symbol, in degrees.
    pub angle_increment: f64,

    /// Hard cap on emitted road segments.
    pub max_segments: usize,

    /// Hard cap on the expanded symbol sequence length, checked before
    /// expansion from the worst-case growth factor.
    pub max_symbols: usize,
}

impl Default for LSystemConfig {
    fn default() -> Self {
        Self {
            axiom: "F".to_string(),
            rules: vec![RuleSpec {
                symbol: 'F',
                replacement: "F[+F]F[-F]F".to_string(),
                probability: 1.0,
            }],
            iterations: 3,
            step_length: 10.0,
            angle_increment: 25.0,
            max_segments: 20_000,
            max_symbols: 200_000,
        }
    }
}

impl LSystemConfig {
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.axiom.is_empty() {
            return Err(LayoutError::Config("axiom must not be empty".to_string()));
        }
        if self.step_length <= 0.0 {
            return Err(LayoutError::Config(format!(
                "step_length must be positive, got {}",
                self.step_length
            )));
        }
        if self.max_segments == 0 || self.max_symbols == 0 {
            return Err(LayoutError::Config(
                "max_segments and max_symbols must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Turtle settings implied by this grammar config.
    pub fn turtle(&self) -> TurtleConfig {
        TurtleConfig {
            step_length: self.step_length,
            angle_increment: self.angle_increment,
            max_segments: self.max_segments,
            ..TurtleConfig::default()
        }
    }
}

/// Configuration for turtle interpretation and intersection resolution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TurtleConfig {
    /// Length of one draw-forward step, in scene units.
    pub step_length: f64,

    /// Turn angle per turn symbol, in degrees.
    pub angle_increment: f64,

    /// Hard cap on candidate segments before interpretation begins.
    pub max_segments: usize,

    /// Lane count assigned to every emitted edge.
    pub lanes: u32,

    /// Width of one lane; edge width = lanes * lane_width.
    pub lane_width: f64,

    /// Coincidence tolerance for node merging and crossing tests.
    pub epsilon: f64,

    /// Factor the epsilon is widened by, once, when a merge cluster is
    /// ambiguous. Ambiguity surviving the widened pass is a GeometryError.
    pub epsilon_widen_factor: f64,
}

impl Default for TurtleConfig {
    fn default() -> Self {
        Self {
            step_length: 10.0,
            angle_increment: 25.0,
            max_segments: 20_000,
            lanes: 2,
            lane_width: 3.5,
            epsilon: DEFAULT_EPSILON,
            epsilon_widen_factor: 4.0,
        }
    }
}

impl TurtleConfig {
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.step_length <= 0.0 {
            return Err(LayoutError::Config(format!(
                "step_length must be positive, got {}",
                self.step_length
            )));
        }
        if self.lanes == 0 || self.lane_width <= 0.0 {
            return Err(LayoutError::Config(
                "lanes and lane_width must be positive".to_string(),
            ));
        }
        if self.epsilon <= 0.0 || self.epsilon_widen_factor < 1.0 {
            return Err(LayoutError::Config(
                "epsilon must be positive and epsilon_widen_factor at least 1".to_string(),
            ));
        }
        if self.max_segments == 0 {
            return Err(LayoutError::Config("max_segments must be positive".to_string()));
        }
        Ok(())
    }
}
