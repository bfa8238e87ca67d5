//! Binary space partitioning for floor plan generation
//!
//! Recursively subdivides a rectangular boundary into leaf cells under
//! area/depth/ratio constraints. The partition tree is a flat index-addressed
//! arena, never a pointer graph, and is discarded once the leaves are
//! extracted. Leaves come out in pre-order (first child first) so identical
//! inputs always yield identically ordered output.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::config::BspConfig;
use crate::error::LayoutError;
use crate::geometry::Rect;

/// A leaf cell of the partition, destined to become one room.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Leaf {
    pub rect: Rect,
    /// True when the cell's area still exceeds `max_room_area` but no split
    /// could keep both children at or above `min_room_area`.
    pub oversize: bool,
}

/// A node of the partition tree, addressed by index into the arena.
#[derive(Clone, Copy, Debug)]
struct BspNode {
    rect: Rect,
    depth: u32,
    /// Child indices, populated when the node splits. `None` marks a leaf.
    children: Option<(usize, usize)>,
    oversize: bool,
}

/// Recursively partition `boundary` into leaf rectangles.
///
/// Fails fast with a `Config` error when the parameter ranges are invalid or
/// the boundary is already smaller than `min_room_area`; the partitioner
/// never emits degenerate output.
pub fn partition(
    boundary: Rect,
    config: &BspConfig,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<Leaf>, LayoutError> {
    config.validate()?;
    if boundary.width <= 0.0 || boundary.height <= 0.0 {
        return Err(LayoutError::Config(format!(
            "boundary must have positive dimensions, got {}x{}",
            boundary.width, boundary.height
        )));
    }
    if boundary.area() < config.min_room_area {
        return Err(LayoutError::Config(format!(
            "boundary area {} is smaller than min_room_area {}",
            boundary.area(),
            config.min_room_area
        )));
    }

    let mut arena = vec![BspNode {
        rect: boundary,
        depth: 0,
        children: None,
        oversize: false,
    }];

    // Build pass. An explicit stack, pushing the second child first, visits
    // nodes in pre-order and fixes the RNG consumption order.
    let mut stack = vec![0usize];
    while let Some(index) = stack.pop() {
        let node = arena[index];

        if node.rect.area() <= config.max_room_area {
            continue;
        }
        if node.depth >= config.max_depth || node.rect.area() < 2.0 * config.min_room_area {
            // Cannot split further; the area bound is allowed to overshoot here.
            arena[index].oversize = true;
            continue;
        }

        match try_split(&node.rect, config, rng) {
            Some((first, second)) => {
                let first_index = arena.len();
                arena.push(BspNode {
                    rect: first,
                    depth: node.depth + 1,
                    children: None,
                    oversize: false,
                });
                let second_index = arena.len();
                arena.push(BspNode {
                    rect: second,
                    depth: node.depth + 1,
                    children: None,
                    oversize: false,
                });
                arena[index].children = Some((first_index, second_index));

                stack.push(second_index);
                stack.push(first_index);
            }
            None => {
                // Retry budget exhausted: the rectangle becomes a leaf.
                arena[index].oversize = true;
            }
        }
    }

    // Extraction pass: walk the finished tree pre-order and collect leaves.
    // The arena is dropped on return; nothing downstream sees the tree.
    let mut leaves = Vec::new();
    let mut stack = vec![0usize];
    while let Some(index) = stack.pop() {
        let node = arena[index];
        match node.children {
            Some((first, second)) => {
                stack.push(second);
                stack.push(first);
            }
            None => leaves.push(Leaf {
                rect: node.rect,
                oversize: node.oversize,
            }),
        }
    }

    Ok(leaves)
}

/// Draw split ratios until both children satisfy `min_room_area`, within the
/// configured retry budget. Returns `None` when every draw failed.
fn try_split(rect: &Rect, config: &BspConfig, rng: &mut ChaCha8Rng) -> Option<(Rect, Rect)> {
    // Split the longer side; ties prefer a horizontal cut.
    let horizontal = rect.height >= rect.width;
    let (lo, hi) = config.split_ratio_range;

    for _ in 0..=config.split_retries {
        let ratio = rng.gen_range(lo..hi);
        let (first, second) = split_at(rect, horizontal, ratio);
        if first.area() >= config.min_room_area && second.area() >= config.min_room_area {
            return Some((first, second));
        }
    }
    None
}

/// Cut a rectangle at `ratio` of the split dimension. A horizontal cut splits
/// the height; the first child is the bottom/left one.
fn split_at(rect: &Rect, horizontal: bool, ratio: f64) -> (Rect, Rect) {
    if horizontal {
        let first_height = rect.height * ratio;
        (
            Rect::new(rect.x, rect.y, rect.width, first_height),
            Rect::new(rect.x, rect.y + first_height, rect.width, rect.height - first_height),
        )
    } else {
        let first_width = rect.width * ratio;
        (
            Rect::new(rect.x, rect.y, first_width, rect.height),
            Rect::new(rect.x + first_width, rect.y, rect.width - first_width, rect.height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::approx_eq;
    use rand::SeedableRng;

    fn config(min: f64, max: f64) -> BspConfig {
        BspConfig {
            min_room_area: min,
            max_room_area: max,
            split_ratio_range: (0.3, 0.7),
            max_depth: 10,
            split_retries: 5,
            room_height_default: 2.7,
        }
    }

    #[test]
    fn test_partition_is_deterministic() {
        let boundary = Rect::new(0.0, 0.0, 24.0, 18.0);
        let cfg = config(9.0, 40.0);

        let mut rng_a = ChaCha8Rng::seed_from_u64(42);
        let mut rng_b = ChaCha8Rng::seed_from_u64(42);
        let leaves_a = partition(boundary, &cfg, &mut rng_a).unwrap();
        let leaves_b = partition(boundary, &cfg, &mut rng_b).unwrap();

        assert_eq!(leaves_a, leaves_b);
    }

    #[test]
    fn test_leaf_areas_sum_to_boundary() {
        let boundary = Rect::new(0.0, 0.0, 24.0, 18.0);
        let cfg = config(9.0, 40.0);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let leaves = partition(boundary, &cfg, &mut rng).unwrap();

        let sum: f64 = leaves.iter().map(|l| l.rect.area()).sum();
        assert!(approx_eq(sum, boundary.area(), 1e-6));
    }

    #[test]
    fn test_area_bounds_respected() {
        let boundary = Rect::new(0.0, 0.0, 30.0, 20.0);
        let cfg = config(9.0, 40.0);
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let leaves = partition(boundary, &cfg, &mut rng).unwrap();

        for leaf in &leaves {
            assert!(leaf.rect.area() >= cfg.min_room_area - 1e-9);
            if !leaf.oversize {
                assert!(leaf.rect.area() <= cfg.max_room_area + 1e-9);
            }
        }
    }

    #[test]
    fn test_boundary_below_max_is_single_leaf() {
        // 10x8 boundary with max_room_area 100: the root is already a leaf.
        let boundary = Rect::new(0.0, 0.0, 10.0, 8.0);
        let cfg = config(9.0, 100.0);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let leaves = partition(boundary, &cfg, &mut rng).unwrap();

        assert_eq!(leaves.len(), 1);
        assert!(approx_eq(leaves[0].rect.area(), 80.0, 1e-9));
        assert!(!leaves[0].oversize);
    }

    #[test]
    fn test_min_over_max_is_config_error() {
        let boundary = Rect::new(0.0, 0.0, 10.0, 8.0);
        let cfg = config(100.0, 9.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            partition(boundary, &cfg, &mut rng),
            Err(LayoutError::Config(_))
        ));
    }

    #[test]
    fn test_tiny_boundary_is_config_error() {
        let boundary = Rect::new(0.0, 0.0, 2.0, 2.0);
        let cfg = config(9.0, 40.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            partition(boundary, &cfg, &mut rng),
            Err(LayoutError::Config(_))
        ));
    }

    #[test]
    fn test_max_depth_limits_splitting() {
        let boundary = Rect::new(0.0, 0.0, 100.0, 100.0);
        let cfg = BspConfig {
            max_depth: 1,
            ..config(9.0, 40.0)
        };
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let leaves = partition(boundary, &cfg, &mut rng).unwrap();

        // Depth 1 allows at most one split of the root.
        assert!(leaves.len() <= 2);
        assert!(leaves.iter().any(|l| l.oversize));
    }

    #[test]
    fn test_leaves_cover_without_overlap() {
        let boundary = Rect::new(0.0, 0.0, 24.0, 18.0);
        let cfg = config(9.0, 40.0);
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let leaves = partition(boundary, &cfg, &mut rng).unwrap();

        for (i, a) in leaves.iter().enumerate() {
            for b in leaves.iter().skip(i + 1) {
                let overlap_w = (a.rect.x + a.rect.width).min(b.rect.x + b.rect.width)
                    - a.rect.x.max(b.rect.x);
                let overlap_h = (a.rect.y + a.rect.height).min(b.rect.y + b.rect.height)
                    - a.rect.y.max(b.rect.y);
                let overlap = overlap_w.max(0.0) * overlap_h.max(0.0);
                assert!(overlap < 1e-6, "leaves {:?} and {:?} overlap", a.rect, b.rect);
            }
        }
    }
}
