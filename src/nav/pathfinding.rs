//! A* pathfinding over the tile lattice
//!
//! Respects the occupancy registry and static obstacles, searches the
//! 8-connected neighborhood (orthogonal cost 1, diagonal sqrt(2)), and
//! gives up after a hard expansion budget. Among equal-f candidates the
//! node inserted earliest pops first, so equal-cost routes are chosen
//! deterministically.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ahash::AHashMap;
use glam::Vec3;
use ordered_float::OrderedFloat;

use crate::grid::obstacles::ObstacleMap;
use crate::grid::occupancy::OccupancyRegistry;
use crate::grid::tile::TileCoord;

/// Node in the A* open set
#[derive(Debug, Clone, Copy)]
struct PathNode {
    tile: TileCoord,
    f_cost: OrderedFloat<f32>,
    /// Insertion sequence number; the tie-break among equal f costs
    seq: u64,
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.f_cost == other.f_cost && self.seq == other.seq
    }
}

impl Eq for PathNode {}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; earlier insertion wins ties
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn is_blocked(
    tile: TileCoord,
    registry: &OccupancyRegistry,
    obstacles: &dyn ObstacleMap,
) -> bool {
    registry.is_blocked(tile) || obstacles.is_statically_blocked(tile)
}

/// Find a route between two world positions using A*
///
/// Inputs are snapped internally. Returns the ordered tile centers from
/// start to goal inclusive, on the start's vertical plane, or `None` when
/// the goal tile is blocked, no route exists, or the expansion budget runs
/// out first.
pub fn find_path(
    start: Vec3,
    goal: Vec3,
    registry: &OccupancyRegistry,
    obstacles: &dyn ObstacleMap,
    tile_size: f32,
    max_expansions: usize,
) -> Option<Vec<Vec3>> {
    let start_tile = TileCoord::from_world(start, tile_size);
    let goal_tile = TileCoord::from_world(goal, tile_size);

    if is_blocked(goal_tile, registry, obstacles) {
        return None;
    }
    if start_tile == goal_tile {
        return Some(vec![on_plane(start_tile.center(tile_size), start.y)]);
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: AHashMap<TileCoord, TileCoord> = AHashMap::new();
    let mut g_scores: AHashMap<TileCoord, f32> = AHashMap::new();
    let mut seq = 0u64;

    g_scores.insert(start_tile, 0.0);
    open_set.push(PathNode {
        tile: start_tile,
        f_cost: OrderedFloat(start_tile.chebyshev(&goal_tile) as f32),
        seq,
    });

    let mut expansions = 0usize;

    while let Some(current) = open_set.pop() {
        if current.tile == goal_tile {
            return Some(reconstruct_path(
                &came_from, current.tile, tile_size, start.y,
            ));
        }

        expansions += 1;
        if expansions > max_expansions {
            tracing::debug!(
                start = %start_tile,
                goal = %goal_tile,
                max_expansions,
                "pathfinding budget exhausted"
            );
            return None;
        }

        let current_g = *g_scores.get(&current.tile).unwrap_or(&f32::INFINITY);

        for neighbor in current.tile.neighbors8() {
            if is_blocked(neighbor, registry, obstacles) {
                continue;
            }

            // 1.0 orthogonal, sqrt(2) diagonal, in tile units
            let tentative_g = current_g + current.tile.distance(&neighbor);
            let neighbor_g = *g_scores.get(&neighbor).unwrap_or(&f32::INFINITY);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.tile);
                g_scores.insert(neighbor, tentative_g);

                seq += 1;
                open_set.push(PathNode {
                    tile: neighbor,
                    f_cost: OrderedFloat(
                        tentative_g + neighbor.chebyshev(&goal_tile) as f32,
                    ),
                    seq,
                });
            }
        }
    }

    None // No path found
}

/// Reconstruct tile centers from the parent map
fn reconstruct_path(
    came_from: &AHashMap<TileCoord, TileCoord>,
    mut current: TileCoord,
    tile_size: f32,
    plane_y: f32,
) -> Vec<Vec3> {
    let mut tiles = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        tiles.push(prev);
        current = prev;
    }
    tiles.reverse();
    tiles
        .into_iter()
        .map(|t| on_plane(t.center(tile_size), plane_y))
        .collect()
}

fn on_plane(mut pos: Vec3, y: f32) -> Vec3 {
    pos.y = y;
    pos
}

/// Path cost: sum of consecutive straight-line tile distances
pub fn path_cost(path: &[Vec3], tile_size: f32) -> f32 {
    path.windows(2)
        .map(|pair| {
            TileCoord::from_world(pair[0], tile_size)
                .distance(&TileCoord::from_world(pair[1], tile_size))
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::obstacles::StaticObstacles;

    const SQRT_2: f32 = std::f32::consts::SQRT_2;

    fn open_world() -> (OccupancyRegistry, StaticObstacles) {
        (OccupancyRegistry::new(), StaticObstacles::new())
    }

    fn tile_path(path: &[Vec3]) -> Vec<TileCoord> {
        path.iter().map(|p| TileCoord::from_world(*p, 1.0)).collect()
    }

    #[test]
    fn test_straight_line_path() {
        let (registry, obstacles) = open_world();
        let path = find_path(
            Vec3::ZERO,
            Vec3::new(5.0, 0.0, 0.0),
            &registry,
            &obstacles,
            1.0,
            2048,
        )
        .unwrap();

        assert_eq!(path.first(), Some(&Vec3::ZERO));
        assert_eq!(path.last(), Some(&Vec3::new(5.0, 0.0, 0.0)));
        assert_eq!(path.len(), 6);
        assert_eq!(path_cost(&path, 1.0), 5.0);
    }

    #[test]
    fn test_diagonal_steps_shorten_the_route() {
        // Open 10x10 grid, (0,0) -> (3,4): 3 diagonal + 1 orthogonal steps,
        // so 5 waypoints total rather than the 7 an orthogonal-only route
        // would need.
        let (registry, obstacles) = open_world();
        let path = find_path(
            Vec3::ZERO,
            Vec3::new(3.0, 0.0, 4.0),
            &registry,
            &obstacles,
            1.0,
            2048,
        )
        .unwrap();

        assert_eq!(path.len(), 5);
        let expected_cost = 3.0 * SQRT_2 + 1.0;
        assert!((path_cost(&path, 1.0) - expected_cost).abs() < 1e-5);
    }

    #[test]
    fn test_path_around_obstacle_wall() {
        let (registry, mut obstacles) = open_world();
        // Wall across x = 2, leaving a gap at row 5
        for row in -4..5 {
            obstacles.block(TileCoord::new(2, row));
        }

        let path = find_path(
            Vec3::ZERO,
            Vec3::new(5.0, 0.0, 0.0),
            &registry,
            &obstacles,
            1.0,
            2048,
        )
        .unwrap();

        for tile in tile_path(&path) {
            assert!(!obstacles.is_statically_blocked(tile));
        }
        assert_eq!(path.last(), Some(&Vec3::new(5.0, 0.0, 0.0)));
    }

    #[test]
    fn test_blocked_goal_fails_immediately() {
        let (mut registry, obstacles) = open_world();
        registry.register(TileCoord::new(3, 3));

        let path = find_path(
            Vec3::ZERO,
            Vec3::new(3.0, 0.0, 3.0),
            &registry,
            &obstacles,
            1.0,
            2048,
        );
        assert!(path.is_none());
    }

    #[test]
    fn test_reserved_tiles_are_avoided() {
        let (mut registry, obstacles) = open_world();
        // Reserve the two direct tiles; route must bend around them
        registry.try_reserve(TileCoord::new(1, 0));
        registry.try_reserve(TileCoord::new(2, 0));

        let path = find_path(
            Vec3::ZERO,
            Vec3::new(4.0, 0.0, 0.0),
            &registry,
            &obstacles,
            1.0,
            2048,
        )
        .unwrap();

        for tile in tile_path(&path) {
            assert!(!registry.is_blocked(tile));
        }
    }

    #[test]
    fn test_no_path_when_goal_region_sealed() {
        let (registry, mut obstacles) = open_world();
        let goal = TileCoord::new(10, 10);
        for n in goal.neighbors8() {
            obstacles.block(n);
        }

        let path = find_path(
            Vec3::ZERO,
            Vec3::new(10.0, 0.0, 10.0),
            &registry,
            &obstacles,
            1.0,
            10_000,
        );
        assert!(path.is_none());
    }

    #[test]
    fn test_expansion_budget_enforced() {
        let (registry, mut obstacles) = open_world();
        // Serpentine walls force a long detour that cannot fit in a tiny
        // expansion budget.
        for row in -20..=20 {
            if row != 20 {
                obstacles.block(TileCoord::new(2, row));
            }
            if row != -20 {
                obstacles.block(TileCoord::new(4, row));
            }
        }

        let generous = find_path(
            Vec3::ZERO,
            Vec3::new(6.0, 0.0, 0.0),
            &registry,
            &obstacles,
            1.0,
            100_000,
        );
        assert!(generous.is_some());

        let starved = find_path(
            Vec3::ZERO,
            Vec3::new(6.0, 0.0, 0.0),
            &registry,
            &obstacles,
            1.0,
            10,
        );
        assert!(starved.is_none());
    }

    #[test]
    fn test_same_start_and_goal() {
        let (registry, obstacles) = open_world();
        let path = find_path(
            Vec3::new(5.2, 1.0, 4.8),
            Vec3::new(4.9, 0.0, 5.1),
            &registry,
            &obstacles,
            1.0,
            2048,
        )
        .unwrap();

        assert_eq!(path.len(), 1);
        assert_eq!(path[0], Vec3::new(5.0, 1.0, 5.0));
    }

    #[test]
    fn test_waypoints_keep_the_start_plane() {
        let (registry, obstacles) = open_world();
        let path = find_path(
            Vec3::new(0.0, 2.5, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
            &registry,
            &obstacles,
            1.0,
            2048,
        )
        .unwrap();

        for wp in &path {
            assert_eq!(wp.y, 2.5);
        }
    }

    #[test]
    fn test_equal_cost_routes_are_deterministic() {
        let (registry, obstacles) = open_world();
        let a = find_path(
            Vec3::ZERO,
            Vec3::new(6.0, 0.0, 6.0),
            &registry,
            &obstacles,
            1.0,
            2048,
        )
        .unwrap();
        let b = find_path(
            Vec3::ZERO,
            Vec3::new(6.0, 0.0, 6.0),
            &registry,
            &obstacles,
            1.0,
            2048,
        )
        .unwrap();
        assert_eq!(a, b);
    }
}
