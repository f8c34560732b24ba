//! Tile addressing for the movement grid
//!
//! Pure functions mapping continuous world positions (Y-up) onto the
//! discrete tile lattice. Tiles are centered on integer multiples of the
//! tile size; rounding to nearest decides membership, so two positions
//! share a tile iff they round to the same column and row.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Discrete tile address; the unit of occupancy exclusivity
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Default,
    derive_more::Display,
)]
#[display(fmt = "({}, {})", col, row)]
pub struct TileCoord {
    pub col: i32,
    pub row: i32,
}

impl TileCoord {
    pub fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Tile containing a world position (X/Z rounded, Y ignored)
    pub fn from_world(pos: Vec3, tile_size: f32) -> Self {
        Self {
            col: (pos.x / tile_size).round() as i32,
            row: (pos.z / tile_size).round() as i32,
        }
    }

    /// Tile center in world space, on the Y = 0 plane
    ///
    /// Callers re-apply their own vertical coordinate; addressing never
    /// touches it.
    pub fn center(&self, tile_size: f32) -> Vec3 {
        Vec3::new(self.col as f32 * tile_size, 0.0, self.row as f32 * tile_size)
    }

    /// Chebyshev tile distance (max of per-axis deltas)
    ///
    /// The metric for range checks and the A* heuristic: admissible because
    /// a diagonal step costs sqrt(2) >= 1.
    pub fn chebyshev(&self, other: &Self) -> u32 {
        let dc = (self.col - other.col).unsigned_abs();
        let dr = (self.row - other.row).unsigned_abs();
        dc.max(dr)
    }

    /// Straight-line distance in tile units, used for path cost
    pub fn distance(&self, other: &Self) -> f32 {
        let dc = (self.col - other.col) as f32;
        let dr = (self.row - other.row) as f32;
        (dc * dc + dr * dr).sqrt()
    }

    /// The 8 surrounding tiles, in fixed order: E, NE, N, NW, W, SW, S, SE
    ///
    /// The order is part of the contract; neighbor-scanning tie-breaks
    /// (nearest adjacent tile, A* insertion order) depend on it being
    /// stable.
    pub fn neighbors8(&self) -> [TileCoord; 8] {
        [
            TileCoord::new(self.col + 1, self.row),
            TileCoord::new(self.col + 1, self.row - 1),
            TileCoord::new(self.col, self.row - 1),
            TileCoord::new(self.col - 1, self.row - 1),
            TileCoord::new(self.col - 1, self.row),
            TileCoord::new(self.col - 1, self.row + 1),
            TileCoord::new(self.col, self.row + 1),
            TileCoord::new(self.col + 1, self.row + 1),
        ]
    }
}

/// Snap a world position to the nearest tile center (Y untouched)
pub fn snap(pos: Vec3, tile_size: f32) -> Vec3 {
    Vec3::new(
        (pos.x / tile_size).round() * tile_size,
        pos.y,
        (pos.z / tile_size).round() * tile_size,
    )
}

/// Horizontal (XZ-plane) distance between two world positions
pub fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    (dx * dx + dz * dz).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_rounds_to_nearest_multiple() {
        let snapped = snap(Vec3::new(2.4, 1.5, -0.6), 1.0);
        assert_eq!(snapped, Vec3::new(2.0, 1.5, -1.0));
    }

    #[test]
    fn test_snap_leaves_vertical_axis_alone() {
        let snapped = snap(Vec3::new(0.3, 7.77, 0.3), 1.0);
        assert_eq!(snapped.y, 7.77);
    }

    #[test]
    fn test_snap_respects_tile_size() {
        let snapped = snap(Vec3::new(2.9, 0.0, 3.1), 2.0);
        assert_eq!(snapped, Vec3::new(2.0, 0.0, 4.0));
    }

    #[test]
    fn test_same_tile_iff_same_rounding() {
        let a = TileCoord::from_world(Vec3::new(1.4, 0.0, 1.4), 1.0);
        let b = TileCoord::from_world(Vec3::new(0.6, 5.0, 0.6), 1.0);
        let c = TileCoord::from_world(Vec3::new(1.6, 0.0, 1.4), 1.0);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_center_inverts_from_world() {
        let tile = TileCoord::new(-3, 7);
        let back = TileCoord::from_world(tile.center(1.5), 1.5);
        assert_eq!(tile, back);
    }

    #[test]
    fn test_chebyshev_distance() {
        let a = TileCoord::new(0, 0);
        assert_eq!(a.chebyshev(&TileCoord::new(3, 4)), 4);
        assert_eq!(a.chebyshev(&TileCoord::new(-2, 1)), 2);
        assert_eq!(a.chebyshev(&a), 0);
    }

    #[test]
    fn test_straight_line_distance() {
        let a = TileCoord::new(0, 0);
        assert_eq!(a.distance(&TileCoord::new(1, 0)), 1.0);
        assert!((a.distance(&TileCoord::new(1, 1)) - std::f32::consts::SQRT_2).abs() < 1e-6);
        assert_eq!(a.distance(&TileCoord::new(3, 4)), 5.0);
    }

    #[test]
    fn test_neighbors8_are_all_adjacent_and_distinct() {
        let center = TileCoord::new(2, -5);
        let neighbors = center.neighbors8();
        assert_eq!(neighbors.len(), 8);
        for n in &neighbors {
            assert_eq!(center.chebyshev(n), 1);
        }
        let unique: std::collections::HashSet<_> = neighbors.iter().collect();
        assert_eq!(unique.len(), 8);
    }

    #[test]
    fn test_display() {
        assert_eq!(TileCoord::new(3, -4).to_string(), "(3, -4)");
    }
}
