//! Static world geometry lookup
//!
//! Static obstacles (walls, water, placed buildings) are independent of the
//! occupancy registry: they never move and are consulted alongside it by
//! the path finder and movers. Hosts provide the lookup through the
//! `ObstacleMap` contract; `StaticObstacles` is a ready-made set-backed
//! implementation.

use ahash::AHashSet;

use crate::grid::tile::TileCoord;

/// Capability contract for static-geometry blocking
pub trait ObstacleMap {
    fn is_statically_blocked(&self, tile: TileCoord) -> bool;
}

/// Set of statically blocked tiles, O(1) lookup
#[derive(Debug, Clone, Default)]
pub struct StaticObstacles {
    blocked: AHashSet<TileCoord>,
}

impl StaticObstacles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block a single tile
    pub fn block(&mut self, tile: TileCoord) {
        self.blocked.insert(tile);
    }

    /// Unblock a single tile
    pub fn unblock(&mut self, tile: TileCoord) {
        self.blocked.remove(&tile);
    }

    /// Block every tile in the inclusive rectangle spanned by two corners
    pub fn block_rect(&mut self, a: TileCoord, b: TileCoord) {
        for col in a.col.min(b.col)..=a.col.max(b.col) {
            for row in a.row.min(b.row)..=a.row.max(b.row) {
                self.blocked.insert(TileCoord::new(col, row));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }
}

impl ObstacleMap for StaticObstacles {
    fn is_statically_blocked(&self, tile: TileCoord) -> bool {
        self.blocked.contains(&tile)
    }
}
