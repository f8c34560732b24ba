//! Tile occupancy registry
//!
//! Shared table of which tiles hold a resting agent (`occupied`) or are
//! promised to an agent mid-transit (`reserved`). The registry stores
//! presence only, never agent identity; callers must not double-register.
//! One instance is owned by each world and passed by reference to the
//! path finder and movers, so independent worlds never share state.
//!
//! All mutual exclusion in the simulation rests on one invariant: a
//! successful `try_reserve` is matched by exactly one later `release` or
//! `commit`, on every path including cancellation and despawn.

use ahash::AHashSet;

use crate::grid::tile::TileCoord;

/// Occupied and reserved tile sets for one simulated world
#[derive(Debug, Clone, Default)]
pub struct OccupancyRegistry {
    occupied: AHashSet<TileCoord>,
    reserved: AHashSet<TileCoord>,
}

impl OccupancyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// An agent currently rests on this tile
    pub fn is_occupied(&self, tile: TileCoord) -> bool {
        self.occupied.contains(&tile)
    }

    /// An agent has committed to arrive on this tile
    pub fn is_reserved(&self, tile: TileCoord) -> bool {
        self.reserved.contains(&tile)
    }

    /// Occupied or reserved; the traversability test movers and the path
    /// finder use
    pub fn is_blocked(&self, tile: TileCoord) -> bool {
        self.occupied.contains(&tile) || self.reserved.contains(&tile)
    }

    /// Mark a tile occupied. Returns false if it already was.
    pub fn register(&mut self, tile: TileCoord) -> bool {
        self.occupied.insert(tile)
    }

    /// Clear a tile's occupancy. Returns false if it wasn't occupied.
    pub fn unregister(&mut self, tile: TileCoord) -> bool {
        self.occupied.remove(&tile)
    }

    /// Check-then-reserve in one call: the first agent to ask for a tile in
    /// a tick wins it, later askers see `false` and must replan
    pub fn try_reserve(&mut self, tile: TileCoord) -> bool {
        if self.is_blocked(tile) {
            return false;
        }
        self.reserved.insert(tile)
    }

    /// Cancel a reservation without moving. Returns false if none was held.
    pub fn release(&mut self, tile: TileCoord) -> bool {
        self.reserved.remove(&tile)
    }

    /// Complete a step: the reservation on `to` becomes occupancy, and the
    /// departure tile `from` is vacated
    pub fn commit(&mut self, from: TileCoord, to: TileCoord) {
        self.reserved.remove(&to);
        self.occupied.remove(&from);
        self.occupied.insert(to);
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied.len()
    }

    pub fn reserved_count(&self) -> usize {
        self.reserved.len()
    }

    /// Drop everything (world unload)
    pub fn clear(&mut self) {
        self.occupied.clear();
        self.reserved.clear();
    }
}
