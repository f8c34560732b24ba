//! Perception queries and line of sight
//!
//! The brain never touches the agent roster directly; it sees the world
//! through the `Senses` contract. The world hands each tick a snapshot of
//! agent positions taken at the start of the tick, so every agent decides
//! against the same consistent picture.

use glam::Vec3;

use crate::core::types::{AgentId, FactionId};
use crate::grid::obstacles::ObstacleMap;
use crate::grid::tile::{horizontal_distance, TileCoord};

/// What a perception query reports about one nearby agent
#[derive(Debug, Clone, Copy)]
pub struct PerceivedAgent {
    pub id: AgentId,
    pub position: Vec3,
    pub faction: FactionId,
}

/// Capability contract for sight queries
pub trait Senses {
    /// Agents within `radius` (XZ distance) of `origin`, including the
    /// asker itself; callers filter by id
    fn visible_agents(&self, origin: Vec3, radius: f32) -> Vec<PerceivedAgent>;

    fn has_clear_sight(&self, from: Vec3, to: Vec3) -> bool;
}

/// Line of sight by sampling tiles along the segment
///
/// A statically blocked tile strictly between the endpoints breaks sight;
/// the endpoint tiles themselves never occlude.
pub fn tile_line_of_sight(
    from: Vec3,
    to: Vec3,
    obstacles: &dyn ObstacleMap,
    tile_size: f32,
) -> bool {
    let a = TileCoord::from_world(from, tile_size);
    let b = TileCoord::from_world(to, tile_size);
    let steps = a.chebyshev(&b);
    if steps < 2 {
        return true;
    }

    // Two samples per tile so diagonal segments cannot slip between
    // corners.
    let samples = steps * 2;
    for i in 1..samples {
        let t = i as f32 / samples as f32;
        let probe = Vec3::new(
            from.x + (to.x - from.x) * t,
            0.0,
            from.z + (to.z - from.z) * t,
        );
        let tile = TileCoord::from_world(probe, tile_size);
        if tile != a && tile != b && obstacles.is_statically_blocked(tile) {
            return false;
        }
    }
    true
}

/// Start-of-tick view of the agent roster, implementing `Senses`
pub struct WorldSnapshot<'a> {
    pub agents: Vec<PerceivedAgent>,
    pub obstacles: &'a dyn ObstacleMap,
    pub tile_size: f32,
}

impl Senses for WorldSnapshot<'_> {
    fn visible_agents(&self, origin: Vec3, radius: f32) -> Vec<PerceivedAgent> {
        self.agents
            .iter()
            .filter(|a| horizontal_distance(a.position, origin) <= radius)
            .copied()
            .collect()
    }

    fn has_clear_sight(&self, from: Vec3, to: Vec3) -> bool {
        tile_line_of_sight(from, to, self.obstacles, self.tile_size)
    }
}
