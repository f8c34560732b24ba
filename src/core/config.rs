//! Simulation configuration with documented constants
//!
//! All magic numbers are collected here with explanations of their purpose
//! and how they interact with each other.

/// Configuration for the simulation systems
///
/// These values have been tuned to produce good emergent behavior.
/// Changing them will affect pacing and feel.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    // === GRID ===
    /// Edge length of one movement tile (world units)
    ///
    /// Tiles are centered on integer multiples of this value; two world
    /// positions share a tile iff they round to the same multiples.
    pub tile_size: f32,

    // === MOVEMENT ===
    /// Unmodified movement speed (tiles per second)
    ///
    /// Step duration is `tile_distance / (base_tiles_per_sec * modifiers)`,
    /// so a diagonal step takes sqrt(2) times longer than an orthogonal one.
    pub base_tiles_per_sec: f32,

    // === PATHFINDING ===
    /// Hard budget on A* node expansions per path request
    ///
    /// Guards against runaway search on large or mostly-walled maps.
    /// A request that exhausts the budget fails; the agent idles and
    /// re-decides next tick.
    pub max_path_expansions: usize,

    // === PERCEPTION ===
    /// How far agents notice other agents (world units)
    ///
    /// Sightings also require a clear line of sight. This radius drives
    /// the per-tick hostility scan, so it is the main cost knob for
    /// crowded worlds.
    pub detection_radius: f32,

    // === COMBAT ===
    /// Beyond this distance a hostile agent gives up pursuit (world units)
    ///
    /// Should be at most `detection_radius`; the gap between the two gives
    /// agents a band where they see a target but will not chase it.
    pub aggro_radius: f32,

    /// Melee reach in tiles (Chebyshev, so diagonal adjacency counts)
    pub melee_range_tiles: u32,

    /// Seconds between melee attacks
    pub attack_cooldown: f32,

    /// Damage handed to the `DamageHook` per landed melee attack
    ///
    /// The core owns no damage formula; hosts interpret this number.
    pub melee_damage: f32,

    // === WANDER ===
    /// Maximum wander distance from home (tiles, per axis)
    pub wander_radius_tiles: i32,

    /// Shortest idle pause between wander walks (seconds)
    pub wander_idle_min: f32,

    /// Longest idle pause between wander walks (seconds)
    pub wander_idle_max: f32,

    /// Random tiles sampled before falling back to walking home
    ///
    /// Each sample must be unblocked and reachable. Raising this makes
    /// wandering livelier on cluttered maps at pathfinding cost.
    pub wander_sample_attempts: u32,

    // === DETERMINISM ===
    /// Seed for the world's RNG (wander targets, idle jitter)
    ///
    /// Same seed + same call sequence = same run.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tile_size: 1.0,
            base_tiles_per_sec: 3.0,
            max_path_expansions: 2048,
            detection_radius: 12.0,
            aggro_radius: 10.0,
            melee_range_tiles: 1,
            attack_cooldown: 1.5,
            melee_damage: 10.0,
            wander_radius_tiles: 6,
            wander_idle_min: 2.0,
            wander_idle_max: 6.0,
            wander_sample_attempts: 8,
            seed: 0xC17AD31,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_coherent() {
        let cfg = SimulationConfig::default();
        assert!(cfg.tile_size > 0.0);
        assert!(cfg.base_tiles_per_sec > 0.0);
        assert!(cfg.aggro_radius <= cfg.detection_radius);
        assert!(cfg.wander_idle_min <= cfg.wander_idle_max);
        assert!(cfg.max_path_expansions > 0);
    }
}
