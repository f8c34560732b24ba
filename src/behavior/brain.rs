//! Agent decision state machine
//!
//! Each tick the brain resolves a hostility disposition from perception,
//! then drives the mover: wander when calm, close and attack when hostile,
//! walk back when too far from home. Stun suppresses everything until it
//! expires. Decisions are re-evaluated fresh every tick; a failed path
//! request just leaves the agent idle until the next one.

use glam::Vec3;
use rand::Rng;

use crate::behavior::disposition::{Disposition, FactionTable, Standing};
use crate::behavior::perception::{PerceivedAgent, Senses};
use crate::core::config::SimulationConfig;
use crate::core::types::{AgentId, FactionId, SimTime};
use crate::grid::obstacles::ObstacleMap;
use crate::grid::occupancy::OccupancyRegistry;
use crate::grid::tile::{horizontal_distance, TileCoord};
use crate::nav::mover::{MoveState, Mover};
use crate::nav::pathfinding::find_path;

/// What the agent is currently doing, orthogonal to its disposition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activity {
    /// Idling between short walks to random nearby tiles
    Wandering,
    /// Closing on (or trading blows with) a hostile target
    Pursuing(AgentId),
    /// Walking back toward home
    Returning,
    /// All decision-making suppressed until the expiry
    Stunned { until: SimTime },
}

/// Action the brain asks the world to carry out this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrainCommand {
    Attack { target: AgentId },
}

/// Per-agent decision component
#[derive(Debug, Clone)]
pub struct AgentBrain {
    id: AgentId,
    faction: FactionId,
    home: Vec3,
    disposition: Disposition,
    activity: Activity,
    attack_ready_at: SimTime,
    next_wander_at: SimTime,
    /// Tile the current pursuit path was planned toward
    current_goal: Option<TileCoord>,
}

impl AgentBrain {
    pub fn new(id: AgentId, faction: FactionId, home: Vec3) -> Self {
        Self {
            id,
            faction,
            home,
            disposition: Disposition::default(),
            activity: Activity::Wandering,
            attack_ready_at: 0.0,
            next_wander_at: 0.0,
            current_goal: None,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn faction(&self) -> FactionId {
        self.faction
    }

    pub fn home(&self) -> Vec3 {
        self.home
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    /// Pin the disposition until `clear_override`; sticky across ticks
    pub fn set_override(&mut self, standing: Standing) {
        self.disposition = Disposition::Overridden(standing);
    }

    /// Return to automatic per-tick resolution
    pub fn clear_override(&mut self) {
        self.disposition = Disposition::Automatic(self.disposition.standing());
    }

    pub fn is_stunned(&self, now: SimTime) -> bool {
        matches!(self.activity, Activity::Stunned { until } if now < until)
    }

    /// Stun for `seconds`, extending (never shortening) an active stun
    ///
    /// Halts the mover immediately and drops any pursuit; decisions resume
    /// after the expiry.
    pub fn apply_stun(
        &mut self,
        seconds: f32,
        now: SimTime,
        mover: &mut Mover,
        registry: &mut OccupancyRegistry,
    ) -> SimTime {
        let mut until = now + f64::from(seconds);
        if let Activity::Stunned { until: existing } = self.activity {
            until = until.max(existing);
        }
        self.activity = Activity::Stunned { until };
        self.current_goal = None;
        mover.hard_stop(registry);
        tracing::debug!(agent = ?self.id, until, "agent stunned");
        until
    }

    /// Run one decision tick
    pub fn tick(
        &mut self,
        mover: &mut Mover,
        registry: &mut OccupancyRegistry,
        obstacles: &dyn ObstacleMap,
        senses: &dyn Senses,
        factions: &dyn FactionTable,
        cfg: &SimulationConfig,
        now: SimTime,
        rng: &mut impl Rng,
    ) -> Option<BrainCommand> {
        if let Activity::Stunned { until } = self.activity {
            if now < until {
                return None;
            }
            self.activity = Activity::Wandering;
            self.next_wander_at = now + self.idle_delay(cfg, rng);
        }

        // Knockback in flight: decisions resume when it lands.
        if mover.state() == MoveState::Forced {
            return None;
        }

        let (resolved, target) = self.scan(senses, factions, mover.position(), cfg);
        if !self.disposition.is_overridden() {
            let previous = self.disposition.standing();
            if previous != resolved {
                tracing::debug!(
                    agent = ?self.id,
                    from = ?previous,
                    to = ?resolved,
                    "disposition changed"
                );
            }
            self.disposition = Disposition::Automatic(resolved);
        }

        match self.disposition.standing() {
            Standing::Hostile => {
                self.hostile_tick(target, mover, registry, obstacles, cfg, now, rng)
            }
            Standing::Friendly | Standing::Neutral => {
                self.calm_tick(mover, registry, obstacles, cfg, now, rng);
                None
            }
        }
    }

    /// Classify everything in sight
    ///
    /// Any sighted hostile resolves the scan to Hostile; otherwise a
    /// sighted friendly resolves it to Friendly, else Neutral. Also
    /// reports the nearest hostile as the pursuit candidate.
    fn scan(
        &self,
        senses: &dyn Senses,
        factions: &dyn FactionTable,
        origin: Vec3,
        cfg: &SimulationConfig,
    ) -> (Standing, Option<PerceivedAgent>) {
        let mut saw_friendly = false;
        let mut nearest_hostile: Option<(f32, PerceivedAgent)> = None;

        for other in senses.visible_agents(origin, cfg.detection_radius) {
            if other.id == self.id {
                continue;
            }
            if !senses.has_clear_sight(origin, other.position) {
                continue;
            }
            match factions.relation(self.faction, other.faction) {
                Standing::Hostile => {
                    let d = horizontal_distance(origin, other.position);
                    if nearest_hostile.map_or(true, |(best, _)| d < best) {
                        nearest_hostile = Some((d, other));
                    }
                }
                Standing::Friendly => saw_friendly = true,
                Standing::Neutral => {}
            }
        }

        let resolved = if nearest_hostile.is_some() {
            Standing::Hostile
        } else if saw_friendly {
            Standing::Friendly
        } else {
            Standing::Neutral
        };
        (resolved, nearest_hostile.map(|(_, agent)| agent))
    }

    fn hostile_tick(
        &mut self,
        target: Option<PerceivedAgent>,
        mover: &mut Mover,
        registry: &mut OccupancyRegistry,
        obstacles: &dyn ObstacleMap,
        cfg: &SimulationConfig,
        now: SimTime,
        rng: &mut impl Rng,
    ) -> Option<BrainCommand> {
        let Some(target) = target else {
            // Nothing to fight (e.g. an override with no enemy in sight).
            self.calm_movement(mover, registry, obstacles, cfg, now, rng);
            return None;
        };

        let self_tile = mover.tile();
        let target_tile = TileCoord::from_world(target.position, cfg.tile_size);

        if self_tile.chebyshev(&target_tile) <= cfg.melee_range_tiles {
            self.activity = Activity::Pursuing(target.id);
            self.current_goal = None;
            mover.clear_path();
            if now >= self.attack_ready_at {
                self.attack_ready_at = now + f64::from(cfg.attack_cooldown);
                return Some(BrainCommand::Attack { target: target.id });
            }
            return None;
        }

        if horizontal_distance(mover.position(), target.position) <= cfg.aggro_radius {
            self.activity = Activity::Pursuing(target.id);
            self.chase(target_tile, mover, registry, obstacles, cfg, now);
            return None;
        }

        // Seen but out of reach: give up and settle down.
        self.current_goal = None;
        self.calm_movement(mover, registry, obstacles, cfg, now, rng);
        None
    }

    /// Path to the best free tile adjacent to the target
    ///
    /// Replans only when the chosen adjacent tile changes or the mover has
    /// gone idle, so a moving target is tracked without re-pathing every
    /// tick.
    fn chase(
        &mut self,
        target_tile: TileCoord,
        mover: &mut Mover,
        registry: &mut OccupancyRegistry,
        obstacles: &dyn ObstacleMap,
        cfg: &SimulationConfig,
        now: SimTime,
    ) {
        let self_tile = mover.tile();
        let goal = target_tile
            .neighbors8()
            .into_iter()
            .filter(|t| !registry.is_blocked(*t) && !obstacles.is_statically_blocked(*t))
            .min_by(|a, b| self_tile.distance(a).total_cmp(&self_tile.distance(b)));

        let Some(goal) = goal else {
            self.current_goal = None;
            return;
        };
        if self.current_goal == Some(goal) && !mover.is_idle() {
            return;
        }

        let mut dest = goal.center(cfg.tile_size);
        dest.y = mover.position().y;
        let path = find_path(
            mover.position(),
            dest,
            registry,
            obstacles,
            cfg.tile_size,
            cfg.max_path_expansions,
        );
        if let Some(path) = path {
            if mover.set_path(&path, now, registry, obstacles) {
                self.current_goal = Some(goal);
                return;
            }
        }
        // Idle until the next decision tick; no retry loop.
        self.current_goal = None;
    }

    fn calm_tick(
        &mut self,
        mover: &mut Mover,
        registry: &mut OccupancyRegistry,
        obstacles: &dyn ObstacleMap,
        cfg: &SimulationConfig,
        now: SimTime,
        rng: &mut impl Rng,
    ) {
        if matches!(self.activity, Activity::Pursuing(_)) {
            // Disengaged this tick.
            self.current_goal = None;
            self.activity = Activity::Wandering;
            self.next_wander_at = now + self.idle_delay(cfg, rng);
        }
        self.calm_movement(mover, registry, obstacles, cfg, now, rng);
    }

    /// Shared movement policy for every non-combat situation
    fn calm_movement(
        &mut self,
        mover: &mut Mover,
        registry: &mut OccupancyRegistry,
        obstacles: &dyn ObstacleMap,
        cfg: &SimulationConfig,
        now: SimTime,
        rng: &mut impl Rng,
    ) {
        if !mover.is_idle() {
            return;
        }

        let home_tile = TileCoord::from_world(self.home, cfg.tile_size);
        if mover.tile().chebyshev(&home_tile) > cfg.wander_radius_tiles.unsigned_abs() {
            self.activity = Activity::Returning;
            let mut dest = self.home;
            dest.y = mover.position().y;
            if let Some(path) = find_path(
                mover.position(),
                dest,
                registry,
                obstacles,
                cfg.tile_size,
                cfg.max_path_expansions,
            ) {
                mover.set_path(&path, now, registry, obstacles);
            }
            return;
        }

        if matches!(self.activity, Activity::Returning) {
            // Back inside the wander band.
            self.activity = Activity::Wandering;
            self.next_wander_at = now + self.idle_delay(cfg, rng);
            return;
        }

        if now < self.next_wander_at {
            return;
        }
        self.start_wander(mover, registry, obstacles, cfg, now, rng);
    }

    /// Pick a random reachable tile near home and walk there
    fn start_wander(
        &mut self,
        mover: &mut Mover,
        registry: &mut OccupancyRegistry,
        obstacles: &dyn ObstacleMap,
        cfg: &SimulationConfig,
        now: SimTime,
        rng: &mut impl Rng,
    ) {
        self.activity = Activity::Wandering;
        self.next_wander_at = now + self.idle_delay(cfg, rng);

        let home_tile = TileCoord::from_world(self.home, cfg.tile_size);
        let r = cfg.wander_radius_tiles;

        for _ in 0..cfg.wander_sample_attempts {
            let candidate = TileCoord::new(
                home_tile.col + rng.gen_range(-r..=r),
                home_tile.row + rng.gen_range(-r..=r),
            );
            if candidate == mover.tile()
                || registry.is_blocked(candidate)
                || obstacles.is_statically_blocked(candidate)
            {
                continue;
            }

            let mut dest = candidate.center(cfg.tile_size);
            dest.y = mover.position().y;
            if let Some(path) = find_path(
                mover.position(),
                dest,
                registry,
                obstacles,
                cfg.tile_size,
                cfg.max_path_expansions,
            ) {
                if mover.set_path(&path, now, registry, obstacles) {
                    tracing::trace!(agent = ?self.id, target = %candidate, "wander walk");
                    return;
                }
            }
        }

        // Every sample failed: drift back toward home.
        let mut dest = self.home;
        dest.y = mover.position().y;
        if let Some(path) = find_path(
            mover.position(),
            dest,
            registry,
            obstacles,
            cfg.tile_size,
            cfg.max_path_expansions,
        ) {
            mover.set_path(&path, now, registry, obstacles);
        }
    }

    fn idle_delay(&self, cfg: &SimulationConfig, rng: &mut impl Rng) -> f64 {
        f64::from(rng.gen_range(cfg.wander_idle_min..=cfg.wander_idle_max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::disposition::RelationTable;
    use crate::behavior::perception::WorldSnapshot;
    use crate::grid::obstacles::StaticObstacles;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const GUARDS: FactionId = FactionId(1);
    const RAIDERS: FactionId = FactionId(2);
    const TRADERS: FactionId = FactionId(3);

    struct Fixture {
        brain: AgentBrain,
        mover: Mover,
        registry: OccupancyRegistry,
        obstacles: StaticObstacles,
        relations: RelationTable,
        cfg: SimulationConfig,
        rng: ChaCha8Rng,
        others: Vec<PerceivedAgent>,
    }

    impl Fixture {
        fn new() -> Self {
            let id = AgentId::new();
            let home = Vec3::ZERO;
            let mover = Mover::new(home, 1.0, 2.0);
            let mut registry = OccupancyRegistry::new();
            registry.register(mover.tile());

            let mut relations = RelationTable::new();
            relations.set(GUARDS, RAIDERS, Standing::Hostile);
            relations.set(GUARDS, TRADERS, Standing::Friendly);

            Self {
                brain: AgentBrain::new(id, GUARDS, home),
                mover,
                registry,
                obstacles: StaticObstacles::new(),
                relations,
                cfg: SimulationConfig::default(),
                rng: ChaCha8Rng::seed_from_u64(42),
                others: Vec::new(),
            }
        }

        fn add_other(&mut self, x: f32, z: f32, faction: FactionId) -> AgentId {
            let id = AgentId::new();
            let position = Vec3::new(x, 0.0, z);
            self.others.push(PerceivedAgent {
                id,
                position,
                faction,
            });
            self.registry
                .register(TileCoord::from_world(position, self.cfg.tile_size));
            id
        }

        fn tick(&mut self, now: SimTime) -> Option<BrainCommand> {
            let mut agents = self.others.clone();
            agents.push(PerceivedAgent {
                id: self.brain.id(),
                position: self.mover.position(),
                faction: self.brain.faction(),
            });
            let snapshot = WorldSnapshot {
                agents,
                obstacles: &self.obstacles,
                tile_size: self.cfg.tile_size,
            };
            self.brain.tick(
                &mut self.mover,
                &mut self.registry,
                &self.obstacles,
                &snapshot,
                &self.relations,
                &self.cfg,
                now,
                &mut self.rng,
            )
        }
    }

    #[test]
    fn test_alone_resolves_neutral() {
        let mut fx = Fixture::new();
        fx.tick(0.0);
        assert_eq!(fx.brain.disposition().standing(), Standing::Neutral);
    }

    #[test]
    fn test_friendly_in_sight_resolves_friendly() {
        let mut fx = Fixture::new();
        fx.add_other(3.0, 0.0, TRADERS);
        fx.tick(0.0);
        assert_eq!(fx.brain.disposition().standing(), Standing::Friendly);
    }

    #[test]
    fn test_hostile_beats_friendly() {
        let mut fx = Fixture::new();
        fx.add_other(3.0, 0.0, TRADERS);
        fx.add_other(5.0, 0.0, RAIDERS);
        fx.tick(0.0);
        assert_eq!(fx.brain.disposition().standing(), Standing::Hostile);
    }

    #[test]
    fn test_hostile_out_of_detection_radius_is_unseen() {
        let mut fx = Fixture::new();
        fx.add_other(fx.cfg.detection_radius + 5.0, 0.0, RAIDERS);
        fx.tick(0.0);
        assert_eq!(fx.brain.disposition().standing(), Standing::Neutral);
    }

    #[test]
    fn test_wall_blocks_perception() {
        let mut fx = Fixture::new();
        fx.obstacles
            .block_rect(TileCoord::new(3, -8), TileCoord::new(3, 8));
        fx.add_other(6.0, 0.0, RAIDERS);
        fx.tick(0.0);
        assert_eq!(fx.brain.disposition().standing(), Standing::Neutral);
    }

    #[test]
    fn test_override_is_sticky_until_cleared() {
        let mut fx = Fixture::new();
        fx.add_other(5.0, 0.0, RAIDERS);

        fx.brain.set_override(Standing::Friendly);
        fx.tick(0.0);
        assert_eq!(fx.brain.disposition().standing(), Standing::Friendly);
        assert!(fx.brain.disposition().is_overridden());

        // Still pinned on later ticks.
        fx.tick(1.0);
        assert_eq!(fx.brain.disposition().standing(), Standing::Friendly);

        fx.brain.clear_override();
        fx.tick(2.0);
        assert_eq!(fx.brain.disposition().standing(), Standing::Hostile);
    }

    #[test]
    fn test_adjacent_hostile_gets_attacked_with_cooldown() {
        let mut fx = Fixture::new();
        let raider = fx.add_other(1.0, 0.0, RAIDERS);

        let cmd = fx.tick(0.0);
        assert_eq!(cmd, Some(BrainCommand::Attack { target: raider }));

        // Cooldown not yet elapsed.
        let cmd = fx.tick(0.5);
        assert_eq!(cmd, None);

        let cmd = fx.tick(f64::from(fx.cfg.attack_cooldown) + 0.1);
        assert_eq!(cmd, Some(BrainCommand::Attack { target: raider }));
    }

    #[test]
    fn test_diagonal_adjacency_counts_as_melee() {
        let mut fx = Fixture::new();
        let raider = fx.add_other(1.0, 1.0, RAIDERS);
        let cmd = fx.tick(0.0);
        assert_eq!(cmd, Some(BrainCommand::Attack { target: raider }));
    }

    #[test]
    fn test_hostile_in_aggro_range_starts_pursuit() {
        let mut fx = Fixture::new();
        let raider = fx.add_other(6.0, 0.0, RAIDERS);

        fx.tick(0.0);
        assert_eq!(fx.brain.activity(), Activity::Pursuing(raider));
        assert_eq!(fx.mover.state(), MoveState::Stepping);
    }

    #[test]
    fn test_hostile_beyond_aggro_is_not_chased() {
        let mut fx = Fixture::new();
        fx.cfg.detection_radius = 20.0;
        fx.cfg.aggro_radius = 8.0;
        fx.add_other(15.0, 0.0, RAIDERS);

        fx.tick(0.0);
        assert_eq!(fx.brain.disposition().standing(), Standing::Hostile);
        assert!(!matches!(fx.brain.activity(), Activity::Pursuing(_)));
    }

    #[test]
    fn test_stun_halts_pursuit_and_expires() {
        let mut fx = Fixture::new();
        fx.add_other(6.0, 0.0, RAIDERS);
        fx.tick(0.0);
        assert_eq!(fx.mover.state(), MoveState::Stepping);

        fx.brain
            .apply_stun(2.0, 0.1, &mut fx.mover, &mut fx.registry);
        assert!(fx.mover.is_idle());
        assert!(fx.brain.is_stunned(0.1));
        assert_eq!(fx.registry.reserved_count(), 0);

        // Suppressed while stunned.
        fx.tick(1.0);
        assert!(fx.mover.is_idle());
        assert!(fx.brain.is_stunned(1.0));

        // Resumes after expiry: pursuit starts again.
        fx.tick(2.2);
        assert!(!fx.brain.is_stunned(2.2));
        assert_eq!(fx.mover.state(), MoveState::Stepping);
    }

    #[test]
    fn test_stun_extends_but_never_shortens() {
        let mut fx = Fixture::new();
        let until = fx
            .brain
            .apply_stun(5.0, 0.0, &mut fx.mover, &mut fx.registry);
        assert_eq!(until, 5.0);

        let until = fx
            .brain
            .apply_stun(1.0, 1.0, &mut fx.mover, &mut fx.registry);
        assert_eq!(until, 5.0);

        let until = fx
            .brain
            .apply_stun(10.0, 2.0, &mut fx.mover, &mut fx.registry);
        assert_eq!(until, 12.0);
    }

    #[test]
    fn test_calm_agent_wanders_within_radius_of_home() {
        let mut fx = Fixture::new();
        // Delay already elapsed at t=0.
        fx.tick(0.0);

        assert_eq!(fx.brain.activity(), Activity::Wandering);
        assert!(!fx.mover.is_idle());
        // The queued destination stays inside the wander band.
        let home_tile = TileCoord::from_world(Vec3::ZERO, 1.0);
        let r = fx.cfg.wander_radius_tiles.unsigned_abs();
        // Walk to completion and check where we ended up.
        let mut now = 0.0;
        for _ in 0..10_000 {
            if fx.mover.is_idle() {
                break;
            }
            now += 0.05;
            fx.mover
                .update(0.05, now, &mut fx.registry, &fx.obstacles);
        }
        assert!(fx.mover.is_idle());
        assert!(fx.mover.tile().chebyshev(&home_tile) <= r);
    }

    #[test]
    fn test_far_from_home_walks_back() {
        let mut fx = Fixture::new();
        // Teleport the agent far out, then let it decide.
        fx.mover
            .force_move_to(Vec3::new(30.0, 0.0, 0.0), 0.0, &mut fx.registry);
        fx.mover
            .update(0.016, 0.016, &mut fx.registry, &fx.obstacles);

        fx.tick(0.1);
        assert_eq!(fx.brain.activity(), Activity::Returning);
        assert_eq!(fx.mover.state(), MoveState::Stepping);
    }

    #[test]
    fn test_no_decisions_while_knocked_back() {
        let mut fx = Fixture::new();
        fx.add_other(6.0, 0.0, RAIDERS);
        fx.mover
            .force_move_to(Vec3::new(0.0, 0.0, 5.0), 1.0, &mut fx.registry);

        let cmd = fx.tick(0.1);
        assert_eq!(cmd, None);
        assert_eq!(fx.mover.state(), MoveState::Forced);
    }
}
