//! World service: agent roster, shared registry, and the tick loop
//!
//! One `SimWorld` owns everything one simulated world needs: the occupancy
//! registry, the obstacle map, the agents, the clock, and a seeded RNG.
//! Nothing is process-global, so independent worlds coexist freely (tests
//! rely on this).
//!
//! All agents run on one logical thread. Within a tick they are processed
//! in stable roster order; the first agent to reserve a contested tile
//! wins it and later agents replan. Mutual exclusion comes entirely from
//! the reservation invariant, not from locks.

use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

use crate::behavior::brain::{AgentBrain, BrainCommand};
use crate::behavior::disposition::{RelationTable, Standing};
use crate::behavior::perception::{PerceivedAgent, WorldSnapshot};
use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{AgentId, FactionId, SimTime, Tick};
use crate::grid::obstacles::{ObstacleMap, StaticObstacles};
use crate::grid::occupancy::OccupancyRegistry;
use crate::grid::tile::{self, TileCoord};
use crate::nav::mover::Mover;
use crate::nav::pathfinding::find_path;
use crate::sim::events::SimulationEvent;

/// Damage delivery contract; the core owns no damage formula
pub trait DamageHook {
    fn apply_damage(&mut self, target: AgentId, amount: f32);
}

/// No-op damage sink for hosts that resolve combat elsewhere
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCombat;

impl DamageHook for NoCombat {
    fn apply_damage(&mut self, _target: AgentId, _amount: f32) {}
}

/// One simulated agent: its movement and decision components
#[derive(Debug, Clone)]
pub struct Agent {
    pub mover: Mover,
    pub brain: AgentBrain,
}

impl Agent {
    pub fn id(&self) -> AgentId {
        self.brain.id()
    }
}

/// A self-contained simulated world
pub struct SimWorld {
    config: SimulationConfig,
    registry: OccupancyRegistry,
    obstacles: Box<dyn ObstacleMap>,
    relations: RelationTable,
    agents: Vec<Agent>,
    now: SimTime,
    current_tick: Tick,
    rng: ChaCha8Rng,
}

impl SimWorld {
    /// World with no static obstacles
    pub fn new(config: SimulationConfig) -> Self {
        Self::with_obstacles(config, Box::new(StaticObstacles::new()))
    }

    pub fn with_obstacles(config: SimulationConfig, obstacles: Box<dyn ObstacleMap>) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            registry: OccupancyRegistry::new(),
            obstacles,
            relations: RelationTable::new(),
            agents: Vec::new(),
            now: 0.0,
            current_tick: 0,
            rng,
        }
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn registry(&self) -> &OccupancyRegistry {
        &self.registry
    }

    pub fn relations_mut(&mut self) -> &mut RelationTable {
        &mut self.relations
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id() == id)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.iter_mut().find(|a| a.id() == id)
    }

    fn index_of(&self, id: AgentId) -> Result<usize> {
        self.agents
            .iter()
            .position(|a| a.id() == id)
            .ok_or(SimError::AgentNotFound(id))
    }

    /// Add an agent resting at `position` (snapped); its home is set there
    ///
    /// Fails when the snapped tile is already occupied or reserved.
    pub fn spawn(&mut self, position: Vec3, faction: FactionId) -> Result<AgentId> {
        let position = tile::snap(position, self.config.tile_size);
        let spawn_tile = TileCoord::from_world(position, self.config.tile_size);
        if self.registry.is_blocked(spawn_tile) {
            return Err(SimError::SpawnBlocked(spawn_tile));
        }
        self.registry.register(spawn_tile);

        let id = AgentId::new();
        let mover = Mover::new(position, self.config.tile_size, self.config.base_tiles_per_sec);
        let brain = AgentBrain::new(id, faction, position);
        self.agents.push(Agent { mover, brain });

        tracing::debug!(agent = ?id, tile = %spawn_tile, "agent spawned");
        Ok(id)
    }

    /// Remove an agent, releasing its occupancy and any reservation
    pub fn despawn(&mut self, id: AgentId) -> Result<()> {
        let idx = self.index_of(id)?;
        let mut agent = self.agents.remove(idx);
        agent.mover.release_all(&mut self.registry);
        tracing::debug!(agent = ?id, "agent despawned");
        Ok(())
    }

    /// Re-register every live agent from scratch (world load)
    pub fn rebuild_registry(&mut self) {
        self.registry.clear();
        for agent in &self.agents {
            self.registry.register(agent.mover.tile());
        }
    }

    /// Drop all agents and registry state (world unload)
    pub fn clear(&mut self) {
        self.agents.clear();
        self.registry.clear();
    }

    /// Advance the simulation by `dt` seconds
    ///
    /// Runs each agent's brain and mover in stable roster order against a
    /// start-of-tick perception snapshot, delivers attack commands through
    /// `hooks`, and returns everything observable that happened.
    pub fn tick(&mut self, dt: f32, hooks: &mut dyn DamageHook) -> Vec<SimulationEvent> {
        self.now += f64::from(dt);
        self.current_tick += 1;
        let now = self.now;
        let mut events = Vec::new();

        let roster: Vec<PerceivedAgent> = self
            .agents
            .iter()
            .map(|a| PerceivedAgent {
                id: a.id(),
                position: a.mover.position(),
                faction: a.brain.faction(),
            })
            .collect();
        let snapshot = WorldSnapshot {
            agents: roster,
            obstacles: self.obstacles.as_ref(),
            tile_size: self.config.tile_size,
        };

        for i in 0..self.agents.len() {
            let agent = &mut self.agents[i];
            let id = agent.brain.id();

            let before = agent.brain.disposition().standing();
            let command = agent.brain.tick(
                &mut agent.mover,
                &mut self.registry,
                self.obstacles.as_ref(),
                &snapshot,
                &self.relations,
                &self.config,
                now,
                &mut self.rng,
            );
            let after = agent.brain.disposition().standing();
            if before != after {
                events.push(SimulationEvent::DispositionChanged {
                    agent: id,
                    from: before,
                    to: after,
                });
            }

            if let Some(BrainCommand::Attack { target }) = command {
                hooks.apply_damage(target, self.config.melee_damage);
                events.push(SimulationEvent::MeleeAttack {
                    attacker: id,
                    target,
                });
            }

            let result =
                agent
                    .mover
                    .update(dt, now, &mut self.registry, self.obstacles.as_ref());
            if result.blocked {
                events.push(SimulationEvent::PathBlocked { agent: id });
            }
            if result.arrived {
                events.push(SimulationEvent::DestinationReached { agent: id });
            }
            if result.forced_complete {
                events.push(SimulationEvent::KnockbackComplete { agent: id });
            }
        }

        events
    }

    // === Hooks invoked on agents by external systems ===

    /// Stun an agent, extending any stun already active
    pub fn apply_stun(&mut self, id: AgentId, seconds: f32) -> Result<SimTime> {
        let idx = self.index_of(id)?;
        let now = self.now;
        let Agent { mover, brain } = &mut self.agents[idx];
        Ok(brain.apply_stun(seconds, now, mover, &mut self.registry))
    }

    /// Timed speed modifier (e.g. a slow from a spell)
    pub fn apply_slow(&mut self, id: AgentId, factor: f32, seconds: f32) -> Result<()> {
        let idx = self.index_of(id)?;
        let now = self.now;
        self.agents[idx].mover.speed_mut().apply_timed(factor, seconds, now)
    }

    /// Aura speed modifier, held until `clear_aura` with the same source
    pub fn apply_aura(&mut self, id: AgentId, source: Uuid, factor: f32) -> Result<()> {
        let idx = self.index_of(id)?;
        self.agents[idx].mover.speed_mut().set_aura(source, factor)
    }

    pub fn clear_aura(&mut self, id: AgentId, source: Uuid) -> Result<bool> {
        let idx = self.index_of(id)?;
        Ok(self.agents[idx].mover.speed_mut().clear_aura(source))
    }

    /// External walk/run pace multiplier
    pub fn set_pace(&mut self, id: AgentId, factor: f32) -> Result<()> {
        let idx = self.index_of(id)?;
        self.agents[idx].mover.speed_mut().set_external(factor)
    }

    /// Knock an agent to `dest` over `duration` seconds, bypassing checks
    pub fn knockback(&mut self, id: AgentId, dest: Vec3, duration: f32) -> Result<()> {
        let idx = self.index_of(id)?;
        self.agents[idx]
            .mover
            .force_move_to(dest, duration, &mut self.registry);
        Ok(())
    }

    pub fn set_disposition_override(&mut self, id: AgentId, standing: Standing) -> Result<()> {
        let idx = self.index_of(id)?;
        self.agents[idx].brain.set_override(standing);
        Ok(())
    }

    pub fn clear_disposition_override(&mut self, id: AgentId) -> Result<()> {
        let idx = self.index_of(id)?;
        self.agents[idx].brain.clear_override();
        Ok(())
    }

    /// Host-requested walk to `dest`
    ///
    /// Returns `Ok(false)` when no route was found or the path could not
    /// start; the agent stays put.
    pub fn request_move_to(&mut self, id: AgentId, dest: Vec3) -> Result<bool> {
        let idx = self.index_of(id)?;
        let path = find_path(
            self.agents[idx].mover.position(),
            dest,
            &self.registry,
            self.obstacles.as_ref(),
            self.config.tile_size,
            self.config.max_path_expansions,
        );
        let Some(path) = path else {
            return Ok(false);
        };
        let now = self.now;
        Ok(self.agents[idx]
            .mover
            .set_path(&path, now, &mut self.registry, self.obstacles.as_ref()))
    }
}
