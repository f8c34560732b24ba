//! Tile-to-tile movement execution
//!
//! The mover advances an agent one tile at a time along a queued path.
//! Each step holds a reservation on its destination tile from the moment
//! the step begins until it commits on arrival, so no two agents can
//! target the same tile at once. Forced movement (knockback, teleport)
//! overrides the queue and skips every blocking check mid-flight; the
//! caller picks a valid destination.
//!
//! What was a suspended per-frame coroutine in older engines is an
//! explicit state machine here: `update` begins a step when idle with a
//! non-empty queue, and commits + chains into the next step the tick the
//! interpolation completes, carrying leftover tick time so steps join
//! without gaps.

use std::collections::VecDeque;

use glam::Vec3;

use crate::core::types::SimTime;
use crate::grid::obstacles::ObstacleMap;
use crate::grid::occupancy::OccupancyRegistry;
use crate::grid::tile::{self, TileCoord};
use crate::nav::speed::SpeedStack;

/// One in-flight tile transition
#[derive(Debug, Clone, Copy)]
struct Step {
    from: Vec3,
    to: Vec3,
    dest_tile: TileCoord,
    elapsed: f32,
    duration: f32,
}

/// One forced displacement (knockback or teleport)
#[derive(Debug, Clone, Copy)]
struct ForcedMove {
    from: Vec3,
    to: Vec3,
    elapsed: f32,
    duration: f32,
}

/// Movement execution state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveState {
    Idle,
    Stepping,
    Forced,
}

/// Result of one movement tick
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveResult {
    /// Position changed this tick
    pub moved: bool,
    /// The queued path fully drained this tick
    pub arrived: bool,
    /// The remaining queue was aborted because the next tile was blocked
    pub blocked: bool,
    /// A forced displacement finished this tick
    pub forced_complete: bool,
}

enum StepBegin {
    Started,
    Blocked,
    Drained,
}

/// Per-agent movement component
#[derive(Debug, Clone)]
pub struct Mover {
    position: Vec3,
    facing: Vec3,
    /// Tile this agent holds in the registry's `occupied` set
    registered_tile: TileCoord,
    tile_size: f32,
    base_tiles_per_sec: f32,
    speed: SpeedStack,
    queue: VecDeque<Vec3>,
    step: Option<Step>,
    forced: Option<ForcedMove>,
}

impl Mover {
    /// Build a mover resting at `position` (snapped)
    ///
    /// The caller registers the starting tile; `Mover` assumes it holds
    /// occupancy of `tile()` from then on.
    pub fn new(position: Vec3, tile_size: f32, base_tiles_per_sec: f32) -> Self {
        let position = tile::snap(position, tile_size);
        Self {
            position,
            facing: Vec3::Z,
            registered_tile: TileCoord::from_world(position, tile_size),
            tile_size,
            base_tiles_per_sec,
            speed: SpeedStack::new(),
            queue: VecDeque::new(),
            step: None,
            forced: None,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Unit XZ direction of the last movement
    pub fn facing(&self) -> Vec3 {
        self.facing
    }

    /// Tile currently held in the registry
    pub fn tile(&self) -> TileCoord {
        self.registered_tile
    }

    pub fn state(&self) -> MoveState {
        if self.forced.is_some() {
            MoveState::Forced
        } else if self.step.is_some() {
            MoveState::Stepping
        } else {
            MoveState::Idle
        }
    }

    /// Nothing in flight and nothing queued
    pub fn is_idle(&self) -> bool {
        self.state() == MoveState::Idle && self.queue.is_empty()
    }

    /// Destination tile of the in-flight step, if any
    pub fn reserved_tile(&self) -> Option<TileCoord> {
        self.step.map(|s| s.dest_tile)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn speed(&self) -> &SpeedStack {
        &self.speed
    }

    pub fn speed_mut(&mut self) -> &mut SpeedStack {
        &mut self.speed
    }

    /// Replace the waypoint queue with a new path
    ///
    /// Ignored while a forced displacement is in flight. Waypoints are
    /// snapped and consecutive duplicates dropped; the anchor tile (the
    /// agent's tile, or the in-flight step's destination) is prefixed when
    /// missing. Fewer than two distinct points is a no-op. A step already
    /// in flight completes first, then chains into the new queue.
    ///
    /// Returns false when the call was a no-op or the first step was
    /// immediately blocked.
    pub fn set_path(
        &mut self,
        waypoints: &[Vec3],
        now: SimTime,
        registry: &mut OccupancyRegistry,
        obstacles: &dyn ObstacleMap,
    ) -> bool {
        if self.forced.is_some() {
            return false;
        }

        let mut tiles: Vec<TileCoord> = Vec::with_capacity(waypoints.len() + 1);
        for wp in waypoints {
            let t = TileCoord::from_world(*wp, self.tile_size);
            if tiles.last() != Some(&t) {
                tiles.push(t);
            }
        }

        let anchor = match &self.step {
            Some(step) => step.dest_tile,
            None => TileCoord::from_world(self.position, self.tile_size),
        };
        if tiles.first() != Some(&anchor) {
            tiles.insert(0, anchor);
        }
        if tiles.len() < 2 {
            return false;
        }

        let plane_y = self.position.y;
        self.queue = tiles
            .into_iter()
            .map(|t| {
                let mut c = t.center(self.tile_size);
                c.y = plane_y;
                c
            })
            .collect();

        if self.step.is_some() {
            // Current step finishes first; the commit chains into the
            // new queue.
            return true;
        }
        matches!(
            self.try_begin_step(now, registry, obstacles),
            StepBegin::Started
        )
    }

    /// Discard queued waypoints without touching an in-flight step
    pub fn clear_path(&mut self) {
        self.queue.clear();
    }

    /// Cancel everything synchronously
    ///
    /// Releases any held reservation, drops the queue and any forced
    /// displacement, snaps position to the nearest tile, and re-syncs the
    /// registry when the snapped tile differs from the registered one.
    pub fn hard_stop(&mut self, registry: &mut OccupancyRegistry) {
        if let Some(step) = self.step.take() {
            registry.release(step.dest_tile);
        }
        self.forced = None;
        self.queue.clear();

        self.position = tile::snap(self.position, self.tile_size);
        let snapped = TileCoord::from_world(self.position, self.tile_size);
        if snapped != self.registered_tile {
            registry.unregister(self.registered_tile);
            if !registry.register(snapped) {
                tracing::warn!(
                    tile = %snapped,
                    "hard stop landed on a tile registered to another agent"
                );
            }
            self.registered_tile = snapped;
        }
    }

    /// Knockback/teleport to `dest` over `duration` seconds
    ///
    /// Cancels the current path and step, releasing any reservation, then
    /// interpolates to `dest` without consulting obstacles or the
    /// registry. On completion the registry is updated exactly like a
    /// normal arrival. The caller is responsible for choosing a valid
    /// destination.
    pub fn force_move_to(
        &mut self,
        dest: Vec3,
        duration: f32,
        registry: &mut OccupancyRegistry,
    ) {
        if let Some(step) = self.step.take() {
            registry.release(step.dest_tile);
        }
        self.queue.clear();
        self.forced = Some(ForcedMove {
            from: self.position,
            to: dest,
            elapsed: 0.0,
            duration: duration.max(0.0),
        });
    }

    /// Release every registry hold (despawn path)
    pub fn release_all(&mut self, registry: &mut OccupancyRegistry) {
        if let Some(step) = self.step.take() {
            registry.release(step.dest_tile);
        }
        self.forced = None;
        self.queue.clear();
        registry.unregister(self.registered_tile);
    }

    /// Advance movement by one tick
    pub fn update(
        &mut self,
        dt: f32,
        now: SimTime,
        registry: &mut OccupancyRegistry,
        obstacles: &dyn ObstacleMap,
    ) -> MoveResult {
        let mut result = MoveResult::default();

        if let Some(mut forced) = self.forced.take() {
            forced.elapsed += dt;
            let t = if forced.duration > 0.0 {
                (forced.elapsed / forced.duration).min(1.0)
            } else {
                1.0
            };
            self.position = forced.from.lerp(forced.to, t);
            result.moved = true;

            if forced.elapsed >= forced.duration {
                self.position = tile::snap(forced.to, self.tile_size);
                let landed = TileCoord::from_world(self.position, self.tile_size);
                if landed != self.registered_tile {
                    registry.unregister(self.registered_tile);
                    registry.register(landed);
                    self.registered_tile = landed;
                }
                self.face_towards(forced.from, forced.to);
                result.forced_complete = true;
            } else {
                self.forced = Some(forced);
            }
            return result;
        }

        if self.step.is_none() && !self.queue.is_empty() {
            match self.try_begin_step(now, registry, obstacles) {
                StepBegin::Started => {}
                StepBegin::Blocked => result.blocked = true,
                StepBegin::Drained => result.arrived = true,
            }
        }

        if let Some(mut step) = self.step.take() {
            step.elapsed += dt;
            loop {
                if step.elapsed < step.duration {
                    let t = step.elapsed / step.duration;
                    self.position = step.from.lerp(step.to, t);
                    result.moved = true;
                    self.step = Some(step);
                    break;
                }

                // Arrived: commit the reservation and chain immediately,
                // carrying the leftover tick time into the next step.
                let overshoot = step.elapsed - step.duration;
                registry.commit(self.registered_tile, step.dest_tile);
                self.registered_tile = step.dest_tile;
                self.position = step.to;
                self.face_towards(step.from, step.to);
                result.moved = true;

                match self.try_begin_step(now, registry, obstacles) {
                    StepBegin::Started => {
                        let Some(mut next) = self.step.take() else {
                            break;
                        };
                        next.elapsed = overshoot;
                        step = next;
                    }
                    StepBegin::Blocked => {
                        result.blocked = true;
                        break;
                    }
                    StepBegin::Drained => {
                        result.arrived = true;
                        break;
                    }
                }
            }
        }

        result
    }

    /// Peek the queue and reserve the next destination
    ///
    /// Fail-fast contract: a blocked next tile aborts the whole remaining
    /// queue; the brain replans on its next tick rather than waiting here.
    fn try_begin_step(
        &mut self,
        now: SimTime,
        registry: &mut OccupancyRegistry,
        obstacles: &dyn ObstacleMap,
    ) -> StepBegin {
        // Drop waypoints already reached
        while let Some(front) = self.queue.front() {
            if TileCoord::from_world(*front, self.tile_size) == self.registered_tile {
                self.queue.pop_front();
            } else {
                break;
            }
        }

        let Some(&next) = self.queue.front() else {
            return StepBegin::Drained;
        };
        let dest_tile = TileCoord::from_world(next, self.tile_size);

        if obstacles.is_statically_blocked(dest_tile) || !registry.try_reserve(dest_tile) {
            tracing::debug!(
                from = %self.registered_tile,
                to = %dest_tile,
                "next tile blocked, aborting queued path"
            );
            self.queue.clear();
            return StepBegin::Blocked;
        }
        self.queue.pop_front();

        let distance = self.registered_tile.distance(&dest_tile);
        let speed = self.base_tiles_per_sec * self.speed.effective(now);
        let to = Vec3::new(next.x, self.position.y, next.z);

        self.step = Some(Step {
            from: self.position,
            to,
            dest_tile,
            elapsed: 0.0,
            duration: distance / speed,
        });
        StepBegin::Started
    }

    fn face_towards(&mut self, from: Vec3, to: Vec3) {
        let dir = Vec3::new(to.x - from.x, 0.0, to.z - from.z);
        if dir.length_squared() > f32::EPSILON {
            self.facing = dir.normalize();
        }
    }
}
