//! Events generated during simulation ticks
//!
//! Returned by `SimWorld::tick` so hosts can render, log, or trigger
//! effects without the core knowing about them.

use crate::behavior::disposition::Standing;
use crate::core::types::AgentId;

/// One observable thing that happened during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationEvent {
    /// A melee attack landed and was handed to the damage hook
    MeleeAttack { attacker: AgentId, target: AgentId },
    /// A queued path was aborted because the next tile was blocked
    PathBlocked { agent: AgentId },
    /// An agent finished its queued path
    DestinationReached { agent: AgentId },
    /// A forced displacement finished; decision-making resumes
    KnockbackComplete { agent: AgentId },
    /// Automatic hostility resolution changed value
    DispositionChanged {
        agent: AgentId,
        from: Standing,
        to: Standing,
    },
}
