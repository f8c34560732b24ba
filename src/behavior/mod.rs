//! Agent behavior: perception, hostility resolution, and decisions
//!
//! Disposition (Friendly / Neutral / Hostile) is resolved from a per-tick
//! perception scan unless pinned by a manual override; the activity state
//! machine (wander, pursue, return home, stunned) drives the mover.

pub mod brain;
pub mod disposition;
pub mod perception;

// Re-exports for convenient access
pub use brain::{Activity, AgentBrain, BrainCommand};
pub use disposition::{Disposition, FactionTable, RelationTable, Standing};
pub use perception::{tile_line_of_sight, PerceivedAgent, Senses, WorldSnapshot};
