//! World service and tick events

pub mod events;
pub mod world;

// Re-exports for convenient access
pub use events::SimulationEvent;
pub use world::{Agent, DamageHook, NoCombat, SimWorld};
