//! Navigation: pathfinding, movement execution, and speed modifiers

pub mod mover;
pub mod pathfinding;
pub mod speed;

// Re-exports for convenient access
pub use mover::{MoveResult, MoveState, Mover};
pub use pathfinding::{find_path, path_cost};
pub use speed::{
    SpeedStack, MAX_EFFECTIVE_MULTIPLIER, MAX_MODIFIER_FACTOR, MIN_EFFECTIVE_MULTIPLIER,
};
