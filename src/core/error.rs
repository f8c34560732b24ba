use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Agent not found: {0:?}")]
    AgentNotFound(crate::core::types::AgentId),

    #[error("Spawn tile already occupied or reserved: {0}")]
    SpawnBlocked(crate::grid::tile::TileCoord),

    #[error("Speed modifier factor must be in (0, {max}], got {factor}")]
    InvalidModifier { factor: f32, max: f32 },
}

pub type Result<T> = std::result::Result<T, SimError>;
