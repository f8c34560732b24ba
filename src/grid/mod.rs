//! The movement grid: tile addressing, occupancy, and static obstacles

pub mod obstacles;
pub mod occupancy;
pub mod tile;

// Re-exports for convenient access
pub use obstacles::{ObstacleMap, StaticObstacles};
pub use occupancy::OccupancyRegistry;
pub use tile::{horizontal_distance, snap, TileCoord};
