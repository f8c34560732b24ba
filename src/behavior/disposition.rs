//! Hostility standings and faction relations

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::FactionId;

/// How one agent regards another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Standing {
    Friendly,
    Neutral,
    Hostile,
}

/// Resolved disposition: recomputed from perception each tick, or pinned
/// by an explicit override that sticks until cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Automatic(Standing),
    Overridden(Standing),
}

impl Disposition {
    /// The one accessor callers read; the tag only matters to the scan
    pub fn standing(&self) -> Standing {
        match self {
            Self::Automatic(s) | Self::Overridden(s) => *s,
        }
    }

    pub fn is_overridden(&self) -> bool {
        matches!(self, Self::Overridden(_))
    }
}

impl Default for Disposition {
    fn default() -> Self {
        Self::Automatic(Standing::Neutral)
    }
}

/// Faction relation lookup consumed by the perception scan
pub trait FactionTable {
    fn relation(&self, a: FactionId, b: FactionId) -> Standing;
}

/// Map-backed relation table
///
/// Same faction defaults to Friendly, unlisted pairs to Neutral. Entries
/// are stored symmetrically.
#[derive(Debug, Clone, Default)]
pub struct RelationTable {
    relations: AHashMap<(FactionId, FactionId), Standing>,
}

impl RelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, a: FactionId, b: FactionId, standing: Standing) {
        self.relations.insert((a, b), standing);
        self.relations.insert((b, a), standing);
    }
}

impl FactionTable for RelationTable {
    fn relation(&self, a: FactionId, b: FactionId) -> Standing {
        if a == b {
            return Standing::Friendly;
        }
        self.relations
            .get(&(a, b))
            .copied()
            .unwrap_or(Standing::Neutral)
    }
}
