//! Overlay identity allocation.
//!
//! The host hands out positive entity ids, so the negative half of the id space is free for
//! client-only entities. Each player's overlay takes the negation of the player's own id.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HudError, Result};

/// Entity ID assigned by the host (for protocol)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub i32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Entity ID of a player's phantom overlay. Always negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayId(i32);

impl OverlayId {
    /// Derive the overlay id for `player`.
    ///
    /// Id `0` is rejected: its negation is itself and would alias the player.
    pub fn for_player(player: EntityId) -> Result<Self> {
        if player.0 <= 0 {
            return Err(HudError::InvalidPlayerId(player.0));
        }
        Ok(Self(-player.0))
    }

    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
