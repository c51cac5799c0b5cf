//! JSON event scripts.
//!
//! ```json
//! { "events": [
//!     { "type": "join", "player": 12, "position": { "x": 0.5, "y": 64.0, "z": 0.5 } },
//!     { "type": "command", "player": 12, "line": "/hud" },
//!     { "type": "select_slot", "player": 12, "slot": 1 }
//! ] }
//! ```

use std::path::Path;

use hud_overlay::{EntityId, ItemStack, Position};
use serde::{Deserialize, Serialize};

/// Standing eye height of a player.
pub const PLAYER_EYE_HEIGHT: f32 = 1.62;
/// Standing hitbox height of a player.
pub const PLAYER_BODY_HEIGHT: f32 = 1.8;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Script {
    pub events: Vec<ScriptEvent>,
}

impl Script {
    pub fn load(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptEvent {
    /// A player enters play. `position` is at the feet; the overlay spawns at the eyes.
    Join {
        player: EntityId,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        position: Position,
        #[serde(default = "default_eye_height")]
        eye_height: f32,
        #[serde(default = "default_body_height")]
        body_height: f32,
        /// Hotbar slot held on join.
        #[serde(default)]
        selected: usize,
        #[serde(default)]
        inventory: Vec<SlotContents>,
    },
    /// Replace the contents of one inventory slot.
    SetSlot {
        player: EntityId,
        slot: usize,
        #[serde(default)]
        item: Option<ItemStack>,
    },
    /// Switch the held hotbar slot.
    SelectSlot { player: EntityId, slot: usize },
    /// Run a chat command. Without a player it runs from the console.
    Command {
        #[serde(default)]
        player: Option<EntityId>,
        line: String,
    },
    Disconnect { player: EntityId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotContents {
    pub slot: usize,
    pub item: ItemStack,
}

fn default_eye_height() -> f32 {
    PLAYER_EYE_HEIGHT
}

fn default_body_height() -> f32 {
    PLAYER_BODY_HEIGHT
}

#[cfg(test)]
mod tests {
    use hud_overlay::ItemKind;

    use super::*;

    #[test]
    fn test_join_defaults() {
        let script: Script =
            serde_json::from_str(r#"{ "events": [ { "type": "join", "player": 3 } ] }"#).unwrap();
        match &script.events[0] {
            ScriptEvent::Join {
                player,
                name,
                eye_height,
                selected,
                inventory,
                ..
            } => {
                assert_eq!(*player, EntityId(3));
                assert_eq!(*name, None);
                assert!((eye_height - PLAYER_EYE_HEIGHT).abs() < f32::EPSILON);
                assert_eq!(*selected, 0);
                assert!(inventory.is_empty());
            }
            other => panic!("expected join, got {other:?}"),
        }
    }

    #[test]
    fn test_console_command_and_items() {
        let script: Script = serde_json::from_str(
            r#"{ "events": [
                { "type": "command", "line": "/hud" },
                { "type": "set_slot", "player": 3, "slot": 4,
                  "item": { "kind": 1, "count": 2 } },
                { "type": "set_slot", "player": 3, "slot": 4 }
            ] }"#,
        )
        .unwrap();
        assert_eq!(
            script.events,
            vec![
                ScriptEvent::Command {
                    player: None,
                    line: "/hud".to_string(),
                },
                ScriptEvent::SetSlot {
                    player: EntityId(3),
                    slot: 4,
                    item: Some(ItemStack::new(ItemKind(1), 2)),
                },
                ScriptEvent::SetSlot {
                    player: EntityId(3),
                    slot: 4,
                    item: None,
                },
            ]
        );
    }

    #[test]
    fn test_unknown_event_rejected() {
        let result = serde_json::from_str::<Script>(r#"{ "events": [ { "type": "jump" } ] }"#);
        assert!(result.is_err());
    }
}
