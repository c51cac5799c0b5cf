//! In-memory host that feeds script events to the overlay controller and records every frame.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Cursor};
use std::path::Path;

use bytes::Bytes;
use hud_overlay::packets::{AddEntity, SetEntityData, SetPassengers};
use hud_overlay::{
    CommandOutcome, CommandRegistry, ConsoleSender, EntityId, HudConfig, Inventory, JoinContext,
    OverlayController, PacketBuffer, PlayerInventory, PlayerSender, Position,
};
use mc_protocol::{Packet, decode_frame};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::script::{Script, ScriptEvent};

/// One clientbound frame as it left the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedFrame {
    /// Index of the script event that produced it.
    pub step: usize,
    pub player: EntityId,
    pub packet_id: i32,
    pub packet: String,
    /// The full frame, length prefix included, as lowercase hex.
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub step: usize,
    pub sender: String,
    pub line: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CommandOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplayReport {
    pub frames: Vec<RecordedFrame>,
    pub commands: Vec<CommandRecord>,
}

impl ReplayReport {
    pub fn save(&self, path: impl AsRef<Path>) -> eyre::Result<()> {
        let path = path.as_ref();
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        info!("Saved {} frames to {:?}", self.frames.len(), path);
        Ok(())
    }

    pub fn frames_for(&self, player: EntityId) -> impl Iterator<Item = &RecordedFrame> {
        self.frames.iter().filter(move |f| f.player == player)
    }
}

#[derive(Debug)]
struct Player {
    name: String,
    inventory: PlayerInventory,
    connection: PacketBuffer,
}

impl Player {
    /// Tell the controller what is in the hand now.
    fn held_item_changed(
        &mut self,
        id: EntityId,
        controller: &mut OverlayController,
    ) -> eyre::Result<()> {
        let held = self.inventory.item_in_main_hand();
        controller.on_held_slot_changed(id, held, &mut self.connection)?;
        Ok(())
    }
}

/// Drives one script against a fresh controller.
#[derive(Debug)]
pub struct Replay {
    controller: OverlayController,
    commands: CommandRegistry,
    players: BTreeMap<EntityId, Player>,
    report: ReplayReport,
}

impl Replay {
    #[must_use]
    pub fn new(config: &HudConfig) -> Self {
        Self {
            controller: OverlayController::new(config),
            commands: CommandRegistry::with_defaults(config),
            players: BTreeMap::new(),
            report: ReplayReport::default(),
        }
    }

    pub fn run(mut self, script: &Script) -> eyre::Result<ReplayReport> {
        for (step, event) in script.events.iter().enumerate() {
            self.apply(step, event)?;
        }
        info!(
            "Replay finished: {} events, {} frames",
            script.events.len(),
            self.report.frames.len()
        );
        Ok(self.report)
    }

    pub fn apply(&mut self, step: usize, event: &ScriptEvent) -> eyre::Result<()> {
        debug!("Applying event {}: {:?}", step, event);
        match event {
            ScriptEvent::Join {
                player,
                name,
                position,
                eye_height,
                body_height,
                selected,
                inventory,
            } => {
                if self.players.contains_key(player) {
                    eyre::bail!("step {}: player {} joined twice", step, player);
                }
                let mut state = Player {
                    name: name.clone().unwrap_or_else(|| format!("player{}", player)),
                    inventory: PlayerInventory::new(),
                    connection: PacketBuffer::new(),
                };
                for contents in inventory {
                    state
                        .inventory
                        .set(contents.slot, Some(contents.item.clone()))?;
                }
                state.inventory.select(*selected)?;

                info!("{} joined as entity {}", state.name, player);
                let eye_position = Position::new(
                    position.x,
                    position.y + f64::from(*eye_height),
                    position.z,
                );
                let ctx = JoinContext {
                    player_id: *player,
                    eye_position,
                    eye_height: *eye_height,
                    body_height: *body_height,
                    held_item: state.inventory.item_in_main_hand(),
                };
                self.controller.on_join(ctx, &mut state.connection)?;
                self.players.insert(*player, state);
            }
            ScriptEvent::SetSlot { player, slot, item } => {
                let state = connected(&mut self.players, step, *player)?;
                state.inventory.set(*slot, item.clone())?;
                if *slot == state.inventory.selected_slot() {
                    state.held_item_changed(*player, &mut self.controller)?;
                }
            }
            ScriptEvent::SelectSlot { player, slot } => {
                let state = connected(&mut self.players, step, *player)?;
                state.inventory.select(*slot)?;
                state.held_item_changed(*player, &mut self.controller)?;
            }
            ScriptEvent::Command { player, line } => self.command(step, *player, line)?,
            ScriptEvent::Disconnect { player } => {
                self.controller.on_disconnect(*player);
                if let Some(state) = self.players.remove(player) {
                    info!("{} disconnected", state.name);
                }
            }
        }
        self.flush(step);
        Ok(())
    }

    fn command(&mut self, step: usize, player: Option<EntityId>, line: &str) -> eyre::Result<()> {
        let (sender, result) = match player {
            None => ("CONSOLE".to_string(), self.commands.dispatch(line, &mut ConsoleSender)),
            Some(id) => {
                let state = connected(&mut self.players, step, id)?;
                let mut sender = PlayerSender {
                    name: &state.name,
                    inventory: &mut state.inventory,
                };
                let result = self.commands.dispatch(line, &mut sender);

                // A grant into the held slot changes what is in the hand.
                if let Ok(CommandOutcome::Granted { slot }) = result {
                    if slot == state.inventory.selected_slot() {
                        state.held_item_changed(id, &mut self.controller)?;
                    }
                }
                (state.name.clone(), result)
            }
        };

        let (outcome, error) = match result {
            Ok(outcome) => (Some(outcome), None),
            Err(err) => {
                warn!("{} ran a failing command: {}", sender, err);
                (None, Some(err.to_string()))
            }
        };
        self.report.commands.push(CommandRecord {
            step,
            sender,
            line: line.to_string(),
            outcome,
            error,
        });
        Ok(())
    }

    /// Move everything the controller queued into the report.
    fn flush(&mut self, step: usize) {
        for (id, player) in &mut self.players {
            for frame in player.connection.drain() {
                self.report.frames.push(record(step, *id, &frame));
            }
        }
    }
}

fn connected(
    players: &mut BTreeMap<EntityId, Player>,
    step: usize,
    id: EntityId,
) -> eyre::Result<&mut Player> {
    match players.get_mut(&id) {
        Some(player) => Ok(player),
        None => eyre::bail!("step {}: player {} is not connected", step, id),
    }
}

fn record(step: usize, player: EntityId, frame: &Bytes) -> RecordedFrame {
    let packet_id = decode_frame(&mut Cursor::new(&frame[..])).map_or(-1, |(id, _)| id);
    RecordedFrame {
        step,
        player,
        packet_id,
        packet: packet_name(packet_id).to_string(),
        data: to_hex(frame),
    }
}

fn packet_name(id: i32) -> &'static str {
    match id {
        AddEntity::ID => AddEntity::NAME,
        SetEntityData::ID => SetEntityData::NAME,
        SetPassengers::ID => SetPassengers::NAME,
        _ => "Unknown",
    }
}

#[must_use]
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join(player: i32) -> ScriptEvent {
        ScriptEvent::Join {
            player: EntityId(player),
            name: None,
            position: Position::new(0.5, 64.0, 0.5),
            eye_height: 1.62,
            body_height: 1.8,
            selected: 0,
            inventory: Vec::new(),
        }
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(&[0x00, 0x0f, 0xff]), "000fff");
        assert_eq!(to_hex(&[]), "");
    }

    #[test]
    fn test_join_records_three_frames() {
        let script = Script {
            events: vec![join(4)],
        };
        let report = Replay::new(&HudConfig::default()).run(&script).unwrap();
        let names: Vec<_> = report.frames.iter().map(|f| f.packet.as_str()).collect();
        assert_eq!(names, vec!["AddEntity", "SetEntityData", "SetPassengers"]);
        assert!(report.frames.iter().all(|f| f.step == 0));
    }

    #[test]
    fn test_grant_into_held_slot_shows_overlay() {
        let script = Script {
            events: vec![
                join(4),
                ScriptEvent::Command {
                    player: Some(EntityId(4)),
                    line: "/hud".to_string(),
                },
            ],
        };
        let report = Replay::new(&HudConfig::default()).run(&script).unwrap();
        assert_eq!(
            report.commands[0].outcome,
            Some(CommandOutcome::Granted { slot: 0 })
        );
        let step_one: Vec<_> = report.frames.iter().filter(|f| f.step == 1).collect();
        assert_eq!(step_one.len(), 1);
        assert_eq!(step_one[0].packet_id, SetEntityData::ID);
    }

    #[test]
    fn test_unknown_command_is_recorded() {
        let script = Script {
            events: vec![ScriptEvent::Command {
                player: None,
                line: "/fly".to_string(),
            }],
        };
        let report = Replay::new(&HudConfig::default()).run(&script).unwrap();
        assert_eq!(report.commands[0].outcome, None);
        assert!(report.commands[0].error.is_some());
    }

    #[test]
    fn test_event_for_missing_player_fails() {
        let script = Script {
            events: vec![ScriptEvent::SelectSlot {
                player: EntityId(9),
                slot: 1,
            }],
        };
        assert!(Replay::new(&HudConfig::default()).run(&script).is_err());
    }
}
