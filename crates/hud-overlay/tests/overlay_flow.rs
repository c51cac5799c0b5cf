//! End-to-end overlay flows, checked by decoding the emitted frames.

use std::io::Cursor;

use bytes::Bytes;
use hud_overlay::builder::field_index;
use hud_overlay::packets::{AddEntity, SetEntityData, SetPassengers};
use hud_overlay::{
    EntityId, HudConfig, Inventory, ItemKind, ItemStack, JoinContext, OverlayController,
    PacketBuffer, PlayerInventory, Position, Visibility,
};
use mc_protocol::{Decode, MetadataValue, Packet, Slot, VarInt, decode_frame};
use pretty_assertions::assert_eq;

const PLAYER: EntityId = EntityId(12);

fn split(frames: &[Bytes]) -> Vec<(i32, Vec<u8>)> {
    frames
        .iter()
        .map(|frame| decode_frame(&mut Cursor::new(&frame[..])).unwrap())
        .collect()
}

/// Item slots written by metadata packets, in order.
fn item_updates(frames: &[Bytes]) -> Vec<Slot> {
    split(frames)
        .into_iter()
        .filter(|(id, _)| *id == SetEntityData::ID)
        .filter_map(|(_, body)| {
            let packet = SetEntityData::decode(&mut Cursor::new(&body)).unwrap();
            match packet.metadata.get(field_index::ITEM) {
                Some(MetadataValue::Slot(slot)) => Some(slot.clone()),
                _ => None,
            }
        })
        .collect()
}

fn join_ctx(held: Option<&ItemStack>) -> JoinContext<'_> {
    JoinContext {
        player_id: PLAYER,
        eye_position: Position::new(8.5, 65.62, -4.5),
        eye_height: 1.62,
        body_height: 1.8,
        held_item: held,
    }
}

struct Fixture {
    config: HudConfig,
    controller: OverlayController,
    inventory: PlayerInventory,
    sink: PacketBuffer,
}

impl Fixture {
    fn new() -> Self {
        let config = HudConfig::default();
        Self {
            controller: OverlayController::new(&config),
            config,
            inventory: PlayerInventory::new(),
            sink: PacketBuffer::new(),
        }
    }

    fn join(&mut self) {
        let held = self.inventory.item_in_main_hand();
        self.controller
            .on_join(join_ctx(held), &mut self.sink)
            .unwrap();
    }

    fn select(&mut self, slot: usize) {
        self.inventory.select(slot).unwrap();
        let held = self.inventory.item_in_main_hand();
        self.controller
            .on_held_slot_changed(PLAYER, held, &mut self.sink)
            .unwrap();
    }

    fn visibility(&self) -> Visibility {
        self.controller.visibility(PLAYER).cloned().unwrap()
    }
}

#[test]
fn test_join_emits_spawn_metadata_attach_in_order() {
    let mut fx = Fixture::new();
    fx.join();
    let frames = fx.sink.drain();
    let decoded = split(&frames);

    let ids: Vec<i32> = decoded.iter().map(|(id, _)| *id).collect();
    assert_eq!(
        ids,
        vec![AddEntity::ID, SetEntityData::ID, SetPassengers::ID]
    );

    let spawn = AddEntity::decode(&mut Cursor::new(&decoded[0].1)).unwrap();
    assert_eq!(spawn.entity_id, VarInt(-12));
    assert_eq!(spawn.kind, VarInt(fx.config.display.entity_kind));

    let metadata = SetEntityData::decode(&mut Cursor::new(&decoded[1].1)).unwrap();
    assert_eq!(metadata.entity_id, VarInt(-12));
    assert_eq!(
        metadata.metadata.indices().collect::<Vec<_>>(),
        vec![
            field_index::TRANSLATION,
            field_index::SCALE,
            field_index::BILLBOARD,
            field_index::DISPLAY_CONTEXT,
        ]
    );

    let attach = SetPassengers::decode(&mut Cursor::new(&decoded[2].1)).unwrap();
    assert_eq!(attach.vehicle_id, VarInt(12));
    assert_eq!(attach.passengers, vec![VarInt(-12)]);

    assert_eq!(fx.visibility(), Visibility::Hidden);
}

#[test]
fn test_join_with_marked_item_sends_one_item_update() {
    let mut fx = Fixture::new();
    let marked = fx.config.marker_item();
    fx.inventory.set(0, Some(marked.clone())).unwrap();
    fx.join();

    let frames = fx.sink.drain();
    assert_eq!(frames.len(), 4);
    assert_eq!(item_updates(&frames), vec![marked.to_slot()]);
    assert_eq!(fx.visibility(), Visibility::Shown(marked));
}

#[test]
fn test_empty_then_marked_then_plain() {
    let mut fx = Fixture::new();
    let marked = fx.config.marker_item();
    let plain = ItemStack::new(ItemKind(1), 3);
    fx.inventory.set(3, Some(marked.clone())).unwrap();
    fx.inventory.set(5, Some(plain)).unwrap();

    fx.join();
    assert_eq!(fx.visibility(), Visibility::Hidden);
    assert_eq!(item_updates(&fx.sink.drain()), Vec::<Slot>::new());

    fx.select(3);
    assert_eq!(fx.visibility(), Visibility::Shown(marked.clone()));
    let frames = fx.sink.drain();
    assert_eq!(frames.len(), 1);
    assert_eq!(item_updates(&frames), vec![marked.to_slot()]);

    fx.select(5);
    assert_eq!(fx.visibility(), Visibility::Hidden);
    let frames = fx.sink.drain();
    assert_eq!(frames.len(), 1);
    assert_eq!(item_updates(&frames), vec![Slot::EMPTY]);
}

#[test]
fn test_repeated_selection_is_idempotent() {
    let mut fx = Fixture::new();
    let marked = fx.config.marker_item();
    fx.inventory.set(2, Some(marked)).unwrap();
    fx.join();
    fx.sink.drain();

    fx.select(2);
    let first = fx.sink.drain();
    let state = fx.visibility();

    fx.select(2);
    let second = fx.sink.drain();
    assert_eq!(fx.visibility(), state);
    assert_eq!(first, second);
}

#[test]
fn test_switching_away_and_back_restores_payload() {
    let mut fx = Fixture::new();
    let marked = fx.config.marker_item();
    fx.inventory.set(1, Some(marked.clone())).unwrap();
    fx.join();
    fx.sink.drain();

    fx.select(1);
    let shown = item_updates(&fx.sink.drain());

    fx.select(4);
    fx.select(1);
    let updates = item_updates(&fx.sink.drain());

    assert_eq!(updates, vec![Slot::EMPTY, marked.to_slot()]);
    assert_eq!(updates.last(), shown.last());
    assert_eq!(fx.visibility(), Visibility::Shown(marked));
}

#[test]
fn test_players_get_separate_overlays() {
    let config = HudConfig::default();
    let mut controller = OverlayController::new(&config);
    let mut sinks = [PacketBuffer::new(), PacketBuffer::new()];

    for (player, sink) in [EntityId(1), EntityId(2)].into_iter().zip(sinks.iter_mut()) {
        let ctx = JoinContext {
            player_id: player,
            ..join_ctx(None)
        };
        controller.on_join(ctx, sink).unwrap();
    }

    let overlay_ids: Vec<i32> = sinks
        .iter_mut()
        .map(|sink| {
            let frames = sink.drain();
            let (_, body) = split(&frames).remove(0);
            AddEntity::decode(&mut Cursor::new(&body)).unwrap().entity_id.0
        })
        .collect();
    assert_eq!(overlay_ids, vec![-1, -2]);
    assert_eq!(controller.len(), 2);
}
