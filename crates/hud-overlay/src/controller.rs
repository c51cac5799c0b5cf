//! Overlay controller: per-player state machine from host events to packets.
//!
//! `transition` is the only place that decides what a player sees. It is pure: given the
//! current state and one event it returns the next state and the effects to emit. The
//! controller then renders those effects through the [`MessageBuilder`] into the player's sink.
//!
//! The overlay is positioned once, at spawn, and rides the player through the passenger link
//! afterwards. Nothing re-syncs it to later movement, head rotation or sneaking, so it can lag
//! or sit slightly off under fast movement or server load.

use std::collections::HashMap;

use mc_protocol::{Slot, Uuid};
use tracing::{debug, info, warn};

use crate::builder::{DisplayField, MessageBuilder};
use crate::config::HudConfig;
use crate::error::{HudError, Result};
use crate::host::{PacketSink, Position};
use crate::identity::{EntityId, OverlayId};
use crate::item::{ItemStack, MarkerTag};

/// What the overlay currently renders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Hidden,
    Shown(ItemStack),
}

impl Visibility {
    /// Shown iff the held item carries `marker`. Missing items and missing metadata hide.
    #[must_use]
    pub fn resolve(held: Option<&ItemStack>, marker: &MarkerTag) -> Self {
        match held {
            Some(item) if marker.is_present(item) => Self::Shown(item.clone()),
            _ => Self::Hidden,
        }
    }

    /// The slot written to the item field: the item, or the empty slot when hidden.
    #[must_use]
    pub fn payload(&self) -> Slot {
        match self {
            Self::Hidden => Slot::EMPTY,
            Self::Shown(item) => item.to_slot(),
        }
    }

    #[must_use]
    pub fn is_shown(&self) -> bool {
        matches!(self, Self::Shown(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OverlayState {
    #[default]
    Uninitialized,
    Spawned(Visibility),
}

impl OverlayState {
    #[must_use]
    pub fn visibility(&self) -> Option<&Visibility> {
        match self {
            Self::Uninitialized => None,
            Self::Spawned(v) => Some(v),
        }
    }
}

/// What the host knows about a player at the moment they join.
#[derive(Debug, Clone, Copy)]
pub struct JoinContext<'a> {
    pub player_id: EntityId,
    pub eye_position: Position,
    pub eye_height: f32,
    pub body_height: f32,
    pub held_item: Option<&'a ItemStack>,
}

#[derive(Debug, Clone, Copy)]
pub enum OverlayEvent<'a> {
    Join(JoinContext<'a>),
    /// The held slot changed; `item` is whatever sits in the new slot.
    HeldSlotChanged { item: Option<&'a ItemStack> },
}

/// A packet-level consequence of a transition, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Spawn { position: Position },
    Present { eye_height: f32, body_height: f32 },
    Attach,
    SetPayload(Slot),
}

/// Advance one player's overlay by one event.
#[must_use]
pub fn transition(
    state: &OverlayState,
    event: &OverlayEvent<'_>,
    marker: &MarkerTag,
) -> (OverlayState, Vec<Effect>) {
    match (state, event) {
        // A repeated join respawns from scratch; the client dropped its entities on reconnect.
        (_, OverlayEvent::Join(ctx)) => {
            let visibility = Visibility::resolve(ctx.held_item, marker);
            let mut effects = vec![
                Effect::Spawn {
                    position: ctx.eye_position,
                },
                Effect::Present {
                    eye_height: ctx.eye_height,
                    body_height: ctx.body_height,
                },
                Effect::Attach,
            ];
            // A fresh display entity already renders nothing, so hidden needs no packet.
            if visibility.is_shown() {
                effects.push(Effect::SetPayload(visibility.payload()));
            }
            (OverlayState::Spawned(visibility), effects)
        }
        (OverlayState::Uninitialized, OverlayEvent::HeldSlotChanged { .. }) => {
            (OverlayState::Uninitialized, Vec::new())
        }
        (OverlayState::Spawned(_), OverlayEvent::HeldSlotChanged { item }) => {
            let visibility = Visibility::resolve(*item, marker);
            let effects = vec![Effect::SetPayload(visibility.payload())];
            (OverlayState::Spawned(visibility), effects)
        }
    }
}

/// One connected player's overlay.
#[derive(Debug, Clone)]
pub struct OverlaySession {
    player_id: EntityId,
    overlay_id: OverlayId,
    state: OverlayState,
}

impl OverlaySession {
    pub fn new(player_id: EntityId) -> Result<Self> {
        Ok(Self {
            player_id,
            overlay_id: OverlayId::for_player(player_id)?,
            state: OverlayState::Uninitialized,
        })
    }

    #[must_use]
    pub fn player_id(&self) -> EntityId {
        self.player_id
    }

    #[must_use]
    pub fn overlay_id(&self) -> OverlayId {
        self.overlay_id
    }

    #[must_use]
    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    /// Apply `event`, sending the resulting packets to `sink`.
    ///
    /// Effects are encoded before anything is sent, so an encoding failure leaves both the state
    /// and the connection untouched.
    pub fn handle<S: PacketSink + ?Sized>(
        &mut self,
        event: &OverlayEvent<'_>,
        marker: &MarkerTag,
        builder: &MessageBuilder,
        sink: &mut S,
    ) -> Result<()> {
        let (next, effects) = transition(&self.state, event, marker);
        let packets = effects
            .into_iter()
            .map(|effect| self.render(effect, builder))
            .collect::<Result<Vec<_>>>()?;

        for packet in packets {
            sink.send(packet);
        }
        self.state = next;
        Ok(())
    }

    fn render(&self, effect: Effect, builder: &MessageBuilder) -> Result<bytes::Bytes> {
        match effect {
            Effect::Spawn { position } => {
                let uuid = Uuid(uuid::Uuid::new_v4().as_u128());
                builder.build_spawn(self.overlay_id, uuid, position)
            }
            Effect::Present {
                eye_height,
                body_height,
            } => builder.build_attribute_update(
                self.overlay_id,
                builder.presentation_fields(eye_height, body_height),
            ),
            Effect::Attach => builder.build_attach(self.player_id, &[self.overlay_id]),
            Effect::SetPayload(slot) => {
                builder.build_attribute_update(self.overlay_id, [DisplayField::Item(slot)])
            }
        }
    }
}

/// Owns every connected player's overlay session.
#[derive(Debug)]
pub struct OverlayController {
    marker: MarkerTag,
    builder: MessageBuilder,
    sessions: HashMap<EntityId, OverlaySession>,
}

impl OverlayController {
    #[must_use]
    pub fn new(config: &HudConfig) -> Self {
        Self {
            marker: config.marker_tag(),
            builder: MessageBuilder::new(config.display.clone()),
            sessions: HashMap::new(),
        }
    }

    #[must_use]
    pub fn marker(&self) -> &MarkerTag {
        &self.marker
    }

    #[must_use]
    pub fn session(&self, player_id: EntityId) -> Option<&OverlaySession> {
        self.sessions.get(&player_id)
    }

    #[must_use]
    pub fn visibility(&self, player_id: EntityId) -> Option<&Visibility> {
        self.session(player_id).and_then(|s| s.state().visibility())
    }

    /// Spawn, present and attach the overlay, then show the held item if it is marked.
    pub fn on_join<S: PacketSink + ?Sized>(&mut self, ctx: JoinContext<'_>, sink: &mut S) -> Result<()> {
        let mut session = match OverlaySession::new(ctx.player_id) {
            Ok(session) => session,
            Err(err @ HudError::InvalidPlayerId(_)) => {
                warn!("Not spawning overlay: {}", err);
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        session.handle(&OverlayEvent::Join(ctx), &self.marker, &self.builder, sink)?;

        info!(
            "Spawned overlay {} for player {} (shown: {})",
            session.overlay_id(),
            ctx.player_id,
            session.state().visibility().is_some_and(Visibility::is_shown)
        );
        self.sessions.insert(ctx.player_id, session);
        Ok(())
    }

    /// Re-resolve the overlay for the item in the newly held slot.
    pub fn on_held_slot_changed<S: PacketSink + ?Sized>(
        &mut self,
        player_id: EntityId,
        item: Option<&ItemStack>,
        sink: &mut S,
    ) -> Result<()> {
        let Some(session) = self.sessions.get_mut(&player_id) else {
            debug!("Held slot change for player {} without overlay", player_id);
            return Ok(());
        };
        session.handle(
            &OverlayEvent::HeldSlotChanged { item },
            &self.marker,
            &self.builder,
            sink,
        )?;
        debug!(
            "Updated overlay payload for player {} (shown: {})",
            player_id,
            session.state().visibility().is_some_and(Visibility::is_shown)
        );
        Ok(())
    }

    /// Forget a player. The client discards its entities on disconnect, so nothing is sent.
    pub fn on_disconnect(&mut self, player_id: EntityId) -> Option<OverlaySession> {
        let removed = self.sessions.remove(&player_id);
        if removed.is_some() {
            debug!("Dropped overlay session for player {}", player_id);
        }
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemKind;

    fn marker() -> MarkerTag {
        HudConfig::default().marker_tag()
    }

    fn tagged() -> ItemStack {
        HudConfig::default().marker_item()
    }

    fn plain() -> ItemStack {
        ItemStack::new(ItemKind(1), 1)
    }

    fn join(held: Option<&ItemStack>) -> OverlayEvent<'_> {
        OverlayEvent::Join(JoinContext {
            player_id: EntityId(3),
            eye_position: Position::new(0.0, 65.62, 0.0),
            eye_height: 1.62,
            body_height: 1.8,
            held_item: held,
        })
    }

    #[test]
    fn test_resolve_cases() {
        let m = marker();
        assert_eq!(Visibility::resolve(None, &m), Visibility::Hidden);
        assert_eq!(Visibility::resolve(Some(&plain()), &m), Visibility::Hidden);
        let meta_without_marker = plain().with_meta(|meta| meta.custom_model_data = Some(10));
        assert_eq!(
            Visibility::resolve(Some(&meta_without_marker), &m),
            Visibility::Hidden
        );
        assert_eq!(
            Visibility::resolve(Some(&tagged()), &m),
            Visibility::Shown(tagged())
        );
    }

    #[test]
    fn test_join_hidden_emits_three_effects() {
        let (state, effects) = transition(&OverlayState::Uninitialized, &join(None), &marker());
        assert_eq!(state, OverlayState::Spawned(Visibility::Hidden));
        assert_eq!(effects.len(), 3);
        assert!(matches!(effects[0], Effect::Spawn { .. }));
        assert!(matches!(effects[1], Effect::Present { .. }));
        assert_eq!(effects[2], Effect::Attach);
    }

    #[test]
    fn test_join_shown_appends_payload() {
        let item = tagged();
        let (state, effects) =
            transition(&OverlayState::Uninitialized, &join(Some(&item)), &marker());
        assert_eq!(state, OverlayState::Spawned(Visibility::Shown(item.clone())));
        assert_eq!(effects.last(), Some(&Effect::SetPayload(item.to_slot())));
        assert_eq!(effects.len(), 4);
    }

    #[test]
    fn test_held_change_before_join_is_ignored() {
        let item = tagged();
        let event = OverlayEvent::HeldSlotChanged { item: Some(&item) };
        let (state, effects) = transition(&OverlayState::Uninitialized, &event, &marker());
        assert_eq!(state, OverlayState::Uninitialized);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_hide_sends_empty_slot() {
        let shown = OverlayState::Spawned(Visibility::Shown(tagged()));
        let p = plain();
        let event = OverlayEvent::HeldSlotChanged { item: Some(&p) };
        let (state, effects) = transition(&shown, &event, &marker());
        assert_eq!(state, OverlayState::Spawned(Visibility::Hidden));
        assert_eq!(effects, vec![Effect::SetPayload(Slot::EMPTY)]);
    }

    #[test]
    fn test_held_change_is_idempotent() {
        let item = tagged();
        let event = OverlayEvent::HeldSlotChanged { item: Some(&item) };
        let start = OverlayState::Spawned(Visibility::Hidden);
        let (once, first) = transition(&start, &event, &marker());
        let (twice, second) = transition(&once, &event, &marker());
        assert_eq!(once, twice);
        assert_eq!(first, second);
    }

    #[test]
    fn test_session_join_sends_three_packets() {
        let config = HudConfig::default();
        let builder = MessageBuilder::new(config.display.clone());
        let mut session = OverlaySession::new(EntityId(3)).unwrap();
        let mut sink: Vec<bytes::Bytes> = Vec::new();

        session
            .handle(&join(None), &config.marker_tag(), &builder, &mut sink)
            .unwrap();
        assert_eq!(sink.len(), 3);
        assert_eq!(session.overlay_id().get(), -3);
    }

    #[test]
    fn test_controller_ignores_unknown_player() {
        let mut controller = OverlayController::new(&HudConfig::default());
        let mut sink: Vec<bytes::Bytes> = Vec::new();
        controller
            .on_held_slot_changed(EntityId(99), Some(&tagged()), &mut sink)
            .unwrap();
        assert!(sink.is_empty());
        assert!(controller.is_empty());
    }

    #[test]
    fn test_controller_skips_zero_player_id() {
        let mut controller = OverlayController::new(&HudConfig::default());
        let mut sink: Vec<bytes::Bytes> = Vec::new();
        let ctx = JoinContext {
            player_id: EntityId(0),
            eye_position: Position::default(),
            eye_height: 1.62,
            body_height: 1.8,
            held_item: None,
        };
        controller.on_join(ctx, &mut sink).unwrap();
        assert!(sink.is_empty());
        assert!(controller.session(EntityId(0)).is_none());
    }

    #[test]
    fn test_disconnect_drops_session_silently() {
        let mut controller = OverlayController::new(&HudConfig::default());
        let mut sink: Vec<bytes::Bytes> = Vec::new();
        let ctx = JoinContext {
            player_id: EntityId(5),
            eye_position: Position::default(),
            eye_height: 1.62,
            body_height: 1.8,
            held_item: None,
        };
        controller.on_join(ctx, &mut sink).unwrap();
        let sent = sink.len();

        assert!(controller.on_disconnect(EntityId(5)).is_some());
        assert_eq!(sink.len(), sent);
        assert!(controller.visibility(EntityId(5)).is_none());

        controller
            .on_held_slot_changed(EntityId(5), Some(&tagged()), &mut sink)
            .unwrap();
        assert_eq!(sink.len(), sent);
    }
}
