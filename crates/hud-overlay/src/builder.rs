//! Message builder: the three packets that create, configure, attach and refill an overlay.
//!
//! Every builder returns one framed packet ready for the connection. Ordering matters to the
//! client: the spawn must arrive before any metadata or passenger packet naming the same id.

use bytes::Bytes;
use mc_protocol::frame::frame;
use mc_protocol::{Angle, EntityMetadata, MetadataValue, Slot, Uuid, Vec3, VarInt};
use tracing::debug;

use crate::config::DisplayConfig;
use crate::error::Result;
use crate::host::Position;
use crate::identity::{EntityId, OverlayId};
use crate::packets::{AddEntity, SetEntityData, SetPassengers};

/// Item display metadata indices.
pub mod field_index {
    pub const TRANSLATION: u8 = 11;
    pub const SCALE: u8 = 12;
    pub const BILLBOARD: u8 = 15;
    pub const ITEM: u8 = 23;
    pub const DISPLAY_CONTEXT: u8 = 24;
}

/// One typed metadata field of the overlay entity.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayField {
    Translation(Vec3),
    Scale(Vec3),
    Billboard(i8),
    Item(Slot),
    DisplayContext(i8),
}

impl DisplayField {
    #[must_use]
    pub const fn index(&self) -> u8 {
        match self {
            Self::Translation(_) => field_index::TRANSLATION,
            Self::Scale(_) => field_index::SCALE,
            Self::Billboard(_) => field_index::BILLBOARD,
            Self::Item(_) => field_index::ITEM,
            Self::DisplayContext(_) => field_index::DISPLAY_CONTEXT,
        }
    }

    fn into_value(self) -> MetadataValue {
        match self {
            Self::Translation(v) | Self::Scale(v) => MetadataValue::Vector3(v),
            Self::Billboard(b) | Self::DisplayContext(b) => MetadataValue::Byte(b),
            Self::Item(slot) => MetadataValue::Slot(slot),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MessageBuilder {
    display: DisplayConfig,
}

impl MessageBuilder {
    #[must_use]
    pub fn new(display: DisplayConfig) -> Self {
        Self { display }
    }

    #[must_use]
    pub fn display(&self) -> &DisplayConfig {
        &self.display
    }

    /// Spawn the overlay entity at `position` with a caller-supplied unique `uuid`.
    pub fn build_spawn(&self, overlay_id: OverlayId, uuid: Uuid, position: Position) -> Result<Bytes> {
        let packet = AddEntity {
            entity_id: VarInt(overlay_id.get()),
            uuid,
            kind: VarInt(self.display.entity_kind),
            x: position.x,
            y: position.y,
            z: position.z,
            pitch: Angle::default(),
            yaw: Angle::default(),
            head_yaw: Angle::default(),
            data: VarInt(0),
            velocity_x: 0,
            velocity_y: 0,
            velocity_z: 0,
        };
        debug!("Building spawn for overlay {} at {:?}", overlay_id, position);
        Ok(frame(&packet)?)
    }

    /// Partial metadata update carrying only `fields`.
    pub fn build_attribute_update(
        &self,
        overlay_id: OverlayId,
        fields: impl IntoIterator<Item = DisplayField>,
    ) -> Result<Bytes> {
        let metadata = fields
            .into_iter()
            .fold(EntityMetadata::new(), |metadata, field| {
                metadata.with(field.index(), field.into_value())
            });
        debug!("Building {} metadata fields for overlay {}", metadata.len(), overlay_id);
        Ok(frame(&SetEntityData {
            entity_id: VarInt(overlay_id.get()),
            metadata,
        })?)
    }

    /// Mount `passengers` on `vehicle`.
    pub fn build_attach(&self, vehicle: EntityId, passengers: &[OverlayId]) -> Result<Bytes> {
        Ok(frame(&SetPassengers {
            vehicle_id: VarInt(vehicle.0),
            passengers: passengers.iter().map(|id| VarInt(id.get())).collect(),
        })?)
    }

    /// The fixed presentation fields sent once after spawn.
    ///
    /// The translation pulls the item down from the mount point on top of the player to eye
    /// level: `eye_height - body_height` is negative.
    #[must_use]
    pub fn presentation_fields(&self, eye_height: f32, body_height: f32) -> [DisplayField; 4] {
        [
            DisplayField::Translation(Vec3::new(0.0, eye_height - body_height, 0.0)),
            DisplayField::Scale(Vec3::splat(self.display.scale)),
            DisplayField::Billboard(self.display.billboard),
            DisplayField::DisplayContext(self.display.display_context),
        ]
    }
}
