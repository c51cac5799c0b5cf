//! Clientbound play packets used by the overlay (protocol 765).

use mc_protocol::{Angle, Decode, Encode, EntityMetadata, Packet, Uuid, VarInt};

/// Spawn a non-living entity on the client.
#[derive(Debug, Clone, PartialEq, Encode, Decode, Packet)]
#[packet(id = 0x01)]
pub struct AddEntity {
    pub entity_id: VarInt,
    pub uuid: Uuid,
    pub kind: VarInt,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub pitch: Angle,
    pub yaw: Angle,
    pub head_yaw: Angle,
    pub data: VarInt,
    pub velocity_x: i16,
    pub velocity_y: i16,
    pub velocity_z: i16,
}

/// Partial metadata update for one entity.
#[derive(Debug, Clone, PartialEq, Encode, Decode, Packet)]
#[packet(id = 0x56)]
pub struct SetEntityData {
    pub entity_id: VarInt,
    pub metadata: EntityMetadata,
}

/// Replace the passenger list of `vehicle_id`.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Packet)]
#[packet(id = 0x5D)]
pub struct SetPassengers {
    pub vehicle_id: VarInt,
    pub passengers: Vec<VarInt>,
}
